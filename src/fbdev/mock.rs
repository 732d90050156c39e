// src/fbdev/mock.rs

//! In-memory `FramebufferBackend` for tests and dry runs.
//!
//! The mock models just enough of a driver to exercise negotiation: a
//! variable/fixed mode pair, a set of depths the "hardware" accepts, and a
//! set of depths that come up as true color once applied.

use super::mode::{Bitfield, FixScreenInfo, VarScreenInfo, FB_VISUAL_PSEUDOCOLOR, FB_VISUAL_TRUECOLOR};
use super::FramebufferBackend;

use log::debug;
use std::io;
use std::path::Path;

/// Byte the mock fills fresh mappings with, so untouched memory is visible.
pub const MOCK_FILL_BYTE: u8 = 0xA5;

#[derive(Debug, Clone)]
pub struct MockFbdev {
    var: VarScreenInfo,
    fix: FixScreenInfo,
    /// Depths for which `put_var_screeninfo` succeeds.
    accepted_depths: Vec<u32>,
    /// Depths which yield a true-color visual once applied.
    truecolor_depths: Vec<u32>,
    fail_queries: bool,
    fail_map: bool,
    put_requests: Vec<VarScreenInfo>,
}

impl MockFbdev {
    /// A true-color device with the given geometry and channel layout.
    pub fn truecolor(
        width: u32,
        height: u32,
        row_stride_px: u32,
        bits_per_pixel: u32,
        channels: [Bitfield; 4],
    ) -> Self {
        let [red, green, blue, transp] = channels;
        let var = VarScreenInfo {
            xres: width,
            yres: height,
            xres_virtual: row_stride_px,
            yres_virtual: height,
            bits_per_pixel,
            red,
            green,
            blue,
            transp,
            ..VarScreenInfo::default()
        };
        let fix = FixScreenInfo {
            visual: FB_VISUAL_TRUECOLOR,
            line_length: row_stride_px * (bits_per_pixel / 8),
            ..FixScreenInfo::default()
        };
        MockFbdev {
            var,
            fix,
            accepted_depths: vec![bits_per_pixel],
            truecolor_depths: vec![bits_per_pixel],
            fail_queries: false,
            fail_map: false,
            put_requests: Vec::new(),
        }
    }

    /// 32-bit `x8r8g8b8`, the layout the fast flush path handles.
    pub fn xrgb8888(width: u32, height: u32, row_stride_px: u32) -> Self {
        Self::truecolor(width, height, row_stride_px, 32, xrgb8888_channels())
    }

    /// An 8-bit palette device that can be switched to the listed depths.
    /// Only the depths in `truecolor_depths` come up as true color.
    pub fn pseudocolor(
        width: u32,
        height: u32,
        accepted_depths: &[u32],
        truecolor_depths: &[u32],
    ) -> Self {
        let mut mock = Self::truecolor(width, height, width, 8, [Bitfield::new(0, 8); 4]);
        mock.fix.visual = FB_VISUAL_PSEUDOCOLOR;
        mock.accepted_depths = accepted_depths.to_vec();
        mock.truecolor_depths = truecolor_depths.to_vec();
        mock
    }

    pub fn with_pan_offset(mut self, xoffset: u32, yoffset: u32) -> Self {
        self.var.xoffset = xoffset;
        self.var.yoffset = yoffset;
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn failing_map(mut self) -> Self {
        self.fail_map = true;
        self
    }

    /// Every mode the negotiator tried to apply, in order.
    pub fn put_requests(&self) -> &[VarScreenInfo] {
        &self.put_requests
    }

    fn query_error(&self) -> io::Result<()> {
        if self.fail_queries {
            Err(io::Error::from_raw_os_error(libc::EIO))
        } else {
            Ok(())
        }
    }
}

/// Channel layout of `x8r8g8b8`.
pub fn xrgb8888_channels() -> [Bitfield; 4] {
    [
        Bitfield::new(16, 8),
        Bitfield::new(8, 8),
        Bitfield::new(0, 8),
        Bitfield::new(0, 0),
    ]
}

/// Channel layout of `a8r8g8b8`.
pub fn argb8888_channels() -> [Bitfield; 4] {
    [
        Bitfield::new(16, 8),
        Bitfield::new(8, 8),
        Bitfield::new(0, 8),
        Bitfield::new(24, 8),
    ]
}

/// Channel layout of `r5g6b5`.
pub fn rgb565_channels() -> [Bitfield; 4] {
    [
        Bitfield::new(11, 5),
        Bitfield::new(5, 6),
        Bitfield::new(0, 5),
        Bitfield::new(0, 0),
    ]
}

/// Channel layout of `r8g8b8` (24 bits per pixel).
pub fn rgb888_channels() -> [Bitfield; 4] {
    [
        Bitfield::new(16, 8),
        Bitfield::new(8, 8),
        Bitfield::new(0, 8),
        Bitfield::new(0, 0),
    ]
}

impl FramebufferBackend for MockFbdev {
    type Mapping = Vec<u8>;

    /// Opens a default 640x480 `x8r8g8b8` device for any node under `/dev`;
    /// every other path fails with `ENOENT`.
    fn open(path: &Path) -> io::Result<Self> {
        debug!("MockFbdev: opening {}", path.display());
        if !path.starts_with("/dev") {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        Ok(Self::xrgb8888(640, 480, 640))
    }

    fn var_screeninfo(&mut self) -> io::Result<VarScreenInfo> {
        self.query_error()?;
        Ok(self.var)
    }

    fn fix_screeninfo(&mut self) -> io::Result<FixScreenInfo> {
        self.query_error()?;
        Ok(self.fix)
    }

    fn put_var_screeninfo(&mut self, info: &VarScreenInfo) -> io::Result<()> {
        self.put_requests.push(*info);
        let depth = info.bits_per_pixel;
        if !self.accepted_depths.contains(&depth) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        self.var = *info;
        self.fix.line_length = self.var.xres_virtual.max(self.var.xres) * (depth / 8);
        if self.truecolor_depths.contains(&depth) {
            self.fix.visual = FB_VISUAL_TRUECOLOR;
            let [red, green, blue, transp] = match depth {
                16 => rgb565_channels(),
                24 => rgb888_channels(),
                _ => xrgb8888_channels(),
            };
            self.var.red = red;
            self.var.green = green;
            self.var.blue = blue;
            self.var.transp = transp;
        } else {
            self.fix.visual = FB_VISUAL_PSEUDOCOLOR;
        }
        Ok(())
    }

    fn map(&mut self, len: usize) -> io::Result<Vec<u8>> {
        if self.fail_map {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        Ok(vec![MOCK_FILL_BYTE; len])
    }
}
