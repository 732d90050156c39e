// src/framebuffer/negotiate.rs

//! Device capability negotiation: read the mode descriptors, coax the device
//! into a true-color visual if needed, and derive the geometry and pixel
//! layout the compositor works with.

use crate::error::{FbError, Result};
use crate::fbdev::{ActivateFlags, Bitfield, FixScreenInfo, FramebufferBackend, VarScreenInfo};
use crate::geometry::Area;

use super::flush::FlushStrategy;

use log::{debug, info, warn};
use std::io;

/// Depths tried, in order, when the device does not start out in true color.
pub const CANDIDATE_DEPTHS: [u32; 3] = [32, 24, 16];

const MIN_BITS_PER_PIXEL: u32 = 16;
const MAX_BITS_PER_PIXEL: u32 = 32;

/// Bit position and width of one channel inside a device pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channel {
    pub offset: u32,
    pub length: u32,
}

impl Channel {
    pub const fn new(offset: u32, length: u32) -> Self {
        Channel { offset, length }
    }

    /// Scales an 8-bit channel value to this channel's width and moves it
    /// into position. Absent channels (`length == 0`) contribute nothing.
    #[inline]
    pub fn place(&self, value: u8) -> u32 {
        if self.length == 0 {
            return 0;
        }
        let value = u32::from(value);
        let scaled = if self.length >= 8 {
            value.checked_shl(self.length - 8).unwrap_or(0)
        } else {
            value >> (8 - self.length)
        };
        let mask = if self.length >= 32 {
            u32::MAX
        } else {
            (1u32 << self.length) - 1
        };
        (scaled & mask).checked_shl(self.offset).unwrap_or(0)
    }

    /// Bits this channel occupies in a 32-bit pixel word.
    #[inline]
    pub fn mask(&self) -> u32 {
        let width = u32::MAX.checked_shr(32 - self.length.min(32)).unwrap_or(0);
        width.checked_shl(self.offset).unwrap_or(0)
    }
}

impl From<Bitfield> for Channel {
    fn from(field: Bitfield) -> Self {
        Channel::new(field.offset, field.length)
    }
}

/// How the device lays out one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelLayout {
    pub bytes_per_pixel: usize,
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub transp: Channel,
}

impl PixelLayout {
    /// True for 32-bit pixels whose color channels sit exactly where an
    /// `0xAARRGGBB` word keeps them; the high byte is don't-care.
    pub fn is_xrgb8888(&self) -> bool {
        self.bytes_per_pixel == 4
            && self.red == Channel::new(16, 8)
            && self.green == Channel::new(8, 8)
            && self.blue == Channel::new(0, 8)
    }

    /// Bits of a device pixel claimed by any channel.
    pub fn claimed_mask(&self) -> u32 {
        self.red.mask() | self.green.mask() | self.blue.mask() | self.transp.mask()
    }

    /// Converts an `0xAARRGGBB` pixel into this layout's pixel value.
    ///
    /// On 32-bit layouts the source bits no channel claims pass through
    /// unchanged, so an x8r8g8b8 device gets the same word the fast path
    /// would copy.
    #[inline]
    pub fn pack(&self, argb: u32) -> u32 {
        let [b, g, r, a] = argb.to_le_bytes();
        let packed =
            self.red.place(r) | self.green.place(g) | self.blue.place(b) | self.transp.place(a);
        if self.bytes_per_pixel == 4 {
            packed | (argb & !self.claimed_mask())
        } else {
            packed
        }
    }
}

/// Everything negotiation learns about an open device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Visible area as reported, including any pan offset.
    pub area: Area,
    pub layout: PixelLayout,
    /// Pixel slots per scan line in device memory.
    pub row_stride: usize,
    /// Bytes to map: `height * row_stride * bytes_per_pixel`.
    pub map_len: usize,
    pub strategy: FlushStrategy,
}

/// Queries the device, forcing a true-color depth if necessary.
pub fn query_device<B: FramebufferBackend>(backend: &mut B) -> Result<DeviceGeometry> {
    let (mut var, mut fix) = read_modes(backend)?;
    debug!(
        "Initial mode: {}x{} @ {} bpp, visual {}, line length {} ({})",
        var.xres,
        var.yres,
        var.bits_per_pixel,
        fix.visual,
        fix.line_length,
        fix.id_string()
    );

    if !fix.is_truecolor() {
        warn!(
            "Framebuffer visual {} is not true color; trying depths {:?}",
            fix.visual, CANDIDATE_DEPTHS
        );
        force_truecolor(backend, &mut var)?;
        (var, fix) = read_modes(backend)?;
    }

    if !fix.is_truecolor()
        || var.bits_per_pixel < MIN_BITS_PER_PIXEL
        || var.bits_per_pixel > MAX_BITS_PER_PIXEL
    {
        return Err(FbError::UnsupportedVisual {
            visual: fix.visual,
            bits_per_pixel: var.bits_per_pixel,
        });
    }

    let geometry = geometry_from_modes(&var, &fix)?;
    info!(
        "Framebuffer {}x{} (stride {} px, {} bytes/px), {:?} flush",
        geometry.area.width,
        geometry.area.height,
        geometry.row_stride,
        geometry.layout.bytes_per_pixel,
        geometry.strategy
    );
    Ok(geometry)
}

fn read_modes<B: FramebufferBackend>(backend: &mut B) -> Result<(VarScreenInfo, FixScreenInfo)> {
    let var = backend.var_screeninfo().map_err(FbError::QueryFailed)?;
    let fix = backend.fix_screeninfo().map_err(FbError::QueryFailed)?;
    Ok((var, fix))
}

/// Walks `CANDIDATE_DEPTHS`, stopping at the first one that the device
/// accepts and reports as true color. Rejected depths are not errors; the
/// caller re-reads the modes and judges the outcome.
fn force_truecolor<B: FramebufferBackend>(backend: &mut B, var: &mut VarScreenInfo) -> Result<()> {
    for depth in CANDIDATE_DEPTHS {
        var.bits_per_pixel = depth;
        var.set_activate_flags(var.activate_flags() | ActivateFlags::NOW | ActivateFlags::FORCE);

        if let Err(e) = backend.put_var_screeninfo(var) {
            debug!("Device rejected {} bpp: {}", depth, e);
            continue;
        }

        let fix = backend.fix_screeninfo().map_err(FbError::QueryFailed)?;
        if fix.is_truecolor() {
            info!("Switched framebuffer to true color at {} bpp", depth);
            return Ok(());
        }
        debug!("{} bpp accepted but visual is still {}", depth, fix.visual);
    }
    Ok(())
}

fn geometry_from_modes(var: &VarScreenInfo, fix: &FixScreenInfo) -> Result<DeviceGeometry> {
    let layout = PixelLayout {
        bytes_per_pixel: (var.bits_per_pixel >> 3) as usize,
        red: var.red.into(),
        green: var.green.into(),
        blue: var.blue.into(),
        transp: var.transp.into(),
    };

    let area = Area::new(
        i64::from(var.xoffset),
        i64::from(var.yoffset),
        u64::from(var.xres),
        u64::from(var.yres),
    );
    let row_stride = fix.line_length as usize / layout.bytes_per_pixel;
    if row_stride < var.xres as usize {
        return Err(FbError::QueryFailed(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "line length {} bytes cannot hold {} pixels of {} bytes",
                fix.line_length, var.xres, layout.bytes_per_pixel
            ),
        )));
    }
    let map_len = var.yres as usize * row_stride * layout.bytes_per_pixel;

    let strategy = if layout.is_xrgb8888() {
        FlushStrategy::Fast
    } else {
        FlushStrategy::Generic
    };

    Ok(DeviceGeometry {
        area,
        layout,
        row_stride,
        map_len,
        strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fbdev::mock::{self, MockFbdev};
    use test_log::test;

    #[test]
    fn channel_place_scales_to_width() {
        assert_eq!(Channel::new(11, 5).place(0xFF), 0x1F << 11);
        assert_eq!(Channel::new(5, 6).place(0x80), 0x20 << 5);
        assert_eq!(Channel::new(0, 8).place(0x7F), 0x7F);
        assert_eq!(Channel::new(24, 0).place(0xFF), 0);
        assert_eq!(Channel::new(0, 10).place(0xFF), 0x3FC);
    }

    #[test]
    fn channel_place_tolerates_bogus_offsets() {
        assert_eq!(Channel::new(40, 8).place(0xFF), 0);
    }

    #[test]
    fn pack_rgb565() {
        let [red, green, blue, transp] = mock::rgb565_channels();
        let layout = PixelLayout {
            bytes_per_pixel: 2,
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
            transp: transp.into(),
        };
        assert_eq!(layout.pack(0xFFFF_0000), 0xF800);
        assert_eq!(layout.pack(0xFF00_FF00), 0x07E0);
        assert_eq!(layout.pack(0xFF00_00FF), 0x001F);
        assert_eq!(layout.pack(0x00FF_FFFF), 0xFFFF);
    }

    #[test]
    fn channel_mask_covers_its_bits() {
        assert_eq!(Channel::new(11, 5).mask(), 0xF800);
        assert_eq!(Channel::new(0, 32).mask(), u32::MAX);
        assert_eq!(Channel::new(24, 0).mask(), 0);
        assert_eq!(Channel::new(40, 8).mask(), 0);
    }

    #[test]
    fn pack_keeps_unclaimed_high_byte_on_xrgb() {
        let [red, green, blue, transp] = mock::xrgb8888_channels();
        let layout = PixelLayout {
            bytes_per_pixel: 4,
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
            transp: transp.into(),
        };
        assert_eq!(layout.pack(0x8011_2233), 0x8011_2233);
        assert_eq!(layout.pack(0x0044_5566), 0x0044_5566);
    }

    #[test]
    fn xrgb_device_selects_fast_flush() {
        let mut dev = MockFbdev::xrgb8888(4, 3, 8);
        let geometry = query_device(&mut dev).expect("query");
        assert_eq!(geometry.strategy, FlushStrategy::Fast);
        assert_eq!(geometry.area, Area::with_size(4, 3));
        assert_eq!(geometry.row_stride, 8);
        assert_eq!(geometry.map_len, 3 * 8 * 4);
        assert!(dev.put_requests().is_empty());
    }

    #[test]
    fn argb_device_also_selects_fast_flush() {
        let mut dev = MockFbdev::truecolor(2, 2, 2, 32, mock::argb8888_channels());
        assert_eq!(query_device(&mut dev).expect("query").strategy, FlushStrategy::Fast);
    }

    #[test]
    fn bgr_device_selects_generic_flush() {
        let bgr = [
            Bitfield::new(0, 8),
            Bitfield::new(8, 8),
            Bitfield::new(16, 8),
            Bitfield::new(0, 0),
        ];
        let mut dev = MockFbdev::truecolor(2, 2, 2, 32, bgr);
        assert_eq!(query_device(&mut dev).expect("query").strategy, FlushStrategy::Generic);
    }

    #[test]
    fn sixteen_bit_device_selects_generic_flush() {
        let mut dev = MockFbdev::truecolor(3, 2, 4, 16, mock::rgb565_channels());
        let geometry = query_device(&mut dev).expect("query");
        assert_eq!(geometry.strategy, FlushStrategy::Generic);
        assert_eq!(geometry.layout.bytes_per_pixel, 2);
        assert_eq!(geometry.row_stride, 4);
        assert_eq!(geometry.map_len, 2 * 4 * 2);
    }

    #[test]
    fn pan_offset_is_reported_in_area() {
        let mut dev = MockFbdev::xrgb8888(4, 4, 4).with_pan_offset(0, 4);
        let geometry = query_device(&mut dev).expect("query");
        assert_eq!(geometry.area, Area::new(0, 4, 4, 4));
    }

    #[test]
    fn forcing_stops_at_first_truecolor_depth() {
        let mut dev = MockFbdev::pseudocolor(2, 2, &[32, 24, 16], &[24, 16]);
        let geometry = query_device(&mut dev).expect("query");
        assert_eq!(geometry.layout.bytes_per_pixel, 3);

        let tried: Vec<u32> = dev.put_requests().iter().map(|v| v.bits_per_pixel).collect();
        assert_eq!(tried, vec![32, 24]);
        for request in dev.put_requests() {
            assert!(request.activate_flags().contains(ActivateFlags::FORCE));
        }
    }

    #[test]
    fn visual_below_sixteen_bits_is_rejected() {
        let mut dev = MockFbdev::truecolor(2, 2, 2, 8, [Bitfield::new(0, 3); 4]);
        match query_device(&mut dev) {
            Err(FbError::UnsupportedVisual { bits_per_pixel, .. }) => assert_eq!(bits_per_pixel, 8),
            other => panic!("expected UnsupportedVisual, got {:?}", other),
        }
    }

    #[test]
    fn query_failure_keeps_os_error() {
        let mut dev = MockFbdev::xrgb8888(2, 2, 2).failing_queries();
        let err = query_device(&mut dev).expect_err("query must fail");
        assert!(matches!(err, FbError::QueryFailed(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
    }

    #[test]
    fn short_line_length_is_rejected() {
        let mut dev = MockFbdev::xrgb8888(4, 2, 2);
        assert!(matches!(query_device(&mut dev), Err(FbError::QueryFailed(_))));
    }
}
