// src/fbdev/mode.rs

//! Mode descriptors exchanged with a framebuffer device.
//!
//! These mirror `struct fb_var_screeninfo` and `struct fb_fix_screeninfo`
//! from `<linux/fb.h>` field for field, so the Linux backend can hand them
//! straight to the mode ioctls.

use bitflags::bitflags;

/// `FB_VISUAL_TRUECOLOR`: each pixel's bits directly encode channel values.
pub const FB_VISUAL_TRUECOLOR: u32 = 2;
/// `FB_VISUAL_PSEUDOCOLOR`: pixels index a palette.
pub const FB_VISUAL_PSEUDOCOLOR: u32 = 3;

bitflags! {
    /// Values for `VarScreenInfo::activate`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActivateFlags: u32 {
        /// Apply the mode immediately. The kernel encodes this as zero.
        const NOW = 0;
        /// Apply on next open.
        const NXTOPEN = 1;
        /// Don't set, just validate.
        const TEST = 2;
        /// Apply even if the mode looks unchanged.
        const FORCE = 128;
    }
}

/// Position and width of one color channel inside a pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

impl Bitfield {
    pub const fn new(offset: u32, length: u32) -> Self {
        Bitfield {
            offset,
            length,
            msb_right: 0,
        }
    }
}

/// The variable (settable) part of a framebuffer mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarScreenInfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    pub transp: Bitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

impl VarScreenInfo {
    pub fn activate_flags(&self) -> ActivateFlags {
        ActivateFlags::from_bits_retain(self.activate)
    }

    pub fn set_activate_flags(&mut self, flags: ActivateFlags) {
        self.activate = flags.bits();
    }
}

/// The fixed (read-only) part of a framebuffer mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixScreenInfo {
    pub id: [libc::c_char; 16],
    pub smem_start: libc::c_ulong,
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: libc::c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

impl FixScreenInfo {
    pub fn is_truecolor(&self) -> bool {
        self.visual == FB_VISUAL_TRUECOLOR
    }

    /// Driver identification string, e.g. `"EFI VGA"`.
    pub fn id_string(&self) -> String {
        let bytes: Vec<u8> = self
            .id
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
