// src/fbdev/mod.rs

//! The OS seam between the compositor and a framebuffer device.
//!
//! `FramebufferBackend` exposes exactly the primitives negotiation needs: the
//! three mode ioctls and a shared writable mapping. `linux::LinuxFbdev` talks
//! to a real `/dev/fbN` node; `mock::MockFbdev` keeps everything in memory.

pub mod linux;
pub mod mock;
pub mod mode;

use std::io;
use std::ops::DerefMut;
use std::path::Path;

pub use mode::{ActivateFlags, Bitfield, FixScreenInfo, VarScreenInfo, FB_VISUAL_TRUECOLOR};

/// Default device node when none is configured.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/fb0";

/// An open framebuffer device handle.
pub trait FramebufferBackend {
    /// Writable view of the device's pixel memory.
    type Mapping: DerefMut<Target = [u8]>;

    /// Opens the device node for reading and writing.
    fn open(path: &Path) -> io::Result<Self>
    where
        Self: Sized;

    /// Reads the current variable mode (`FBIOGET_VSCREENINFO`).
    fn var_screeninfo(&mut self) -> io::Result<VarScreenInfo>;

    /// Reads the fixed mode (`FBIOGET_FSCREENINFO`).
    fn fix_screeninfo(&mut self) -> io::Result<FixScreenInfo>;

    /// Applies a variable mode (`FBIOPUT_VSCREENINFO`).
    fn put_var_screeninfo(&mut self, info: &VarScreenInfo) -> io::Result<()>;

    /// Maps `len` bytes of device memory as a shared writable region.
    fn map(&mut self, len: usize) -> io::Result<Self::Mapping>;
}
