// src/fbdev/linux.rs

//! `FramebufferBackend` for Linux fbdev nodes, using the mode ioctls from
//! `<linux/fb.h>` and a `MAP_SHARED` mapping of the device memory.

use super::mode::{FixScreenInfo, VarScreenInfo};
use super::FramebufferBackend;

use log::{debug, trace, warn};
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::{Deref, DerefMut};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOPUT_VSCREENINFO: libc::c_ulong = 0x4601;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

nix::ioctl_read_bad!(fbioget_vscreeninfo, FBIOGET_VSCREENINFO, VarScreenInfo);
// The kernel writes the adjusted mode back into the caller's struct.
nix::ioctl_readwrite_bad!(fbioput_vscreeninfo, FBIOPUT_VSCREENINFO, VarScreenInfo);
nix::ioctl_read_bad!(fbioget_fscreeninfo, FBIOGET_FSCREENINFO, FixScreenInfo);

/// An open `/dev/fbN` device.
#[derive(Debug)]
pub struct LinuxFbdev {
    path: PathBuf,
    file: File,
}

impl LinuxFbdev {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FramebufferBackend for LinuxFbdev {
    type Mapping = MmapRegion;

    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!(
            "LinuxFbdev: opened {} as fd {}",
            path.display(),
            file.as_raw_fd()
        );
        Ok(LinuxFbdev {
            path: path.to_path_buf(),
            file,
        })
    }

    fn var_screeninfo(&mut self) -> io::Result<VarScreenInfo> {
        let mut info = VarScreenInfo::default();
        // SAFETY: `info` is a properly sized and aligned fb_var_screeninfo.
        unsafe { fbioget_vscreeninfo(self.file.as_raw_fd(), &mut info) }?;
        trace!("LinuxFbdev: {} FBIOGET_VSCREENINFO -> {:?}", self.path().display(), info);
        Ok(info)
    }

    fn fix_screeninfo(&mut self) -> io::Result<FixScreenInfo> {
        let mut info = FixScreenInfo::default();
        // SAFETY: `info` is a properly sized and aligned fb_fix_screeninfo.
        unsafe { fbioget_fscreeninfo(self.file.as_raw_fd(), &mut info) }?;
        trace!("LinuxFbdev: {} FBIOGET_FSCREENINFO -> {:?}", self.path().display(), info);
        Ok(info)
    }

    fn put_var_screeninfo(&mut self, info: &VarScreenInfo) -> io::Result<()> {
        let mut request = *info;
        // SAFETY: `request` is a properly sized and aligned fb_var_screeninfo
        // owned by this frame for the duration of the call.
        unsafe { fbioput_vscreeninfo(self.file.as_raw_fd(), &mut request) }?;
        trace!(
            "LinuxFbdev: {} FBIOPUT_VSCREENINFO bpp={} activate={:#x}",
            self.path().display(),
            request.bits_per_pixel,
            request.activate
        );
        Ok(())
    }

    fn map(&mut self, len: usize) -> io::Result<MmapRegion> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "refusing to map a zero-length framebuffer",
            ));
        }

        // SAFETY: we request a fresh mapping chosen by the kernel; the fd is
        // valid for the duration of the call and the mapping outlives it.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(addr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;
        debug!(
            "LinuxFbdev: mapped {} bytes of {} at {:p}",
            len,
            self.path().display(),
            ptr
        );
        Ok(MmapRegion { ptr, len })
    }
}

/// A shared mapping of framebuffer memory, unmapped on drop.
#[derive(Debug)]
pub struct MmapRegion {
    ptr: NonNull<u8>,
    len: usize,
}

impl Deref for MmapRegion {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` points at `len` mapped bytes owned by this region.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for MmapRegion {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        // SAFETY: the region was created by a successful mmap of `len` bytes.
        if unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) } == -1 {
            warn!(
                "Failed to unmap framebuffer region of {} bytes: {}",
                self.len,
                io::Error::last_os_error()
            );
        } else {
            debug!("Unmapped framebuffer region of {} bytes", self.len);
        }
    }
}
