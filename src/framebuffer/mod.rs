// src/framebuffer/mod.rs

//! The compositing core: a negotiated framebuffer device, its shadow buffer
//! and the pending dirty region that the next flush copies out.
//!
//! `Framebuffer` is single-threaded by construction. Sharing one across
//! threads needs external synchronization around the fill/flush cycle.

mod flush;
mod negotiate;
mod shadow;


pub use flush::{FlushStrategy, FlushTarget};
pub use negotiate::{query_device, Channel, DeviceGeometry, PixelLayout, CANDIDATE_DEPTHS};
pub use shadow::ShadowBuffer;

use crate::error::{FbError, Result};
use crate::fbdev::{FramebufferBackend, DEFAULT_DEVICE_PATH};
use crate::geometry::Area;

use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// One framebuffer device and everything needed to paint it.
pub struct Framebuffer<B: FramebufferBackend> {
    device_path: PathBuf,
    backend: Option<B>,
    mapping: Option<B::Mapping>,
    area: Area,
    layout: PixelLayout,
    row_stride: usize,
    map_len: usize,
    shadow: ShadowBuffer,
    pending: Area,
    strategy: FlushStrategy,
    pause_count: u32,
}

impl<B: FramebufferBackend> Framebuffer<B> {
    /// An unopened framebuffer for `device_path` (default `/dev/fb0`).
    pub fn new(device_path: Option<&Path>) -> Self {
        Framebuffer {
            device_path: device_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE_PATH)),
            backend: None,
            mapping: None,
            area: Area::EMPTY,
            layout: PixelLayout::default(),
            row_stride: 0,
            map_len: 0,
            shadow: ShadowBuffer::default(),
            pending: Area::EMPTY,
            strategy: FlushStrategy::default(),
            pause_count: 0,
        }
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some() && self.mapping.is_some()
    }

    /// Opens the configured device node, then negotiates and maps it.
    ///
    /// A node that cannot be opened leaves the framebuffer closed, even if a
    /// previous device was open.
    pub fn open(&mut self) -> Result<()> {
        let backend = match B::open(&self.device_path) {
            Ok(backend) => backend,
            Err(source) => {
                self.close();
                return Err(FbError::DeviceUnavailable {
                    path: self.device_path.clone(),
                    source,
                });
            }
        };
        self.open_with(backend)
    }

    /// Negotiates and maps an already opened device handle.
    ///
    /// On failure the framebuffer is left closed and the error carries the
    /// OS error that caused it.
    pub fn open_with(&mut self, mut backend: B) -> Result<()> {
        if self.is_open() {
            debug!("Reopening {}", self.device_path.display());
            self.close();
        }

        let geometry = match query_device(&mut backend) {
            Ok(geometry) => geometry,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        let mapping = match backend.map(geometry.map_len) {
            Ok(mapping) => mapping,
            Err(source) => {
                self.close();
                return Err(FbError::MapFailed(source));
            }
        };

        self.area = geometry.area;
        self.layout = geometry.layout;
        self.row_stride = geometry.row_stride;
        self.map_len = geometry.map_len;
        self.strategy = geometry.strategy;
        self.shadow
            .reset(geometry.area.width as usize, geometry.area.height as usize);
        self.pending = Area::EMPTY;
        self.backend = Some(backend);
        self.mapping = Some(mapping);

        info!(
            "Opened {} ({} bytes mapped)",
            self.device_path.display(),
            self.map_len
        );
        Ok(())
    }

    /// Unmaps and closes the device. The configured path survives; the
    /// shadow buffer is kept until the next open or drop.
    pub fn close(&mut self) {
        let was_open = self.is_open();
        self.mapping = None;
        self.backend = None;
        self.area = Area::EMPTY;
        self.layout = PixelLayout::default();
        self.row_stride = 0;
        self.map_len = 0;
        self.pending = Area::EMPTY;
        if was_open {
            info!("Closed {}", self.device_path.display());
        }
    }

    /// Visible area as the device reports it, pan offset included.
    pub fn size(&self) -> Area {
        self.area
    }

    /// Visible area in shadow/device-memory coordinates.
    pub fn bounds(&self) -> Area {
        Area::with_size(self.area.width, self.area.height)
    }

    pub fn pixel_layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn flush_strategy(&self) -> FlushStrategy {
        self.strategy
    }

    /// Overrides the strategy picked at open time. `Fast` is only honoured
    /// for `x8r8g8b8` devices.
    pub fn set_flush_strategy(&mut self, strategy: FlushStrategy) {
        if strategy == FlushStrategy::Fast && !self.layout.is_xrgb8888() {
            warn!("Fast flush requested for {:?}; keeping generic", self.layout);
            self.strategy = FlushStrategy::Generic;
            return;
        }
        self.strategy = strategy;
    }

    /// Region written since the last flush. Any `width == 0` value means
    /// nothing is pending.
    pub fn pending_area(&self) -> Area {
        self.pending
    }

    pub fn shadow(&self) -> &ShadowBuffer {
        &self.shadow
    }

    /// Mapped device memory, if open.
    pub fn mapped(&self) -> Option<&[u8]> {
        self.mapping.as_deref()
    }

    pub fn pause_count(&self) -> u32 {
        self.pause_count
    }

    pub fn is_paused(&self) -> bool {
        self.pause_count > 0
    }

    /// Defers flushing until a matching `resume`.
    pub fn pause(&mut self) {
        self.pause_count += 1;
        debug!("Flush paused (depth {})", self.pause_count);
    }

    /// Undoes one `pause`. Pending pixels are *not* flushed automatically;
    /// call `flush` once the count reaches zero.
    pub fn resume(&mut self) {
        if self.pause_count == 0 {
            warn!("resume() without matching pause()");
            return;
        }
        self.pause_count -= 1;
        debug!("Flush resumed (depth {})", self.pause_count);
    }

    /// Writes ARGB32 `data` into the shadow buffer over `region` (the whole
    /// visible area when `None`) and flushes.
    ///
    /// `data` is row-major with `region.width` pixels per row. `(x, y)` is a
    /// source offset: the region's first pixel is read from column `x` of row
    /// `y` of `data`. The pixels always land in the shadow at `region`'s own
    /// position, whatever the offset. Pixels falling outside the visible area
    /// are dropped.
    pub fn fill(&mut self, region: Option<Area>, x: u64, y: u64, data: &[u32]) -> Result<()> {
        if !self.is_open() {
            return Err(FbError::NotOpen);
        }
        let region = region.unwrap_or_else(|| self.bounds());

        if region.width > 0 && region.height > 0 {
            let expected = y
                .checked_add(region.height - 1)
                .and_then(|rows| rows.checked_mul(region.width))
                .and_then(|n| n.checked_add(x))
                .and_then(|n| n.checked_add(region.width))
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(usize::MAX);
            if data.len() < expected {
                return Err(FbError::PixelDataTooShort {
                    expected,
                    actual: data.len(),
                });
            }
        }

        let cropped = region.intersect(&self.bounds());
        if !cropped.is_empty() && cropped.height > 0 {
            let skip_cols = cropped.x.abs_diff(region.x);
            for row in cropped.y..cropped.bottom() {
                let data_row = y + row.abs_diff(region.y);
                let start = (region.width * data_row + x + skip_cols) as usize;
                let src = &data[start..start + cropped.width as usize];
                self.shadow.write_row(cropped.x as usize, row as usize, src);
            }
            self.pending = self.pending.union(&cropped);
        }

        self.flush()
    }

    /// Copies the pending region to device memory. A no-op while paused.
    pub fn flush(&mut self) -> Result<()> {
        if self.is_paused() {
            return Ok(());
        }
        let memory = self.mapping.as_deref_mut().ok_or(FbError::NotOpen)?;

        self.strategy.flush(
            &self.shadow,
            self.pending,
            FlushTarget {
                memory,
                row_stride: self.row_stride,
                layout: &self.layout,
            },
        );

        // Parked at the far corner with no extent: nothing pending.
        self.pending = Area::new(
            self.area.width as i64 - 1,
            self.area.height as i64 - 1,
            0,
            0,
        );
        Ok(())
    }
}

impl<B: FramebufferBackend> Drop for Framebuffer<B> {
    fn drop(&mut self) {
        if self.is_open() {
            self.close();
        }
    }
}

impl<B: FramebufferBackend> fmt::Debug for Framebuffer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("device_path", &self.device_path)
            .field("open", &self.is_open())
            .field("area", &self.area)
            .field("layout", &self.layout)
            .field("row_stride", &self.row_stride)
            .field("strategy", &self.strategy)
            .field("pending", &self.pending)
            .field("pause_count", &self.pause_count)
            .finish_non_exhaustive()
    }
}
