// src/framebuffer/shadow.rs

//! In-process mirror of the visible area, always `0xAARRGGBB`.

/// Row-major ARGB32 pixels sized to the device's visible area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowBuffer {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl ShadowBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        ShadowBuffer {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    /// Reallocates for a new visible area and clears every pixel to zero.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.pixels.clear();
        self.pixels.resize(width * height, 0);
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The same pixels viewed as native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<u32>()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// `len` pixels of row `y` starting at column `x`.
    ///
    /// # Panics
    /// Panics if the span leaves the buffer.
    pub fn row(&self, x: usize, y: usize, len: usize) -> &[u32] {
        let start = y * self.width + x;
        &self.pixels[start..start + len]
    }

    /// Copies `src` into row `y` starting at column `x`. The caller clips.
    ///
    /// # Panics
    /// Panics if the span leaves the buffer.
    pub fn write_row(&mut self, x: usize, y: usize, src: &[u32]) {
        let start = y * self.width + x;
        self.pixels[start..start + src.len()].copy_from_slice(src);
    }
}
