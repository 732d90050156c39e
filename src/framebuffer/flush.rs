// src/framebuffer/flush.rs

//! Copying the dirty part of the shadow buffer into device memory.

use super::negotiate::PixelLayout;
use super::shadow::ShadowBuffer;
use crate::geometry::Area;

use log::trace;

const ARGB32_BYTES: usize = 4;

/// How dirty pixels reach device memory. Chosen once, when the device opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushStrategy {
    /// Repack every pixel into the device layout, one row at a time.
    #[default]
    Generic,
    /// The device stores `x8r8g8b8` pixels: shadow bytes are copied verbatim.
    Fast,
}

/// Where and how to write device pixels.
#[derive(Debug)]
pub struct FlushTarget<'a> {
    pub memory: &'a mut [u8],
    pub row_stride: usize,
    pub layout: &'a PixelLayout,
}

impl FlushStrategy {
    /// Copies `dirty` (already clipped to the shadow buffer) to `target`.
    pub fn flush(self, shadow: &ShadowBuffer, dirty: Area, target: FlushTarget<'_>) {
        if dirty.is_empty() || dirty.height == 0 {
            return;
        }
        trace!("{:?} flush of {:?}", self, dirty);
        match self {
            FlushStrategy::Fast => flush_xrgb32(shadow, dirty, target.row_stride, target.memory),
            FlushStrategy::Generic => flush_generic(shadow, dirty, target),
        }
    }
}

fn flush_xrgb32(shadow: &ShadowBuffer, dirty: Area, row_stride: usize, memory: &mut [u8]) {
    let (x1, y1) = (dirty.x as usize, dirty.y as usize);
    let (width, height) = (dirty.width as usize, dirty.height as usize);
    let src = shadow.as_bytes();
    let mut dst_off = (y1 * row_stride + x1) * ARGB32_BYTES;
    let mut src_off = (y1 * shadow.width() + x1) * ARGB32_BYTES;

    // Full-stride rows are contiguous on both sides.
    if width == row_stride {
        let len = width * height * ARGB32_BYTES;
        memory[dst_off..dst_off + len].copy_from_slice(&src[src_off..src_off + len]);
        return;
    }

    let row_bytes = width * ARGB32_BYTES;
    for _ in 0..height {
        memory[dst_off..dst_off + row_bytes].copy_from_slice(&src[src_off..src_off + row_bytes]);
        dst_off += row_stride * ARGB32_BYTES;
        src_off += shadow.width() * ARGB32_BYTES;
    }
}

fn flush_generic(shadow: &ShadowBuffer, dirty: Area, target: FlushTarget<'_>) {
    let FlushTarget {
        memory,
        row_stride,
        layout,
    } = target;
    let bpp = layout.bytes_per_pixel;
    let (x1, y1) = (dirty.x as usize, dirty.y as usize);
    let width = dirty.width as usize;
    // Device pixels narrower than a word live in its low-order bytes.
    let skip = if cfg!(target_endian = "big") {
        ARGB32_BYTES - bpp
    } else {
        0
    };

    for row in y1..y1 + dirty.height as usize {
        let start = (row * row_stride + x1) * bpp;
        let dst = &mut memory[start..start + width * bpp];
        let src = shadow.row(x1, row, width);
        for (out, &argb) in dst.chunks_exact_mut(bpp).zip(src) {
            let bytes = layout.pack(argb).to_ne_bytes();
            out.copy_from_slice(&bytes[skip..skip + bpp]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::negotiate::Channel;

    fn layout(bpp: usize, channels: [(u32, u32); 4]) -> PixelLayout {
        let [r, g, b, a] = channels.map(|(offset, length)| Channel::new(offset, length));
        PixelLayout {
            bytes_per_pixel: bpp,
            red: r,
            green: g,
            blue: b,
            transp: a,
        }
    }

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn gradient_shadow(width: usize, height: usize) -> ShadowBuffer {
        let mut shadow = ShadowBuffer::new(width, height);
        for y in 0..height {
            let row: Vec<u32> = (0..width)
                .map(|x| 0xFF00_0000 | ((y as u32) << 16) | ((x as u32) << 8) | 0x40)
                .collect();
            shadow.write_row(0, y, &row);
        }
        shadow
    }

    #[test]
    fn fast_flush_full_stride_is_one_block() {
        let shadow = gradient_shadow(3, 3);
        let argb = layout(4, [(16, 8), (8, 8), (0, 8), (24, 8)]);
        let mut memory = vec![0u8; 3 * 3 * 4];
        FlushStrategy::Fast.flush(
            &shadow,
            Area::new(0, 1, 3, 2),
            FlushTarget {
                memory: &mut memory,
                row_stride: 3,
                layout: &argb,
            },
        );
        let out = words(&memory);
        assert_eq!(&out[..3], &[0, 0, 0]);
        assert_eq!(&out[3..], &shadow.pixels()[3..]);
    }

    #[test]
    fn fast_flush_honours_padding() {
        let shadow = gradient_shadow(3, 2);
        let argb = layout(4, [(16, 8), (8, 8), (0, 8), (24, 8)]);
        let mut memory = vec![0xEEu8; 2 * 5 * 4];
        FlushStrategy::Fast.flush(
            &shadow,
            Area::new(1, 0, 2, 2),
            FlushTarget {
                memory: &mut memory,
                row_stride: 5,
                layout: &argb,
            },
        );
        let out = words(&memory);
        let pad = u32::from_ne_bytes([0xEE; 4]);
        assert_eq!(out[0], pad);
        assert_eq!(&out[1..3], shadow.row(1, 0, 2));
        assert_eq!(&out[3..6], &[pad, pad, pad]);
        assert_eq!(&out[6..8], shadow.row(1, 1, 2));
        assert_eq!(out[8..], [pad, pad]);
    }

    #[test]
    fn generic_flush_repacks_bgr() {
        let mut shadow = ShadowBuffer::new(1, 1);
        shadow.write_row(0, 0, &[0xFF11_2233]);
        let bgr = layout(4, [(0, 8), (8, 8), (16, 8), (0, 0)]);
        let mut memory = vec![0u8; 4];
        FlushStrategy::Generic.flush(
            &shadow,
            Area::with_size(1, 1),
            FlushTarget {
                memory: &mut memory,
                row_stride: 1,
                layout: &bgr,
            },
        );
        assert_eq!(words(&memory), vec![0xFF33_2211]);
    }

    #[test]
    fn generic_flush_writes_two_byte_pixels() {
        let mut shadow = ShadowBuffer::new(2, 1);
        shadow.write_row(0, 0, &[0xFFFF_0000, 0xFF00_00FF]);
        let rgb565 = layout(2, [(11, 5), (5, 6), (0, 5), (0, 0)]);
        let mut memory = vec![0xEEu8; 3 * 2];
        FlushStrategy::Generic.flush(
            &shadow,
            Area::with_size(2, 1),
            FlushTarget {
                memory: &mut memory,
                row_stride: 3,
                layout: &rgb565,
            },
        );
        let mut expected = Vec::new();
        expected.extend_from_slice(&0xF800u16.to_ne_bytes());
        expected.extend_from_slice(&0x001Fu16.to_ne_bytes());
        expected.extend_from_slice(&[0xEE, 0xEE]);
        assert_eq!(memory, expected);
    }

    #[test]
    fn empty_area_writes_nothing() {
        let shadow = gradient_shadow(2, 2);
        let argb = layout(4, [(16, 8), (8, 8), (0, 8), (24, 8)]);
        let mut memory = vec![0u8; 16];
        FlushStrategy::Fast.flush(
            &shadow,
            Area::new(1, 1, 0, 0),
            FlushTarget {
                memory: &mut memory,
                row_stride: 2,
                layout: &argb,
            },
        );
        assert!(memory.iter().all(|&b| b == 0));
    }
}
