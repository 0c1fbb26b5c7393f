//! Rendering buffer: an owned, row-oriented RGBA32 pixel store.
//!
//! Pixels are four bytes (R, G, B, A) with premultiplied alpha, rows are
//! stored top-down with a fixed stride. Both the host's drawing target and
//! the brush engine's private stamp buffer use this type.

pub const BPP: usize = 4;

/// Owned RGBA32 premultiplied pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl RenderingBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * BPP;
        Self {
            data: vec![0; stride * height as usize],
            width,
            height,
            stride,
        }
    }

    /// Wrap existing premultiplied RGBA bytes. Returns `None` if the length
    /// does not match `width * height * 4`.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let stride = width as usize * BPP;
        if data.len() != stride * height as usize {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns `true` if (x, y) addresses a pixel inside the buffer.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// The four bytes of pixel (x, y). Caller guarantees bounds.
    #[inline]
    pub fn pix(&self, x: u32, y: u32) -> &[u8] {
        let off = y as usize * self.stride + x as usize * BPP;
        &self.data[off..off + BPP]
    }

    #[inline]
    pub fn pix_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let off = y as usize * self.stride + x as usize * BPP;
        &mut self.data[off..off + BPP]
    }

    /// Fill every byte in the buffer with `value`.
    pub fn clear(&mut self, value: u8) {
        self.data.fill(value);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let rb = RenderingBuffer::new(4, 3);
        assert_eq!(rb.stride(), 16);
        assert_eq!(rb.data().len(), 48);
        assert!(rb.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(RenderingBuffer::from_vec(2, 2, vec![0; 16]).is_some());
        assert!(RenderingBuffer::from_vec(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_pixel_addressing() {
        let mut rb = RenderingBuffer::new(10, 10);
        rb.pix_mut(3, 5).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(rb.pix(3, 5), &[1, 2, 3, 4]);
        assert_eq!(rb.data()[5 * rb.stride() + 3 * BPP], 1);
        assert_eq!(rb.pix(3, 4), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_in_bounds() {
        let rb = RenderingBuffer::new(3, 2);
        assert!(rb.in_bounds(2, 1));
        assert!(!rb.in_bounds(3, 0));
        assert!(!rb.in_bounds(-1, 0));
    }
}
