//! Recursive (IIR) gaussian blur.
//!
//! Young-van Vliet recursive approximation: a forward and a backward
//! third-order filter per line, run over rows and then columns. Cost is
//! independent of the radius, which matters for the glow behind large
//! Binary stamps.

use crate::rendering_buffer::RenderingBuffer;

/// Radii below this leave the image untouched.
pub const MIN_BLUR_RADIUS: f64 = 0.62;

// ============================================================================
// Filter coefficients
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b: f64,
    b1: f64,
    b2: f64,
    b3: f64,
}

impl Coefficients {
    fn for_radius(radius: f64) -> Self {
        let s = radius * 0.5;
        let q = if s < 2.5 {
            3.97156 - 4.14554 * (1.0 - 0.26891 * s).sqrt()
        } else {
            0.98711 * s - 0.96330
        };
        let q2 = q * q;
        let q3 = q2 * q;

        let b0 = 1.0 / (1.578250 + 2.444130 * q + 1.428100 * q2 + 0.422205 * q3);
        let b1 = 2.44413 * q + 2.85619 * q2 + 1.26661 * q3;
        let b2 = -1.42810 * q2 - 1.26661 * q3;
        let b3 = 0.422205 * q3;
        Self {
            b: 1.0 - (b1 + b2 + b3) * b0,
            b1: b1 * b0,
            b2: b2 * b0,
            b3: b3 * b0,
        }
    }

    #[inline]
    fn calc(&self, c: &[f64; 4], p1: &[f64; 4], p2: &[f64; 4], p3: &[f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = self.b * c[i] + self.b1 * p1[i] + self.b2 * p2[i] + self.b3 * p3[i];
        }
        out
    }
}

/// Filter one line of pixels in place (forward then backward pass).
fn blur_line(k: &Coefficients, line: &mut [[f64; 4]], fwd: &mut Vec<[f64; 4]>) {
    let n = line.len();
    fwd.clear();
    fwd.resize(n, [0.0; 4]);

    fwd[0] = k.calc(&line[0], &line[0], &line[0], &line[0]);
    fwd[1] = k.calc(&line[1], &fwd[0], &fwd[0], &fwd[0]);
    fwd[2] = k.calc(&line[2], &fwd[1], &fwd[0], &fwd[0]);
    for x in 3..n {
        fwd[x] = k.calc(&line[x], &fwd[x - 1], &fwd[x - 2], &fwd[x - 3]);
    }

    let m = n - 1;
    line[m] = k.calc(&fwd[m], &fwd[m], &fwd[m], &fwd[m]);
    line[m - 1] = k.calc(&fwd[m - 1], &line[m], &line[m], &line[m]);
    line[m - 2] = k.calc(&fwd[m - 2], &line[m - 1], &line[m], &line[m]);
    for x in (0..m - 2).rev() {
        line[x] = k.calc(&fwd[x], &line[x + 1], &line[x + 2], &line[x + 3]);
    }
}

#[inline]
fn load(p: &[u8]) -> [f64; 4] {
    [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
}

#[inline]
fn store(v: &[f64; 4], p: &mut [u8]) {
    for i in 0..4 {
        p[i] = v[i].round().clamp(0.0, 255.0) as u8;
    }
}

// ============================================================================
// Public passes
// ============================================================================

/// Blur a premultiplied RGBA buffer in place, horizontally then vertically.
pub fn recursive_blur_rgba32(rbuf: &mut RenderingBuffer, radius: f64) {
    recursive_blur_rgba32_x(rbuf, radius);
    recursive_blur_rgba32_y(rbuf, radius);
}

/// Horizontal pass.
pub fn recursive_blur_rgba32_x(rbuf: &mut RenderingBuffer, radius: f64) {
    let (w, h) = (rbuf.width(), rbuf.height());
    if radius < MIN_BLUR_RADIUS || w < 3 {
        return;
    }
    let k = Coefficients::for_radius(radius);
    let mut line = vec![[0.0; 4]; w as usize];
    let mut scratch = Vec::with_capacity(w as usize);
    for y in 0..h {
        for x in 0..w {
            line[x as usize] = load(rbuf.pix(x, y));
        }
        blur_line(&k, &mut line, &mut scratch);
        for x in 0..w {
            store(&line[x as usize], rbuf.pix_mut(x, y));
        }
    }
}

/// Vertical pass.
pub fn recursive_blur_rgba32_y(rbuf: &mut RenderingBuffer, radius: f64) {
    let (w, h) = (rbuf.width(), rbuf.height());
    if radius < MIN_BLUR_RADIUS || h < 3 {
        return;
    }
    let k = Coefficients::for_radius(radius);
    let mut line = vec![[0.0; 4]; h as usize];
    let mut scratch = Vec::with_capacity(h as usize);
    for x in 0..w {
        for y in 0..h {
            line[y as usize] = load(rbuf.pix(x, y));
        }
        blur_line(&k, &mut line, &mut scratch);
        for y in 0..h {
            store(&line[y as usize], rbuf.pix_mut(x, y));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(size: u32) -> RenderingBuffer {
        let mut rb = RenderingBuffer::new(size, size);
        let c = size / 2;
        rb.pix_mut(c, c).copy_from_slice(&[255, 255, 255, 255]);
        rb
    }

    #[test]
    fn test_small_radius_is_noop() {
        let mut rb = dot(9);
        let before = rb.clone();
        recursive_blur_rgba32(&mut rb, 0.5);
        assert_eq!(rb, before);
    }

    #[test]
    fn test_blur_spreads_energy() {
        let mut rb = dot(21);
        recursive_blur_rgba32(&mut rb, 4.0);
        assert!(rb.pix(10, 10)[3] < 255);
        assert!(rb.pix(12, 10)[3] > 0);
        assert!(rb.pix(10, 12)[3] > 0);
    }

    #[test]
    fn test_blur_is_symmetric() {
        let mut rb = dot(21);
        recursive_blur_rgba32(&mut rb, 3.0);
        let left = rb.pix(8, 10)[3] as i32;
        let right = rb.pix(12, 10)[3] as i32;
        assert!((left - right).abs() <= 1, "{left} vs {right}");
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let mut rb = RenderingBuffer::new(10, 10);
        rb.clear(100);
        recursive_blur_rgba32(&mut rb, 5.0);
        for &b in rb.data() {
            assert!((99..=101).contains(&b));
        }
    }

    #[test]
    fn test_narrow_buffer_skips_pass() {
        let mut rb = RenderingBuffer::new(2, 2);
        rb.clear(50);
        recursive_blur_rgba32(&mut rb, 3.0);
        assert!(rb.data().iter().all(|&b| b == 50));
    }
}
