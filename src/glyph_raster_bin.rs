//! Binary raster glyphs.
//!
//! Extracts 1-bit glyph masks from packed raster font data, and embeds the
//! 5x7 monospace face the Binary stamp draws with.
//!
//! Font data format:
//! - Byte 0: height
//! - Byte 1: baseline
//! - Byte 2: start_char (first ASCII code)
//! - Byte 3: num_chars
//! - Bytes 4..4+num_chars*2: glyph offset table (little-endian u16)
//! - Remaining bytes: per glyph a width byte, then rows bottom-to-top,
//!   1 bit per pixel, most significant bit first

use std::sync::LazyLock;

use crate::color::Rgba8;
use crate::rendering_buffer::RenderingBuffer;

// ============================================================================
// GlyphMask
// ============================================================================

/// Coverage of a single glyph, rows top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl GlyphMask {
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[(y * self.width + x) as usize]
    }

    /// Number of set pixels.
    pub fn ink(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// One buffer pixel per glyph pixel, painted in `color`.
    pub fn to_buffer(&self, color: &Rgba8) -> RenderingBuffer {
        let p = color.premultiplied();
        let mut rb = RenderingBuffer::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    rb.pix_mut(x, y).copy_from_slice(&[p.r, p.g, p.b, p.a]);
                }
            }
        }
        rb
    }
}

// ============================================================================
// GlyphRasterBin
// ============================================================================

/// Reader over packed raster font data. Truncated or malformed data yields
/// `None` rather than panicking.
pub struct GlyphRasterBin<'a> {
    font: &'a [u8],
}

impl<'a> GlyphRasterBin<'a> {
    pub fn new(font: &'a [u8]) -> Self {
        Self { font }
    }

    /// Font height in pixels.
    pub fn height(&self) -> u32 {
        self.font.first().copied().unwrap_or(0) as u32
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyph_start(ch).is_some()
    }

    /// Total advance of a string; characters outside the font are skipped.
    pub fn width(&self, s: &str) -> u32 {
        s.chars()
            .filter_map(|ch| self.glyph_start(ch))
            .filter_map(|start| self.font.get(start).copied())
            .map(u32::from)
            .sum()
    }

    /// Extract the mask for `ch`.
    pub fn prepare(&self, ch: char) -> Option<GlyphMask> {
        let start = self.glyph_start(ch)?;
        let width = *self.font.get(start)? as u32;
        let height = self.height();
        let byte_width = ((width + 7) >> 3) as usize;
        let rows = self.font.get(start + 1..start + 1 + byte_width * height as usize)?;

        let mut bits = vec![false; (width * height) as usize];
        for i in 0..height {
            // Rows are stored bottom-to-top.
            let src = &rows[(height - i - 1) as usize * byte_width..][..byte_width];
            for x in 0..width {
                let byte = src[(x >> 3) as usize];
                bits[(i * width + x) as usize] = byte & (0x80 >> (x & 7)) != 0;
            }
        }
        Some(GlyphMask {
            width,
            height,
            bits,
        })
    }

    fn glyph_start(&self, ch: char) -> Option<usize> {
        let start_char = *self.font.get(2)? as u32;
        let num_chars = *self.font.get(3)? as u32;
        let code = ch as u32;
        if code < start_char || code >= start_char + num_chars {
            return None;
        }
        let at = 4 + (code - start_char) as usize * 2;
        let offset = u16::from_le_bytes([*self.font.get(at)?, *self.font.get(at + 1)?]);
        Some(4 + num_chars as usize * 2 + offset as usize)
    }
}

// ============================================================================
// Embedded 5x7 monospace font (printable ASCII)
// ============================================================================

const MONO_START: u8 = b' ';
const MONO_END: u8 = b'~';
const MONO_HEIGHT: usize = 7;
const MONO_WIDTH: u8 = 5;

/// Glyph rows top-down. Space is the only code without an entry.
#[rustfmt::skip]
const MONO_ROWS: &[(u8, [&str; MONO_HEIGHT])] = &[
    (b'!', ["  #  ", "  #  ", "  #  ", "  #  ", "  #  ", "     ", "  #  "]),
    (b'"', [" # # ", " # # ", "     ", "     ", "     ", "     ", "     "]),
    (b'#', [" # # ", " # # ", "#####", " # # ", "#####", " # # ", " # # "]),
    (b'$', ["  #  ", " ####", "# #  ", " ### ", "  # #", "#### ", "  #  "]),
    (b'%', ["##   ", "##  #", "   # ", "  #  ", " #   ", "#  ##", "   ##"]),
    (b'&', [" ##  ", "#  # ", "# #  ", " #   ", "# # #", "#  # ", " ## #"]),
    (b'\'', ["  #  ", "  #  ", "     ", "     ", "     ", "     ", "     "]),
    (b'(', ["   # ", "  #  ", " #   ", " #   ", " #   ", "  #  ", "   # "]),
    (b')', [" #   ", "  #  ", "   # ", "   # ", "   # ", "  #  ", " #   "]),
    (b'*', ["     ", "  #  ", "# # #", " ### ", "# # #", "  #  ", "     "]),
    (b'+', ["     ", "  #  ", "  #  ", "#####", "  #  ", "  #  ", "     "]),
    (b',', ["     ", "     ", "     ", "     ", " ##  ", "  #  ", " #   "]),
    (b'-', ["     ", "     ", "     ", "#####", "     ", "     ", "     "]),
    (b'.', ["     ", "     ", "     ", "     ", "     ", " ##  ", " ##  "]),
    (b'/', ["     ", "    #", "   # ", "  #  ", " #   ", "#    ", "     "]),
    (b'0', [" ### ", "#   #", "#  ##", "# # #", "##  #", "#   #", " ### "]),
    (b'1', ["  #  ", " ##  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "]),
    (b'2', [" ### ", "#   #", "    #", "   # ", "  #  ", " #   ", "#####"]),
    (b'3', ["#####", "   # ", "  #  ", "   # ", "    #", "#   #", " ### "]),
    (b'4', ["   # ", "  ## ", " # # ", "#  # ", "#####", "   # ", "   # "]),
    (b'5', ["#####", "#    ", "#### ", "    #", "    #", "#   #", " ### "]),
    (b'6', ["  ## ", " #   ", "#    ", "#### ", "#   #", "#   #", " ### "]),
    (b'7', ["#####", "    #", "   # ", "  #  ", " #   ", " #   ", " #   "]),
    (b'8', [" ### ", "#   #", "#   #", " ### ", "#   #", "#   #", " ### "]),
    (b'9', [" ### ", "#   #", "#   #", " ####", "    #", "   # ", " ##  "]),
    (b':', ["     ", " ##  ", " ##  ", "     ", " ##  ", " ##  ", "     "]),
    (b';', ["     ", " ##  ", " ##  ", "     ", " ##  ", "  #  ", " #   "]),
    (b'<', ["   # ", "  #  ", " #   ", "#    ", " #   ", "  #  ", "   # "]),
    (b'=', ["     ", "     ", "#####", "     ", "#####", "     ", "     "]),
    (b'>', [" #   ", "  #  ", "   # ", "    #", "   # ", "  #  ", " #   "]),
    (b'?', [" ### ", "#   #", "    #", "   # ", "  #  ", "     ", "  #  "]),
    (b'@', [" ### ", "#   #", "    #", " ## #", "# # #", "# # #", " ### "]),
    (b'A', [" ### ", "#   #", "#   #", "#####", "#   #", "#   #", "#   #"]),
    (b'B', ["#### ", "#   #", "#   #", "#### ", "#   #", "#   #", "#### "]),
    (b'C', [" ### ", "#   #", "#    ", "#    ", "#    ", "#   #", " ### "]),
    (b'D', ["#### ", "#   #", "#   #", "#   #", "#   #", "#   #", "#### "]),
    (b'E', ["#####", "#    ", "#    ", "#### ", "#    ", "#    ", "#####"]),
    (b'F', ["#####", "#    ", "#    ", "#### ", "#    ", "#    ", "#    "]),
    (b'G', [" ### ", "#   #", "#    ", "# ###", "#   #", "#   #", " ####"]),
    (b'H', ["#   #", "#   #", "#   #", "#####", "#   #", "#   #", "#   #"]),
    (b'I', [" ### ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "]),
    (b'J', ["  ###", "   # ", "   # ", "   # ", "   # ", "#  # ", " ##  "]),
    (b'K', ["#   #", "#  # ", "# #  ", "##   ", "# #  ", "#  # ", "#   #"]),
    (b'L', ["#    ", "#    ", "#    ", "#    ", "#    ", "#    ", "#####"]),
    (b'M', ["#   #", "## ##", "# # #", "# # #", "#   #", "#   #", "#   #"]),
    (b'N', ["#   #", "#   #", "##  #", "# # #", "#  ##", "#   #", "#   #"]),
    (b'O', [" ### ", "#   #", "#   #", "#   #", "#   #", "#   #", " ### "]),
    (b'P', ["#### ", "#   #", "#   #", "#### ", "#    ", "#    ", "#    "]),
    (b'Q', [" ### ", "#   #", "#   #", "#   #", "# # #", "#  # ", " ## #"]),
    (b'R', ["#### ", "#   #", "#   #", "#### ", "# #  ", "#  # ", "#   #"]),
    (b'S', [" ####", "#    ", "#    ", " ### ", "    #", "    #", "#### "]),
    (b'T', ["#####", "  #  ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  "]),
    (b'U', ["#   #", "#   #", "#   #", "#   #", "#   #", "#   #", " ### "]),
    (b'V', ["#   #", "#   #", "#   #", "#   #", "#   #", " # # ", "  #  "]),
    (b'W', ["#   #", "#   #", "#   #", "# # #", "# # #", "# # #", " # # "]),
    (b'X', ["#   #", "#   #", " # # ", "  #  ", " # # ", "#   #", "#   #"]),
    (b'Y', ["#   #", "#   #", " # # ", "  #  ", "  #  ", "  #  ", "  #  "]),
    (b'Z', ["#####", "    #", "   # ", "  #  ", " #   ", "#    ", "#####"]),
    (b'[', [" ### ", " #   ", " #   ", " #   ", " #   ", " #   ", " ### "]),
    (b'\\', ["     ", "#    ", " #   ", "  #  ", "   # ", "    #", "     "]),
    (b']', [" ### ", "   # ", "   # ", "   # ", "   # ", "   # ", " ### "]),
    (b'^', ["  #  ", " # # ", "#   #", "     ", "     ", "     ", "     "]),
    (b'_', ["     ", "     ", "     ", "     ", "     ", "     ", "#####"]),
    (b'`', [" #   ", "  #  ", "     ", "     ", "     ", "     ", "     "]),
    (b'a', ["     ", "     ", " ### ", "    #", " ####", "#   #", " ####"]),
    (b'b', ["#    ", "#    ", "# ## ", "##  #", "#   #", "#   #", "#### "]),
    (b'c', ["     ", "     ", " ### ", "#    ", "#    ", "#   #", " ### "]),
    (b'd', ["    #", "    #", " ## #", "#  ##", "#   #", "#   #", " ####"]),
    (b'e', ["     ", "     ", " ### ", "#   #", "#####", "#    ", " ### "]),
    (b'f', ["  ## ", " #  #", " #   ", "###  ", " #   ", " #   ", " #   "]),
    (b'g', ["     ", " ####", "#   #", "#   #", " ####", "    #", " ### "]),
    (b'h', ["#    ", "#    ", "# ## ", "##  #", "#   #", "#   #", "#   #"]),
    (b'i', ["  #  ", "     ", " ##  ", "  #  ", "  #  ", "  #  ", " ### "]),
    (b'j', ["   # ", "     ", "  ## ", "   # ", "   # ", "#  # ", " ##  "]),
    (b'k', ["#    ", "#    ", "#  # ", "# #  ", "##   ", "# #  ", "#  # "]),
    (b'l', [" ##  ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "]),
    (b'm', ["     ", "     ", "## # ", "# # #", "# # #", "#   #", "#   #"]),
    (b'n', ["     ", "     ", "# ## ", "##  #", "#   #", "#   #", "#   #"]),
    (b'o', ["     ", "     ", " ### ", "#   #", "#   #", "#   #", " ### "]),
    (b'p', ["     ", "     ", "#### ", "#   #", "#### ", "#    ", "#    "]),
    (b'q', ["     ", "     ", " ## #", "#  ##", " ####", "    #", "    #"]),
    (b'r', ["     ", "     ", "# ## ", "##  #", "#    ", "#    ", "#    "]),
    (b's', ["     ", "     ", " ### ", "#    ", " ### ", "    #", "#### "]),
    (b't', [" #   ", " #   ", "###  ", " #   ", " #   ", " #  #", "  ## "]),
    (b'u', ["     ", "     ", "#   #", "#   #", "#   #", "#  ##", " ## #"]),
    (b'v', ["     ", "     ", "#   #", "#   #", "#   #", " # # ", "  #  "]),
    (b'w', ["     ", "     ", "#   #", "#   #", "# # #", "# # #", " # # "]),
    (b'x', ["     ", "     ", "#   #", " # # ", "  #  ", " # # ", "#   #"]),
    (b'y', ["     ", "     ", "#   #", "#   #", " ####", "    #", " ### "]),
    (b'z', ["     ", "     ", "#####", "   # ", "  #  ", " #   ", "#####"]),
    (b'{', ["   # ", "  #  ", "  #  ", " #   ", "  #  ", "  #  ", "   # "]),
    (b'|', ["  #  ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  ", "  #  "]),
    (b'}', [" #   ", "  #  ", "  #  ", "   # ", "  #  ", "  #  ", " #   "]),
    (b'~', ["     ", "     ", " #   ", "# # #", "   # ", "     ", "     "]),
];

/// Packed 5x7 monospace font covering `' '..='~'`.
pub static MONO_5X7: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let num_chars = (MONO_END - MONO_START + 1) as usize;
    let glyph_len = 1 + MONO_HEIGHT;
    let mut font = vec![MONO_HEIGHT as u8, 0, MONO_START, num_chars as u8];
    for i in 0..num_chars {
        font.extend_from_slice(&((i * glyph_len) as u16).to_le_bytes());
    }
    for code in MONO_START..=MONO_END {
        font.push(MONO_WIDTH);
        let rows = MONO_ROWS.iter().find(|(c, _)| *c == code).map(|(_, r)| r);
        for i in (0..MONO_HEIGHT).rev() {
            let byte = rows.map_or(0u8, |r| {
                r[i].bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'#')
                    .fold(0u8, |acc, (x, _)| acc | (0x80 >> x))
            });
            font.push(byte);
        }
    }
    font
});

#[cfg(test)]
mod tests {
    use super::*;

    // height=2, baseline=0, start_char='A', num_chars=1; glyph 'A' is two
    // pixels wide with rows (bottom-to-top) 0b11 and 0b01.
    fn make_test_font() -> Vec<u8> {
        vec![2, 0, 65, 1, 0, 0, 2, 0b1100_0000, 0b0100_0000]
    }

    #[test]
    fn test_font_properties() {
        let font = make_test_font();
        let glyphs = GlyphRasterBin::new(&font);
        assert_eq!(glyphs.height(), 2);
        assert_eq!(glyphs.width("AA"), 4);
        assert_eq!(glyphs.width("Az"), 2);
    }

    #[test]
    fn test_prepare_flips_rows() {
        let font = make_test_font();
        let mask = GlyphRasterBin::new(&font).prepare('A').unwrap();
        assert_eq!((mask.width, mask.height), (2, 2));
        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(0, 1));
        assert!(mask.get(1, 1));
        assert_eq!(mask.ink(), 3);
    }

    #[test]
    fn test_missing_and_truncated() {
        let font = make_test_font();
        assert!(GlyphRasterBin::new(&font).prepare('B').is_none());
        let truncated = &font[..7];
        assert!(GlyphRasterBin::new(truncated).prepare('A').is_none());
        assert!(GlyphRasterBin::new(&[]).prepare('A').is_none());
    }

    #[test]
    fn test_embedded_digits() {
        let glyphs = GlyphRasterBin::new(&MONO_5X7);
        assert_eq!(glyphs.height(), 7);
        let one = glyphs.prepare('1').unwrap();
        assert_eq!(one.width, 5);
        // "  #  " top row, " ### " bottom row
        assert!(one.get(2, 0));
        assert!(!one.get(0, 0));
        assert!(one.get(1, 6) && one.get(2, 6) && one.get(3, 6));
        let zero = glyphs.prepare('0').unwrap();
        assert!(zero.ink() > one.ink());
    }

    #[test]
    fn test_embedded_printable_ascii() {
        let glyphs = GlyphRasterBin::new(&MONO_5X7);
        for code in 0x21u8..=0x7e {
            let ch = code as char;
            assert!(glyphs.prepare(ch).unwrap().ink() > 0, "{ch:?} has no ink");
        }
        assert_eq!(glyphs.prepare(' ').unwrap().ink(), 0);
        assert_ne!(glyphs.prepare('a'), glyphs.prepare('A'));
        assert!(glyphs.has_glyph('~'));
        assert!(!glyphs.has_glyph('\u{7f}'));
        assert!(!glyphs.has_glyph('é'));
    }

    #[test]
    fn test_mask_to_buffer() {
        let glyphs = GlyphRasterBin::new(&MONO_5X7);
        let rb = glyphs.prepare('1').unwrap().to_buffer(&Rgba8::new_opaque(0, 255, 0));
        assert_eq!(rb.pix(2, 0), &[0, 255, 0, 255]);
        assert_eq!(rb.pix(0, 0), &[0, 0, 0, 0]);
    }
}
