//! Brush shape textures and their asynchronous resolution.
//!
//! The host decodes images; the engine only tracks which ids it has asked
//! for and what came back. A slot starts `Pending` when a stroke first needs
//! it and moves to `Ready` or `Failed` when the host reports the result.

use std::collections::HashMap;

use tracing::warn;

use crate::color::Rgba8;
use crate::error::TextureError;
use crate::rendering_buffer::{RenderingBuffer, BPP};

/// A decoded brush texture, stored premultiplied.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    image: RenderingBuffer,
}

impl Texture {
    /// Build from straight-alpha RGBA bytes as image decoders produce them.
    pub fn from_rgba(id: &str, width: u32, height: u32, data: &[u8]) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * BPP;
        if data.len() != expected || width == 0 || height == 0 {
            return Err(TextureError::BadLength {
                id: id.to_string(),
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        let mut premul = Vec::with_capacity(expected);
        for px in data.chunks_exact(BPP) {
            let c = Rgba8::new(px[0] as u32, px[1] as u32, px[2] as u32, px[3] as u32).premultiplied();
            premul.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        let image = RenderingBuffer::from_vec(width, height, premul).ok_or_else(|| {
            TextureError::Decode(id.to_string(), "buffer size mismatch".to_string())
        })?;
        Ok(Self { image })
    }

    /// Wrap an already premultiplied buffer.
    pub fn from_buffer(image: RenderingBuffer) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RenderingBuffer {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextureSlot {
    Pending,
    Ready(Texture),
    Failed(TextureError),
}

/// Texture id to resolution state.
#[derive(Debug, Default)]
pub struct TextureCache {
    slots: HashMap<String, TextureSlot>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as wanted. Returns the slot, inserting `Pending` for ids
    /// never seen before.
    pub fn request(&mut self, id: &str) -> &TextureSlot {
        self.slots
            .entry(id.to_string())
            .or_insert(TextureSlot::Pending)
    }

    pub fn get(&self, id: &str) -> Option<&TextureSlot> {
        self.slots.get(id)
    }

    /// The texture for `id` if it decoded successfully.
    pub fn texture(&self, id: &str) -> Option<&Texture> {
        match self.slots.get(id) {
            Some(TextureSlot::Ready(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        matches!(self.slots.get(id), Some(TextureSlot::Pending))
    }

    /// Ids the host still has to decode.
    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|(_, s)| matches!(s, TextureSlot::Pending))
            .map(|(id, _)| id.as_str())
    }

    /// Record the host's decode result.
    pub fn resolve(&mut self, id: &str, result: Result<Texture, TextureError>) -> &TextureSlot {
        let slot = match result {
            Ok(t) => TextureSlot::Ready(t),
            Err(e) => {
                warn!(texture = id, error = %e, "texture failed, falling back to gradient stamp");
                TextureSlot::Failed(e)
            }
        };
        let entry = self
            .slots
            .entry(id.to_string())
            .or_insert(TextureSlot::Pending);
        *entry = slot;
        entry
    }

    pub fn remove(&mut self, id: &str) -> Option<TextureSlot> {
        self.slots.remove(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_premultiplies() {
        let t = Texture::from_rgba("dot", 1, 1, &[255, 0, 0, 128]).unwrap();
        assert_eq!(t.image().pix(0, 0), &[128, 0, 0, 128]);
        assert_eq!((t.width(), t.height()), (1, 1));
    }

    #[test]
    fn test_from_rgba_rejects_bad_length() {
        let err = Texture::from_rgba("bad", 2, 2, &[0; 15]).unwrap_err();
        assert!(matches!(err, TextureError::BadLength { expected: 16, actual: 15, .. }));
        assert!(Texture::from_rgba("empty", 0, 0, &[]).is_err());
    }

    #[test]
    fn test_request_then_resolve() {
        let mut cache = TextureCache::new();
        assert_eq!(cache.request("chalk"), &TextureSlot::Pending);
        assert!(cache.is_pending("chalk"));
        assert_eq!(cache.pending_ids().collect::<Vec<_>>(), vec!["chalk"]);

        let tex = Texture::from_buffer(RenderingBuffer::new(4, 4));
        cache.resolve("chalk", Ok(tex.clone()));
        assert_eq!(cache.texture("chalk"), Some(&tex));
        assert_eq!(cache.pending_ids().count(), 0);
        // A second request does not reset a resolved slot.
        assert!(matches!(cache.request("chalk"), TextureSlot::Ready(_)));
    }

    #[test]
    fn test_failed_slot_has_no_texture() {
        let mut cache = TextureCache::new();
        cache.request("gone");
        let slot = cache.resolve("gone", Err(TextureError::Missing("gone".into())));
        assert!(matches!(slot, TextureSlot::Failed(_)));
        assert!(cache.texture("gone").is_none());
        assert!(!cache.is_pending("gone"));
        assert_eq!(cache.len(), 1);
        cache.remove("gone");
        assert!(cache.is_empty());
    }
}
