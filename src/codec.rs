//! Thin wrapper around the `image` (JPEG) and `sha2` (content hashing)
//! crates — the two black-box codecs the storage engine builds on.

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;

use crate::error::Result;
use crate::format::SHA_LEN;

/// SHA-256 of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; SHA_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Decodes a JPEG buffer and returns its `(width, height)`.
pub fn resolution(bytes: &[u8]) -> Result<(u32, u32)> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    Ok((img.width(), img.height()))
}

/// Decodes `bytes` as JPEG, thumbnails it bounded by `(max_w, max_h)`
/// preserving aspect ratio, and re-encodes as JPEG.
pub fn thumbnail_jpeg(bytes: &[u8], max_w: u16, max_h: u16) -> Result<Vec<u8>> {
    let img: DynamicImage = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    let resized = img.resize(max_w as u32, max_h as u32, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}


#[cfg(test)]
mod tests {
    use super::test_support::make_jpeg;
    use super::*;

    #[test]
    fn resolution_matches_encoded_image() {
        let bytes = make_jpeg(64, 32);
        let (w, h) = resolution(&bytes).unwrap();
        assert_eq!((w, h), (64, 32));
    }

    #[test]
    fn thumbnail_is_bounded() {
        let bytes = make_jpeg(800, 400);
        let thumb = thumbnail_jpeg(&bytes, 100, 100).unwrap();
        let (w, h) = resolution(&thumb).unwrap();
        assert!(w <= 100 && h <= 100);
        assert_eq!(w, 100); // wider-than-tall image is bound by width first
    }

    #[test]
    fn sha256_is_deterministic_and_sensitive_to_content() {
        let a = sha256(b"hello");
        let b = sha256(b"hello");
        let c = sha256(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
