//! Image encoding: rendered PNG file → base64 `ImageData` for the vision API.
//!
//! The rasterizer already wrote lossless PNG, so the bytes are sent as-is.
//! `detail: "high"` asks GPT-class models for the full tile budget; without
//! it thin chart lines and small labels are lost before the model ever sees
//! them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Wrap already-encoded PNG bytes for a multimodal request.
pub fn encode_png(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/png").with_detail("high")
}

/// Read a rendered page from disk and encode it.
pub async fn encode_page_file(path: &Path) -> std::io::Result<ImageData> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_png(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn encode_small_image() {
        let png = png_bytes();
        let data = encode_png(&png);
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, png);
    }

    #[tokio::test]
    async fn encode_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_1.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let data = encode_page_file(&path).await.expect("read + encode");
        assert!(!data.data.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        assert!(encode_page_file(Path::new("/nope/page_1.png")).await.is_err());
    }
}
