use crate::files::model::MediaType;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::io::Cursor;

const THUMBNAIL_SIZE: u32 = 256;

/// Compute the thumbnail data-URL for a freshly imported file.
///
/// Best-effort and infallible from the caller's point of view: image bytes
/// are decoded and downscaled; anything that cannot be rendered here (pdf
/// and video need their engines, broken images fail to decode) degrades to a
/// generated per-type placeholder. Never fails the import.
pub fn thumbnail_data_url(bytes: &[u8], media_type: MediaType) -> String {
    match media_type {
        MediaType::Image => {
            image_thumbnail(bytes).unwrap_or_else(|| placeholder_data_url(media_type))
        }
        MediaType::Pdf | MediaType::Video => placeholder_data_url(media_type),
    }
}

/// Decode, crop-resize to 256×256, re-encode as a JPEG data-URL.
/// Returns None on any failure (non-fatal).
fn image_thumbnail(bytes: &[u8]) -> Option<String> {
    match std::panic::catch_unwind(|| image_thumbnail_inner(bytes)) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("panic while generating image thumbnail");
            None
        }
    }
}

fn image_thumbnail_inner(bytes: &[u8]) -> Option<String> {
    let img = match image::load_from_memory(bytes) {
        Ok(i) => i,
        Err(e) => {
            tracing::debug!("thumbnail: cannot decode image bytes: {}", e);
            return None;
        }
    };
    let resized = img.resize_to_fill(
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        image::imageops::FilterType::Lanczos3,
    );
    encode_jpeg_data_url(&resized)
}

/// Flat-color stand-in used when no preview can be rendered at import time.
pub fn placeholder_data_url(media_type: MediaType) -> String {
    let rgb = match media_type {
        MediaType::Pdf => [0xB5, 0x4A, 0x4A],
        MediaType::Image => [0x4A, 0x7A, 0xB5],
        MediaType::Video => [0x4A, 0xB5, 0x6E],
    };
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        image::Rgb(rgb),
    ));
    encode_jpeg_data_url(&img).unwrap_or_else(|| "data:image/jpeg;base64,".to_string())
}

fn encode_jpeg_data_url(img: &image::DynamicImage) -> Option<String> {
    let mut jpeg_bytes: Vec<u8> = Vec::new();
    if let Err(e) = img.write_to(&mut Cursor::new(&mut jpeg_bytes), image::ImageFormat::Jpeg) {
        tracing::warn!("thumbnail: jpeg encode failed: {}", e);
        return None;
    }
    Some(format!("data:image/jpeg;base64,{}", B64.encode(&jpeg_bytes)))
}
