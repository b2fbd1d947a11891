//! Image derivatives for uploaded files.
//!
//! Two previews are derived from an image upload:
//!
//! - a **blur thumbnail**: a [ThumbHash](https://evanw.github.io/thumbhash/) payload of a few
//!   dozen bytes that a client can render as a placeholder before the real image arrives
//! - a **low-resolution preview**: a 20px wide, blurred JPEG at low quality
//!
//! Both are advisory. Callers treat every error from this crate as "no preview for this file",
//! never as a failed upload.
//!
//! All functions here are CPU bound and synchronous; async callers should run them on a
//! blocking thread.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Bounding box the image is reduced to before hashing. ThumbHash rejects larger inputs.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 100;

/// Width of the low-resolution preview.
pub const LOW_RES_WIDTH: u32 = 20;

/// Upper bound on the preview height. Taller images are fitted inside it with a narrower width.
pub const LOW_RES_MAX_HEIGHT: u32 = 200;

/// JPEG quality of the low-resolution preview.
pub const LOW_RES_QUALITY: u8 = 40;

/// Gaussian blur applied to the preview after resizing.
pub const LOW_RES_BLUR_SIGMA: f32 = 1.5;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("failed to encode preview: {0}")]
    Encode(#[source] image::ImageError),
}

pub type PreviewResult<T> = std::result::Result<T, PreviewError>;

/// Which derivative an error or result refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivativeKind {
    Decode,
    /// The blocking task running the generator did not complete.
    Worker,
    BlurThumbnail,
    LowResPreview,
}

impl std::fmt::Display for DerivativeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DerivativeKind::Decode => "decode",
            DerivativeKind::Worker => "preview_worker",
            DerivativeKind::BlurThumbnail => "blur_thumbnail",
            DerivativeKind::LowResPreview => "low_res_preview",
        };
        f.write_str(s)
    }
}

/// Returns true if a declared MIME type names an image.
///
/// Only the declared type is consulted; content is not sniffed here. A type that claims to be
/// an image but does not decode simply produces no derivatives.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Decodes `bytes` as a raster image, guessing the format from its content.
pub fn decode(bytes: &[u8]) -> PreviewResult<DynamicImage> {
    let img = image::load_from_memory(bytes).map_err(PreviewError::Decode)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PreviewError::EmptyImage);
    }
    Ok(img)
}

/// Encodes a ThumbHash of `img`.
///
/// The image is first reduced to fit within [`THUMBNAIL_MAX_DIMENSION`] on both axes, keeping
/// its aspect ratio. Smaller images are hashed as they are.
pub fn perceptual_thumbnail(img: &DynamicImage) -> PreviewResult<Vec<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PreviewError::EmptyImage);
    }

    let reduced;
    let source = if width > THUMBNAIL_MAX_DIMENSION || height > THUMBNAIL_MAX_DIMENSION {
        reduced = img.resize(
            THUMBNAIL_MAX_DIMENSION,
            THUMBNAIL_MAX_DIMENSION,
            FilterType::Lanczos3,
        );
        &reduced
    } else {
        img
    };

    let rgba = source.to_rgba8();
    Ok(thumbhash::rgba_to_thumb_hash(
        rgba.width() as usize,
        rgba.height() as usize,
        rgba.as_raw(),
    ))
}

/// Renders the low-resolution preview of `img` as JPEG bytes.
///
/// The preview is [`LOW_RES_WIDTH`] wide with proportional height. Images taller than
/// [`LOW_RES_MAX_HEIGHT`] at that width are fitted to the height instead, so the preview gets
/// narrower rather than squashed.
pub fn low_res_preview(img: &DynamicImage) -> PreviewResult<Vec<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PreviewError::EmptyImage);
    }

    let resized = img
        .resize(LOW_RES_WIDTH, LOW_RES_MAX_HEIGHT, FilterType::Triangle)
        .to_rgb8();
    let blurred = image::imageops::blur(&resized, LOW_RES_BLUR_SIGMA);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, LOW_RES_QUALITY)
        .encode_image(&blurred)
        .map_err(PreviewError::Encode)?;
    Ok(out)
}

/// Outcome of deriving both previews from one decoded image.
///
/// The two results are independent: one may succeed while the other fails.
#[derive(Debug)]
pub struct DerivativeSet {
    pub blur_thumbnail: PreviewResult<Vec<u8>>,
    pub low_res_jpeg: PreviewResult<Vec<u8>>,
}

/// Decodes `bytes` and derives both previews.
///
/// # Errors
///
/// Returns the decode error when `bytes` is not a readable image; no derivative is attempted
/// in that case.
pub fn generate(bytes: &[u8]) -> PreviewResult<DerivativeSet> {
    let img = decode(bytes)?;
    Ok(DerivativeSet {
        blur_thumbnail: perceptual_thumbnail(&img),
        low_res_jpeg: low_res_preview(&img),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/jpeg"));
        assert!(is_image_mime("IMAGE/PNG"));
        assert!(is_image_mime(" image/webp"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime("application/octet-stream"));
        assert!(!is_image_mime("image"));
        assert!(!is_image_mime(""));
    }

    #[test]
    fn test_decode_png() {
        let bytes = encode(&gradient(64, 48), ImageFormat::Png);
        let img = decode(&bytes).unwrap();
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result, Err(PreviewError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_jpeg() {
        let bytes = encode(&gradient(64, 48), ImageFormat::Jpeg);
        let result = decode(&bytes[..bytes.len() / 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_perceptual_thumbnail_is_deterministic() {
        let img = gradient(640, 480);
        let first = perceptual_thumbnail(&img).unwrap();
        let second = perceptual_thumbnail(&img).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_perceptual_thumbnail_is_compact() {
        let hash = perceptual_thumbnail(&gradient(1920, 1080)).unwrap();
        assert!(hash.len() <= 32, "thumbhash was {} bytes", hash.len());
        assert!(thumbhash::thumb_hash_to_approximate_aspect_ratio(&hash).is_ok());
    }

    #[test]
    fn test_perceptual_thumbnail_small_image() {
        let hash = perceptual_thumbnail(&gradient(8, 8)).unwrap();
        assert!(!hash.is_empty());
    }

    #[test]
    fn test_perceptual_thumbnail_extreme_aspect_ratio() {
        let hash = perceptual_thumbnail(&gradient(1, 1000)).unwrap();
        assert!(!hash.is_empty());
    }

    #[test]
    fn test_low_res_preview_dimensions() {
        let jpeg = low_res_preview(&gradient(640, 480)).unwrap();
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (20, 15));
    }

    #[test]
    fn test_low_res_preview_is_jpeg_for_png_input() {
        let img = decode(&encode(&gradient(100, 50), ImageFormat::Png)).unwrap();
        let jpeg = low_res_preview(&img).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    fn preview_dimensions(img: &DynamicImage) -> (u32, u32) {
        let jpeg = low_res_preview(img).unwrap();
        image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .unwrap()
            .dimensions()
    }

    #[test]
    fn test_low_res_preview_keeps_aspect_ratio_of_tall_images() {
        // 1:20 portrait would be 20x400 at full width; it is fitted to 10x200 instead.
        assert_eq!(preview_dimensions(&gradient(100, 2000)), (10, 200));
        assert_eq!(preview_dimensions(&gradient(50, 500)), (20, 200));
    }

    #[test]
    fn test_low_res_preview_wide_and_small_images() {
        assert_eq!(preview_dimensions(&gradient(1000, 10)), (20, 1));
        assert_eq!(preview_dimensions(&gradient(10, 10)), (20, 20));
    }

    #[test]
    fn test_generate_populates_both() {
        let bytes = encode(&gradient(320, 240), ImageFormat::Png);
        let set = generate(&bytes).unwrap();
        assert!(!set.blur_thumbnail.unwrap().is_empty());
        assert!(!set.low_res_jpeg.unwrap().is_empty());
    }

    #[test]
    fn test_generate_short_circuits_on_decode_error() {
        let result = generate(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(matches!(result, Err(PreviewError::Decode(_))));
    }

    #[test]
    fn test_derivative_kind_display() {
        assert_eq!(DerivativeKind::BlurThumbnail.to_string(), "blur_thumbnail");
        assert_eq!(DerivativeKind::LowResPreview.to_string(), "low_res_preview");
        assert_eq!(DerivativeKind::Worker.to_string(), "preview_worker");
    }
}
