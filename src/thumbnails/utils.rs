use crate::errors::{ClipResult, ConfigurationError};
use image::{ImageOutputFormat, RgbImage};

/// Output dimensions for a frame: the requested width with the height scaled
/// to preserve the source aspect ratio, or the source dimensions when no
/// width was requested.
pub(crate) fn output_dimensions(
    coded_width: u32,
    coded_height: u32,
    requested_width: Option<u32>,
) -> (u32, u32) {
    match requested_width {
        Some(width) if coded_width > 0 => {
            let height = (width as u64 * coded_height as u64 / coded_width as u64) as u32;
            (width, height.max(1))
        }
        _ => (coded_width, coded_height),
    }
}

/// Resize to the exact target dimensions.
pub(crate) fn resize_image(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        return image;
    }
    image::imageops::resize(&image, width, height, image::imageops::FilterType::Lanczos3)
}

/// Encode a frame to the requested MIME type. Quality applies to lossy
/// formats only and is given in [0, 1].
pub(crate) fn encode_image(image: &RgbImage, mime: &str, quality: f32) -> ClipResult<Vec<u8>> {
    let format = match mime {
        "image/png" => ImageOutputFormat::Png,
        "image/jpeg" => {
            let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            ImageOutputFormat::Jpeg(q)
        }
        other => {
            return Err(
                ConfigurationError::new(format!("Unsupported output MIME type: {}", other)).into(),
            )
        }
    };

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|e| ConfigurationError::new(format!("Failed to encode frame: {}", e)))?;
    Ok(buffer)
}
