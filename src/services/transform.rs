use crate::models::errors::AppError;
use crate::models::sticker::{StickerOptions, TransformMode, MAX_BRIGHTNESS};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// JPEG quality used for flattened output.
const JPEG_QUALITY: u8 = 90;

/// Rim color painted by the outline pass.
const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A finished conversion: encoded bytes plus everything the download
/// response needs to describe them.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub file_extension: &'static str,
    pub download_name: &'static str,
}

/// Per-pixel sticker transform service.
///
/// Stateless; one shared instance lives in the application state.
#[derive(Debug, Default)]
pub struct TransformService;

impl TransformService {
    pub fn new() -> Self {
        TransformService
    }

    /// Decode `data`, apply the configured transform, and encode the result.
    pub fn apply(&self, data: &[u8], options: &StickerOptions) -> Result<TransformResult, AppError> {
        if data.is_empty() {
            return Err(AppError::validation_failed("Uploaded image is empty"));
        }

        let decoded = image::load_from_memory(data)
            .map_err(|e| AppError::decode_failed(format!("Unreadable image data: {}", e)))?;
        let mut rgba = decoded.to_rgba8();

        match options.mode {
            TransformMode::Keyout => {
                let threshold = options.threshold.min(MAX_BRIGHTNESS);
                key_out_background(&mut rgba, threshold);

                if options.outline {
                    let radius = options
                        .outline_radius
                        .unwrap_or_else(|| default_outline_radius(rgba.width(), rgba.height()));
                    paint_outline(&mut rgba, radius);
                }

                let encoded = encode_png(&rgba)?;
                Ok(TransformResult {
                    width: rgba.width(),
                    height: rgba.height(),
                    data: encoded,
                    content_type: "image/png",
                    file_extension: "png",
                    download_name: "sticker.png",
                })
            }
            TransformMode::Flatten => {
                let rgb = flatten_alpha(&rgba);
                let encoded = encode_jpeg(&rgb, JPEG_QUALITY)?;
                Ok(TransformResult {
                    width: rgb.width(),
                    height: rgb.height(),
                    data: encoded,
                    content_type: "image/jpeg",
                    file_extension: "jpg",
                    download_name: "flattened.jpg",
                })
            }
        }
    }
}

/// Clear the alpha channel of every pixel whose brightness sum exceeds the
/// threshold. Existing transparency is preserved; the threshold test can
/// only make pixels more transparent.
fn key_out_background(image: &mut RgbaImage, threshold: u16) {
    for pixel in image.pixels_mut() {
        let brightness =
            u16::from(pixel[0]) + u16::from(pixel[1]) + u16::from(pixel[2]);
        if brightness > threshold {
            pixel[3] = 0;
        }
    }
}

/// Outline radius scaled to the image, floored at 3px.
fn default_outline_radius(width: u32, height: u32) -> u32 {
    std::cmp::max(3, std::cmp::min(width, height) / 100)
}

/// Paint a rim around the opaque silhouette: every transparent pixel within
/// `radius` of an opaque one becomes part of the outline. A dilation of the
/// alpha mask, restricted to pixels the keyout cleared.
fn paint_outline(image: &mut RgbaImage, radius: u32) {
    if radius == 0 {
        return;
    }

    let (width, height) = image.dimensions();
    let opaque: Vec<bool> = image.pixels().map(|pixel| pixel[3] > 0).collect();
    let r = i64::from(radius);

    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if opaque[index] {
                continue;
            }

            'search: for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let nx = i64::from(x) + dx;
                    let ny = i64::from(y) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                        continue;
                    }
                    if opaque[(ny as u32 * width + nx as u32) as usize] {
                        image.put_pixel(x, y, OUTLINE_COLOR);
                        break 'search;
                    }
                }
            }
        }
    }
}

/// Composite over an opaque white backdrop, discarding the alpha channel.
fn flatten_alpha(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        let alpha = f32::from(pixel[3]) / 255.0;
        let blend = |channel: u8| -> u8 {
            (f32::from(channel) * alpha + 255.0 * (1.0 - alpha)).round() as u8
        };
        Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AppError> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| AppError::encode_failed(format!("PNG encoding failed: {}", e)))?;

    Ok(buffer)
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, AppError> {
    use image::codecs::jpeg::JpegEncoder;
    use image::ImageEncoder;

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgb8,
        )
        .map_err(|e| AppError::encode_failed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}
