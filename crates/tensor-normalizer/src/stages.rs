//! Individual normalization stages
//!
//! Each function is one step of the pipeline; [`crate::Normalizer`] chains
//! them in the fixed order. Order matters: padding uses the pre-invert white
//! so inversion turns the border into background.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, Rgba32FImage, RgbImage, RgbaImage};
use ndarray::Array4;

use crate::pipeline::PipelineStage;
use crate::raw::RawImage;
use crate::tensor::NormalizedTensor;
use crate::NormalizeError;

/// Maximum luminance, white on the drawing surface
pub const WHITE: u8 = u8::MAX;

/// Interpret the payload as an RGBA bitmap
pub fn decode(raw: RawImage) -> Result<RgbaImage, NormalizeError> {
    let side = raw.side();
    RgbaImage::from_raw(side, side, raw.into_bytes()).ok_or_else(|| NormalizeError::Stage {
        stage: PipelineStage::Decode,
        reason: format!("buffer does not hold a {side}x{side} RGBA image"),
    })
}

/// Shrink the drawing to the digit body size
///
/// Resampling runs on alpha-premultiplied color, so the hidden RGB of
/// transparent pixels never bleeds into visible neighbours.
pub fn downscale(image: &RgbaImage, side: u32, filter: FilterType) -> RgbaImage {
    let premultiplied: Rgba32FImage = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let alpha = p[3] as f32 / 255.0;
        Rgba([
            p[0] as f32 / 255.0 * alpha,
            p[1] as f32 / 255.0 * alpha,
            p[2] as f32 / 255.0 * alpha,
            alpha,
        ])
    });
    let resized = imageops::resize(&premultiplied, side, side, filter);

    ImageBuffer::from_fn(side, side, |x, y| {
        let p = resized.get_pixel(x, y);
        let alpha = p[3].clamp(0.0, 1.0);
        if alpha <= f32::EPSILON {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |v: f32| ((v / alpha) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba([
            channel(p[0]),
            channel(p[1]),
            channel(p[2]),
            (alpha * 255.0).round() as u8,
        ])
    })
}

/// Composite onto an opaque white canvas using the image's own alpha
///
/// Transparent pixels become white background instead of color 0.
pub fn flatten_alpha(image: &RgbaImage) -> RgbImage {
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([WHITE; 4]));
    imageops::overlay(&mut canvas, image, 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Collapse RGB to a single ITU-R 601-2 luma channel
pub fn grayscale(image: &RgbImage) -> GrayImage {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let luma = p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Surround the image with a uniform white border
pub fn pad(image: &GrayImage, border: u32) -> GrayImage {
    let width = image.width() + 2 * border;
    let height = image.height() + 2 * border;
    let mut canvas = GrayImage::from_pixel(width, height, Luma([WHITE]));
    imageops::replace(&mut canvas, image, border as i64, border as i64);
    canvas
}

/// Flip polarity so ink is high and background is zero
pub fn invert(mut image: GrayImage) -> GrayImage {
    imageops::invert(&mut image);
    image
}

/// Flatten row-major, reshape to (1, H, W, 1) and scale into [0.0, 1.0]
pub fn to_tensor(image: &GrayImage) -> Result<NormalizedTensor, NormalizeError> {
    let shape = (1, image.height() as usize, image.width() as usize, 1);
    let values: Vec<f32> = image.as_raw().iter().map(|v| *v as f32 / 255.0).collect();

    Array4::from_shape_vec(shape, values)
        .map(NormalizedTensor::new)
        .map_err(|e| NormalizeError::Stage {
            stage: PipelineStage::Scale,
            reason: e.to_string(),
        })
}
