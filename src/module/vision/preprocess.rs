//! Image preprocessing for the classifier.
//!
//! decode RGBA -> remove background -> composite on white -> resize ->
//! drop alpha -> scale to [0, 1] -> add batch axis.

use image::{imageops, imageops::FilterType, ImageBuffer, Rgba, RgbaImage};
use ndarray::{Array, Array4};
use std::path::Path;

use super::background::BackgroundRemover;
use crate::module::error::VisionError;

/// Load `path` and turn it into a `(1, size, size, 3)` tensor.
///
/// Returns `Ok(None)` when the file does not exist so callers can tell a
/// missing image from a failed one.
pub fn load_and_preprocess(
    path: &Path,
    remover: &dyn BackgroundRemover,
    size: u32,
) -> Result<Option<Array4<f32>>, VisionError> {
    if !path.is_file() {
        log::warn!("Image file not found at {}", path.display());
        return Ok(None);
    }

    let img = image::open(path)?.to_rgba8();
    let cutout = remover.remove(&img)?;
    let composited = composite_on_white(&cutout);
    Ok(Some(to_tensor(&composited, size)))
}

/// Alpha-composite over an opaque white canvas of the same size.
pub fn composite_on_white(img: &RgbaImage) -> RgbaImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let a = a as u32;
        let over = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgba([over(r), over(g), over(b), 255])
    })
}

/// Resize to `size x size`, keep RGB and scale to [0, 1] in NHWC order.
pub fn to_tensor(img: &RgbaImage, size: u32) -> Array4<f32> {
    let resized = imageops::resize(img, size, size, FilterType::CatmullRom);
    Array::from_shape_fn((1, size as usize, size as usize, 3), |(_, j, i, c)| {
        let pixel = resized.get_pixel(i as u32, j as u32);
        // range [0, 255] -> range [0, 1]
        (pixel[c] as f32) / 255.0
    })
}
