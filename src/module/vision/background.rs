//! Background removal.
//!
//! A remover returns the image with its alpha channel reduced to the subject
//! mask; colour channels are left untouched.

use image::{imageops, imageops::FilterType, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use ndarray::{Array, Axis, CowArray, Ix2};
use ort::{value::Value, Session};

use super::classifier::onnx;
use crate::module::define;
use crate::module::error::VisionError;

/// Cuts the subject out of an image.
pub trait BackgroundRemover {
    fn remove(&self, img: &RgbaImage) -> Result<RgbaImage, VisionError>;
}

/// Keeps the whole frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAll;

impl BackgroundRemover for KeepAll {
    fn remove(&self, img: &RgbaImage) -> Result<RgbaImage, VisionError> {
        Ok(img.clone())
    }
}

/// Salient object segmentation (U²-Net family) run through ONNX.
///
/// Input `(1, 3, 320, 320)` normalized with ImageNet statistics, output a
/// `(1, 1, 320, 320)` saliency map that becomes the alpha channel.
pub struct OnnxMatting {
    session: Session,
    size: u32,
}

impl OnnxMatting {
    pub fn new(model_path: &str, intra_threads: i16) -> Result<Self, VisionError> {
        Ok(Self {
            session: onnx::session("matting", model_path, intra_threads)?,
            size: define::vision::MATTING_SIZE,
        })
    }

    /// Saliency mask at the image's own size.
    fn mask(&self, img: &RgbaImage) -> Result<GrayImage, VisionError> {
        let sz = self.size;
        let resized = imageops::resize(img, sz, sz, FilterType::Lanczos3);

        let array = CowArray::from(
            Array::from_shape_fn((1, 3, sz as usize, sz as usize), |(_, c, j, i)| {
                let pixel = resized.get_pixel(i as u32, j as u32);
                (pixel[c] as f32 / 255.0 - define::vision::MATTING_MEAN[c])
                    / define::vision::MATTING_STD[c]
            })
            .into_dyn(),
        );
        let tensor = vec![Value::from_array(self.session.allocator(), &array)?];

        let outs = self.session.run(tensor)?;
        let out = outs.get(0).ok_or(VisionError::EmptyOutput)?.try_extract::<f32>()?;
        let view = out.view();
        if view.ndim() != 4 || view.shape()[0] != 1 || view.shape()[1] != 1 {
            return Err(VisionError::OutputShape(view.shape().to_vec()));
        }
        let plane = view
            .index_axis(Axis(0), 0)
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()?;
        let (h, w) = plane.dim();
        if h == 0 || w == 0 {
            return Err(VisionError::OutputShape(view.shape().to_vec()));
        }

        let mask = normalize_mask(plane.iter().copied(), w as u32, h as u32);
        Ok(imageops::resize(&mask, img.width(), img.height(), FilterType::Triangle))
    }
}

impl BackgroundRemover for OnnxMatting {
    fn remove(&self, img: &RgbaImage) -> Result<RgbaImage, VisionError> {
        let mask = self.mask(img)?;
        Ok(apply_mask(img, &mask))
    }
}

/// Min-max normalize a row-major saliency map to a grey image.
fn normalize_mask<I>(values: I, width: u32, height: u32) -> GrayImage
where
    I: Iterator<Item = f32> + Clone,
{
    let (lo, hi) = values
        .clone()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    let bytes = values
        .map(|v| {
            if range > f32::EPSILON {
                (((v - lo) / range) * 255.0).round() as u8
            } else {
                0
            }
        })
        .collect();
    // `values` holds exactly width * height items.
    GrayImage::from_raw(width, height, bytes).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Multiply the image's alpha by the mask.
pub fn apply_mask(img: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let Luma([m]) = *mask.get_pixel(x, y);
        Rgba([r, g, b, ((a as u16 * m as u16 + 127) / 255) as u8])
    })
}
