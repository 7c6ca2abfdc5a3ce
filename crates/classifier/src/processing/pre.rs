use crate::backend::Normalization;
use crate::error::{ImageLoadError, ImagePreprocessError};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::{Array, IxDyn};
use std::path::Path;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts an image file into the backbone's input tensor: forced RGB,
/// fixed bilinear resize, the backbone's declared normalization, NCHW
/// layout with a batch dimension of 1. Deterministic for identical bytes.
pub struct PreProcessor {
    input_size: (u32, u32),
    normalization: Normalization,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32), normalization: Normalization) -> Self {
        Self {
            input_size,
            normalization,
        }
    }

    pub fn preprocess(&self, path: &Path) -> Result<Array<f32, IxDyn>, ImagePreprocessError> {
        tracing::trace!(image = %path.display(), "preprocessing image");

        let decoded = image::ImageReader::open(path)
            .map_err(|source| ImageLoadError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .decode()
            .map_err(|source| ImagePreprocessError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        let rgb = decoded.to_rgb8();
        let resized = self.resize(rgb, path)?;
        self.normalize(&resized, path)
    }

    /// Stretch to the exact input resolution. One fixed resampling policy;
    /// aspect ratio is not preserved.
    fn resize(&self, rgb: image::RgbImage, path: &Path) -> Result<Vec<u8>, ImagePreprocessError> {
        let (width, height) = rgb.dimensions();
        let mut pixels = rgb.into_raw();

        let resize_err = |message: String| ImagePreprocessError::Resize {
            path: path.to_path_buf(),
            message,
        };

        let src = Image::from_slice_u8(width, height, &mut pixels, PixelType::U8x3)
            .map_err(|e| resize_err(e.to_string()))?;
        let mut dst = Image::new(self.input_size.0, self.input_size.1, PixelType::U8x3);

        Resizer::new()
            .resize(
                &src,
                &mut dst,
                &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            )
            .map_err(|e| resize_err(e.to_string()))?;

        Ok(dst.buffer().to_vec())
    }

    fn normalize(
        &self,
        pixels: &[u8],
        path: &Path,
    ) -> Result<Array<f32, IxDyn>, ImagePreprocessError> {
        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        match self.normalization {
            Normalization::UnitScale => {
                for (i, px) in pixels.chunks_exact(3).enumerate() {
                    output[i] = px[0] as f32 / 255.0;
                    output[i + spatial] = px[1] as f32 / 255.0;
                    output[i + 2 * spatial] = px[2] as f32 / 255.0;
                }
            }
            Normalization::Imagenet => {
                for (i, px) in pixels.chunks_exact(3).enumerate() {
                    let r = px[0] as f32 / 255.0;
                    let g = px[1] as f32 / 255.0;
                    let b = px[2] as f32 / 255.0;

                    output[i] = (r - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
                    output[i + spatial] = (g - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
                    output[i + 2 * spatial] = (b - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
                }
            }
        }

        Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output).map_err(|e| {
            ImagePreprocessError::Tensor {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }
}
