//! Image decode, resize and normalization

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, ImageReader};
use inferbench_core::Tensor;

use crate::error::{DatasetError, DatasetResult};

/// Inception v3 input side length
pub const INPUT_SIZE: u32 = 299;

/// Turns image files into normalized HWC tensors
///
/// Each channel value `x` becomes `(x - mean) / std`; with the defaults the
/// result lies in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    /// Output height
    pub height: u32,
    /// Output width
    pub width: u32,
    /// Subtracted from every channel value
    pub mean: f32,
    /// Divisor applied after subtracting the mean
    pub std: f32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            height: INPUT_SIZE,
            width: INPUT_SIZE,
            mean: 127.5,
            std: 127.5,
        }
    }
}

impl Preprocessor {
    /// Preprocessor producing `size x size` tensors with the default normalization
    pub fn with_size(size: u32) -> Self {
        Self {
            height: size,
            width: size,
            ..Self::default()
        }
    }

    /// Shape of the produced tensors: `[height, width, 3]`
    pub fn output_shape(&self) -> Vec<usize> {
        vec![self.height as usize, self.width as usize, 3]
    }

    /// Decode the image at `path` and convert it
    pub fn load(&self, path: &Path) -> DatasetResult<Tensor> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(ImageError::IoError)
            .and_then(|reader| reader.decode())
            .map_err(|source| DatasetError::Image {
                path: path.to_path_buf(),
                source,
            })?;

        self.convert(&image)
    }

    /// Resize (bilinear) and normalize an already decoded image
    ///
    /// Pixels are converted to `f32` before resizing, so interpolated values
    /// keep their fractional part.
    pub fn convert(&self, image: &DynamicImage) -> DatasetResult<Tensor> {
        let rgb = imageops::resize(&image.to_rgb32f(), self.width, self.height, FilterType::Triangle);

        // to_rgb32f scales channels to [0, 1]
        let data: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|c| (c * 255.0 - self.mean) / self.std)
            .collect();

        Ok(Tensor::new(self.output_shape(), data)?)
    }
}
