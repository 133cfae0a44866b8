//! Conversion of uploaded photos into the classifier's input tensor.

use image::imageops::FilterType;
use image::DynamicImage;

/// Edge length of the square model input.
pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;
const PLANE_LEN: usize = (INPUT_SIZE * INPUT_SIZE) as usize;
pub const TENSOR_LEN: usize = CHANNELS * PLANE_LEN;

/// Channel-major `3 x 224 x 224` float tensor with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    pub const SHAPE: [usize; 3] = [CHANNELS, INPUT_SIZE as usize, INPUT_SIZE as usize];

    /// Re-layout interleaved `RGBRGB...` bytes into R, G and B planes.
    fn from_interleaved_rgb(rgb: &[u8]) -> Self {
        debug_assert_eq!(rgb.len(), TENSOR_LEN);

        let mut data = vec![0f32; TENSOR_LEN];
        for (i, pixel) in rgb.chunks_exact(CHANNELS).enumerate() {
            data[i] = pixel[0] as f32 / 255.0;
            data[PLANE_LEN + i] = pixel[1] as f32 / 255.0;
            data[2 * PLANE_LEN + i] = pixel[2] as f32 / 255.0;
        }

        Self { data }
    }

    pub fn shape(&self) -> [usize; 3] {
        Self::SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// One colour plane, `0 = R`, `1 = G`, `2 = B`.
    pub fn plane(&self, channel: usize) -> &[f32] {
        let start = channel * PLANE_LEN;
        &self.data[start..start + PLANE_LEN]
    }
}

#[derive(Debug, thiserror::Error)]
#[error("image could not be decoded: {source}")]
pub struct DecodeError {
    #[from]
    source: image::ImageError,
}

/// Decode raw upload bytes and build the model input tensor.
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, DecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(preprocess_image(&decoded))
}

/// Cover-resize to 224x224 (aspect preserved, centre crop), drop alpha, normalize.
pub fn preprocess_image(image: &DynamicImage) -> ImageTensor {
    let resized = image.resize_to_fill(INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);
    let rgb = resized.to_rgb8();
    ImageTensor::from_interleaved_rgb(rgb.as_raw())
}
