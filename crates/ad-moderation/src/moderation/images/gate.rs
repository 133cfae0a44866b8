use tracing::{debug, info};

use super::classifier::{ClassifierError, VehicleClassifier};
use super::tensor::{preprocess, DecodeError};
use crate::moderation::domain::{ImageClass, SubmittedImage};

/// Result of running every photo of a submission through the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Pass { inspected: usize },
    /// Index of the first photo classified as non-vehicle.
    Fail { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("at least one image is required")]
    NoImages,
    #[error("image {index} could not be read: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
    #[error("classification of image {index} failed: {source}")]
    Inference {
        index: usize,
        #[source]
        source: ClassifierError,
    },
}

/// All-or-nothing vehicle check over an ordered set of photos.
pub struct ImageGate<'a> {
    classifier: &'a dyn VehicleClassifier,
}

impl<'a> ImageGate<'a> {
    pub fn new(classifier: &'a dyn VehicleClassifier) -> Self {
        Self { classifier }
    }

    /// Classifies in order and stops at the first non-vehicle photo.
    pub fn inspect(&self, images: &[SubmittedImage]) -> Result<GateOutcome, GateError> {
        if images.is_empty() {
            return Err(GateError::NoImages);
        }

        for (index, image) in images.iter().enumerate() {
            let tensor =
                preprocess(&image.bytes).map_err(|source| GateError::Decode { index, source })?;
            let class = self
                .classifier
                .classify(&tensor)
                .map_err(|source| GateError::Inference { index, source })?;

            debug!(image = %image.display_name(index), class = class.label(), "image classified");

            if class == ImageClass::NonVehicle {
                info!(image = %image.display_name(index), index, "non-vehicle image rejected");
                return Ok(GateOutcome::Fail { index });
            }
        }

        Ok(GateOutcome::Pass {
            inspected: images.len(),
        })
    }
}
