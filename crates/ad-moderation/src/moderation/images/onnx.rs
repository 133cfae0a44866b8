use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;
use tracing::info;

use super::classifier::{ClassifierError, VehicleClassifier};
use super::tensor::ImageTensor;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Vehicle / non-vehicle classifier backed by an exported ONNX graph.
pub struct OnnxVehicleClassifier {
    plan: OnnxPlan,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("unable to prepare model {}: {detail}", path.display())]
    Onnx { path: PathBuf, detail: String },
}

impl OnnxVehicleClassifier {
    /// Parse, shape and optimize the graph for a single `[1, 3, 224, 224]` input.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelLoadError::Missing {
                path: path.to_path_buf(),
            });
        }

        let [channels, height, width] = ImageTensor::SHAPE;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, channels, height, width]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|err| ModelLoadError::Onnx {
                path: path.to_path_buf(),
                detail: format!("{err:#}"),
            })?;

        info!(path = %path.display(), "vehicle classifier loaded");
        Ok(Self { plan })
    }
}

impl VehicleClassifier for OnnxVehicleClassifier {
    fn scores(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let [channels, height, width] = ImageTensor::SHAPE;
        let input = Tensor::from_shape(&[1, channels, height, width], tensor.as_slice())
            .map_err(inference_error)?;

        let outputs = self.plan.run(tvec!(input.into())).map_err(inference_error)?;
        let scores = outputs.first().ok_or(ClassifierError::NoScore)?;
        let scores = scores.as_slice::<f32>().map_err(inference_error)?;
        Ok(scores.to_vec())
    }
}

fn inference_error(err: TractError) -> ClassifierError {
    ClassifierError::Inference(format!("{err:#}"))
}
