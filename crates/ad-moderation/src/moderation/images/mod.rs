//! Image gate: preprocessing, the two-class model and the short-circuit check.

mod classifier;
mod gate;
mod onnx;
mod tensor;

pub use classifier::{
    argmax, label_for, ClassifierError, ClassifierHandle, ClassifierState, VehicleClassifier,
};
pub use gate::{GateError, GateOutcome, ImageGate};
pub use onnx::{ModelLoadError, OnnxVehicleClassifier};
pub use tensor::{preprocess, preprocess_image, DecodeError, ImageTensor, INPUT_SIZE, TENSOR_LEN};
