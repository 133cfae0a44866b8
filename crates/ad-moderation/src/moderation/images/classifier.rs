use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::tensor::ImageTensor;
use crate::moderation::domain::ImageClass;

/// Two-class image model. Implementations must be safe for concurrent inference.
pub trait VehicleClassifier: Send + Sync {
    /// Raw scores, index-aligned with [`ImageClass::LABELS`].
    fn scores(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;

    fn classify(&self, tensor: &ImageTensor) -> Result<ImageClass, ClassifierError> {
        let scores = self.scores(tensor)?;
        label_for(&scores)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("model produced {actual} scores, expected {expected}")]
    UnexpectedOutput { expected: usize, actual: usize },
    #[error("model produced no comparable score")]
    NoScore,
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Index of the first maximum. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn label_for(scores: &[f32]) -> Result<ImageClass, ClassifierError> {
    if scores.len() != ImageClass::LABELS.len() {
        return Err(ClassifierError::UnexpectedOutput {
            expected: ImageClass::LABELS.len(),
            actual: scores.len(),
        });
    }
    argmax(scores)
        .map(|index| ImageClass::LABELS[index])
        .ok_or(ClassifierError::NoScore)
}

/// Lifecycle of the shared model: it loads in the background after startup.
#[derive(Clone, Default)]
pub enum ClassifierState {
    #[default]
    Loading,
    Ready(Arc<dyn VehicleClassifier>),
    Failed(String),
}

impl fmt::Debug for ClassifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierState::Loading => f.write_str("Loading"),
            ClassifierState::Ready(_) => f.write_str("Ready"),
            ClassifierState::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// Cloneable handle to the process-wide classifier slot.
#[derive(Debug, Clone, Default)]
pub struct ClassifierHandle {
    state: Arc<RwLock<ClassifierState>>,
}

impl ClassifierHandle {
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn ready(classifier: Arc<dyn VehicleClassifier>) -> Self {
        let handle = Self::default();
        handle.install(classifier);
        handle
    }

    pub fn install(&self, classifier: Arc<dyn VehicleClassifier>) {
        self.replace(ClassifierState::Ready(classifier));
    }

    pub fn mark_failed(&self, reason: impl Into<String>) {
        self.replace(ClassifierState::Failed(reason.into()));
    }

    /// The loaded model, or `None` while loading or after a failed load.
    pub fn current(&self) -> Option<Arc<dyn VehicleClassifier>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            ClassifierState::Ready(classifier) => Some(Arc::clone(classifier)),
            ClassifierState::Loading | ClassifierState::Failed(_) => None,
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    fn replace(&self, next: ClassifierState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
