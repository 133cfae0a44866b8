//! Vehicle ad moderation: image gate, policy review and the record store.
//!
//! A submission first passes every photo through the vehicle classifier. Only
//! when all photos are vehicles is the ad text reviewed by a language model,
//! and only reviewed ads are persisted.

pub mod domain;
pub mod images;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AdFields, AdSubmission, ImageClass, ModerationRecord, RecordStatus, ReviewDecision,
    ReviewVerdict, SubmittedImage,
};
pub use images::{ClassifierHandle, ClassifierState, ModelLoadError, OnnxVehicleClassifier};
pub use repository::{JsonFileRecordStore, RecordStore, StoreError};
pub use review::{ConfiguredBackend, PolicyReviewer, ReviewBackend, ReviewError};
pub use router::moderation_router;
pub use service::{FailureKind, ModerationError, ModerationOutcome, ModerationService, Rejection};
