use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Keys written by the moderation record itself; form fields may not shadow them.
const RESERVED_FIELDS: [&str; 4] = ["status", "review_reason", "image_class", "reviewed_at"];

/// Uploaded photo as received from the caller. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedImage {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

impl SubmittedImage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Name used in log lines; falls back to the position in the upload.
    pub fn display_name(&self, index: usize) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("image #{}", index + 1))
    }
}

/// Structured ad attributes as posted by the listing form.
///
/// Values are kept as opaque strings; only the policy review judges them.
/// Unrecognized form fields are carried in `extra` and persisted unchanged,
/// except names that collide with the record's own keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdFields {
    pub brand: String,
    pub model: String,
    pub variant: String,
    pub year: String,
    pub mileage: String,
    pub fuel_type: String,
    /// Engine displacement in cc.
    pub engine_type: String,
    pub transmission: String,
    pub condition: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AdFields {
    /// Assign a form field by its wire name (`fuelType`, `engineType`, ...).
    pub fn insert(&mut self, name: &str, value: String) {
        let slot = match name {
            "brand" => &mut self.brand,
            "model" => &mut self.model,
            "variant" => &mut self.variant,
            "year" => &mut self.year,
            "mileage" => &mut self.mileage,
            "fuelType" => &mut self.fuel_type,
            "engineType" => &mut self.engine_type,
            "transmission" => &mut self.transmission,
            "condition" => &mut self.condition,
            "description" => &mut self.description,
            reserved if RESERVED_FIELDS.contains(&reserved) => {
                warn!(field = reserved, "dropping form field that shadows a record key");
                return;
            }
            other => {
                self.extra
                    .insert(other.to_string(), serde_json::Value::String(value));
                return;
            }
        };
        *slot = value;
    }
}

/// One ad as handed to the moderation pipeline.
#[derive(Debug, Clone, Default)]
pub struct AdSubmission {
    pub images: Vec<SubmittedImage>,
    pub fields: AdFields,
}

/// Output label of the two-class image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageClass {
    NonVehicle,
    Vehicle,
}

impl ImageClass {
    /// Class order of the model's output vector.
    pub const LABELS: [ImageClass; 2] = [ImageClass::NonVehicle, ImageClass::Vehicle];

    pub fn label(self) -> &'static str {
        match self {
            ImageClass::NonVehicle => "non-vehicle",
            ImageClass::Vehicle => "vehicle",
        }
    }
}

/// Decision literal returned by the review model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn status(self) -> RecordStatus {
        match self {
            ReviewDecision::Approve => RecordStatus::Approve,
            ReviewDecision::Reject => RecordStatus::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub decision: ReviewDecision,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Approve,
    Reject,
}

/// Persisted outcome of a submission that passed the image gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationRecord {
    #[serde(flatten)]
    pub fields: AdFields,
    pub status: RecordStatus,
    pub review_reason: String,
    pub image_class: ImageClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ModerationRecord {
    pub fn from_verdict(
        fields: AdFields,
        verdict: &ReviewVerdict,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fields,
            status: verdict.decision.status(),
            review_reason: verdict.reason.clone(),
            image_class: ImageClass::Vehicle,
            reviewed_at: Some(reviewed_at),
        }
    }
}
