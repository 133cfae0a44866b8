use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use axum::response::Response;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;

use crate::moderation::domain::{AdFields, AdSubmission, ModerationRecord, SubmittedImage};
use crate::moderation::images::{ClassifierError, ClassifierHandle, ImageTensor, VehicleClassifier};
use crate::moderation::repository::{RecordStore, StoreError};
use crate::moderation::review::{BackendError, PolicyReviewer, ReviewBackend};
use crate::moderation::service::ModerationService;

pub(super) const RED: Rgb<u8> = Rgb([220, 30, 30]);
pub(super) const BLUE: Rgb<u8> = Rgb([30, 30, 220]);

pub(super) fn png(color: Rgb<u8>) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(96, 64, color));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode fixture png");
    buffer.into_inner()
}

/// Red photo stands in for a car.
pub(super) fn vehicle_photo() -> SubmittedImage {
    SubmittedImage::new(png(RED)).with_file_name("corolla-front.png")
}

pub(super) fn non_vehicle_photo() -> SubmittedImage {
    SubmittedImage::new(png(BLUE)).with_file_name("holiday.png")
}

pub(super) fn corolla_fields() -> AdFields {
    AdFields {
        brand: "Toyota".to_string(),
        model: "Corolla".to_string(),
        variant: "GLi".to_string(),
        year: "2018".to_string(),
        mileage: "65000".to_string(),
        fuel_type: "Petrol".to_string(),
        engine_type: "1300".to_string(),
        transmission: "Manual".to_string(),
        condition: "Used".to_string(),
        description: "Neat and clean Corolla, just buy and drive.".to_string(),
        ..AdFields::default()
    }
}

pub(super) fn submission(images: Vec<SubmittedImage>) -> AdSubmission {
    AdSubmission {
        images,
        fields: corolla_fields(),
    }
}

/// Labels an image by comparing its red and blue planes.
#[derive(Default)]
pub(super) struct ColorClassifier {
    calls: AtomicUsize,
    threads: Mutex<Vec<ThreadId>>,
}

impl ColorClassifier {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Threads that ran inference, one entry per call.
    pub(super) fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().expect("threads poisoned").clone()
    }
}

impl VehicleClassifier for ColorClassifier {
    fn scores(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.threads
            .lock()
            .expect("threads poisoned")
            .push(thread::current().id());
        let red: f32 = tensor.plane(0).iter().sum();
        let blue: f32 = tensor.plane(2).iter().sum();
        if red >= blue {
            Ok(vec![0.1, 0.9])
        } else {
            Ok(vec![0.9, 0.1])
        }
    }
}

pub(super) struct BrokenClassifier;

impl VehicleClassifier for BrokenClassifier {
    fn scores(&self, _tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(vec![0.2, 0.3, 0.5])
    }
}

pub(super) enum Script {
    Reply(String),
    Refused,
    Status(u16),
    Stall,
}

/// Backend returning a fixed script and recording every prompt.
pub(super) struct ScriptedBackend {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(super) fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn reply(text: &str) -> Self {
        Self::new(Script::Reply(text.to_string()))
    }

    pub(super) fn approving() -> Self {
        Self::reply(r#"{"decision":"Approve","reason":"Ad follows all rules."}"#)
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts poisoned").clone()
    }
}

impl ReviewBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .expect("prompts poisoned")
            .push(prompt.to_string());

        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Refused => Err(BackendError::Connect(
                "error sending request: tcp connect error: Connection refused (os error 111)"
                    .to_string(),
            )),
            Script::Status(status) => Err(BackendError::Status {
                status: *status,
                body: "model crashed".to_string(),
            }),
            Script::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

/// Reviewer that applies the duplicate/original rule to the rendered prompt.
pub(super) struct ContractBackend;

impl ReviewBackend for ContractBackend {
    fn name(&self) -> &str {
        "contract"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let description = prompt
            .lines()
            .find_map(|line| line.strip_prefix("- Description: "))
            .unwrap_or_default()
            .to_lowercase();

        let reply = if description.contains("duplicate") && description.contains("original") {
            r#"{"decision":"Reject","reason":"Mentions both duplicate and original documents."}"#
        } else {
            r#"{"decision":"Approve","reason":"Ad follows all rules."}"#
        };
        Ok(reply.to_string())
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<Vec<ModerationRecord>>,
    append_threads: Mutex<Vec<ThreadId>>,
}

impl MemoryStore {
    pub(super) fn append_threads(&self) -> Vec<ThreadId> {
        self.append_threads
            .lock()
            .expect("append threads poisoned")
            .clone()
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, record: &ModerationRecord) -> Result<(), StoreError> {
        self.append_threads
            .lock()
            .expect("append threads poisoned")
            .push(thread::current().id());
        self.records
            .lock()
            .expect("records poisoned")
            .push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<ModerationRecord>, StoreError> {
        Ok(self.records.lock().expect("records poisoned").clone())
    }
}

pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn append(&self, _record: &ModerationRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    fn records(&self) -> Result<Vec<ModerationRecord>, StoreError> {
        Ok(Vec::new())
    }
}

pub(super) struct Harness<B, S> {
    pub(super) service: Arc<ModerationService<B, S>>,
    pub(super) classifier: Arc<ColorClassifier>,
}

pub(super) fn harness<B, S>(backend: B, store: Arc<S>) -> Harness<B, S>
where
    B: ReviewBackend + 'static,
    S: RecordStore + 'static,
{
    let classifier = Arc::new(ColorClassifier::default());
    let handle = ClassifierHandle::ready(classifier.clone());
    let reviewer = PolicyReviewer::new(backend, Duration::from_secs(5));
    Harness {
        service: Arc::new(ModerationService::new(handle, reviewer, store)),
        classifier,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json body")
}

pub(super) const BOUNDARY: &str = "moderation-test-boundary";

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
