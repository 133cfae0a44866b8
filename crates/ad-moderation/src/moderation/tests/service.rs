use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::moderation::domain::{ImageClass, RecordStatus, SubmittedImage};
use crate::moderation::images::ClassifierHandle;
use crate::moderation::repository::{JsonFileRecordStore, RecordStore};
use crate::moderation::review::{prompt, PolicyReviewer};
use crate::moderation::service::{
    FailureKind, ModerationError, ModerationOutcome, ModerationService, Rejection,
};
use axum::http::StatusCode;

#[tokio::test]
async fn approved_ad_is_persisted_with_review_reason() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::approving(), store.clone());

    let outcome = harness
        .service
        .submit(submission(vec![vehicle_photo(), vehicle_photo()]))
        .await
        .expect("submission moderated");

    assert_eq!(outcome.message(), "Car details saved successfully!");
    assert_eq!(outcome.status(), StatusCode::OK);

    let records = store.records().expect("records");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.fields, corolla_fields());
    assert_eq!(record.status, RecordStatus::Approve);
    assert_eq!(record.review_reason, "Ad follows all rules.");
    assert_eq!(record.image_class, ImageClass::Vehicle);
    assert!(record.reviewed_at.is_some());
    assert_eq!(outcome.record(), Some(record));

    let prompts = harness.service_prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0], prompt::render(&corolla_fields()));
}

#[tokio::test]
async fn classification_and_append_run_off_the_runtime_thread() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::approving(), store.clone());
    let runtime_thread = std::thread::current().id();

    harness
        .service
        .submit(submission(vec![vehicle_photo(), vehicle_photo()]))
        .await
        .expect("submission moderated");

    let inference_threads = harness.classifier.threads();
    assert_eq!(inference_threads.len(), 2);
    assert!(inference_threads
        .iter()
        .all(|thread| *thread != runtime_thread));

    let append_threads = store.append_threads();
    assert_eq!(append_threads.len(), 1);
    assert_ne!(append_threads[0], runtime_thread);
}

#[tokio::test]
async fn policy_rejection_is_persisted() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(
        ScriptedBackend::reply(
            r#"{"decision":"Reject","reason":"Abusive language in description."}"#,
        ),
        store.clone(),
    );

    let outcome = harness
        .service
        .submit(submission(vec![vehicle_photo()]))
        .await
        .expect("submission moderated");

    match &outcome {
        ModerationOutcome::Rejected(Rejection::Policy { reason, .. }) => {
            assert_eq!(reason, "Abusive language in description.");
        }
        other => panic!("expected policy rejection, got {other:?}"),
    }
    assert_eq!(
        outcome.message(),
        "Ad rejected: Abusive language in description."
    );

    let records = store.records().expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Reject);
    assert_eq!(records[0].review_reason, "Abusive language in description.");
}

#[tokio::test]
async fn non_vehicle_photo_skips_review_and_store() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::approving(), store.clone());

    let outcome = harness
        .service
        .submit(submission(vec![
            non_vehicle_photo(),
            vehicle_photo(),
            vehicle_photo(),
        ]))
        .await
        .expect("submission moderated");

    assert_eq!(
        outcome,
        ModerationOutcome::Rejected(Rejection::Image { index: 0 })
    );
    assert_eq!(
        outcome.message(),
        "Ad rejected: One or more images classified as non-vehicle."
    );
    assert_eq!(harness.classifier.calls(), 1);
    assert!(harness.service_prompts().is_empty());
    assert_eq!(store.len().expect("len"), 0);
}

#[tokio::test]
async fn empty_upload_is_a_validation_error() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::approving(), store.clone());

    let err = harness
        .service
        .submit(submission(Vec::new()))
        .await
        .expect_err("no images");

    assert!(matches!(err, ModerationError::NoImages));
    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(err.user_message(), "At least one image is required.");
    assert_eq!(harness.classifier.calls(), 0);
    assert!(harness.service_prompts().is_empty());
    assert_eq!(store.len().expect("len"), 0);
}

#[tokio::test]
async fn unloaded_model_is_reported_before_validation() {
    let store = Arc::new(MemoryStore::default());
    let reviewer = PolicyReviewer::new(ScriptedBackend::approving(), Duration::from_secs(5));
    let service = ModerationService::new(ClassifierHandle::loading(), reviewer, store.clone());

    let err = service
        .submit(submission(Vec::new()))
        .await
        .expect_err("model not ready");
    assert_eq!(err.kind(), FailureKind::ModelNotReady);
    assert_eq!(err.kind().status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.user_message(), "Model not loaded yet.");

    service.classifier().mark_failed("artifact missing");
    let err = service
        .submit(submission(vec![vehicle_photo()]))
        .await
        .expect_err("model failed to load");
    assert!(matches!(err, ModerationError::ModelNotReady));
    assert_eq!(store.len().expect("len"), 0);
}

#[tokio::test]
async fn unreachable_reviewer_leaves_store_unchanged() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::new(Script::Refused), store.clone());

    let err = harness
        .service
        .submit(submission(vec![vehicle_photo()]))
        .await
        .expect_err("reviewer unreachable");

    assert_eq!(err.kind(), FailureKind::ReviewServiceUnavailable);
    assert_eq!(
        err.user_message(),
        "Error: Cannot connect to Ollama model server. Please ensure it is running."
    );
    assert_eq!(store.len().expect("len"), 0);
}

#[tokio::test]
async fn malformed_review_output_leaves_store_unchanged() {
    for reply in [
        "Sure! looks fine",
        r#"{"decision":"Maybe","reason":"unsure"}"#,
    ] {
        let store = Arc::new(MemoryStore::default());
        let harness = harness(ScriptedBackend::reply(reply), store.clone());

        let err = harness
            .service
            .submit(submission(vec![vehicle_photo()]))
            .await
            .expect_err("malformed verdict");

        assert_eq!(err.kind(), FailureKind::MalformedReviewOutput, "reply {reply:?}");
        assert_eq!(err.kind().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.user_message().starts_with("Error during AI review: "));
        assert_eq!(harness.service_prompts().len(), 1);
        assert_eq!(store.len().expect("len"), 0);
    }
}

#[tokio::test]
async fn unreadable_photo_fails_the_submission() {
    let store = Arc::new(MemoryStore::default());
    let harness = harness(ScriptedBackend::approving(), store.clone());

    let err = harness
        .service
        .submit(submission(vec![
            vehicle_photo(),
            SubmittedImage::new(b"not an image".to_vec()),
        ]))
        .await
        .expect_err("decode failure");

    match &err {
        ModerationError::ImageDecode { index, .. } => assert_eq!(*index, 1),
        other => panic!("expected decode failure, got {other:?}"),
    }
    assert_eq!(err.kind().status(), StatusCode::BAD_REQUEST);
    assert!(harness.service_prompts().is_empty());
    assert_eq!(store.len().expect("len"), 0);
}

#[tokio::test]
async fn store_failure_is_a_server_error() {
    let harness = harness(ScriptedBackend::approving(), Arc::new(UnavailableStore));

    let err = harness
        .service
        .submit(submission(vec![vehicle_photo()]))
        .await
        .expect_err("store unavailable");

    assert_eq!(err.kind(), FailureKind::Store);
    assert_eq!(err.user_message(), "Error processing submission.");
}

#[tokio::test]
async fn json_file_store_accumulates_reviewed_ads() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(JsonFileRecordStore::new(dir.path().join("data.json")));
    let harness = harness(ContractBackend, store.clone());

    let mut rejected = submission(vec![vehicle_photo()]);
    rejected.fields.description = "Original and duplicate file available".to_string();

    harness
        .service
        .submit(submission(vec![vehicle_photo()]))
        .await
        .expect("approved");
    harness.service.submit(rejected).await.expect("rejected");
    harness
        .service
        .submit(submission(vec![non_vehicle_photo()]))
        .await
        .expect("image rejected");

    let records = store.records().expect("records");
    let statuses: Vec<_> = records.iter().map(|record| record.status).collect();
    assert_eq!(statuses, vec![RecordStatus::Approve, RecordStatus::Reject]);
}

impl Harness<ScriptedBackend, MemoryStore> {
    fn service_prompts(&self) -> Vec<String> {
        self.service.reviewer().backend().prompts()
    }
}
