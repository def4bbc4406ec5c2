use annotations_block::export::encode_png;
use annotations_block::submissions::{annotate_handler, save_annotation, AnnotatePayload};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dentcheck_atoms::media::{MemoryObjectStore, ObjectStore};
use dentcheck_atoms::shapes::{AnnotationSet, Shape, ShapeKind, SurfaceSize};
use dentcheck_atoms::submissions::{
    MemorySubmissionStore, PatientDetails, Submission, SubmissionStatus, SubmissionStore, SubmissionUpdate,
};
use dentcheck_atoms::users::{Actor, Role};
use image::{Rgba, RgbaImage};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

fn admin() -> Actor {
    Actor {
        user_id: "admin-1".to_string(),
        user_name: "Dr Admin".to_string(),
        user_email: "admin@example.com".to_string(),
        user_role: Role::Admin,
    }
}

async fn seed(store: &MemorySubmissionStore, objects: &MemoryObjectStore, id: &str) -> Submission {
    let photo = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
    let url = objects
        .put("images/original.png", encode_png(&photo).unwrap(), "image/png")
        .await
        .unwrap();
    let submission = Submission {
        submission_id: id.to_string(),
        patient_id: "p-1".to_string(),
        patient_details: PatientDetails {
            name: "Jane Doe".to_string(),
            patient_id: "p-1".to_string(),
            email: "jane@example.com".to_string(),
            note: None,
        },
        original_image_url: url,
        annotated_image_url: None,
        annotations: "[]".to_string(),
        annotation_surface: None,
        status: SubmissionStatus::Pending,
        report_url: None,
        created_at: "2024-06-01T10:00:00Z".to_string(),
        updated_at: "2024-06-01T10:00:00Z".to_string(),
    };
    store.insert(&submission).await.unwrap();
    submission
}

fn rect_blob() -> String {
    AnnotationSet::from(vec![Shape { id: 1, tool: ShapeKind::Rectangle, points: [10.0, 10.0, 50.0, 50.0] }]).encode()
}

#[tokio::test]
async fn supplied_image_is_stored_under_conventional_name() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-1").await;

    let payload = AnnotatePayload {
        annotations: rect_blob(),
        surface: Some(SurfaceSize::new(100.0, 100.0)),
        annotated_image: Some(STANDARD.encode(b"flattened")),
        extension: Some("png".to_string()),
    };
    let saved = save_annotation(&store, &objects, &admin(), "sub-1", payload, TIMEOUT).await.unwrap();

    assert_eq!(saved.status, SubmissionStatus::Processed);
    assert_eq!(saved.annotations, rect_blob());
    assert_eq!(saved.annotation_surface, Some(SurfaceSize::new(100.0, 100.0)));
    let url = saved.annotated_image_url.unwrap();
    assert!(url.ends_with("annotated/annotated-sub-1.png"));
    assert_eq!(objects.get(&url).await.unwrap(), b"flattened".to_vec());
}

#[tokio::test]
async fn server_flattens_at_native_resolution_when_no_image_sent() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-2").await;

    let payload = AnnotatePayload {
        annotations: rect_blob(),
        surface: Some(SurfaceSize::new(100.0, 100.0)),
        annotated_image: None,
        extension: None,
    };
    let saved = save_annotation(&store, &objects, &admin(), "sub-2", payload, TIMEOUT).await.unwrap();

    let bytes = objects.get(saved.annotated_image_url.as_deref().unwrap()).await.unwrap();
    let flattened = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(flattened.dimensions(), (200, 200));
    // Display (10,10)-(50,50) lands on native (20,20)-(100,100).
    assert_eq!(*flattened.get_pixel(20, 60), Rgba([255, 0, 0, 255]));
    assert_eq!(*flattened.get_pixel(60, 60), Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn malformed_blob_is_refused_and_record_kept() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-3").await;
    let first = AnnotatePayload {
        annotations: rect_blob(),
        surface: Some(SurfaceSize::new(100.0, 100.0)),
        annotated_image: Some(STANDARD.encode(b"first pass")),
        extension: Some("png".to_string()),
    };
    let before = save_annotation(&store, &objects, &admin(), "sub-3", first, TIMEOUT).await.unwrap();
    let keys_before = objects.keys();

    let malformed = [
        r#"[{"id":1,"tool":"Square","points":[1,2,3,4]}]"#,
        "{oops",
        r#"[{"id":1,"tool":"Rect","points":[0,0,0]}]"#,
    ];
    for blob in malformed {
        let payload = AnnotatePayload {
            annotations: blob.to_string(),
            surface: None,
            annotated_image: Some(STANDARD.encode(b"second pass")),
            extension: Some("png".to_string()),
        };
        let err = save_annotation(&store, &objects, &admin(), "sub-3", payload, TIMEOUT).await.unwrap_err();
        assert_eq!(err.category(), "validation", "blob {}", blob);
    }

    let after = store.fetch("sub-3").await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.annotations, rect_blob());
    assert!(after.annotated_image_url.is_some());
    assert_eq!(objects.keys(), keys_before);
    assert_eq!(objects.get(after.annotated_image_url.as_deref().unwrap()).await.unwrap(), b"first pass".to_vec());
}

#[tokio::test]
async fn handler_answers_malformed_blob_with_bad_request() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let seeded = seed(&store, &objects, "sub-6").await;

    let body = serde_json::json!({ "annotations": r#"[{"id":1,"tool":"Square","points":[1,2,3,4]}]"# }).to_string();
    let resp = annotate_handler(&store, &objects, &admin(), "sub-6", body.as_bytes(), TIMEOUT).await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(store.fetch("sub-6").await.unwrap(), seeded);
}

#[tokio::test]
async fn blank_blob_saves_an_empty_set() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-7").await;

    let payload = AnnotatePayload { annotations: "  ".to_string(), surface: None, annotated_image: None, extension: None };
    let saved = save_annotation(&store, &objects, &admin(), "sub-7", payload, TIMEOUT).await.unwrap();
    assert_eq!(saved.annotations, "[]");
    assert!(saved.annotated_image_url.is_none());
    assert_eq!(saved.status, SubmissionStatus::Processed);
}

#[tokio::test]
async fn rejected_submission_refuses_annotation() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-4").await;
    store.update("sub-4", SubmissionUpdate::Rejected).await.unwrap();

    let payload = AnnotatePayload { annotations: rect_blob(), surface: None, annotated_image: None, extension: None };
    let err = save_annotation(&store, &objects, &admin(), "sub-4", payload, TIMEOUT).await.unwrap_err();
    assert_eq!(err.category(), "conflict");
    assert_eq!(store.fetch("sub-4").await.unwrap().status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn handler_maps_errors_to_status_codes() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    seed(&store, &objects, "sub-5").await;

    let mut patient = admin();
    patient.user_role = Role::Patient;
    let body = serde_json::json!({ "annotations": "[]" }).to_string();

    let resp = annotate_handler(&store, &objects, &patient, "sub-5", body.as_bytes(), TIMEOUT).await.unwrap();
    assert_eq!(resp.status(), 403);

    let resp = annotate_handler(&store, &objects, &admin(), "nope", body.as_bytes(), TIMEOUT).await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = annotate_handler(&store, &objects, &admin(), "sub-5", b"not json", TIMEOUT).await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = annotate_handler(&store, &objects, &admin(), "sub-5", body.as_bytes(), TIMEOUT).await.unwrap();
    assert_eq!(resp.status(), 200);
    // Untouched after the forbidden attempt, processed after the admin save.
    assert_eq!(store.fetch("sub-5").await.unwrap().status, SubmissionStatus::Processed);
}
