use base64::{engine::general_purpose::STANDARD, Engine as _};
use dentcheck_atoms::media::{MemoryObjectStore, ObjectStore};
use dentcheck_atoms::shapes::{AnnotationSet, Shape, ShapeKind, SurfaceSize};
use dentcheck_atoms::submissions::{
    self, CreateSubmissionPayload, MemorySubmissionStore, SubmissionStatus, SubmissionStore,
};
use dentcheck_atoms::users::{Actor, Role};
use dentcheck_atoms::CoreError;

fn actor(id: &str, role: Role) -> Actor {
    Actor {
        user_id: id.to_string(),
        user_name: format!("{} name", id),
        user_email: format!("{}@example.com", id),
        user_role: role,
    }
}

fn upload(note: Option<&str>) -> CreateSubmissionPayload {
    CreateSubmissionPayload {
        note: note.map(str::to_string),
        image: Some(STANDARD.encode([0x89, b'P', b'N', b'G'])),
        file_name: Some("teeth.jpg".to_string()),
    }
}

#[tokio::test]
async fn upload_creates_pending_submission_with_snapshot() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let patient = actor("patient-1", Role::Patient);

    let submission = submissions::create_submission(&store, &objects, &patient, upload(Some("Sore gum")))
        .await
        .expect("upload should succeed");

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.patient_details.name, "patient-1 name");
    assert_eq!(submission.patient_details.note.as_deref(), Some("Sore gum"));
    assert_eq!(submission.annotations, "[]");

    let stored = objects.get(&submission.original_image_url).await.unwrap();
    assert_eq!(stored, vec![0x89, b'P', b'N', b'G']);
    let key = &objects.keys()[0];
    assert!(key.ends_with(".jpg"));
    assert_eq!(objects.content_type(key).as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn upload_without_image_is_a_validation_error() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let patient = actor("patient-1", Role::Patient);

    let payload = CreateSubmissionPayload { note: None, image: None, file_name: None };
    let err = submissions::create_submission(&store, &objects, &patient, payload).await.unwrap_err();
    assert_eq!(err.category(), "validation");
    assert!(store.list().await.unwrap().is_empty());
    assert!(objects.keys().is_empty());
}

#[tokio::test]
async fn admin_cannot_upload_as_patient() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let err = submissions::create_submission(&store, &objects, &actor("admin", Role::Admin), upload(None))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "forbidden");
}

#[tokio::test]
async fn annotate_then_reject_moves_through_statuses() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let patient = actor("patient-1", Role::Patient);
    let admin = actor("admin-1", Role::Admin);

    let created = submissions::create_submission(&store, &objects, &patient, upload(None)).await.unwrap();
    let id = created.submission_id.clone();

    let set = AnnotationSet::from(vec![Shape { id: 1, tool: ShapeKind::Rectangle, points: [10.0, 10.0, 50.0, 50.0] }]);
    let annotated = submissions::record_annotation(
        &store,
        &id,
        &set,
        Some(SurfaceSize::new(100.0, 100.0)),
        Some("annotated/annotated-x.png".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(annotated.status, SubmissionStatus::Processed);
    assert_eq!(annotated.annotation_set(), set);

    let rejected = submissions::reject_submission(&store, &admin, &id).await.unwrap();
    assert_eq!(rejected.status, SubmissionStatus::Rejected);

    // Rejection closes the record to further annotation and reporting.
    let err = submissions::ensure_open(&store.fetch(&id).await.unwrap()).unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn reject_directly_from_pending() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let created = submissions::create_submission(&store, &objects, &actor("p", Role::Patient), upload(None))
        .await
        .unwrap();

    let rejected = submissions::reject_submission(&store, &actor("a", Role::Admin), &created.submission_id)
        .await
        .unwrap();
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn reject_unknown_submission_is_not_found() {
    let store = MemorySubmissionStore::new();
    let err = submissions::reject_submission(&store, &actor("a", Role::Admin), "missing")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "not_found");
}

#[tokio::test]
async fn patients_only_see_their_own_submissions() {
    let store = MemorySubmissionStore::new();
    let objects = MemoryObjectStore::new();
    let alice = actor("alice", Role::Patient);
    let bob = actor("bob", Role::Patient);
    let admin = actor("admin", Role::Admin);

    let mine = submissions::create_submission(&store, &objects, &alice, upload(None)).await.unwrap();
    submissions::create_submission(&store, &objects, &bob, upload(None)).await.unwrap();

    let listed = submissions::list_for_patient(&store, &alice).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].submission_id, mine.submission_id);

    let err = submissions::get_for_actor(&store, &bob, &mine.submission_id).await.unwrap_err();
    assert_eq!(err.category(), "forbidden");
    assert!(submissions::get_for_actor(&store, &admin, &mine.submission_id).await.is_ok());

    assert_eq!(submissions::list_all(&store, &admin).await.unwrap().len(), 2);
    assert_eq!(submissions::list_all(&store, &alice).await.unwrap_err().category(), "forbidden");
}
