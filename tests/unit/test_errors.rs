// Error taxonomy and backend diagnostics

use adt_client::core::errors::{snippet, AdtError, BackendDetail, ErrorKind, BODY_SNIPPET_LIMIT};
use adt_client::core::models::Response;

use crate::common::exception_body;

#[test]
fn test_backend_detail_from_exception_document() {
    let detail = BackendDetail::from_body(&exception_body(
        "ExceptionResourceAlreadyLocked",
        "User OTHER is currently editing Z_REPORT",
    ))
    .unwrap();
    assert_eq!(
        detail.exception_type.as_deref(),
        Some("ExceptionResourceAlreadyLocked")
    );
    assert_eq!(
        detail.message.as_deref(),
        Some("User OTHER is currently editing Z_REPORT")
    );
}

#[test]
fn test_backend_detail_ignores_other_documents() {
    assert!(BackendDetail::from_body("<html><body>Service unavailable</body></html>").is_none());
    assert!(BackendDetail::from_body("exception, but not XML").is_none());
}

#[test]
fn test_error_for_status_keeps_diagnostics() {
    let body = exception_body("ExceptionResourceNotFound", "Program Z_NONE does not exist");
    let err = Response::new(404).with_body(body).error_for_status().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.kind().to_string(), "BackendError");
    assert_eq!(err.status(), Some(404));
    assert!(err.body_snippet().unwrap().contains("Z_NONE"));
    assert!(!err.is_transient());
}

#[test]
fn test_long_bodies_are_truncated() {
    let body = "é".repeat(BODY_SNIPPET_LIMIT + 10);
    let cut = snippet(&body);
    assert_eq!(cut.chars().count(), BODY_SNIPPET_LIMIT + 3);
    assert!(cut.ends_with("..."));

    let err = Response::new(500).with_body(body).error_for_status().unwrap_err();
    assert_eq!(err.body_snippet(), Some(cut.as_str()));
}

#[test]
fn test_unlock_failure_is_secondary() {
    let primary = AdtError::Backend {
        status: 500,
        body: "dump".to_string(),
        detail: None,
    };
    let unlock = AdtError::UnlockFailed {
        object_uri: "/programs/programs/z_report".to_string(),
        reason: "enqueue server down".to_string(),
        status: Some(503),
        body: None,
    };

    let err = primary.with_unlock_failure(unlock);
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.body_snippet(), Some("dump"));
    assert_eq!(err.suppressed_unlock().unwrap().kind(), ErrorKind::UnlockFailed);
    assert!(err.to_string().contains("unlock also failed"));
}
