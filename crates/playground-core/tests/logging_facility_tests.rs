#![allow(clippy::unwrap_used, clippy::expect_used)]

use playground_core::errors::{ExError, PlaygroundError};
use playground_core::logging_facility::test_capture::init_test_capture;
use playground_core::schema::{self, EVENT_END, EVENT_END_ERROR, EVENT_START};
use playground_core::{log_op_end, log_op_error, log_op_start, RequestId};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
fn test_log_op_start_carries_extra_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_fields_unique_2";

    log_op_start!(op_name, contents_len = 12_usize);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("contents_len"), Some("12"));
    assert!(events[0]
        .component
        .as_deref()
        .is_some_and(|c| c.starts_with("logging_facility_tests")));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_3";

    log_op_end!(op_name, duration_ms = 42);

    let end_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field(schema::FIELD_DURATION_MS), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_4";

    let err = PlaygroundError::SnippetNotFound {
        id: "s1".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let error_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();

    assert_eq!(error_events.len(), 1, "Should have exactly one error event");
    let error_event = &error_events[0];
    assert_eq!(error_event.field(schema::FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
    assert_eq!(error_event.field(schema::FIELD_ERR_KIND), Some("NotFound"));
    assert_eq!(error_event.field(schema::FIELD_ERR_MESSAGE), Some("snippet not found"));
}

#[test]
fn test_log_op_error_carries_request_id() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_request_id_unique_6";

    let err = ExError::from(PlaygroundError::MissingId)
        .with_request_id(RequestId::from_header(Some("req-77")));
    log_op_error!(op_name, err, duration_ms = 2);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field(schema::FIELD_REQUEST_ID), Some("req-77"));
}

#[test]
fn test_single_start_and_end_per_operation() {
    let capture = init_test_capture();
    let op_name = "test_boundary_unique_5";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 1, output_len = 3_usize);

    let start_count = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    let end_count = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END)
    });
    assert_eq!(start_count, 1);
    assert_eq!(end_count, 1);
}
