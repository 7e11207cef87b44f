//! Tests for error types

use modelrun_db::{Error, ValidationError};

#[test]
fn test_validation_error_display() {
    let error: Error = ValidationError::InvalidValue {
        name: "gabor_orientations".to_string(),
        reason: "expected int, got 0.45".to_string(),
    }
    .into();
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation error"));
    assert!(error_str.contains("gabor_orientations"));
    assert!(error_str.contains("0.45"));
}

#[test]
fn test_illegal_transition_error() {
    let error = Error::IllegalTransition {
        from: "IDLE",
        to: "SUCCESS",
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Illegal state transition"));
    assert!(error_str.contains("IDLE -> SUCCESS"));
}

#[test]
fn test_wrong_kind_error() {
    let error = Error::WrongKind {
        attachment: "frames".to_string(),
        kind: "IMAGEARCHIVE",
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("frames"));
    assert!(error_str.contains("IMAGEARCHIVE"));
    assert!(error_str.contains("DATAFILE"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("disk full".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("disk full"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_json_error_is_malformed_record() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::MalformedRecord(_)));
}

#[test]
fn test_client_error_mapping() {
    let client = [
        Error::from(ValidationError::UnknownArgument("x".into())),
        Error::InvalidState("RUNNING".into()),
        Error::Conflict("kind".into()),
        Error::InvalidIdentifier("../x".into()),
        Error::WrongKind {
            attachment: "a".into(),
            kind: "IMAGEARCHIVE",
        },
    ];
    for error in &client {
        assert!(error.is_client_error(), "{error}");
    }

    let server = [
        Error::StorageError("x".into()),
        Error::MalformedRecord("x".into()),
        Error::Config("x".into()),
        Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
    ];
    for error in &server {
        assert!(!error.is_client_error(), "{error}");
    }
}

#[test]
fn test_error_debug() {
    let error = Error::Conflict("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Conflict"));
}
