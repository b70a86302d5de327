use trellis_util::errors::TrellisError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = TrellisError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_parse_error_display() {
    let err = TrellisError::parse("bad coordinate 'a'");
    assert_eq!(err.to_string(), "Parse error: bad coordinate 'a'");
}

#[test]
fn test_conflict_error_display() {
    let err = TrellisError::Conflict {
        message: "g:m declared with 1.0 and 2.0".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Version conflict: g:m declared with 1.0 and 2.0"
    );
}

#[test]
fn test_resolution_error_display() {
    let err = TrellisError::Resolution {
        message: "missing".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency resolution failed: missing");
}

#[test]
fn test_repository_error_display() {
    let err = TrellisError::Repository {
        message: "timeout".to_string(),
    };
    assert_eq!(err.to_string(), "Repository error: timeout");
}

#[test]
fn test_config_error_display() {
    let err = TrellisError::Config {
        message: "bad toml".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: bad toml");
}

#[test]
fn test_generic_error_display() {
    let err = TrellisError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: TrellisError = io_err.into();
    assert!(matches!(err, TrellisError::Io(_)));
}
