use super::*;

#[test]
fn test_bundle_not_found_display() {
    let error = DeploymentError::BundleNotFound {
        path: PathBuf::from("root/prod/svc/bundle.cue"),
    };
    assert_eq!(
        error.to_string(),
        "Bundle file not found: \"root/prod/svc/bundle.cue\""
    );
}

#[test]
fn test_bundle_update_keeps_document_error() {
    let error = DeploymentError::BundleUpdate {
        path: PathBuf::from("bundle.cue"),
        source: cue_document::Error::PathNotFound {
            path: "bundle.instances".to_string(),
        },
    };

    assert!(error.to_string().contains("Path bundle.instances does not exist"));
    let source = std::error::Error::source(&error).expect("Expected an error source");
    assert_eq!(source.to_string(), "Path bundle.instances does not exist");
}

#[test]
fn test_invalid_template_pair_display() {
    let error = DeploymentError::InvalidTemplatePair {
        pair: "TAG".to_string(),
    };
    assert_eq!(error.to_string(), "Invalid template 'TAG': expected key=value");
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DeploymentError>();
}
