#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use featuremeter_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  listen: "0.0.0.0:9100"
  enabld: false # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.metrics.enabled);
    assert_eq!(cfg.metrics.listen, "0.0.0.0:8001");
    assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    assert_eq!(cfg.upload.work_ms, 500);
    assert!(cfg.features.iter().any(|f| f.name == "quiz" && f.route == "/generate-quiz"));
}

#[test]
fn custom_features_replace_defaults() {
    let ok = r#"
version: 1
metrics:
  listen: "127.0.0.1:9100"
features:
  - name: flashcards
    route: /generate-flashcards
    work_ms: 250
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.features.len(), 1);
    assert_eq!(cfg.features[0].work_ms, 250);
    assert_eq!(cfg.metrics.listen_addr().unwrap().port(), 9100);
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "version: 2\n",
        "version: 1\nmetrics:\n  listen: \"not-an-addr\"\n",
        "version: 1\nserver:\n  listen: \"0.0.0.0:8001\"\n",
        "version: 1\nfeatures:\n  - name: \"\"\n    route: /x\n",
        "version: 1\nfeatures:\n  - name: x\n    route: upload\n",
        "version: 1\nfeatures:\n  - name: x\n    route: /upload\n",
        "version: 1\nfeatures:\n  - name: x\n    route: /x\n    work_ms: 60001\n",
        "version: 1\nupload:\n  work_ms: 999999\n",
        "version: 1\nfeatures:\n  - name: a\n    route: /x/:a\n  - name: b\n    route: /x/:b\n",
        "version: 1\nfeatures:\n  - name: a\n    route: /x/*rest\n",
        "version: 1\nfeatures:\n  - name: file_upload\n    route: /upload-v2\n",
    ];
    for yaml in cases {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{yaml}");
    }
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = config::load_or_default("/nonexistent/featuremeter.yaml").expect("defaults");
    assert_eq!(cfg.features.len(), 6);
}

#[test]
fn every_valid_config_builds_a_router() {
    use std::sync::Arc;

    use featuremeter_core::Registry;
    use featuremeter_gateway::{app_state::AppState, router};

    let ok = r#"
version: 1
metrics:
  enabled: false
features:
  - name: a
    route: /x/a
  - name: b
    route: /x/b
  - name: c
    route: /x/a-b
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let state = AppState::new(cfg, Arc::new(Registry::new())).expect("state");
    let built = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| router::build_router(state)));
    assert!(built.is_ok());
}
