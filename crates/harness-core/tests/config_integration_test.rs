//! Integration tests for the configuration loading pipeline
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Schema descriptor loading
//! - Overlay application (merge, then patch)
//! - Decoding into dynamic messages
//! - Error reporting for malformed documents

use harness_core::{Error, Overlays, Schema, Value, load_config};
use tempfile::TempDir;

const SCHEMA: &str = r#"
messages:
  - name: svc.Configuration
    fields:
      - name: db
        type: { message: svc.Postgres }
        rules: { message: { required: true } }
      - name: listen
        type: { message: svc.Server }
      - name: allowed_hosts
        type: string
        label: repeated
  - name: svc.Postgres
    fields:
      - { name: host, type: string }
      - { name: port, type: uint32 }
      - { name: connect_timeout, type: { message: google.protobuf.Duration } }
  - name: svc.Server
    fields:
      - { name: host, type: string }
      - { name: port, type: uint32 }
"#;

const CONFIG: &str = r#"
db:
  host: localhost
  port: 5432
  connectTimeout: 2.5s
listen:
  host: 0.0.0.0
  port: 8000
allowed_hosts:
  - example.com
"#;

/// Create a project directory with the standard schema and config files
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("schema.yaml"), SCHEMA).unwrap();
    std::fs::write(dir.path().join("config.yaml"), CONFIG).unwrap();
    dir
}

fn message_field<'a>(
    msg: &'a harness_core::DynamicMessage,
    name: &str,
) -> &'a harness_core::DynamicMessage {
    msg.get(name).and_then(Value::as_message).unwrap()
}

// =============================================================================
// Complete Pipeline Tests
// =============================================================================

#[test]
fn test_load_without_overlays() {
    let dir = setup_project();
    let schema = Schema::load(dir.path().join("schema.yaml")).unwrap();

    let config = load_config(
        &schema,
        "svc.Configuration",
        dir.path().join("config.yaml"),
        &Overlays::default(),
    )
    .unwrap();

    let db = message_field(&config, "db");
    assert_eq!(db.get("host"), Some(&Value::String("localhost".into())));
    assert_eq!(db.get("port"), Some(&Value::U32(5432)));
    assert_eq!(
        message_field(db, "connect_timeout").seconds_and_nanos(),
        (2, 500_000_000)
    );

    assert_eq!(
        config.get("allowed_hosts"),
        Some(&Value::List(vec![Value::String("example.com".into())]))
    );
}

#[test]
fn test_load_with_merge_and_patch_files() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("merge.yaml"),
        "db:\n  host: db.internal\nlisten: null\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("patch.json"),
        r#"[{"op": "add", "path": "/allowed_hosts/-", "value": "internal"}]"#,
    )
    .unwrap();

    let schema = Schema::load(dir.path().join("schema.yaml")).unwrap();
    let merge = dir.path().join("merge.yaml");
    let patch = dir.path().join("patch.json");
    let overlays = Overlays::load(Some(merge.as_path()), Some(patch.as_path())).unwrap();

    let config = load_config(
        &schema,
        "svc.Configuration",
        dir.path().join("config.yaml"),
        &overlays,
    )
    .unwrap();

    let db = message_field(&config, "db");
    assert_eq!(db.get("host"), Some(&Value::String("db.internal".into())));
    assert!(!config.has("listen"));
    assert_eq!(
        config.get("allowed_hosts"),
        Some(&Value::List(vec![
            Value::String("example.com".into()),
            Value::String("internal".into()),
        ]))
    );
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_unknown_field_reports_path() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("config.yaml"),
        "db:\n  hostname: localhost\n",
    )
    .unwrap();

    let schema = Schema::load(dir.path().join("schema.yaml")).unwrap();
    let err = load_config(
        &schema,
        "svc.Configuration",
        dir.path().join("config.yaml"),
        &Overlays::default(),
    )
    .unwrap_err();

    match err {
        Error::Decode { path, message } => {
            assert_eq!(path, "db");
            assert!(message.contains("hostname"));
        }
        other => panic!("Expected decode error, got {other:?}"),
    }
}

#[test]
fn test_unknown_root_type() {
    let dir = setup_project();
    let schema = Schema::load(dir.path().join("schema.yaml")).unwrap();
    let err = load_config(
        &schema,
        "svc.Missing",
        dir.path().join("config.yaml"),
        &Overlays::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownType { .. }));
}

#[test]
fn test_malformed_yaml() {
    let dir = setup_project();
    std::fs::write(dir.path().join("config.yaml"), "db: [unclosed\n").unwrap();

    let schema = Schema::load(dir.path().join("schema.yaml")).unwrap();
    let err = load_config(
        &schema,
        "svc.Configuration",
        dir.path().join("config.yaml"),
        &Overlays::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
}
