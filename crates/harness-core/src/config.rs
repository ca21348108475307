//! Configuration loading
//!
//! A service configuration is a YAML document with a mapping at the root.
//! Two optional overlays can be applied on top of it before decoding:
//!
//! - `merge` - an RFC 7396 JSON merge patch
//! - `patch` - an RFC 6902 JSON patch (list of operations)
//!
//! Overlays are applied in that order.

use serde_json::Value as Json;
use std::path::Path;

use crate::decode::decode;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::DynamicMessage;

/// Overlay documents applied on top of the base configuration
#[derive(Debug, Clone, Default)]
pub struct Overlays {
    /// RFC 7396 merge patch
    pub merge: Option<Json>,

    /// RFC 6902 JSON patch
    pub patch: Option<Json>,
}

impl Overlays {
    /// Read overlay documents from files
    ///
    /// Both files may be YAML or JSON.
    pub fn load(merge: Option<&Path>, patch: Option<&Path>) -> Result<Self> {
        Ok(Self {
            merge: merge.map(read_yaml).transpose()?,
            patch: patch.map(read_yaml).transpose()?,
        })
    }
}

fn read_yaml(path: &Path) -> Result<Json> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.display().to_string(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Parse a configuration document and apply overlays
///
/// An empty document is treated as an empty mapping.
pub fn load_document(content: &str, overlays: &Overlays) -> Result<Json> {
    let mut document = if content.trim().is_empty() {
        Json::Object(Default::default())
    } else {
        serde_yaml::from_str::<Json>(content)?
    };

    if document.is_null() {
        document = Json::Object(Default::default());
    }
    if !document.is_object() {
        return Err(Error::ConfigInvalid {
            message: "Invalid configuration format, a mapping is expected at the root".to_string(),
        });
    }

    if let Some(merge) = &overlays.merge {
        json_patch::merge(&mut document, merge);
        tracing::debug!("Applied merge overlay");
    }

    if let Some(patch) = &overlays.patch {
        let patch: json_patch::Patch = serde_json::from_value(patch.clone())?;
        json_patch::patch(&mut document, &patch.0)?;
        tracing::debug!(operations = patch.0.len(), "Applied patch overlay");
    }

    Ok(document)
}

/// Load a configuration file into an instance of `type_name`
///
/// # Example
///
/// ```rust,ignore
/// let schema = Schema::load("schema.yaml")?;
/// let config = load_config(&schema, "svc.Configuration", "config.yaml", &Overlays::default())?;
/// ```
pub fn load_config<P: AsRef<Path>>(
    schema: &Schema,
    type_name: &str,
    path: P,
    overlays: &Overlays,
) -> Result<DynamicMessage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let document = load_document(&contents, overlays)?;
    let message = decode(schema, type_name, &document)?;

    tracing::debug!(path = %path.display(), type_name, "Configuration loaded");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_is_mapping() {
        let doc = load_document("", &Overlays::default()).unwrap();
        assert_eq!(doc, json!({}));

        let doc = load_document("~", &Overlays::default()).unwrap();
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn test_non_mapping_rejected() {
        let err = load_document("- a\n- b\n", &Overlays::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration format"));
    }

    #[test]
    fn test_merge_then_patch() {
        let overlays = Overlays {
            merge: Some(json!({ "db": { "port": 5433, "host": null } })),
            patch: Some(json!([
                { "op": "replace", "path": "/db/port", "value": 6432 },
                { "op": "add", "path": "/debug", "value": true },
            ])),
        };
        let doc = load_document("db:\n  host: localhost\n  port: 5432\n", &overlays).unwrap();
        assert_eq!(doc, json!({ "db": { "port": 6432 }, "debug": true }));
    }

    #[test]
    fn test_invalid_patch_path() {
        let overlays = Overlays {
            merge: None,
            patch: Some(json!([{ "op": "remove", "path": "/missing" }])),
        };
        let result = load_document("a: 1\n", &overlays);
        assert!(matches!(result, Err(Error::Patch(_))));
    }

    #[test]
    fn test_load_overlays_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let merge = dir.path().join("merge.yaml");
        std::fs::write(&merge, "debug: true\n").unwrap();

        let overlays = Overlays::load(Some(merge.as_path()), None).unwrap();
        assert_eq!(overlays.merge, Some(json!({ "debug": true })));
        assert!(overlays.patch.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let schema = Schema::from_yaml("messages: [{ name: test.Empty }]").unwrap();
        let result = load_config(
            &schema,
            "test.Empty",
            "/nonexistent/config.yaml",
            &Overlays::default(),
        );
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }
}
