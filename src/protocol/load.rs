//! Loading boundary: text or files in, typed [`Protocol`] out.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::types::Protocol;
use crate::error::ProtocolError;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts an already-parsed document. Fails only when the root is not an
/// object or carries no `id`; everything below the root is lenient.
pub fn protocol_from_value(value: Value) -> Result<Protocol, ProtocolError> {
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject {
            found: json_kind(&value),
        });
    }
    let protocol: Protocol = serde_json::from_value(value)?;
    if protocol.id.trim().is_empty() {
        return Err(ProtocolError::MissingId);
    }
    Ok(protocol)
}

pub fn parse_protocol(text: &str) -> Result<Protocol, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    protocol_from_value(value)
}

pub fn read_protocol_file(path: &Path) -> Result<Protocol, ProtocolError> {
    let text = fs::read_to_string(path)?;
    parse_protocol(&text)
}

/// Finds `<id>.json` in `dir`, matching the file name case-insensitively.
///
/// Any failure (missing directory, no such file, unreadable or invalid
/// document) is logged and reported as "no protocol".
pub fn find_protocol(dir: &Path, id: &str) -> Option<Protocol> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    let target = format!("{}.json", id.to_lowercase());

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list protocol directory");
            return None;
        }
    };

    let mut candidates: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.to_lowercase() == target)
        })
        .collect();
    candidates.sort();

    let Some(path) = candidates.into_iter().next() else {
        tracing::debug!(protocol_id = id, "No protocol file found");
        return None;
    };

    match read_protocol_file(&path) {
        Ok(protocol) => Some(protocol),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load protocol");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_non_object_root_fails_fast() {
        let err = protocol_from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnObject { found: "array" }));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let err = parse_protocol(r#"{"titulo": "Sin id"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingId));
    }

    #[test]
    fn test_invalid_json_is_a_json_error() {
        let err = parse_protocol("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn test_wrongly_typed_fields_degrade() {
        let protocol = parse_protocol(
            r#"{"id": "x", "titulo": 7, "versiones": [null, {"id": "v1", "evaluacion": "none"}]}"#,
        )
        .unwrap();
        assert_eq!(protocol.titulo.as_deref(), Some("7"));
        assert_eq!(protocol.versiones.len(), 1);
        assert!(protocol.versiones[0].blocks.evaluacion.is_none());
    }

    #[test]
    fn test_find_protocol_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("PNET5.json")).unwrap();
        write!(file, r#"{{"id": "pnet5", "titulo": "PNET 5"}}"#).unwrap();

        let protocol = find_protocol(dir.path(), " pnet5 ").unwrap();
        assert_eq!(protocol.id, "pnet5");
    }

    #[test]
    fn test_find_protocol_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_protocol(dir.path(), "siop").is_none());
        assert!(find_protocol(dir.path(), "").is_none());
    }

    #[test]
    fn test_find_protocol_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("roto.json"), "{").unwrap();
        assert!(find_protocol(dir.path(), "roto").is_none());
    }

    #[test]
    fn test_find_protocol_missing_directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_protocol(&dir.path().join("nope"), "pnet5").is_none());
    }

    #[test]
    fn test_read_protocol_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_protocol_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }
}
