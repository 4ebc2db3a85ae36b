//! Versioned on-disk layout of a collection.
//!
//! Current layout: `{"schemaVersion": 1, "records": [...]}`.
//! Version 0 is the legacy layout: a bare JSON array of records.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::StoreError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    records: &'a [T],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeHeader {
    schema_version: u32,
    records: Value,
}

pub fn encode<T: Serialize>(records: &[T]) -> Result<String, StoreError> {
    serde_json::to_string(&EnvelopeRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        records,
    })
    .map_err(StoreError::Encode)
}

/// Decodes a stored collection. `None` (key never written) is an empty collection.
pub fn decode<T: DeserializeOwned>(
    collection: &'static str,
    raw: Option<&str>,
) -> Result<Vec<T>, StoreError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let schema_err = |source| StoreError::Schema { collection, source };

    let value: Value = serde_json::from_str(raw).map_err(schema_err)?;
    let records = match value {
        Value::Array(_) => value,
        Value::Object(_) => {
            let header: EnvelopeHeader = serde_json::from_value(value).map_err(schema_err)?;
            if header.schema_version != CURRENT_SCHEMA_VERSION {
                return Err(StoreError::UnsupportedVersion {
                    collection,
                    found: header.schema_version,
                });
            }
            header.records
        }
        other => {
            return Err(StoreError::Shape {
                collection,
                found: json_kind(&other),
            })
        }
    };
    serde_json::from_value(records).map_err(schema_err)
}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Rec {
        id: String,
    }

    #[test]
    fn test_absent_collection_is_empty() {
        let recs: Vec<Rec> = decode("words", None).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_encode_writes_current_version() {
        let raw = encode(&[Rec { id: "a".into() }]).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schemaVersion"], CURRENT_SCHEMA_VERSION);
        assert_eq!(value["records"][0]["id"], "a");
    }

    #[test]
    fn test_legacy_bare_array_is_accepted() {
        let recs: Vec<Rec> = decode("words", Some(r#"[{"id":"x"},{"id":"y"}]"#)).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].id, "y");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = decode::<Rec>("sets", Some(r#"{"schemaVersion":7,"records":[]}"#)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion {
                collection: "sets",
                found: 7
            }
        ));
    }

    #[test]
    fn test_record_shape_mismatch_is_schema_error() {
        let err = decode::<Rec>("sets", Some(r#"{"schemaVersion":1,"records":[{"name":1}]}"#))
            .unwrap_err();
        assert!(matches!(err, StoreError::Schema { collection: "sets", .. }));
    }

    #[test]
    fn test_scalar_document_is_shape_error() {
        let err = decode::<Rec>("sets", Some("42")).unwrap_err();
        assert!(matches!(err, StoreError::Shape { found: "number", .. }));
    }
}
