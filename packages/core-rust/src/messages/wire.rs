//! JSON codec for queue records.
//!
//! Decoding inspects the `operation` field first so that unknown operations
//! are reported as [`DecodeError::UnrecognizedOperation`] rather than as a
//! generic shape mismatch. Unknown extra fields are ignored.

use serde::{Deserialize, Serialize};

use super::operation::{operation_names, Operation};
use crate::types::Item;

/// Serialized shape of a single queue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum WireMessage {
    Add {
        key: String,
        data: String,
    },
    Remove {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    Get {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    GetAll,
}

impl From<WireMessage> for Operation {
    fn from(msg: WireMessage) -> Self {
        match msg {
            WireMessage::Add { key, data } => Operation::Add(Item { key, value: data }),
            WireMessage::Remove { item_id } => Operation::Remove { key: item_id },
            WireMessage::Get { item_id } => Operation::Get { key: item_id },
            WireMessage::GetAll => Operation::GetAll,
        }
    }
}

impl From<&Operation> for WireMessage {
    fn from(op: &Operation) -> Self {
        match op {
            Operation::Add(item) => WireMessage::Add {
                key: item.key.clone(),
                data: item.value.clone(),
            },
            Operation::Remove { key } => WireMessage::Remove {
                item_id: key.clone(),
            },
            Operation::Get { key } => WireMessage::Get {
                item_id: key.clone(),
            },
            Operation::GetAll => WireMessage::GetAll,
        }
    }
}

/// Errors produced while decoding a queue record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed operation payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("operation field is missing")]
    MissingOperation,
    #[error("unrecognized operation {0:?}")]
    UnrecognizedOperation(String),
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    operation: Option<String>,
}

/// Decodes one JSON record into an [`Operation`].
///
/// # Errors
///
/// - [`DecodeError::Malformed`] if the body is not a JSON object of the
///   expected shape.
/// - [`DecodeError::MissingOperation`] if there is no `operation` field.
/// - [`DecodeError::UnrecognizedOperation`] if the `operation` value names no
///   known variant.
pub fn decode(body: &str) -> Result<Operation, DecodeError> {
    let header: Header = serde_json::from_str(body)?;
    let name = header.operation.ok_or(DecodeError::MissingOperation)?;
    if !operation_names::ALL.contains(&name.as_str()) {
        return Err(DecodeError::UnrecognizedOperation(name));
    }

    let msg: WireMessage = serde_json::from_str(body)?;
    Ok(msg.into())
}

/// Encodes an [`Operation`] as a single-line JSON record.
///
/// # Errors
///
/// Returns the serializer error, which cannot occur for the string-only
/// shapes produced here but is propagated rather than swallowed.
pub fn encode(op: &Operation) -> serde_json::Result<String> {
    serde_json::to_string(&WireMessage::from(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_add() {
        let op = decode(r#"{"operation":"Add","key":"K","data":"V"}"#).unwrap();
        assert_eq!(op, Operation::add("K", "V"));
    }

    #[test]
    fn decodes_remove_and_get_from_item_id() {
        assert_eq!(
            decode(r#"{"operation":"Remove","itemId":"K"}"#).unwrap(),
            Operation::remove("K")
        );
        assert_eq!(
            decode(r#"{"operation":"Get","itemId":"K"}"#).unwrap(),
            Operation::get("K")
        );
    }

    #[test]
    fn decodes_get_all_ignoring_extra_fields() {
        let op = decode(r#"{"operation":"GetAll","sentAt":12345}"#).unwrap();
        assert_eq!(op, Operation::GetAll);
    }

    #[test]
    fn unknown_operation_is_reported_by_name() {
        let err = decode(r#"{"operation":"Truncate"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnrecognizedOperation(ref name) if name == "Truncate"));
        assert_eq!(err.to_string(), r#"unrecognized operation "Truncate""#);
    }

    #[test]
    fn missing_operation_field() {
        let err = decode(r#"{"key":"K","data":"V"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingOperation));
    }

    #[test]
    fn missing_variant_field_is_malformed() {
        let err = decode(r#"{"operation":"Remove"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(decode("+K=V"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn encodes_documented_shapes() {
        assert_eq!(
            encode(&Operation::add("K", "V")).unwrap(),
            r#"{"operation":"Add","key":"K","data":"V"}"#
        );
        assert_eq!(
            encode(&Operation::remove("K")).unwrap(),
            r#"{"operation":"Remove","itemId":"K"}"#
        );
        assert_eq!(
            encode(&Operation::get("K")).unwrap(),
            r#"{"operation":"Get","itemId":"K"}"#
        );
        assert_eq!(
            encode(&Operation::GetAll).unwrap(),
            r#"{"operation":"GetAll"}"#
        );
    }

    #[test]
    fn values_with_quotes_survive_encoding() {
        let op = Operation::add("k\"1", "line\nbreak");
        let decoded = decode(&encode(&op).unwrap()).unwrap();
        assert_eq!(decoded, op);
    }
}
