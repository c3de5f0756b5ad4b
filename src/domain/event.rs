use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::errors::{OutboxError, OutboxResult};
use super::log_record::LogRecord;

/// Operation marker carried by data-change and snapshot events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOp {
    #[serde(rename = "C")]
    Create,
    #[serde(rename = "U")]
    Update,
    #[serde(rename = "D")]
    Delete,
    #[serde(rename = "S")]
    Snapshot,
}

/// How a payload is shaped on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    DataChange { op: DataOp, data_type: String },
    Business,
}

impl EventKind {
    pub fn data_change(op: DataOp, data_type: impl Into<String>) -> Self {
        EventKind::DataChange {
            op,
            data_type: data_type.into(),
        }
    }
}

/// Serializes a payload into the body stored on the outbox row.
///
/// Data-change bodies are stored pre-shaped as `{data_op, data_type, data}`;
/// business bodies are stored as the payload object itself, so the envelope
/// at send time is the same merge for both kinds.
pub fn encode_body<T: Serialize + ?Sized>(kind: &EventKind, payload: &T) -> OutboxResult<String> {
    let data = serde_json::to_value(payload)?;
    let body = match kind {
        EventKind::DataChange { op, data_type } => json!({
            "data_op": op,
            "data_type": data_type,
            "data": data,
        }),
        EventKind::Business => {
            if !data.is_object() {
                return Err(OutboxError::InvalidPayload(
                    "business event payload must serialize to a JSON object".to_string(),
                ));
            }
            data
        }
    };
    Ok(serde_json::to_string(&body)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMetadata {
    pub eid: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
}

/// One outgoing broker message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub metadata: EventMetadata,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Envelope {
    pub fn from_record(record: &LogRecord) -> OutboxResult<Self> {
        let mut body = match serde_json::from_str::<Value>(&record.body)? {
            Value::Object(map) => map,
            _ => {
                return Err(OutboxError::InvalidPayload(format!(
                    "body of outbox record {} is not a JSON object",
                    record.id
                )))
            }
        };
        body.remove("metadata");

        Ok(Envelope {
            metadata: EventMetadata {
                eid: record.eid(),
                occurred_at: record.created_at,
                flow_id: record.flow_id.clone(),
            },
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_body(body: String) -> LogRecord {
        let created_at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        LogRecord {
            id: 7,
            event_type: "order.changed".to_string(),
            body,
            flow_id: Some("flow-1".to_string()),
            compaction_key: None,
            eid: None,
            created_at,
            last_modified_at: created_at,
            locked_by: None,
            locked_until: None,
        }
    }

    #[test]
    fn data_change_envelope_nests_payload_under_data() {
        let kind = EventKind::data_change(DataOp::Update, "order");
        let body = encode_body(&kind, &json!({"id": 1, "status": "PAID"})).unwrap();

        let envelope = Envelope::from_record(&record_with_body(body)).unwrap();
        let wire = serde_json::to_value(&envelope).unwrap();

        assert_eq!(wire["data_op"], "U");
        assert_eq!(wire["data_type"], "order");
        assert_eq!(wire["data"]["status"], "PAID");
        assert_eq!(wire["metadata"]["flow_id"], "flow-1");
        assert_eq!(wire["metadata"]["occurred_at"], "2024-05-01T10:00:00Z");
        assert_eq!(
            wire["metadata"]["eid"],
            "00000000-0000-0000-0000-000000000007"
        );
    }

    #[test]
    fn business_envelope_merges_payload_at_top_level() {
        let body = encode_body(&EventKind::Business, &json!({"order_id": 42})).unwrap();

        let mut record = record_with_body(body);
        record.flow_id = None;
        let wire = serde_json::to_value(Envelope::from_record(&record).unwrap()).unwrap();

        assert_eq!(wire["order_id"], 42);
        assert!(wire.get("data").is_none());
        assert!(wire.get("data_op").is_none());
        assert!(wire["metadata"].get("flow_id").is_none());
    }

    #[test]
    fn business_payload_must_be_an_object() {
        let err = encode_body(&EventKind::Business, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, OutboxError::InvalidPayload(_)));
    }

    #[test]
    fn payload_metadata_key_cannot_shadow_envelope_metadata() {
        let body = encode_body(&EventKind::Business, &json!({"metadata": "mine"})).unwrap();
        let wire = serde_json::to_value(Envelope::from_record(&record_with_body(body)).unwrap())
            .unwrap();
        assert!(wire["metadata"].is_object());
    }

    #[test]
    fn corrupt_body_is_a_serialization_error() {
        let err = Envelope::from_record(&record_with_body("{not json".to_string())).unwrap_err();
        assert!(matches!(err, OutboxError::Serialization(_)));
    }

    #[test]
    fn data_ops_use_single_letter_codes() {
        let codes: Vec<Value> = [DataOp::Create, DataOp::Update, DataOp::Delete, DataOp::Snapshot]
            .iter()
            .map(|op| serde_json::to_value(op).unwrap())
            .collect();
        assert_eq!(codes, vec![json!("C"), json!("U"), json!("D"), json!("S")]);
    }
}
