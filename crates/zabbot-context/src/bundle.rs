//! Context bundle and operation log.
//!
//! The bundle maps a source name to its payload, preserving the order in
//! which sources were consulted.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One row returned by a data source.
pub type Record = serde_json::Map<String, Value>;

/// Result of one fetch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// A list of records (hosts, problems, events, ...)
    Records(Vec<Record>),
    /// A single summary mapping (counters, categories, one host)
    Summary(Record),
}

impl Payload {
    /// Empty list payload.
    pub fn empty_records() -> Self {
        Payload::Records(Vec::new())
    }

    /// Empty summary payload.
    pub fn empty_summary() -> Self {
        Payload::Summary(Record::new())
    }

    /// Whether the payload carries no data.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Records(records) => records.is_empty(),
            Payload::Summary(summary) => summary.is_empty(),
        }
    }

    /// Number of records, or number of summary fields.
    pub fn len(&self) -> usize {
        match self {
            Payload::Records(records) => records.len(),
            Payload::Summary(summary) => summary.len(),
        }
    }

    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Payload::Records(records) => Some(records),
            Payload::Summary(_) => None,
        }
    }

    pub fn as_summary(&self) -> Option<&Record> {
        match self {
            Payload::Summary(summary) => Some(summary),
            Payload::Records(_) => None,
        }
    }

    /// Convert to a plain JSON value (array or object).
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Records(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
            Payload::Summary(summary) => Value::Object(summary.clone()),
        }
    }
}

/// Ordered mapping of source name to payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    entries: Vec<(String, Payload)>,
}

impl ContextBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. A repeated key replaces the payload in its original position.
    pub fn insert(&mut self, key: impl Into<String>, payload: Payload) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = payload,
            None => self.entries.push((key, payload)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, payload)| payload)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Source names in consultation order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Payload)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ContextBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, payload) in &self.entries {
            map.serialize_entry(key, &payload.to_value())?;
        }
        map.end()
    }
}

/// Descriptions of the fetch operations run for one message, in invocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog(Vec<String>);

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0.iter().position(|entry| entry.starts_with(prefix))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut bundle = ContextBundle::new();
        bundle.insert("problems", Payload::empty_records());
        bundle.insert("critical_summary", Payload::empty_summary());
        bundle.insert("dcs_context", Payload::empty_summary());

        assert_eq!(bundle.keys(), vec!["problems", "critical_summary", "dcs_context"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut bundle = ContextBundle::new();
        bundle.insert("hosts", Payload::empty_records());
        bundle.insert("alerts", Payload::empty_records());
        bundle.insert(
            "hosts",
            Payload::Records(vec![record(json!({"hostid": "1"}))]),
        );

        assert_eq!(bundle.keys(), vec!["hosts", "alerts"]);
        assert_eq!(bundle.get("hosts").map(Payload::len), Some(1));
    }

    #[test]
    fn test_serialize_as_ordered_map() {
        let mut bundle = ContextBundle::new();
        bundle.insert("zeta", Payload::Records(vec![record(json!({"a": 1}))]));
        bundle.insert("alpha", Payload::Summary(record(json!({"total": 3}))));

        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(json, r#"{"zeta":[{"a":1}],"alpha":{"total":3}}"#);
    }

    #[test]
    fn test_payload_accessors() {
        let records = Payload::Records(vec![record(json!({"name": "ESXi"}))]);
        assert!(records.as_records().is_some());
        assert!(records.as_summary().is_none());
        assert!(!records.is_empty());

        assert!(Payload::empty_summary().is_empty());
    }

    #[test]
    fn test_operation_log_position() {
        let mut log = OperationLog::new();
        log.push("get_active_problems()");
        log.push("get_critical_alerts_summary()");

        assert_eq!(log.position("get_active_problems"), Some(0));
        assert_eq!(log.position("get_critical_alerts_summary"), Some(1));
        assert_eq!(log.position("get_triggers"), None);
    }
}
