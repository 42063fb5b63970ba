//! Snapshot-backed data source.
//!
//! Serves fetch operations from a JSON document captured from a
//! monitoring server. Each top-level key is a bundle key holding either an
//! array of records or a summary object. `dcs_hosts` and
//! `hosts_by_category` are derived from `hosts` when absent.

use crate::bundle::{Payload, Record};
use crate::domain::{categorize_hosts, is_dcs_host};
use crate::error::{ContextError, Result, SourceError};
use crate::registry::{DataSource, FetchArgs, HostScope, Operation};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Shortest hint accepted for a partial host name match.
const MIN_PARTIAL_HOST_NAME: usize = 3;

/// Data source over an in-memory snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    sections: Record,
}

impl SnapshotSource {
    /// Build a source from an already-parsed JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(sections) => Ok(Self { sections }),
            other => Err(ContextError::SnapshotFormat(format!(
                "expected a JSON object at top level, found {}",
                type_name(&other)
            ))),
        }
    }

    /// Load a snapshot file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ContextError::SnapshotRead {
                    path: path.to_path_buf(),
                    source,
                })?;
        let value: Value = serde_json::from_str(&content)?;
        let source = Self::from_value(value)?;
        debug!(path = ?path, sections = source.sections.len(), "Snapshot loaded");
        Ok(source)
    }

    /// Section names present in the snapshot.
    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    fn records(&self, key: &str, operation: Operation) -> std::result::Result<Vec<Record>, SourceError> {
        match self.sections.get(key) {
            None => Err(SourceError::Unavailable(format!(
                "snapshot has no '{}' section",
                key
            ))),
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| match row {
                    Value::Object(record) => Ok(record.clone()),
                    other => Err(SourceError::Decode(format!(
                        "{}: expected record, found {}",
                        operation.name(),
                        type_name(other)
                    ))),
                })
                .collect(),
            Some(other) => Err(SourceError::Decode(format!(
                "{}: expected array, found {}",
                operation.name(),
                type_name(other)
            ))),
        }
    }

    fn summary(&self, key: &str, operation: Operation) -> std::result::Result<Record, SourceError> {
        match self.sections.get(key) {
            None => Err(SourceError::Unavailable(format!(
                "snapshot has no '{}' section",
                key
            ))),
            Some(Value::Object(summary)) => Ok(summary.clone()),
            Some(other) => Err(SourceError::Decode(format!(
                "{}: expected object, found {}",
                operation.name(),
                type_name(other)
            ))),
        }
    }

    fn hosts(&self) -> std::result::Result<Vec<Record>, SourceError> {
        self.records(Operation::AllHosts.bundle_key(), Operation::AllHosts)
    }
}

#[async_trait]
impl DataSource for SnapshotSource {
    async fn fetch(&self, operation: Operation, args: &FetchArgs) -> std::result::Result<Payload, SourceError> {
        let key = operation.bundle_key();
        if operation.host_scope() == HostScope::Required && args.host_id.is_none() {
            return Err(SourceError::HostRequired(operation.name()));
        }

        if operation.returns_summary() {
            let summary = match (operation, self.sections.contains_key(key)) {
                (Operation::HostsByCategory, false) => categorize_hosts(&self.hosts()?),
                _ => self.summary(key, operation)?,
            };
            return Ok(Payload::Summary(summary));
        }

        let mut records = match (operation, self.sections.contains_key(key)) {
            (Operation::DcsSpecificHosts, false) => self
                .hosts()?
                .into_iter()
                .filter(|h| h.get("name").and_then(Value::as_str).is_some_and(is_dcs_host))
                .collect(),
            _ => self.records(key, operation)?,
        };

        if let Some(host_id) = &args.host_id {
            records.retain(|r| r.get("hostid").is_some_and(|v| id_matches(v, host_id)));
        }
        if let Some(limit) = args.limit {
            records.truncate(limit);
        }

        Ok(Payload::Records(records))
    }

    async fn find_host(&self, name: &str) -> std::result::Result<Option<Record>, SourceError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        let hosts = self.hosts()?;

        if let Some(host) = hosts
            .iter()
            .find(|host| host_names(host).any(|v| v == needle))
        {
            return Ok(Some(host.clone()));
        }

        // Partial names only count when they are specific enough to pick one host
        if needle.chars().count() < MIN_PARTIAL_HOST_NAME {
            return Ok(None);
        }
        let mut partial = hosts
            .into_iter()
            .filter(|host| host_names(host).any(|v| v.contains(&needle)));
        match (partial.next(), partial.next()) {
            (Some(host), None) => Ok(Some(host)),
            (Some(_), Some(_)) => {
                debug!(host = %name, "Host name matches several hosts");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> std::result::Result<(), SourceError> {
        if self.sections.contains_key(Operation::AllHosts.bundle_key()) {
            Ok(())
        } else {
            Err(SourceError::Unavailable("snapshot has no host inventory".to_string()))
        }
    }
}

/// Lower-cased `host` and `name` fields of a host record.
fn host_names(host: &Record) -> impl Iterator<Item = String> + '_ {
    ["host", "name"]
        .into_iter()
        .filter_map(|field| host.get(field).and_then(Value::as_str))
        .map(str::to_lowercase)
}

fn id_matches(value: &Value, host_id: &str) -> bool {
    match value {
        Value::String(s) => s == host_id,
        Value::Number(n) => n.to_string() == host_id,
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
