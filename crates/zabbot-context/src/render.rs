//! Context rendering to prompt-ready text.
//!
//! Converts a context bundle into plain text sections suitable for
//! injection into a generation prompt.

use crate::bundle::{ContextBundle, Payload, Record};
use serde_json::Value;
use zabbot_core::RenderConfig;

const TRUNCATED_NOTICE: &str = "\n(content truncated due to size limit)\n";

/// Renderer for context bundles.
pub struct BundleRenderer {
    /// Maximum records shown per list source
    max_records: usize,
    /// Maximum content size in bytes
    max_content_size: usize,
}

impl BundleRenderer {
    /// Create a new renderer with default settings.
    pub fn new() -> Self {
        Self::from_config(&RenderConfig::default())
    }

    /// Create a renderer from configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            max_records: config.max_records_per_source,
            max_content_size: config.max_content_size,
        }
    }

    /// Render a bundle to a string.
    pub fn render(&self, bundle: &ContextBundle) -> String {
        if bundle.is_empty() {
            return "No context data available.".to_string();
        }

        let mut output = String::new();
        let mut truncated = false;

        for (key, payload) in bundle.iter() {
            match payload {
                Payload::Records(records) if records.is_empty() => continue,
                Payload::Records(records) => {
                    output.push_str(&format!("\n{}:\n", key.to_uppercase()));
                    for record in records.iter().take(self.max_records) {
                        output.push_str(&format!("  - {}\n", relevant_fields(key, record)));
                    }
                    if records.len() > self.max_records {
                        output.push_str(&format!(
                            "  ... and {} more\n",
                            records.len() - self.max_records
                        ));
                    }
                }
                Payload::Summary(summary) => {
                    output.push_str(&format!("\n{}:\n", key.to_uppercase()));
                    for (field, value) in summary {
                        output.push_str(&format!("  {}: {}\n", field, display_value(value)));
                    }
                }
            }

            if output.len() > self.max_content_size {
                truncated = true;
                break;
            }
        }

        if truncated {
            // The notice counts against the size cap
            let mut cut = self
                .max_content_size
                .saturating_sub(TRUNCATED_NOTICE.len())
                .min(output.len());
            while !output.is_char_boundary(cut) {
                cut -= 1;
            }
            output.truncate(cut);
            output.push_str(TRUNCATED_NOTICE);
        }

        output
    }
}

impl Default for BundleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// The fields worth showing for a record of the given source.
fn relevant_fields(source: &str, record: &Record) -> String {
    let get = |field: &str| record.get(field).map(display_value);
    let or_na = |v: Option<String>| v.unwrap_or_else(|| "N/A".to_string());

    match source {
        "hosts" => format!(
            "Host: {}, Status: {}, Available: {}",
            or_na(get("name").or_else(|| get("host"))),
            or_na(get("status")),
            or_na(get("available"))
        ),
        "problems" => format!(
            "Host: {}, Trigger: {}, Severity: {}",
            or_na(get("hostname")),
            or_na(get("trigger_description")),
            or_na(get("severity"))
        ),
        "triggers" => format!(
            "Host: {}, Description: {}, Priority: {}",
            or_na(get("hostname")),
            or_na(get("description")),
            or_na(get("priority"))
        ),
        "items" => format!(
            "Name: {}, Key: {}, Status: {}",
            or_na(get("name")),
            or_na(get("key_")),
            or_na(get("status"))
        ),
        "alerts" => format!(
            "Host: {}, Subject: {}, Status: {}",
            or_na(get("hostname")),
            or_na(get("subject")),
            or_na(get("status"))
        ),
        _ => record
            .iter()
            .take(3)
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Strings without quotes, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Payload {
        Payload::Records(
            values
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        )
    }

    #[test]
    fn test_empty_bundle() {
        let renderer = BundleRenderer::new();
        assert_eq!(renderer.render(&ContextBundle::new()), "No context data available.");
    }

    #[test]
    fn test_relevant_fields_per_source() {
        let mut bundle = ContextBundle::new();
        bundle.insert(
            "problems",
            records(vec![json!({
                "hostname": "DC-Asterisk",
                "trigger_description": "SIP trunk down",
                "severity": 5,
                "eventid": 1
            })]),
        );
        bundle.insert(
            "recent_events",
            records(vec![json!({"eventid": 9, "clock": 1700000000, "value": 1, "ns": 0})]),
        );

        let text = BundleRenderer::new().render(&bundle);
        assert!(text.contains("PROBLEMS:"));
        assert!(text.contains("Host: DC-Asterisk, Trigger: SIP trunk down, Severity: 5"));
        assert!(text.contains("eventid: 9, clock: 1700000000, value: 1"));
        assert!(!text.contains("ns: 0"));
    }

    #[test]
    fn test_list_is_capped() {
        let hosts = (0..8).map(|i| json!({"name": format!("host-{}", i)})).collect();
        let mut bundle = ContextBundle::new();
        bundle.insert("hosts", records(hosts));

        let text = BundleRenderer::new().render(&bundle);
        assert!(text.contains("host-4"));
        assert!(!text.contains("host-5"));
        assert!(text.contains("... and 3 more"));
    }

    #[test]
    fn test_summary_and_empty_sources() {
        let mut bundle = ContextBundle::new();
        bundle.insert("alerts", Payload::empty_records());
        bundle.insert(
            "system_stats",
            Payload::Summary(json!({"total_hosts": 42}).as_object().cloned().unwrap()),
        );

        let text = BundleRenderer::new().render(&bundle);
        assert!(!text.contains("ALERTS"));
        assert!(text.contains("SYSTEM_STATS:\n  total_hosts: 42"));
    }

    #[test]
    fn test_size_limit() {
        let renderer = BundleRenderer::from_config(&RenderConfig {
            max_records_per_source: 5,
            max_content_size: 100,
        });
        let mut bundle = ContextBundle::new();
        for key in ["a", "b", "c", "d"] {
            bundle.insert(
                key,
                records(vec![json!({"field": "a fairly long value for padding"})]),
            );
        }

        let text = renderer.render(&bundle);
        assert!(text.len() <= 100);
        assert!(text.starts_with("\nA:\n"));
        assert!(text.ends_with(TRUNCATED_NOTICE));
        assert!(!text.contains("D:"));
    }

    #[test]
    fn test_within_limit_has_no_notice() {
        let mut bundle = ContextBundle::new();
        bundle.insert("hosts", records(vec![json!({"name": "DC-HYPERV"})]));

        let text = BundleRenderer::new().render(&bundle);
        assert!(!text.contains("content truncated"));
    }
}
