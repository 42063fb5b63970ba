//! Best-effort host name extraction.
//!
//! Rules are tried in order against the lower-cased text and the first
//! rule producing a non-empty capture wins. The result is only a hint:
//! the aggregator resolves it against the host catalogue before using it
//! to scope fetches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zabbot_core::HostFallback;

/// Which extraction rule produced a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostRule {
    /// `host: name`, `servidor name`, ...
    Labeled,
    /// Token shaped like a domain name (`dcs.ar`)
    Domain,
    /// Last-resort bare token
    BareToken,
}

/// A host name candidate extracted from text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostHint {
    pub name: String,
    pub rule: HostRule,
}

const LABELED_PATTERN: &str = r"\b(?:host|server|servidor|machine|m[aá]quina|device|equipo|dispositivo)[:\s]+([a-z0-9][a-z0-9\-\.]*)";
const DOMAIN_PATTERN: &str = r"([a-z0-9\-\.]+\.[a-z]{2,})";
const DASHED_PATTERN: &str = r"\b([a-z0-9]+(?:-[a-z0-9]+)+)\b";
const ANY_TOKEN_PATTERN: &str = r"([a-z0-9\-]+)";

/// Ordered cascade of host extraction rules.
pub struct HostExtractor {
    rules: Vec<(HostRule, Regex)>,
}

impl HostExtractor {
    /// Create an extractor with the default dashed-token fallback.
    pub fn new() -> Self {
        Self::with_fallback(HostFallback::default())
    }

    /// Create an extractor with the given bare-token behaviour.
    pub fn with_fallback(fallback: HostFallback) -> Self {
        let mut patterns = vec![
            (HostRule::Labeled, LABELED_PATTERN),
            (HostRule::Domain, DOMAIN_PATTERN),
        ];
        match fallback {
            HostFallback::Dashed => patterns.push((HostRule::BareToken, DASHED_PATTERN)),
            HostFallback::AnyToken => patterns.push((HostRule::BareToken, ANY_TOKEN_PATTERN)),
            HostFallback::Disabled => {}
        }

        let rules = patterns
            .into_iter()
            .filter_map(|(rule, p)| match Regex::new(p) {
                Ok(regex) => Some((rule, regex)),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Skipping invalid host pattern");
                    None
                }
            })
            .collect();

        Self { rules }
    }

    /// Extract the first host candidate, if any.
    pub fn extract(&self, text: &str) -> Option<HostHint> {
        let lower = text.to_lowercase();

        for (rule, regex) in &self.rules {
            let candidate = regex
                .captures_iter(&lower)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim_end_matches(['.', '-']))
                .find(|name| !name.is_empty());

            if let Some(name) = candidate {
                debug!(host = %name, rule = ?rule, "Host hint extracted");
                return Some(HostHint {
                    name: name.to_string(),
                    rule: *rule,
                });
            }
        }

        None
    }
}

impl Default for HostExtractor {
    fn default() -> Self {
        Self::new()
    }
}
