//! Lexical intent classification.
//!
//! Each pattern rule maps one intent to a list of regular expressions.
//! A message gets every intent whose rule has at least one pattern
//! matching anywhere in the lower-cased text. Rule order only decides the
//! order intents are reported in.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Version of the built-in rule table. Bump when patterns change.
pub const RULESET_VERSION: u32 = 1;

/// A topic category detected in operator text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Hosts,
    Problems,
    Triggers,
    Items,
    Alerts,
    Status,
    History,
    Network,
    Infrastructure,
    Security,
    Physical,
    Business,
    Maintenance,
    DcsSpecific,
    /// Assigned when nothing else matches
    General,
}

impl Intent {
    /// Stable tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Hosts => "hosts",
            Intent::Problems => "problems",
            Intent::Triggers => "triggers",
            Intent::Items => "items",
            Intent::Alerts => "alerts",
            Intent::Status => "status",
            Intent::History => "history",
            Intent::Network => "network",
            Intent::Infrastructure => "infrastructure",
            Intent::Security => "security",
            Intent::Physical => "physical",
            Intent::Business => "business",
            Intent::Maintenance => "maintenance",
            Intent::DcsSpecific => "dcs_specific",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intent together with the patterns that select it.
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub intent: Intent,
    pub patterns: &'static [&'static str],
}

/// Built-in rule table, matched against lower-cased text.
pub const PATTERN_RULES: &[PatternRule] = &[
    PatternRule {
        intent: Intent::Hosts,
        patterns: &[
            r"hosts?",
            r"servidores?",
            r"m[aá]quinas?",
            r"equipos?",
            r"sistemas?",
            r"dispositivos?",
            r"computers?",
        ],
    },
    PatternRule {
        intent: Intent::Problems,
        patterns: &[
            r"problemas?",
            r"alertas?",
            r"errores?",
            r"fallos?",
            r"incidentes?",
            r"issues?",
            r"cr[ií]ticos?",
            r"urgentes?",
        ],
    },
    PatternRule {
        intent: Intent::Triggers,
        patterns: &[r"triggers?", r"disparadores?", r"activadores?"],
    },
    PatternRule {
        intent: Intent::Items,
        patterns: &[
            r"items?",
            r"m[eé]tricas?",
            r"elementos?",
            r"datos?",
            r"monitoreo",
            r"mediciones?",
        ],
    },
    PatternRule {
        intent: Intent::Alerts,
        patterns: &[r"notificaciones?", r"avisos?", r"alertas?"],
    },
    PatternRule {
        intent: Intent::Status,
        patterns: &[
            r"estado",
            r"estatus",
            r"situaci[oó]n",
            r"resumen",
            r"overview",
            r"dashboard",
            r"disponibilidad",
        ],
    },
    PatternRule {
        intent: Intent::History,
        patterns: &[
            r"hist[oó]rico",
            r"historial",
            r"pasado",
            r"anterior",
            r"tendencia",
            r"evoluci[oó]n",
        ],
    },
    PatternRule {
        intent: Intent::Network,
        patterns: &[
            r"\bred\b",
            r"network",
            r"conectividad",
            r"switch",
            r"router",
            r"\bap\b",
            r"access point",
            r"mikrotik",
            r"cisco",
        ],
    },
    PatternRule {
        intent: Intent::Infrastructure,
        patterns: &[
            r"infraestructura",
            r"servidores",
            r"dc-",
            r"vm-",
            r"esxi",
            r"vmware",
            r"hyperv",
            r"virtualizaci[oó]n",
        ],
    },
    PatternRule {
        intent: Intent::Security,
        patterns: &[r"seguridad", r"firewall", r"forti", r"proxy", r"acceso"],
    },
    PatternRule {
        intent: Intent::Physical,
        patterns: &[
            r"f[ií]sico",
            r"ascensor",
            r"pasillo",
            r"\bsala\b",
            r"huella",
            r"biom[eé]trico",
            r"acceso f[ií]sico",
        ],
    },
    PatternRule {
        intent: Intent::Business,
        patterns: &[
            r"negocio",
            r"odoo",
            r"asterisk",
            r"comunicaciones",
            r"telefon[ií]a",
            r"\bweb\b",
            r"aplicaciones",
        ],
    },
    PatternRule {
        intent: Intent::Maintenance,
        patterns: &[
            r"mantenimiento",
            r"programado",
            r"maintenance",
            r"ventana de mantenimiento",
        ],
    },
    PatternRule {
        intent: Intent::DcsSpecific,
        patterns: &[
            r"\bdcs\b",
            r"solutions",
            r"din[aá]mica",
            r"comercial",
            r"administraci[oó]n",
            r"operaciones",
            r"grafana",
        ],
    },
];

/// Ordered, duplicate-free, never-empty set of intents detected in one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntentSet(Vec<Intent>);

impl<'de> Deserialize<'de> for IntentSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<Intent>::deserialize(deserializer).map(Self::from_intents)
    }
}

impl IntentSet {
    /// The fallback set containing only `general`.
    pub fn general() -> Self {
        Self(vec![Intent::General])
    }

    /// Build a set from intents, dropping duplicates and keeping first-seen order.
    /// An empty input collapses to `{general}`.
    pub fn from_intents(intents: impl IntoIterator<Item = Intent>) -> Self {
        let mut set = Vec::new();
        for intent in intents {
            if !set.contains(&intent) {
                set.push(intent);
            }
        }
        if set.is_empty() {
            Self::general()
        } else {
            Self(set)
        }
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.0.contains(&intent)
    }

    /// Whether any of the given intents is present.
    pub fn contains_any(&self, intents: &[Intent]) -> bool {
        intents.iter().any(|i| self.contains(*i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Intent> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Intent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: every constructor yields at least `general`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tag names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Intent::as_str).collect()
    }
}

/// A rule with its patterns compiled.
struct CompiledRule {
    intent: Intent,
    patterns: Vec<Regex>,
}

/// Intent classifier over a fixed rule table.
pub struct IntentClassifier {
    rules: Vec<CompiledRule>,
}

impl IntentClassifier {
    /// Create a classifier over the built-in rule table.
    ///
    /// A pattern that fails to compile is skipped with a warning.
    pub fn new() -> Self {
        let rules = PATTERN_RULES
            .iter()
            .map(|rule| CompiledRule {
                intent: rule.intent,
                patterns: rule
                    .patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(regex) => Some(regex),
                        Err(e) => {
                            warn!(pattern = %p, error = %e, "Skipping invalid intent pattern");
                            None
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { rules }
    }

    /// Create a classifier over a custom rule table.
    pub fn from_rules(rules: &[PatternRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<CompiledRule> {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(CompiledRule {
                    intent: rule.intent,
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Classify a message. Never returns an empty set.
    pub fn classify(&self, text: &str) -> IntentSet {
        let lower = text.to_lowercase();

        let detected = self
            .rules
            .iter()
            .filter(|rule| rule.patterns.iter().any(|p| p.is_match(&lower)))
            .map(|rule| rule.intent);

        let intents = IntentSet::from_intents(detected);
        debug!(intents = ?intents.names(), "Intents detected");
        intents
    }

    /// Number of rules in the table.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
