//! Zabbot Context Aggregation
//!
//! Turns a free-text operator question about monitored infrastructure
//! into a bounded set of data-source fetches, merges the results into a
//! single context bundle and hands it to a response generator.

mod aggregator;
mod bundle;
mod chatbot;
mod domain;
mod error;
mod host;
mod intent;
mod registry;
mod render;
mod snapshot;

pub use aggregator::{ContextAggregator, GatherResult, ResolvedHost};
pub use bundle::{ContextBundle, OperationLog, Payload, Record};
pub use chatbot::{CacheClearReport, ChatReply, Chatbot, Generator, HealthStatus, OperationLatency};
pub use domain::{categorize_hosts, domain_context, is_dcs_host, DOMAIN_CONTEXT_KEY, KNOWN_HOSTS};
pub use error::{ContextError, GenerateError, Result, SourceError};
pub use host::{HostExtractor, HostHint, HostRule};
pub use intent::{Intent, IntentClassifier, IntentSet, PatternRule, PATTERN_RULES, RULESET_VERSION};
pub use registry::{
    CachePolicy, DataSource, FetchArgs, HostScope, Operation, PlanStep, TtlClass, PLAN,
};
pub use render::BundleRenderer;
pub use snapshot::SnapshotSource;
