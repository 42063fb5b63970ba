//! Zabbot Core Components
//!
//! This crate provides the shared building blocks for the Zabbot
//! assistant: configuration, the TTL cache and runtime metrics.

mod cache;
mod config;
mod error;
mod metrics;

pub use cache::TtlCache;
pub use config::{CacheConfig, ChatConfig, HostFallback, LimitsConfig, RenderConfig};
pub use error::{CoreError, Result};
pub use metrics::{FetchLatency, Metrics};
