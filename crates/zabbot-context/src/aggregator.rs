//! Context aggregation.
//!
//! Resolves the host mentioned in a message, runs the plan steps selected
//! by the detected intents (through the TTL cache where the operation
//! allows it), and merges every result plus the static domain context
//! into one bundle. Individual fetch failures never abort aggregation.

use crate::bundle::{ContextBundle, OperationLog, Payload, Record};
use crate::domain::{domain_context, DOMAIN_CONTEXT_KEY};
use crate::host::{HostExtractor, HostHint};
use crate::intent::IntentSet;
use crate::registry::{CachePolicy, DataSource, FetchArgs, HostScope, Operation, TtlClass, PLAN};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zabbot_core::{ChatConfig, LimitsConfig, Metrics, TtlCache};

/// Bundle key of the resolved host record.
const SPECIFIC_HOST_KEY: &str = "specific_host";

/// A host hint confirmed by the data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedHost {
    /// Name as extracted from the message
    pub hint: HostHint,
    /// Identifier used to scope fetches
    pub host_id: String,
}

/// Output of one aggregation call.
#[derive(Debug, Clone)]
pub struct GatherResult {
    pub bundle: ContextBundle,
    pub operations: OperationLog,
    pub host: Option<ResolvedHost>,
}

/// Orchestrates fetches for a classified message.
pub struct ContextAggregator {
    source: Arc<dyn DataSource>,
    cache: TtlCache<Payload>,
    extractor: HostExtractor,
    inventory_ttl: Duration,
    volatile_ttl: Duration,
    limits: LimitsConfig,
    metrics: Arc<Metrics>,
}

impl ContextAggregator {
    /// Create an aggregator over a data source.
    pub fn new(source: Arc<dyn DataSource>, config: &ChatConfig) -> Self {
        Self::with_metrics(source, config, Arc::new(Metrics::new()))
    }

    /// Create an aggregator reporting into shared metrics.
    pub fn with_metrics(
        source: Arc<dyn DataSource>,
        config: &ChatConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            source,
            cache: TtlCache::new(),
            extractor: HostExtractor::with_fallback(config.host_fallback),
            inventory_ttl: config.cache.inventory_ttl(),
            volatile_ttl: config.cache.volatile_ttl(),
            limits: config.limits.clone(),
            metrics,
        }
    }

    /// Gather context for a message with already-detected intents.
    pub async fn gather(&self, intents: &IntentSet, text: &str) -> GatherResult {
        let mut bundle = ContextBundle::new();
        let mut operations = OperationLog::new();

        let host = match self.extractor.extract(text) {
            Some(hint) => self.resolve_host(hint, &mut bundle, &mut operations).await,
            None => None,
        };
        let host_id = host.as_ref().map(|h| h.host_id.as_str());

        for step in PLAN.iter().filter(|step| step.fires_for(intents)) {
            for operation in step.operations {
                let Some(args) = self.args_for(*operation, host_id) else {
                    debug!(operation = %operation, "Skipping host-scoped operation without host");
                    continue;
                };

                operations.push(operation.describe(&args));
                let payload = match operation.cache_policy() {
                    Some(policy) => self.fetch_cached(*operation, policy, &args).await,
                    None => self.fetch(*operation, &args, None).await,
                };
                bundle.insert(operation.bundle_key(), payload);
            }
        }

        bundle.insert(DOMAIN_CONTEXT_KEY, domain_context());

        info!(
            sources = ?bundle.keys(),
            operations = operations.len(),
            "Context gathered"
        );

        GatherResult {
            bundle,
            operations,
            host,
        }
    }

    /// Drop every cached payload and return the number dropped.
    pub fn clear_cache(&self) -> usize {
        let cleared = self.cache.clear();
        info!(cleared, "Cache cleared");
        cleared
    }

    /// Number of cached payloads.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Confirm a host hint against the data source.
    async fn resolve_host(
        &self,
        hint: HostHint,
        bundle: &mut ContextBundle,
        operations: &mut OperationLog,
    ) -> Option<ResolvedHost> {
        let record = match self.source.find_host(&hint.name).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(host = %hint.name, "Host hint not found in catalogue");
                return None;
            }
            Err(e) => {
                self.metrics.record_fetch_failure();
                warn!(host = %hint.name, error = %e, "Host lookup failed");
                return None;
            }
        };

        let Some(host_id) = host_id_of(&record) else {
            warn!(host = %hint.name, "Host record has no hostid");
            return None;
        };

        operations.push(format!("get_host_by_name('{}')", hint.name));
        bundle.insert(SPECIFIC_HOST_KEY, Payload::Summary(record));

        Some(ResolvedHost { hint, host_id })
    }

    /// Arguments for an operation, or `None` when it cannot run without a host.
    fn args_for(&self, operation: Operation, host_id: Option<&str>) -> Option<FetchArgs> {
        let mut args = FetchArgs::new();

        match (operation.host_scope(), host_id) {
            (HostScope::Required, None) => return None,
            (HostScope::Required | HostScope::Optional, Some(id)) => args = args.with_host(id),
            _ => {}
        }

        match operation {
            Operation::TopProblematicHosts => args = args.with_limit(self.limits.top_problematic_hosts),
            Operation::LatestData => args = args.with_limit(self.limits.latest_data),
            Operation::RecentEvents => args = args.with_window_hours(self.limits.recent_events_hours),
            _ => {}
        }

        Some(args)
    }

    /// Serve from cache when fresh, otherwise fetch and store.
    ///
    /// The fetch runs outside the cache lock; only successful results are stored.
    async fn fetch_cached(
        &self,
        operation: Operation,
        policy: CachePolicy,
        args: &FetchArgs,
    ) -> Payload {
        let ttl = match policy.ttl {
            TtlClass::Inventory => self.inventory_ttl,
            TtlClass::Volatile => self.volatile_ttl,
        };

        if let Some(payload) = self.cache.get(policy.key, ttl) {
            self.metrics.record_cache_hit();
            debug!(key = policy.key, "Served from cache");
            return payload;
        }

        self.metrics.record_cache_miss();
        self.fetch(operation, args, Some(policy.key)).await
    }

    /// Run one operation, replacing failures with an empty result.
    async fn fetch(&self, operation: Operation, args: &FetchArgs, cache_key: Option<&str>) -> Payload {
        let started = Instant::now();
        let result = self.source.fetch(operation, args).await;
        self.metrics.record_fetch(operation.name(), started.elapsed());

        match result {
            Ok(payload) => {
                if let Some(key) = cache_key {
                    self.cache.set(key, payload.clone());
                    debug!(key = %key, "Fetched and cached");
                }
                payload
            }
            Err(e) => {
                self.metrics.record_fetch_failure();
                warn!(
                    operation = %operation,
                    key = operation.bundle_key(),
                    error = %e,
                    "Fetch failed, using empty result"
                );
                operation.empty_payload()
            }
        }
    }
}

/// Extract `hostid` as a string, accepting numeric or string values.
fn host_id_of(record: &Record) -> Option<String> {
    match record.get("hostid")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::intent::{Intent, IntentClassifier};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every call made to the fake source.
    #[derive(Default)]
    struct CallLog(Mutex<Vec<String>>);

    impl CallLog {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn count(&self, prefix: &str) -> usize {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.starts_with(prefix))
                .count()
        }
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    /// Source with one known host that fails a configurable operation.
    #[derive(Default)]
    struct FakeSource {
        calls: CallLog,
        failing: Option<Operation>,
    }

    #[async_trait]
    impl DataSource for FakeSource {
        async fn fetch(&self, operation: Operation, args: &FetchArgs) -> Result<Payload, SourceError> {
            self.calls.push(operation.describe(args));
            if self.failing == Some(operation) {
                return Err(SourceError::Unavailable(operation.name().to_string()));
            }
            if operation.returns_summary() {
                Ok(Payload::Summary(record(json!({"total": 1}))))
            } else {
                Ok(Payload::Records(vec![record(json!({"op": operation.name()}))]))
            }
        }

        async fn find_host(&self, name: &str) -> Result<Option<Record>, SourceError> {
            self.calls.push(format!("find_host({})", name));
            if name == "dc-hyperv" {
                Ok(Some(record(json!({"hostid": 10084, "name": "DC-HYPERV"}))))
            } else {
                Ok(None)
            }
        }
    }

    fn aggregator(source: Arc<FakeSource>) -> ContextAggregator {
        ContextAggregator::new(source, &ChatConfig::default())
    }

    #[tokio::test]
    async fn test_problems_question() {
        let source = Arc::new(FakeSource::default());
        let agg = aggregator(source.clone());
        let text = "¿cuántos problemas críticos hay?";
        let intents = IntentClassifier::new().classify(text);

        let result = agg.gather(&intents, text).await;

        assert!(result.host.is_none());
        assert_eq!(
            result.bundle.keys(),
            vec!["problems", "critical_summary", "problematic_hosts", "dcs_context"]
        );
        let problems = result.operations.position("get_active_problems").unwrap();
        let summary = result.operations.position("get_critical_alerts_summary").unwrap();
        assert!(problems < summary);
    }

    #[tokio::test]
    async fn test_general_defaults() {
        let agg = aggregator(Arc::new(FakeSource::default()));
        let result = agg.gather(&IntentSet::general(), "hola").await;

        assert_eq!(
            result.bundle.keys(),
            vec![
                "hosts",
                "problems",
                "critical_summary",
                "problematic_hosts",
                "hosts_by_category",
                "system_stats",
                "dcs_context",
            ]
        );
        assert_eq!(result.operations.as_slice()[3], "get_top_problematic_hosts(10)");
    }

    #[tokio::test]
    async fn test_host_scoped_operations_use_host() {
        let source = Arc::new(FakeSource::default());
        let agg = aggregator(source.clone());
        let intents = IntentSet::from_intents([Intent::Triggers, Intent::Items, Intent::History]);

        let result = agg.gather(&intents, "triggers e historial de DC-HYPERV").await;

        let host = result.host.unwrap();
        assert_eq!(host.host_id, "10084");
        assert_eq!(
            result.operations.as_slice(),
            &[
                "get_host_by_name('dc-hyperv')",
                "get_triggers(10084)",
                "get_items(10084)",
                "get_latest_data(10084, 10)",
                "get_recent_events(24h)",
            ]
        );
        assert!(result.bundle.contains_key("specific_host"));
    }

    #[tokio::test]
    async fn test_without_host_falls_back() {
        let source = Arc::new(FakeSource::default());
        let agg = aggregator(source.clone());
        let intents = IntentSet::from_intents([Intent::Triggers, Intent::Items, Intent::History]);

        let result = agg.gather(&intents, "triggers e historial").await;

        assert!(result.host.is_none());
        assert_eq!(
            result.operations.as_slice(),
            &["get_triggers()", "get_recent_events(24h)"]
        );
        assert!(!result.bundle.contains_key("items"));
        assert!(!result.bundle.contains_key("latest_data"));
    }

    #[tokio::test]
    async fn test_unknown_host_hint_is_ignored() {
        let source = Arc::new(FakeSource::default());
        let agg = aggregator(source.clone());
        let intents = IntentSet::from_intents([Intent::Triggers]);

        let result = agg.gather(&intents, "triggers de vm-produccion").await;

        assert!(result.host.is_none());
        assert_eq!(source.calls.count("find_host(vm-produccion)"), 1);
        assert_eq!(result.operations.as_slice(), &["get_triggers()"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fail_open() {
        let source = Arc::new(FakeSource {
            failing: Some(Operation::ActiveProblems),
            ..Default::default()
        });
        let agg = aggregator(source.clone());
        let intents = IntentSet::from_intents([Intent::Problems]);

        let result = agg.gather(&intents, "problemas").await;

        assert_eq!(result.bundle.get("problems"), Some(&Payload::empty_records()));
        assert!(result.bundle.contains_key("critical_summary"));
        assert!(result.bundle.contains_key("dcs_context"));
        assert_eq!(agg.metrics().fetch_failures.load(std::sync::atomic::Ordering::Relaxed), 1);
        // Failures are not cached
        assert_eq!(agg.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_cache_reuse_across_calls() {
        let source = Arc::new(FakeSource::default());
        let agg = aggregator(source.clone());
        let intents = IntentSet::from_intents([Intent::Problems]);

        agg.gather(&intents, "problemas").await;
        let second = agg.gather(&intents, "problemas").await;

        // Cached operation fetched once, direct operations every call
        assert_eq!(source.calls.count("get_active_problems"), 1);
        assert_eq!(source.calls.count("get_critical_alerts_summary"), 2);
        // Cached reads are still logged
        assert!(second.operations.position("get_active_problems").is_some());
        assert_eq!(agg.cache_size(), 1);

        assert_eq!(agg.clear_cache(), 1);
        agg.gather(&intents, "problemas").await;
        assert_eq!(source.calls.count("get_active_problems"), 2);
    }

    #[tokio::test]
    async fn test_ttl_classes() {
        let source = Arc::new(FakeSource::default());
        let mut config = ChatConfig::default();
        config.cache.inventory_ttl_secs = 300;
        config.cache.volatile_ttl_secs = 1;
        let agg = ContextAggregator::new(source.clone(), &config);
        let intents = IntentSet::from_intents([Intent::Hosts, Intent::Problems]);

        agg.gather(&intents, "hosts con problemas").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let result = agg.gather(&intents, "hosts con problemas").await;

        // Volatile data expired, inventory still fresh
        assert_eq!(source.calls.count("get_active_problems"), 2);
        assert_eq!(source.calls.count("get_all_hosts"), 1);
        assert!(result.bundle.contains_key("hosts"));
        assert_eq!(agg.cache_size(), 2);
    }

    #[test]
    fn test_host_id_of() {
        assert_eq!(host_id_of(&record(json!({"hostid": 7}))), Some("7".to_string()));
        assert_eq!(host_id_of(&record(json!({"hostid": "10084"}))), Some("10084".to_string()));
        assert_eq!(host_id_of(&record(json!({"hostid": ""}))), None);
        assert_eq!(host_id_of(&record(json!({"name": "x"}))), None);
    }
}
