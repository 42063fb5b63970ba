//! Data source registry.
//!
//! Names the fetch operations an external data collaborator exposes,
//! their cache policy and host scoping, and the ordered plan that maps
//! intents to operations.

use crate::bundle::{Payload, Record};
use crate::error::SourceError;
use crate::intent::Intent;
use async_trait::async_trait;
use std::fmt;

/// Freshness class of a cache-eligible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Near-static inventory data
    Inventory,
    /// Volatile problem data
    Volatile,
}

/// Where and how long an operation result is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: &'static str,
    pub ttl: TtlClass,
}

/// How an operation relates to a resolved host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostScope {
    /// Never host-scoped
    Global,
    /// Scoped when a host is resolved, global otherwise
    Optional,
    /// Only runs when a host is resolved
    Required,
}

/// A named fetch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AllHosts,
    DcsSpecificHosts,
    NetworkDevices,
    ActiveProblems,
    CriticalAlertsSummary,
    TopProblematicHosts,
    HostAvailabilityStatus,
    MaintenanceInfo,
    HostsByCategory,
    Triggers,
    Items,
    LatestData,
    RecentEvents,
    AlertsLast24h,
    SystemStats,
}

impl Operation {
    /// Descriptive operation name used in the operation log.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AllHosts => "get_all_hosts",
            Operation::DcsSpecificHosts => "get_dcs_specific_hosts",
            Operation::NetworkDevices => "get_network_devices",
            Operation::ActiveProblems => "get_active_problems",
            Operation::CriticalAlertsSummary => "get_critical_alerts_summary",
            Operation::TopProblematicHosts => "get_top_problematic_hosts",
            Operation::HostAvailabilityStatus => "get_host_availability_status",
            Operation::MaintenanceInfo => "get_maintenance_info",
            Operation::HostsByCategory => "get_hosts_by_category",
            Operation::Triggers => "get_triggers",
            Operation::Items => "get_items",
            Operation::LatestData => "get_latest_data",
            Operation::RecentEvents => "get_recent_events",
            Operation::AlertsLast24h => "get_alerts_last_24h",
            Operation::SystemStats => "get_system_stats",
        }
    }

    /// Bundle key the result is stored under.
    pub fn bundle_key(&self) -> &'static str {
        match self {
            Operation::AllHosts => "hosts",
            Operation::DcsSpecificHosts => "dcs_hosts",
            Operation::NetworkDevices => "network_devices",
            Operation::ActiveProblems => "problems",
            Operation::CriticalAlertsSummary => "critical_summary",
            Operation::TopProblematicHosts => "problematic_hosts",
            Operation::HostAvailabilityStatus => "host_availability",
            Operation::MaintenanceInfo => "maintenance",
            Operation::HostsByCategory => "hosts_by_category",
            Operation::Triggers => "triggers",
            Operation::Items => "items",
            Operation::LatestData => "latest_data",
            Operation::RecentEvents => "recent_events",
            Operation::AlertsLast24h => "alerts",
            Operation::SystemStats => "system_stats",
        }
    }

    /// Cache policy, if results are shared across requests.
    pub fn cache_policy(&self) -> Option<CachePolicy> {
        match self {
            Operation::AllHosts => Some(CachePolicy {
                key: "all_hosts",
                ttl: TtlClass::Inventory,
            }),
            Operation::DcsSpecificHosts => Some(CachePolicy {
                key: "dcs_hosts",
                ttl: TtlClass::Inventory,
            }),
            Operation::ActiveProblems => Some(CachePolicy {
                key: "active_problems",
                ttl: TtlClass::Volatile,
            }),
            _ => None,
        }
    }

    pub fn host_scope(&self) -> HostScope {
        match self {
            Operation::Triggers => HostScope::Optional,
            Operation::Items | Operation::LatestData => HostScope::Required,
            _ => HostScope::Global,
        }
    }

    /// Whether the operation yields a summary mapping rather than records.
    pub fn returns_summary(&self) -> bool {
        matches!(
            self,
            Operation::CriticalAlertsSummary | Operation::HostsByCategory | Operation::SystemStats
        )
    }

    /// Empty result of the right shape, used when a fetch fails.
    pub fn empty_payload(&self) -> Payload {
        if self.returns_summary() {
            Payload::empty_summary()
        } else {
            Payload::empty_records()
        }
    }

    /// Log line naming the operation with its resolved arguments.
    pub fn describe(&self, args: &FetchArgs) -> String {
        let mut parts = Vec::new();
        if let Some(host_id) = &args.host_id {
            parts.push(host_id.clone());
        }
        if let Some(limit) = args.limit {
            parts.push(limit.to_string());
        }
        if let Some(hours) = args.window_hours {
            parts.push(format!("{}h", hours));
        }
        format!("{}({})", self.name(), parts.join(", "))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments passed to a fetch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchArgs {
    /// Host identifier for host-scoped operations
    pub host_id: Option<String>,
    /// Row limit
    pub limit: Option<usize>,
    /// Look-back window in hours
    pub window_hours: Option<usize>,
}

impl FetchArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = Some(host_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_window_hours(mut self, hours: usize) -> Self {
        self.window_hours = Some(hours);
        self
    }
}

/// One entry of the plan: operations fired when any trigger intent is present.
#[derive(Debug, Clone, Copy)]
pub struct PlanStep {
    pub triggers: &'static [Intent],
    pub operations: &'static [Operation],
}

impl PlanStep {
    /// Whether this step runs for the given intents.
    pub fn fires_for(&self, intents: &crate::intent::IntentSet) -> bool {
        intents.contains_any(self.triggers)
    }
}

/// Intent to operation plan. Steps run in this order.
pub const PLAN: &[PlanStep] = &[
    PlanStep {
        triggers: &[Intent::Hosts, Intent::General],
        operations: &[Operation::AllHosts],
    },
    PlanStep {
        triggers: &[Intent::DcsSpecific, Intent::Infrastructure],
        operations: &[Operation::DcsSpecificHosts],
    },
    PlanStep {
        triggers: &[Intent::Network],
        operations: &[Operation::NetworkDevices],
    },
    PlanStep {
        triggers: &[Intent::Problems, Intent::General, Intent::Status],
        operations: &[
            Operation::ActiveProblems,
            Operation::CriticalAlertsSummary,
            Operation::TopProblematicHosts,
        ],
    },
    PlanStep {
        triggers: &[Intent::Status, Intent::Infrastructure],
        operations: &[Operation::HostAvailabilityStatus],
    },
    PlanStep {
        triggers: &[Intent::Maintenance],
        operations: &[Operation::MaintenanceInfo],
    },
    PlanStep {
        triggers: &[Intent::Infrastructure, Intent::General],
        operations: &[Operation::HostsByCategory],
    },
    PlanStep {
        triggers: &[Intent::Triggers],
        operations: &[Operation::Triggers],
    },
    PlanStep {
        triggers: &[Intent::Items],
        operations: &[Operation::Items],
    },
    PlanStep {
        triggers: &[Intent::History],
        operations: &[Operation::LatestData, Operation::RecentEvents],
    },
    PlanStep {
        triggers: &[Intent::Alerts],
        operations: &[Operation::AlertsLast24h],
    },
    PlanStep {
        triggers: &[Intent::Status, Intent::General],
        operations: &[Operation::SystemStats],
    },
];

/// An external data collaborator serving fetch operations.
///
/// Implementations are expected to enforce their own timeouts; the
/// aggregator neither retries nor cancels calls.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run one named operation.
    async fn fetch(&self, operation: Operation, args: &FetchArgs) -> Result<Payload, SourceError>;

    /// Look up a host by name.
    ///
    /// Returns `None` unless the name identifies exactly one host, so a
    /// vague hint never scopes fetches to an unrelated host.
    async fn find_host(&self, name: &str) -> Result<Option<Record>, SourceError>;

    /// Check the source is reachable.
    async fn ping(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentSet;
    use std::collections::HashSet;

    #[test]
    fn test_bundle_keys_are_unique() {
        let ops = PLAN.iter().flat_map(|s| s.operations.iter());
        let keys: Vec<_> = ops.map(|op| op.bundle_key()).collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn test_cache_policies() {
        assert_eq!(
            Operation::ActiveProblems.cache_policy().map(|p| p.ttl),
            Some(TtlClass::Volatile)
        );
        assert_eq!(
            Operation::AllHosts.cache_policy().map(|p| p.key),
            Some("all_hosts")
        );
        assert!(Operation::SystemStats.cache_policy().is_none());
    }

    #[test]
    fn test_describe_with_args() {
        assert_eq!(Operation::AllHosts.describe(&FetchArgs::new()), "get_all_hosts()");
        assert_eq!(
            Operation::LatestData.describe(&FetchArgs::new().with_host("10084").with_limit(10)),
            "get_latest_data(10084, 10)"
        );
        assert_eq!(
            Operation::RecentEvents.describe(&FetchArgs::new().with_window_hours(24)),
            "get_recent_events(24h)"
        );
    }

    #[test]
    fn test_general_plan() {
        let intents = IntentSet::general();
        let ops: Vec<_> = PLAN
            .iter()
            .filter(|s| s.fires_for(&intents))
            .flat_map(|s| s.operations.iter().copied())
            .collect();

        assert_eq!(
            ops,
            vec![
                Operation::AllHosts,
                Operation::ActiveProblems,
                Operation::CriticalAlertsSummary,
                Operation::TopProblematicHosts,
                Operation::HostsByCategory,
                Operation::SystemStats,
            ]
        );
    }

    #[test]
    fn test_empty_payload_shape() {
        assert_eq!(Operation::SystemStats.empty_payload(), Payload::empty_summary());
        assert_eq!(Operation::Triggers.empty_payload(), Payload::empty_records());
    }
}
