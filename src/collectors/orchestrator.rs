use prometheus::proto::MetricFamily;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clients::{OrchestratorClient, OrchestratorMetrics};
use crate::collectors::Collector;
use crate::collectors::util::{self, MetricDesc, ValueKind, bool_to_f64};

const NAMESPACE: &str = "orchestrator";

const METRICS: &[MetricDesc] = &[
    MetricDesc {
        name: "cluster_size",
        help: "Number of nodes in Orchestrator cluster",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "is_active_node",
        help: "If this node is active Orchestrator node",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "problems",
        help: "Count of MySQL clusters with problems",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "last_failover_id",
        help: "ID of last failover",
        kind: ValueKind::Counter,
    },
    MetricDesc {
        name: "is_healthy",
        help: "Orchestrator node health status",
        kind: ValueKind::Gauge,
    },
    MetricDesc {
        name: "failed_seeds",
        help: "Count of failed seeds",
        kind: ValueKind::Gauge,
    },
];

/// Collects orchestrator topology metrics.
pub struct OrchestratorCollector {
    client: OrchestratorClient,
    /// At most one fetch is in flight per collector; concurrent scrapes of
    /// the same backend queue here.
    scrape_lock: Mutex<()>,
}

impl OrchestratorCollector {
    #[must_use]
    pub fn new(client: OrchestratorClient) -> Self {
        Self {
            client,
            scrape_lock: Mutex::new(()),
        }
    }

    /// One family per descriptor-table entry, in table order, all values
    /// from the same snapshot.
    #[allow(clippy::cast_precision_loss)]
    fn snapshot_families(stats: &OrchestratorMetrics) -> Vec<MetricFamily> {
        let values = [
            stats.available_nodes as f64,
            bool_to_f64(stats.is_active_node),
            stats.problems as f64,
            stats.last_failover_id as f64,
            bool_to_f64(stats.healthy),
            stats.failed_seeds as f64,
        ];

        METRICS
            .iter()
            .zip(values)
            .map(|(desc, value)| util::family(NAMESPACE, desc, value))
            .collect()
    }
}

impl Collector for OrchestratorCollector {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn describe(&self) -> Vec<&'static MetricDesc> {
        util::with_up(METRICS)
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        let _in_flight = self.scrape_lock.lock().await;

        match self.client.fetch_metrics().await {
            Ok(stats) => {
                let mut families = vec![util::up_family(NAMESPACE, true)];
                families.extend(Self::snapshot_families(&stats));
                families
            }
            Err(err) => {
                warn!(collector = NAMESPACE, error = %err, "error getting orchestrator stats");
                vec![util::up_family(NAMESPACE, false)]
            }
        }
    }
}
