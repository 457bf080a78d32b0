use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use tracing::debug;

use crate::collectors::util::build_info_family;
use crate::collectors::{Collector, CollectorKind};
use crate::exporter::GIT_COMMIT_HASH;

/// The set of collectors whose backends were successfully bootstrapped.
/// Cheap to clone into request handlers; the collectors themselves are
/// shared, so their per-collector scrape locks apply across concurrent
/// requests.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Arc<Vec<CollectorKind>>,
    build_info: MetricFamily,
}

impl CollectorRegistry {
    /// Builds the registry, validating the declared metric surface: no two
    /// collectors may expose the same fully-qualified metric name. The check
    /// runs against `describe()` only, so it holds even if no backend has
    /// ever been reached.
    ///
    /// # Errors
    ///
    /// Returns an error when two collectors declare the same metric name.
    pub fn new(collectors: Vec<CollectorKind>) -> Result<Self> {
        let mut seen = HashSet::new();
        for collector in &collectors {
            for desc in collector.describe() {
                let fq_name = format!("{}_{}", collector.name(), desc.name);
                if !seen.insert(fq_name.clone()) {
                    bail!("duplicate metric name {fq_name:?} across collectors");
                }
            }
        }

        Ok(Self {
            collectors: Arc::new(collectors),
            build_info: build_info_family(env!("CARGO_PKG_VERSION"), GIT_COMMIT_HASH),
        })
    }

    /// Drives every registered collector and merges the emitted families
    /// into one text exposition. Collectors run one after another; a failing
    /// backend only shows up as its own `up = 0`.
    ///
    /// # Errors
    ///
    /// Only the final text encoding can fail; backend errors never surface
    /// here.
    pub async fn collect_all(&self) -> Result<String> {
        let mut families = vec![self.build_info.clone()];

        for collector in self.collectors.iter() {
            let collected = collector.collect().await;
            debug!(
                collector = collector.name(),
                families = collected.len(),
                "collected"
            );
            families.extend(collected);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    #[must_use]
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
