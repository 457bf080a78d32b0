//! Collector framework: one collector per enabled backend, each applying the
//! same emission contract on every scrape. The `<namespace>_up` gauge is
//! always present; the remaining metrics are emitted together on success or
//! not at all on failure.

use prometheus::proto::MetricFamily;

use crate::collectors::util::MetricDesc;

#[macro_use]
mod register_macro;

pub trait Collector {
    /// Short backend identifier; doubles as the metric namespace.
    fn name(&self) -> &'static str;

    /// The full descriptor table this collector can emit, "up" included.
    /// Immutable after construction and callable with the backend
    /// unreachable, so the metric surface can be validated statically.
    fn describe(&self) -> Vec<&'static MetricDesc>;

    /// Drives one backend fetch and returns the emitted families. Steady
    /// state errors are handled inside: they downgrade the output to a
    /// single `up = 0` sample and never propagate.
    fn collect(&self) -> impl std::future::Future<Output = Vec<MetricFamily>> + Send;
}

// New collectors get an entry here plus their bootstrap wiring in the
// composition root
register_collectors! {
    oauth2_proxy => Oauth2ProxyCollector,
    orcus => OrcusCollector,
    orchestrator => OrchestratorCollector,
    xtradb => XtradbCollector,
}

// Other modules
pub mod registry;
pub mod util;
