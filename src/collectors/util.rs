//! Shared building blocks for collectors: the immutable metric-descriptor
//! table entries and the helpers that turn a descriptor plus a fresh value
//! into an encodable metric family.
//!
//! Families are built per collect call (const-metric style). Nothing is
//! registered or kept between scrapes, so a failed fetch cannot leave stale
//! samples behind.

use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Counter, Gauge, Opts};

/// Exposition value kind of one metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

/// Construction-time metadata for one metric. The full exposition name is
/// `<namespace>_<name>`.
#[derive(Debug)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: ValueKind,
}

/// The per-backend scrape status gauge, present for every collector.
pub const UP: MetricDesc = MetricDesc {
    name: "up",
    help: "Status of the last metric scrape",
    kind: ValueKind::Gauge,
};

/// Descriptor table of a collector: the "up" gauge followed by the
/// collector's own entries.
pub(crate) fn with_up(metrics: &'static [MetricDesc]) -> Vec<&'static MetricDesc> {
    std::iter::once(&UP).chain(metrics).collect()
}

/// Builds one single-sample family for a descriptor.
#[allow(clippy::expect_used)] // static metric names, validated by tests
pub(crate) fn family(namespace: &str, desc: &MetricDesc, value: f64) -> MetricFamily {
    let opts = Opts::new(desc.name, desc.help).namespace(namespace);

    let mut families = match desc.kind {
        ValueKind::Gauge => {
            let gauge = Gauge::with_opts(opts).expect("valid metric opts");
            gauge.set(value);
            gauge.collect()
        }
        ValueKind::Counter => {
            let counter = Counter::with_opts(opts).expect("valid metric opts");
            counter.inc_by(value.max(0.0));
            counter.collect()
        }
    };

    families.pop().expect("one family per metric")
}

/// The `<namespace>_up` sample.
pub(crate) fn up_family(namespace: &str, up: bool) -> MetricFamily {
    family(namespace, &UP, bool_to_f64(up))
}

/// Constant exporter build-information gauge.
#[allow(clippy::expect_used)]
pub(crate) fn build_info_family(version: &str, commit: &str) -> MetricFamily {
    let opts = Opts::new("orcus_exporter_build_info", "Exporter build information")
        .const_label("version", version)
        .const_label("commit", commit);

    let gauge = Gauge::with_opts(opts).expect("valid build info metric opts");
    gauge.set(1.0);
    gauge.collect().pop().expect("one family per metric")
}

pub(crate) fn bool_to_f64(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

#[cfg(test)]
pub(crate) fn encode(families: &[MetricFamily]) -> String {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(families, &mut buffer)
        .expect("encodable families");
    String::from_utf8(buffer).expect("utf8 exposition")
}
