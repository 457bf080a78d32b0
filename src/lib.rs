//! Prometheus exporter for the Orcus HA stack: probes oauth2_proxy, the
//! orcus sync service, orchestrator and the XtraDB (Galera) cluster, and
//! republishes their health as one metrics exposition.

pub mod cli;
pub mod clients;
pub mod collectors;
pub mod exporter;
