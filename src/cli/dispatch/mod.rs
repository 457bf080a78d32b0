use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use url::Url;

use crate::cli::actions::{Action, ExporterSettings};
use crate::cli::commands::collectors::{BACKENDS, Backend, disable_flag, enable_flag, value_flag};

pub fn handler(matches: &ArgMatches) -> Result<Action> {
    // Get the port or return an error
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // Get the listen address (None means auto-detect)
    let listen = matches.get_one::<String>("listen").map(ToString::to_string);

    let metrics_path = matches
        .get_one::<String>("metrics-path")
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("Metrics path is required."))?;

    let retries = matches.get_one::<u32>("retries").copied().unwrap_or(0);
    let retry_interval =
        Duration::from_secs(matches.get_one::<u64>("retry-interval").copied().unwrap_or(5));
    let scrape_timeout =
        Duration::from_secs(matches.get_one::<u64>("timeout").copied().unwrap_or(5));

    let settings = ExporterSettings {
        port,
        listen,
        metrics_path,
        retries,
        retry_interval,
        scrape_timeout,
        ssl_verify: matches.get_flag("ssl-verify"),
        oauth2_proxy_uri: backend_uri(matches, "oauth2-proxy")?,
        orcus_uri: backend_uri(matches, "orcus")?,
        orchestrator_uri: backend_uri(matches, "orchestrator")?,
        xtradb_my_cnf: my_cnf_path(matches),
    };

    Ok(Action::Run { settings })
}

fn backend(name: &str) -> &'static Backend {
    // BACKENDS is the closed flag table; a miss here is a programming error
    // caught by the dispatch tests.
    #[allow(clippy::expect_used)]
    BACKENDS
        .iter()
        .find(|b| b.name == name)
        .expect("known backend name")
}

fn backend_enabled(matches: &ArgMatches, name: &str) -> bool {
    // If explicitly disabled, skip it
    if matches.get_flag(&disable_flag(name)) {
        return false;
    }

    // If explicitly enabled, include it
    if matches.get_flag(&enable_flag(name)) {
        return true;
    }

    // All backends are enabled by default
    true
}

/// Endpoint URI for an enabled HTTP backend, `None` when disabled.
fn backend_uri(matches: &ArgMatches, name: &str) -> Result<Option<Url>> {
    if !backend_enabled(matches, name) {
        return Ok(None);
    }

    let flag = value_flag(backend(name));
    let raw = matches
        .get_one::<String>(&flag)
        .ok_or_else(|| anyhow!("Missing value for --{flag}"))?;

    let uri = Url::parse(raw).with_context(|| format!("Invalid URI {raw:?} for --{flag}"))?;

    Ok(Some(uri))
}

/// Credentials-file path for the SQL backend, `None` when disabled. A
/// leading `~/` expands against `$HOME`, matching the flag's default value.
fn my_cnf_path(matches: &ArgMatches) -> Option<PathBuf> {
    let name = "xtradb-cluster";
    if !backend_enabled(matches, name) {
        return None;
    }

    let flag = value_flag(backend(name));
    let raw = matches.get_one::<String>(&flag)?;

    let path = match raw.strip_prefix("~/") {
        Some(rest) => std::env::var_os("HOME")
            .map_or_else(|| PathBuf::from(raw), |home| PathBuf::from(home).join(rest)),
        None => PathBuf::from(raw),
    };

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn parse(argv: &[&str]) -> ArgMatches {
        commands::new().get_matches_from(argv)
    }

    #[test]
    fn test_all_backends_enabled_by_default() {
        let matches = parse(&["orcus_exporter"]);
        let Action::Run { settings } = handler(&matches).unwrap();

        assert!(settings.oauth2_proxy_uri.is_some());
        assert!(settings.orcus_uri.is_some());
        assert!(settings.orchestrator_uri.is_some());
        assert!(settings.xtradb_my_cnf.is_some());
    }

    #[test]
    fn test_disable_flag_removes_backend() {
        let matches = parse(&["orcus_exporter", "--no-collector.xtradb-cluster"]);
        let Action::Run { settings } = handler(&matches).unwrap();

        assert!(settings.xtradb_my_cnf.is_none());
        assert!(settings.orcus_uri.is_some());
    }

    #[test]
    fn test_explicit_enable_keeps_backend() {
        let matches = parse(&["orcus_exporter", "--collector.orcus"]);
        let Action::Run { settings } = handler(&matches).unwrap();

        assert!(settings.orcus_uri.is_some());
    }

    #[test]
    fn test_backend_uri_override() {
        let matches = parse(&[
            "orcus_exporter",
            "--collector.orcus.uri",
            "http://10.0.0.5:3008/metrics",
        ]);
        let Action::Run { settings } = handler(&matches).unwrap();

        assert_eq!(
            settings.orcus_uri.unwrap().as_str(),
            "http://10.0.0.5:3008/metrics"
        );
    }

    #[test]
    fn test_invalid_backend_uri_is_rejected() {
        let matches = parse(&["orcus_exporter", "--collector.orcus.uri", "not a uri"]);
        assert!(handler(&matches).is_err());
    }

    #[test]
    fn test_retry_settings() {
        let matches = parse(&[
            "orcus_exporter",
            "--retries",
            "3",
            "--retry-interval",
            "2",
            "--timeout",
            "7",
        ]);
        let Action::Run { settings } = handler(&matches).unwrap();

        assert_eq!(settings.retries, 3);
        assert_eq!(settings.retry_interval, Duration::from_secs(2));
        assert_eq!(settings.scrape_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_my_cnf_tilde_expansion() {
        let matches = parse(&["orcus_exporter"]);
        let Action::Run { settings } = handler(&matches).unwrap();

        let path = settings.xtradb_my_cnf.unwrap();
        assert!(path.ends_with(".my.cnf"));
        if std::env::var_os("HOME").is_some() {
            assert!(!path.starts_with("~"));
        }
    }
}
