use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub(crate) mod collectors;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let cmd = Command::new("orcus_exporter")
        .about("Prometheus exporter for the Orcus HA stack")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(built_info::GIT_COMMIT_HASH.unwrap_or(env!("CARGO_PKG_VERSION")))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9114")
                .env("ORCUS_EXPORTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .help("IP address to bind to (default: auto-detect IPv6/IPv4)")
                .env("ORCUS_EXPORTER_LISTEN")
                .value_name("IP"),
        )
        .arg(
            Arg::new("metrics-path")
                .long("metrics-path")
                .help("Path under which to expose metrics")
                .default_value("/metrics")
                .env("ORCUS_EXPORTER_METRICS_PATH")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("retries")
                .long("retries")
                .help("Number of retries per backend while initializing collectors at start")
                .default_value("0")
                .env("ORCUS_EXPORTER_RETRIES")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("retry-interval")
                .long("retry-interval")
                .help("Seconds between retries to connect to a backend")
                .default_value("5")
                .env("ORCUS_EXPORTER_RETRY_INTERVAL")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Per-request timeout for scraping a backend, in seconds")
                .default_value("5")
                .env("ORCUS_EXPORTER_TIMEOUT")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("ssl-verify")
                .long("ssl-verify")
                .help("Verify backend TLS certificates")
                .env("ORCUS_EXPORTER_SSL_VERIFY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(ArgAction::Count),
        );

    collectors::add_collectors_args(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec!["orcus_exporter"]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9114));
        assert_eq!(
            matches.get_one::<String>("metrics-path").map(String::as_str),
            Some("/metrics")
        );
        assert_eq!(matches.get_one::<u32>("retries").copied(), Some(0));
        assert_eq!(matches.get_one::<u64>("retry-interval").copied(), Some(5));
        assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(5));
        assert!(!matches.get_flag("ssl-verify"));
    }

    #[test]
    fn test_backend_uri_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec!["orcus_exporter"]);

        assert_eq!(
            matches
                .get_one::<String>("collector.oauth2-proxy.uri")
                .map(String::as_str),
            Some("http://127.0.0.1:4180/ping")
        );
        assert_eq!(
            matches
                .get_one::<String>("collector.orcus.uri")
                .map(String::as_str),
            Some("http://127.0.0.1:3008/metrics")
        );
        assert_eq!(
            matches
                .get_one::<String>("collector.orchestrator.uri")
                .map(String::as_str),
            Some("http://127.0.0.1:3000/api")
        );
        assert_eq!(
            matches
                .get_one::<String>("collector.xtradb-cluster.my-cnf")
                .map(String::as_str),
            Some("~/.my.cnf")
        );
    }

    #[test]
    fn test_port_override() {
        let command = new();
        let matches = command.get_matches_from(vec!["orcus_exporter", "--port", "9999"]);
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9999));
    }
}
