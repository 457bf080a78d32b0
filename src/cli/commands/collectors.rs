use clap::{Arg, Command};

/// Flag metadata for one backend collector. Every backend gets an
/// enable/disable flag pair plus one value flag (endpoint URI, or the
/// credentials-file path for the SQL backend). All collectors are enabled by
/// default, matching the exporter's drop-in role on a full HA node.
pub(crate) struct Backend {
    pub name: &'static str,
    pub value_suffix: &'static str,
    pub value_default: &'static str,
    pub value_help: &'static str,
}

pub(crate) const BACKENDS: &[Backend] = &[
    Backend {
        name: "oauth2-proxy",
        value_suffix: "uri",
        value_default: "http://127.0.0.1:4180/ping",
        value_help: "URI for probing oauth2_proxy",
    },
    Backend {
        name: "orcus",
        value_suffix: "uri",
        value_default: "http://127.0.0.1:3008/metrics",
        value_help: "URI for scraping orcus metrics",
    },
    Backend {
        name: "orchestrator",
        value_suffix: "uri",
        value_default: "http://127.0.0.1:3000/api",
        value_help: "Base API URI for scraping orchestrator metrics",
    },
    Backend {
        name: "xtradb-cluster",
        value_suffix: "my-cnf",
        value_default: "~/.my.cnf",
        value_help: "Path to .my.cnf file to read MySQL credentials from",
    },
];

pub(crate) fn enable_flag(name: &str) -> String {
    format!("collector.{name}")
}

pub(crate) fn disable_flag(name: &str) -> String {
    format!("no-collector.{name}")
}

pub(crate) fn value_flag(backend: &Backend) -> String {
    format!("collector.{}.{}", backend.name, backend.value_suffix)
}

fn env_var(flag: &str) -> String {
    format!(
        "ORCUS_EXPORTER_{}",
        flag.to_uppercase().replace(['.', '-'], "_")
    )
}

pub fn add_collectors_args(mut cmd: Command) -> Command {
    for backend in BACKENDS {
        let enable: &'static str = Box::leak(enable_flag(backend.name).into_boxed_str());
        let disable: &'static str = Box::leak(disable_flag(backend.name).into_boxed_str());
        let value: &'static str = Box::leak(value_flag(backend).into_boxed_str());
        let value_env: &'static str = Box::leak(env_var(value).into_boxed_str());

        let enable_help: &'static str = Box::leak(
            format!("Enable the {} collector [default: enabled]", backend.name).into_boxed_str(),
        );
        let disable_help: &'static str =
            Box::leak(format!("Disable the {} collector", backend.name).into_boxed_str());

        cmd = cmd
            .arg(
                Arg::new(enable)
                    .long(enable)
                    .help(enable_help)
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new(disable)
                    .long(disable)
                    .help(disable_help)
                    .action(clap::ArgAction::SetTrue)
                    .overrides_with(enable),
            )
            .arg(
                Arg::new(value)
                    .long(value)
                    .help(backend.value_help)
                    .default_value(backend.value_default)
                    .env(value_env),
            );
    }
    cmd
}
