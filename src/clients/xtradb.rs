//! Client for the XtraDB (Galera) cluster. Credentials come from a
//! MySQL-style `my.cnf` file; cluster health is read from three `wsrep`
//! status variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;

use crate::clients::ClientError;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;

/// The pool never holds more than one connection, and a connection is not
/// reused past this age.
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(60);

/// One decoded set of cluster status values, produced fresh on every
/// [`XtradbClient::fetch_metrics`] call.
#[derive(Debug, PartialEq, Eq)]
pub struct XtradbMetrics {
    /// `wsrep_cluster_size`: nodes currently in the cluster.
    pub cluster_size: i64,
    /// `wsrep_local_state`: numeric node state code.
    pub node_state: i64,
    /// `wsrep_cluster_status` mapped to an integer: `"Primary"` is 1, any
    /// other value is 0.
    pub cluster_status: i64,
}

/// Client for the XtraDB cluster status.
pub struct XtradbClient {
    pool: MySqlPool,
}

impl XtradbClient {
    /// Creates an `XtradbClient` from a `my.cnf` credentials file, fetching
    /// the status once as a self-check.
    ///
    /// # Errors
    ///
    /// `Config` if the credentials file is unreadable or lacks a user or
    /// password under `[client]` (never retried); `Query` if the self-check
    /// against the cluster fails.
    pub async fn new(my_cnf: &Path, ssl_verify: bool) -> Result<Self, ClientError> {
        let cnf = MyCnf::parse(my_cnf)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .max_lifetime(MAX_CONNECTION_LIFETIME)
            .connect_lazy_with(cnf.connect_options(ssl_verify));

        let client = Self { pool };
        client.fetch_metrics().await?;
        Ok(client)
    }

    /// Fetches the three `wsrep` status values.
    ///
    /// # Errors
    ///
    /// Any failing query fails the whole call; there is no partial result.
    /// The pool is lazy, so connection failures surface here too.
    #[instrument(skip(self), level = "debug", err, fields(backend = "xtradb_cluster"))]
    pub async fn fetch_metrics(&self) -> Result<XtradbMetrics, ClientError> {
        let cluster_size = self.integer_status("wsrep_cluster_size").await?;
        let node_state = self.integer_status("wsrep_local_state").await?;
        let cluster_status = map_cluster_status(&self.status_value("wsrep_cluster_status").await?);

        Ok(XtradbMetrics {
            cluster_size,
            node_state,
            cluster_status,
        })
    }

    async fn integer_status(&self, variable: &'static str) -> Result<i64, ClientError> {
        let value = self.status_value(variable).await?;
        value.parse().map_err(|_| ClientError::Decode {
            endpoint: variable.to_string(),
            reason: format!("expected an integer status value, got {value:?}"),
        })
    }

    /// Reads one `SHOW STATUS` row. The variable names are fixed strings
    /// from this module, never user input.
    async fn status_value(&self, variable: &'static str) -> Result<String, ClientError> {
        let query = format!("SHOW STATUS LIKE '{variable}'");

        let span = info_span!(
            "db.query",
            otel.kind = "client",
            db.system = "mysql",
            db.statement = %query
        );
        let (_name, value): (String, String) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|source| ClientError::Query { variable, source })?;

        Ok(value)
    }
}

/// Maps `wsrep_cluster_status` to a gauge value: exactly `"Primary"` is 1,
/// everything else (including an empty string) is 0.
fn map_cluster_status(status: &str) -> i64 {
    i64::from(status == "Primary")
}

/// Credentials and TLS material read from the `[client]` section of a
/// `my.cnf` file.
struct MyCnf {
    user: String,
    password: SecretString,
    host: String,
    port: u16,
    socket: Option<String>,
    ssl_ca: Option<PathBuf>,
    ssl_cert: Option<PathBuf>,
    ssl_key: Option<PathBuf>,
}

impl MyCnf {
    fn parse(path: &Path) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ClientError::Config {
            path: path.to_path_buf(),
            reason: format!("failed reading credentials file: {err}"),
        })?;
        Self::from_str(&raw, path)
    }

    fn from_str(raw: &str, path: &Path) -> Result<Self, ClientError> {
        let section = client_section(raw);

        let user = section.get("user").cloned().unwrap_or_default();
        let password = section.get("password").cloned().unwrap_or_default();
        if user.is_empty() || password.is_empty() {
            return Err(ClientError::Config {
                path: path.to_path_buf(),
                reason: "no user or password specified under [client]".to_string(),
            });
        }

        let host = section
            .get("host")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = section
            .get("port")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let socket = section.get("socket").cloned();

        Ok(Self {
            user,
            password: SecretString::from(password),
            host,
            port,
            socket,
            ssl_ca: section.get("ssl-ca").map(PathBuf::from),
            ssl_cert: section.get("ssl-cert").map(PathBuf::from),
            ssl_key: section.get("ssl-key").map(PathBuf::from),
        })
    }

    /// Builds the connect options, attaching the TLS configuration directly
    /// when CA material is present. `ssl_verify = false` keeps TLS on but
    /// skips peer certificate verification.
    fn connect_options(&self, ssl_verify: bool) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .username(&self.user)
            .password(self.password.expose_secret());

        // A socket path takes precedence over host/port.
        options = match &self.socket {
            Some(socket) => options.socket(socket),
            None => options.host(&self.host).port(self.port),
        };

        if let Some(ca) = &self.ssl_ca {
            let mode = if ssl_verify {
                MySqlSslMode::VerifyCa
            } else {
                MySqlSslMode::Required
            };
            options = options.ssl_mode(mode).ssl_ca(ca);

            if let (Some(cert), Some(key)) = (&self.ssl_cert, &self.ssl_key) {
                options = options.ssl_client_cert(cert).ssl_client_key(key);
            }
        }

        options
    }
}

/// Collects `key = value` pairs from the `[client]` section. Comment lines
/// and bare boolean keys are skipped; surrounding quotes are stripped.
fn client_section(raw: &str) -> HashMap<String, String> {
    let mut section = "";
    let mut values = HashMap::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim();
            continue;
        }
        if section != "client" {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            values.insert(key.trim().to_string(), value.to_string());
        }
    }

    values
}
