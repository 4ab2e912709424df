use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5433;
pub const DEFAULT_DATABASE: &str = "mcpdb";
pub const DEFAULT_USERNAME: &str = "mcpuser";
pub const DEFAULT_PASSWORD: &str = "mcppassword";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(format!("unknown sslmode: {}", other)),
        }
    }
}

/// Database target for a query runner process.
///
/// Built once at startup and never changed afterwards; every query in the
/// process goes to the same place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub idle_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            ssl_mode: SslMode::default(),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    /// Defaults overridden by any `PGBROWSE_DB_*` variables present in the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConnectionConfig::default();

        if let Some(host) = lookup("PGBROWSE_DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PGBROWSE_DB_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => log::warn!("Ignoring invalid PGBROWSE_DB_PORT: {}", port),
            }
        }
        if let Some(database) = lookup("PGBROWSE_DB_NAME") {
            config.database = database;
        }
        if let Some(username) = lookup("PGBROWSE_DB_USER") {
            config.username = username;
        }
        if let Some(password) = lookup("PGBROWSE_DB_PASSWORD") {
            config.password = password;
        }
        if let Some(mode) = lookup("PGBROWSE_DB_SSLMODE") {
            match mode.parse() {
                Ok(mode) => config.ssl_mode = mode,
                Err(e) => log::warn!("Ignoring PGBROWSE_DB_SSLMODE: {}", e),
            }
        }

        config
    }

    /// Connection string with URL-encoded credentials
    pub fn connection_string(&self) -> String {
        let username = urlencoding::encode(&self.username);
        let password = urlencoding::encode(&self.password);

        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            username, password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
