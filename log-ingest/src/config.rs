use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

/// Password used when `DB_PASSWORD` is not set. Startup logs a warning when
/// the service runs with it.
pub const DEFAULT_DB_PASSWORD: &str = "ingest";

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "9090")]
    pub port: u16,

    #[envconfig(default = "log-ingest")]
    pub service_name: String,

    // Request body cap in bytes, 0 disables it
    #[envconfig(default = "0")]
    pub max_body_size: usize,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    #[envconfig(default = "false")]
    pub validate_events: bool,

    #[envconfig(default = "8192")]
    pub max_message_length: usize,

    // Characters of the event message echoed to the diagnostic log, 0 omits it
    #[envconfig(default = "256")]
    pub diagnostic_message_limit: usize,

    #[envconfig(nested = true)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load from the process environment. Variables set to the empty string
    /// count as unset and take their default.
    pub fn init_from_non_empty_env() -> Result<Self, envconfig::Error> {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::init_from_non_empty_vars(vars)
    }

    pub fn init_from_non_empty_vars<I>(vars: I) -> Result<Self, envconfig::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self::init_from_hashmap(&vars)
    }

    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection settings for the Postgres sink, resolved once at startup.
#[derive(Envconfig, Clone)]
pub struct DatabaseConfig {
    #[envconfig(from = "DB_HOST", default = "localhost")]
    pub host: String,

    #[envconfig(from = "DB_PORT", default = "5432")]
    pub port: u16,

    #[envconfig(from = "DB_NAME", default = "logs")]
    pub name: String,

    #[envconfig(from = "DB_USER", default = "ingest")]
    pub user: String,

    #[envconfig(from = "DB_PASSWORD", default = "ingest")]
    pub password: String,

    #[envconfig(from = "DB_SSLMODE", default = "disable")]
    pub sslmode: String,

    #[envconfig(from = "DB_MAX_CONNECTIONS", default = "10")]
    pub max_connections: u32,

    #[envconfig(from = "DB_CONNECT_TIMEOUT_MS", default = "5000")]
    pub connect_timeout: EnvMsDuration,

    #[envconfig(from = "DB_RUN_MIGRATIONS", default = "false")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_DB_PASSWORD
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}
