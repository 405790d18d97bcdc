use config::ConfigError;
use std::time::Duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub keys: KeySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level URL, used to create throwaway test databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Paths to the PEM encoded P-256 private keys
#[derive(serde::Deserialize, Clone)]
pub struct KeySettings {
    pub access_key_path: String,
    pub refresh_key_path: String,
}

/// Session authorizer tuning
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// Upper bound on a credential lookup during authorization
    pub lookup_timeout_ms: u64,
}

impl AuthSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 3000,
        }
    }
}

/// Read `configuration.yaml` (optional), then `APP__*` environment overrides,
/// e.g. `APP__APPLICATION__PORT=8080`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
