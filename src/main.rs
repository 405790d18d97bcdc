use crm_system::auth::{SessionAuthorizer, TokenKeys};
use crm_system::configuration::get_configuration;
use crm_system::startup::run;
use crm_system::store::PostgresStore;
use crm_system::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Both signing keys are required before anything else starts
    let keys = TokenKeys::load(
        &configuration.keys.access_key_path,
        &configuration.keys.refresh_key_path,
    )
    .map_err(|e| {
        tracing::error!("Failed to load signing keys: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, "Key error")
    })?;
    tracing::info!("Signing keys loaded");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let store = Arc::new(PostgresStore::new(pool));
    let authorizer = SessionAuthorizer::new(
        keys,
        store.clone(),
        configuration.auth.lookup_timeout(),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, store.clone(), store, authorizer)?;
    server.await
}
