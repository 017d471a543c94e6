use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use authkeeper::auth::{BcryptHasher, JwtSigner, RequestAuthenticator, TokenSigner};
use authkeeper::configuration::get_configuration;
use authkeeper::service::{SessionIssuer, UserService};
use authkeeper::startup::{run, AppState};
use authkeeper::store::{PgRefreshTokenStore, PgUserStore, RefreshTokenStore, UserStore};
use authkeeper::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    init_telemetry(&configuration.log.level);
    tracing::info!("Starting application");

    let auth_config = configuration.auth.auth_config().map_err(|e| {
        tracing::error!("Invalid auth configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!(auth = ?auth_config, "Configuration loaded successfully");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(configuration.database.acquire_timeout())
        .connect_with(configuration.database.with_db())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to migrate the database: {}", e);
            startup_error(std::io::ErrorKind::Other, "Database migration error")
        })?;
    tracing::info!("Database ready");

    let hasher = Arc::new(BcryptHasher::new(auth_config.bcrypt_cost).map_err(|e| {
        tracing::error!("Invalid bcrypt cost: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?);
    let signer: Arc<dyn TokenSigner> =
        Arc::new(JwtSigner::new(&auth_config.secret, auth_config.leeway));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let token_store = Arc::new(PgRefreshTokenStore::new(pool));
    let tokens: Arc<dyn RefreshTokenStore> = token_store.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match token_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Expired refresh tokens purged"),
                Err(e) => tracing::warn!(error = %e, "Refresh token purge failed"),
            }
        }
    });

    let state = AppState {
        sessions: SessionIssuer::new(
            users.clone(),
            tokens,
            hasher.clone(),
            signer.clone(),
            auth_config.clone(),
        ),
        users: UserService::new(users, hasher, auth_config.store_timeout),
        authenticator: RequestAuthenticator::new(signer),
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
