//! Ichtaka API server entry point.

use anyhow::Context;
use std::sync::Arc;

use ichtaka::auth::{
    AuthService, PgIdentityRepository, PgRefreshTokenRepository, TokenBlacklist, TokenService,
};
use ichtaka::auth::repository::{IdentityRepository, RefreshTokenRepository};
use ichtaka::config::AppConfig;
use ichtaka::db;
use ichtaka::gateway::{self, state::AppState};
use ichtaka::notifications::{NotificationService, PgNotificationRepository};
use ichtaka::websocket::ConnectionRegistry;
use ichtaka::{logging, notifications::NotificationRepository};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    std::env::var("APP_ENV").unwrap_or_else(|_| "default".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _guard = logging::init_logging(&config);

    let postgres_url = config
        .postgres_url
        .clone()
        .context("postgres_url must be set in config")?;
    let pool = db::connect_and_migrate(&postgres_url).await?;

    let identities: Arc<dyn IdentityRepository> =
        Arc::new(PgIdentityRepository::new(pool.clone()));
    let refresh_tokens: Arc<dyn RefreshTokenRepository> =
        Arc::new(PgRefreshTokenRepository::new(pool.clone()));
    let notification_repo: Arc<dyn NotificationRepository> =
        Arc::new(PgNotificationRepository::new(pool));

    let tokens = TokenService::new(
        &config.auth,
        identities.clone(),
        refresh_tokens,
        Arc::new(TokenBlacklist::new()),
    );
    let auth = Arc::new(AuthService::new(identities.clone(), tokens));

    let registry = Arc::new(ConnectionRegistry::new());
    let notifications = Arc::new(NotificationService::new(
        notification_repo,
        identities,
        registry.clone(),
    ));

    let state = Arc::new(AppState::new(auth, registry, notifications));
    gateway::run_server(&config, state).await
}
