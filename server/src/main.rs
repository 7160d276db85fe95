mod config;
mod db;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");
    let port = config.port;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    if config.dev_auth_bypass {
        tracing::warn!("DEV_AUTH_BYPASS enabled; POST /api/dev/session issues sessions without sign-in");
    }
    tracing::info!(auto_approve = config.auto_approve, sign_in_url = %config.sign_in_url, "configuration loaded");

    let state = state::AppState::new(pool, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "annotation service listening");
    axum::serve(listener, app).await.expect("server failed");
}
