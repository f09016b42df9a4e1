use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fakestore_api::auth::AuthService;
use fakestore_api::infra::clock::{Clock, SystemClock};
use fakestore_api::infra::db;
use fakestore_api::routes;
use fakestore_api::security::config::AuthConfig;
use fakestore_api::security::jwt::TokenCodec;
use fakestore_api::security::password::Argon2PasswordHasher;
use fakestore_api::state::AppState;
use fakestore_api::store::postgres::{PgRefreshTokenLedger, PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect().await?;
    db::run_migrations(&pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = Arc::new(TokenCodec::new(&AuthConfig::from_env(), clock.clone()));
    let auth = AuthService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgRefreshTokenLedger::new(pool.clone(), clock.clone())),
        Arc::new(Argon2PasswordHasher::new()),
        codec,
        clock,
    );
    let state = AppState::new(pool, auth);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, routes::app(state)).await?;
    Ok(())
}
