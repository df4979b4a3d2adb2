use anyhow::Context;
use eventdesk::{config::Config, db, router, state::AppState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eventdesk=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .context("failed to parse DATABASE_URL")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options)
        .await
        .context("failed to connect to db")?;

    db::init_schema(&pool)
        .await
        .context("failed to create tables")?;

    if config.seed_demo_data {
        if let Err(e) = db::seed_database_if_empty(&pool).await {
            tracing::warn!(error = %e, "failed to seed demo events");
        }
    }

    let app = router(AppState { pool });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
