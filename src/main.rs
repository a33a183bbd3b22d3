use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zakat_fitrah::{
    api::{AppState, app_router},
    config::{database, rates, settings::AppConfig},
    core::{auth, zakat_rate},
    errors::Result,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // 2. Initialize tracing
    init_tracing();

    // 3. Load the application configuration
    let config = AppConfig::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and create the schema
    let db = database::connect_and_migrate(&config.database_url, config.db_pool_size)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed master rates and the first administrator
    let seed = rates::load_config(&config.config_path)?;
    let seeded = zakat_rate::seed_rates(&db, &seed.rates).await?;
    info!(seeded, "Zakat rates ready");

    if let Some(admin) = &config.bootstrap_admin {
        auth::bootstrap_admin(&db, admin).await?;
    }
    let purged = auth::purge_expired_sessions(&db).await?;
    info!(purged, "Purged expired sessions");

    // 6. Serve HTTP
    let listen_addr = config.listen_addr;
    let state = Arc::new(AppState::new(db, config));
    state.photos.ensure_dirs().await?;

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "Listening");
    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
