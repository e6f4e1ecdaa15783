use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use recruitment_pipeline::{
    config::{Config, LogFormat},
    database::{pool::create_pool, CandidateStore, MemoryStore, PgStore},
    middleware::auth::AuthState,
    routes, AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn build_app<S: CandidateStore + 'static>(store: S, config: &Config) -> Router {
    let state = AppState::new(Arc::new(store), config);
    routes::router(state, AuthState::new(&config.jwt_secret))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!(
        policy = ?config.transition_policy,
        utc_offset_hours = config.utc_offset_hours,
        "Starting recruitment pipeline"
    );

    let app = match &config.database_url {
        Some(url) => {
            let store = PgStore::new(create_pool(url).await?);
            store.migrate().await?;
            info!("Using PostgreSQL candidate store");
            build_app(store, &config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; candidates are kept in memory only");
            build_app(MemoryStore::new(), &config)
        }
    };

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
