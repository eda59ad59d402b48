//! Trivia party backend entrypoint wiring REST, SSE, and the record store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_party_back::{
    config::AppConfig,
    dao::record_store::memory::MemoryRecordStore,
    oracle::QuestionOracle,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config, build_oracle());

    setup_record_store(app_state.clone()).await;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the primary question oracle: Gemini when configured, the static bank
/// otherwise.
fn build_oracle() -> Option<Arc<dyn QuestionOracle>> {
    #[cfg(feature = "ai-oracle")]
    {
        use trivia_party_back::oracle::gemini::GeminiOracle;

        match GeminiOracle::from_env() {
            Some(Ok(oracle)) => {
                info!("using the Gemini question oracle");
                return Some(Arc::new(oracle));
            }
            Some(Err(err)) => {
                tracing::warn!(error = %err, "failed to initialise the Gemini oracle; using the bank");
            }
            None => info!("GEMINI_API_KEY not set; using the bank oracle"),
        }
    }

    None
}

/// Install the record store: a supervised CouchDB connection when configured,
/// the in-memory store otherwise.
async fn setup_record_store(state: SharedState) {
    #[cfg(feature = "couch-store")]
    if env::var_os("COUCH_BASE_URL").is_some() {
        use trivia_party_back::{
            dao::{StorageError, record_store::RecordStore},
            dao::record_store::couchdb::{CouchConfig, CouchRecordStore},
            services::storage_supervisor,
        };

        info!("COUCH_BASE_URL set; supervising a CouchDB record store");
        tokio::spawn(storage_supervisor::run(state, || async {
            let config = CouchConfig::from_env().map_err(|err| {
                StorageError::unavailable("invalid CouchDB configuration".into(), err)
            })?;
            let store = CouchRecordStore::connect(config).await.map_err(|err| {
                StorageError::unavailable("CouchDB connection failed".into(), err)
            })?;
            let store: Arc<dyn RecordStore> = Arc::new(store);
            Ok(store)
        }));
        return;
    }

    info!("using the in-memory record store");
    state
        .install_record_store(Arc::new(MemoryRecordStore::new()))
        .await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
