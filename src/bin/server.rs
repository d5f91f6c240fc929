//! Binary entrypoint: load config, initialise logging, wire up an engine
//! loader and a session store (Redis if configured, in-memory otherwise),
//! and serve the HTTP surface with graceful shutdown.

use std::sync::Arc;

use aiq_engine::config::Config;
use aiq_engine::loader::EngineLoader;
use aiq_engine::orchestrator::QuestionnaireService;
use aiq_engine::protocol::create_router;
use aiq_engine::store::{MemorySessionStore, RedisSessionStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|err| {
        eprintln!("failed to load config, falling back to defaults: {err}");
        Config::default()
    });

    let _log_guard = aiq_engine::logging::init(&config.logging);

    let loader = Arc::new(EngineLoader::new(
        config.engine.resources_root.clone(),
        config.cache_ttl(),
    ));

    let store: Arc<dyn SessionStore> = match &config.session.redis_url {
        Some(url) => {
            tracing::info!("using redis session store");
            Arc::new(RedisSessionStore::connect(url, config.session.ttl_seconds).await?)
        }
        None => {
            tracing::info!("using in-memory session store");
            Arc::new(MemorySessionStore::new(
                config.session_ttl(),
                config.cleanup_interval(),
            ))
        }
    };

    let service = Arc::new(QuestionnaireService::new(loader, store));
    let app = create_router(service);

    let addr = format!("{}:{}", config.http.host, config.http.port);
    tracing::info!(%addr, "starting http server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
