use std::sync::Arc;

use ollabridge::api::router;
use ollabridge::config::AppConfig;
use ollabridge::observability::init_tracing;
use ollabridge::state::AppState;

fn main() {
    let config = AppConfig::from_env();
    init_tracing(&config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    runtime.block_on(async move {
        run(config).await;
    });
}

async fn run(config: AppConfig) {
    let host = config.host.clone();
    let port = config.port;

    tracing::info!(
        "ollabridge starting on {}:{} (backend: {})",
        host,
        port,
        config.ollama_base_url
    );
    if !config.think_models.is_empty() {
        tracing::info!(
            "think mode enabled by default for: {}",
            config
                .think_models
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            eprintln!("Failed to initialize application state: {err}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(format!("{host}:{port}")).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("Failed to bind to {host}:{port}: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!("ollabridge is ready to accept connections");
    if let Err(err) = axum::serve(listener, router(state)).await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}
