//! Startup wiring and the serve loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use playground_core::{JsonnetEvaluator, SnippetStore};
use playground_store::SqliteSnippetStore;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::router::build_router;
use crate::state::AppState;

/// Open storage, bind the listener and serve until SIGINT or SIGTERM
pub async fn run(config: Config) -> anyhow::Result<()> {
    let url = config.database_url.clone().into_inner();
    let store = tokio::task::spawn_blocking(move || SqliteSnippetStore::open(&url))
        .await
        .context("storage initialization task failed")?
        .map_err(anyhow::Error::new)
        .context("failed to open database")?;

    let snippets = store.count().map_err(anyhow::Error::new)?;
    tracing::info!(snippets, "storage ready");

    if !config.static_dir.join("index.html").is_file() {
        tracing::warn!(
            static_dir = %config.static_dir.display(),
            "static directory has no index.html; the web app will not load"
        );
    }

    let evaluator = JsonnetEvaluator::default().with_timeout(config.eval_timeout());
    let state = AppState::new(Arc::new(store), Arc::new(evaluator), config.eval_timeout());
    let app = build_router(state, &config.static_dir);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "HTTP server started");

    serve(listener, app, shutdown_signal(), config.shutdown_grace()).await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Serve `app` until `shutdown` resolves, then give in-flight requests
/// `grace` to finish before returning
pub async fn serve<S>(
    listener: TcpListener,
    app: Router,
    shutdown: S,
    grace: Duration,
) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (stopping_tx, mut stopping_rx) = watch::channel(false);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown.await;
        tracing::info!("shutting down HTTP server");
        let _ = stopping_tx.send(true);
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")?.context("server error")?;
        }
        _ = async {
            let stopping = stopping_rx.wait_for(|stopping| *stopping).await.is_ok();
            if stopping {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::warn!(grace_secs = grace.as_secs(), "grace period elapsed; dropping open connections");
            server.abort();
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "got signal, shutting down"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "got signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_serve_returns_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let app = Router::new().route("/", get(|| async { "ok" }));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(serve(
            listener,
            app,
            async move {
                let _ = rx.await;
            },
            Duration::from_secs(5),
        ));
        tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
