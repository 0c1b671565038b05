//! Process lifecycle of the HTTP server.

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::api::{router, AppState};
use crate::config::Config;
use crate::storage::Storage;
use crate::uploads::ImageStore;

/// Open storage and uploads, bind, and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the database or uploads directory cannot be opened,
/// the address cannot be bound, or the server fails.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let database_path = config.database_path();
    let storage = Storage::open(&database_path)
        .with_context(|| format!("opening database {}", database_path.display()))?;

    let uploads_dir = config.uploads_dir();
    let images = ImageStore::open(&uploads_dir)
        .with_context(|| format!("preparing uploads directory {}", uploads_dir.display()))?;

    let state = AppState::new(storage, images, config);
    let app = router(state, config)?;

    let address = config.bind_address()?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
