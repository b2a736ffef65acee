//! Record API for contractions and hospitals.
//!
//! [`RecordService`] holds the validation and persistence rules;
//! [`routes::router`] exposes them over HTTP under `/api`.

pub mod routes;
mod service;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

pub use routes::router;
pub use service::RecordService;

/// Open the configured database and serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the address cannot
/// be bound.
pub async fn serve(config: &Config) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let service = RecordService::new(storage, config.validation.end_before_start);

    let listener = TcpListener::bind(config.bind_address()).await?;
    serve_on(listener, service, shutdown_signal()).await
}

/// Serve the API on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve_on(
    listener: TcpListener,
    service: RecordService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    info!("Server is running on {}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    // If the handler cannot be installed the server simply runs until killed.
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
