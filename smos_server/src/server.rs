//! Listener setup: binds the first free port in a configured range and
//! accepts connections until asked to shut down.

use crate::connection::handle_connection;
use smos_common::error::SmosError;
use smos_store::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct CoordinatorHandle {
    pub port: u16,
    pub store: Arc<Store>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl CoordinatorHandle {
    /// Stops accepting new connections. Existing connections are left to
    /// finish or disconnect on their own.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Binds the first available port in `[port_min, port_max)`, then accepts
/// connections in the background. Returns once bound, handing back the
/// chosen port so a caller can connect; call `CoordinatorHandle::shutdown`
/// to stop accepting new connections.
pub async fn run_coordinator(
    port_min: u16,
    port_max: u16,
    authkey: String,
) -> Result<CoordinatorHandle, SmosError> {
    let store = Arc::new(Store::new());
    let listener = bind_in_range(port_min, port_max).await?;
    let port = listener.local_addr().map_err(SmosError::Io)?.port();

    info!(port, "coordinator listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let accept_store = Arc::clone(&store);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let store = Arc::clone(&accept_store);
                            let authkey = authkey.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, store, authkey, peer).await;
                            });
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("coordinator shutting down");
                    break;
                }
            }
        }
    });

    Ok(CoordinatorHandle {
        port,
        store,
        shutdown: Some(shutdown_tx),
    })
}

async fn bind_in_range(port_min: u16, port_max: u16) -> Result<TcpListener, SmosError> {
    for port in port_min..port_max {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => return Err(SmosError::Io(e)),
        }
    }
    Err(SmosError::PortBusy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_within_requested_range() {
        let mut handle = run_coordinator(15000, 15100, "key".to_string()).await.unwrap();
        assert!(handle.port >= 15000 && handle.port < 15100);
        handle.shutdown();
    }
}
