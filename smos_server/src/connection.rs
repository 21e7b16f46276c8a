//! Per-connection handshake and RPC dispatch loop.

use crate::codec::{CodecError, read_frame, write_frame};
use crate::rpc::dispatch;
use smos_common::status::StatusCode;
use smos_common::wire::{Handshake, HandshakeAck, Request, Response, WireError};
use smos_store::Store;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Authenticates and services one client connection until it disconnects,
/// sends a malformed frame, or the dispatched call hits an invariant
/// violation. An invariant violation closes only this connection: it is
/// caught here with `catch_unwind` rather than allowed to take down the
/// whole coordinator process.
pub async fn handle_connection(
    mut stream: TcpStream,
    store: Arc<Store>,
    authkey: String,
    peer: std::net::SocketAddr,
) {
    let handshake: Handshake = match read_frame(&mut stream).await {
        Ok(h) => h,
        Err(e) => {
            warn!(%peer, error = %e, "handshake read failed");
            return;
        }
    };

    if handshake.authkey != authkey {
        warn!(%peer, "rejected connection with bad authkey");
        let _ = write_frame(&mut stream, &HandshakeAck { accepted: false }).await;
        return;
    }
    if write_frame(&mut stream, &HandshakeAck { accepted: true })
        .await
        .is_err()
    {
        return;
    }

    info!(%peer, "client authenticated");

    loop {
        let request: Request = match read_frame(&mut stream).await {
            Ok(r) => r,
            Err(CodecError::Closed) => {
                info!(%peer, "client disconnected");
                return;
            }
            Err(e) => {
                warn!(%peer, error = %e, "malformed request frame, closing connection");
                return;
            }
        };

        let store_ref = &store;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| dispatch(store_ref, request)));

        let (response, is_fatal) = match outcome {
            Ok(response) => (response, false),
            Err(panic) => {
                let message = panic_message(&panic);
                warn!(%peer, %message, "invariant violation, closing connection");
                (
                    Response::Err(WireError {
                        status: StatusCode::Fail,
                        message,
                    }),
                    true,
                )
            }
        };

        if write_frame(&mut stream, &response).await.is_err() {
            warn!(%peer, "failed to send response, closing connection");
            return;
        }

        if is_fatal {
            return;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
