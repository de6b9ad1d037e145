//! Accept loop and per-connection task, modeled after the original
//! thread-per-connection server: one `tokio::spawn`ed task per socket
//! instead of one detached pthread, with the same graceful-shutdown
//! behavior on SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::http::dispatch::{dispatch, AppState};
use crate::http::{framer, reply};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
const READ_CHUNK: usize = 4096;

/// Accepts connections until a shutdown signal arrives, then stops
/// accepting new work and returns once every spawned connection task has
/// had a chance to wind down.
pub async fn run(listener: TcpListener, state: Arc<AppState>) {
    info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "imgfs server listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        debug!(%peer, "accepted connection");
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            handle_connection(stream, state).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "accept() failed"),
                }
            }
            _ = shutdown_signal() => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    if timeout(CONNECTION_TIMEOUT, handle_connection_inner(&mut stream, &state)).await.is_err() {
        let _ = stream.write_all(&reply::bad_request()).await;
    }
}

/// Reads and dispatches every pipelined request on the connection, the
/// way the original kept reading off the same socket across keep-alive
/// rounds instead of opening a new connection per request.
async fn handle_connection_inner(stream: &mut TcpStream, state: &Arc<AppState>) {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match framer::parse(&buf) {
            Ok(Some((request, consumed))) => {
                let response = dispatch(state, &request);
                if stream.write_all(&response).await.is_err() {
                    return;
                }
                buf.drain(..consumed);
                continue;
            }
            Ok(None) => {}
            Err(_) => {
                let _ = stream.write_all(&reply::bad_request()).await;
                return;
            }
        }

        match stream.read(&mut chunk).await {
            Ok(0) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => return,
        }
    }
}
