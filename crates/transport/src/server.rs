use anyhow::{Context, Result};
use tokio::net::{TcpListener, ToSocketAddrs};

/// Binds the TCP listener a WebSocket accept loop runs on. Callers perform
/// the WebSocket handshake per connection with `tokio_tungstenite::accept_async`.
pub async fn make_ws_listener<A: ToSocketAddrs + std::fmt::Debug>(bind_addr: A) -> Result<TcpListener> {
    let listener = TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind listener to {:?}", bind_addr))?;
    tracing::info!("Listener bound on {}", listener.local_addr()?);
    Ok(listener)
}
