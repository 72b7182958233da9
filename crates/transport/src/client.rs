use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub async fn connect_ws(host: &str, port: u16) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let url = format!("ws://{}:{}", host, port);
    tracing::debug!("Connecting to WebSocket at {}", url);

    let (ws_stream, _) = connect_async(&url)
        .await
        .context(format!("Failed to connect to WebSocket at {}", url))?;

    // Command latency matters more than throughput here
    let res = match ws_stream.get_ref() {
        MaybeTlsStream::Plain(s) => s.set_nodelay(true),
        _ => Ok(()),
    };

    if let Err(e) = res {
        tracing::warn!("Failed to set TCP_NODELAY: {}", e);
    }

    tracing::info!("Connected to WebSocket successfully at {}", url);
    Ok(ws_stream)
}
