use crate::events::SessionEvent;
use crate::log_info;
use anyhow::Result;
use camrelay_core::Command;
use camrelay_transport::connect_ws;
use futures_util::SinkExt;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::tungstenite::Message;

/// One-shot relay client: connect, send a single command line, close.
pub async fn send_command(
    host: &str,
    port: u16,
    command: &Command,
    event_tx: &Sender<SessionEvent>,
) -> Result<()> {
    let mut ws = connect_ws(host, port).await?;
    ws.send(Message::Text(command.to_string())).await?;
    ws.close(None).await?;
    log_info!(event_tx, "Sent '{}' to {}:{}", command, host, port);
    Ok(())
}
