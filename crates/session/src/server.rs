use crate::events::SessionEvent;
use crate::{log_debug, log_error, log_info, log_warn};
use anyhow::{bail, Context, Result};
use camrelay_core::{transfer::send_file, Command};
use camrelay_obs::RecordingControl;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::StreamExt;

/// Relay accept loop: each WebSocket connection carries plaintext command
/// lines that get dispatched against the shared recorder. Runs until a
/// `Kill` command arrives; every other failure is logged and served past.
pub async fn run_relay_session<C>(
    listener: TcpListener,
    controller: Arc<Mutex<C>>,
    event_tx: Sender<SessionEvent>,
) -> Result<()>
where
    C: RecordingControl + 'static,
{
    let local_addr = listener.local_addr()?;
    log_info!(&event_tx, "Relay listening on {}", local_addr);
    let _ = event_tx.send(SessionEvent::Listening(local_addr.to_string())).await;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted.context("Relay accept failed")?;
                log_debug!(&event_tx, "New incoming TCP connection from {}", addr);

                let controller = controller.clone();
                let shutdown_tx = shutdown_tx.clone();
                let event_tx_conn = event_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        handle_connection(stream, addr, controller, shutdown_tx, event_tx_conn.clone()).await
                    {
                        log_error!(&event_tx_conn, "Connection error with {}: {:#}", addr, e);
                    }
                });
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    log_info!(&event_tx, "Relay server stopped.");
    let _ = event_tx.send(SessionEvent::ShuttingDown).await;
    Ok(())
}

async fn handle_connection<C>(
    stream: TcpStream,
    addr: SocketAddr,
    controller: Arc<Mutex<C>>,
    shutdown_tx: mpsc::Sender<()>,
    event_tx: Sender<SessionEvent>,
) -> Result<()>
where
    C: RecordingControl + 'static,
{
    let mut ws = accept_async(stream).await.context("WebSocket handshake failed")?;
    let _ = event_tx.send(SessionEvent::Connected(addr.to_string())).await;

    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(line)) => match Command::parse(&line) {
                Ok(Command::Kill) => {
                    log_info!(&event_tx, "Received 'Kill' from {}; shutting down", addr);
                    if let Err(e) = controller.lock().await.shutdown().await {
                        log_error!(&event_tx, "Recorder shutdown failed: {}", e);
                    }
                    let _ = ws.close(None).await;
                    let _ = shutdown_tx.send(()).await;
                    return Ok(());
                }
                Ok(command) => dispatch(command, &controller, &event_tx).await,
                Err(e) => {
                    log_warn!(&event_tx, "Ignoring malformed command {:?}: {}", line, e);
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // pings and stray binary frames
            Err(e) => {
                log_error!(&event_tx, "WebSocket read error from {}: {}", addr, e);
                break;
            }
        }
    }

    let _ = event_tx.send(SessionEvent::Disconnected).await;
    Ok(())
}

/// Runs one already-parsed command against the recorder. Failures are logged
/// and swallowed so the relay keeps serving; the wire protocol carries no
/// error replies back to the remote operator.
async fn dispatch<C>(command: Command, controller: &Arc<Mutex<C>>, event_tx: &Sender<SessionEvent>)
where
    C: RecordingControl + 'static,
{
    let wire = command.to_string();
    log_info!(event_tx, "Received '{}'", wire);

    let result: Result<()> = match command {
        Command::SetName(name) => controller
            .lock()
            .await
            .set_recording_name(&name)
            .await
            .map_err(Into::into),
        Command::Start => controller.lock().await.start_recording().await.map_err(Into::into),
        Command::Stop => controller.lock().await.stop_recording().await.map_err(Into::into),
        Command::SendFilePrevious { host, port } => {
            send_previous(controller, &host, port, event_tx).await
        }
        // handled by the caller before dispatch
        Command::Kill => Ok(()),
    };

    match result {
        Ok(()) => {
            let _ = event_tx.send(SessionEvent::Dispatched(wire)).await;
        }
        Err(e) => {
            log_error!(event_tx, "Command '{}' failed: {:#}", wire, e);
        }
    }
}

/// Ships every file of the last finished session to `host:port`, one raw TCP
/// connection per file.
async fn send_previous<C>(
    controller: &Arc<Mutex<C>>,
    host: &str,
    port: u16,
    event_tx: &Sender<SessionEvent>,
) -> Result<()>
where
    C: RecordingControl + 'static,
{
    let folder = controller.lock().await.last_session_folder();
    let Some(folder) = folder else {
        bail!("no previous recording session");
    };
    if !tokio::fs::try_exists(&folder).await? {
        bail!("previous session folder {} no longer exists", folder.display());
    }

    let mut sent = 0usize;
    let mut entries = tokio::fs::read_dir(&folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let mut stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to reach receiver at {}:{}", host, port))?;
        send_file(&mut stream, &path).await?;
        stream.shutdown().await?;
        log_info!(event_tx, "Sent {} to {}:{}", path.display(), host, port);
        sent += 1;
    }
    if sent == 0 {
        log_warn!(event_tx, "Previous session folder {} holds no files", folder.display());
    }
    Ok(())
}
