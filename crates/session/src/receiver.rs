use crate::events::SessionEvent;
use crate::{log_debug, log_error, log_info};
use anyhow::{Context, Result};
use camrelay_core::transfer::receive_file;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc::Sender;

/// File receiver: raw TCP, one file per connection, written into
/// `output_folder`. Runs as its own process on the machine collecting
/// recordings; the relay only ever connects out to it.
pub async fn run_receiver_session(
    listener: TcpListener,
    output_folder: PathBuf,
    event_tx: Sender<SessionEvent>,
) -> Result<()> {
    tokio::fs::create_dir_all(&output_folder)
        .await
        .with_context(|| format!("Failed to create {}", output_folder.display()))?;

    let local_addr = listener.local_addr()?;
    log_info!(&event_tx, "Receiver listening on {}, saving into {}", local_addr, output_folder.display());
    let _ = event_tx.send(SessionEvent::Listening(local_addr.to_string())).await;

    loop {
        let (mut stream, addr) = listener.accept().await.context("Receiver accept failed")?;
        log_debug!(&event_tx, "Incoming transfer from {}", addr);

        let output_folder = output_folder.clone();
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            match receive_file(&mut stream, &output_folder).await {
                Ok(path) => {
                    log_info!(&event_tx, "Received {}", path.display());
                    let _ = event_tx.send(SessionEvent::FileReceived(path.display().to_string())).await;
                }
                Err(e) => {
                    log_error!(&event_tx, "Transfer from {} failed: {:#}", addr, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrelay_core::transfer::send_file;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;

    async fn wait_for(path: &std::path::Path) -> bool {
        for _ in 0..100 {
            if tokio::fs::try_exists(path).await.unwrap() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn accepts_files_from_multiple_connections() {
        let output = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (event_tx, _) = mpsc::channel(64);
        tokio::spawn(run_receiver_session(
            listener,
            output.path().to_path_buf(),
            event_tx,
        ));

        for name in ["cam1.mkv", "cam2.mkv"] {
            let path = source.path().join(name);
            tokio::fs::write(&path, name.as_bytes()).await.unwrap();
            let mut stream = TcpStream::connect(addr).await.unwrap();
            send_file(&mut stream, &path).await.unwrap();
            stream.shutdown().await.unwrap();
        }

        for name in ["cam1.mkv", "cam2.mkv"] {
            let target = output.path().join(name);
            assert!(wait_for(&target).await, "{} never arrived", name);
            assert_eq!(tokio::fs::read(&target).await.unwrap(), name.as_bytes());
        }
    }

    #[tokio::test]
    async fn a_bad_transfer_does_not_stop_the_receiver() {
        let output = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (event_tx, _) = mpsc::channel(64);
        tokio::spawn(run_receiver_session(
            listener,
            output.path().to_path_buf(),
            event_tx,
        ));

        // garbage header, then a clean transfer on a fresh connection
        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"garbage").await.unwrap();
        bad.shutdown().await.unwrap();
        drop(bad);

        let path = source.path().join("cam1.mkv");
        tokio::fs::write(&path, b"footage").await.unwrap();
        let mut stream = TcpStream::connect(addr).await.unwrap();
        send_file(&mut stream, &path).await.unwrap();
        stream.shutdown().await.unwrap();

        let target = output.path().join("cam1.mkv");
        assert!(wait_for(&target).await);
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"footage");
    }
}
