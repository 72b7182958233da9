use crate::error::{ObsError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MOVE_RETRIES: u32 = 6;
const MOVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Tracks where the Source Record plugin buffers per-camera files and where
/// finished sessions get filed. Sessions live under
/// `<save root>/<YYYY-MM-DD>/<name>/<n>`, `n` counting up from 1 per day and
/// name.
#[derive(Debug, Default)]
pub struct RecordingStore {
    buffer_folder: Option<PathBuf>,
    save_root: Option<PathBuf>,
    session_name: Option<String>,
    session_folder: Option<PathBuf>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers and creates the plugin's buffer directory. Bookkeeping only;
    /// OBS itself is configured out of band to write here.
    pub async fn set_buffer_folder(&mut self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        tracing::info!("Buffer folder set to {}", path.display());
        self.buffer_folder = Some(path.to_path_buf());
        Ok(())
    }

    pub fn buffer_folder(&self) -> Option<&Path> {
        self.buffer_folder.as_deref()
    }

    pub fn save_root(&self) -> Option<&Path> {
        self.save_root.as_deref()
    }

    pub fn session_folder(&self) -> Option<&Path> {
        self.session_folder.as_deref()
    }

    /// Creates the next session folder for `name` under `root` and makes it
    /// the destination for the coming take.
    pub async fn prepare_session(&mut self, root: &Path, name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(root).await?;

        let date_folder = root.join(chrono::Local::now().format("%Y-%m-%d").to_string());
        let base = date_folder.join(name);

        let mut take = 1u32;
        while tokio::fs::try_exists(base.join(take.to_string())).await? {
            take += 1;
        }
        let session = base.join(take.to_string());
        tokio::fs::create_dir_all(&session).await?;
        tracing::info!("Save folder set to {}", session.display());

        self.save_root = Some(root.to_path_buf());
        self.session_name = Some(name.to_string());
        self.session_folder = Some(session.clone());
        Ok(session)
    }

    /// Drains the buffer folder into the current session folder, prefixing
    /// each file with the session name. OBS may still be flushing a file
    /// when we get here, so each move is retried a few times.
    pub async fn collect(&self) -> Result<Vec<PathBuf>> {
        let buffer = self.buffer_folder.as_deref().ok_or(ObsError::NoBufferFolder)?;
        let session = self.session_folder.as_deref().ok_or(ObsError::NoSessionFolder)?;
        let name = self.session_name.as_deref().unwrap_or("Recording");

        let mut collected = Vec::new();
        let mut entries = tokio::fs::read_dir(buffer).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let source = entry.path();
            let file_name = entry.file_name();
            let target = session.join(format!("{}_{}", name, file_name.to_string_lossy()));
            move_file_with_retries(&source, &target).await?;
            tracing::info!("Moved {} to {}", file_name.to_string_lossy(), target.display());
            collected.push(target);
        }
        Ok(collected)
    }

    /// Files of the most recent finished session, for shipping to a receiver.
    pub async fn session_files(&self) -> Result<Vec<PathBuf>> {
        let session = self.session_folder.as_deref().ok_or(ObsError::NoSessionFolder)?;
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(session).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

async fn move_file_with_retries(source: &Path, target: &Path) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match move_file(source, target).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < MOVE_RETRIES => {
                tracing::warn!(
                    "Moving {} failed ({}); retrying in {:?}",
                    source.display(),
                    e,
                    MOVE_RETRY_DELAY
                );
                tokio::time::sleep(MOVE_RETRY_DELAY).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn move_file(source: &Path, target: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(source, target).await {
        Ok(()) => Ok(()),
        // rename cannot cross filesystems; fall back to copy + delete
        Err(_) => {
            tokio::fs::copy(source, target).await?;
            tokio::fs::remove_file(source).await
        }
    }
}
