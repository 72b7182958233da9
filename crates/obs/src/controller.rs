use crate::client::ObsClient;
use crate::error::{ObsError, Result};
use crate::files::RecordingStore;
use async_trait::async_trait;
use camrelay_core::ObsConnection;
use std::path::{Path, PathBuf};

/// What a recorder looks like to the relay session layer. `ObsController`
/// is the production implementation; tests drive the relay against stubs.
#[async_trait]
pub trait RecordingControl: Send {
    /// Points the next take at a fresh session folder named `name`.
    async fn set_recording_name(&mut self, name: &str) -> Result<()>;
    async fn start_recording(&mut self) -> Result<()>;
    async fn stop_recording(&mut self) -> Result<()>;
    /// Folder holding the most recent finished take, if any.
    fn last_session_folder(&self) -> Option<PathBuf>;
    async fn shutdown(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    Idle,
    Recording,
    Saving,
}

impl std::fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderStatus::Idle => write!(f, "idle"),
            RecorderStatus::Recording => write!(f, "recording"),
            RecorderStatus::Saving => write!(f, "saving"),
        }
    }
}

/// Stateful facade over the OBS session plus recording file management.
/// Guards every operation with the recorder status so a stray `Stop` with
/// nothing running, or a `Start` mid-take, fails instead of confusing OBS.
pub struct ObsController {
    client: ObsClient,
    store: RecordingStore,
    status: RecorderStatus,
}

impl ObsController {
    pub async fn connect(cfg: &ObsConnection) -> Result<Self> {
        let client = ObsClient::connect(cfg).await?;
        Ok(Self {
            client,
            store: RecordingStore::new(),
            status: RecorderStatus::Idle,
        })
    }

    pub fn status(&self) -> RecorderStatus {
        self.status
    }

    pub async fn set_buffer_folder(&mut self, path: &Path) -> Result<()> {
        self.store.set_buffer_folder(path).await
    }

    pub async fn set_save_location(&mut self, root: &Path, name: &str) -> Result<PathBuf> {
        match self.status {
            RecorderStatus::Idle => self.store.prepare_session(root, name).await,
            RecorderStatus::Recording => Err(ObsError::AlreadyRecording),
            RecorderStatus::Saving => Err(ObsError::Saving),
        }
    }

    pub async fn start_recording(&mut self) -> Result<()> {
        if self.status != RecorderStatus::Idle {
            return Err(ObsError::AlreadyRecording);
        }
        self.client.start_record().await?;
        self.status = RecorderStatus::Recording;
        tracing::info!("Recording started");
        Ok(())
    }

    /// Stops the take and drains the buffer folder into the session folder.
    pub async fn stop_recording(&mut self) -> Result<()> {
        if self.status != RecorderStatus::Recording {
            return Err(ObsError::NotRecording);
        }
        let output = self.client.stop_record().await?;
        if let Some(path) = output {
            tracing::debug!("OBS main output finished at {}", path);
        }
        self.status = RecorderStatus::Saving;
        let result = self.store.collect().await;
        self.status = RecorderStatus::Idle;
        let collected = result?;
        tracing::info!("Recording stopped; {} file(s) collected", collected.len());
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.client.close().await
    }
}

#[async_trait]
impl RecordingControl for ObsController {
    async fn set_recording_name(&mut self, name: &str) -> Result<()> {
        let root = self
            .store
            .save_root()
            .ok_or(ObsError::NoSaveRoot)?
            .to_path_buf();
        self.set_save_location(&root, name).await.map(|_| ())
    }

    async fn start_recording(&mut self) -> Result<()> {
        ObsController::start_recording(self).await
    }

    async fn stop_recording(&mut self) -> Result<()> {
        ObsController::stop_recording(self).await
    }

    fn last_session_folder(&self) -> Option<PathBuf> {
        self.store.session_folder().map(Path::to_path_buf)
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock_obs;

    async fn connected() -> (ObsController, tokio::task::JoinHandle<Vec<String>>) {
        let (addr, server) = mock_obs::spawn(None).await;
        let cfg = ObsConnection {
            obs_host: addr.ip().to_string(),
            obs_port: addr.port(),
            obs_password: None,
        };
        (ObsController::connect(&cfg).await.unwrap(), server)
    }

    #[tokio::test]
    async fn start_stop_collects_one_take_into_the_save_folder() {
        let buffer = tempfile::tempdir().unwrap();
        let save = tempfile::tempdir().unwrap();
        let (mut controller, server) = connected().await;

        controller.set_buffer_folder(buffer.path()).await.unwrap();
        let session = controller.set_save_location(save.path(), "TEST6").await.unwrap();

        controller.start_recording().await.unwrap();
        // the Source Record plugin writing into the buffer during the take
        tokio::fs::write(buffer.path().join("cam1.mkv"), b"footage").await.unwrap();
        controller.stop_recording().await.unwrap();

        let moved = session.join("TEST6_cam1.mkv");
        assert!(tokio::fs::try_exists(&moved).await.unwrap());
        assert_eq!(controller.last_session_folder(), Some(session));
        assert_eq!(controller.status(), RecorderStatus::Idle);

        controller.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn status_guards_reject_out_of_order_commands() {
        let buffer = tempfile::tempdir().unwrap();
        let save = tempfile::tempdir().unwrap();
        let (mut controller, _server) = connected().await;

        controller.set_buffer_folder(buffer.path()).await.unwrap();
        controller.set_save_location(save.path(), "TEST6").await.unwrap();

        assert!(matches!(
            controller.stop_recording().await,
            Err(ObsError::NotRecording)
        ));

        controller.start_recording().await.unwrap();
        assert!(matches!(
            controller.start_recording().await,
            Err(ObsError::AlreadyRecording)
        ));
        assert!(matches!(
            controller.set_save_location(save.path(), "OTHER").await,
            Err(ObsError::AlreadyRecording)
        ));
    }

    #[tokio::test]
    async fn set_recording_name_requires_a_prior_save_location() {
        let (mut controller, _server) = connected().await;
        assert!(matches!(
            controller.set_recording_name("TEST6").await,
            Err(ObsError::NoSaveRoot)
        ));
    }
}
