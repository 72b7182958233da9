use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObsError>;

#[derive(Debug, Error)]
pub enum ObsError {
    #[error("Failed to connect to OBS at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("OBS WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("OBS closed the connection")]
    ConnectionClosed,

    #[error("OBS requires authentication but no password is configured")]
    PasswordRequired,

    #[error("OBS rejected the configured password")]
    AuthRejected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{request_type} failed (code {code}): {comment}")]
    RequestFailed {
        request_type: String,
        code: u16,
        comment: String,
    },

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("Recorder is busy saving files")]
    Saving,

    #[error("No save folder configured; set a save location first")]
    NoSaveRoot,

    #[error("No buffer folder configured")]
    NoBufferFolder,

    #[error("No recording session folder exists yet")]
    NoSessionFolder,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
