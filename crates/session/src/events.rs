#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Progress reporting for embedders (CLI today, a control UI later). Every
/// session function takes a channel of these alongside its tracing output.
#[derive(Debug, Clone, serde::Serialize)]
pub enum SessionEvent {
    Log { level: LogLevel, message: String },
    Listening(String),        // bound address
    Connected(String),        // remote address
    Dispatched(String),       // command wire string
    FileReceived(String),     // path written
    Disconnected,
    ShuttingDown,
    Error(String),
}
