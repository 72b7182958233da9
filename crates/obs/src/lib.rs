pub mod auth;
pub mod client;
pub mod controller;
pub mod error;
pub mod files;

pub use client::ObsClient;
pub use controller::{ObsController, RecorderStatus, RecordingControl};
pub use error::{ObsError, Result};
pub use files::RecordingStore;
