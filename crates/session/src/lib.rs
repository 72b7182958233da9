pub mod client;
pub mod events;
pub mod logging;
pub mod receiver;
pub mod server;

pub use client::send_command;
pub use events::{LogLevel, SessionEvent};
pub use receiver::run_receiver_session;
pub use server::run_relay_session;
