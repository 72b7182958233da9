pub mod client;
pub mod server;

pub use client::*;
pub use server::*;
