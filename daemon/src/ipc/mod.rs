//! IPC module for daemon-window communication

mod handlers;
mod protocol;
mod server;

pub use handlers::Handlers;
pub use server::Server;
