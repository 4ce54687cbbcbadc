//! The SSH half of the crate: connection, authentication, watched
//! command execution and privilege escalation.

pub mod auth;
pub mod handler;
pub mod runner;
pub mod session;
pub mod sudo;
pub mod watcher;

pub use auth::AuthMethod;
pub use handler::HostKeyPolicy;
pub use runner::{CommandOutput, RunOptions};
pub use session::{RemoteEntry, Session};
pub use sudo::SudoOptions;
pub use watcher::{scan_stream, ScanOutcome, Watcher};
