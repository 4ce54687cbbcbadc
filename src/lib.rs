//! Expect-style SSH automation for Rust with the tokio runtime,
//! powered by the rust ssh implementation russh.
//!
//! The heart of this crate is [`Session`]. Use it for connection,
//! authentication, command execution and file transfer.
//!
//! # Features
//! * Connect to an SSH host with password and/or private-key auth
//! * Execute commands under a PTY while [`Watcher`]s answer
//!   interactive prompts (password prompts, confirmations) on the fly
//! * Run commands as another user via sudo with the escalation prompt
//!   answered automatically
//! * Replicate a local file or directory tree onto the remote host
//!   over SFTP
//!
//! A session is intended for single-owner sequential use: do not issue
//! concurrent `run`/`copy` calls against one session. Open one session
//! per concurrent unit of work instead.

pub mod error;
pub mod options;
pub mod ssh;
pub mod transfer;

pub use error::{Error, PrecheckError, Result};
pub use options::ConnectOptions;
pub use ssh::{
    scan_stream, AuthMethod, CommandOutput, HostKeyPolicy, RemoteEntry, RunOptions, ScanOutcome,
    Session, SudoOptions, Watcher,
};
