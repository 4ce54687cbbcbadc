// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Crate-wide error types.
//!
//! Every public operation returns an explicit [`Result`]; nothing in
//! this crate aborts the caller's process. Errors carry the host,
//! command or path needed to diagnose a failure without re-deriving
//! it, and command errors keep the output captured up to the failure.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ssh::runner::CommandOutput;

/// A result type using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Neither a password nor a usable private key was supplied.
    #[error("no usable credential for {user}@{host}: supply a password or a private key")]
    NoCredential { host: String, user: String },

    /// The server rejected every offered authentication method.
    #[error("authentication failed for {user}@{host}")]
    AuthenticationFailed { host: String, user: String },

    /// A private key could not be read or parsed.
    #[error("cannot load private key {key}: {source}")]
    KeyInvalid {
        key: String,
        #[source]
        source: russh::keys::Error,
    },

    /// The host name did not resolve to any address.
    #[error("cannot resolve {addr}: {source}")]
    AddressResolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Transport-level connect failure.
    #[error("connecting to {addr} failed: {source}")]
    Dial {
        addr: String,
        #[source]
        source: russh::Error,
    },

    /// Dial, authentication and SFTP bring-up did not finish in time.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The server's host key failed the configured trust policy.
    #[error("host key verification failed for {host}: {reason}")]
    HostKeyVerification { host: String, reason: String },

    /// Opening a channel, requesting a PTY or starting an exec failed
    /// on an otherwise live connection. The command did not run.
    #[error("ssh channel on {host} failed during {op}: {source}")]
    Channel {
        host: String,
        op: &'static str,
        #[source]
        source: russh::Error,
    },

    /// An SFTP request failed.
    #[error("sftp {op} on {host} failed: {source}")]
    Sftp {
        host: String,
        op: &'static str,
        #[source]
        source: russh_sftp::client::error::Error,
    },

    /// The remote command ran and exited non-zero. The output captured
    /// up to that point is preserved.
    #[error("remote command `{command}` on {host} exited with status {exit_status}")]
    CommandFailed {
        host: String,
        command: String,
        exit_status: u32,
        output: CommandOutput,
    },

    /// The channel closed without the server reporting an exit status.
    #[error("remote command `{command}` on {host} closed without reporting an exit status")]
    NoExitStatus {
        host: String,
        command: String,
        output: CommandOutput,
    },

    /// Writing a watcher response to the remote stdin failed, e.g. the
    /// remote process closed its input before the answer was sent.
    #[error("writing a watcher response to {host} failed: {source}")]
    ResponseWrite {
        host: String,
        #[source]
        source: russh::Error,
        output: CommandOutput,
    },

    /// The command did not finish within the requested limit. The
    /// channel was torn down; the session should be discarded.
    #[error("remote command `{command}` on {host} did not finish within {timeout:?}")]
    CommandTimeout {
        host: String,
        command: String,
        timeout: Duration,
    },

    /// A transfer did not finish within the requested limit.
    #[error("transfer to {host} timed out after {timeout:?}")]
    TransferTimeout { host: String, timeout: Duration },

    /// The output drain task ended abnormally.
    #[error("output drain for {host} failed: {source}")]
    Drain {
        host: String,
        #[source]
        source: tokio::task::JoinError,
    },

    /// The source/destination pair is not a supported transfer shape.
    /// Raised before any remote mutation.
    #[error(transparent)]
    Precheck(#[from] PrecheckError),

    /// Creating a remote directory failed mid-transfer.
    #[error("cannot create remote directory {path}: {source}")]
    RemoteMkdir {
        path: String,
        #[source]
        source: russh_sftp::client::error::Error,
    },

    /// Writing a remote file failed mid-transfer.
    #[error("cannot write remote file {path}: {source}")]
    RemoteWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A local file or directory could not be read.
    #[error("cannot read local path {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Connection options failed validation.
    #[error("invalid {field}: {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },

    /// Protocol-level error reported by the SSH library.
    #[error("ssh protocol error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Unsupported transfer shapes, detected before any byte moves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrecheckError {
    #[error("transfer source path is empty")]
    EmptySource,

    #[error("transfer destination path is empty")]
    EmptyDestination,

    #[error("source {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("destination {0} is an existing file, cannot copy a directory onto it")]
    DestinationIsFile(String),

    #[error("destination {0} is already occupied by a non-directory entry")]
    DestinationConflict(String),
}
