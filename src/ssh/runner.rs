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

//! Watched command execution over a PTY channel.

use std::time::Duration;

use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty};

use crate::error::{Error, Result};

use super::session::Session;
use super::watcher::{PromptScanner, Watcher};

/// Terminal type requested for the remote PTY.
const TERM: &str = "xterm";
/// Fixed PTY geometry; no window-change handling.
const PTY_COLS: u32 = 80;
const PTY_ROWS: u32 = 40;
/// Nominal line speed, high enough not to throttle output.
const PTY_BAUD: u32 = 144_000;

/// Options for a single [`Session::run_with_options`] call.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Prompt watchers evaluated against the command's output.
    pub watchers: Vec<Watcher>,
    /// Bounded wait for the whole command. On expiry the channel is
    /// torn down and the session should be discarded.
    pub timeout: Option<Duration>,
}

/// Captured output of a finished (or failed) remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Everything the drain task brings back across the join barrier.
struct DrainedChannel {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
    write_error: Option<russh::Error>,
}

/// PTY modes for non-interactive automation: echo off so injected
/// responses never appear in the captured output.
fn pty_modes() -> Vec<(Pty, u32)> {
    vec![
        (Pty::ECHO, 0),
        (Pty::TTY_OP_ISPEED, PTY_BAUD),
        (Pty::TTY_OP_OSPEED, PTY_BAUD),
    ]
}

/// Widen PATH so commands resolve in the non-login shell sshd spawns.
fn with_path_prefix(command: &str) -> String {
    format!("PATH=$PATH:/usr/bin:/usr/sbin {command}")
}

impl Session {
    /// Execute a remote command, returning its combined captured
    /// output once it has exited and its output is fully drained.
    pub async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.run_with_options(command, RunOptions::default()).await
    }

    /// Execute a remote command with prompt watchers and an optional
    /// time limit.
    ///
    /// The command runs under a PTY with echo disabled; stdout is
    /// streamed through the watchers byte by byte while stderr is
    /// captured directly. The call returns only after the channel is
    /// fully drained, so the output is complete even when the command
    /// exits before the last bytes are read.
    ///
    /// A non-zero exit status is reported as
    /// [`Error::CommandFailed`] carrying the captured output.
    pub async fn run_with_options(
        &self,
        command: &str,
        options: RunOptions,
    ) -> Result<CommandOutput> {
        let full_command = with_path_prefix(command);
        tracing::debug!(host = %self.host(), command, watchers = options.watchers.len(),
            "executing remote command");

        let channel = self.open_exec_channel(&full_command).await?;

        let mut drain = tokio::spawn(drain_channel(channel, options.watchers));
        let drained = if let Some(limit) = options.timeout {
            match tokio::time::timeout(limit, &mut drain).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Dropping the channel inside the aborted task
                    // closes it and unblocks the remote side.
                    drain.abort();
                    return Err(Error::CommandTimeout {
                        host: self.host().to_string(),
                        command: command.to_string(),
                        timeout: limit,
                    });
                }
            }
        } else {
            drain.await
        }
        .map_err(|e| Error::Drain {
            host: self.host().to_string(),
            source: e,
        })?;

        let output = CommandOutput {
            stdout: drained.stdout,
            stderr: drained.stderr,
        };

        if let Some(source) = drained.write_error {
            return Err(Error::ResponseWrite {
                host: self.host().to_string(),
                source,
                output,
            });
        }

        match drained.exit_status {
            Some(0) => Ok(output),
            Some(exit_status) => Err(Error::CommandFailed {
                host: self.host().to_string(),
                command: command.to_string(),
                exit_status,
                output,
            }),
            None => Err(Error::NoExitStatus {
                host: self.host().to_string(),
                command: command.to_string(),
                output,
            }),
        }
    }

    /// Open a session channel, request the PTY and start the command.
    /// Each failure aborts before the command runs.
    async fn open_exec_channel(&self, full_command: &str) -> Result<Channel<Msg>> {
        let channel_err = |op: &'static str| {
            let host = self.host().to_string();
            move |e: russh::Error| Error::Channel {
                host,
                op,
                source: e,
            }
        };

        let channel = self
            .handle()
            .channel_open_session()
            .await
            .map_err(channel_err("open"))?;
        channel
            .request_pty(false, TERM, PTY_COLS, PTY_ROWS, 0, 0, &pty_modes())
            .await
            .map_err(channel_err("request pty"))?;
        channel
            .exec(true, full_command)
            .await
            .map_err(channel_err("exec"))?;
        Ok(channel)
    }
}

/// Drain a running command's channel: scan stdout through the
/// watchers, answer prompts on the same channel, capture stderr and
/// the exit status.
///
/// The exit-status message can arrive before trailing data, so the
/// loop keeps reading until the channel itself ends; that is the EOF
/// signal.
async fn drain_channel(mut channel: Channel<Msg>, watchers: Vec<Watcher>) -> DrainedChannel {
    let mut scanner = PromptScanner::new(watchers);
    let mut stderr = Vec::new();
    let mut exit_status = None;
    let mut write_error: Option<russh::Error> = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => {
                for &byte in data.iter() {
                    let Some(responses) = scanner.feed(byte) else {
                        continue;
                    };
                    for response in responses {
                        if write_error.is_some() {
                            continue;
                        }
                        if let Err(e) = channel.data(&response[..]).await {
                            tracing::warn!(error = %e, "failed to answer remote prompt");
                            write_error = Some(e);
                        }
                    }
                }
            }
            ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                stderr.extend_from_slice(data);
            }
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }

    DrainedChannel {
        stdout: scanner.into_output(),
        stderr,
        exit_status,
        write_error,
    }
}
