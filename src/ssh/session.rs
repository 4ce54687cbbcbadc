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

//! The authenticated session: connection establishment and the remote
//! file-system primitives consumed by the transfer code.

use std::fmt::Debug;
use std::io;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;

use russh::client::{Config, Handle};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::options::ConnectOptions;

use super::auth;
use super::handler::{HostKeyPolicy, SessionHandler};

/// An authenticated connection to one remote host exposing command
/// execution and file-transfer primitives.
///
/// A session is either fully connected (command and SFTP handles both
/// live) or [`connect`](Session::connect) fails; no partially
/// initialized session is ever returned. Sessions are not reconnected
/// automatically and are meant for single-owner sequential use.
pub struct Session {
    handle: Handle<SessionHandler>,
    sftp: SftpSession,
    host: String,
    port: u16,
    username: String,
    password: Option<Zeroizing<String>>,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
}

impl Session {
    /// Connect with the permissive [`HostKeyPolicy::AcceptAll`]
    /// policy, matching classic automation tooling. Prefer
    /// [`connect_with_policy`](Session::connect_with_policy) with a
    /// pinned key or known-hosts check where the environment allows.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        Self::connect_with_policy(options, HostKeyPolicy::AcceptAll).await
    }

    /// Connect with an explicit host-key trust policy.
    ///
    /// Dial, authentication and SFTP bring-up are all bounded by
    /// `options.timeout`. Authentication candidates are offered in
    /// preference order: password first when supplied, then the
    /// private key.
    pub async fn connect_with_policy(
        mut options: ConnectOptions,
        policy: HostKeyPolicy,
    ) -> Result<Self> {
        options.apply_defaults();
        options.validate()?;

        let addr = options.address();
        let timeout = options.timeout;
        match tokio::time::timeout(timeout, Self::establish(options, policy)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectTimeout { addr, timeout }),
        }
    }

    async fn establish(options: ConnectOptions, policy: HostKeyPolicy) -> Result<Self> {
        let methods = auth::candidates(&options)?;
        let addr = options.address();
        let config = Arc::new(Config::default());

        // Connection code inspired from std::net::TcpStream::connect
        // and std::net::each_addr: try every resolved address until
        // one connects.
        let socket_addrs = (options.host.as_str(), options.port)
            .to_socket_addrs()
            .map_err(|e| Error::AddressResolve {
                addr: addr.clone(),
                source: e,
            })?;
        let mut connect_res = Err(Error::AddressResolve {
            addr: addr.clone(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "could not resolve to any addresses",
            ),
        });
        for socket_addr in socket_addrs {
            let handler =
                SessionHandler::new(options.host.clone(), options.port, policy.clone());
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(handle) => {
                    connect_res = Ok(handle);
                    break;
                }
                Err(Error::Ssh(e)) => {
                    connect_res = Err(Error::Dial {
                        addr: addr.clone(),
                        source: e,
                    })
                }
                Err(other) => connect_res = Err(other),
            }
        }
        let mut handle = connect_res?;

        auth::authenticate(&mut handle, &options.host, &options.username, methods).await?;

        // The SFTP subsystem is brought up here so that a returned
        // session always has both halves live.
        let sftp = Self::open_sftp(&handle, &options.host).await?;

        tracing::debug!(host = %options.host, port = options.port, user = %options.username,
            "ssh session established");

        Ok(Self {
            handle,
            sftp,
            host: options.host,
            port: options.port,
            username: options.username,
            password: options.password,
        })
    }

    async fn open_sftp(handle: &Handle<SessionHandler>, host: &str) -> Result<SftpSession> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel {
                host: host.to_string(),
                op: "open sftp channel",
                source: e,
            })?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::Channel {
                host: host.to_string(),
                op: "request sftp subsystem",
                source: e,
            })?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Sftp {
                host: host.to_string(),
                op: "handshake",
                source: e,
            })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn handle(&self) -> &Handle<SessionHandler> {
        &self.handle
    }

    pub(crate) fn password(&self) -> Option<&Zeroizing<String>> {
        self.password.as_ref()
    }

    /// Whether a remote path exists. Stat failures, including "no such
    /// file", are a normal `false`.
    pub async fn exists(&self, path: &str) -> bool {
        self.sftp.try_exists(path).await.unwrap_or(false)
    }

    /// Whether a remote path exists and is a directory. Stat failures
    /// are a normal `false`.
    pub async fn is_dir(&self, path: &str) -> bool {
        match self.sftp.metadata(path).await {
            Ok(attrs) => attrs.is_dir(),
            Err(_) => false,
        }
    }

    /// Whether a remote directory has no entries.
    pub async fn is_empty_dir(&self, path: &str) -> Result<bool> {
        let entries = self.sftp.read_dir(path).await.map_err(|e| Error::Sftp {
            host: self.host.clone(),
            op: "read_dir",
            source: e,
        })?;
        Ok(entries
            .into_iter()
            .all(|entry| entry.file_name() == "." || entry.file_name() == ".."))
    }

    /// List a remote directory, skipping `.` and `..`.
    pub async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self.sftp.read_dir(path).await.map_err(|e| Error::Sftp {
            host: self.host.clone(),
            op: "read_dir",
            source: e,
        })?;

        let mut listing = Vec::new();
        for entry in entries {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            listing.push(RemoteEntry {
                is_dir: entry.file_type().is_dir(),
                size: entry.metadata().size,
                name,
            });
        }
        Ok(listing)
    }

    /// Create a remote directory and any missing parents. An already
    /// existing directory at any level is not an error.
    pub async fn mkdir_all(&self, path: &str) -> Result<()> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let mut current = String::new();
        if path.starts_with('/') {
            current.push('/');
        }

        for component in components {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(component);

            if let Err(e) = self.sftp.create_dir(&current).await {
                // Tolerate directories that already exist; anything
                // else is a real failure.
                match self.sftp.metadata(&current).await {
                    Ok(attrs) if attrs.is_dir() => {}
                    _ => {
                        return Err(Error::RemoteMkdir {
                            path: current,
                            source: e,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Write a local file to a remote path, creating or truncating the
    /// target, full content in one pass.
    pub async fn write_file(&self, local: &Path, remote: &str) -> Result<()> {
        let contents = tokio::fs::read(local).await.map_err(|e| Error::LocalRead {
            path: local.to_path_buf(),
            source: e,
        })?;

        let mut file = self
            .sftp
            .open_with_flags(
                remote,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| Error::Sftp {
                host: self.host.clone(),
                op: "open for write",
                source: e,
            })?;

        let write = async {
            file.write_all(&contents).await?;
            file.flush().await?;
            file.shutdown().await
        }
        .await;
        write.map_err(|e| Error::RemoteWrite {
            path: remote.to_string(),
            source: e,
        })
    }

    /// Close the connection. Further operations on this session fail.
    pub async fn disconnect(&self) -> Result<()> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::Ssh)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
