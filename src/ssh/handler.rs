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

//! Server host-key trust policies and the russh client handler.

use std::path::PathBuf;

use russh::client::Handler;

use crate::error::Error;

/// How a server's host key is checked during connect.
///
/// The trust decision is injected at connect time; the permissive mode
/// is one explicit, clearly named policy among several, not the only
/// behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostKeyPolicy {
    /// Accept any host key. Vulnerable to man-in-the-middle attacks;
    /// every connect under this policy is logged at WARN.
    AcceptAll,
    /// base64 encoded key without the type prefix or hostname suffix
    /// (the type is already encoded).
    PinnedKey(String),
    /// Path to a public key file the server must present.
    PinnedKeyFile(PathBuf),
    /// Check against a specific known_hosts file.
    KnownHostsFile(PathBuf),
    /// Check against the user's default known_hosts.
    DefaultKnownHosts,
}

/// SSH client handler performing server key verification.
#[derive(Debug, Clone)]
pub struct SessionHandler {
    hostname: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SessionHandler {
    pub(crate) fn new(hostname: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            hostname,
            port,
            policy,
        }
    }

    fn verification_error(&self, reason: impl Into<String>) -> Error {
        Error::HostKeyVerification {
            host: self.hostname.clone(),
            reason: reason.into(),
        }
    }
}

impl Handler for SessionHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::AcceptAll => {
                tracing::warn!(
                    host = %self.hostname,
                    "host key verification disabled, accepting any server key"
                );
                Ok(true)
            }
            HostKeyPolicy::PinnedKey(key) => {
                let pk = russh::keys::parse_public_key_base64(key)
                    .map_err(|e| self.verification_error(format!("invalid pinned key: {e}")))?;
                Ok(pk == *server_public_key)
            }
            HostKeyPolicy::PinnedKeyFile(path) => {
                let pk = russh::keys::load_public_key(path).map_err(|e| {
                    self.verification_error(format!("cannot load {}: {e}", path.display()))
                })?;
                Ok(pk == *server_public_key)
            }
            HostKeyPolicy::KnownHostsFile(path) => {
                let result = russh::keys::check_known_hosts_path(
                    &self.hostname,
                    self.port,
                    server_public_key,
                    path,
                )
                .map_err(|e| {
                    self.verification_error(format!("cannot check {}: {e}", path.display()))
                })?;
                Ok(result)
            }
            HostKeyPolicy::DefaultKnownHosts => {
                let result =
                    russh::keys::check_known_hosts(&self.hostname, self.port, server_public_key)
                        .map_err(|e| {
                            self.verification_error(format!("cannot check known_hosts: {e}"))
                        })?;
                Ok(result)
            }
        }
    }
}
