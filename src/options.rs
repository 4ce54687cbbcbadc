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

//! Connection options with defaults and validation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Options for [`Session::connect`](crate::Session::connect).
///
/// Both a password and a private key may be supplied; the password is
/// offered to the server first. When neither is given, `~/.ssh/id_rsa`
/// is used if it exists.
///
/// ```no_run
/// use std::time::Duration;
/// use expectssh::ConnectOptions;
///
/// let opts = ConnectOptions::new("10.0.0.7", "deploy")
///     .password("secret")
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct ConnectOptions {
    pub host: String,
    /// Remote port; 0 means the protocol default (22).
    pub port: u16,
    pub username: String,
    pub password: Option<Zeroizing<String>>,
    pub key_file: Option<PathBuf>,
    /// Bounds dial, authentication and SFTP bring-up. Command
    /// execution and transfers are bounded separately, per call.
    pub timeout: Duration,
}

impl ConnectOptions {
    pub const DEFAULT_PORT: u16 = 22;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 0,
            username: username.into(),
            password: None,
            key_file: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` form used in error context.
    pub(crate) fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn apply_defaults(&mut self) {
        if self.port == 0 {
            self.port = Self::DEFAULT_PORT;
        }
        if self.password.is_none() && self.key_file.is_none() {
            if let Some(path) = default_key_file() {
                if path.exists() {
                    self.key_file = Some(path);
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidOption {
                field: "host",
                message: "host cannot be empty".into(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(Error::InvalidOption {
                field: "username",
                message: "username cannot be empty".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("key_file", &self.key_file)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_key_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("id_rsa"))
}
