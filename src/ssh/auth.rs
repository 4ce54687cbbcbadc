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

//! Authentication methods offered to the server at connect time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::Handle;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::options::ConnectOptions;

use super::handler::SessionHandler;

/// An authentication token offered to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKey {
        /// entire contents of a private key file
        key_data: Zeroizing<String>,
        key_pass: Option<Zeroizing<String>>,
    },
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
}

impl AuthMethod {
    /// Convenience method to create an [`AuthMethod`] from a string literal.
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key(key: &str, passphrase: Option<&str>) -> Self {
        Self::PrivateKey {
            key_data: Zeroizing::new(key.to_string()),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    pub fn with_key_file<T: AsRef<Path>>(key_file_path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.as_ref().to_path_buf(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }
}

/// Build the ordered candidate list from connect options: password
/// first when supplied, then the private key.
pub(crate) fn candidates(options: &ConnectOptions) -> Result<Vec<AuthMethod>> {
    let mut methods = Vec::new();
    if let Some(password) = &options.password {
        methods.push(AuthMethod::Password(password.clone()));
    }
    if let Some(path) = &options.key_file {
        methods.push(AuthMethod::with_key_file(path, None));
    }
    if methods.is_empty() {
        return Err(Error::NoCredential {
            host: options.host.clone(),
            user: options.username.clone(),
        });
    }
    Ok(methods)
}

/// Try each candidate in order against the server; the first accepted
/// method wins. A key that cannot be parsed aborts the attempt, a
/// rejected credential moves on to the next candidate.
pub(crate) async fn authenticate(
    handle: &mut Handle<SessionHandler>,
    host: &str,
    username: &str,
    methods: Vec<AuthMethod>,
) -> Result<()> {
    for method in methods {
        if try_method(handle, username, method).await? {
            return Ok(());
        }
    }
    Err(Error::AuthenticationFailed {
        host: host.to_string(),
        user: username.to_string(),
    })
}

async fn try_method(
    handle: &mut Handle<SessionHandler>,
    username: &str,
    method: AuthMethod,
) -> Result<bool> {
    match method {
        AuthMethod::Password(password) => {
            let auth = handle.authenticate_password(username, &**password).await?;
            Ok(auth.success())
        }
        AuthMethod::PrivateKey { key_data, key_pass } => {
            let key = russh::keys::decode_secret_key(&key_data, key_pass.as_ref().map(|p| &***p))
                .map_err(|e| Error::KeyInvalid {
                    key: "<in-memory>".to_string(),
                    source: e,
                })?;
            authenticate_key(handle, username, key).await
        }
        AuthMethod::PrivateKeyFile {
            key_file_path,
            key_pass,
        } => {
            let key =
                russh::keys::load_secret_key(&key_file_path, key_pass.as_ref().map(|p| &***p))
                    .map_err(|e| Error::KeyInvalid {
                        key: key_file_path.display().to_string(),
                        source: e,
                    })?;
            authenticate_key(handle, username, key).await
        }
    }
}

async fn authenticate_key(
    handle: &mut Handle<SessionHandler>,
    username: &str,
    key: russh::keys::PrivateKey,
) -> Result<bool> {
    let auth = handle
        .authenticate_publickey(
            username,
            russh::keys::PrivateKeyWithHashAlg::new(
                Arc::new(key),
                handle.best_supported_rsa_hash().await?.flatten(),
            ),
        )
        .await?;
    Ok(auth.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_offered_before_key() {
        let options = ConnectOptions::new("h", "u")
            .password("p")
            .key_file("/tmp/id_rsa");
        let methods = candidates(&options).unwrap();
        assert_eq!(methods.len(), 2);
        assert!(matches!(methods[0], AuthMethod::Password(_)));
        assert!(matches!(methods[1], AuthMethod::PrivateKeyFile { .. }));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let options = ConnectOptions::new("h", "u");
        let err = candidates(&options).unwrap_err();
        assert!(matches!(err, Error::NoCredential { .. }));
    }

    #[test]
    fn key_only_builds_a_single_candidate() {
        let options = ConnectOptions::new("h", "u").key_file("/tmp/id_rsa");
        let methods = candidates(&options).unwrap();
        assert_eq!(methods.len(), 1);
        assert!(matches!(
            &methods[0],
            AuthMethod::PrivateKeyFile { key_file_path, .. }
                if key_file_path == &PathBuf::from("/tmp/id_rsa")
        ));
    }
}
