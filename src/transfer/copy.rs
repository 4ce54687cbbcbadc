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

//! Recursive local-to-remote replication over the session's SFTP
//! handle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, PrecheckError, Result};
use crate::ssh::session::Session;

use super::path::{posix_join, to_posix};
use super::plan::{transfer_plan, EntryKind, TransferPlan};

impl Session {
    /// Replicate a local file or directory tree onto the remote host.
    ///
    /// The destination is normalized to POSIX separators. The
    /// source/destination shapes are resolved first and unsupported
    /// combinations fail before any remote mutation; see
    /// [`transfer_plan`] for the table.
    ///
    /// Directory replication creates remote directories eagerly and is
    /// not atomic: a failure mid-walk aborts the remainder and leaves
    /// already-copied entries in place (at-least-once semantics).
    pub async fn copy(&self, source: impl AsRef<Path>, destination: &str) -> Result<()> {
        let source = source.as_ref();
        let destination = to_posix(destination);

        let source_kind = EntryKind::of_local(source);
        let destination_kind = self.remote_kind(&destination).await;
        let plan = transfer_plan(source, source_kind, &destination, destination_kind)?;

        tracing::info!(host = %self.host(), source = %source.display(), %destination,
            "copying to remote");

        match plan {
            TransferPlan::File { destination } => self.write_file(source, &destination).await,
            TransferPlan::Tree { root } => {
                if self.exists(&root).await && !self.is_dir(&root).await {
                    return Err(PrecheckError::DestinationConflict(root).into());
                }
                self.copy_tree(source, &root).await
            }
        }
    }

    /// Like [`copy`](Session::copy), with a bound on the whole
    /// transfer. On expiry the walk stops where it is; the partially
    /// populated destination is left in place.
    pub async fn copy_with_timeout(
        &self,
        source: impl AsRef<Path>,
        destination: &str,
        limit: Duration,
    ) -> Result<()> {
        match tokio::time::timeout(limit, self.copy(source, destination)).await {
            Ok(result) => result,
            Err(_) => Err(Error::TransferTimeout {
                host: self.host().to_string(),
                timeout: limit,
            }),
        }
    }

    async fn remote_kind(&self, path: &str) -> EntryKind {
        if self.is_dir(path).await {
            EntryKind::Directory
        } else if self.exists(path).await {
            EntryKind::File
        } else {
            EntryKind::Missing
        }
    }

    /// Walk the local subtree, mirroring directories and files under
    /// `root`. The walk is iterative (a stack of directory pairs) and
    /// aborts on the first error.
    async fn copy_tree(&self, source: &Path, root: &str) -> Result<()> {
        self.mkdir_all(root).await?;

        let mut stack: Vec<(PathBuf, String)> = vec![(source.to_path_buf(), root.to_string())];
        while let Some((local_dir, remote_dir)) = stack.pop() {
            let mut entries =
                tokio::fs::read_dir(&local_dir)
                    .await
                    .map_err(|e| Error::LocalRead {
                        path: local_dir.clone(),
                        source: e,
                    })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::LocalRead {
                path: local_dir.clone(),
                source: e,
            })? {
                let local_path = entry.path();
                let remote_path = posix_join(&remote_dir, entry.file_name());

                let file_type = entry.file_type().await.map_err(|e| Error::LocalRead {
                    path: local_path.clone(),
                    source: e,
                })?;

                if file_type.is_dir() {
                    self.mkdir_all(&remote_path).await?;
                    stack.push((local_path, remote_path));
                } else if file_type.is_file() {
                    self.write_file(&local_path, &remote_path).await?;
                } else {
                    // Symlinks and special files are not replicated.
                    tracing::warn!(path = %local_path.display(), "skipping non-regular file");
                }
            }
        }
        Ok(())
    }
}
