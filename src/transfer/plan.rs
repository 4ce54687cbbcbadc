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

//! The transfer decision table.
//!
//! The supported source/destination shapes are resolved here, before
//! any byte moves; unsupported combinations fail without touching the
//! remote file system.

use std::path::Path;

use crate::error::PrecheckError;

use super::path::{base_name, posix_join};

/// What a path resolves to on either side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Missing,
}

impl EntryKind {
    /// Resolve a local path. Symlinks are followed; a broken link is
    /// `Missing`.
    pub fn of_local(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Self::Directory,
            Ok(_) => Self::File,
            Err(_) => Self::Missing,
        }
    }
}

/// How a transfer will be performed, with the destination fully
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Write the source file to exactly this remote path, creating or
    /// overwriting it.
    File { destination: String },
    /// Replicate the source directory's subtree under this remote
    /// root.
    Tree { root: String },
}

/// Evaluate the decision table.
///
/// | source    | destination | plan                                   |
/// |-----------|-------------|----------------------------------------|
/// | missing   | any         | error                                  |
/// | file      | directory   | file at `destination/<source base>`    |
/// | file      | file/missing| file at `destination`                  |
/// | directory | missing     | tree rooted at `destination`           |
/// | directory | file        | error                                  |
/// | directory | directory   | tree rooted at `destination/<source base>` |
///
/// The nested-root conflict of the last row (an existing non-directory
/// entry at `destination/<source base>`) is checked by the executor,
/// which is the first point where that path is stat-ed.
pub fn transfer_plan(
    source: &Path,
    source_kind: EntryKind,
    destination: &str,
    destination_kind: EntryKind,
) -> Result<TransferPlan, PrecheckError> {
    if source.as_os_str().is_empty() {
        return Err(PrecheckError::EmptySource);
    }
    if destination.is_empty() {
        return Err(PrecheckError::EmptyDestination);
    }

    match source_kind {
        EntryKind::Missing => Err(PrecheckError::SourceMissing(source.to_path_buf())),
        EntryKind::File => {
            let destination = if destination_kind == EntryKind::Directory {
                posix_join(destination, base_name(source))
            } else {
                destination.to_string()
            };
            Ok(TransferPlan::File { destination })
        }
        EntryKind::Directory => match destination_kind {
            EntryKind::Missing => Ok(TransferPlan::Tree {
                root: destination.to_string(),
            }),
            EntryKind::File => Err(PrecheckError::DestinationIsFile(destination.to_string())),
            EntryKind::Directory => Ok(TransferPlan::Tree {
                root: posix_join(destination, base_name(source)),
            }),
        },
    }
}
