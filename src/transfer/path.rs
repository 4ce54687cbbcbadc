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

//! Path policy for remote targets.
//!
//! Hosts reached over SSH are POSIX systems, so remote paths always
//! use `/` regardless of the local operating system's separator.

use std::path::{Component, Path, MAIN_SEPARATOR};

/// Convert a path to POSIX separators. On platforms where the native
/// separator already is `/` this is the identity.
pub fn to_posix(path: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}

/// Join a (possibly relative, possibly local) path onto a POSIX base,
/// emitting `/` separators. Only normal components of `relative` are
/// appended; `.` is dropped.
pub fn posix_join(base: &str, relative: impl AsRef<Path>) -> String {
    let mut joined = if base.len() > 1 {
        base.trim_end_matches('/').to_string()
    } else {
        base.to_string()
    };

    for component in relative.as_ref().components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy().into_owned(),
            Component::ParentDir => "..".to_string(),
            _ => continue,
        };
        if !joined.is_empty() && !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(&part);
    }
    joined
}

/// Final component of a path, used to nest a source under an existing
/// destination directory.
pub fn base_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}
