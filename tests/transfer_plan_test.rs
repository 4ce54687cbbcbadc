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

//! The transfer decision table against real local files, with the
//! remote side's resolved kind supplied directly.

use std::fs;
use std::path::Path;

use anyhow::Result;
use expectssh::transfer::path::{base_name, posix_join};
use expectssh::transfer::plan::{transfer_plan, EntryKind, TransferPlan};
use expectssh::PrecheckError;

#[test]
fn local_kinds_resolve_from_the_file_system() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("a.txt");
    fs::write(&file, b"hello")?;

    assert_eq!(EntryKind::of_local(&file), EntryKind::File);
    assert_eq!(EntryKind::of_local(dir.path()), EntryKind::Directory);
    assert_eq!(
        EntryKind::of_local(&dir.path().join("ghost")),
        EntryKind::Missing
    );
    Ok(())
}

#[test]
fn file_into_existing_remote_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("a.txt");
    fs::write(&file, b"hello")?;

    let plan = transfer_plan(
        &file,
        EntryKind::of_local(&file),
        "/tmp/",
        EntryKind::Directory,
    )?;
    assert_eq!(
        plan,
        TransferPlan::File {
            destination: "/tmp/a.txt".into()
        }
    );
    Ok(())
}

#[test]
fn file_to_fresh_remote_path_is_exact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("a.txt");
    fs::write(&file, b"hello")?;

    let plan = transfer_plan(
        &file,
        EntryKind::of_local(&file),
        "/tmp/b.txt",
        EntryKind::Missing,
    )?;
    assert_eq!(
        plan,
        TransferPlan::File {
            destination: "/tmp/b.txt".into()
        }
    );
    Ok(())
}

#[test]
fn directory_tree_lands_under_fresh_destination() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let proj = dir.path().join("proj");
    fs::create_dir(&proj)?;
    fs::write(proj.join("x.txt"), b"x")?;

    let plan = transfer_plan(
        &proj,
        EntryKind::of_local(&proj),
        "/tmp/out",
        EntryKind::Missing,
    )?;
    let TransferPlan::Tree { root } = plan else {
        panic!("expected a tree plan");
    };
    assert_eq!(root, "/tmp/out");
    // Inside the walk each entry joins onto the root.
    assert_eq!(posix_join(&root, "x.txt"), "/tmp/out/x.txt");
    Ok(())
}

#[test]
fn directory_tree_nests_inside_existing_destination() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let proj = dir.path().join("proj");
    fs::create_dir(&proj)?;
    fs::write(proj.join("x.txt"), b"x")?;

    let plan = transfer_plan(
        &proj,
        EntryKind::of_local(&proj),
        "/tmp",
        EntryKind::Directory,
    )?;
    let TransferPlan::Tree { root } = plan else {
        panic!("expected a tree plan");
    };
    assert_eq!(root, "/tmp/proj");
    assert_eq!(posix_join(&root, "x.txt"), "/tmp/proj/x.txt");
    Ok(())
}

#[test]
fn directory_onto_remote_file_fails_without_remote_mutation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let proj = dir.path().join("proj");
    fs::create_dir(&proj)?;

    let err = transfer_plan(
        &proj,
        EntryKind::of_local(&proj),
        "/tmp/existing.txt",
        EntryKind::File,
    )
    .unwrap_err();
    assert!(matches!(err, PrecheckError::DestinationIsFile(_)));
    Ok(())
}

#[test]
fn empty_paths_fail_before_any_io() {
    let err = transfer_plan(Path::new(""), EntryKind::Missing, "/tmp", EntryKind::Directory)
        .unwrap_err();
    assert!(matches!(err, PrecheckError::EmptySource));

    let err = transfer_plan(Path::new("a.txt"), EntryKind::File, "", EntryKind::Missing)
        .unwrap_err();
    assert!(matches!(err, PrecheckError::EmptyDestination));
}

#[test]
fn missing_source_fails() {
    let err = transfer_plan(
        Path::new("no/such/file"),
        EntryKind::Missing,
        "/tmp",
        EntryKind::Directory,
    )
    .unwrap_err();
    assert!(matches!(err, PrecheckError::SourceMissing(_)));
}

#[test]
fn base_name_drives_the_nested_layout() {
    assert_eq!(base_name("deep/nested/proj"), "proj");
    assert_eq!(posix_join("/tmp", base_name("deep/nested/proj")), "/tmp/proj");
}
