// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Generic helpers over [`WritableFs`].
//!
//! Each helper uses the backend's dedicated capability when it advertises one
//! and otherwise composes the operation from the mandatory primitives.

use std::time::SystemTime;

use tracing::trace;

use crate::error::{ErrorKind, FsError, FsResult};
use crate::fs::{File, WritableFs};
use crate::path;
use crate::types::{DirEntry, FileInfo, Mode, OpenFlags};

const READ_CHUNK: usize = 32 * 1024;

/// Creates or truncates `path` with mode `0o666` and returns a read-write handle.
pub fn create(fs: &dyn WritableFs, path: &str) -> FsResult<Box<dyn File>> {
    fs.open_file(
        path,
        OpenFlags::RDWR | OpenFlags::CREATE | OpenFlags::TRUNC,
        Mode::from_perm(0o666),
    )
}

/// Replaces the content of `path`, creating it with `perm` if needed.
pub fn write_file(fs: &dyn WritableFs, path: &str, data: &[u8], perm: Mode) -> FsResult<()> {
    if let Some(cap) = fs.as_write_file() {
        return cap.write_file(path, data, perm);
    }
    trace!(path, "write_file: falling back to open/write/close");
    let mut file = fs.open_file(
        path,
        OpenFlags::WRONLY | OpenFlags::CREATE | OpenFlags::TRUNC,
        perm,
    )?;
    let written = write_all(file.as_mut(), data);
    let closed = file.close();
    written.and(closed)
}

fn write_all(file: &mut dyn File, mut data: &[u8]) -> FsResult<()> {
    while !data.is_empty() {
        let n = file.write(data)?;
        if n == 0 {
            break;
        }
        data = &data[n..];
    }
    Ok(())
}

/// Reads the whole content of `path`.
pub fn read_file(fs: &dyn WritableFs, path: &str) -> FsResult<Vec<u8>> {
    let mut file = fs.open(path)?;
    let mut data = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let read = loop {
        match file.read(&mut chunk) {
            Ok(0) => break Ok(()),
            Ok(n) => data.extend_from_slice(&chunk[..n]),
            Err(e) if e.is_eof() => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = file.close();
    read.and(closed)?;
    Ok(data)
}

/// Lists every entry of the directory at `path`, sorted by name.
pub fn read_dir(fs: &dyn WritableFs, path: &str) -> FsResult<Vec<DirEntry>> {
    let mut dir = fs.open(path)?;
    let listed = dir.read_dir(-1);
    let closed = dir.close();
    let entries = listed?;
    closed?;
    Ok(entries)
}

pub fn stat(fs: &dyn WritableFs, path: &str) -> FsResult<FileInfo> {
    if let Some(cap) = fs.as_stat() {
        return cap.stat(path);
    }
    let file = fs.open(path)?;
    let info = file.stat();
    let closed = file.close();
    let info = info?;
    closed?;
    Ok(info)
}

pub fn chmod(fs: &dyn WritableFs, path: &str, mode: Mode) -> FsResult<()> {
    if let Some(cap) = fs.as_chmod() {
        return cap.chmod(path, mode);
    }
    trace!(path, "chmod: falling back to handle chmod");
    let mut file = fs.open_file(path, OpenFlags::RDWR, Mode::empty())?;
    let changed = file.chmod(mode);
    let closed = file.close();
    changed.and(closed)
}

pub fn chown(fs: &dyn WritableFs, path: &str, uid: u32, gid: u32) -> FsResult<()> {
    if let Some(cap) = fs.as_chown() {
        return cap.chown(path, uid, gid);
    }
    trace!(path, "chown: falling back to handle chown");
    let mut file = fs.open_file(path, OpenFlags::RDWR, Mode::empty())?;
    let changed = file.chown(uid, gid);
    let closed = file.close();
    changed.and(closed)
}

/// Sets access and modification times; `None` keeps the current value.
/// There is no fallback: backends without the capability report `Unsupported`.
pub fn chtimes(
    fs: &dyn WritableFs,
    path: &str,
    atime: Option<SystemTime>,
    mtime: Option<SystemTime>,
) -> FsResult<()> {
    match fs.as_chtimes() {
        Some(cap) => cap.chtimes(path, atime, mtime),
        None => Err(FsError::new("chtimes", path, ErrorKind::Unsupported)),
    }
}

/// Removes `path` and everything below it. A missing path is not an error.
pub fn remove_all(fs: &dyn WritableFs, path: &str) -> FsResult<()> {
    if let Some(cap) = fs.as_remove_all() {
        return cap.remove_all(path);
    }
    trace!(path, "remove_all: falling back to recursive remove");
    remove_tree(fs, path)
}

fn remove_tree(fs: &dyn WritableFs, path: &str) -> FsResult<()> {
    // A symlink is removed as a name, never followed into its target.
    if is_symlink(fs, path) {
        return fs.remove(path);
    }
    let info = match stat(fs, path) {
        Ok(info) => info,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    };
    if info.is_dir() {
        for entry in read_dir(fs, path)? {
            remove_tree(fs, &path::join(path, entry.name()))?;
        }
    }
    fs.remove(path)
}

fn is_symlink(fs: &dyn WritableFs, path: &str) -> bool {
    fs.as_readlink().is_some_and(|cap| cap.readlink(path).is_ok())
}

/// Creates `path` and any missing ancestors. An existing directory is fine;
/// an existing non-directory is `Invalid`.
pub fn mkdir_all(fs: &dyn WritableFs, path: &str, perm: Mode) -> FsResult<()> {
    if let Some(cap) = fs.as_mkdir_all() {
        return cap.mkdir_all(path, perm);
    }
    make_dirs(fs, path, perm)
}

fn make_dirs(fs: &dyn WritableFs, path: &str, perm: Mode) -> FsResult<()> {
    match stat(fs, path) {
        Ok(info) if info.is_dir() => return Ok(()),
        Ok(_) => return Err(FsError::new("mkdir", path, ErrorKind::Invalid)),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let (parent, _) = path::split(path);
    if !path::is_root(parent) {
        make_dirs(fs, parent, perm)?;
    }

    match fs.mkdir(path, perm) {
        Ok(()) => Ok(()),
        // Lost a race with another creator; fine as long as it is a directory.
        Err(e) if e.kind() == ErrorKind::AlreadyExists => match stat(fs, path) {
            Ok(info) if info.is_dir() => Ok(()),
            _ => Err(e),
        },
        Err(e) => Err(e),
    }
}

pub fn link(fs: &dyn WritableFs, old: &str, new: &str) -> FsResult<()> {
    match fs.as_link() {
        Some(cap) => cap.link(old, new),
        None => Err(FsError::new("link", new, ErrorKind::Unsupported)),
    }
}

pub fn readlink(fs: &dyn WritableFs, path: &str) -> FsResult<String> {
    match fs.as_readlink() {
        Some(cap) => cap.readlink(path),
        None => Err(FsError::new("readlink", path, ErrorKind::Unsupported)),
    }
}

pub fn symlink(fs: &dyn WritableFs, old: &str, new: &str) -> FsResult<()> {
    match fs.as_symlink() {
        Some(cap) => cap.symlink(old, new),
        None => Err(FsError::new("symlink", new, ErrorKind::Unsupported)),
    }
}
