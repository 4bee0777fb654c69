// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The writable filesystem contract and its optional capabilities

use std::fmt;
use std::time::SystemTime;

use crate::error::FsResult;
use crate::types::{Capabilities, DirEntry, FileInfo, Mode, OpenFlags};

/// An open handle onto a file or directory.
///
/// Permission is checked once when the handle is opened. Directory handles fail
/// `read`, `read_at`, `write` and `seek` with `IsADirectory`; file handles fail
/// `read_dir` with `Invalid`.
pub trait File: Send {
    fn stat(&self) -> FsResult<FileInfo>;

    /// Reads from the cursor and advances it. Fails with `EndOfFile` once the
    /// cursor has reached the end of the content.
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    /// Reads at `offset` without moving the cursor. A short read is not an error;
    /// an offset at or past the end is `EndOfFile`.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> FsResult<usize>;

    fn write(&mut self, buf: &[u8]) -> FsResult<usize>;

    /// `whence` is 0 (start), 1 (current) or 2 (end); see [`crate::Whence`].
    fn seek(&mut self, offset: i64, whence: i32) -> FsResult<u64>;

    fn chmod(&mut self, mode: Mode) -> FsResult<()>;

    fn chown(&mut self, uid: u32, gid: u32) -> FsResult<()>;

    /// Lists a directory from a snapshot taken on the first call.
    ///
    /// With `n <= 0` every remaining entry is returned at once. With `n > 0` at
    /// most `n` entries are returned, and `EndOfFile` once the snapshot is used up.
    fn read_dir(&mut self, n: isize) -> FsResult<Vec<DirEntry>>;

    /// Releases the handle. Writable file handles commit their content first.
    fn close(self: Box<Self>) -> FsResult<()>;
}

impl fmt::Debug for dyn File + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn File")
    }
}

/// Mandatory operations every backend provides.
///
/// Optional capabilities are discovered through the `as_*` accessors, which
/// default to `None`. Generic code should go through the helpers in
/// [`crate::ops`], which fall back to the mandatory operations.
pub trait WritableFs: Send + Sync {
    /// Opens `path` read-only.
    fn open(&self, path: &str) -> FsResult<Box<dyn File>>;

    fn open_file(&self, path: &str, flags: OpenFlags, perm: Mode) -> FsResult<Box<dyn File>>;

    /// Creates a single directory; missing ancestors are not created.
    fn mkdir(&self, path: &str, perm: Mode) -> FsResult<()>;

    /// Removes a file or empty directory. A missing name is not an error.
    fn remove(&self, path: &str) -> FsResult<()>;

    fn rename(&self, old: &str, new: &str) -> FsResult<()>;

    fn same_file(&self, a: &FileInfo, b: &FileInfo) -> bool;

    fn as_write_file(&self) -> Option<&dyn WriteFileFs> {
        None
    }

    fn as_stat(&self) -> Option<&dyn StatFs> {
        None
    }

    fn as_chmod(&self) -> Option<&dyn ChmodFs> {
        None
    }

    fn as_chown(&self) -> Option<&dyn ChownFs> {
        None
    }

    fn as_chtimes(&self) -> Option<&dyn ChtimesFs> {
        None
    }

    fn as_remove_all(&self) -> Option<&dyn RemoveAllFs> {
        None
    }

    fn as_mkdir_all(&self) -> Option<&dyn MkdirAllFs> {
        None
    }

    fn as_link(&self) -> Option<&dyn LinkFs> {
        None
    }

    fn as_readlink(&self) -> Option<&dyn ReadlinkFs> {
        None
    }

    fn as_symlink(&self) -> Option<&dyn SymlinkFs> {
        None
    }

    /// Every optional capability this backend advertises.
    fn capabilities(&self) -> Capabilities {
        let probes = [
            (self.as_write_file().is_some(), Capabilities::WRITE_FILE),
            (self.as_stat().is_some(), Capabilities::STAT),
            (self.as_chmod().is_some(), Capabilities::CHMOD),
            (self.as_chown().is_some(), Capabilities::CHOWN),
            (self.as_chtimes().is_some(), Capabilities::CHTIMES),
            (self.as_remove_all().is_some(), Capabilities::REMOVE_ALL),
            (self.as_mkdir_all().is_some(), Capabilities::MKDIR_ALL),
            (self.as_link().is_some(), Capabilities::LINK),
            (self.as_readlink().is_some(), Capabilities::READLINK),
            (self.as_symlink().is_some(), Capabilities::SYMLINK),
        ];
        probes
            .into_iter()
            .filter(|(present, _)| *present)
            .fold(Capabilities::empty(), |caps, (_, cap)| caps | cap)
    }
}

pub trait WriteFileFs {
    fn write_file(&self, path: &str, data: &[u8], perm: Mode) -> FsResult<()>;
}

pub trait StatFs {
    fn stat(&self, path: &str) -> FsResult<FileInfo>;
}

pub trait ChmodFs {
    fn chmod(&self, path: &str, mode: Mode) -> FsResult<()>;
}

pub trait ChownFs {
    fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()>;
}

/// A `None` time leaves that timestamp unchanged.
pub trait ChtimesFs {
    fn chtimes(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> FsResult<()>;
}

pub trait RemoveAllFs {
    fn remove_all(&self, path: &str) -> FsResult<()>;
}

pub trait MkdirAllFs {
    fn mkdir_all(&self, path: &str, perm: Mode) -> FsResult<()>;
}

pub trait LinkFs {
    fn link(&self, old: &str, new: &str) -> FsResult<()>;
}

pub trait ReadlinkFs {
    fn readlink(&self, path: &str) -> FsResult<String>;
}

pub trait SymlinkFs {
    fn symlink(&self, old: &str, new: &str) -> FsResult<()>;
}
