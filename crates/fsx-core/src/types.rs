// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Shared value types: open flags, modes, whence, stat records and directory entries

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::path;

bitflags::bitflags! {
    /// Permission bits plus the node-type bits reported by stat.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Mode: u32 {
        const DIR = 1 << 31;
        const SYMLINK = 1 << 27;

        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;

        const PERM = 0o777;
        const TYPE = Self::DIR.bits() | Self::SYMLINK.bits();
    }
}

impl Mode {
    /// Permission bits from a POSIX-style octal value; anything outside `0o777` is dropped.
    pub const fn from_perm(bits: u32) -> Self {
        Self::from_bits_truncate(bits & 0o777)
    }

    pub fn perm(self) -> Mode {
        self & Mode::PERM
    }

    pub fn is_dir(self) -> bool {
        self.contains(Mode::DIR)
    }

    pub fn is_symlink(self) -> bool {
        self.contains(Mode::SYMLINK)
    }

    pub fn is_regular(self) -> bool {
        !self.intersects(Mode::TYPE)
    }
}

impl fmt::Display for Mode {
    /// `ls`-style rendering, e.g. `drwxr-x---`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() {
            'd'
        } else if self.is_symlink() {
            'L'
        } else {
            '-'
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for (i, c) in "rwxrwxrwx".chars().enumerate() {
            let bit = 1 << (8 - i);
            out.push(if self.bits() & bit != 0 { c } else { '-' });
        }
        f.write_str(&out)
    }
}

bitflags::bitflags! {
    /// Flags accepted by `open_file`. Exactly one of the access flags must be set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const RDONLY = 1 << 0;
        const WRONLY = 1 << 1;
        const RDWR = 1 << 2;
        const APPEND = 1 << 3;
        const CREATE = 1 << 4;
        const EXCL = 1 << 5;
        /// Synchronous-write hint. Backends without a write cache ignore it.
        const SYNC = 1 << 6;
        const TRUNC = 1 << 7;

        const ACCESS = Self::RDONLY.bits() | Self::WRONLY.bits() | Self::RDWR.bits();
    }
}

/// Access granted to a handle, derived from the access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
}

impl OpenFlags {
    /// Returns `None` unless exactly one access flag is present.
    pub fn access(self) -> Option<Access> {
        let access = self & OpenFlags::ACCESS;
        if access == OpenFlags::RDONLY {
            Some(Access {
                read: true,
                write: false,
            })
        } else if access == OpenFlags::WRONLY {
            Some(Access {
                read: false,
                write: true,
            })
        } else if access == OpenFlags::RDWR {
            Some(Access {
                read: true,
                write: true,
            })
        } else {
            None
        }
    }
}

/// Seek origin. Raw values match the classic `SEEK_SET`/`SEEK_CUR`/`SEEK_END` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    Start = 0,
    Current = 1,
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = ErrorKind;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(ErrorKind::InvalidWhence),
        }
    }
}

impl Whence {
    /// New cursor position for a buffer of `len` bytes, clamped to `[0, len]`.
    ///
    /// `End` counts backwards: offset 2 on a 10-byte buffer lands on 8.
    pub fn apply(self, offset: i64, cursor: u64, len: u64) -> u64 {
        let len_i = i128::from(len);
        let target = match self {
            Whence::Start => i128::from(offset),
            Whence::Current => i128::from(cursor) + i128::from(offset),
            Whence::End => len_i - i128::from(offset),
        };
        // Clamped into [0, len], so the cast back cannot truncate.
        target.clamp(0, len_i) as u64
    }
}

/// Backend-specific ownership and timestamp details attached to [`FileInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
}

/// Result of stat: a snapshot of a node taken under the logical path used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub mode: Mode,
    pub mtime: SystemTime,
    pub sys: Stat,
}

impl FileInfo {
    /// Final path element; the root reports `"."`.
    pub fn name(&self) -> &str {
        path::base(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.mode.is_symlink()
    }
}

/// One record of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub info: FileInfo,
}

impl DirEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }

    /// Type bits only.
    pub fn file_type(&self) -> Mode {
        self.info.mode & Mode::TYPE
    }

    pub fn info(&self) -> &FileInfo {
        &self.info
    }
}

bitflags::bitflags! {
    /// Optional operations a backend advertises beyond the mandatory contract.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const WRITE_FILE = 1 << 0;
        const STAT = 1 << 1;
        const CHMOD = 1 << 2;
        const CHOWN = 1 << 3;
        const CHTIMES = 1 << 4;
        const REMOVE_ALL = 1 << 5;
        const MKDIR_ALL = 1 << 6;
        const LINK = 1 << 7;
        const READLINK = 1 << 8;
        const SYMLINK = 1 << 9;
    }
}
