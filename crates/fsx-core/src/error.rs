// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for fsx

use std::io;

/// What went wrong, independent of where.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("file does not exist")]
    NotFound,
    #[error("invalid argument")]
    Invalid,
    #[error("permission denied")]
    Permission,
    #[error("is a directory")]
    IsADirectory,
    #[error("end of file")]
    EndOfFile,
    #[error("invalid whence")]
    InvalidWhence,
    #[error("file already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("too many levels of symbolic links")]
    SymlinkLoop,
    #[error("operation not supported")]
    Unsupported,
}

impl ErrorKind {
    /// Native errno for hosts that bridge to POSIX interfaces. End of file has none.
    pub fn errno(self) -> Option<i32> {
        let errno = match self {
            ErrorKind::NotFound => libc::ENOENT,
            ErrorKind::Invalid | ErrorKind::InvalidWhence => libc::EINVAL,
            ErrorKind::Permission => libc::EACCES,
            ErrorKind::IsADirectory => libc::EISDIR,
            ErrorKind::EndOfFile => return None,
            ErrorKind::AlreadyExists => libc::EEXIST,
            ErrorKind::NotEmpty => libc::ENOTEMPTY,
            ErrorKind::SymlinkLoop => libc::ELOOP,
            ErrorKind::Unsupported => libc::ENOTSUP,
        };
        Some(errno)
    }

    fn io_kind(self) -> io::ErrorKind {
        match self {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::Invalid | ErrorKind::InvalidWhence => io::ErrorKind::InvalidInput,
            ErrorKind::Permission => io::ErrorKind::PermissionDenied,
            ErrorKind::EndOfFile => io::ErrorKind::UnexpectedEof,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::Unsupported => io::ErrorKind::Unsupported,
            ErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            ErrorKind::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorKind::SymlinkLoop => io::ErrorKind::Other,
        }
    }
}

/// Filesystem error carrying the failing operation and the path it was applied to.
///
/// When path resolution fails part way, `component` names the prefix of the path
/// that could not be resolved.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{op} {path}: {kind}")]
pub struct FsError {
    op: &'static str,
    path: String,
    kind: ErrorKind,
    component: Option<String>,
}

impl FsError {
    pub fn new(op: &'static str, path: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            op,
            path: path.into(),
            kind,
            component: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_eof(&self) -> bool {
        self.kind == ErrorKind::EndOfFile
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        io::Error::new(err.kind.io_kind(), err)
    }
}

pub type FsResult<T> = Result<T, FsError>;
