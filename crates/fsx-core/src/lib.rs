// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! fsx core: the writable filesystem contract.
//!
//! Backends implement [`WritableFs`] and hand out [`File`] handles. Optional
//! operations (chmod, remove-all, symlink, ...) are separate traits a backend
//! advertises through the `as_*` accessors; the helpers in [`ops`] probe for
//! them and fall back to the mandatory operations.

pub mod error;
pub mod fs;
pub mod io;
pub mod ops;
pub mod path;
pub mod types;

pub use error::{ErrorKind, FsError, FsResult};
pub use fs::{
    ChmodFs, ChownFs, ChtimesFs, File, LinkFs, MkdirAllFs, ReadlinkFs, RemoveAllFs, StatFs,
    SymlinkFs, WritableFs, WriteFileFs,
};
pub use io::FileIo;
pub use types::{Access, Capabilities, DirEntry, FileInfo, Mode, OpenFlags, Stat, Whence};
