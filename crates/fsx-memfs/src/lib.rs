// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory hierarchical filesystem.
//!
//! [`MemFs`] implements [`fsx_core::WritableFs`] together with the optional
//! stat, chmod, chown, chtimes, remove-all, mkdir-all, link, readlink and
//! symlink capabilities.
//!
//! ```
//! use fsx_core::{ops, Mode, WritableFs};
//! use fsx_memfs::MemFs;
//!
//! let fs = MemFs::new();
//! fs.mkdir("docs", Mode::from_perm(0o755)).unwrap();
//! ops::write_file(&fs, "docs/readme", b"hello", Mode::from_perm(0o644)).unwrap();
//! assert_eq!(ops::read_file(&fs, "docs/readme").unwrap(), b"hello");
//! ```

pub mod config;
mod dir;
mod file;
mod link;
mod node;
mod resolve;
mod vfs;

pub use config::MemFsConfig;
pub use vfs::MemFs;
