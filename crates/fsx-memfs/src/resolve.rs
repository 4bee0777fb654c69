// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path resolution

use fsx_core::{path, ErrorKind, FsError};

use crate::node::{NodeKind, NodeRef};

/// Resolution stopped at `component`: it is missing or sits below a non-directory.
#[derive(Debug)]
pub(crate) struct Unresolved {
    pub component: String,
}

impl Unresolved {
    pub(crate) fn into_error(self, op: &'static str, path: &str) -> FsError {
        FsError::new(op, path, ErrorKind::NotFound).with_component(self.component)
    }
}

/// Walks paths from a fixed root.
#[derive(Clone)]
pub(crate) struct Resolver {
    root: NodeRef,
    max_symlink_depth: usize,
}

impl Resolver {
    pub(crate) fn new(root: NodeRef, max_symlink_depth: usize) -> Self {
        Self {
            root,
            max_symlink_depth,
        }
    }

    pub(crate) fn root(&self) -> &NodeRef {
        &self.root
    }

    pub(crate) fn max_symlink_depth(&self) -> usize {
        self.max_symlink_depth
    }

    /// Finds the node at `path`. Every segment but the last must be a directory;
    /// symlinks in the middle of a path are not followed.
    ///
    /// Each directory is read-locked only while its child is looked up.
    pub(crate) fn lookup(&self, path: &str) -> Result<NodeRef, Unresolved> {
        if path::is_root(path) {
            return Ok(self.root.clone());
        }

        let mut dir = self.root.clone();
        let mut rest = path;
        loop {
            let (head, tail) = path::split_first(rest);
            let end = path.len() - rest.len() + head.len();
            let child = match dir.kind() {
                NodeKind::Directory(children) => children.read_recursive().get(head).cloned(),
                _ => None,
            };
            let Some(child) = child else {
                return Err(Unresolved {
                    component: path[..end].to_string(),
                });
            };
            match tail {
                None => return Ok(child),
                Some(tail) if child.is_dir() => {
                    dir = child;
                    rest = tail;
                }
                Some(_) => {
                    return Err(Unresolved {
                        component: path[..end].to_string(),
                    })
                }
            }
        }
    }
}
