// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Symlink indirection. Targets are re-resolved from the root on every use.

use fsx_core::{path, ErrorKind, FileInfo, FsError, FsResult};
use tracing::warn;

use crate::node::NodeRef;
use crate::resolve::Resolver;

impl Resolver {
    /// Follows `node` through any chain of symlinks and returns the first
    /// non-symlink node. `link_path` is where `node` was reached, for errors.
    ///
    /// A target that cannot be resolved fails with `NotFound` naming the target.
    pub(crate) fn follow(
        &self,
        op: &'static str,
        link_path: &str,
        node: NodeRef,
    ) -> FsResult<NodeRef> {
        let mut node = node;
        let mut at = link_path.to_string();
        let mut hops = 0;
        while let Some(target) = node.symlink_target() {
            if hops == self.max_symlink_depth() {
                warn!(op, path = %at, hops, "symlink depth exceeded");
                return Err(FsError::new(op, at, ErrorKind::SymlinkLoop));
            }
            hops += 1;
            if path::validate(&target).is_err() {
                return Err(FsError::new(op, target, ErrorKind::NotFound));
            }
            node = self
                .lookup(&target)
                .map_err(|unresolved| unresolved.into_error(op, &target))?;
            at = target;
        }
        Ok(node)
    }

    /// Stat through symlinks, reporting the path that was asked for.
    ///
    /// Reads metadata without taking the target's lock, so a directory listing
    /// never waits on writers of the files it names.
    pub(crate) fn stat_following(
        &self,
        op: &'static str,
        path: &str,
        node: NodeRef,
    ) -> FsResult<FileInfo> {
        Ok(self.follow(op, path, node)?.info(path))
    }
}
