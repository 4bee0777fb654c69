// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Filesystem nodes.
//!
//! A node's content (file bytes, directory children, symlink target) sits behind
//! its own `Arc<RwLock<_>>` so open handles can hold an owned guard for their
//! whole lifetime. Metadata lives in a separate mutex and may be updated while
//! the content lock is only held shared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use fsx_core::{Access, FileInfo, Mode, Stat};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock, RwLock};

pub(crate) type NodeRef = Arc<Node>;
pub(crate) type Children = HashMap<String, NodeRef>;
pub(crate) type ReadGuard<T> = ArcRwLockReadGuard<RawRwLock, T>;
pub(crate) type WriteGuard<T> = ArcRwLockWriteGuard<RawRwLock, T>;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable node identity; also the lock order for operations that lock two directories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Owner assigned to newly created nodes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Owner {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug)]
struct Metadata {
    perm: Mode,
    uid: u32,
    gid: u32,
    atime: SystemTime,
    mtime: SystemTime,
    /// Committed content length; only meaningful for files.
    size: u64,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    File(Arc<RwLock<Vec<u8>>>),
    Directory(Arc<RwLock<Children>>),
    Symlink(Arc<RwLock<String>>),
}

#[derive(Debug)]
pub(crate) struct Node {
    id: NodeId,
    meta: Mutex<Metadata>,
    kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind, perm: Mode, owner: Owner) -> NodeRef {
        let now = SystemTime::now();
        Arc::new(Node {
            id: NodeId::next(),
            meta: Mutex::new(Metadata {
                perm: perm.perm(),
                uid: owner.uid,
                gid: owner.gid,
                atime: now,
                mtime: now,
                size: 0,
            }),
            kind,
        })
    }

    pub(crate) fn file(perm: Mode, owner: Owner) -> NodeRef {
        Self::new(NodeKind::File(Arc::new(RwLock::new(Vec::new()))), perm, owner)
    }

    pub(crate) fn directory(perm: Mode, owner: Owner) -> NodeRef {
        Self::new(
            NodeKind::Directory(Arc::new(RwLock::new(HashMap::new()))),
            perm,
            owner,
        )
    }

    pub(crate) fn symlink(target: &str, owner: Owner) -> NodeRef {
        Self::new(
            NodeKind::Symlink(Arc::new(RwLock::new(target.to_string()))),
            Mode::PERM,
            owner,
        )
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn children(&self) -> Option<&Arc<RwLock<Children>>> {
        match &self.kind {
            NodeKind::Directory(children) => Some(children),
            _ => None,
        }
    }

    pub(crate) fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub(crate) fn symlink_target(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Symlink(target) => Some(target.read_recursive().clone()),
            _ => None,
        }
    }

    pub(crate) fn perm(&self) -> Mode {
        self.meta.lock().perm
    }

    /// Checks the owner bits against the access an open call asks for.
    pub(crate) fn permits(&self, access: Access) -> bool {
        let perm = self.perm();
        (!access.read || perm.contains(Mode::OWNER_READ))
            && (!access.write || perm.contains(Mode::OWNER_WRITE))
    }

    /// Runs `f` while holding this node's lock shared.
    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        match &self.kind {
            NodeKind::File(content) => {
                let _held = content.read_recursive();
                f(self)
            }
            NodeKind::Directory(children) => {
                let _held = children.read_recursive();
                f(self)
            }
            NodeKind::Symlink(target) => {
                let _held = target.read_recursive();
                f(self)
            }
        }
    }

    pub(crate) fn set_perm(&self, mode: Mode) {
        let mut meta = self.meta.lock();
        meta.perm = mode.perm();
        Self::stamp(&mut meta, true, true);
    }

    pub(crate) fn set_owner(&self, uid: u32, gid: u32) {
        let mut meta = self.meta.lock();
        meta.uid = uid;
        meta.gid = gid;
        Self::stamp(&mut meta, true, true);
    }

    pub(crate) fn set_times(&self, atime: Option<SystemTime>, mtime: Option<SystemTime>) {
        let mut meta = self.meta.lock();
        if let Some(atime) = atime {
            meta.atime = atime;
        }
        if let Some(mtime) = mtime {
            meta.mtime = mtime;
        }
    }

    /// Marks an access, and a modification when `modified` is set.
    pub(crate) fn touch(&self, modified: bool) {
        Self::stamp(&mut self.meta.lock(), true, modified);
    }

    /// Records a committed write of `len` bytes.
    pub(crate) fn committed(&self, len: usize) {
        let mut meta = self.meta.lock();
        meta.size = len as u64;
        Self::stamp(&mut meta, true, true);
    }

    fn stamp(meta: &mut Metadata, accessed: bool, modified: bool) {
        let now = SystemTime::now();
        if accessed {
            meta.atime = now;
        }
        if modified {
            meta.mtime = now;
        }
    }

    /// Snapshot of this node's own metadata under `path`. Symlinks are not followed.
    pub(crate) fn info(&self, path: &str) -> FileInfo {
        // Content locks are never taken while the metadata mutex is held.
        let link_len = self.symlink_target().map(|target| target.len() as u64);
        let meta = self.meta.lock();
        let (kind_bits, size) = match (&self.kind, link_len) {
            (NodeKind::Directory(_), _) => (Mode::DIR, 0),
            (_, Some(len)) => (Mode::SYMLINK, len),
            _ => (Mode::empty(), meta.size),
        };
        FileInfo {
            path: path.to_string(),
            size,
            mode: kind_bits | meta.perm,
            mtime: meta.mtime,
            sys: Stat {
                uid: meta.uid,
                gid: meta.gid,
                atime: meta.atime,
                mtime: meta.mtime,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: Owner = Owner { uid: 0, gid: 0 };

    #[fsx_test_utils::logged_test]
    fn test_node_ids_are_unique_and_ordered() {
        let a = Node::file(Mode::from_perm(0o644), ROOT);
        let b = Node::directory(Mode::from_perm(0o755), ROOT);
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }

    #[fsx_test_utils::logged_test]
    fn test_info_reports_kind_bits() {
        let dir = Node::directory(Mode::from_perm(0o750), ROOT);
        let info = dir.info("d");
        assert!(info.is_dir());
        assert_eq!(info.size, 0);
        assert_eq!(info.mode, Mode::DIR | Mode::from_perm(0o750));

        let link = Node::symlink("some/target", Owner { uid: 7, gid: 8 });
        let info = link.info("l");
        assert!(info.is_symlink());
        assert_eq!(info.size, "some/target".len() as u64);
        assert_eq!((info.sys.uid, info.sys.gid), (7, 8));
        assert_eq!(link.symlink_target().as_deref(), Some("some/target"));
    }

    #[fsx_test_utils::logged_test]
    fn test_permits_checks_owner_bits() {
        let node = Node::file(Mode::from_perm(0o400), ROOT);
        let read = Access {
            read: true,
            write: false,
        };
        let write = Access {
            read: false,
            write: true,
        };
        assert!(node.permits(read));
        assert!(!node.permits(write));

        node.set_perm(Mode::from_perm(0o200));
        assert!(!node.permits(read));
        assert!(node.permits(write));
    }

    #[fsx_test_utils::logged_test]
    fn test_set_times_keeps_unset_fields() {
        let node = Node::file(Mode::from_perm(0o644), ROOT);
        let before = node.info("f");
        let later = before.mtime + std::time::Duration::from_secs(60);

        node.set_times(None, Some(later));
        let after = node.info("f");
        assert_eq!(after.mtime, later);
        assert_eq!(after.sys.atime, before.sys.atime);
    }
}
