// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Filesystem façade

use std::sync::Arc;
use std::time::SystemTime;

use fsx_core::{
    path, ChmodFs, ChownFs, ChtimesFs, ErrorKind, File, FileInfo, FsError, FsResult, LinkFs,
    MkdirAllFs, Mode, OpenFlags, ReadlinkFs, RemoveAllFs, StatFs, SymlinkFs, WritableFs,
};
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::debug;

use crate::config::MemFsConfig;
use crate::dir::DirHandle;
use crate::file::FileHandle;
use crate::node::{Children, Node, NodeKind, NodeRef, Owner};
use crate::resolve::Resolver;

/// In-memory filesystem.
///
/// There is no global lock: every node carries its own reader/writer lock.
/// Open handles hold their node's lock until closed or dropped, so a writer
/// blocks every other opener of the same node for its whole lifetime.
pub struct MemFs {
    resolver: Resolver,
    owner: Owner,
    config: MemFsConfig,
}

/// Parent directory of a path, plus the final name.
struct Parent<'p> {
    node: NodeRef,
    children: Arc<RwLock<Children>>,
    name: &'p str,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    pub fn new() -> Self {
        Self::with_config(MemFsConfig::default())
    }

    pub fn with_config(config: MemFsConfig) -> Self {
        let owner = Owner {
            uid: config.default_uid,
            gid: config.default_gid,
        };
        let root = Node::directory(Mode::from_perm(config.root_perm), owner);
        Self {
            resolver: Resolver::new(root, config.max_symlink_depth),
            owner,
            config,
        }
    }

    pub fn config(&self) -> &MemFsConfig {
        &self.config
    }

    fn validated(op: &'static str, path: &str) -> FsResult<()> {
        path::validate(path).map_err(|kind| FsError::new(op, path, kind))
    }

    fn lookup(&self, op: &'static str, path: &str) -> FsResult<NodeRef> {
        self.resolver
            .lookup(path)
            .map_err(|unresolved| unresolved.into_error(op, path))
    }

    /// Finds the node at `path` and follows it if it is a symlink.
    fn lookup_following(&self, op: &'static str, path: &str) -> FsResult<NodeRef> {
        let node = self.lookup(op, path)?;
        self.resolver.follow(op, path, node)
    }

    /// Resolves the directory that holds `path`: missing is `NotFound`, not a
    /// directory is `Invalid`. `path` must not be the root.
    fn parent<'p>(&self, op: &'static str, path: &'p str) -> FsResult<Parent<'p>> {
        let (dir, name) = path::split(path);
        let node = self.lookup(op, dir)?;
        let children = node
            .children()
            .cloned()
            .ok_or_else(|| FsError::new(op, path, ErrorKind::Invalid).with_component(dir))?;
        Ok(Parent {
            node,
            children,
            name,
        })
    }

    fn open_node(&self, node: NodeRef, path: &str, flags: OpenFlags) -> FsResult<Box<dyn File>> {
        let access = flags
            .access()
            .ok_or_else(|| FsError::new("open", path, ErrorKind::Invalid))?;
        match node.kind() {
            NodeKind::File(content) => {
                let content = content.clone();
                Ok(Box::new(FileHandle::open(node, &content, path, flags, access)?))
            }
            NodeKind::Directory(children) => {
                let children = children.clone();
                Ok(Box::new(DirHandle::open(
                    node,
                    &children,
                    path,
                    access,
                    self.resolver.clone(),
                )?))
            }
            // Callers follow links before opening.
            NodeKind::Symlink(_) => Err(FsError::new("open", path, ErrorKind::Invalid)),
        }
    }

    /// Finds `name` in the locked `children`, creating it if the flags allow.
    fn open_child(
        &self,
        parent: &Parent<'_>,
        path: &str,
        flags: OpenFlags,
        perm: Mode,
    ) -> FsResult<NodeRef> {
        let mut children = parent.children.write();
        if let Some(existing) = children.get(parent.name) {
            if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                return Err(FsError::new("open", path, ErrorKind::AlreadyExists));
            }
            return Ok(existing.clone());
        }
        if !flags.contains(OpenFlags::CREATE) {
            return Err(FsError::new("open", path, ErrorKind::NotFound));
        }
        if !parent.node.perm().contains(Mode::OWNER_WRITE) {
            return Err(FsError::new("open", path, ErrorKind::Permission));
        }
        let node = Node::file(perm, self.owner);
        children.insert(parent.name.to_string(), node.clone());
        debug!(path, perm = %perm.perm(), "created file");
        Ok(node)
    }

    /// Inserts `node` under a name that must not be taken yet.
    fn insert_new(&self, op: &'static str, path: &str, node: NodeRef) -> FsResult<()> {
        let parent = self.parent(op, path)?;
        let mut children = parent.children.write();
        if children.contains_key(parent.name) {
            return Err(FsError::new(op, path, ErrorKind::AlreadyExists));
        }
        children.insert(parent.name.to_string(), node);
        Ok(())
    }

    fn reject_root(op: &'static str, path: &str) -> FsResult<()> {
        if path::is_root(path) {
            Err(FsError::new(op, path, ErrorKind::Invalid))
        } else {
            Ok(())
        }
    }
}

/// Write-locks two distinct directories, lower node id first.
fn lock_pair<'a>(
    first: (&NodeRef, &'a RwLock<Children>),
    second: (&NodeRef, &'a RwLock<Children>),
) -> (
    RwLockWriteGuard<'a, Children>,
    RwLockWriteGuard<'a, Children>,
) {
    if first.0.id() < second.0.id() {
        let a = first.1.write();
        let b = second.1.write();
        (a, b)
    } else {
        let b = second.1.write();
        let a = first.1.write();
        (a, b)
    }
}

impl WritableFs for MemFs {
    fn open(&self, path: &str) -> FsResult<Box<dyn File>> {
        Self::validated("open", path)?;
        let node = self.lookup_following("open", path)?;
        self.open_node(node, path, OpenFlags::RDONLY)
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: Mode) -> FsResult<Box<dyn File>> {
        Self::validated("open", path)?;
        if flags.access().is_none() {
            return Err(FsError::new("open", path, ErrorKind::Invalid));
        }
        if path::is_root(path) {
            if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                return Err(FsError::new("open", path, ErrorKind::AlreadyExists));
            }
            return self.open_node(self.resolver.root().clone(), path, flags);
        }

        let parent = self.parent("open", path)?;
        // The parent lock is dropped before blocking on the child's lock.
        let child = self.open_child(&parent, path, flags, perm)?;
        let child = self.resolver.follow("open", path, child)?;
        self.open_node(child, path, flags)
    }

    fn mkdir(&self, path: &str, perm: Mode) -> FsResult<()> {
        Self::validated("mkdir", path)?;
        if path::is_root(path) {
            return Err(FsError::new("mkdir", path, ErrorKind::AlreadyExists));
        }
        self.insert_new("mkdir", path, Node::directory(perm, self.owner))?;
        debug!(path, perm = %perm.perm(), "mkdir");
        Ok(())
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        Self::validated("remove", path)?;
        Self::reject_root("remove", path)?;
        let parent = self.parent("remove", path)?;
        loop {
            let mut children = parent.children.write();
            let Some(child) = children.get(parent.name).cloned() else {
                return Ok(());
            };
            if let Some(grandchildren) = child.children() {
                // Never wait on the child while the parent is write-locked.
                let Some(listing) = grandchildren.try_read_recursive() else {
                    drop(children);
                    drop(grandchildren.read_recursive());
                    continue;
                };
                if !listing.is_empty() {
                    return Err(FsError::new("remove", path, ErrorKind::NotEmpty));
                }
            }
            children.remove(parent.name);
            debug!(path, "removed");
            return Ok(());
        }
    }

    fn rename(&self, old: &str, new: &str) -> FsResult<()> {
        Self::validated("rename", old)?;
        Self::validated("rename", new)?;
        Self::reject_root("rename", old)?;
        Self::reject_root("rename", new)?;
        if old == new {
            return Ok(());
        }
        if new.starts_with(old) && new[old.len()..].starts_with(path::SEPARATOR) {
            return Err(FsError::new("rename", new, ErrorKind::Invalid));
        }

        let from = self.parent("rename", old)?;
        let to = self.parent("rename", new)?;

        if Arc::ptr_eq(&from.node, &to.node) {
            let mut children = from.children.write();
            let node = children
                .remove(from.name)
                .ok_or_else(|| FsError::new("rename", old, ErrorKind::NotFound))?;
            children.insert(to.name.to_string(), node);
        } else {
            let (mut src, mut dst) = lock_pair(
                (&from.node, &*from.children),
                (&to.node, &*to.children),
            );
            let node = src
                .remove(from.name)
                .ok_or_else(|| FsError::new("rename", old, ErrorKind::NotFound))?;
            dst.insert(to.name.to_string(), node);
        }
        debug!(old, new, "renamed");
        Ok(())
    }

    fn same_file(&self, a: &FileInfo, b: &FileInfo) -> bool {
        a.path == b.path
    }

    fn as_stat(&self) -> Option<&dyn StatFs> {
        Some(self)
    }

    fn as_chmod(&self) -> Option<&dyn ChmodFs> {
        Some(self)
    }

    fn as_chown(&self) -> Option<&dyn ChownFs> {
        Some(self)
    }

    fn as_chtimes(&self) -> Option<&dyn ChtimesFs> {
        Some(self)
    }

    fn as_remove_all(&self) -> Option<&dyn RemoveAllFs> {
        Some(self)
    }

    fn as_mkdir_all(&self) -> Option<&dyn MkdirAllFs> {
        Some(self)
    }

    fn as_link(&self) -> Option<&dyn LinkFs> {
        Some(self)
    }

    fn as_readlink(&self) -> Option<&dyn ReadlinkFs> {
        Some(self)
    }

    fn as_symlink(&self) -> Option<&dyn SymlinkFs> {
        Some(self)
    }
}

impl StatFs for MemFs {
    fn stat(&self, path: &str) -> FsResult<FileInfo> {
        Self::validated("stat", path)?;
        let node = self.lookup_following("stat", path)?;
        Ok(node.with_shared(|node| node.info(path)))
    }
}

impl ChmodFs for MemFs {
    fn chmod(&self, path: &str, mode: Mode) -> FsResult<()> {
        Self::validated("chmod", path)?;
        let node = self.lookup_following("chmod", path)?;
        node.with_shared(|node| node.set_perm(mode));
        debug!(path, mode = %mode.perm(), "chmod");
        Ok(())
    }
}

impl ChownFs for MemFs {
    fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        Self::validated("chown", path)?;
        let node = self.lookup_following("chown", path)?;
        node.with_shared(|node| node.set_owner(uid, gid));
        debug!(path, uid, gid, "chown");
        Ok(())
    }
}

impl ChtimesFs for MemFs {
    fn chtimes(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> FsResult<()> {
        Self::validated("chtimes", path)?;
        let node = self.lookup_following("chtimes", path)?;
        node.with_shared(|node| node.set_times(atime, mtime));
        debug!(path, "chtimes");
        Ok(())
    }
}

impl RemoveAllFs for MemFs {
    /// Detaches the whole subtree at once; open handles below it stay usable.
    fn remove_all(&self, path: &str) -> FsResult<()> {
        Self::validated("remove_all", path)?;
        Self::reject_root("remove_all", path)?;
        let parent = match self.parent("remove_all", path) {
            Ok(parent) => parent,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if parent.children.write().remove(parent.name).is_some() {
            debug!(path, "removed tree");
        }
        Ok(())
    }
}

impl MkdirAllFs for MemFs {
    fn mkdir_all(&self, path: &str, perm: Mode) -> FsResult<()> {
        Self::validated("mkdir", path)?;
        let mut dir = self.resolver.root().clone();
        let mut walked = String::new();
        for segment in path.split(path::SEPARATOR).filter(|s| !path::is_root(s)) {
            walked = path::join(&walked, segment);
            let children = dir
                .children()
                .cloned()
                .ok_or_else(|| FsError::new("mkdir", path, ErrorKind::Invalid))?;
            let existing = children.read_recursive().get(segment).cloned();
            let next = match existing {
                Some(node) => self.resolver.follow("mkdir", &walked, node)?,
                None => {
                    let mut guard = children.write();
                    // Re-check under the same lock we insert with.
                    match guard.get(segment) {
                        Some(node) => node.clone(),
                        None => {
                            let node = Node::directory(perm, self.owner);
                            guard.insert(segment.to_string(), node.clone());
                            debug!(path = %walked, perm = %perm.perm(), "mkdir");
                            node
                        }
                    }
                }
            };
            if !next.is_dir() {
                return Err(FsError::new("mkdir", path, ErrorKind::Invalid).with_component(walked));
            }
            dir = next;
        }
        Ok(())
    }
}

impl LinkFs for MemFs {
    fn link(&self, old: &str, new: &str) -> FsResult<()> {
        Self::validated("link", old)?;
        Self::validated("link", new)?;
        let node = self.lookup("link", old)?;
        if node.is_dir() {
            return Err(FsError::new("link", old, ErrorKind::Invalid));
        }
        Self::reject_root("link", new)?;
        self.insert_new("link", new, node)?;
        debug!(old, new, "link");
        Ok(())
    }
}

impl ReadlinkFs for MemFs {
    fn readlink(&self, path: &str) -> FsResult<String> {
        Self::validated("readlink", path)?;
        self.lookup("readlink", path)?
            .symlink_target()
            .ok_or_else(|| FsError::new("readlink", path, ErrorKind::Invalid))
    }
}

impl SymlinkFs for MemFs {
    /// `old` is stored verbatim and need not exist.
    fn symlink(&self, old: &str, new: &str) -> FsResult<()> {
        Self::validated("symlink", new)?;
        Self::reject_root("symlink", new)?;
        self.insert_new("symlink", new, Node::symlink(old, self.owner))?;
        debug!(old, new, "symlink");
        Ok(())
    }
}
