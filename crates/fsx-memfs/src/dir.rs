// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Directory handles and snapshot listings

use std::sync::Arc;

use fsx_core::{path, Access, DirEntry, ErrorKind, File, FileInfo, FsError, FsResult, Mode};
use parking_lot::RwLock;
use tracing::trace;

use crate::node::{Children, NodeRef, ReadGuard, WriteGuard};
use crate::resolve::Resolver;

enum Held {
    Shared(ReadGuard<Children>),
    Exclusive(WriteGuard<Children>),
}

impl Held {
    fn children(&self) -> &Children {
        match self {
            Held::Shared(guard) => &**guard,
            Held::Exclusive(guard) => &**guard,
        }
    }
}

pub(crate) struct DirHandle {
    node: NodeRef,
    path: String,
    writable: bool,
    resolver: Resolver,
    held: Held,
    /// Taken on the first `read_dir` and never refreshed.
    entries: Option<Vec<DirEntry>>,
    cursor: usize,
    released: bool,
}

impl DirHandle {
    /// A writable directory handle exists only to allow chmod/chown through it,
    /// but it still locks the directory exclusively until closed.
    pub(crate) fn open(
        node: NodeRef,
        children: &Arc<RwLock<Children>>,
        path: &str,
        access: Access,
        resolver: Resolver,
    ) -> FsResult<Self> {
        if !node.permits(access) {
            return Err(FsError::new("open", path, ErrorKind::Permission));
        }
        let held = if access.write {
            Held::Exclusive(children.write_arc())
        } else {
            Held::Shared(children.read_arc())
        };
        trace!(path, write = access.write, "opened directory");

        Ok(Self {
            node,
            path: path.to_string(),
            writable: access.write,
            resolver,
            held,
            entries: None,
            cursor: 0,
            released: false,
        })
    }

    fn error(&self, op: &'static str, kind: ErrorKind) -> FsError {
        FsError::new(op, &self.path, kind)
    }

    fn materialize(&self) -> Vec<DirEntry> {
        let mut entries: Vec<DirEntry> = self
            .held
            .children()
            .iter()
            .map(|(name, child)| DirEntry {
                name: name.clone(),
                info: self.entry_info(name, child),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(path = %self.path, count = entries.len(), "materialized listing");
        entries
    }

    /// Symlinks report their target when it resolves and themselves otherwise.
    ///
    /// While this handle holds the directory exclusively, a target path leading
    /// back through it could not be walked, so links report themselves.
    fn entry_info(&self, name: &str, child: &NodeRef) -> FileInfo {
        let child_path = path::join(&self.path, name);
        if child.symlink_target().is_none() || self.writable {
            return child.info(&child_path);
        }
        self.resolver
            .stat_following("readdir", &child_path, child.clone())
            .unwrap_or_else(|_| child.info(&child_path))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.node.touch(self.writable);
        trace!(path = %self.path, "closed directory");
    }
}

impl File for DirHandle {
    fn stat(&self) -> FsResult<FileInfo> {
        Ok(self.node.info(&self.path))
    }

    fn read(&mut self, _buf: &mut [u8]) -> FsResult<usize> {
        Err(self.error("read", ErrorKind::IsADirectory))
    }

    fn read_at(&self, _buf: &mut [u8], _offset: u64) -> FsResult<usize> {
        Err(self.error("read", ErrorKind::IsADirectory))
    }

    fn write(&mut self, _buf: &[u8]) -> FsResult<usize> {
        Err(self.error("write", ErrorKind::IsADirectory))
    }

    fn seek(&mut self, _offset: i64, _whence: i32) -> FsResult<u64> {
        Err(self.error("seek", ErrorKind::IsADirectory))
    }

    fn chmod(&mut self, mode: Mode) -> FsResult<()> {
        if !self.writable {
            return Err(self.error("chmod", ErrorKind::Permission));
        }
        self.node.set_perm(mode);
        Ok(())
    }

    fn chown(&mut self, uid: u32, gid: u32) -> FsResult<()> {
        if !self.writable {
            return Err(self.error("chown", ErrorKind::Permission));
        }
        self.node.set_owner(uid, gid);
        Ok(())
    }

    fn read_dir(&mut self, n: isize) -> FsResult<Vec<DirEntry>> {
        if self.entries.is_none() {
            self.entries = Some(self.materialize());
        }
        let entries = self.entries.as_deref().unwrap_or_default();
        let remaining = &entries[self.cursor.min(entries.len())..];

        if n <= 0 {
            let out = remaining.to_vec();
            self.cursor = entries.len();
            return Ok(out);
        }
        if remaining.is_empty() {
            return Err(FsError::new("readdir", &self.path, ErrorKind::EndOfFile));
        }
        let take = remaining.len().min(n.unsigned_abs());
        let out = remaining[..take].to_vec();
        self.cursor += take;
        Ok(out)
    }

    fn close(mut self: Box<Self>) -> FsResult<()> {
        self.release();
        Ok(())
    }
}

impl Drop for DirHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, Owner};

    const OWNER: Owner = Owner { uid: 0, gid: 0 };

    fn populated(names: &[&str]) -> (NodeRef, Resolver) {
        let root = Node::directory(Mode::PERM, OWNER);
        {
            let mut children = root.children().unwrap().write();
            for name in names {
                let node = if name.starts_with('d') {
                    Node::directory(Mode::from_perm(0o755), OWNER)
                } else {
                    Node::file(Mode::from_perm(0o644), OWNER)
                };
                children.insert(name.to_string(), node);
            }
        }
        let resolver = Resolver::new(root.clone(), 40);
        (root, resolver)
    }

    fn open_dir(node: &NodeRef, resolver: &Resolver, write: bool) -> DirHandle {
        let access = Access { read: true, write };
        DirHandle::open(
            node.clone(),
            node.children().unwrap(),
            "",
            access,
            resolver.clone(),
        )
        .expect("open dir")
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(DirEntry::name).collect()
    }

    #[fsx_test_utils::logged_test]
    fn test_unbounded_listing_is_sorted() {
        let (root, resolver) = populated(&["f2", "d1", "f1", "d2"]);
        let mut dir = open_dir(&root, &resolver, false);
        let entries = dir.read_dir(-1).unwrap();
        assert_eq!(names(&entries), ["d1", "d2", "f1", "f2"]);
        assert!(entries[0].is_dir());
        assert!(!entries[2].is_dir());
        assert_eq!(entries[3].info().path, "f2");

        assert!(dir.read_dir(-1).unwrap().is_empty());
        assert!(dir.read_dir(0).unwrap().is_empty());
    }

    #[fsx_test_utils::logged_test]
    fn test_paged_listing_then_eof() {
        let (root, resolver) = populated(&["f2", "d1", "f1", "d2"]);
        let mut dir = open_dir(&root, &resolver, false);
        assert_eq!(names(&dir.read_dir(3).unwrap()), ["d1", "d2", "f1"]);
        assert_eq!(names(&dir.read_dir(3).unwrap()), ["f2"]);
        assert!(dir.read_dir(3).unwrap_err().is_eof());
    }

    #[fsx_test_utils::logged_test]
    fn test_empty_directory_paged_is_eof() {
        let (root, resolver) = populated(&[]);
        let mut dir = open_dir(&root, &resolver, false);
        assert!(dir.read_dir(1).unwrap_err().is_eof());
    }

    #[fsx_test_utils::logged_test]
    fn test_io_on_directory_fails() {
        let (root, resolver) = populated(&["f1"]);
        let mut dir = open_dir(&root, &resolver, false);
        let mut buf = [0u8; 4];
        assert_eq!(dir.read(&mut buf).unwrap_err().kind(), ErrorKind::IsADirectory);
        assert_eq!(dir.read_at(&mut buf, 0).unwrap_err().kind(), ErrorKind::IsADirectory);
        assert_eq!(dir.write(b"x").unwrap_err().kind(), ErrorKind::IsADirectory);
        assert_eq!(dir.seek(0, 0).unwrap_err().kind(), ErrorKind::IsADirectory);
        assert_eq!(
            dir.chmod(Mode::from_perm(0o700)).unwrap_err().kind(),
            ErrorKind::Permission
        );
    }

    #[fsx_test_utils::logged_test]
    fn test_writable_handle_can_chmod() {
        let (root, resolver) = populated(&[]);
        let mut dir = open_dir(&root, &resolver, true);
        dir.chmod(Mode::from_perm(0o700)).unwrap();
        assert_eq!(dir.stat().unwrap().mode, Mode::DIR | Mode::from_perm(0o700));
        dir.chown(42, 43).unwrap();
        let info = dir.stat().unwrap();
        assert_eq!((info.sys.uid, info.sys.gid), (42, 43));
    }

    #[fsx_test_utils::logged_test]
    fn test_dangling_symlink_entry_reports_link() {
        let (root, resolver) = populated(&["f1"]);
        root.children()
            .unwrap()
            .write()
            .insert("link".to_string(), Node::symlink("gone", OWNER));
        root.children()
            .unwrap()
            .write()
            .insert("alias".to_string(), Node::symlink("f1", OWNER));

        let mut dir = open_dir(&root, &resolver, false);
        let entries = dir.read_dir(-1).unwrap();
        assert_eq!(names(&entries), ["alias", "f1", "link"]);
        assert_eq!(entries[0].file_type(), Mode::empty());
        assert_eq!(entries[0].info().path, "alias");
        assert_eq!(entries[2].file_type(), Mode::SYMLINK);
    }

    #[fsx_test_utils::logged_test]
    fn test_writable_handle_lists_links_unfollowed() {
        let (root, resolver) = populated(&["f1"]);
        root.children()
            .unwrap()
            .write()
            .insert("alias".to_string(), Node::symlink("f1", OWNER));

        let mut reader = open_dir(&root, &resolver, false);
        let followed = reader.read_dir(-1).unwrap();
        drop(reader);
        assert_eq!(followed[0].file_type(), Mode::empty());

        let mut writer = open_dir(&root, &resolver, true);
        let entries = writer.read_dir(-1).unwrap();
        assert_eq!(names(&entries), ["alias", "f1"]);
        assert_eq!(entries[0].file_type(), Mode::SYMLINK);
        assert_eq!(entries[0].info().size, "f1".len() as u64);
        assert_eq!(entries[1].file_type(), Mode::empty());
    }
}
