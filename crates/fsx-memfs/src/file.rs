// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! File handles

use std::sync::Arc;

use fsx_core::{
    Access, DirEntry, ErrorKind, File, FileInfo, FsError, FsResult, Mode, OpenFlags, Whence,
};
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::node::{NodeRef, ReadGuard, WriteGuard};

/// Lock held for the lifetime of a handle.
///
/// Writers work on a private copy of the content and put it back on close, so
/// the node only ever sees whole committed writes.
enum Held {
    Shared(ReadGuard<Vec<u8>>),
    Exclusive {
        guard: WriteGuard<Vec<u8>>,
        buf: Vec<u8>,
    },
}

pub(crate) struct FileHandle {
    node: NodeRef,
    path: String,
    access: Access,
    append: bool,
    cursor: usize,
    held: Held,
    released: bool,
}

impl FileHandle {
    /// Checks permission, then blocks until the content lock is available:
    /// exclusive for writable handles, shared otherwise.
    pub(crate) fn open(
        node: NodeRef,
        content: &Arc<RwLock<Vec<u8>>>,
        path: &str,
        flags: OpenFlags,
        access: Access,
    ) -> FsResult<Self> {
        if !node.permits(access) {
            return Err(FsError::new("open", path, ErrorKind::Permission));
        }

        let held = if access.write {
            let guard = content.write_arc();
            let buf = if flags.contains(OpenFlags::TRUNC) {
                Vec::new()
            } else {
                guard.clone()
            };
            Held::Exclusive { guard, buf }
        } else {
            Held::Shared(content.read_arc())
        };
        trace!(path, write = access.write, "opened file");

        Ok(Self {
            node,
            path: path.to_string(),
            access,
            append: access.write && flags.contains(OpenFlags::APPEND),
            cursor: 0,
            held,
            released: false,
        })
    }

    fn content(&self) -> &[u8] {
        match &self.held {
            Held::Shared(guard) => guard.as_slice(),
            Held::Exclusive { buf, .. } => buf.as_slice(),
        }
    }

    fn error(&self, op: &'static str, kind: ErrorKind) -> FsError {
        FsError::new(op, &self.path, kind)
    }

    /// Commits a writer's buffer and stamps times. Runs once per handle.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match &mut self.held {
            Held::Exclusive { guard, buf } => {
                **guard = std::mem::take(buf);
                self.node.committed(guard.len());
            }
            Held::Shared(_) => self.node.touch(false),
        }
        trace!(path = %self.path, "closed file");
    }
}

impl File for FileHandle {
    fn stat(&self) -> FsResult<FileInfo> {
        Ok(self.node.info(&self.path))
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        if !self.access.read {
            return Err(self.error("read", ErrorKind::Permission));
        }
        let content = self.content();
        if self.cursor >= content.len() {
            return Err(self.error("read", ErrorKind::EndOfFile));
        }
        let n = buf.len().min(content.len() - self.cursor);
        buf[..n].copy_from_slice(&content[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        if !self.access.read {
            return Err(self.error("read", ErrorKind::Permission));
        }
        let content = self.content();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= content.len() {
            return Err(self.error("read", ErrorKind::EndOfFile));
        }
        let n = buf.len().min(content.len() - start);
        buf[..n].copy_from_slice(&content[start..start + n]);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> FsResult<usize> {
        let Held::Exclusive { buf, .. } = &mut self.held else {
            return Err(FsError::new("write", &self.path, ErrorKind::Permission));
        };
        if self.append {
            buf.extend_from_slice(data);
            return Ok(data.len());
        }

        // Overwrite in place, then grow with whatever is left.
        let at = self.cursor.min(buf.len());
        let overlap = data.len().min(buf.len() - at);
        buf[at..at + overlap].copy_from_slice(&data[..overlap]);
        buf.extend_from_slice(&data[overlap..]);
        self.cursor = at + data.len();
        Ok(data.len())
    }

    fn seek(&mut self, offset: i64, whence: i32) -> FsResult<u64> {
        let whence = Whence::try_from(whence).map_err(|kind| self.error("seek", kind))?;
        let len = self.content().len() as u64;
        let pos = whence.apply(offset, self.cursor as u64, len);
        // `apply` never exceeds the content length, which fits in usize.
        self.cursor = pos as usize;
        Ok(pos)
    }

    fn chmod(&mut self, mode: Mode) -> FsResult<()> {
        if !self.access.write {
            return Err(self.error("chmod", ErrorKind::Permission));
        }
        self.node.set_perm(mode);
        Ok(())
    }

    fn chown(&mut self, uid: u32, gid: u32) -> FsResult<()> {
        if !self.access.write {
            return Err(self.error("chown", ErrorKind::Permission));
        }
        self.node.set_owner(uid, gid);
        Ok(())
    }

    fn read_dir(&mut self, _n: isize) -> FsResult<Vec<DirEntry>> {
        Err(self.error("readdir", ErrorKind::Invalid))
    }

    fn close(mut self: Box<Self>) -> FsResult<()> {
        self.release();
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if !self.released && self.access.write {
            warn!(path = %self.path, "writable handle dropped without close, committing");
        }
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind, Owner};

    const OWNER: Owner = Owner { uid: 0, gid: 0 };

    fn file_with(data: &[u8], perm: u32) -> (NodeRef, Arc<RwLock<Vec<u8>>>) {
        let node = Node::file(Mode::from_perm(perm), OWNER);
        let NodeKind::File(content) = node.kind() else {
            unreachable!("Node::file builds a file");
        };
        let content = content.clone();
        *content.write() = data.to_vec();
        node.committed(data.len());
        (node, content)
    }

    fn open(node: &NodeRef, content: &Arc<RwLock<Vec<u8>>>, flags: OpenFlags) -> FileHandle {
        let access = flags.access().expect("one access mode");
        FileHandle::open(node.clone(), content, "f", flags, access).expect("open should succeed")
    }

    #[fsx_test_utils::logged_test]
    fn test_write_only_overwrites_in_place() {
        let (node, content) = file_with(&[1, 2, 3, 4], 0o600);
        let mut handle = open(&node, &content, OpenFlags::WRONLY);
        assert_eq!(handle.write(&[9, 10]).unwrap(), 2);
        Box::new(handle).close().unwrap();
        assert_eq!(*content.read(), vec![9, 10, 3, 4]);
        assert_eq!(node.info("f").size, 4);
    }

    #[fsx_test_utils::logged_test]
    fn test_read_write_shares_cursor() {
        let (node, content) = file_with(&[1, 2, 3, 4], 0o600);
        let mut handle = open(&node, &content, OpenFlags::RDWR);
        let mut one = [0u8; 1];
        assert_eq!(handle.read(&mut one).unwrap(), 1);
        assert_eq!(one, [1]);
        handle.write(&[10, 11]).unwrap();
        Box::new(handle).close().unwrap();
        assert_eq!(*content.read(), vec![1, 10, 11, 4]);
    }

    #[fsx_test_utils::logged_test]
    fn test_append_extends() {
        let (node, content) = file_with(&[1, 2, 3, 4], 0o600);
        let mut handle = open(&node, &content, OpenFlags::WRONLY | OpenFlags::APPEND);
        handle.write(&[12, 13]).unwrap();
        Box::new(handle).close().unwrap();
        assert_eq!(*content.read(), vec![1, 2, 3, 4, 12, 13]);
    }

    #[fsx_test_utils::logged_test]
    fn test_write_past_end_grows() {
        let (node, content) = file_with(&[1, 2, 3], 0o600);
        let mut handle = open(&node, &content, OpenFlags::RDWR);
        handle.seek(2, Whence::Start as i32).unwrap();
        handle.write(&[7, 8, 9]).unwrap();
        assert_eq!(handle.seek(0, Whence::Current as i32).unwrap(), 5);
        Box::new(handle).close().unwrap();
        assert_eq!(*content.read(), vec![1, 2, 7, 8, 9]);
    }

    #[fsx_test_utils::logged_test]
    fn test_truncate_starts_empty() {
        let (node, content) = file_with(b"old content", 0o600);
        let mut handle = open(&node, &content, OpenFlags::WRONLY | OpenFlags::TRUNC);
        handle.write(b"new").unwrap();
        Box::new(handle).close().unwrap();
        assert_eq!(*content.read(), b"new".to_vec());
    }

    #[fsx_test_utils::logged_test]
    fn test_permission_checked_at_open() {
        let (node, content) = file_with(b"x", 0o400);
        let flags = OpenFlags::WRONLY;
        let err = FileHandle::open(node.clone(), &content, "f", flags, flags.access().unwrap())
            .err()
            .expect("write access must be refused");
        assert_eq!(err.kind(), ErrorKind::Permission);

        let flags = OpenFlags::RDONLY;
        assert!(FileHandle::open(node, &content, "f", flags, flags.access().unwrap()).is_ok());
    }

    #[fsx_test_utils::logged_test]
    fn test_access_mode_is_enforced_per_call() {
        let (node, content) = file_with(b"abc", 0o600);

        let mut reader = open(&node, &content, OpenFlags::RDONLY);
        let err = reader.write(b"z").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(reader.chmod(Mode::from_perm(0o644)).unwrap_err().kind(), ErrorKind::Permission);
        drop(reader);

        let mut writer = open(&node, &content, OpenFlags::WRONLY);
        let mut buf = [0u8; 3];
        assert_eq!(writer.read(&mut buf).unwrap_err().kind(), ErrorKind::Permission);
        assert_eq!(writer.read_at(&mut buf, 0).unwrap_err().kind(), ErrorKind::Permission);
    }

    #[fsx_test_utils::logged_test]
    fn test_read_and_read_at_end_of_file() {
        let (node, content) = file_with(&[1, 2, 3, 4, 5, 6], 0o600);
        let mut handle = open(&node, &content, OpenFlags::RDONLY);

        let mut buf = [0u8; 4];
        assert_eq!(handle.read_at(&mut buf, 5).unwrap(), 1);
        assert_eq!(buf[0], 6);
        assert!(handle.read_at(&mut buf, 6).unwrap_err().is_eof());
        assert!(handle.read_at(&mut buf, 7).unwrap_err().is_eof());

        assert_eq!(handle.read(&mut buf).unwrap(), 4);
        assert_eq!(handle.read(&mut buf).unwrap(), 2);
        assert!(handle.read(&mut buf).unwrap_err().is_eof());
    }

    #[fsx_test_utils::logged_test]
    fn test_seek_cases() {
        let (node, content) = file_with(&[0; 10], 0o600);
        let mut handle = open(&node, &content, OpenFlags::RDONLY);

        assert_eq!(handle.seek(4, 0).unwrap(), 4);
        assert_eq!(handle.seek(20, 0).unwrap(), 10);
        assert_eq!(handle.seek(-3, 1).unwrap(), 7);
        assert_eq!(handle.seek(2, 2).unwrap(), 8);
        assert_eq!(handle.seek(15, 2).unwrap(), 0);

        let err = handle.seek(0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWhence);
        assert_eq!(err.op(), "seek");
    }

    #[fsx_test_utils::logged_test]
    fn test_drop_commits_and_unlocks() {
        let (node, content) = file_with(b"", 0o600);
        {
            let mut handle = open(&node, &content, OpenFlags::WRONLY);
            handle.write(b"kept").unwrap();
            assert!(content.try_read().is_none(), "writer holds the lock");
        }
        assert_eq!(*content.read(), b"kept".to_vec());
    }

    #[fsx_test_utils::logged_test]
    fn test_readers_share_the_lock() {
        let (node, content) = file_with(b"shared", 0o600);
        let first = open(&node, &content, OpenFlags::RDONLY);
        let second = open(&node, &content, OpenFlags::RDONLY);
        assert!(content.try_write().is_none());
        drop(first);
        drop(second);
        assert!(content.try_write().is_some());
    }
}
