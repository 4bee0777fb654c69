// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Generic helpers against a backend exposing only the mandatory operations,
//! so every helper takes its fallback path.

use fsx_core::{
    ops, Capabilities, ErrorKind, File, FileInfo, FileIo, FsResult, Mode, OpenFlags, WritableFs,
};
use fsx_memfs::MemFs;

const FILE: Mode = Mode::from_perm(0o644);
const DIR: Mode = Mode::from_perm(0o755);

/// Forwards the mandatory operations and hides every capability.
struct PlainFs(MemFs);

impl WritableFs for PlainFs {
    fn open(&self, path: &str) -> FsResult<Box<dyn File>> {
        self.0.open(path)
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: Mode) -> FsResult<Box<dyn File>> {
        self.0.open_file(path, flags, perm)
    }

    fn mkdir(&self, path: &str, perm: Mode) -> FsResult<()> {
        self.0.mkdir(path, perm)
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        self.0.remove(path)
    }

    fn rename(&self, old: &str, new: &str) -> FsResult<()> {
        self.0.rename(old, new)
    }

    fn same_file(&self, a: &FileInfo, b: &FileInfo) -> bool {
        self.0.same_file(a, b)
    }
}

fn plain() -> PlainFs {
    PlainFs(MemFs::new())
}

#[fsx_test_utils::logged_test]
fn test_plain_backend_advertises_nothing() {
    assert_eq!(plain().capabilities(), Capabilities::empty());
}

#[fsx_test_utils::logged_test]
fn test_write_file_and_stat_fallbacks() -> anyhow::Result<()> {
    let fs = plain();
    ops::write_file(&fs, "notes", b"first draft", FILE)?;
    ops::write_file(&fs, "notes", b"final", FILE)?;
    assert_eq!(ops::read_file(&fs, "notes")?, b"final");

    let info = ops::stat(&fs, "notes")?;
    assert_eq!(info.size, 5);
    assert_eq!(info.name(), "notes");
    assert!(ops::stat(&fs, "missing").unwrap_err().is_not_found());
    Ok(())
}

#[fsx_test_utils::logged_test]
fn test_mkdir_all_fallback() -> anyhow::Result<()> {
    let fs = plain();
    ops::mkdir_all(&fs, "x/y/z", DIR)?;
    ops::mkdir_all(&fs, "x/y", DIR)?;
    assert!(ops::stat(&fs, "x/y/z")?.is_dir());

    ops::write_file(&fs, "x/file", b"", FILE)?;
    let err = ops::mkdir_all(&fs, "x/file", DIR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    Ok(())
}

#[fsx_test_utils::logged_test]
fn test_remove_all_fallback() -> anyhow::Result<()> {
    let fs = plain();
    ops::mkdir_all(&fs, "tree/a/b", DIR)?;
    ops::write_file(&fs, "tree/a/b/leaf", b"1", FILE)?;
    ops::write_file(&fs, "tree/top", b"2", FILE)?;
    ops::write_file(&fs, "keep", b"3", FILE)?;

    ops::remove_all(&fs, "tree")?;
    assert!(ops::stat(&fs, "tree").unwrap_err().is_not_found());
    assert_eq!(ops::read_file(&fs, "keep")?, b"3");

    ops::remove_all(&fs, "tree")?;
    Ok(())
}

#[fsx_test_utils::logged_test]
fn test_chmod_and_chown_fallbacks() -> anyhow::Result<()> {
    let fs = plain();
    ops::write_file(&fs, "f", b"", FILE)?;
    ops::chmod(&fs, "f", Mode::from_perm(0o600))?;
    ops::chown(&fs, "f", 5, 6)?;

    let info = ops::stat(&fs, "f")?;
    assert_eq!(info.mode.perm(), Mode::from_perm(0o600));
    assert_eq!((info.sys.uid, info.sys.gid), (5, 6));
    Ok(())
}

#[fsx_test_utils::logged_test]
fn test_missing_capabilities_are_unsupported() {
    let fs = plain();
    ops::write_file(&fs, "f", b"", FILE).unwrap();

    let unsupported = [
        ops::chtimes(&fs, "f", None, None).unwrap_err(),
        ops::link(&fs, "f", "g").unwrap_err(),
        ops::symlink(&fs, "f", "g").unwrap_err(),
        ops::readlink(&fs, "f").unwrap_err(),
    ];
    for err in unsupported {
        logger.log(&format!("{err}")).unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}

#[fsx_test_utils::logged_test]
fn test_create_truncates_and_opens_read_write() -> anyhow::Result<()> {
    let fs = MemFs::new();
    ops::write_file(&fs, "c", b"old content", FILE)?;

    let mut file = ops::create(&fs, "c")?;
    file.write(b"new")?;
    file.seek(0, 0)?;
    let mut buf = [0u8; 8];
    assert_eq!(file.read(&mut buf)?, 3);
    file.close()?;
    assert_eq!(ops::read_file(&fs, "c")?, b"new");

    let fresh = ops::create(&fs, "fresh")?;
    assert_eq!(fresh.stat()?.mode.perm(), Mode::from_perm(0o666));
    fresh.close()?;
    Ok(())
}

#[fsx_test_utils::logged_test]
fn test_std_io_adapter() -> anyhow::Result<()> {
    use std::io::{Read, Seek, SeekFrom, Write};

    let fs = MemFs::new();
    let mut file = ops::create(&fs, "io")?;
    {
        let mut adapter = FileIo::new(file.as_mut());
        adapter.write_all(b"hello world")?;
        adapter.seek(SeekFrom::Start(6))?;
        let mut tail = String::new();
        adapter.read_to_string(&mut tail)?;
        assert_eq!(tail, "world");

        assert_eq!(adapter.seek(SeekFrom::End(-5))?, 6);
        assert_eq!(adapter.seek(SeekFrom::Current(-6))?, 0);
        let mut head = [0u8; 5];
        adapter.read_exact(&mut head)?;
        assert_eq!(&head, b"hello");
    }
    file.close()?;
    assert_eq!(ops::read_file(&fs, "io")?, b"hello world");
    Ok(())
}
