// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `std::io` adapter for [`File`] handles

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::fs::File;
use crate::types::Whence;

/// Borrows a handle as `Read + Write + Seek`.
///
/// ```ignore
/// let mut file = fs.open("notes.txt")?;
/// let mut text = String::new();
/// FileIo::new(file.as_mut()).read_to_string(&mut text)?;
/// ```
pub struct FileIo<'a> {
    file: &'a mut dyn File,
}

impl<'a> FileIo<'a> {
    pub fn new(file: &'a mut dyn File) -> Self {
        Self { file }
    }
}

impl Read for FileIo<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.is_eof() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Write for FileIo<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.file.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FileIo<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(n) => (
                i64::try_from(n).map_err(|_| invalid_offset())?,
                Whence::Start,
            ),
            SeekFrom::Current(n) => (n, Whence::Current),
            // Handles count end offsets backwards.
            SeekFrom::End(n) => (n.checked_neg().ok_or_else(invalid_offset)?, Whence::End),
        };
        Ok(self.file.seek(offset, whence as i32)?)
    }
}

fn invalid_offset() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
}
