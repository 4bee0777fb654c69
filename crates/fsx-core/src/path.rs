// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logical slash-separated paths.
//!
//! Paths are relative to the filesystem root and never start with a separator.
//! The empty path and `"."` both address the root.

use crate::error::ErrorKind;

pub const SEPARATOR: char = '/';

pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == "."
}

/// Checks the path against the validity rule: no leading or trailing separator,
/// no empty segments and no `.`/`..` segments.
pub fn validate(path: &str) -> Result<(), ErrorKind> {
    if is_root(path) {
        return Ok(());
    }
    let valid = path
        .split(SEPARATOR)
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(ErrorKind::Invalid)
    }
}

/// Splits off the final element: `"a/b/c"` becomes `("a/b", "c")`, `"c"` becomes `("", "c")`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rsplit_once(SEPARATOR) {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Splits off the first element: `"a/b/c"` becomes `("a", Some("b/c"))`.
pub fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.split_once(SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

pub fn base(path: &str) -> &str {
    if is_root(path) {
        return ".";
    }
    split(path).1
}

pub fn join(dir: &str, name: &str) -> String {
    if is_root(dir) {
        name.to_string()
    } else {
        format!("{}{}{}", dir, SEPARATOR, name)
    }
}
