// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! fsx test utilities
//!
//! - Each test writes a unique log file under `target/test-logs/`
//! - On success a test prints one line; on failure it prints the log path and size
//! - `tracing` output from the crates under test lands in the same file
//!
//! Tests opt in with `#[fsx_test_utils::logged_test]`, which binds a
//! `logger: &mut TestLogger` inside the test body.

extern crate self as fsx_test_utils;

pub mod guard;
pub mod logging;
pub mod macros;

pub use fsx_test_utils_macros::logged_test;
pub use guard::{TestLoggerGuard, LOG_FILTER_ENV};
pub use logging::{create_unique_test_log, TestLogError, TestLogger};
