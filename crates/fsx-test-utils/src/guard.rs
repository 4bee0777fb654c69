// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! RAII guard that manages [`TestLogger`] lifecycle for test macros.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::{TestLogError, TestLogger};

/// Environment variable holding the filter for captured library tracing.
pub const LOG_FILTER_ENV: &str = "FSX_TEST_LOG";

/// Guard ensuring that each test finalizes its log correctly.
///
/// While alive, `tracing` events emitted on the test thread are appended to
/// the same log file, filtered by [`LOG_FILTER_ENV`] (default `debug`).
///
/// If the guard is dropped without being marked as completed, or during a
/// panic unwind, it records the failure via [`TestLogger::finish_failure`].
pub struct TestLoggerGuard {
    logger: Option<TestLogger>,
    log_path: PathBuf,
    completed: bool,
    _tracing: DefaultGuard,
}

impl TestLoggerGuard {
    pub fn new(test_name: &str) -> Result<Self, TestLogError> {
        let logger = TestLogger::new(test_name)?;
        let log_path = logger.log_path().to_path_buf();
        let tracing = capture_tracing(&log_path)?;
        Ok(Self {
            logger: Some(logger),
            log_path,
            completed: false,
            _tracing: tracing,
        })
    }

    /// Borrow the underlying logger for writing test diagnostics.
    pub fn logger(&mut self) -> &mut TestLogger {
        self.logger.as_mut().expect("TestLoggerGuard logger already finalized")
    }

    /// Mark the test as successful and finalize the log.
    pub fn finish_success(mut self) -> Result<PathBuf, TestLogError> {
        self.completed = true;
        match self.logger.take() {
            Some(logger) => logger.finish_success(),
            None => Ok(self.log_path.clone()),
        }
    }

    /// Mark the test as failed with a message and finalize the log.
    pub fn finish_failure<S: AsRef<str>>(mut self, message: S) -> Result<PathBuf, TestLogError> {
        self.completed = true;
        match self.logger.take() {
            Some(logger) => logger.finish_failure(message.as_ref()),
            None => Ok(self.log_path.clone()),
        }
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }
}

fn capture_tracing(log_path: &Path) -> Result<DefaultGuard, TestLogError> {
    let file = OpenOptions::new().append(true).open(log_path)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .finish();
    Ok(tracing::subscriber::set_default(subscriber))
}

impl Drop for TestLoggerGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }

        if let Some(logger) = self.logger.take() {
            let reason = if std::thread::panicking() {
                "test panicked"
            } else {
                "test exited without calling finish_success()"
            };

            if let Err(err) = logger.finish_failure(reason) {
                eprintln!(
                    "failed to finalize TestLogger in Drop for {}: {}",
                    self.log_path.display(),
                    err
                );
            }
        }
    }
}
