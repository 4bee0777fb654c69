// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration types for the in-memory filesystem

use serde::{Deserialize, Serialize};

/// Settings for a [`crate::MemFs`] instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemFsConfig {
    /// Permission bits of the root directory.
    pub root_perm: u32,
    /// Owner of nodes created through the façade.
    pub default_uid: u32,
    pub default_gid: u32,
    /// Longest chain of symlinks followed before giving up with a loop error.
    pub max_symlink_depth: usize,
}

impl Default for MemFsConfig {
    fn default() -> Self {
        Self {
            root_perm: 0o777,
            default_uid: 0,
            default_gid: 0,
            max_symlink_depth: 40,
        }
    }
}

impl MemFsConfig {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[fsx_test_utils::logged_test]
    fn test_partial_json_keeps_defaults() {
        let config = MemFsConfig::from_json_bytes(br#"{"root_perm": 448, "default_uid": 1000}"#)
            .expect("config should parse");
        assert_eq!(config.root_perm, 0o700);
        assert_eq!(config.default_uid, 1000);
        assert_eq!(config.default_gid, 0);
        assert_eq!(config.max_symlink_depth, 40);
    }

    #[fsx_test_utils::logged_test]
    fn test_json_round_trip_and_rejects_garbage() {
        let config = MemFsConfig {
            max_symlink_depth: 3,
            ..MemFsConfig::default()
        };
        let json = serde_json::to_vec(&config).unwrap();
        assert_eq!(MemFsConfig::from_json_bytes(&json).unwrap(), config);

        assert!(MemFsConfig::from_json_bytes(b"{\"root_perm\": \"rwx\"}").is_err());
    }
}
