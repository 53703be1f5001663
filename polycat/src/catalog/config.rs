// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Catalog configuration

use super::error::CatalogResult;
use crate::storage::{probe_writable, StorageType};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the catalog file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Durable if the configured location is writable, in-memory otherwise
    Auto,
    Persistent,
    Memory,
}

/// Configuration for opening a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Location of the catalog file
    pub path: PathBuf,

    pub storage_mode: StorageMode,

    /// Discard any existing catalog file before opening
    pub reset: bool,

    /// Delete the catalog file when the catalog is closed
    pub temporary: bool,

    /// Create the default `public` namespace on an empty catalog
    pub init_defaults: bool,

    /// Interval of the periodic partition re-evaluation job
    pub periodic_interval_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./polycat-data/catalog"),
            storage_mode: StorageMode::Auto,
            reset: false,
            temporary: false,
            init_defaults: true,
            periodic_interval_secs: 10,
        }
    }
}

impl CatalogConfig {
    /// Memory-only catalog, nothing touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            storage_mode: StorageMode::Memory,
            ..Self::default()
        }
    }

    /// Durable catalog at `path`
    pub fn persistent<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            storage_mode: StorageMode::Persistent,
            ..Self::default()
        }
    }

    /// Durable while open, removed on close
    pub fn temporary<P: AsRef<Path>>(path: P) -> Self {
        Self {
            temporary: true,
            ..Self::persistent(path)
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Pick the driver for this configuration, probing the path in `Auto` mode
    pub fn resolve_storage_type(&self) -> StorageType {
        match self.storage_mode {
            StorageMode::Memory => StorageType::Memory,
            StorageMode::Persistent => StorageType::Sled,
            StorageMode::Auto => {
                if cfg!(feature = "sled-backend") && probe_writable(&self.path) {
                    StorageType::Sled
                } else {
                    warn!(
                        "Catalog location {} is not writable, using an in-memory catalog",
                        self.path.display()
                    );
                    StorageType::Memory
                }
            }
        }
    }
}
