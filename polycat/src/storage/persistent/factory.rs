// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver factory
//!
//! This module provides factory functions for creating storage drivers based on configuration.
//! It handles the instantiation and setup of different storage driver types, and the
//! write-capability probe used to decide between a durable and an ephemeral catalog.

use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use std::fs::OpenOptions;
use std::path::Path;

/// Boxed driver as handed to the catalog store
pub type BoxedDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Factory function to create a storage driver based on configuration
///
/// # Arguments
/// * `storage_type` - The type of storage driver to create
/// * `path` - The filesystem path where the database should be stored
/// * `temporary` - Remove the database files once the driver is dropped
///
/// # Examples
/// ```ignore
/// use polycat::storage::{create_storage_driver, StorageType};
///
/// let driver = create_storage_driver(StorageType::Sled, "./catalog", false)?;
/// let tree = driver.open_tree("tables")?;
/// ```
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
    temporary: bool,
) -> StorageResult<BoxedDriver> {
    match storage_type {
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            use crate::storage::persistent::sled::SledDriver;
            let driver = if temporary {
                SledDriver::open_temporary(path)?
            } else {
                SledDriver::open(path)?
            };
            Ok(Box::new(driver) as BoxedDriver)
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            let _ = (path, temporary);
            Err(super::types::StorageDriverError::Unavailable(StorageType::Sled))
        }
        StorageType::Memory => {
            use crate::storage::persistent::memory::MemoryStorageDriver;
            let driver = MemoryStorageDriver::open(path)?;
            Ok(Box::new(driver) as BoxedDriver)
        }
    }
}

/// Check whether a catalog file can be created or written at `path`
///
/// Creates the parent directory if needed and writes a probe file next to the
/// catalog location. Any I/O failure counts as "not writable".
pub fn probe_writable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        }
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return false;
    }
    let probe = dir.join(".polycat_write_probe");
    let writable = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&probe)
        .is_ok();
    let _ = std::fs::remove_file(&probe);
    writable
}

/// Remove an existing catalog file or directory
pub fn reset_storage<P: AsRef<Path>>(path: P) -> StorageResult<()> {
    let path = path.as_ref();
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_create_sled_driver() {
        let temp_dir = TempDir::new().unwrap();
        let driver =
            create_storage_driver(StorageType::Sled, temp_dir.path().join("db"), false).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Sled);
    }

    #[test]
    fn test_probe_and_reset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("catalog.db");
        assert!(probe_writable(&path));

        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("conf"), b"x").unwrap();
        reset_storage(&path).unwrap();
        assert!(!path.exists());
        reset_storage(&path).unwrap();
    }
}
