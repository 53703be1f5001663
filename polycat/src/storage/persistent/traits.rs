// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! This module defines the core traits for storage drivers and trees.
//! All storage drivers must implement these traits to provide a consistent interface.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// A single staged write: `Some(value)` inserts, `None` removes.
pub type BatchEntry = (Vec<u8>, Option<Vec<u8>>);

/// Boxed iterator over key-value pairs in key order.
pub type TreeIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Trait for a tree in the storage driver
///
/// Represents a named, key-ordered collection of key-value pairs within a
/// storage driver. Iteration always yields keys in ascending byte order.
pub trait StorageTree: Send + Sync {
    /// Insert a key-value pair
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Get a value by key
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Remove a key-value pair
    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    /// Check if a key exists
    fn contains_key(&self, key: &[u8]) -> StorageResult<bool>;

    /// Clear all data in the tree
    fn clear(&self) -> StorageResult<()>;

    /// Check if the tree is empty
    fn is_empty(&self) -> StorageResult<bool>;

    /// Number of entries in the tree
    fn len(&self) -> StorageResult<usize>;

    /// Iterate over all key-value pairs in key order
    fn iter(&self) -> StorageResult<TreeIter<'_>>;

    /// Scan with a key prefix, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<TreeIter<'_>>;

    /// Apply a set of inserts and removals as one atomic batch
    fn apply_batch(&self, entries: &[BatchEntry]) -> StorageResult<()>;

    /// Flush any pending writes to disk
    fn flush(&self) -> StorageResult<()>;
}

/// Main storage driver trait
///
/// Defines the interface that all storage drivers must implement.
/// Provides methods for opening databases and managing trees.
pub trait StorageDriver: Send + Sync {
    /// Type of tree used by this driver
    type Tree: StorageTree;

    /// Open or create a storage driver at the given path
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open or create a named tree
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    /// List all available trees
    fn list_trees(&self) -> StorageResult<Vec<String>>;

    /// Drop a tree and all of its entries
    fn drop_tree(&self, name: &str) -> StorageResult<()>;

    /// Flush all pending writes to disk
    fn flush(&self) -> StorageResult<()>;

    /// Get storage type
    fn storage_type(&self) -> StorageType;

    /// Get statistics for a tree
    fn tree_stats(&self, name: &str) -> StorageResult<Option<TreeStatistics>>;

    /// Explicitly close the storage driver and release any file locks
    fn shutdown(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

// Helper implementation for Box<dyn StorageTree>
// This allows us to use boxed trait objects seamlessly
impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        (**self).contains_key(key)
    }

    fn clear(&self) -> StorageResult<()> {
        (**self).clear()
    }

    fn is_empty(&self) -> StorageResult<bool> {
        (**self).is_empty()
    }

    fn len(&self) -> StorageResult<usize> {
        (**self).len()
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        (**self).iter()
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<TreeIter<'_>> {
        (**self).scan_prefix(prefix)
    }

    fn apply_batch(&self, entries: &[BatchEntry]) -> StorageResult<()> {
        (**self).apply_batch(entries)
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}

/// Tree statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct TreeStatistics {
    /// Number of entries
    pub entry_count: u64,
    /// Total size of keys and values in bytes
    pub size_bytes: u64,
}
