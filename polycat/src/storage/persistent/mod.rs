// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent storage backends
//!
//! This module provides trait-based abstractions for ordered key-value storage,
//! allowing the catalog store to run on sled or on in-memory trees interchangeably.
//!
//! # Architecture
//!
//! ```text
//! CatalogStore (typed collections, staged writes)
//!     ↓
//! StorageDriver (key-value abstraction)
//!     ↓
//! Concrete Implementations (Sled, Memory)
//! ```

// Core modules
pub mod factory;
pub mod traits;
pub mod types;

// Driver implementations
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;

// Public API re-exports
pub use factory::{create_storage_driver, probe_writable, reset_storage, BoxedDriver};
pub use traits::{BatchEntry, StorageDriver, StorageTree, TreeStatistics};
pub use types::{StorageDriverError, StorageResult, StorageType};
