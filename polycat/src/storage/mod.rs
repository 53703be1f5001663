// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key-value storage underneath the catalog

pub mod persistent;

pub use persistent::{
    create_storage_driver, probe_writable, reset_storage, BoxedDriver, StorageDriver,
    StorageDriverError, StorageTree, StorageType, TreeStatistics,
};
