// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent metadata catalog
//!
//! The catalog describes every logical schema object (namespaces, tables,
//! document collections, graphs, views, columns, keys, constraints, indexes)
//! and, separately, where the data of each object lives: which adapters hold
//! which columns and partitions. [`Catalog`] is the single entry point.

pub mod collaborators;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod manager;
pub mod pattern;
pub mod periodic;
pub mod store;

// Operations on the catalog, implemented as `impl Catalog` blocks
mod adapters;
mod defaults;
mod keys;
mod multimodel;
mod partitions;
mod placement;
mod restore;
mod schema;
mod validator;

pub use collaborators::{AdapterRegistry, PlanNode, QueryProcessor};
pub use config::{CatalogConfig, StorageMode};
pub use defaults::SAMPLE_ADAPTER;
pub use entities::*;
pub use error::{CatalogError, CatalogResult};
pub use events::{CatalogEvent, CatalogListener, Change, EventKind, ListenerId};
pub use manager::{Catalog, CatalogStatistics, DEFAULT_NAMESPACE, SYSTEM_USER};
pub use partitions::DEFAULT_PARTITION_GROUP;
pub use pattern::Pattern;
pub use periodic::PeriodicTask;
