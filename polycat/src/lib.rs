// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! PolyCat - persistent metadata catalog for a polystore
//!
//! PolyCat keeps the schema of a multi-model database (relational tables,
//! document collections, property graphs, views) together with the physical
//! placement of every column and partition across heterogeneous storage
//! adapters. State lives in an embedded key-value store (Sled) or in memory.
//!
//! # Usage
//!
//! ```ignore
//! use polycat::catalog::{Catalog, CatalogConfig, EntityType};
//!
//! let catalog = Catalog::open(CatalogConfig::persistent("./polycat-data/catalog"))?;
//! let public = catalog.get_namespace_by_name("public")?;
//! let emps = catalog.add_table("emps", public.id, "admin", EntityType::Entity, true)?;
//! // ... columns and a primary key, then
//! catalog.commit()?;
//! ```

pub mod catalog;
pub mod storage;

pub use catalog::{Catalog, CatalogConfig, CatalogError, CatalogResult};

/// PolyCat version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PolyCat crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
