// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Interfaces of the components the catalog talks to but does not own

use super::entities::{QueryLanguage, Table};
use super::error::CatalogResult;
use std::fmt::Debug;
use std::sync::Arc;

/// Root of a reconstructed query plan, opaque to the catalog
pub trait PlanNode: Debug + Send + Sync {
    /// Short human-readable description
    fn describe(&self) -> String;
}

/// Registry of deployed storage adapters
pub trait AdapterRegistry {
    /// Whether data on the adapter survives a restart
    fn is_persistent(&self, adapter_id: u64) -> bool;

    /// Ask the adapter to (re-)create the physical table for `table`
    fn create_physical_table(&self, adapter_id: u64, table: &Table) -> CatalogResult<()>;
}

/// Query processor used to rebuild view plans from their stored text
pub trait QueryProcessor {
    fn translate(
        &self,
        query: &str,
        language: QueryLanguage,
        view: &Table,
    ) -> CatalogResult<Arc<dyn PlanNode>>;
}
