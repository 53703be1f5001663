// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Startup restore
//!
//! Adapters that keep their data in memory lose it on restart. After the
//! catalog is opened, their physical tables are re-created, and column copies
//! that only live on such adapters next to a persistent copy are dropped.
//! View plans are rebuilt from their stored query text.

use super::collaborators::{AdapterRegistry, QueryProcessor};
use super::entities::ColumnPlacement;
use super::error::{CatalogError, CatalogResult};
use super::manager::Catalog;
use log::{debug, info};
use std::collections::BTreeSet;

impl Catalog {
    /// Re-materialise tables on non-persistent adapters
    ///
    /// Per column of every non-view table:
    /// - no placement at all is an integrity error
    /// - only volatile placements: each adapter re-creates the physical table (once per table)
    /// - volatile placements next to a persistent one: the volatile placements are dropped
    pub fn restore_column_placements(&self, registry: &dyn AdapterRegistry) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let mut restored: BTreeSet<(u64, u64)> = BTreeSet::new();
        let mut dropped = 0usize;

        for table in self.store.tables.values()? {
            if table.entity_type.is_view() {
                continue;
            }
            for column_id in &table.column_ids {
                let placements = self.get_column_placements_by_column(*column_id)?;
                if placements.is_empty() {
                    return Err(CatalogError::Integrity(format!(
                        "column {} of table '{}' has no placement",
                        column_id, table.name
                    )));
                }
                let (persistent, volatile): (Vec<ColumnPlacement>, Vec<ColumnPlacement>) =
                    placements
                        .into_iter()
                        .partition(|p| registry.is_persistent(p.adapter_id));

                if persistent.is_empty() {
                    for placement in volatile {
                        if restored.insert((placement.adapter_id, table.id)) {
                            debug!(
                                "Re-creating table '{}' on adapter '{}'",
                                table.name, placement.adapter_unique_name
                            );
                            registry.create_physical_table(placement.adapter_id, &table)?;
                        }
                    }
                } else {
                    for placement in volatile {
                        self.delete_column_placement(placement.adapter_id, *column_id, false)?;
                        dropped += 1;
                    }
                }
            }
        }
        info!(
            "Restored {} tables on volatile adapters, dropped {} stale column placements",
            restored.len(),
            dropped
        );
        Ok(())
    }

    /// Rebuild the plans of all views and materialized views
    pub fn restore_views(&self, processor: &dyn QueryProcessor) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let mut count = 0usize;
        for table in self.store.tables.values()? {
            if let Some(definition) = &table.view {
                let plan = processor.translate(&definition.query, definition.language, &table)?;
                self.views.write().insert(table.id, plan);
                count += 1;
            }
        }
        info!("Restored {} view plans", count);
        Ok(())
    }
}
