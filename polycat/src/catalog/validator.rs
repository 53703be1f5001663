// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Consistency validator
//!
//! Structural checks over the whole catalog: every reference resolves and
//! every parent/child index agrees with the entities it indexes. Violations
//! are reported, never repaired.

use super::error::{CatalogError, CatalogResult};
use super::manager::Catalog;
use log::{error, info};
use std::collections::HashSet;

impl Catalog {
    /// Run every check and fail with an integrity error listing all violations
    pub fn validate(&self) -> CatalogResult<()> {
        let violations = self.consistency_violations()?;
        if violations.is_empty() {
            info!("Catalog consistency check passed");
            return Ok(());
        }
        for violation in &violations {
            error!("Catalog inconsistency: {}", violation);
        }
        Err(CatalogError::Integrity(format!(
            "{} inconsistencies, first: {}",
            violations.len(),
            violations[0]
        )))
    }

    /// Every violation found, as human-readable lines
    pub fn consistency_violations(&self) -> CatalogResult<Vec<String>> {
        let s = &self.store;
        let mut v = Vec::new();

        let namespace_ids: HashSet<u64> = s.namespaces.keys()?.into_iter().collect();
        let table_ids: HashSet<u64> = s.tables.keys()?.into_iter().collect();
        let column_ids: HashSet<u64> = s.columns.keys()?.into_iter().collect();
        let adapter_ids: HashSet<u64> = s.adapters.keys()?.into_iter().collect();
        let key_ids: HashSet<u64> = s.keys.keys()?.into_iter().collect();
        let partition_ids: HashSet<u64> = s.partitions.keys()?.into_iter().collect();

        for namespace in s.namespaces.values()? {
            if s.namespace_names.get(&namespace.name)? != Some(namespace.id) {
                v.push(format!("namespace '{}' is missing from the name index", namespace.name));
            }
            match s.namespace_children.get(&namespace.id)? {
                None => v.push(format!("namespace '{}' has no child list", namespace.name)),
                Some(children) => {
                    for child in children {
                        match s.tables.get(&child)? {
                            Some(t) if t.namespace_id == namespace.id => {}
                            Some(_) => v.push(format!(
                                "table {} is listed under namespace {} but belongs elsewhere",
                                child, namespace.id
                            )),
                            None => v.push(format!(
                                "namespace {} lists missing table {}",
                                namespace.id, child
                            )),
                        }
                    }
                }
            }
        }
        for (name, id) in s.namespace_names.entries()? {
            if !namespace_ids.contains(&id) {
                v.push(format!("namespace name '{}' points to missing namespace {}", name, id));
            }
        }

        for table in s.tables.values()? {
            let t = format!("table '{}' ({})", table.name, table.id);
            if !namespace_ids.contains(&table.namespace_id) {
                v.push(format!("{} references missing namespace {}", t, table.namespace_id));
            } else if !s
                .namespace_children
                .get(&table.namespace_id)?
                .unwrap_or_default()
                .contains(&table.id)
            {
                v.push(format!("{} is not listed under its namespace", t));
            }
            if s.table_names.get(&(table.namespace_id, table.name.clone()))? != Some(table.id) {
                v.push(format!("{} is missing from the name index", t));
            }
            let children = s.table_children.get(&table.id)?;
            for column_id in &table.column_ids {
                match s.columns.get(column_id)? {
                    Some(c) if c.table_id == table.id => {}
                    Some(_) => v.push(format!("{} lists column {} of another table", t, column_id)),
                    None => v.push(format!("{} lists missing column {}", t, column_id)),
                }
                if !children.as_ref().map_or(false, |c| c.contains(column_id)) {
                    v.push(format!("{} column {} is missing from the child list", t, column_id));
                }
            }
            if let Some(pk) = table.primary_key {
                if !key_ids.contains(&pk) {
                    v.push(format!("{} has missing primary key {}", t, pk));
                } else if s.primary_keys.get(&pk)? != Some(table.id) {
                    v.push(format!("{} primary key {} is not indexed", t, pk));
                }
            }
            for adapter_id in &table.adapter_ids {
                if !adapter_ids.contains(adapter_id) {
                    v.push(format!("{} is placed on missing adapter {}", t, adapter_id));
                } else if !s.data_placements.contains(&(*adapter_id, table.id))? {
                    v.push(format!("{} has no data placement on adapter {}", t, adapter_id));
                }
            }
            for group_id in &table.partition_property.partition_group_ids {
                if !s.partition_groups.contains(group_id)? {
                    v.push(format!("{} references missing partition group {}", t, group_id));
                }
            }
            for partition_id in &table.partition_property.partition_ids {
                if !partition_ids.contains(partition_id) {
                    v.push(format!("{} references missing partition {}", t, partition_id));
                }
            }
            for view_id in &table.connected_views {
                if !table_ids.contains(view_id) {
                    v.push(format!("{} is used by missing view {}", t, view_id));
                }
            }
        }

        for column in s.columns.values()? {
            if !table_ids.contains(&column.table_id) {
                v.push(format!("column {} references missing table {}", column.id, column.table_id));
            }
            if s.column_names.get(&(column.table_id, column.name.clone()))? != Some(column.id) {
                v.push(format!("column '{}' ({}) is missing from the name index", column.name, column.id));
            }
            if column.column_type.base.is_character() && column.collation.is_none() {
                v.push(format!("character column {} has no collation", column.id));
            }
        }

        for key in s.keys.values()? {
            if !table_ids.contains(&key.table_id) {
                v.push(format!("key {} references missing table {}", key.id, key.table_id));
            }
            for column_id in &key.column_ids {
                if !column_ids.contains(column_id) {
                    v.push(format!("key {} references missing column {}", key.id, column_id));
                }
            }
            if s.key_columns.get(&key.column_ids)? != Some(key.id) {
                v.push(format!("key {} is missing from the column index", key.id));
            }
        }
        for constraint in s.constraints.values()? {
            if !key_ids.contains(&constraint.key_id) {
                v.push(format!("constraint {} references missing key {}", constraint.id, constraint.key_id));
            }
        }
        for index in s.indexes.values()? {
            if !key_ids.contains(&index.key_id) {
                v.push(format!("index {} references missing key {}", index.id, index.key_id));
            }
            if !adapter_ids.contains(&index.location) {
                v.push(format!("index {} lives on missing adapter {}", index.id, index.location));
            }
        }
        for fk in s.foreign_keys.values()? {
            for key_id in [fk.key_id, fk.referenced_key_id] {
                if !key_ids.contains(&key_id) {
                    v.push(format!("foreign key {} references missing key {}", fk.id, key_id));
                }
            }
        }

        for group in s.partition_groups.values()? {
            if !table_ids.contains(&group.table_id) {
                v.push(format!("partition group {} references missing table {}", group.id, group.table_id));
            }
            for partition_id in &group.partition_ids {
                if !partition_ids.contains(partition_id) {
                    v.push(format!("partition group {} lists missing partition {}", group.id, partition_id));
                }
            }
        }
        for partition in s.partitions.values()? {
            match s.partition_groups.get(&partition.group_id)? {
                Some(g) if g.partition_ids.contains(&partition.id) => {}
                Some(_) => v.push(format!("partition {} is not listed by its group", partition.id)),
                None => v.push(format!("partition {} references missing group {}", partition.id, partition.group_id)),
            }
        }

        for ((adapter_id, table_id), placement) in s.data_placements.entries()? {
            if !adapter_ids.contains(&adapter_id) {
                v.push(format!("data placement on missing adapter {}", adapter_id));
            }
            match s.tables.get(&table_id)? {
                Some(t) if t.adapter_ids.contains(&adapter_id) => {}
                Some(t) => v.push(format!("table '{}' does not list adapter {}", t.name, adapter_id)),
                None => v.push(format!("data placement of missing table {}", table_id)),
            }
            for column_id in &placement.column_ids {
                if !s.column_placements.contains(&(adapter_id, *column_id))? {
                    v.push(format!("data placement lists column {} without column placement on adapter {}", column_id, adapter_id));
                }
            }
        }
        for ((adapter_id, column_id), placement) in s.column_placements.entries()? {
            if !adapter_ids.contains(&adapter_id) {
                v.push(format!("column placement on missing adapter {}", adapter_id));
            }
            if !column_ids.contains(&column_id) {
                v.push(format!("placement of missing column {}", column_id));
            }
            if !table_ids.contains(&placement.table_id) {
                v.push(format!("column placement of missing table {}", placement.table_id));
            }
            match s.data_placements.get(&(adapter_id, placement.table_id))? {
                Some(dp) if dp.column_ids.contains(&column_id) => {}
                _ => v.push(format!(
                    "column {} on adapter {} is missing from its data placement",
                    column_id, adapter_id
                )),
            }
        }
        for ((adapter_id, partition_id), placement) in s.partition_placements.entries()? {
            if !adapter_ids.contains(&adapter_id) {
                v.push(format!("partition placement on missing adapter {}", adapter_id));
            }
            if !partition_ids.contains(&partition_id) {
                v.push(format!("placement of missing partition {}", partition_id));
            }
            match s.data_placements.get(&(adapter_id, placement.table_id))? {
                Some(dp) if dp.all_partition_ids().contains(&partition_id) => {}
                _ => v.push(format!(
                    "partition {} on adapter {} is missing from its data placement",
                    partition_id, adapter_id
                )),
            }
        }

        for graph in s.graphs.values()? {
            if !namespace_ids.contains(&graph.id) {
                v.push(format!("graph '{}' has no namespace", graph.name));
            }
            for adapter_id in &graph.placements {
                if !s.graph_placements.contains(&(graph.id, *adapter_id))? {
                    v.push(format!("graph '{}' lists adapter {} without placement", graph.name, adapter_id));
                }
            }
        }
        for mapping in s.graph_mappings.values()? {
            for table_id in mapping.table_ids() {
                if !table_ids.contains(&table_id) {
                    v.push(format!("graph {} maps to missing table {}", mapping.graph_id, table_id));
                }
            }
        }
        for mapping in s.collection_mappings.values()? {
            if !table_ids.contains(&mapping.collection_id) {
                v.push(format!("collection mapping of missing table {}", mapping.collection_id));
            }
        }

        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entities::*;
    use crate::catalog::manager::DEFAULT_NAMESPACE;

    #[test]
    fn test_fresh_catalog_is_consistent() {
        let catalog = Catalog::in_memory().unwrap();
        assert!(catalog.consistency_violations().unwrap().is_empty());
    }

    #[test]
    fn test_dangling_column_is_reported() {
        let catalog = Catalog::in_memory().unwrap();
        let ns = catalog.get_namespace_by_name(DEFAULT_NAMESPACE).unwrap().id;
        let table = catalog
            .add_table("emps", ns, "system", EntityType::Entity, true)
            .unwrap();
        let column = catalog
            .add_column("id", table, 0, ColumnType::new(PolyType::Integer), false, None)
            .unwrap();
        catalog.store.columns.remove(&column);

        let violations = catalog.consistency_violations().unwrap();
        assert!(violations.iter().any(|v| v.contains("missing column")));
        assert!(catalog.validate().unwrap_err().is_integrity());
    }
}
