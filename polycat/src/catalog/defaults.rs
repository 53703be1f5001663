// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sample HR schema on a read-only CSV source adapter

use super::entities::*;
use super::error::CatalogResult;
use super::manager::{Catalog, DEFAULT_NAMESPACE, SYSTEM_USER};
use log::info;
use std::collections::BTreeMap;

pub const SAMPLE_ADAPTER: &str = "hr";

impl Catalog {
    /// Add adapter `hr` with tables `depts` and `emps` in the default namespace
    ///
    /// Returns the adapter id. The caller commits.
    pub fn add_sample_schema(&self) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let namespace = self.get_namespace_by_name(DEFAULT_NAMESPACE)?.id;
        let mut settings = BTreeMap::new();
        settings.insert("directory".to_string(), "classpath://hr".to_string());
        let adapter = self.add_adapter(SAMPLE_ADAPTER, "csv", AdapterKind::Source, settings)?;

        let integer = || ColumnType::new(PolyType::Integer);
        let name = || ColumnType::new(PolyType::Varchar).with_length(20);

        let depts = self.add_source_table(
            namespace,
            adapter,
            "depts",
            vec![("deptno", integer()), ("name", name())],
        )?;
        let emps = self.add_source_table(
            namespace,
            adapter,
            "emps",
            vec![
                ("empid", integer()),
                ("deptno", integer()),
                ("name", name()),
                ("salary", integer()),
                ("commission", integer()),
            ],
        )?;

        self.add_primary_key(depts[0].0, &[depts[0].1])?;
        self.add_primary_key(emps[0].0, &[emps[0].1])?;
        self.add_foreign_key(
            emps[1].0,
            &[emps[1].1],
            depts[0].0,
            &[depts[0].1],
            "fk_emps_depts",
            ForeignKeyOption::None,
            ForeignKeyOption::None,
        )?;
        info!("Added sample schema on adapter '{}'", SAMPLE_ADAPTER);
        Ok(adapter)
    }

    /// Returns (table id, column id) per column
    fn add_source_table(
        &self,
        namespace_id: u64,
        adapter_id: u64,
        name: &str,
        columns: Vec<(&str, ColumnType)>,
    ) -> CatalogResult<Vec<(u64, u64)>> {
        let table = self.add_table(name, namespace_id, SYSTEM_USER, EntityType::Source, false)?;
        self.add_data_placement(adapter_id, table)?;
        let mut ids = Vec::with_capacity(columns.len());
        for (position, (column, column_type)) in columns.into_iter().enumerate() {
            let collation = column_type
                .base
                .is_character()
                .then(Collation::default);
            let column_id = self.add_column(column, table, position as u32, column_type, false, collation)?;
            self.add_column_placement(
                adapter_id,
                column_id,
                PlacementType::Static,
                Some(name),
                Some(column),
            )?;
            ids.push((table, column_id));
        }
        let namespace = self.table(table)?.namespace_id;
        for partition_id in self.table(table)?.partition_property.partition_ids {
            self.add_partition_placement(
                namespace,
                adapter_id,
                table,
                partition_id,
                PlacementType::Static,
                Some(DEFAULT_NAMESPACE),
                Some(name),
                DataPlacementRole::UpToDate,
            )?;
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_schema_commits_cleanly() {
        let catalog = Catalog::in_memory().unwrap();
        let adapter = catalog.add_sample_schema().unwrap();
        catalog.commit().unwrap();

        let emps = catalog.get_table_by_names("public", "emps").unwrap();
        assert_eq!(emps.entity_type, EntityType::Source);
        assert_eq!(emps.adapter_ids, vec![adapter]);
        assert_eq!(catalog.get_all_full_data_placements(emps.id).unwrap().len(), 1);
        assert_eq!(catalog.get_foreign_keys(emps.id).unwrap()[0].name, "fk_emps_depts");
        assert!(catalog.consistency_violations().unwrap().is_empty());
    }
}
