// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data, column and partition placements
//!
//! A [`DataPlacement`] aggregates what one adapter holds of one table. The
//! narrow [`ColumnPlacement`] and [`PartitionPlacement`] rows carry physical
//! names and are merged into the aggregate when added. On removal the narrow
//! row goes first, then the aggregate is updated.
//!
//! Removals that shrink coverage are checked with
//! [`Catalog::validate_data_placements_constraints`]: every column of a table
//! must stay available for every partition on at least one adapter.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::Catalog;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

impl Catalog {
    // -----------------------------------------------------------------------
    // Data placements
    // -----------------------------------------------------------------------

    /// Register that `adapter_id` holds (part of) `table_id`
    pub fn add_data_placement(&self, adapter_id: u64, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        if self.store.data_placements.contains(&(adapter_id, table_id))? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "data placement of table {} on adapter {}",
                table_id, adapter_id
            )));
        }
        self.adapter(adapter_id)?;
        let old_table = self.table(table_id)?;
        let placement = DataPlacement::new(table_id, adapter_id);
        self.store
            .data_placements
            .put(&(adapter_id, table_id), &placement)?;

        let mut new_table = old_table.clone();
        if !new_table.adapter_ids.contains(&adapter_id) {
            new_table.adapter_ids.push(adapter_id);
        }
        self.replace_table(old_table, new_table)?;
        debug!("Added data placement of table {} on adapter {}", table_id, adapter_id);
        self.emit(CatalogEvent::DataPlacement(Change::created(placement)));
        Ok(())
    }

    pub fn add_data_placement_if_not_exists(&self, adapter_id: u64, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        if self.store.data_placements.contains(&(adapter_id, table_id))? {
            return Ok(());
        }
        self.add_data_placement(adapter_id, table_id)
    }

    /// Drop everything `adapter_id` holds of `table_id`
    ///
    /// Refused if the remaining placements would no longer cover the table.
    pub fn remove_data_placement(&self, adapter_id: u64, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let placement = self.get_data_placement(adapter_id, table_id)?;
        let columns: Vec<u64> = placement.column_ids.iter().copied().collect();
        let partitions: Vec<u64> = placement.all_partition_ids().into_iter().collect();
        if !self.validate_data_placements_constraints(table_id, adapter_id, &columns, &partitions)? {
            return Err(CatalogError::InvariantViolation(format!(
                "removing adapter {} would leave table {} without full coverage",
                adapter_id, table_id
            )));
        }

        for column_id in &columns {
            if self
                .store
                .column_placements
                .contains(&(adapter_id, *column_id))?
            {
                self.delete_column_placement(adapter_id, *column_id, true)?;
            }
        }
        for partition_id in &partitions {
            self.remove_partition_placement_row(adapter_id, *partition_id)?;
        }

        let placement = self.get_data_placement(adapter_id, table_id)?;
        self.store.data_placements.remove(&(adapter_id, table_id));
        let old_table = self.table(table_id)?;
        let mut new_table = old_table.clone();
        new_table.adapter_ids.retain(|id| *id != adapter_id);
        self.replace_table(old_table, new_table)?;
        debug!("Removed data placement of table {} on adapter {}", table_id, adapter_id);
        self.emit(CatalogEvent::DataPlacement(Change::deleted(placement)));
        Ok(())
    }

    /// Replace the column and partition sets of a data placement
    pub fn update_data_placement(
        &self,
        adapter_id: u64,
        table_id: u64,
        column_ids: Vec<u64>,
        partition_ids: Vec<u64>,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_data_placement(adapter_id, table_id)?;
        let new = old.with_contents(
            column_ids.into_iter().collect(),
            partition_ids.into_iter().collect(),
        );
        self.replace_data_placement(old, new)
    }

    fn replace_data_placement(&self, old: DataPlacement, new: DataPlacement) -> CatalogResult<()> {
        self.store
            .data_placements
            .put(&(new.adapter_id, new.table_id), &new)?;
        self.emit(CatalogEvent::DataPlacement(Change::replaced(old, new)));
        Ok(())
    }

    pub fn get_data_placement(&self, adapter_id: u64, table_id: u64) -> CatalogResult<DataPlacement> {
        self.store
            .data_placements
            .get(&(adapter_id, table_id))?
            .ok_or_else(|| {
                CatalogError::UnknownPlacement(format!(
                    "table {} on adapter {}",
                    table_id, adapter_id
                ))
            })
    }

    /// Data placements of a table, one per adapter
    pub fn get_data_placements(&self, table_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        Ok(self
            .store
            .data_placements
            .values()?
            .into_iter()
            .filter(|p| p.table_id == table_id)
            .collect())
    }

    pub fn get_data_placements_on_adapter(&self, adapter_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        Ok(self
            .store
            .data_placements
            .scan_prefix(&adapter_id)?
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    /// Placements holding every column and every partition
    pub fn get_all_full_data_placements(&self, table_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        let table = self.table(table_id)?;
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .filter(|p| p.has_full_placement(&table))
            .collect())
    }

    pub fn get_all_column_full_data_placements(&self, table_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        let table = self.table(table_id)?;
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .filter(|p| p.has_column_full_placement(&table))
            .collect())
    }

    pub fn get_all_partition_full_data_placements(
        &self,
        table_id: u64,
    ) -> CatalogResult<Vec<DataPlacement>> {
        let table = self.table(table_id)?;
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .filter(|p| p.has_partition_full_placement(&table))
            .collect())
    }

    pub fn get_data_placements_by_role(
        &self,
        table_id: u64,
        role: DataPlacementRole,
    ) -> CatalogResult<Vec<DataPlacement>> {
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .filter(|p| p.role == role)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Column placements
    // -----------------------------------------------------------------------

    /// Place a column on an adapter, creating the data placement on first use
    pub fn add_column_placement(
        &self,
        adapter_id: u64,
        column_id: u64,
        placement_type: PlacementType,
        physical_schema_name: Option<&str>,
        physical_column_name: Option<&str>,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let column = self.column(column_id)?;
        let adapter = self.adapter(adapter_id)?;
        if self
            .store
            .column_placements
            .contains(&(adapter_id, column_id))?
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "placement of column '{}' on adapter '{}'",
                column.name, adapter.unique_name
            )));
        }
        let placement = ColumnPlacement {
            namespace_id: column.namespace_id,
            table_id: column.table_id,
            column_id,
            adapter_id,
            adapter_unique_name: adapter.unique_name,
            placement_type,
            physical_schema_name: physical_schema_name.map(str::to_string),
            physical_column_name: physical_column_name.map(str::to_string),
            physical_position: self.ids.physical_position.next(),
        };
        self.store
            .column_placements
            .put(&(adapter_id, column_id), &placement)?;

        self.add_data_placement_if_not_exists(adapter_id, column.table_id)?;
        let old = self.get_data_placement(adapter_id, column.table_id)?;
        let mut new = old.clone();
        new.column_ids.insert(column_id);
        self.replace_data_placement(old, new)?;

        debug!(
            "Placed column '{}' ({}) on adapter {}",
            column.name, column_id, adapter_id
        );
        self.emit(CatalogEvent::ColumnPlacement(Change::created(placement)));
        Ok(())
    }

    /// Remove a column from an adapter
    ///
    /// Unless `column_only` is set or the table is flagged for deletion, the
    /// removal is refused if it would leave the column uncovered.
    pub fn delete_column_placement(
        &self,
        adapter_id: u64,
        column_id: u64,
        column_only: bool,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let placement = self.get_column_placement(adapter_id, column_id)?;
        if !column_only
            && !self.validate_data_placements_constraints(
                placement.table_id,
                adapter_id,
                &[column_id],
                &[],
            )?
        {
            return Err(CatalogError::InvariantViolation(format!(
                "column {} would no longer be available for every partition",
                column_id
            )));
        }
        self.store.column_placements.remove(&(adapter_id, column_id));
        if let Some(old) = self
            .store
            .data_placements
            .get(&(adapter_id, placement.table_id))?
        {
            let mut new = old.clone();
            new.column_ids.remove(&column_id);
            self.replace_data_placement(old, new)?;
        }
        debug!("Removed column {} from adapter {}", column_id, adapter_id);
        self.emit(CatalogEvent::ColumnPlacement(Change::deleted(placement)));
        Ok(())
    }

    pub fn get_column_placement(&self, adapter_id: u64, column_id: u64) -> CatalogResult<ColumnPlacement> {
        self.store
            .column_placements
            .get(&(adapter_id, column_id))?
            .ok_or_else(|| {
                CatalogError::UnknownPlacement(format!(
                    "column {} on adapter {}",
                    column_id, adapter_id
                ))
            })
    }

    pub fn check_if_exists_column_placement(&self, adapter_id: u64, column_id: u64) -> CatalogResult<bool> {
        self.store.column_placements.contains(&(adapter_id, column_id))
    }

    /// Every placement of one column
    pub fn get_column_placements_by_column(&self, column_id: u64) -> CatalogResult<Vec<ColumnPlacement>> {
        Ok(self
            .store
            .column_placements
            .values()?
            .into_iter()
            .filter(|p| p.column_id == column_id)
            .collect())
    }

    pub fn get_column_placements_on_adapter(&self, adapter_id: u64) -> CatalogResult<Vec<ColumnPlacement>> {
        Ok(self
            .store
            .column_placements
            .scan_prefix(&adapter_id)?
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    /// Placements of one table on one adapter, ordered by column position
    pub fn get_column_placements_on_adapter_per_table(
        &self,
        adapter_id: u64,
        table_id: u64,
    ) -> CatalogResult<Vec<ColumnPlacement>> {
        let mut placements = Vec::new();
        for placement in self.get_column_placements_on_adapter(adapter_id)? {
            if placement.table_id == table_id {
                let position = self.column(placement.column_id)?.position;
                placements.push((position, placement));
            }
        }
        placements.sort_by_key(|(position, p)| (*position, p.column_id));
        Ok(placements.into_iter().map(|(_, p)| p).collect())
    }

    pub fn get_column_placements_on_adapter_and_namespace(
        &self,
        adapter_id: u64,
        namespace_id: u64,
    ) -> CatalogResult<Vec<ColumnPlacement>> {
        Ok(self
            .get_column_placements_on_adapter(adapter_id)?
            .into_iter()
            .filter(|p| p.namespace_id == namespace_id)
            .collect())
    }

    /// Adapter id -> ids of the table's columns placed there
    pub fn get_column_placements_by_adapter(&self, table_id: u64) -> CatalogResult<BTreeMap<u64, Vec<u64>>> {
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .map(|p| (p.adapter_id, p.column_ids.into_iter().collect()))
            .collect())
    }

    /// Adapter id -> ids of the table's partitions placed there
    pub fn get_partition_placements_by_adapter(
        &self,
        table_id: u64,
    ) -> CatalogResult<BTreeMap<u64, Vec<u64>>> {
        Ok(self
            .get_data_placements(table_id)?
            .into_iter()
            .map(|p| (p.adapter_id, p.all_partition_ids().into_iter().collect()))
            .collect())
    }

    /// Placements of one column on the adapters holding part of a partition group
    pub fn get_column_placements_by_partition_group(
        &self,
        table_id: u64,
        group_id: u64,
        column_id: u64,
    ) -> CatalogResult<Vec<ColumnPlacement>> {
        let adapters: BTreeSet<u64> = self
            .get_adapters_by_partition_group(table_id, group_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        Ok(self
            .get_column_placements_by_column(column_id)?
            .into_iter()
            .filter(|p| adapters.contains(&p.adapter_id))
            .collect())
    }

    /// Adapters holding at least one partition of the group
    pub fn get_adapters_by_partition_group(&self, table_id: u64, group_id: u64) -> CatalogResult<Vec<Adapter>> {
        let group = self.partition_group(group_id)?;
        if group.table_id != table_id {
            return Err(CatalogError::InvalidParameters(format!(
                "partition group {} belongs to another table",
                group_id
            )));
        }
        let mut adapter_ids = BTreeSet::new();
        for partition_id in &group.partition_ids {
            for placement in self.get_partition_placements(*partition_id)? {
                adapter_ids.insert(placement.adapter_id);
            }
        }
        adapter_ids.into_iter().map(|id| self.adapter(id)).collect()
    }

    /// Groups with at least one partition held by the data placement
    pub fn get_partition_groups_on_data_placement(
        &self,
        adapter_id: u64,
        table_id: u64,
    ) -> CatalogResult<Vec<u64>> {
        let mut groups = BTreeSet::new();
        for partition_id in self.get_partitions_on_data_placement(adapter_id, table_id)? {
            groups.insert(self.partition(partition_id)?.group_id);
        }
        Ok(groups.into_iter().collect())
    }

    pub fn get_partitions_on_data_placement(&self, adapter_id: u64, table_id: u64) -> CatalogResult<Vec<u64>> {
        Ok(self
            .get_data_placement(adapter_id, table_id)?
            .all_partition_ids()
            .into_iter()
            .collect())
    }

    /// Positions, within the table's partition property, of the groups held by the data placement
    pub fn get_partition_groups_index_on_data_placement(
        &self,
        adapter_id: u64,
        table_id: u64,
    ) -> CatalogResult<Vec<usize>> {
        let table = self.table(table_id)?;
        let held = self.get_partition_groups_on_data_placement(adapter_id, table_id)?;
        Ok(table
            .partition_property
            .partition_group_ids
            .iter()
            .enumerate()
            .filter(|(_, g)| held.contains(g))
            .map(|(i, _)| i)
            .collect())
    }

    fn replace_column_placement(&self, old: ColumnPlacement, new: ColumnPlacement) -> CatalogResult<()> {
        self.store
            .column_placements
            .put(&(new.adapter_id, new.column_id), &new)?;
        self.emit(CatalogEvent::ColumnPlacement(Change::replaced(old, new)));
        Ok(())
    }

    pub fn update_column_placement_type(
        &self,
        adapter_id: u64,
        column_id: u64,
        placement_type: PlacementType,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_column_placement(adapter_id, column_id)?;
        let new = ColumnPlacement {
            placement_type,
            ..old.clone()
        };
        self.replace_column_placement(old, new)
    }

    /// Set the physical position explicitly, or allocate a fresh one with `None`
    pub fn update_column_placement_physical_position(
        &self,
        adapter_id: u64,
        column_id: u64,
        position: Option<u64>,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_column_placement(adapter_id, column_id)?;
        let physical_position = match position {
            Some(position) => {
                self.ids.physical_position.reseed(Some(position));
                position
            }
            None => self.ids.physical_position.next(),
        };
        let new = ColumnPlacement {
            physical_position,
            ..old.clone()
        };
        self.replace_column_placement(old, new)
    }

    pub fn update_column_placement_physical_names(
        &self,
        adapter_id: u64,
        column_id: u64,
        physical_schema_name: &str,
        physical_column_name: &str,
        update_physical_position: bool,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_column_placement(adapter_id, column_id)?;
        let physical_position = if update_physical_position {
            self.ids.physical_position.next()
        } else {
            old.physical_position
        };
        let new = ColumnPlacement {
            physical_schema_name: Some(physical_schema_name.to_string()),
            physical_column_name: Some(physical_column_name.to_string()),
            physical_position,
            ..old.clone()
        };
        self.replace_column_placement(old, new)
    }

    // -----------------------------------------------------------------------
    // Partition placements
    // -----------------------------------------------------------------------

    /// Place a partition on an adapter; a no-op if it is already placed there
    #[allow(clippy::too_many_arguments)]
    pub fn add_partition_placement(
        &self,
        namespace_id: u64,
        adapter_id: u64,
        table_id: u64,
        partition_id: u64,
        placement_type: PlacementType,
        physical_schema_name: Option<&str>,
        physical_table_name: Option<&str>,
        role: DataPlacementRole,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        if self
            .store
            .partition_placements
            .contains(&(adapter_id, partition_id))?
        {
            return Ok(());
        }
        let adapter = self.adapter(adapter_id)?;
        let partition = self.partition(partition_id)?;
        if partition.table_id != table_id {
            return Err(CatalogError::InvalidParameters(format!(
                "partition {} does not belong to table {}",
                partition_id, table_id
            )));
        }
        let placement = PartitionPlacement {
            namespace_id,
            table_id,
            adapter_id,
            adapter_unique_name: adapter.unique_name,
            placement_type,
            physical_schema_name: physical_schema_name.map(str::to_string),
            physical_table_name: physical_table_name.map(str::to_string),
            partition_id,
            role,
        };
        self.store
            .partition_placements
            .put(&(adapter_id, partition_id), &placement)?;

        self.add_data_placement_if_not_exists(adapter_id, table_id)?;
        let old = self.get_data_placement(adapter_id, table_id)?;
        let mut new = old.clone();
        new.partition_ids_by_role
            .entry(role)
            .or_default()
            .insert(partition_id);
        self.replace_data_placement(old, new)?;

        debug!("Placed partition {} on adapter {}", partition_id, adapter_id);
        self.emit(CatalogEvent::PartitionPlacement(Change::created(placement)));
        Ok(())
    }

    /// Remove a partition from an adapter, refused if it would leave the partition uncovered
    pub fn delete_partition_placement(&self, adapter_id: u64, partition_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let placement = self.get_partition_placement(adapter_id, partition_id)?;
        if !self.validate_data_placements_constraints(
            placement.table_id,
            adapter_id,
            &[],
            &[partition_id],
        )? {
            return Err(CatalogError::InvariantViolation(format!(
                "partition {} would no longer be available for every column",
                partition_id
            )));
        }
        self.remove_partition_placement_row(adapter_id, partition_id)
    }

    /// Unchecked removal, for partitions that are themselves being dropped
    pub(crate) fn remove_partition_placement_row(
        &self,
        adapter_id: u64,
        partition_id: u64,
    ) -> CatalogResult<()> {
        let placement = match self
            .store
            .partition_placements
            .get(&(adapter_id, partition_id))?
        {
            Some(placement) => placement,
            None => return Ok(()),
        };
        self.store
            .partition_placements
            .remove(&(adapter_id, partition_id));
        if let Some(old) = self
            .store
            .data_placements
            .get(&(adapter_id, placement.table_id))?
        {
            let mut new = old.clone();
            for ids in new.partition_ids_by_role.values_mut() {
                ids.remove(&partition_id);
            }
            new.partition_ids_by_role.retain(|_, ids| !ids.is_empty());
            self.replace_data_placement(old, new)?;
        }
        debug!("Removed partition {} from adapter {}", partition_id, adapter_id);
        self.emit(CatalogEvent::PartitionPlacement(Change::deleted(placement)));
        Ok(())
    }

    pub fn get_partition_placement(
        &self,
        adapter_id: u64,
        partition_id: u64,
    ) -> CatalogResult<PartitionPlacement> {
        self.store
            .partition_placements
            .get(&(adapter_id, partition_id))?
            .ok_or_else(|| {
                CatalogError::UnknownPlacement(format!(
                    "partition {} on adapter {}",
                    partition_id, adapter_id
                ))
            })
    }

    pub fn check_if_exists_partition_placement(&self, adapter_id: u64, partition_id: u64) -> CatalogResult<bool> {
        self.store
            .partition_placements
            .contains(&(adapter_id, partition_id))
    }

    pub fn get_partition_placements_on_adapter(
        &self,
        adapter_id: u64,
    ) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .store
            .partition_placements
            .scan_prefix(&adapter_id)?
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    pub fn get_partition_placements_on_adapter_by_table(
        &self,
        adapter_id: u64,
        table_id: u64,
    ) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .get_partition_placements_on_adapter(adapter_id)?
            .into_iter()
            .filter(|p| p.table_id == table_id)
            .collect())
    }

    pub fn get_all_partition_placements_by_table(&self, table_id: u64) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .store
            .partition_placements
            .values()?
            .into_iter()
            .filter(|p| p.table_id == table_id)
            .collect())
    }

    /// Every placement of one partition
    pub fn get_partition_placements(&self, partition_id: u64) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .store
            .partition_placements
            .values()?
            .into_iter()
            .filter(|p| p.partition_id == partition_id)
            .collect())
    }

    pub fn get_partition_placements_by_role(
        &self,
        table_id: u64,
        role: DataPlacementRole,
    ) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .get_all_partition_placements_by_table(table_id)?
            .into_iter()
            .filter(|p| p.role == role)
            .collect())
    }

    pub fn get_partition_placements_by_id_and_role(
        &self,
        table_id: u64,
        partition_id: u64,
        role: DataPlacementRole,
    ) -> CatalogResult<Vec<PartitionPlacement>> {
        Ok(self
            .get_partition_placements_by_role(table_id, role)?
            .into_iter()
            .filter(|p| p.partition_id == partition_id)
            .collect())
    }

    pub fn update_partition_placement_physical_names(
        &self,
        adapter_id: u64,
        partition_id: u64,
        physical_schema_name: &str,
        physical_table_name: &str,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_partition_placement(adapter_id, partition_id)?;
        let new = PartitionPlacement {
            physical_schema_name: Some(physical_schema_name.to_string()),
            physical_table_name: Some(physical_table_name.to_string()),
            ..old.clone()
        };
        self.store
            .partition_placements
            .put(&(adapter_id, partition_id), &new)?;
        self.emit(CatalogEvent::PartitionPlacement(Change::replaced(old, new)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Coverage check
    // -----------------------------------------------------------------------

    /// Whether every column of the table stays available for every partition
    /// after removing `columns_to_remove` and `partitions_to_remove` from `adapter_id`
    ///
    /// Always true for tables flagged for deletion and for empty removals.
    pub fn validate_data_placements_constraints(
        &self,
        table_id: u64,
        adapter_id: u64,
        columns_to_remove: &[u64],
        partitions_to_remove: &[u64],
    ) -> CatalogResult<bool> {
        if (columns_to_remove.is_empty() && partitions_to_remove.is_empty())
            || self.is_table_flagged_for_deletion(table_id)
        {
            return Ok(true);
        }
        let table = self.table(table_id)?;
        let placements = self.get_data_placements(table_id)?;
        if placements
            .iter()
            .any(|p| p.adapter_id != adapter_id && p.has_full_placement(&table))
        {
            return Ok(true);
        }

        for column_id in &table.column_ids {
            let mut required: BTreeSet<u64> =
                table.partition_property.partition_ids.iter().copied().collect();
            for placement in &placements {
                if !placement.column_ids.contains(column_id) {
                    continue;
                }
                let mut offered = placement.all_partition_ids();
                if placement.adapter_id == adapter_id {
                    if columns_to_remove.contains(column_id) {
                        continue;
                    }
                    for partition_id in partitions_to_remove {
                        offered.remove(partition_id);
                    }
                }
                required.retain(|p| !offered.contains(p));
            }
            if !required.is_empty() {
                debug!(
                    "Column {} of table {} would lose partitions {:?}",
                    column_id, table_id, required
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
