// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Partition groups and partitions
//!
//! A table owns one or more partition groups, each owning one or more
//! partitions. An unpartitioned table has exactly one unbound group with one
//! partition. The table's [`PartitionProperty`] is always replaced as a whole.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::Catalog;
use super::pattern::Pattern;
use log::debug;

/// Name of the group every new table starts with
pub const DEFAULT_PARTITION_GROUP: &str = "full";

impl Catalog {
    /// Create a group and its partitions for `table_id`
    #[allow(clippy::too_many_arguments)]
    pub fn add_partition_group(
        &self,
        table_id: u64,
        name: &str,
        namespace_id: u64,
        partition_type: PartitionType,
        number_of_partitions: usize,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        self.table(table_id)?;
        let (group_id, _) = self.create_partition_group(
            table_id,
            name,
            namespace_id,
            partition_type,
            number_of_partitions,
            qualifiers,
            is_unbound,
        )?;
        Ok(group_id)
    }

    /// The single unbound group of an unpartitioned table
    pub(crate) fn create_default_partition_group(
        &self,
        table_id: u64,
        namespace_id: u64,
    ) -> CatalogResult<(u64, Vec<u64>)> {
        self.create_partition_group(
            table_id,
            DEFAULT_PARTITION_GROUP,
            namespace_id,
            PartitionType::None,
            1,
            Vec::new(),
            true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn create_partition_group(
        &self,
        table_id: u64,
        name: &str,
        namespace_id: u64,
        partition_type: PartitionType,
        number_of_partitions: usize,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> CatalogResult<(u64, Vec<u64>)> {
        self.namespace(namespace_id)?;
        if number_of_partitions == 0 {
            return Err(CatalogError::InvalidParameters(format!(
                "partition group '{}' needs at least one partition",
                name
            )));
        }
        let group_id = self.ids.partition_group.next();
        let mut partition_ids = Vec::with_capacity(number_of_partitions);
        for _ in 0..number_of_partitions {
            partition_ids.push(self.insert_partition(
                table_id,
                namespace_id,
                group_id,
                qualifiers.clone(),
                is_unbound,
            )?);
        }
        let group = PartitionGroup {
            id: group_id,
            name: name.to_string(),
            table_id,
            namespace_id,
            partition_ids: partition_ids.clone(),
            is_unbound,
        };
        self.store.partition_groups.put(&group_id, &group)?;
        debug!(
            "Added {} group '{}' ({}) with {} partitions to table {}",
            partition_type.as_str(),
            name,
            group_id,
            number_of_partitions,
            table_id
        );
        self.emit(CatalogEvent::PartitionGroup(Change::created(group)));
        Ok((group_id, partition_ids))
    }

    /// Create a partition inside an existing group of the table
    pub fn add_partition(
        &self,
        table_id: u64,
        namespace_id: u64,
        group_id: u64,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        self.table(table_id)?;
        self.partition_group(group_id)?;
        let id = self.insert_partition(table_id, namespace_id, group_id, qualifiers, is_unbound)?;
        self.add_partition_to_group(group_id, id)?;
        Ok(id)
    }

    fn insert_partition(
        &self,
        table_id: u64,
        namespace_id: u64,
        group_id: u64,
        qualifiers: Vec<String>,
        is_unbound: bool,
    ) -> CatalogResult<u64> {
        let id = self.ids.partition.next();
        let partition = Partition {
            id,
            table_id,
            namespace_id,
            group_id,
            qualifiers,
            is_unbound,
        };
        self.store.partitions.put(&id, &partition)?;
        self.emit(CatalogEvent::Partition(Change::created(partition)));
        Ok(id)
    }

    /// Drop a group together with its partitions and their placements
    pub fn delete_partition_group(
        &self,
        table_id: u64,
        namespace_id: u64,
        group_id: u64,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let group = self.partition_group(group_id)?;
        if group.table_id != table_id {
            return Err(CatalogError::InvalidParameters(format!(
                "partition group {} does not belong to table {}",
                group_id, table_id
            )));
        }
        for partition_id in &group.partition_ids {
            self.delete_partition(table_id, namespace_id, *partition_id)?;
        }
        let table = self.table(table_id)?;
        if table.partition_property.partition_group_ids.contains(&group_id) {
            let mut property = table.partition_property.clone();
            property.partition_group_ids.retain(|id| *id != group_id);
            self.replace_table(
                table.clone(),
                Table {
                    partition_property: property,
                    ..table
                },
            )?;
        }
        self.store.partition_groups.remove(&group_id);
        debug!("Deleted partition group '{}' ({})", group.name, group_id);
        self.emit(CatalogEvent::PartitionGroup(Change::deleted(group)));
        Ok(())
    }

    /// Drop a partition and every placement of it
    pub fn delete_partition(
        &self,
        table_id: u64,
        namespace_id: u64,
        partition_id: u64,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let partition = self.partition(partition_id)?;
        if partition.table_id != table_id || partition.namespace_id != namespace_id {
            return Err(CatalogError::InvalidParameters(format!(
                "partition {} does not belong to table {}",
                partition_id, table_id
            )));
        }
        for placement in self.get_partition_placements(partition_id)? {
            self.remove_partition_placement_row(placement.adapter_id, partition_id)?;
        }
        if self.store.partition_groups.contains(&partition.group_id)? {
            self.remove_partition_from_group(partition.group_id, partition_id)?;
        }
        let table = self.table(table_id)?;
        if table.partition_property.partition_ids.contains(&partition_id) {
            let mut property = table.partition_property.clone();
            property.partition_ids.retain(|id| *id != partition_id);
            self.replace_table(
                table.clone(),
                Table {
                    partition_property: property,
                    ..table
                },
            )?;
        }
        self.store.partitions.remove(&partition_id);
        self.emit(CatalogEvent::Partition(Change::deleted(partition)));
        Ok(())
    }

    fn replace_partition_group(&self, old: PartitionGroup, new: PartitionGroup) -> CatalogResult<()> {
        self.store.partition_groups.put(&new.id, &new)?;
        self.emit(CatalogEvent::PartitionGroup(Change::replaced(old, new)));
        Ok(())
    }

    /// Replace the partition list of a group
    pub fn update_partition_group(&self, group_id: u64, partition_ids: Vec<u64>) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.partition_group(group_id)?;
        for id in &partition_ids {
            self.partition(*id)?;
        }
        let new = PartitionGroup {
            partition_ids,
            ..old.clone()
        };
        self.replace_partition_group(old, new)
    }

    pub fn add_partition_to_group(&self, group_id: u64, partition_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.partition_group(group_id)?;
        self.partition(partition_id)?;
        if old.partition_ids.contains(&partition_id) {
            return Ok(());
        }
        let mut new = old.clone();
        new.partition_ids.push(partition_id);
        self.replace_partition_group(old, new)
    }

    pub fn remove_partition_from_group(&self, group_id: u64, partition_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.partition_group(group_id)?;
        if !old.partition_ids.contains(&partition_id) {
            return Ok(());
        }
        let mut new = old.clone();
        new.partition_ids.retain(|id| *id != partition_id);
        self.replace_partition_group(old, new)
    }

    /// Move a partition into another group of the same table
    pub fn update_partition(&self, partition_id: u64, group_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.partition(partition_id)?;
        let target = self.partition_group(group_id)?;
        if target.table_id != old.table_id {
            return Err(CatalogError::InvalidParameters(format!(
                "partition group {} belongs to another table",
                group_id
            )));
        }
        if old.group_id == group_id {
            return Ok(());
        }
        self.remove_partition_from_group(old.group_id, partition_id)?;
        self.add_partition_to_group(group_id, partition_id)?;
        let new = Partition {
            group_id,
            ..old.clone()
        };
        self.store.partitions.put(&partition_id, &new)?;
        self.emit(CatalogEvent::Partition(Change::replaced(old, new)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Table-level partitioning
    // -----------------------------------------------------------------------

    /// Install a new partition property on a table
    pub fn partition_table(&self, table_id: u64, property: PartitionProperty) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let periodic = property.relies_on_periodic_checks;
        self.update_table_partition_properties(table_id, property)?;
        if periodic {
            self.add_table_to_periodic_processing(table_id)?;
        } else {
            self.remove_table_from_periodic_processing(table_id);
        }
        Ok(())
    }

    /// Undo partitioning: a fresh default group replaces all existing groups
    ///
    /// Every adapter that held part of the table receives a placement of the new
    /// partition, then the old groups and their placements are dropped.
    pub fn merge_table(&self, table_id: u64) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        self.remove_table_from_periodic_processing(table_id);

        let (group_id, partition_ids) =
            self.create_default_partition_group(table_id, table.namespace_id)?;
        self.update_table_partition_properties(
            table_id,
            PartitionProperty::unpartitioned(group_id, partition_ids.clone()),
        )?;

        for placement in self.get_data_placements(table_id)? {
            for partition_id in &partition_ids {
                self.add_partition_placement(
                    table.namespace_id,
                    placement.adapter_id,
                    table_id,
                    *partition_id,
                    placement.placement_type,
                    None,
                    None,
                    placement.role,
                )?;
            }
        }
        for old_group in &table.partition_property.partition_group_ids {
            self.delete_partition_group(table_id, table.namespace_id, *old_group)?;
        }
        debug!("Merged table '{}' into partition group {}", table.name, group_id);
        Ok(group_id)
    }

    pub fn update_table_partition_properties(
        &self,
        table_id: u64,
        property: PartitionProperty,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.table(table_id)?;
        for group_id in &property.partition_group_ids {
            if self.partition_group(*group_id)?.table_id != table_id {
                return Err(CatalogError::InvalidParameters(format!(
                    "partition group {} belongs to another table",
                    group_id
                )));
            }
        }
        let new = Table {
            partition_property: property,
            ..old.clone()
        };
        self.replace_table(old, new)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_partition_group(&self, group_id: u64) -> CatalogResult<PartitionGroup> {
        self.partition_group(group_id)
    }

    pub fn get_partition(&self, partition_id: u64) -> CatalogResult<Partition> {
        self.partition(partition_id)
    }

    /// Groups of a table, in the order of its partition property
    pub fn get_partition_groups(&self, table_id: u64) -> CatalogResult<Vec<PartitionGroup>> {
        self.table(table_id)?
            .partition_property
            .partition_group_ids
            .iter()
            .map(|id| self.partition_group(*id))
            .collect()
    }

    pub fn get_partition_groups_by_pattern(
        &self,
        namespace_pattern: Option<&Pattern>,
        table_pattern: Option<&Pattern>,
    ) -> CatalogResult<Vec<PartitionGroup>> {
        let mut groups = Vec::new();
        for table in self.get_tables_by_pattern(namespace_pattern, table_pattern)? {
            groups.extend(self.get_partition_groups(table.id)?);
        }
        Ok(groups)
    }

    /// Partitions of a group, in group order
    pub fn get_partitions(&self, group_id: u64) -> CatalogResult<Vec<Partition>> {
        self.partition_group(group_id)?
            .partition_ids
            .iter()
            .map(|id| self.partition(*id))
            .collect()
    }

    pub fn get_partitions_by_table(&self, table_id: u64) -> CatalogResult<Vec<Partition>> {
        self.table(table_id)?
            .partition_property
            .partition_ids
            .iter()
            .map(|id| self.partition(*id))
            .collect()
    }

    pub fn get_partitions_by_pattern(
        &self,
        namespace_pattern: Option<&Pattern>,
        table_pattern: Option<&Pattern>,
    ) -> CatalogResult<Vec<Partition>> {
        let mut partitions = Vec::new();
        for group in self.get_partition_groups_by_pattern(namespace_pattern, table_pattern)? {
            partitions.extend(self.get_partitions(group.id)?);
        }
        Ok(partitions)
    }

    pub fn get_partition_group_names(&self, table_id: u64) -> CatalogResult<Vec<String>> {
        Ok(self
            .get_partition_groups(table_id)?
            .into_iter()
            .map(|g| g.name)
            .collect())
    }

    pub fn get_table_from_partition(&self, partition_id: u64) -> CatalogResult<Table> {
        let partition = self.partition(partition_id)?;
        self.table(partition.table_id)
    }

    pub fn get_partition_group_by_partition(&self, partition_id: u64) -> CatalogResult<PartitionGroup> {
        let partition = self.partition(partition_id)?;
        self.partition_group(partition.group_id)
    }
}
