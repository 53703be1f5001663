// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema graph: namespaces, tables, views and columns
//!
//! Every entity is reachable by id and by its natural key. Names are
//! normalised to lower case unless the owning namespace is case-sensitive.
//! A miss on a natural key is a not-found error; a miss on an id the catalog
//! handed out is an integrity error.

use super::collaborators::PlanNode;
use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::Catalog;
use super::pattern::{self, Pattern};
use chrono::Utc;
use log::debug;
use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;

impl Catalog {
    // -----------------------------------------------------------------------
    // Namespaces
    // -----------------------------------------------------------------------

    /// Create a namespace; document and graph namespaces are always case-sensitive
    pub fn add_namespace(
        &self,
        name: &str,
        model: DataModel,
        case_sensitive: bool,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let name = name.to_lowercase();
        if self.store.namespace_names.contains(&name)? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "namespace '{}'",
                name
            )));
        }
        let id = self.ids.namespace.next();
        self.insert_namespace(Namespace {
            id,
            name,
            owner: super::manager::SYSTEM_USER.to_string(),
            model,
            case_sensitive: case_sensitive || model != DataModel::Relational,
        })?;
        Ok(id)
    }

    pub(crate) fn insert_namespace(&self, namespace: Namespace) -> CatalogResult<()> {
        self.store.namespaces.put(&namespace.id, &namespace)?;
        self.store
            .namespace_names
            .put(&namespace.name, &namespace.id)?;
        self.store
            .namespace_children
            .put(&namespace.id, &Vec::new())?;
        debug!("Added namespace '{}' ({})", namespace.name, namespace.id);
        self.emit(CatalogEvent::Namespace(Change::created(namespace)));
        Ok(())
    }

    pub fn get_namespace(&self, id: u64) -> CatalogResult<Namespace> {
        self.namespace(id)
    }

    pub fn get_namespace_by_name(&self, name: &str) -> CatalogResult<Namespace> {
        let name = name.to_lowercase();
        match self.store.namespace_names.get(&name)? {
            Some(id) => self.namespace(id),
            None => Err(CatalogError::UnknownNamespace(name)),
        }
    }

    /// Namespaces whose name matches `pattern`, in id order
    pub fn get_namespaces(&self, pattern: Option<&Pattern>) -> CatalogResult<Vec<Namespace>> {
        Ok(self
            .store
            .namespaces
            .values()?
            .into_iter()
            .filter(|ns| pattern::matches(pattern, &ns.name))
            .collect())
    }

    pub fn check_if_exists_namespace(&self, name: &str) -> CatalogResult<bool> {
        self.store.namespace_names.contains(&name.to_lowercase())
    }

    pub fn rename_namespace(&self, id: u64, new_name: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.namespace(id)?;
        let new_name = new_name.to_lowercase();
        if new_name == old.name {
            return Ok(());
        }
        if self.store.namespace_names.contains(&new_name)? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "namespace '{}'",
                new_name
            )));
        }
        let new = Namespace {
            name: new_name,
            ..old.clone()
        };
        self.store.namespace_names.remove(&old.name);
        self.store.namespace_names.put(&new.name, &id)?;
        self.store.namespaces.put(&id, &new)?;
        debug!("Renamed namespace '{}' to '{}'", old.name, new.name);
        self.emit(CatalogEvent::Namespace(Change::replaced(old, new)));
        Ok(())
    }

    /// Table ids of a namespace, in creation order
    pub fn get_namespace_children(&self, namespace_id: u64) -> CatalogResult<Vec<u64>> {
        self.store
            .namespace_children
            .get(&namespace_id)?
            .ok_or_else(|| CatalogError::integrity("namespace", namespace_id))
    }

    /// Drop a namespace and everything in it
    ///
    /// Refused if a table outside the namespace holds a foreign key into it or a
    /// view outside the namespace reads from it. Tables are dropped views first.
    pub fn delete_namespace(&self, id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        if self.store.graphs.contains(&id)? {
            return self.delete_graph(id);
        }
        let namespace = self.namespace(id)?;
        let table_ids = self.get_namespace_children(id)?;

        for fk in self.store.foreign_keys.values()? {
            if fk.referenced_namespace_id == id && fk.namespace_id != id {
                return Err(CatalogError::InvariantViolation(format!(
                    "namespace '{}' is referenced by foreign key '{}'",
                    namespace.name, fk.name
                )));
            }
        }
        let mut tables = Vec::with_capacity(table_ids.len());
        for table_id in &table_ids {
            let table = self.table(*table_id)?;
            for view_id in &table.connected_views {
                if self.table(*view_id)?.namespace_id != id {
                    return Err(CatalogError::InvariantViolation(format!(
                        "table '{}' is used by view {} in another namespace",
                        table.name, view_id
                    )));
                }
            }
            tables.push(table);
        }

        for table in &tables {
            for fk in self.get_foreign_keys(table.id)? {
                self.delete_foreign_key(fk.id)?;
            }
        }
        for table_id in drop_order(&tables)? {
            self.delete_table(table_id)?;
        }

        self.store.namespaces.remove(&id);
        self.store.namespace_names.remove(&namespace.name);
        self.store.namespace_children.remove(&id);
        debug!("Deleted namespace '{}' ({})", namespace.name, id);
        self.emit(CatalogEvent::Namespace(Change::deleted(namespace)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    /// Create a table with a single unbound partition
    ///
    /// Outside document namespaces the table stays open (and blocks commit)
    /// until it receives a primary key.
    pub fn add_table(
        &self,
        name: &str,
        namespace_id: u64,
        owner: &str,
        entity_type: EntityType,
        modifiable: bool,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        if entity_type.is_view() {
            return Err(CatalogError::InvalidParameters(
                "views are created with add_view or add_materialized_view".into(),
            ));
        }
        let namespace = self.namespace(namespace_id)?;
        let name = self.available_table_name(&namespace, name)?;
        let id = self.ids.entity.next();
        let (group_id, partition_ids) = self.create_default_partition_group(id, namespace_id)?;

        let table = Table {
            id,
            name,
            namespace_id,
            owner: owner.to_string(),
            entity_type,
            column_ids: Vec::new(),
            primary_key: None,
            adapter_ids: Vec::new(),
            modifiable,
            partition_property: PartitionProperty::unpartitioned(group_id, partition_ids),
            connected_views: Vec::new(),
            view: None,
        };
        self.insert_table(table)?;
        if namespace.model != DataModel::Document {
            self.set_open_table(Some(id));
        }
        Ok(id)
    }

    /// Create a view over the tables listed in `definition.underlying_tables`
    pub fn add_view(
        &self,
        name: &str,
        namespace_id: u64,
        owner: &str,
        definition: ViewDefinition,
        plan: Arc<dyn PlanNode>,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        if definition.materialized.is_some() {
            return Err(CatalogError::InvalidParameters(
                "materialized views are created with add_materialized_view".into(),
            ));
        }
        let namespace = self.namespace(namespace_id)?;
        let name = self.available_table_name(&namespace, name)?;
        let id = self.ids.entity.next();
        let table = Table {
            id,
            name,
            namespace_id,
            owner: owner.to_string(),
            entity_type: EntityType::View,
            column_ids: Vec::new(),
            primary_key: None,
            adapter_ids: Vec::new(),
            modifiable: false,
            partition_property: PartitionProperty::empty(),
            connected_views: Vec::new(),
            view: Some(definition),
        };
        self.insert_view(table, plan)?;
        Ok(id)
    }

    /// Create a materialized view; it owns a default partition group like a table
    pub fn add_materialized_view(
        &self,
        name: &str,
        namespace_id: u64,
        owner: &str,
        definition: ViewDefinition,
        plan: Arc<dyn PlanNode>,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        if definition.materialized.is_none() {
            return Err(CatalogError::InvalidParameters(
                "materialized view requires materialization criteria".into(),
            ));
        }
        let namespace = self.namespace(namespace_id)?;
        let name = self.available_table_name(&namespace, name)?;
        let id = self.ids.entity.next();
        let (group_id, partition_ids) = self.create_default_partition_group(id, namespace_id)?;
        let table = Table {
            id,
            name,
            namespace_id,
            owner: owner.to_string(),
            entity_type: EntityType::MaterializedView,
            column_ids: Vec::new(),
            primary_key: None,
            adapter_ids: Vec::new(),
            modifiable: false,
            partition_property: PartitionProperty::unpartitioned(group_id, partition_ids),
            connected_views: Vec::new(),
            view: Some(definition),
        };
        self.insert_view(table, plan)?;
        Ok(id)
    }

    fn insert_view(&self, view: Table, plan: Arc<dyn PlanNode>) -> CatalogResult<()> {
        let underlying: Vec<u64> = view
            .view
            .as_ref()
            .map(|d| d.underlying_tables.keys().copied().collect())
            .unwrap_or_default();
        for table_id in &underlying {
            self.table(*table_id)?;
        }
        let view_id = view.id;
        self.insert_table(view)?;
        for table_id in underlying {
            let old = self.table(table_id)?;
            let mut new = old.clone();
            if !new.connected_views.contains(&view_id) {
                new.connected_views.push(view_id);
            }
            self.replace_table(old, new)?;
        }
        self.views.write().insert(view_id, plan);
        Ok(())
    }

    fn available_table_name(&self, namespace: &Namespace, name: &str) -> CatalogResult<String> {
        let name = namespace.normalize(name);
        if self
            .store
            .table_names
            .contains(&(namespace.id, name.clone()))?
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "table '{}.{}'",
                namespace.name, name
            )));
        }
        Ok(name)
    }

    fn insert_table(&self, table: Table) -> CatalogResult<()> {
        let mut children = self.get_namespace_children(table.namespace_id)?;
        children.push(table.id);
        self.store
            .namespace_children
            .put(&table.namespace_id, &children)?;
        self.store.tables.put(&table.id, &table)?;
        self.store
            .table_names
            .put(&(table.namespace_id, table.name.clone()), &table.id)?;
        self.store.table_children.put(&table.id, &Vec::new())?;
        debug!(
            "Added {} '{}' ({}) to namespace {}",
            table.entity_type.as_str(),
            table.name,
            table.id,
            table.namespace_id
        );
        self.emit(CatalogEvent::Table(Change::created(table)));
        Ok(())
    }

    /// Install `new` in place of `old` and notify listeners
    pub(crate) fn replace_table(&self, old: Table, new: Table) -> CatalogResult<()> {
        if old.name != new.name {
            self.store
                .table_names
                .remove(&(old.namespace_id, old.name.clone()));
            self.store
                .table_names
                .put(&(new.namespace_id, new.name.clone()), &new.id)?;
        }
        self.store.tables.put(&new.id, &new)?;
        self.emit(CatalogEvent::Table(Change::replaced(old, new)));
        Ok(())
    }

    pub fn get_table(&self, id: u64) -> CatalogResult<Table> {
        self.table(id)
    }

    pub fn get_table_by_name(&self, namespace_id: u64, name: &str) -> CatalogResult<Table> {
        let namespace = self.namespace(namespace_id)?;
        let name = namespace.normalize(name);
        match self.store.table_names.get(&(namespace_id, name.clone()))? {
            Some(id) => self.table(id),
            None => Err(CatalogError::UnknownTable(format!(
                "{}.{}",
                namespace.name, name
            ))),
        }
    }

    pub fn get_table_by_names(&self, namespace_name: &str, table_name: &str) -> CatalogResult<Table> {
        let namespace = self.get_namespace_by_name(namespace_name)?;
        self.get_table_by_name(namespace.id, table_name)
    }

    /// Tables of one namespace whose name matches `pattern`, in id order
    pub fn get_tables(&self, namespace_id: u64, pattern: Option<&Pattern>) -> CatalogResult<Vec<Table>> {
        let mut tables = Vec::new();
        for id in self.get_namespace_children(namespace_id)? {
            let table = self.table(id)?;
            if pattern::matches(pattern, &table.name) {
                tables.push(table);
            }
        }
        tables.sort_by_key(|t| t.id);
        Ok(tables)
    }

    /// Tables across every namespace matching `namespace_pattern`
    pub fn get_tables_by_pattern(
        &self,
        namespace_pattern: Option<&Pattern>,
        table_pattern: Option<&Pattern>,
    ) -> CatalogResult<Vec<Table>> {
        let mut tables = Vec::new();
        for namespace in self.get_namespaces(namespace_pattern)? {
            tables.extend(self.get_tables(namespace.id, table_pattern)?);
        }
        Ok(tables)
    }

    pub fn check_if_exists_table(&self, namespace_id: u64, name: &str) -> CatalogResult<bool> {
        let namespace = self.namespace(namespace_id)?;
        self.store
            .table_names
            .contains(&(namespace_id, namespace.normalize(name)))
    }

    pub fn check_if_exists_table_id(&self, table_id: u64) -> CatalogResult<bool> {
        self.store.tables.contains(&table_id)
    }

    pub fn rename_table(&self, table_id: u64, new_name: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.table(table_id)?;
        let namespace = self.namespace(old.namespace_id)?;
        let new_name = namespace.normalize(new_name);
        if new_name == old.name {
            return Ok(());
        }
        let new_name = self.available_table_name(&namespace, &new_name)?;
        let new = Table {
            name: new_name,
            ..old.clone()
        };
        self.replace_table(old, new)
    }

    pub fn set_table_owner(&self, table_id: u64, owner: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.table(table_id)?;
        let new = Table {
            owner: owner.to_string(),
            ..old.clone()
        };
        self.replace_table(old, new)
    }

    /// Record that a materialized view was refreshed now
    pub fn update_materialized_view_refresh_time(&self, view_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.table(view_id)?;
        let mut new = old.clone();
        match new.view.as_mut().and_then(|d| d.materialized.as_mut()) {
            Some(criteria) => criteria.last_update = Some(Utc::now()),
            None => {
                return Err(CatalogError::InvalidParameters(format!(
                    "'{}' is not a materialized view",
                    old.name
                )))
            }
        }
        self.replace_table(old, new)
    }

    /// Reconstructed plan of a view, if one is loaded
    pub fn get_view_plan(&self, view_id: u64) -> Option<Arc<dyn PlanNode>> {
        self.views.read().get(&view_id).cloned()
    }

    /// Drop a table with its columns, keys, constraints, indexes, partitions and placements
    ///
    /// Refused while views read from the table or another table's foreign key
    /// references it.
    pub fn delete_table(&self, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        if !table.connected_views.is_empty() {
            return Err(CatalogError::InvariantViolation(format!(
                "table '{}' is used by views {:?}",
                table.name, table.connected_views
            )));
        }
        for fk in self.store.foreign_keys.values()? {
            if fk.referenced_table_id == table_id && fk.table_id != table_id {
                return Err(CatalogError::InvariantViolation(format!(
                    "table '{}' is referenced by foreign key '{}'",
                    table.name, fk.name
                )));
            }
        }

        let newly_flagged = self.flagged_for_deletion.lock().insert(table_id);
        let result = self.delete_table_contents(&table);
        if newly_flagged {
            self.flagged_for_deletion.lock().remove(&table_id);
        }
        result?;

        let mut children = self.get_namespace_children(table.namespace_id)?;
        children.retain(|id| *id != table_id);
        self.store
            .namespace_children
            .put(&table.namespace_id, &children)?;
        self.store
            .table_names
            .remove(&(table.namespace_id, table.name.clone()));
        self.store.table_children.remove(&table_id);
        self.store.tables.remove(&table_id);
        if self.open_table() == Some(table_id) {
            self.set_open_table(None);
        }
        debug!("Deleted table '{}' ({})", table.name, table_id);
        self.emit(CatalogEvent::Table(Change::deleted(table)));
        Ok(())
    }

    fn delete_table_contents(&self, table: &Table) -> CatalogResult<()> {
        let table_id = table.id;
        for fk in self.get_foreign_keys(table_id)? {
            self.delete_foreign_key(fk.id)?;
        }
        for index in self.get_indexes(table_id, false)? {
            self.delete_index(index.id)?;
        }
        for constraint in self.get_constraints(table_id)? {
            self.delete_constraint(constraint.id)?;
        }
        if let Some(pk) = table.primary_key {
            self.unset_primary_key(table_id)?;
            self.delete_key_if_no_longer_used(pk)?;
        }
        for key in self.get_table_keys(table_id)? {
            self.delete_key_if_no_longer_used(key.id)?;
        }

        for placement in self.get_data_placements(table_id)? {
            self.remove_data_placement(placement.adapter_id, table_id)?;
        }
        for column_id in self.table(table_id)?.column_ids {
            self.delete_column(column_id)?;
        }
        for group_id in &table.partition_property.partition_group_ids {
            self.delete_partition_group(table_id, table.namespace_id, *group_id)?;
        }

        if let Some(definition) = &table.view {
            for base_id in definition.underlying_tables.keys() {
                if let Some(old) = self.store.tables.get(base_id)? {
                    let mut new = old.clone();
                    new.connected_views.retain(|v| *v != table_id);
                    self.replace_table(old, new)?;
                }
            }
            self.views.write().remove(&table_id);
        }
        self.store.collection_mappings.remove(&table_id);
        if let Some(mapping) = self.store.graph_mappings.get(&table.namespace_id)? {
            if mapping.table_ids().contains(&table_id) {
                self.store.graph_mappings.remove(&table.namespace_id);
            }
        }
        self.remove_table_from_periodic_processing(table_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Columns
    // -----------------------------------------------------------------------

    /// Add a column; character types must carry a collation
    pub fn add_column(
        &self,
        name: &str,
        table_id: u64,
        position: u32,
        column_type: ColumnType,
        nullable: bool,
        collation: Option<Collation>,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        let namespace = self.namespace(table.namespace_id)?;
        let name = namespace.normalize(name);
        validate_column_type(&column_type)?;
        if column_type.base.is_character() && collation.is_none() {
            return Err(CatalogError::InvalidParameters(format!(
                "character column '{}' requires a collation",
                name
            )));
        }
        if self
            .store
            .column_names
            .contains(&(table_id, name.clone()))?
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "column '{}.{}'",
                table.name, name
            )));
        }

        let id = self.ids.column.next();
        let column = Column {
            id,
            name,
            table_id,
            namespace_id: table.namespace_id,
            position,
            column_type,
            nullable,
            collation,
            default_value: None,
        };
        self.store.columns.put(&id, &column)?;
        self.store
            .column_names
            .put(&(table_id, column.name.clone()), &id)?;
        let mut children = self.store.table_children.get(&table_id)?.unwrap_or_default();
        children.push(id);
        self.store.table_children.put(&table_id, &children)?;

        let mut new_table = table.clone();
        new_table.column_ids.push(id);
        self.replace_table(table, new_table)?;

        debug!("Added column '{}' ({}) to table {}", column.name, id, table_id);
        self.emit(CatalogEvent::Column(Change::created(column)));
        Ok(id)
    }

    pub(crate) fn replace_column(&self, old: Column, new: Column) -> CatalogResult<()> {
        if old.name != new.name {
            self.store
                .column_names
                .remove(&(old.table_id, old.name.clone()));
            self.store
                .column_names
                .put(&(new.table_id, new.name.clone()), &new.id)?;
        }
        self.store.columns.put(&new.id, &new)?;
        self.emit(CatalogEvent::Column(Change::replaced(old, new)));
        Ok(())
    }

    pub fn get_column(&self, id: u64) -> CatalogResult<Column> {
        self.column(id)
    }

    pub fn get_column_by_name(&self, table_id: u64, name: &str) -> CatalogResult<Column> {
        let table = self.table(table_id)?;
        let name = self.namespace(table.namespace_id)?.normalize(name);
        match self.store.column_names.get(&(table_id, name.clone()))? {
            Some(id) => self.column(id),
            None => Err(CatalogError::UnknownColumn(format!("{}.{}", table.name, name))),
        }
    }

    pub fn get_column_by_names(
        &self,
        namespace_name: &str,
        table_name: &str,
        column_name: &str,
    ) -> CatalogResult<Column> {
        let table = self.get_table_by_names(namespace_name, table_name)?;
        self.get_column_by_name(table.id, column_name)
    }

    /// Columns of a table ordered by position
    pub fn get_columns(&self, table_id: u64) -> CatalogResult<Vec<Column>> {
        let table = self.table(table_id)?;
        let mut columns = table
            .column_ids
            .iter()
            .map(|id| self.column(*id))
            .collect::<CatalogResult<Vec<_>>>()?;
        columns.sort_by_key(|c| (c.position, c.id));
        Ok(columns)
    }

    pub fn get_columns_by_pattern(
        &self,
        namespace_pattern: Option<&Pattern>,
        table_pattern: Option<&Pattern>,
        column_pattern: Option<&Pattern>,
    ) -> CatalogResult<Vec<Column>> {
        let mut columns = Vec::new();
        for table in self.get_tables_by_pattern(namespace_pattern, table_pattern)? {
            columns.extend(
                self.get_columns(table.id)?
                    .into_iter()
                    .filter(|c| pattern::matches(column_pattern, &c.name)),
            );
        }
        Ok(columns)
    }

    pub fn check_if_exists_column(&self, table_id: u64, name: &str) -> CatalogResult<bool> {
        let table = self.table(table_id)?;
        let name = self.namespace(table.namespace_id)?.normalize(name);
        self.store.column_names.contains(&(table_id, name))
    }

    pub fn rename_column(&self, column_id: u64, new_name: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        let new_name = self.namespace(old.namespace_id)?.normalize(new_name);
        if new_name == old.name {
            return Ok(());
        }
        if self
            .store
            .column_names
            .contains(&(old.table_id, new_name.clone()))?
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "column '{}'",
                new_name
            )));
        }
        let new = Column {
            name: new_name,
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    pub fn set_column_position(&self, column_id: u64, position: u32) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        let new = Column {
            position,
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    /// Change the type of a column that is not part of any key
    pub fn set_column_type(&self, column_id: u64, column_type: ColumnType) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        if self.is_column_in_key(old.table_id, column_id)? {
            return Err(CatalogError::InvariantViolation(format!(
                "cannot change the type of column '{}': it is part of a key",
                old.name
            )));
        }
        validate_column_type(&column_type)?;
        let collation = if column_type.base.is_character() {
            Some(Collation::default())
        } else {
            None
        };
        let new = Column {
            column_type,
            collation,
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    pub fn set_nullable(&self, column_id: u64, nullable: bool) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        if nullable {
            let table = self.table(old.table_id)?;
            if let Some(pk) = table.primary_key {
                if self.key(pk)?.column_ids.contains(&column_id) {
                    return Err(CatalogError::InvariantViolation(format!(
                        "primary key column '{}' cannot be nullable",
                        old.name
                    )));
                }
            }
        }
        let new = Column {
            nullable,
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    pub fn set_collation(&self, column_id: u64, collation: Collation) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        if !old.column_type.base.is_character() {
            return Err(CatalogError::InvalidParameters(format!(
                "collation is only allowed on character columns, '{}' is {}",
                old.name, old.column_type.base
            )));
        }
        let new = Column {
            collation: Some(collation),
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    pub fn set_default_value(
        &self,
        column_id: u64,
        poly_type: PolyType,
        value: &str,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        let new = Column {
            default_value: Some(DefaultValue {
                poly_type,
                value: value.to_string(),
                function_name: "defaultValue".to_string(),
            }),
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    pub fn delete_default_value(&self, column_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.column(column_id)?;
        if old.default_value.is_none() {
            return Ok(());
        }
        let new = Column {
            default_value: None,
            ..old.clone()
        };
        self.replace_column(old, new)
    }

    /// Drop a column and its placements; refused while the column is part of a key
    pub fn delete_column(&self, column_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let column = self.column(column_id)?;
        if self.is_column_in_key(column.table_id, column_id)? {
            return Err(CatalogError::InvariantViolation(format!(
                "column '{}' is part of a key",
                column.name
            )));
        }
        for placement in self.get_column_placements_by_column(column_id)? {
            self.delete_column_placement(placement.adapter_id, column_id, true)?;
        }

        let old_table = self.table(column.table_id)?;
        let mut new_table = old_table.clone();
        new_table.column_ids.retain(|id| *id != column_id);
        self.replace_table(old_table, new_table)?;

        if let Some(mut children) = self.store.table_children.get(&column.table_id)? {
            children.retain(|id| *id != column_id);
            self.store.table_children.put(&column.table_id, &children)?;
        }
        self.store
            .column_names
            .remove(&(column.table_id, column.name.clone()));
        self.store.columns.remove(&column_id);
        debug!("Deleted column '{}' ({})", column.name, column_id);
        self.emit(CatalogEvent::Column(Change::deleted(column)));
        Ok(())
    }
}

fn validate_column_type(column_type: &ColumnType) -> CatalogResult<()> {
    if let (Some(scale), Some(length)) = (column_type.scale, column_type.length) {
        if scale > length {
            return Err(CatalogError::InvariantViolation(format!(
                "scale {} exceeds length {}",
                scale, length
            )));
        }
    }
    Ok(())
}

/// Order in which the tables of a namespace can be dropped: views before the tables they read
fn drop_order(tables: &[Table]) -> CatalogResult<Vec<u64>> {
    let mut graph: Graph<u64, ()> = Graph::new();
    let mut nodes: HashMap<u64, NodeIndex> = HashMap::new();
    for table in tables {
        nodes.insert(table.id, graph.add_node(table.id));
    }
    for table in tables {
        if let Some(definition) = &table.view {
            for base in definition.underlying_tables.keys() {
                if let (Some(view), Some(base)) = (nodes.get(&table.id), nodes.get(base)) {
                    graph.add_edge(*view, *base, ());
                }
            }
        }
    }
    let order = toposort(&graph, None)
        .map_err(|cycle| CatalogError::integrity("acyclic view graph at table", graph[cycle.node_id()]))?;
    Ok(order.into_iter().map(|n| graph[n]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::manager::DEFAULT_NAMESPACE;

    fn catalog_with_table() -> (Catalog, u64, u64) {
        let catalog = Catalog::in_memory().unwrap();
        let ns = catalog.get_namespace_by_name(DEFAULT_NAMESPACE).unwrap().id;
        let table = catalog
            .add_table("Emps", ns, "system", EntityType::Entity, true)
            .unwrap();
        (catalog, ns, table)
    }

    #[test]
    fn test_table_names_are_normalised() {
        let (catalog, ns, table) = catalog_with_table();
        assert_eq!(catalog.get_table_by_name(ns, "EMPS").unwrap().id, table);
        assert!(catalog
            .add_table("emps", ns, "system", EntityType::Entity, true)
            .unwrap_err()
            .is_invariant());
        let err = catalog.get_table_by_name(ns, "depts").unwrap_err();
        assert!(err.is_not_found());
        assert!(catalog.get_table(999).unwrap_err().is_integrity());
    }

    #[test]
    fn test_new_table_blocks_commit_until_primary_key() {
        let (catalog, _, table) = catalog_with_table();
        assert_eq!(catalog.open_table(), Some(table));
        assert!(matches!(
            catalog.commit(),
            Err(CatalogError::NoTablePrimaryKey(name)) if name == "emps"
        ));
        catalog.rollback().unwrap();
        assert_eq!(catalog.open_table(), None);
        assert!(!catalog.check_if_exists_table_id(table).unwrap());
    }

    #[test]
    fn test_scale_must_not_exceed_length() {
        let (catalog, _, table) = catalog_with_table();
        let err = catalog
            .add_column(
                "salary",
                table,
                1,
                ColumnType::new(PolyType::Decimal).with_length(4).with_scale(6),
                false,
                None,
            )
            .unwrap_err();
        assert!(err.is_invariant());
        assert!(catalog.get_columns(table).unwrap().is_empty());
    }

    #[test]
    fn test_character_column_requires_collation() {
        let (catalog, _, table) = catalog_with_table();
        let varchar = ColumnType::new(PolyType::Varchar).with_length(20);
        assert!(catalog
            .add_column("name", table, 1, varchar.clone(), false, None)
            .is_err());
        let id = catalog
            .add_column("name", table, 1, varchar, false, Some(Collation::CaseInsensitive))
            .unwrap();

        catalog
            .set_column_type(id, ColumnType::new(PolyType::Integer))
            .unwrap();
        assert_eq!(catalog.get_column(id).unwrap().collation, None);
        assert!(catalog.set_collation(id, Collation::CaseSensitive).is_err());
    }

    #[test]
    fn test_column_order_follows_position() {
        let (catalog, _, table) = catalog_with_table();
        let b = catalog
            .add_column("b", table, 2, ColumnType::new(PolyType::Integer), true, None)
            .unwrap();
        let a = catalog
            .add_column("a", table, 1, ColumnType::new(PolyType::Integer), true, None)
            .unwrap();
        let ids: Vec<u64> = catalog.get_columns(table).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);

        catalog.set_column_position(a, 3).unwrap();
        let ids: Vec<u64> = catalog.get_columns(table).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_rename_namespace_keeps_id() {
        let catalog = Catalog::in_memory().unwrap();
        let id = catalog
            .add_namespace("Sales", DataModel::Relational, false)
            .unwrap();
        assert_eq!(
            catalog.get_namespace(id).unwrap(),
            catalog.get_namespace_by_name("sales").unwrap()
        );

        catalog.rename_namespace(id, "revenue").unwrap();
        assert!(catalog.get_namespace_by_name("sales").unwrap_err().is_not_found());
        assert_eq!(catalog.get_namespace_by_name("revenue").unwrap().id, id);
    }

    #[test]
    fn test_document_namespace_is_case_sensitive() {
        let catalog = Catalog::in_memory().unwrap();
        let ns = catalog
            .add_namespace("docs", DataModel::Document, false)
            .unwrap();
        assert!(catalog.get_namespace(ns).unwrap().case_sensitive);
        catalog
            .add_table("Orders", ns, "system", EntityType::Entity, true)
            .unwrap();
        assert_eq!(catalog.open_table(), None);
        assert!(catalog.check_if_exists_table(ns, "Orders").unwrap());
        assert!(!catalog.check_if_exists_table(ns, "orders").unwrap());
    }
}
