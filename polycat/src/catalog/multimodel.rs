// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graphs and document collections
//!
//! Neither model has storage of its own. A graph is a graph-model namespace
//! holding four synthetic tables (nodes, node properties, edges, edge
//! properties); a document collection is a table with an id and a data column.
//! Mapping records keep the table and column ids so the graph and document
//! layers can translate to and from the synthetic shape.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::{Catalog, SYSTEM_USER};
use super::pattern::{self, Pattern};
use chrono::Utc;
use log::debug;
use std::collections::BTreeSet;

const NODES_TABLE: &str = "_nodes_";
const NODE_PROPERTIES_TABLE: &str = "_n_properties_";
const EDGES_TABLE: &str = "_edges_";
const EDGE_PROPERTIES_TABLE: &str = "_properties_";

const ID_COLUMN: &str = "_id_";
const LABEL_COLUMN: &str = "_label_";
const KEY_COLUMN: &str = "_key_";
const VALUE_COLUMN: &str = "_value_";
const SOURCE_COLUMN: &str = "_l_id_";
const TARGET_COLUMN: &str = "_r_id_";
const DATA_COLUMN: &str = "_data_";

/// Length of generated edge identifiers
const EDGE_ID_LENGTH: u32 = 36;
const TEXT_LENGTH: u32 = 255;

impl Catalog {
    // -----------------------------------------------------------------------
    // Graphs
    // -----------------------------------------------------------------------

    /// Create a graph and the graph-model namespace sharing its id
    pub fn add_graph(&self, name: &str, modifiable: bool, if_not_exists: bool) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let name = name.to_lowercase();
        if let Some(existing) = self.store.graph_names.get(&name)? {
            if if_not_exists {
                return Ok(existing);
            }
            return Err(CatalogError::EntityAlreadyExists(format!("graph '{}'", name)));
        }
        if self.store.namespace_names.contains(&name)? || self.store.graph_aliases.contains(&name)? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "namespace '{}'",
                name
            )));
        }

        let id = self.ids.namespace.next();
        self.insert_namespace(Namespace {
            id,
            name: name.clone(),
            owner: SYSTEM_USER.to_string(),
            model: DataModel::Graph,
            case_sensitive: true,
        })?;
        let graph = Graph {
            id,
            name,
            owner: SYSTEM_USER.to_string(),
            modifiable,
            placements: Vec::new(),
            case_sensitive: true,
            created_at: Utc::now(),
        };
        self.store.graphs.put(&id, &graph)?;
        self.store.graph_names.put(&graph.name, &id)?;
        debug!("Added graph '{}' ({})", graph.name, id);
        self.emit(CatalogEvent::Graph(Change::created(graph)));
        Ok(id)
    }

    pub fn get_graph(&self, graph_id: u64) -> CatalogResult<Graph> {
        self.store
            .graphs
            .get(&graph_id)?
            .ok_or_else(|| CatalogError::integrity("graph", graph_id))
    }

    /// Look a graph up by name or alias
    pub fn get_graph_by_name(&self, name: &str) -> CatalogResult<Graph> {
        let name = name.to_lowercase();
        let id = match self.store.graph_names.get(&name)? {
            Some(id) => Some(id),
            None => self.store.graph_aliases.get(&name)?,
        };
        match id {
            Some(id) => self.get_graph(id),
            None => Err(CatalogError::UnknownGraph(name)),
        }
    }

    /// Graphs whose name or one of whose aliases matches `pattern`
    pub fn get_graphs(&self, pattern: Option<&Pattern>) -> CatalogResult<Vec<Graph>> {
        let mut ids: BTreeSet<u64> = self
            .store
            .graph_names
            .entries()?
            .into_iter()
            .filter(|(name, _)| pattern::matches(pattern, name))
            .map(|(_, id)| id)
            .collect();
        ids.extend(
            self.store
                .graph_aliases
                .entries()?
                .into_iter()
                .filter(|(alias, _)| pattern::matches(pattern, alias))
                .map(|(_, id)| id),
        );
        ids.into_iter().map(|id| self.get_graph(id)).collect()
    }

    pub fn add_graph_alias(&self, graph_id: u64, alias: &str, if_not_exists: bool) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.get_graph(graph_id)?;
        let alias = alias.to_lowercase();
        if self.store.graph_aliases.contains(&alias)? {
            if if_not_exists {
                return Ok(());
            }
            return Err(CatalogError::EntityAlreadyExists(format!(
                "graph alias '{}'",
                alias
            )));
        }
        if self.store.graph_names.contains(&alias)? {
            return Err(CatalogError::EntityAlreadyExists(format!("graph '{}'", alias)));
        }
        self.store.graph_aliases.put(&alias, &graph_id)?;
        self.emit(CatalogEvent::GraphAlias(Change::created(alias)));
        Ok(())
    }

    pub fn remove_graph_alias(&self, graph_id: u64, alias: &str, if_exists: bool) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let alias = alias.to_lowercase();
        match self.store.graph_aliases.get(&alias)? {
            Some(id) if id == graph_id => {
                self.store.graph_aliases.remove(&alias);
                self.emit(CatalogEvent::GraphAlias(Change::deleted(alias)));
                Ok(())
            }
            _ if if_exists => Ok(()),
            _ => Err(CatalogError::UnknownGraph(alias)),
        }
    }

    pub fn get_graph_aliases(&self, graph_id: u64) -> CatalogResult<Vec<String>> {
        Ok(self
            .store
            .graph_aliases
            .entries()?
            .into_iter()
            .filter(|(_, id)| *id == graph_id)
            .map(|(alias, _)| alias)
            .collect())
    }

    /// Create the synthetic tables of a graph and place them on `adapter_ids`
    ///
    /// With `only_placement` the tables must already exist and only the
    /// placements on the given adapters are added.
    pub fn add_graph_logistics(
        &self,
        graph_id: u64,
        adapter_ids: &[u64],
        only_placement: bool,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.get_graph(graph_id)?;
        for adapter_id in adapter_ids {
            self.adapter(*adapter_id)?;
        }

        let mapping = if only_placement {
            self.get_graph_mapping(graph_id)?
        } else {
            if self.store.graph_mappings.contains(&graph_id)? {
                return Err(CatalogError::EntityAlreadyExists(format!(
                    "tables of graph {}",
                    graph_id
                )));
            }
            let (nodes_id, nodes) =
                self.add_synthetic_table(graph_id, NODES_TABLE, &[(ID_COLUMN, TEXT_LENGTH), (LABEL_COLUMN, TEXT_LENGTH)], 2)?;
            let (nodes_property_id, node_props) = self.add_synthetic_table(
                graph_id,
                NODE_PROPERTIES_TABLE,
                &[(ID_COLUMN, TEXT_LENGTH), (KEY_COLUMN, TEXT_LENGTH), (VALUE_COLUMN, TEXT_LENGTH)],
                2,
            )?;
            let (edges_id, edges) = self.add_synthetic_table(
                graph_id,
                EDGES_TABLE,
                &[
                    (ID_COLUMN, EDGE_ID_LENGTH),
                    (LABEL_COLUMN, TEXT_LENGTH),
                    (SOURCE_COLUMN, EDGE_ID_LENGTH),
                    (TARGET_COLUMN, EDGE_ID_LENGTH),
                ],
                1,
            )?;
            let (edges_property_id, edge_props) = self.add_synthetic_table(
                graph_id,
                EDGE_PROPERTIES_TABLE,
                &[(ID_COLUMN, TEXT_LENGTH), (KEY_COLUMN, TEXT_LENGTH), (VALUE_COLUMN, TEXT_LENGTH)],
                2,
            )?;
            let mapping = GraphMapping {
                graph_id,
                nodes_id,
                id_node_id: nodes[0],
                label_node_id: nodes[1],
                nodes_property_id,
                id_nodes_property_id: node_props[0],
                key_nodes_property_id: node_props[1],
                value_nodes_property_id: node_props[2],
                edges_id,
                id_edge_id: edges[0],
                label_edge_id: edges[1],
                source_edge_id: edges[2],
                target_edge_id: edges[3],
                edges_property_id,
                id_edges_property_id: edge_props[0],
                key_edges_property_id: edge_props[1],
                value_edges_property_id: edge_props[2],
            };
            self.store.graph_mappings.put(&graph_id, &mapping)?;
            mapping
        };

        for adapter_id in adapter_ids {
            for table_id in mapping.table_ids() {
                self.place_whole_table(*adapter_id, table_id)?;
            }
            if !self
                .store
                .graph_placements
                .contains(&(graph_id, *adapter_id))?
            {
                self.add_graph_placement(*adapter_id, graph_id)?;
            }
        }
        Ok(())
    }

    /// Table with non-null VARCHAR columns whose first `key_width` columns form the primary key
    fn add_synthetic_table(
        &self,
        namespace_id: u64,
        name: &str,
        columns: &[(&str, u32)],
        key_width: usize,
    ) -> CatalogResult<(u64, Vec<u64>)> {
        let table_id = self.add_table(name, namespace_id, SYSTEM_USER, EntityType::Entity, true)?;
        let mut column_ids = Vec::with_capacity(columns.len());
        for (position, (column, length)) in columns.iter().enumerate() {
            column_ids.push(self.add_column(
                column,
                table_id,
                position as u32,
                ColumnType::new(PolyType::Varchar).with_length(*length),
                false,
                Some(Collation::default()),
            )?);
        }
        self.add_primary_key(table_id, &column_ids[..key_width])?;
        Ok((table_id, column_ids))
    }

    /// Give `adapter_id` every column and partition of the table
    fn place_whole_table(&self, adapter_id: u64, table_id: u64) -> CatalogResult<()> {
        let table = self.table(table_id)?;
        self.add_data_placement_if_not_exists(adapter_id, table_id)?;
        for column_id in &table.column_ids {
            if !self.check_if_exists_column_placement(adapter_id, *column_id)? {
                self.add_column_placement(adapter_id, *column_id, PlacementType::Automatic, None, None)?;
            }
        }
        for partition_id in &table.partition_property.partition_ids {
            self.add_partition_placement(
                table.namespace_id,
                adapter_id,
                table_id,
                *partition_id,
                PlacementType::Automatic,
                None,
                None,
                DataPlacementRole::UpToDate,
            )?;
        }
        Ok(())
    }

    pub fn get_graph_mapping(&self, graph_id: u64) -> CatalogResult<GraphMapping> {
        self.store
            .graph_mappings
            .get(&graph_id)?
            .ok_or_else(|| CatalogError::UnknownGraph(format!("no tables for graph {}", graph_id)))
    }

    pub fn add_graph_placement(&self, adapter_id: u64, graph_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.adapter(adapter_id)?;
        let old = self.get_graph(graph_id)?;
        if self
            .store
            .graph_placements
            .contains(&(graph_id, adapter_id))?
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "placement of graph '{}' on adapter {}",
                old.name, adapter_id
            )));
        }
        let placement = GraphPlacement {
            graph_id,
            adapter_id,
            physical_name: None,
        };
        self.store
            .graph_placements
            .put(&(graph_id, adapter_id), &placement)?;
        let mut new = old.clone();
        new.placements.push(adapter_id);
        self.store.graphs.put(&graph_id, &new)?;
        self.emit(CatalogEvent::Graph(Change::replaced(old, new)));
        self.emit(CatalogEvent::GraphPlacement(Change::created(placement)));
        Ok(())
    }

    pub fn get_graph_placement(&self, graph_id: u64, adapter_id: u64) -> CatalogResult<GraphPlacement> {
        self.store
            .graph_placements
            .get(&(graph_id, adapter_id))?
            .ok_or_else(|| {
                CatalogError::UnknownPlacement(format!("graph {} on adapter {}", graph_id, adapter_id))
            })
    }

    pub fn get_graph_placements(&self, graph_id: u64) -> CatalogResult<Vec<GraphPlacement>> {
        Ok(self
            .store
            .graph_placements
            .scan_prefix(&graph_id)?
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    pub fn update_graph_placement_physical_name(
        &self,
        graph_id: u64,
        adapter_id: u64,
        physical_name: &str,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_graph_placement(graph_id, adapter_id)?;
        let new = GraphPlacement {
            physical_name: Some(physical_name.to_string()),
            ..old.clone()
        };
        self.store
            .graph_placements
            .put(&(graph_id, adapter_id), &new)?;
        self.emit(CatalogEvent::GraphPlacement(Change::replaced(old, new)));
        Ok(())
    }

    /// Remove a graph from one adapter; the last placement of a graph cannot be removed
    pub fn delete_graph_placement(&self, adapter_id: u64, graph_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let placement = self.get_graph_placement(graph_id, adapter_id)?;
        let old = self.get_graph(graph_id)?;
        if old.placements.len() <= 1 {
            return Err(CatalogError::InvariantViolation(format!(
                "adapter {} holds the last placement of graph '{}'",
                adapter_id, old.name
            )));
        }
        if let Some(mapping) = self.store.graph_mappings.get(&graph_id)? {
            for table_id in mapping.table_ids() {
                if self
                    .store
                    .data_placements
                    .contains(&(adapter_id, table_id))?
                {
                    self.remove_data_placement(adapter_id, table_id)?;
                }
            }
        }
        self.store.graph_placements.remove(&(graph_id, adapter_id));
        let mut new = old.clone();
        new.placements.retain(|id| *id != adapter_id);
        self.store.graphs.put(&graph_id, &new)?;
        self.emit(CatalogEvent::Graph(Change::replaced(old, new)));
        self.emit(CatalogEvent::GraphPlacement(Change::deleted(placement)));
        Ok(())
    }

    /// Drop a graph with its synthetic tables, placements, aliases and namespace
    pub fn delete_graph(&self, graph_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let graph = self.get_graph(graph_id)?;
        let namespace = self.namespace(graph_id)?;

        for table_id in self.get_namespace_children(graph_id)? {
            self.delete_table(table_id)?;
        }
        self.store.graph_mappings.remove(&graph_id);
        for placement in self.get_graph_placements(graph_id)? {
            self.store
                .graph_placements
                .remove(&(graph_id, placement.adapter_id));
            self.emit(CatalogEvent::GraphPlacement(Change::deleted(placement)));
        }
        for alias in self.get_graph_aliases(graph_id)? {
            self.store.graph_aliases.remove(&alias);
            self.emit(CatalogEvent::GraphAlias(Change::deleted(alias)));
        }
        self.store.graph_names.remove(&graph.name);
        self.store.graphs.remove(&graph_id);

        self.store.namespaces.remove(&graph_id);
        self.store.namespace_names.remove(&namespace.name);
        self.store.namespace_children.remove(&graph_id);
        debug!("Deleted graph '{}' ({})", graph.name, graph_id);
        self.emit(CatalogEvent::Graph(Change::deleted(graph)));
        self.emit(CatalogEvent::Namespace(Change::deleted(namespace)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document collections
    // -----------------------------------------------------------------------

    /// Create the synthetic table of a document collection and place it on `adapter_ids`
    ///
    /// Returns the collection (table) id. With `only_placement` the collection
    /// must already exist and only placements are added.
    pub fn add_collection_logistics(
        &self,
        namespace_id: u64,
        name: &str,
        adapter_ids: &[u64],
        only_placement: bool,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let namespace = self.namespace(namespace_id)?;
        if namespace.model != DataModel::Document {
            return Err(CatalogError::InvalidParameters(format!(
                "namespace '{}' is not a document namespace",
                namespace.name
            )));
        }
        for adapter_id in adapter_ids {
            self.adapter(*adapter_id)?;
        }

        let collection_id = if only_placement {
            let table = self.get_table_by_name(namespace_id, name)?;
            self.get_collection_mapping(table.id)?;
            table.id
        } else {
            let table_id = self.add_table(name, namespace_id, SYSTEM_USER, EntityType::Entity, true)?;
            let id_id = self.add_column(
                ID_COLUMN,
                table_id,
                0,
                ColumnType::new(PolyType::Varchar).with_length(TEXT_LENGTH),
                false,
                Some(Collation::default()),
            )?;
            let data_id = self.add_column(
                DATA_COLUMN,
                table_id,
                1,
                ColumnType::new(PolyType::Json),
                false,
                None,
            )?;
            self.add_primary_key(table_id, &[id_id, data_id])?;
            let mapping = CollectionMapping {
                collection_id: table_id,
                id_id,
                data_id,
            };
            self.store.collection_mappings.put(&table_id, &mapping)?;
            table_id
        };

        for adapter_id in adapter_ids {
            self.place_whole_table(*adapter_id, collection_id)?;
        }
        Ok(collection_id)
    }

    pub fn get_collection_mapping(&self, collection_id: u64) -> CatalogResult<CollectionMapping> {
        self.store
            .collection_mappings
            .get(&collection_id)?
            .ok_or_else(|| CatalogError::UnknownTable(format!("collection {}", collection_id)))
    }

    /// Collections of a document namespace matching `pattern`
    pub fn get_collections(&self, namespace_id: u64, pattern: Option<&Pattern>) -> CatalogResult<Vec<Table>> {
        let mut collections = Vec::new();
        for table in self.get_tables(namespace_id, pattern)? {
            if self.store.collection_mappings.contains(&table.id)? {
                collections.push(table);
            }
        }
        Ok(collections)
    }

    pub fn get_collection_placements(&self, collection_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        self.get_collection_mapping(collection_id)?;
        self.get_data_placements(collection_id)
    }

    /// Data placements on `adapter_id` that belong to document collections
    pub fn get_collection_placements_by_adapter(&self, adapter_id: u64) -> CatalogResult<Vec<DataPlacement>> {
        let mut placements = Vec::new();
        for placement in self.get_data_placements_on_adapter(adapter_id)? {
            if self
                .store
                .collection_mappings
                .contains(&placement.table_id)?
            {
                placements.push(placement);
            }
        }
        Ok(placements)
    }

    pub fn drop_collection_placement(&self, collection_id: u64, adapter_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.get_collection_mapping(collection_id)?;
        self.remove_data_placement(adapter_id, collection_id)
    }

    pub fn delete_collection(&self, collection_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.get_collection_mapping(collection_id)?;
        self.delete_table(collection_id)?;
        self.store.collection_mappings.remove(&collection_id);
        Ok(())
    }
}
