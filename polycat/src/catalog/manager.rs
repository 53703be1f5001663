// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog - the single entry point to catalog state
//!
//! The [`Catalog`] owns the durable store, the id allocators, the event bus and
//! the small amount of process-local state (open table, tables flagged for
//! deletion, periodic processing, reconstructed view plans). Entity operations
//! are implemented in sibling modules as further `impl Catalog` blocks.
//!
//! # Concurrency
//! Every mutating operation holds the catalog-wide reentrant lock for its whole
//! duration, so composite operations can call other mutating operations. Reads
//! go straight to the store and never observe a torn value.

use super::collaborators::PlanNode;
use super::config::CatalogConfig;
use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, CatalogListener, EventBus, EventKind, ListenerId};
use super::ids::IdAllocators;
use super::periodic::PeriodicProcessor;
use super::store::CatalogStore;
use crate::storage::{create_storage_driver, reset_storage, StorageType, TreeStatistics};
use log::{debug, info, warn};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Name of the namespace created on an empty catalog
pub const DEFAULT_NAMESPACE: &str = "public";

/// Owner recorded on entities created by the catalog itself
pub const SYSTEM_USER: &str = "system";

/// Entity counts, as reported by `polycat stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub namespaces: usize,
    pub tables: usize,
    pub columns: usize,
    pub keys: usize,
    pub constraints: usize,
    pub foreign_keys: usize,
    pub indexes: usize,
    pub adapters: usize,
    pub partition_groups: usize,
    pub partitions: usize,
    pub data_placements: usize,
    pub column_placements: usize,
    pub partition_placements: usize,
    pub graphs: usize,
}

pub struct Catalog {
    config: CatalogConfig,
    storage_type: StorageType,
    pub(crate) store: CatalogStore,
    pub(crate) ids: IdAllocators,
    pub(crate) lock: ReentrantMutex<()>,
    /// Table created without a primary key yet; blocks commit
    pub(crate) open_table: Mutex<Option<u64>>,
    pub(crate) flagged_for_deletion: Mutex<HashSet<u64>>,
    pub(crate) periodic: PeriodicProcessor,
    pub(crate) views: RwLock<HashMap<u64, Arc<dyn PlanNode>>>,
    events: EventBus,
}

impl Catalog {
    /// Open the catalog described by `config`
    ///
    /// Re-seeds every id allocator from the persisted state, creates the default
    /// namespace on an empty catalog and runs the consistency validator. A
    /// validation failure aborts the open.
    pub fn open(config: CatalogConfig) -> CatalogResult<Self> {
        let storage_type = config.resolve_storage_type();
        if config.reset && storage_type == StorageType::Sled {
            info!("Resetting catalog at {}", config.path.display());
            reset_storage(&config.path)?;
        }
        let driver = create_storage_driver(storage_type, &config.path, config.temporary)?;
        let store = CatalogStore::open(driver)?;

        let catalog = Self {
            periodic: PeriodicProcessor::new(Duration::from_secs(
                config.periodic_interval_secs.max(1),
            )),
            config,
            storage_type,
            store,
            ids: IdAllocators::default(),
            lock: ReentrantMutex::new(()),
            open_table: Mutex::new(None),
            flagged_for_deletion: Mutex::new(HashSet::new()),
            views: RwLock::new(HashMap::new()),
            events: EventBus::new(),
        };

        catalog.reseed_ids()?;
        if catalog.config.init_defaults && catalog.store.namespaces.is_empty()? {
            catalog.create_defaults()?;
        }
        catalog.validate()?;
        catalog.resume_periodic_processing()?;

        info!(
            "Opened {} catalog at {} ({} namespaces, {} tables)",
            catalog.storage_type,
            catalog.config.path.display(),
            catalog.store.namespaces.len()?,
            catalog.store.tables.len()?
        );
        Ok(catalog)
    }

    /// Ephemeral catalog with the default layout
    pub fn in_memory() -> CatalogResult<Self> {
        Self::open(CatalogConfig::in_memory())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    pub fn is_persistent(&self) -> bool {
        self.storage_type != StorageType::Memory
    }

    pub fn ids(&self) -> &IdAllocators {
        &self.ids
    }

    // -----------------------------------------------------------------------
    // Transaction boundary
    // -----------------------------------------------------------------------

    /// Persist every change since the previous commit
    ///
    /// Refused while a table created in this change set still lacks a primary key.
    pub fn commit(&self) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        if let Some(table_id) = *self.open_table.lock() {
            let name = match self.store.tables.get(&table_id)? {
                Some(table) => table.name,
                None => table_id.to_string(),
            };
            return Err(CatalogError::NoTablePrimaryKey(name));
        }
        self.store.commit()?;
        debug!("Catalog committed");
        Ok(())
    }

    /// Discard every change since the previous commit
    pub fn rollback(&self) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.store.rollback();
        *self.open_table.lock() = None;
        self.flagged_for_deletion.lock().clear();
        self.resume_periodic_processing()?;
        let mut views = self.views.write();
        let mut stale = Vec::new();
        for id in views.keys() {
            if !self.store.tables.contains(id)? {
                stale.push(*id);
            }
        }
        for id in stale {
            views.remove(&id);
        }
        debug!("Catalog rolled back");
        Ok(())
    }

    /// Discard uncommitted changes and release the store
    pub fn close(&self) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.periodic.shutdown();
        if self.store.has_pending() {
            warn!("Closing catalog with uncommitted changes; they are discarded");
            self.store.rollback();
        }
        self.store.close()?;
        info!("Closed catalog at {}", self.config.path.display());
        Ok(())
    }

    /// Wipe every collection and re-create the default layout
    pub fn clear(&self) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.store.clear()?;
        self.ids.reset_all();
        *self.open_table.lock() = None;
        self.flagged_for_deletion.lock().clear();
        self.views.write().clear();
        self.clear_periodic_processing();
        if self.config.init_defaults {
            self.create_defaults()?;
        }
        info!("Catalog cleared");
        Ok(())
    }

    fn create_defaults(&self) -> CatalogResult<()> {
        self.add_namespace(DEFAULT_NAMESPACE, DataModel::Relational, false)?;
        self.store.commit()?;
        Ok(())
    }

    /// Move every allocator one past the largest id present in the store
    pub(crate) fn reseed_ids(&self) -> CatalogResult<()> {
        let ids = &self.ids;
        ids.namespace.reseed(self.store.namespaces.last_key()?);
        ids.entity.reseed(self.store.tables.last_key()?);
        ids.column.reseed(self.store.columns.last_key()?);
        ids.key.reseed(self.store.keys.last_key()?);
        ids.constraint.reseed(self.store.constraints.last_key()?);
        ids.foreign_key.reseed(self.store.foreign_keys.last_key()?);
        ids.index.reseed(self.store.indexes.last_key()?);
        ids.adapter.reseed(self.store.adapters.last_key()?);
        ids.partition_group
            .reseed(self.store.partition_groups.last_key()?);
        ids.partition.reseed(self.store.partitions.last_key()?);
        let max_position = self
            .store
            .column_placements
            .values()?
            .iter()
            .map(|p| p.physical_position)
            .max();
        ids.physical_position.reseed(max_position);
        Ok(())
    }

    /// Track exactly the tables whose partitioning relies on periodic checks
    fn resume_periodic_processing(&self) -> CatalogResult<()> {
        let mut wanted = HashSet::new();
        for table in self.store.tables.values()? {
            if table.partition_property.relies_on_periodic_checks {
                wanted.insert(table.id);
            }
        }
        for table_id in self.periodic.tables() {
            if !wanted.contains(&table_id) {
                self.remove_table_from_periodic_processing(table_id);
            }
        }
        for table_id in wanted {
            self.add_table_to_periodic_processing(table_id)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register a listener by event name (`"table"`, `"columnPlacement"`, ...)
    pub fn add_listener(
        &self,
        event_name: &str,
        listener: Arc<dyn CatalogListener>,
    ) -> CatalogResult<ListenerId> {
        self.events.subscribe_named(event_name, listener)
    }

    pub fn add_listener_for(
        &self,
        kind: Option<EventKind>,
        listener: Arc<dyn CatalogListener>,
    ) -> ListenerId {
        self.events.subscribe(kind, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub(crate) fn emit(&self, event: CatalogEvent) {
        self.events.emit(event);
    }

    // -----------------------------------------------------------------------
    // Open table and deletion flags
    // -----------------------------------------------------------------------

    /// Table created in this change set that still lacks a primary key
    pub fn open_table(&self) -> Option<u64> {
        *self.open_table.lock()
    }

    pub(crate) fn set_open_table(&self, table_id: Option<u64>) {
        *self.open_table.lock() = table_id;
    }

    /// Exempt a table from placement coverage checks while it is being dropped
    pub fn flag_table_for_deletion(&self, table_id: u64, flag: bool) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let mut flagged = self.flagged_for_deletion.lock();
        if flag {
            if !flagged.insert(table_id) {
                return Err(CatalogError::InvariantViolation(format!(
                    "table {} is already flagged for deletion",
                    table_id
                )));
            }
        } else {
            flagged.remove(&table_id);
        }
        Ok(())
    }

    pub fn is_table_flagged_for_deletion(&self, table_id: u64) -> bool {
        self.flagged_for_deletion.lock().contains(&table_id)
    }

    // -----------------------------------------------------------------------
    // Id lookups; a miss is an integrity error
    // -----------------------------------------------------------------------

    pub(crate) fn namespace(&self, id: u64) -> CatalogResult<Namespace> {
        self.store
            .namespaces
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("namespace", id))
    }

    pub(crate) fn table(&self, id: u64) -> CatalogResult<Table> {
        self.store
            .tables
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("table", id))
    }

    pub(crate) fn column(&self, id: u64) -> CatalogResult<Column> {
        self.store
            .columns
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("column", id))
    }

    pub(crate) fn key(&self, id: u64) -> CatalogResult<Key> {
        self.store
            .keys
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("key", id))
    }

    pub(crate) fn adapter(&self, id: u64) -> CatalogResult<Adapter> {
        self.store
            .adapters
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("adapter", id))
    }

    pub(crate) fn partition_group(&self, id: u64) -> CatalogResult<PartitionGroup> {
        self.store
            .partition_groups
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("partition group", id))
    }

    pub(crate) fn partition(&self, id: u64) -> CatalogResult<Partition> {
        self.store
            .partitions
            .get(&id)?
            .ok_or_else(|| CatalogError::integrity("partition", id))
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub fn statistics(&self) -> CatalogResult<CatalogStatistics> {
        let s = &self.store;
        Ok(CatalogStatistics {
            namespaces: s.namespaces.len()?,
            tables: s.tables.len()?,
            columns: s.columns.len()?,
            keys: s.keys.len()?,
            constraints: s.constraints.len()?,
            foreign_keys: s.foreign_keys.len()?,
            indexes: s.indexes.len()?,
            adapters: s.adapters.len()?,
            partition_groups: s.partition_groups.len()?,
            partitions: s.partitions.len()?,
            data_placements: s.data_placements.len()?,
            column_placements: s.column_placements.len()?,
            partition_placements: s.partition_placements.len()?,
            graphs: s.graphs.len()?,
        })
    }

    /// Committed size of every collection that the driver reports on
    pub fn collection_statistics(&self) -> CatalogResult<Vec<(String, TreeStatistics)>> {
        let mut stats = Vec::new();
        for name in self.store.collection_names() {
            if let Some(s) = self.store.collection_stats(&name)? {
                stats.push((name, s));
            }
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.config.path)
            .field("storage_type", &self.storage_type)
            .field("open_table", &self.open_table())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_default_namespace() {
        let catalog = Catalog::in_memory().unwrap();
        let ns = catalog.get_namespace_by_name(DEFAULT_NAMESPACE).unwrap();
        assert_eq!(ns.model, DataModel::Relational);
        assert!(!catalog.is_persistent());
        assert!(!catalog.store.has_pending());
    }

    #[test]
    fn test_clear_restores_default_layout() {
        let catalog = Catalog::in_memory().unwrap();
        catalog
            .add_namespace("sales", DataModel::Relational, false)
            .unwrap();
        catalog.commit().unwrap();

        catalog.clear().unwrap();
        let names: Vec<String> = catalog
            .get_namespaces(None)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec![DEFAULT_NAMESPACE.to_string()]);
        assert_eq!(catalog.ids.namespace.peek(), 1);
    }

    #[test]
    fn test_flag_for_deletion_twice_is_refused() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.flag_table_for_deletion(4, true).unwrap();
        assert!(catalog.flag_table_for_deletion(4, true).unwrap_err().is_invariant());
        catalog.flag_table_for_deletion(4, false).unwrap();
        assert!(!catalog.is_table_flagged_for_deletion(4));
    }
}
