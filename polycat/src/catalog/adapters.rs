// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Adapter registry entries

use super::entities::{Adapter, AdapterKind};
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::Catalog;
use log::debug;
use std::collections::BTreeMap;

impl Catalog {
    /// Register an adapter; unique names are case-insensitive
    pub fn add_adapter(
        &self,
        unique_name: &str,
        adapter_name: &str,
        kind: AdapterKind,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let unique_name = unique_name.to_lowercase();
        if self.store.adapter_names.contains(&unique_name)? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "adapter '{}'",
                unique_name
            )));
        }
        let id = self.ids.adapter.next();
        let adapter = Adapter {
            id,
            unique_name,
            adapter_name: adapter_name.to_string(),
            kind,
            settings,
        };
        self.store.adapters.put(&id, &adapter)?;
        self.store.adapter_names.put(&adapter.unique_name, &id)?;
        debug!(
            "Added {} adapter '{}' ({})",
            kind.as_str(),
            adapter.unique_name,
            id
        );
        self.emit(CatalogEvent::Adapter(Change::created(adapter)));
        Ok(id)
    }

    pub fn update_adapter_settings(
        &self,
        adapter_id: u64,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.adapter(adapter_id)?;
        let new = Adapter {
            settings,
            ..old.clone()
        };
        self.store.adapters.put(&adapter_id, &new)?;
        self.emit(CatalogEvent::Adapter(Change::replaced(old, new)));
        Ok(())
    }

    /// Remove an adapter that no longer holds any data, index or graph placement
    pub fn delete_adapter(&self, adapter_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let adapter = self.adapter(adapter_id)?;
        let held = self.get_data_placements_on_adapter(adapter_id)?;
        if !held.is_empty() {
            return Err(CatalogError::InvariantViolation(format!(
                "adapter '{}' still holds {} data placements",
                adapter.unique_name,
                held.len()
            )));
        }
        let indexes = self.get_indexes_on_adapter(adapter_id)?;
        if let Some(index) = indexes.first() {
            return Err(CatalogError::InvariantViolation(format!(
                "adapter '{}' still holds index '{}'",
                adapter.unique_name, index.name
            )));
        }
        if let Some(placement) = self
            .store
            .graph_placements
            .values()?
            .into_iter()
            .find(|p| p.adapter_id == adapter_id)
        {
            return Err(CatalogError::InvariantViolation(format!(
                "adapter '{}' still holds a placement of graph {}",
                adapter.unique_name, placement.graph_id
            )));
        }
        self.store.adapters.remove(&adapter_id);
        self.store.adapter_names.remove(&adapter.unique_name);
        debug!("Deleted adapter '{}' ({})", adapter.unique_name, adapter_id);
        self.emit(CatalogEvent::Adapter(Change::deleted(adapter)));
        Ok(())
    }

    pub fn get_adapter(&self, adapter_id: u64) -> CatalogResult<Adapter> {
        self.adapter(adapter_id)
    }

    pub fn get_adapter_by_name(&self, unique_name: &str) -> CatalogResult<Adapter> {
        let unique_name = unique_name.to_lowercase();
        match self.store.adapter_names.get(&unique_name)? {
            Some(id) => self.adapter(id),
            None => Err(CatalogError::UnknownAdapter(unique_name)),
        }
    }

    pub fn get_adapters(&self) -> CatalogResult<Vec<Adapter>> {
        self.store.adapters.values()
    }

    pub fn check_if_exists_adapter(&self, adapter_id: u64) -> CatalogResult<bool> {
        self.store.adapters.contains(&adapter_id)
    }
}
