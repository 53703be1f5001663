// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Keys, primary keys, foreign keys, unique constraints and indexes
//!
//! All four designations are views over a shared [`Key`], de-duplicated by its
//! exact column tuple. A key lives only as long as something designates it;
//! whether it is still needed is recomputed from the collections on every
//! removal rather than tracked in a counter.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, Change};
use super::manager::Catalog;
use log::debug;

impl Catalog {
    /// Id of the key over exactly `column_ids`, created if missing
    pub fn get_or_add_key(
        &self,
        table_id: u64,
        column_ids: &[u64],
        enforcement: EnforcementTime,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        self.check_key_columns(&table, column_ids)?;
        if let Some(key_id) = self.store.key_columns.get(&column_ids.to_vec())? {
            return Ok(key_id);
        }
        let id = self.ids.key.next();
        let key = Key {
            id,
            table_id,
            namespace_id: table.namespace_id,
            column_ids: column_ids.to_vec(),
            enforcement,
        };
        self.store.keys.put(&id, &key)?;
        self.store.key_columns.put(&key.column_ids, &id)?;
        debug!("Added key {} over {:?} on table {}", id, key.column_ids, table_id);
        self.emit(CatalogEvent::Key(Change::created(key)));
        Ok(id)
    }

    /// Non-empty, and every column belongs to the table
    fn check_key_columns(&self, table: &Table, column_ids: &[u64]) -> CatalogResult<()> {
        if column_ids.is_empty() {
            return Err(CatalogError::InvalidParameters(
                "a key needs at least one column".into(),
            ));
        }
        for column_id in column_ids {
            let column = self.column(*column_id)?;
            if column.table_id != table.id {
                return Err(CatalogError::InvalidParameters(format!(
                    "column '{}' does not belong to table '{}'",
                    column.name, table.name
                )));
            }
        }
        Ok(())
    }

    pub fn get_key(&self, key_id: u64) -> CatalogResult<Key> {
        self.key(key_id)
    }

    pub fn get_keys(&self) -> CatalogResult<Vec<Key>> {
        self.store.keys.values()
    }

    pub fn get_table_keys(&self, table_id: u64) -> CatalogResult<Vec<Key>> {
        Ok(self
            .store
            .keys
            .values()?
            .into_iter()
            .filter(|k| k.table_id == table_id)
            .collect())
    }

    pub(crate) fn is_column_in_key(&self, table_id: u64, column_id: u64) -> CatalogResult<bool> {
        Ok(self
            .get_table_keys(table_id)?
            .iter()
            .any(|k| k.column_ids.contains(&column_id)))
    }

    // -----------------------------------------------------------------------
    // Primary keys
    // -----------------------------------------------------------------------

    pub fn is_primary_key(&self, key_id: u64) -> CatalogResult<bool> {
        self.store.primary_keys.contains(&key_id)
    }

    pub fn get_primary_key(&self, table_id: u64) -> CatalogResult<Key> {
        let table = self.table(table_id)?;
        match table.primary_key {
            Some(key_id) => self.key(key_id),
            None => Err(CatalogError::NoTablePrimaryKey(table.name)),
        }
    }

    /// Make `column_ids` the primary key of the table, replacing any existing one
    pub fn add_primary_key(&self, table_id: u64, column_ids: &[u64]) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        self.check_key_columns(&table, column_ids)?;
        for column_id in column_ids {
            let column = self.column(*column_id)?;
            if column.nullable {
                return Err(CatalogError::InvariantViolation(format!(
                    "primary key column '{}' must not be nullable",
                    column.name
                )));
            }
        }
        let existing = self.store.key_columns.get(&column_ids.to_vec())?;
        if let Some(old_pk) = table.primary_key {
            if existing == Some(old_pk) {
                return Ok(());
            }
            if self.get_key_unique_count(old_pk)? == 1 && self.is_foreign_key_target(old_pk)? {
                return Err(CatalogError::InvariantViolation(format!(
                    "the primary key of '{}' is the only uniqueness guarantee of a referenced key",
                    table.name
                )));
            }
        }
        let key_id = match existing {
            Some(key_id) => key_id,
            None => self.get_or_add_key(table_id, column_ids, EnforcementTime::OnQuery)?,
        };
        self.set_primary_key(table_id, Some(key_id))?;
        if let Some(old_pk) = table.primary_key {
            self.delete_key_if_no_longer_used(old_pk)?;
        }
        Ok(())
    }

    /// Designate `key_id` as the table's primary key, or clear it
    ///
    /// Clearing leaves the table open, so the change set cannot be committed
    /// before a new primary key is set.
    pub fn set_primary_key(&self, table_id: u64, key_id: Option<u64>) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.table(table_id)?;
        if let Some(key_id) = key_id {
            if self.key(key_id)?.table_id != table_id {
                return Err(CatalogError::InvalidParameters(format!(
                    "key {} does not belong to table '{}'",
                    key_id, old.name
                )));
            }
        }
        if let Some(previous) = old.primary_key {
            self.store.primary_keys.remove(&previous);
        }
        let new = Table {
            primary_key: key_id,
            ..old.clone()
        };
        self.replace_table(old, new)?;
        match key_id {
            Some(key_id) => {
                self.store.primary_keys.put(&key_id, &table_id)?;
                if self.open_table() == Some(table_id) {
                    self.set_open_table(None);
                }
            }
            None => self.set_open_table(Some(table_id)),
        }
        Ok(())
    }

    pub(crate) fn unset_primary_key(&self, table_id: u64) -> CatalogResult<()> {
        let old = self.table(table_id)?;
        if let Some(previous) = old.primary_key {
            self.store.primary_keys.remove(&previous);
            let new = Table {
                primary_key: None,
                ..old.clone()
            };
            self.replace_table(old, new)?;
        }
        Ok(())
    }

    /// Drop the primary key designation; refused if it is the last uniqueness
    /// guarantee behind a foreign key
    pub fn delete_primary_key(&self, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        let pk = table
            .primary_key
            .ok_or_else(|| CatalogError::NoTablePrimaryKey(table.name.clone()))?;
        if self.is_foreign_key_target(pk)? && self.get_key_unique_count(pk)? < 2 {
            return Err(CatalogError::InvariantViolation(format!(
                "the primary key of '{}' is referenced by a foreign key",
                table.name
            )));
        }
        self.set_primary_key(table_id, None)?;
        self.delete_key_if_no_longer_used(pk)
    }

    // -----------------------------------------------------------------------
    // Uniqueness and reference checks
    // -----------------------------------------------------------------------

    /// Number of uniqueness guarantees over a key: primary key, unique constraints, unique indexes
    pub fn get_key_unique_count(&self, key_id: u64) -> CatalogResult<usize> {
        let mut count = usize::from(self.is_primary_key(key_id)?);
        count += self
            .store
            .constraints
            .values()?
            .iter()
            .filter(|c| c.key_id == key_id && c.constraint_type == ConstraintType::Unique)
            .count();
        count += self
            .store
            .indexes
            .values()?
            .iter()
            .filter(|i| i.key_id == key_id && i.unique)
            .count();
        Ok(count)
    }

    /// Whether some foreign key references this key
    pub fn is_foreign_key_target(&self, key_id: u64) -> CatalogResult<bool> {
        Ok(self
            .store
            .foreign_keys
            .values()?
            .iter()
            .any(|fk| fk.referenced_key_id == key_id))
    }

    /// Physically delete a key no primary key, constraint, foreign key or index uses
    pub fn delete_key_if_no_longer_used(&self, key_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let key = match self.store.keys.get(&key_id)? {
            Some(key) => key,
            None => return Ok(()),
        };
        let table = self.table(key.table_id)?;
        if table.primary_key == Some(key_id) || self.is_primary_key(key_id)? {
            return Ok(());
        }
        if self
            .store
            .constraints
            .values()?
            .iter()
            .any(|c| c.key_id == key_id)
        {
            return Ok(());
        }
        if self
            .store
            .foreign_keys
            .values()?
            .iter()
            .any(|fk| fk.key_id == key_id)
        {
            return Ok(());
        }
        if self
            .store
            .indexes
            .values()?
            .iter()
            .any(|i| i.key_id == key_id)
        {
            return Ok(());
        }
        self.store.keys.remove(&key_id);
        self.store.key_columns.remove(&key.column_ids);
        debug!("Deleted unused key {}", key_id);
        self.emit(CatalogEvent::Key(Change::deleted(key)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Foreign keys
    // -----------------------------------------------------------------------

    /// Add a foreign key; the referenced columns must carry a unique key
    #[allow(clippy::too_many_arguments)]
    pub fn add_foreign_key(
        &self,
        table_id: u64,
        column_ids: &[u64],
        referenced_table_id: u64,
        referenced_column_ids: &[u64],
        name: &str,
        on_update: ForeignKeyOption,
        on_delete: ForeignKeyOption,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        let referenced_table = self.table(referenced_table_id)?;
        if column_ids.is_empty() || column_ids.len() != referenced_column_ids.len() {
            return Err(CatalogError::InvalidParameters(format!(
                "foreign key '{}' needs the same non-zero number of columns on both sides",
                name
            )));
        }
        if self
            .get_foreign_keys(table_id)?
            .iter()
            .any(|fk| fk.name == name)
        {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "foreign key '{}' on '{}'",
                name, table.name
            )));
        }

        let mut wanted: Vec<u64> = referenced_column_ids.to_vec();
        wanted.sort_unstable();
        let referenced_key = self
            .get_table_keys(referenced_table_id)?
            .into_iter()
            .find(|k| {
                let mut cols = k.column_ids.clone();
                cols.sort_unstable();
                cols == wanted
            })
            .ok_or_else(|| {
                CatalogError::InvariantViolation(
                    "There is no key over the referenced columns.".into(),
                )
            })?;

        for (own, referenced) in column_ids.iter().zip(referenced_column_ids) {
            let own = self.column(*own)?;
            let referenced = self.column(*referenced)?;
            if own.column_type.base != referenced.column_type.base {
                return Err(CatalogError::InvariantViolation(format!(
                    "type of column '{}' ({}) does not match referenced column '{}' ({})",
                    own.name, own.column_type.base, referenced.name, referenced.column_type.base
                )));
            }
        }
        if self.get_key_unique_count(referenced_key.id)? == 0 {
            return Err(CatalogError::InvariantViolation(format!(
                "the referenced columns of '{}' are not unique",
                referenced_table.name
            )));
        }

        let key_id = self.get_or_add_key(table_id, column_ids, EnforcementTime::OnCommit)?;
        let id = self.ids.foreign_key.next();
        let fk = ForeignKey {
            id,
            key_id,
            name: name.to_string(),
            table_id,
            namespace_id: table.namespace_id,
            column_ids: column_ids.to_vec(),
            referenced_key_id: referenced_key.id,
            referenced_table_id,
            referenced_namespace_id: referenced_table.namespace_id,
            referenced_column_ids: referenced_column_ids.to_vec(),
            on_update,
            on_delete,
        };
        self.store.foreign_keys.put(&id, &fk)?;
        debug!(
            "Added foreign key '{}' ({}) from {} to {}",
            fk.name, id, table_id, referenced_table_id
        );
        self.emit(CatalogEvent::ForeignKey(Change::created(fk)));
        Ok(id)
    }

    /// Foreign keys declared on a table
    pub fn get_foreign_keys(&self, table_id: u64) -> CatalogResult<Vec<ForeignKey>> {
        Ok(self
            .store
            .foreign_keys
            .values()?
            .into_iter()
            .filter(|fk| fk.table_id == table_id)
            .collect())
    }

    /// Foreign keys of other tables that reference this table
    pub fn get_exported_keys(&self, table_id: u64) -> CatalogResult<Vec<ForeignKey>> {
        Ok(self
            .store
            .foreign_keys
            .values()?
            .into_iter()
            .filter(|fk| fk.referenced_table_id == table_id)
            .collect())
    }

    pub fn get_foreign_key(&self, table_id: u64, name: &str) -> CatalogResult<ForeignKey> {
        self.get_foreign_keys(table_id)?
            .into_iter()
            .find(|fk| fk.name == name)
            .ok_or_else(|| CatalogError::UnknownForeignKey(name.to_string()))
    }

    pub fn delete_foreign_key(&self, foreign_key_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let fk = self
            .store
            .foreign_keys
            .get(&foreign_key_id)?
            .ok_or_else(|| CatalogError::integrity("foreign key", foreign_key_id))?;
        self.store.foreign_keys.remove(&foreign_key_id);
        debug!("Deleted foreign key '{}' ({})", fk.name, foreign_key_id);
        let key_id = fk.key_id;
        self.emit(CatalogEvent::ForeignKey(Change::deleted(fk)));
        self.delete_key_if_no_longer_used(key_id)
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    pub fn add_unique_constraint(
        &self,
        table_id: u64,
        name: &str,
        column_ids: &[u64],
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        if self.get_constraints(table_id)?.iter().any(|c| c.name == name) {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "constraint '{}' on '{}'",
                name, table.name
            )));
        }
        let key_id = self.get_or_add_key(table_id, column_ids, EnforcementTime::OnQuery)?;
        if self
            .store
            .constraints
            .values()?
            .iter()
            .any(|c| c.key_id == key_id && c.constraint_type == ConstraintType::Unique)
        {
            return Err(CatalogError::InvariantViolation(format!(
                "there is already a unique constraint over these columns of '{}'",
                table.name
            )));
        }
        let id = self.ids.constraint.next();
        let constraint = Constraint {
            id,
            key_id,
            constraint_type: ConstraintType::Unique,
            name: name.to_string(),
        };
        self.store.constraints.put(&id, &constraint)?;
        debug!("Added unique constraint '{}' ({}) on {}", name, id, table_id);
        self.emit(CatalogEvent::Constraint(Change::created(constraint)));
        Ok(id)
    }

    pub fn get_constraints(&self, table_id: u64) -> CatalogResult<Vec<Constraint>> {
        let key_ids: Vec<u64> = self.get_table_keys(table_id)?.iter().map(|k| k.id).collect();
        Ok(self
            .store
            .constraints
            .values()?
            .into_iter()
            .filter(|c| key_ids.contains(&c.key_id))
            .collect())
    }

    pub fn get_constraint(&self, table_id: u64, name: &str) -> CatalogResult<Constraint> {
        self.get_constraints(table_id)?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CatalogError::UnknownConstraint(name.to_string()))
    }

    pub fn delete_constraint(&self, constraint_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let constraint = self
            .store
            .constraints
            .get(&constraint_id)?
            .ok_or_else(|| CatalogError::integrity("constraint", constraint_id))?;
        if constraint.constraint_type == ConstraintType::Unique
            && self.is_foreign_key_target(constraint.key_id)?
            && self.get_key_unique_count(constraint.key_id)? < 2
        {
            return Err(CatalogError::InvariantViolation(format!(
                "unique constraint '{}' is the only uniqueness guarantee of a referenced key",
                constraint.name
            )));
        }
        self.store.constraints.remove(&constraint_id);
        let key_id = constraint.key_id;
        debug!("Deleted constraint '{}' ({})", constraint.name, constraint_id);
        self.emit(CatalogEvent::Constraint(Change::deleted(constraint)));
        self.delete_key_if_no_longer_used(key_id)
    }

    // -----------------------------------------------------------------------
    // Indexes
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn add_index(
        &self,
        table_id: u64,
        column_ids: &[u64],
        unique: bool,
        method: &str,
        method_display_name: &str,
        location: u64,
        index_type: IndexType,
        name: &str,
    ) -> CatalogResult<u64> {
        let _guard = self.lock.lock();
        let table = self.table(table_id)?;
        self.adapter(location)?;
        if self.check_if_exists_index(table_id, name)? {
            return Err(CatalogError::EntityAlreadyExists(format!(
                "index '{}' on '{}'",
                name, table.name
            )));
        }
        let key_id = self.get_or_add_key(table_id, column_ids, EnforcementTime::OnQuery)?;
        let id = self.ids.index.next();
        let index = Index {
            id,
            name: name.to_string(),
            key_id,
            unique,
            method: method.to_string(),
            method_display_name: method_display_name.to_string(),
            index_type,
            location,
            physical_name: None,
        };
        self.store.indexes.put(&id, &index)?;
        debug!("Added index '{}' ({}) on {}", name, id, table_id);
        self.emit(CatalogEvent::Index(Change::created(index)));
        Ok(id)
    }

    /// Indexes of a table, optionally only the unique ones
    pub fn get_indexes(&self, table_id: u64, only_unique: bool) -> CatalogResult<Vec<Index>> {
        let key_ids: Vec<u64> = self.get_table_keys(table_id)?.iter().map(|k| k.id).collect();
        Ok(self
            .store
            .indexes
            .values()?
            .into_iter()
            .filter(|i| key_ids.contains(&i.key_id) && (!only_unique || i.unique))
            .collect())
    }

    pub fn get_indexes_for_key(&self, key_id: u64) -> CatalogResult<Vec<Index>> {
        Ok(self
            .store
            .indexes
            .values()?
            .into_iter()
            .filter(|i| i.key_id == key_id)
            .collect())
    }

    pub fn get_indexes_on_adapter(&self, adapter_id: u64) -> CatalogResult<Vec<Index>> {
        Ok(self
            .store
            .indexes
            .values()?
            .into_iter()
            .filter(|i| i.location == adapter_id)
            .collect())
    }

    pub fn get_index(&self, table_id: u64, name: &str) -> CatalogResult<Index> {
        self.get_indexes(table_id, false)?
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| CatalogError::UnknownIndex(name.to_string()))
    }

    pub fn get_index_by_id(&self, index_id: u64) -> CatalogResult<Index> {
        self.store
            .indexes
            .get(&index_id)?
            .ok_or_else(|| CatalogError::integrity("index", index_id))
    }

    pub fn check_if_exists_index(&self, table_id: u64, name: &str) -> CatalogResult<bool> {
        Ok(self
            .get_indexes(table_id, false)?
            .iter()
            .any(|i| i.name == name))
    }

    pub fn set_index_physical_name(&self, index_id: u64, physical_name: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let old = self.get_index_by_id(index_id)?;
        let new = Index {
            physical_name: Some(physical_name.to_string()),
            ..old.clone()
        };
        self.store.indexes.put(&index_id, &new)?;
        self.emit(CatalogEvent::Index(Change::replaced(old, new)));
        Ok(())
    }

    pub fn delete_index(&self, index_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        let index = self.get_index_by_id(index_id)?;
        if index.unique
            && self.is_foreign_key_target(index.key_id)?
            && self.get_key_unique_count(index.key_id)? < 2
        {
            return Err(CatalogError::InvariantViolation(format!(
                "unique index '{}' is the only uniqueness guarantee of a referenced key",
                index.name
            )));
        }
        self.store.indexes.remove(&index_id);
        let key_id = index.key_id;
        debug!("Deleted index '{}' ({})", index.name, index_id);
        self.emit(CatalogEvent::Index(Change::deleted(index)));
        self.delete_key_if_no_longer_used(key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::manager::DEFAULT_NAMESPACE;

    fn table_with_columns(catalog: &Catalog, name: &str) -> (u64, u64, u64) {
        let ns = catalog.get_namespace_by_name(DEFAULT_NAMESPACE).unwrap().id;
        let table = catalog
            .add_table(name, ns, "system", EntityType::Entity, true)
            .unwrap();
        let a = catalog
            .add_column("a", table, 1, ColumnType::new(PolyType::Integer), false, None)
            .unwrap();
        let b = catalog
            .add_column("b", table, 2, ColumnType::new(PolyType::Integer), true, None)
            .unwrap();
        (table, a, b)
    }

    #[test]
    fn test_get_or_add_key_is_idempotent() {
        let catalog = Catalog::in_memory().unwrap();
        let (table, a, b) = table_with_columns(&catalog, "t");
        let k1 = catalog
            .get_or_add_key(table, &[a, b], EnforcementTime::OnQuery)
            .unwrap();
        let k2 = catalog
            .get_or_add_key(table, &[a, b], EnforcementTime::OnCommit)
            .unwrap();
        assert_eq!(k1, k2);
        assert_eq!(catalog.get_table_keys(table).unwrap().len(), 1);
    }

    #[test]
    fn test_nullable_column_cannot_join_primary_key() {
        let catalog = Catalog::in_memory().unwrap();
        let (table, a, b) = table_with_columns(&catalog, "t");
        assert!(catalog.add_primary_key(table, &[a, b]).unwrap_err().is_invariant());
        catalog.add_primary_key(table, &[a]).unwrap();
        assert_eq!(catalog.open_table(), None);
        assert!(catalog.set_nullable(a, true).unwrap_err().is_invariant());
    }

    #[test]
    fn test_key_survives_until_last_reference_is_gone() {
        let catalog = Catalog::in_memory().unwrap();
        let (table, a, _) = table_with_columns(&catalog, "t");
        catalog.add_primary_key(table, &[a]).unwrap();
        let location = catalog
            .add_adapter("store1", "memory", AdapterKind::Store, Default::default())
            .unwrap();
        let index = catalog
            .add_index(table, &[a], true, "hash", "HASH", location, IndexType::Manual, "idx_a")
            .unwrap();
        let key = catalog.get_primary_key(table).unwrap().id;
        assert_eq!(catalog.get_key_unique_count(key).unwrap(), 2);

        catalog.delete_primary_key(table).unwrap();
        assert!(catalog.get_key(key).is_ok());
        catalog.delete_index(index).unwrap();
        assert!(catalog.get_key(key).unwrap_err().is_integrity());
    }

    #[test]
    fn test_duplicate_unique_constraint_is_refused() {
        let catalog = Catalog::in_memory().unwrap();
        let (table, a, _) = table_with_columns(&catalog, "t");
        catalog.add_unique_constraint(table, "u1", &[a]).unwrap();
        assert!(catalog
            .add_unique_constraint(table, "u2", &[a])
            .unwrap_err()
            .is_invariant());
        assert_eq!(catalog.get_constraint(table, "u1").unwrap().name, "u1");
        assert!(catalog.get_constraint(table, "u2").unwrap_err().is_not_found());
    }
}
