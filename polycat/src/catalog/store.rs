// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Durable indexed store
//!
//! Typed, named collections over the trees of a storage driver. Every write is
//! staged in a per-collection overlay until [`CatalogStore::commit`] applies all
//! overlays to their trees; [`CatalogStore::rollback`] throws them away. Reads
//! consult the overlay first, so a caller always sees its own uncommitted work.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use crate::storage::{BoxedDriver, StorageTree, TreeStatistics};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Key encoding
// ---------------------------------------------------------------------------

/// Order-preserving binary key encoding
///
/// Integers are written big-endian so byte order equals numeric order and a
/// fixed-width leading component can be used as a scan prefix. A `String`
/// component consumes the remaining bytes and therefore must come last.
pub trait KeyCodec: Sized {
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode one component and return the unconsumed tail
    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])>;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn decode(bytes: &[u8]) -> CatalogResult<Self> {
        let (key, rest) = Self::decode_from(bytes)?;
        if !rest.is_empty() {
            return Err(malformed_key(bytes));
        }
        Ok(key)
    }
}

fn malformed_key(bytes: &[u8]) -> CatalogError {
    CatalogError::SerializationError(format!("malformed key {:?}", bytes))
}

impl KeyCodec for u64 {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])> {
        if bytes.len() < 8 {
            return Err(malformed_key(bytes));
        }
        let (head, tail) = bytes.split_at(8);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(head);
        Ok((u64::from_be_bytes(buf), tail))
    }
}

impl KeyCodec for String {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])> {
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| malformed_key(bytes))?;
        Ok((s, &[]))
    }
}

impl KeyCodec for Vec<u64> {
    fn encode_into(&self, out: &mut Vec<u8>) {
        for id in self {
            id.encode_into(out);
        }
    }

    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])> {
        if bytes.len() % 8 != 0 {
            return Err(malformed_key(bytes));
        }
        let mut ids = Vec::with_capacity(bytes.len() / 8);
        let mut rest = bytes;
        while !rest.is_empty() {
            let (id, tail) = u64::decode_from(rest)?;
            ids.push(id);
            rest = tail;
        }
        Ok((ids, rest))
    }
}

impl<A: KeyCodec, B: KeyCodec> KeyCodec for (A, B) {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.0.encode_into(out);
        self.1.encode_into(out);
    }

    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])> {
        let (a, rest) = A::decode_from(bytes)?;
        let (b, rest) = B::decode_from(rest)?;
        Ok(((a, b), rest))
    }
}

impl<A: KeyCodec, B: KeyCodec, C: KeyCodec> KeyCodec for (A, B, C) {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.0.encode_into(out);
        self.1.encode_into(out);
        self.2.encode_into(out);
    }

    fn decode_from(bytes: &[u8]) -> CatalogResult<(Self, &[u8])> {
        let (a, rest) = A::decode_from(bytes)?;
        let (b, rest) = B::decode_from(rest)?;
        let (c, rest) = C::decode_from(rest)?;
        Ok(((a, b, c), rest))
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Commit/rollback participation of a collection
pub trait Transactional: Send + Sync {
    fn name(&self) -> &str;

    /// Apply staged writes to the underlying tree
    fn commit(&self) -> CatalogResult<()>;

    /// Discard staged writes
    fn rollback(&self);

    /// Remove every committed and staged entry
    fn clear(&self) -> CatalogResult<()>;

    fn has_pending(&self) -> bool;
}

type Overlay = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// A named, typed, ordered collection with staged writes
pub struct Collection<K, V> {
    name: &'static str,
    tree: Box<dyn StorageTree>,
    staged: RwLock<Overlay>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Collection<K, V>
where
    K: KeyCodec,
    V: Serialize + DeserializeOwned,
{
    pub fn open(driver: &BoxedDriver, name: &'static str) -> CatalogResult<Self> {
        let tree = driver.open_tree(name)?;
        Ok(Self {
            name,
            tree,
            staged: RwLock::new(BTreeMap::new()),
            _marker: PhantomData,
        })
    }

    pub fn get(&self, key: &K) -> CatalogResult<Option<V>> {
        let raw_key = key.encode();
        if let Some(staged) = self.staged.read().get(&raw_key) {
            return match staged {
                Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
                None => Ok(None),
            };
        }
        match self.tree.get(&raw_key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &K) -> CatalogResult<bool> {
        let raw_key = key.encode();
        if let Some(staged) = self.staged.read().get(&raw_key) {
            return Ok(staged.is_some());
        }
        Ok(self.tree.contains_key(&raw_key)?)
    }

    /// Insert or replace
    pub fn put(&self, key: &K, value: &V) -> CatalogResult<()> {
        let bytes = bincode::serialize(value)?;
        self.staged.write().insert(key.encode(), Some(bytes));
        Ok(())
    }

    pub fn remove(&self, key: &K) {
        self.staged.write().insert(key.encode(), None);
    }

    /// Merged view of tree and overlay, restricted to `prefix`
    fn merged(&self, prefix: &[u8]) -> CatalogResult<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut merged = BTreeMap::new();
        let iter = if prefix.is_empty() {
            self.tree.iter()?
        } else {
            self.tree.scan_prefix(prefix)?
        };
        for entry in iter {
            let (k, v) = entry?;
            merged.insert(k, v);
        }
        let staged = self.staged.read();
        for (k, v) in staged.iter().filter(|(k, _)| k.starts_with(prefix)) {
            match v {
                Some(bytes) => {
                    merged.insert(k.clone(), bytes.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged)
    }

    fn decode_entries(raw: BTreeMap<Vec<u8>, Vec<u8>>) -> CatalogResult<Vec<(K, V)>> {
        raw.into_iter()
            .map(|(k, v)| Ok((K::decode(&k)?, bincode::deserialize(&v)?)))
            .collect()
    }

    /// All entries in key order
    pub fn entries(&self) -> CatalogResult<Vec<(K, V)>> {
        Self::decode_entries(self.merged(&[])?)
    }

    pub fn values(&self) -> CatalogResult<Vec<V>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn keys(&self) -> CatalogResult<Vec<K>> {
        self.merged(&[])?
            .into_keys()
            .map(|k| K::decode(&k))
            .collect()
    }

    /// Entries whose key starts with the encoding of `prefix`, in key order
    pub fn scan_prefix<P: KeyCodec>(&self, prefix: &P) -> CatalogResult<Vec<(K, V)>> {
        Self::decode_entries(self.merged(&prefix.encode())?)
    }

    pub fn len(&self) -> CatalogResult<usize> {
        Ok(self.merged(&[])?.len())
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Greatest key currently visible
    pub fn last_key(&self) -> CatalogResult<Option<K>> {
        match self.merged(&[])?.into_keys().next_back() {
            Some(k) => Ok(Some(K::decode(&k)?)),
            None => Ok(None),
        }
    }
}

impl<K, V> Transactional for Collection<K, V>
where
    K: KeyCodec,
    V: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        self.name
    }

    fn commit(&self) -> CatalogResult<()> {
        let mut staged = self.staged.write();
        if staged.is_empty() {
            return Ok(());
        }
        let batch: Vec<_> = std::mem::take(&mut *staged).into_iter().collect();
        debug!("Committing {} staged writes to '{}'", batch.len(), self.name);
        self.tree.apply_batch(&batch)?;
        Ok(())
    }

    fn rollback(&self) {
        self.staged.write().clear();
    }

    fn clear(&self) -> CatalogResult<()> {
        self.staged.write().clear();
        self.tree.clear()?;
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.staged.read().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog store
// ---------------------------------------------------------------------------

/// Every persisted index of the catalog
pub struct CatalogStore {
    driver: Mutex<Option<BoxedDriver>>,

    pub namespaces: Collection<u64, Namespace>,
    pub namespace_names: Collection<String, u64>,
    pub namespace_children: Collection<u64, Vec<u64>>,

    pub tables: Collection<u64, Table>,
    /// (namespace id, table name) -> table id
    pub table_names: Collection<(u64, String), u64>,
    pub table_children: Collection<u64, Vec<u64>>,

    pub columns: Collection<u64, Column>,
    /// (table id, column name) -> column id
    pub column_names: Collection<(u64, String), u64>,
    /// (adapter id, column id)
    pub column_placements: Collection<(u64, u64), ColumnPlacement>,

    pub adapters: Collection<u64, Adapter>,
    pub adapter_names: Collection<String, u64>,

    pub keys: Collection<u64, Key>,
    pub key_columns: Collection<Vec<u64>, u64>,
    /// key id -> table id
    pub primary_keys: Collection<u64, u64>,
    pub foreign_keys: Collection<u64, ForeignKey>,
    pub constraints: Collection<u64, Constraint>,
    pub indexes: Collection<u64, Index>,

    pub partition_groups: Collection<u64, PartitionGroup>,
    pub partitions: Collection<u64, Partition>,
    /// (adapter id, partition id)
    pub partition_placements: Collection<(u64, u64), PartitionPlacement>,
    /// (adapter id, table id)
    pub data_placements: Collection<(u64, u64), DataPlacement>,

    pub graphs: Collection<u64, Graph>,
    pub graph_names: Collection<String, u64>,
    pub graph_aliases: Collection<String, u64>,
    /// (graph id, adapter id)
    pub graph_placements: Collection<(u64, u64), GraphPlacement>,
    pub graph_mappings: Collection<u64, GraphMapping>,
    pub collection_mappings: Collection<u64, CollectionMapping>,
}

impl CatalogStore {
    /// Open (or create) every collection on the given driver
    ///
    /// Trees the layout does not know are dropped.
    pub fn open(driver: BoxedDriver) -> CatalogResult<Self> {
        let d = &driver;
        let store = Self {
            namespaces: Collection::open(d, "namespaces")?,
            namespace_names: Collection::open(d, "namespace_names")?,
            namespace_children: Collection::open(d, "namespace_children")?,
            tables: Collection::open(d, "tables")?,
            table_names: Collection::open(d, "table_names")?,
            table_children: Collection::open(d, "table_children")?,
            columns: Collection::open(d, "columns")?,
            column_names: Collection::open(d, "column_names")?,
            column_placements: Collection::open(d, "column_placements")?,
            adapters: Collection::open(d, "adapters")?,
            adapter_names: Collection::open(d, "adapter_names")?,
            keys: Collection::open(d, "keys")?,
            key_columns: Collection::open(d, "key_columns")?,
            primary_keys: Collection::open(d, "primary_keys")?,
            foreign_keys: Collection::open(d, "foreign_keys")?,
            constraints: Collection::open(d, "constraints")?,
            indexes: Collection::open(d, "indexes")?,
            partition_groups: Collection::open(d, "partition_groups")?,
            partitions: Collection::open(d, "partitions")?,
            partition_placements: Collection::open(d, "partition_placements")?,
            data_placements: Collection::open(d, "data_placements")?,
            graphs: Collection::open(d, "graphs")?,
            graph_names: Collection::open(d, "graph_names")?,
            graph_aliases: Collection::open(d, "graph_aliases")?,
            graph_placements: Collection::open(d, "graph_placements")?,
            graph_mappings: Collection::open(d, "graph_mappings")?,
            collection_mappings: Collection::open(d, "collection_mappings")?,
            driver: Mutex::new(None),
        };
        let known = store.collection_names();
        for name in driver.list_trees()? {
            if !known.contains(&name) {
                warn!("Dropping unknown catalog collection '{}'", name);
                driver.drop_tree(&name)?;
            }
        }
        *store.driver.lock() = Some(driver);
        Ok(store)
    }

    fn all(&self) -> [&dyn Transactional; 27] {
        [
            &self.namespaces,
            &self.namespace_names,
            &self.namespace_children,
            &self.tables,
            &self.table_names,
            &self.table_children,
            &self.columns,
            &self.column_names,
            &self.column_placements,
            &self.adapters,
            &self.adapter_names,
            &self.keys,
            &self.key_columns,
            &self.primary_keys,
            &self.foreign_keys,
            &self.constraints,
            &self.indexes,
            &self.partition_groups,
            &self.partitions,
            &self.partition_placements,
            &self.data_placements,
            &self.graphs,
            &self.graph_names,
            &self.graph_aliases,
            &self.graph_placements,
            &self.graph_mappings,
            &self.collection_mappings,
        ]
    }

    /// Apply every staged write and flush the driver
    pub fn commit(&self) -> CatalogResult<()> {
        for collection in self.all() {
            collection.commit()?;
        }
        if let Some(driver) = self.driver.lock().as_ref() {
            driver.flush()?;
        }
        Ok(())
    }

    pub fn rollback(&self) {
        for collection in self.all() {
            collection.rollback();
        }
    }

    pub fn clear(&self) -> CatalogResult<()> {
        for collection in self.all() {
            collection.clear()?;
        }
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.all().iter().any(|c| c.has_pending())
    }

    /// Names of all collections, in layout order
    pub fn collection_names(&self) -> Vec<String> {
        self.all().iter().map(|c| c.name().to_string()).collect()
    }

    /// Committed size of one collection, if the driver reports it
    pub fn collection_stats(&self, name: &str) -> CatalogResult<Option<TreeStatistics>> {
        match self.driver.lock().as_ref() {
            Some(driver) => Ok(driver.tree_stats(name)?),
            None => Ok(None),
        }
    }

    /// Flush and release the driver; later commits only touch the trees
    pub fn close(&self) -> CatalogResult<()> {
        if let Some(mut driver) = self.driver.lock().take() {
            driver.shutdown()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{create_storage_driver, StorageType};

    fn memory_driver() -> BoxedDriver {
        create_storage_driver(StorageType::Memory, "", false).unwrap()
    }

    #[test]
    fn test_key_codec_preserves_order() {
        let a = (1u64, "b".to_string()).encode();
        let b = (2u64, "a".to_string()).encode();
        assert!(a < b);
        assert!(256u64.encode() > 255u64.encode());

        let decoded = <(u64, u64, String)>::decode(&(7u64, 9u64, "x".to_string()).encode()).unwrap();
        assert_eq!(decoded, (7, 9, "x".to_string()));
        assert_eq!(Vec::<u64>::decode(&vec![3u64, 1].encode()).unwrap(), vec![3, 1]);
        assert!(u64::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_staged_writes_visible_until_rollback() {
        let driver = memory_driver();
        let names: Collection<(u64, String), u64> = Collection::open(&driver, "names").unwrap();

        names.put(&(1, "emps".into()), &10).unwrap();
        names.put(&(1, "depts".into()), &11).unwrap();
        names.put(&(2, "emps".into()), &12).unwrap();
        assert_eq!(names.get(&(1, "emps".into())).unwrap(), Some(10));

        let in_ns1: Vec<u64> = names
            .scan_prefix(&1u64)
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(in_ns1, vec![11, 10]);

        names.rollback();
        assert!(names.is_empty().unwrap());
    }

    #[test]
    fn test_commit_then_remove_then_rollback_restores() {
        let driver = memory_driver();
        let ids: Collection<u64, String> = Collection::open(&driver, "ids").unwrap();
        ids.put(&4, &"four".to_string()).unwrap();
        ids.commit().unwrap();
        assert!(!ids.has_pending());

        ids.remove(&4);
        assert!(!ids.contains(&4).unwrap());
        ids.rollback();
        assert_eq!(ids.get(&4).unwrap().as_deref(), Some("four"));
        assert_eq!(ids.last_key().unwrap(), Some(4));
    }

    #[test]
    fn test_open_drops_unknown_trees() {
        let driver = memory_driver();
        driver.open_tree("legacy_table_names").unwrap().insert(b"k", b"v").unwrap();

        let store = CatalogStore::open(driver).unwrap();
        assert!(store.collection_stats("legacy_table_names").unwrap().is_none());
        assert!(store.collection_stats("tables").unwrap().is_some());
        assert_eq!(store.collection_names().len(), 27);
    }
}
