// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog entity definitions
//!
//! Every entity is an immutable value. Mutations build a modified copy and
//! install it under the same id, so a concurrent reader always sees either the
//! old or the new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

/// Data model served by a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataModel {
    Relational,
    Document,
    Graph,
}

impl DataModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataModel::Relational => "relational",
            DataModel::Document => "document",
            DataModel::Graph => "graph",
        }
    }
}

impl Default for DataModel {
    fn default() -> Self {
        DataModel::Relational
    }
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named container of tables, collections or graph tables (a schema)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub model: DataModel,
    pub case_sensitive: bool,
}

impl Namespace {
    /// Normalise an entity name for lookup inside this namespace
    pub fn normalize(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }
}

// ---------------------------------------------------------------------------
// Tables, views and collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Regular table (or synthetic table behind a collection or graph)
    Entity,
    /// Read-only table provided by a source adapter
    Source,
    View,
    MaterializedView,
}

impl EntityType {
    pub fn is_view(&self) -> bool {
        matches!(self, EntityType::View | EntityType::MaterializedView)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Entity => "entity",
            EntityType::Source => "source",
            EntityType::View => "view",
            EntityType::MaterializedView => "materialized_view",
        }
    }
}

/// Language a view definition was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryLanguage {
    Sql,
    Rel,
    Mongo,
    Cypher,
}

impl QueryLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryLanguage::Sql => "sql",
            QueryLanguage::Rel => "rel",
            QueryLanguage::Mongo => "mongo",
            QueryLanguage::Cypher => "cypher",
        }
    }
}

impl std::str::FromStr for QueryLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(QueryLanguage::Sql),
            "rel" => Ok(QueryLanguage::Rel),
            "mongo" | "mql" => Ok(QueryLanguage::Mongo),
            "cypher" => Ok(QueryLanguage::Cypher),
            _ => Err(format!("Unknown query language: {}", s)),
        }
    }
}

/// When a materialized view gets refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    Manual,
    OnUpdate,
    Interval { seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedCriteria {
    pub policy: RefreshPolicy,
    pub last_update: Option<DateTime<Utc>>,
}

impl MaterializedCriteria {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            last_update: None,
        }
    }
}

/// Stored definition of a view or materialized view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub query: String,
    pub language: QueryLanguage,
    /// Base table id -> ids of the columns the view reads from it
    pub underlying_tables: BTreeMap<u64, Vec<u64>>,
    /// Present only for materialized views
    pub materialized: Option<MaterializedCriteria>,
    pub ordered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionType {
    None,
    Range,
    List,
    Hash,
    Temperature,
}

impl PartitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionType::None => "none",
            PartitionType::Range => "range",
            PartitionType::List => "list",
            PartitionType::Hash => "hash",
            PartitionType::Temperature => "temperature",
        }
    }
}

/// Table-level partitioning descriptor, always replaced as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionProperty {
    pub partition_type: PartitionType,
    pub partition_column_id: Option<u64>,
    pub is_partitioned: bool,
    pub partition_group_ids: Vec<u64>,
    pub partition_ids: Vec<u64>,
    pub relies_on_periodic_checks: bool,
}

impl PartitionProperty {
    /// A single unbound group holding a single partition
    pub fn unpartitioned(group_id: u64, partition_ids: Vec<u64>) -> Self {
        Self {
            partition_type: PartitionType::None,
            partition_column_id: None,
            is_partitioned: false,
            partition_group_ids: vec![group_id],
            partition_ids,
            relies_on_periodic_checks: false,
        }
    }

    /// Views own no partitions at all
    pub fn empty() -> Self {
        Self {
            partition_type: PartitionType::None,
            partition_column_id: None,
            is_partitioned: false,
            partition_group_ids: Vec::new(),
            partition_ids: Vec::new(),
            relies_on_periodic_checks: false,
        }
    }
}

/// Unified logical entity: table, view, materialized view, or the synthetic
/// table behind a document collection or graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: u64,
    pub name: String,
    pub namespace_id: u64,
    pub owner: String,
    pub entity_type: EntityType,
    pub column_ids: Vec<u64>,
    pub primary_key: Option<u64>,
    /// Adapters holding a data placement of this table
    pub adapter_ids: Vec<u64>,
    pub modifiable: bool,
    pub partition_property: PartitionProperty,
    /// Views reading from this table
    pub connected_views: Vec<u64>,
    pub view: Option<ViewDefinition>,
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Broad classification of [`PolyType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolyTypeFamily {
    Boolean,
    Numeric,
    Character,
    Binary,
    Datetime,
    Json,
    Collection,
    Graph,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolyType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Date,
    Time,
    Timestamp,
    Char,
    Varchar,
    Text,
    Binary,
    VarBinary,
    Json,
    Array,
    Map,
    Node,
    Edge,
    Any,
}

impl PolyType {
    pub fn family(&self) -> PolyTypeFamily {
        use PolyType::*;
        match self {
            Boolean => PolyTypeFamily::Boolean,
            TinyInt | SmallInt | Integer | BigInt | Decimal | Real | Double => {
                PolyTypeFamily::Numeric
            }
            Date | Time | Timestamp => PolyTypeFamily::Datetime,
            Char | Varchar | Text => PolyTypeFamily::Character,
            Binary | VarBinary => PolyTypeFamily::Binary,
            Json => PolyTypeFamily::Json,
            Array | Map => PolyTypeFamily::Collection,
            Node | Edge => PolyTypeFamily::Graph,
            Any => PolyTypeFamily::Any,
        }
    }

    pub fn is_character(&self) -> bool {
        self.family() == PolyTypeFamily::Character
    }
}

impl fmt::Display for PolyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self).to_uppercase();
        f.write_str(&name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collation {
    CaseSensitive,
    CaseInsensitive,
}

impl Default for Collation {
    fn default() -> Self {
        Collation::CaseInsensitive
    }
}

/// Full type descriptor of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub base: PolyType,
    /// Element type for collection columns
    pub element: Option<PolyType>,
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub dimension: Option<u32>,
    pub cardinality: Option<u32>,
}

impl ColumnType {
    pub fn new(base: PolyType) -> Self {
        Self {
            base,
            element: None,
            length: None,
            scale: None,
            dimension: None,
            cardinality: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn array_of(element: PolyType, dimension: u32, cardinality: u32) -> Self {
        Self {
            base: PolyType::Array,
            element: Some(element),
            length: None,
            scale: None,
            dimension: Some(dimension),
            cardinality: Some(cardinality),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub poly_type: PolyType,
    pub value: String,
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: u64,
    pub name: String,
    pub table_id: u64,
    pub namespace_id: u64,
    pub position: u32,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Required for character types, absent otherwise
    pub collation: Option<Collation>,
    pub default_value: Option<DefaultValue>,
}

// ---------------------------------------------------------------------------
// Keys, constraints, indexes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnforcementTime {
    OnCommit,
    OnQuery,
}

/// Shared, de-duplicated ordered column tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: u64,
    pub table_id: u64,
    pub namespace_id: u64,
    pub column_ids: Vec<u64>,
    pub enforcement: EnforcementTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintType {
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: u64,
    pub key_id: u64,
    pub constraint_type: ConstraintType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignKeyOption {
    None,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub id: u64,
    /// Key over the referencing columns
    pub key_id: u64,
    pub name: String,
    pub table_id: u64,
    pub namespace_id: u64,
    pub column_ids: Vec<u64>,
    pub referenced_key_id: u64,
    pub referenced_table_id: u64,
    pub referenced_namespace_id: u64,
    pub referenced_column_ids: Vec<u64>,
    pub on_update: ForeignKeyOption,
    pub on_delete: ForeignKeyOption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub id: u64,
    pub name: String,
    pub key_id: u64,
    pub unique: bool,
    pub method: String,
    pub method_display_name: String,
    pub index_type: IndexType,
    /// Adapter the index lives on
    pub location: u64,
    pub physical_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionGroup {
    pub id: u64,
    pub name: String,
    pub table_id: u64,
    pub namespace_id: u64,
    pub partition_ids: Vec<u64>,
    pub is_unbound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub id: u64,
    pub table_id: u64,
    pub namespace_id: u64,
    pub group_id: u64,
    pub qualifiers: Vec<String>,
    pub is_unbound: bool,
}

// ---------------------------------------------------------------------------
// Placements and adapters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementType {
    Manual,
    Automatic,
    Static,
}

/// Replication role of a data placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataPlacementRole {
    UpToDate,
    Refreshable,
}

/// Aggregate of what one adapter holds of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPlacement {
    pub table_id: u64,
    pub adapter_id: u64,
    pub placement_type: PlacementType,
    pub role: DataPlacementRole,
    pub column_ids: BTreeSet<u64>,
    pub partition_ids_by_role: BTreeMap<DataPlacementRole, BTreeSet<u64>>,
}

impl DataPlacement {
    pub fn new(table_id: u64, adapter_id: u64) -> Self {
        Self {
            table_id,
            adapter_id,
            placement_type: PlacementType::Automatic,
            role: DataPlacementRole::UpToDate,
            column_ids: BTreeSet::new(),
            partition_ids_by_role: BTreeMap::new(),
        }
    }

    pub fn all_partition_ids(&self) -> BTreeSet<u64> {
        self.partition_ids_by_role
            .values()
            .flat_map(|ids| ids.iter().copied())
            .collect()
    }

    /// Copy with the given columns and partitions; partitions take the placement's role
    pub fn with_contents(
        &self,
        column_ids: BTreeSet<u64>,
        partition_ids: BTreeSet<u64>,
    ) -> DataPlacement {
        let mut by_role = BTreeMap::new();
        if !partition_ids.is_empty() {
            by_role.insert(self.role, partition_ids);
        }
        DataPlacement {
            column_ids,
            partition_ids_by_role: by_role,
            ..self.clone()
        }
    }

    pub fn has_column_full_placement(&self, table: &Table) -> bool {
        table.column_ids.iter().all(|c| self.column_ids.contains(c))
    }

    pub fn has_partition_full_placement(&self, table: &Table) -> bool {
        let held = self.all_partition_ids();
        table
            .partition_property
            .partition_ids
            .iter()
            .all(|p| held.contains(p))
    }

    pub fn has_full_placement(&self, table: &Table) -> bool {
        self.has_column_full_placement(table) && self.has_partition_full_placement(table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlacement {
    pub namespace_id: u64,
    pub table_id: u64,
    pub column_id: u64,
    pub adapter_id: u64,
    pub adapter_unique_name: String,
    pub placement_type: PlacementType,
    pub physical_schema_name: Option<String>,
    pub physical_column_name: Option<String>,
    pub physical_position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlacement {
    pub namespace_id: u64,
    pub table_id: u64,
    pub adapter_id: u64,
    pub adapter_unique_name: String,
    pub placement_type: PlacementType,
    pub physical_schema_name: Option<String>,
    pub physical_table_name: Option<String>,
    pub partition_id: u64,
    pub role: DataPlacementRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterKind {
    /// Writable storage backend
    Store,
    /// Read-only federated backend
    Source,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Store => "store",
            AdapterKind::Source => "source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adapter {
    pub id: u64,
    pub unique_name: String,
    pub adapter_name: String,
    pub kind: AdapterKind,
    pub settings: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Multi-model records
// ---------------------------------------------------------------------------

/// Property graph; shares its id with the namespace holding its tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub modifiable: bool,
    pub placements: Vec<u64>,
    pub case_sensitive: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPlacement {
    pub graph_id: u64,
    pub adapter_id: u64,
    pub physical_name: Option<String>,
}

/// Ids of the synthetic tables and columns that make up a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMapping {
    pub graph_id: u64,
    pub nodes_id: u64,
    pub id_node_id: u64,
    pub label_node_id: u64,
    pub nodes_property_id: u64,
    pub id_nodes_property_id: u64,
    pub key_nodes_property_id: u64,
    pub value_nodes_property_id: u64,
    pub edges_id: u64,
    pub id_edge_id: u64,
    pub label_edge_id: u64,
    pub source_edge_id: u64,
    pub target_edge_id: u64,
    pub edges_property_id: u64,
    pub id_edges_property_id: u64,
    pub key_edges_property_id: u64,
    pub value_edges_property_id: u64,
}

impl GraphMapping {
    pub fn table_ids(&self) -> [u64; 4] {
        [
            self.nodes_id,
            self.nodes_property_id,
            self.edges_id,
            self.edges_property_id,
        ]
    }
}

/// Ids of the synthetic table and columns behind a document collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    pub collection_id: u64,
    pub id_id: u64,
    pub data_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(columns: Vec<u64>, partitions: Vec<u64>) -> Table {
        Table {
            id: 1,
            name: "emps".into(),
            namespace_id: 0,
            owner: "system".into(),
            entity_type: EntityType::Entity,
            column_ids: columns,
            primary_key: None,
            adapter_ids: vec![],
            modifiable: true,
            partition_property: PartitionProperty {
                partition_ids: partitions,
                ..PartitionProperty::empty()
            },
            connected_views: vec![],
            view: None,
        }
    }

    #[test]
    fn test_placement_classification() {
        let table = table_with(vec![10, 11], vec![100, 101]);
        let placement = DataPlacement::new(1, 5)
            .with_contents([10, 11].into_iter().collect(), [100].into_iter().collect());

        assert!(placement.has_column_full_placement(&table));
        assert!(!placement.has_partition_full_placement(&table));
        assert!(!placement.has_full_placement(&table));

        let full = placement.with_contents(
            placement.column_ids.clone(),
            [100, 101].into_iter().collect(),
        );
        assert!(full.has_full_placement(&table));
        assert_eq!(full.all_partition_ids().len(), 2);
    }

    #[test]
    fn test_type_families() {
        assert!(PolyType::Varchar.is_character());
        assert!(!PolyType::Json.is_character());
        assert_eq!(PolyType::BigInt.family(), PolyTypeFamily::Numeric);
        assert_eq!(PolyType::Varchar.to_string(), "VARCHAR");
    }

    #[test]
    fn test_namespace_normalisation() {
        let ns = Namespace {
            id: 0,
            name: "public".into(),
            owner: "system".into(),
            model: DataModel::Relational,
            case_sensitive: false,
        };
        assert_eq!(ns.normalize("Emps"), "emps");
        let docs = Namespace {
            case_sensitive: true,
            ..ns
        };
        assert_eq!(docs.normalize("Emps"), "Emps");
    }
}
