//! Test fixture for PolyCat integration tests
//!
//! Provides isolated catalog instances using only the public `Catalog` API.

#![allow(dead_code)]

use polycat::catalog::{
    AdapterKind, Catalog, CatalogConfig, Collation, ColumnType, DataPlacementRole, EntityType,
    PlacementType, PolyType, DEFAULT_NAMESPACE,
};
use std::collections::BTreeMap;

pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Test fixture with an isolated catalog
pub struct TestFixture {
    catalog: Catalog,
    namespace_id: u64,
    temp_dir: Option<tempfile::TempDir>,
}

pub fn integer() -> ColumnType {
    ColumnType::new(PolyType::Integer)
}

pub fn varchar(length: u32) -> ColumnType {
    ColumnType::new(PolyType::Varchar).with_length(length)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl TestFixture {
    /// In-memory catalog with the default namespace
    pub fn new() -> FixtureResult<Self> {
        init_logging();
        let catalog = Catalog::in_memory()?;
        Self::wrap(catalog, None)
    }

    /// Sled-backed catalog in a temporary directory
    pub fn persistent() -> FixtureResult<Self> {
        init_logging();
        let temp_dir = tempfile::tempdir()?;
        let catalog = Catalog::open(CatalogConfig::persistent(temp_dir.path().join("catalog")))?;
        Self::wrap(catalog, Some(temp_dir))
    }

    fn wrap(catalog: Catalog, temp_dir: Option<tempfile::TempDir>) -> FixtureResult<Self> {
        let namespace_id = catalog.get_namespace_by_name(DEFAULT_NAMESPACE)?.id;
        Ok(Self {
            catalog,
            namespace_id,
            temp_dir,
        })
    }

    /// Close the catalog and open the same directory again
    pub fn reopen(self) -> FixtureResult<Self> {
        let TestFixture {
            catalog, temp_dir, ..
        } = self;
        let config = catalog.config().clone();
        catalog.close()?;
        drop(catalog);
        let catalog = Catalog::open(config)?;
        Self::wrap(catalog, temp_dir)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Id of the `public` namespace
    pub fn namespace_id(&self) -> u64 {
        self.namespace_id
    }

    /// Register a writable store adapter
    pub fn add_store(&self, name: &str) -> FixtureResult<u64> {
        Ok(self
            .catalog
            .add_adapter(name, "memory", AdapterKind::Store, BTreeMap::new())?)
    }

    /// Table in `public` with non-null columns and a primary key on the first column
    pub fn create_table(&self, name: &str, columns: &[(&str, ColumnType)]) -> FixtureResult<(u64, Vec<u64>)> {
        self.create_table_in(self.namespace_id, name, columns)
    }

    pub fn create_table_in(
        &self,
        namespace_id: u64,
        name: &str,
        columns: &[(&str, ColumnType)],
    ) -> FixtureResult<(u64, Vec<u64>)> {
        let c = &self.catalog;
        let table = c.add_table(name, namespace_id, "admin", EntityType::Entity, true)?;
        let mut ids = Vec::with_capacity(columns.len());
        for (position, (column, column_type)) in columns.iter().enumerate() {
            let collation = column_type.base.is_character().then(Collation::default);
            ids.push(c.add_column(
                column,
                table,
                position as u32 + 1,
                column_type.clone(),
                false,
                collation,
            )?);
        }
        if let Some(first) = ids.first() {
            c.add_primary_key(table, &[*first])?;
        }
        Ok((table, ids))
    }

    /// The classic `emps` table: empid, deptno, name, salary, commission
    pub fn create_emps(&self) -> FixtureResult<(u64, Vec<u64>)> {
        self.create_table(
            "emps",
            &[
                ("empid", integer()),
                ("deptno", integer()),
                ("name", varchar(20)),
                ("salary", integer()),
                ("commission", integer()),
            ],
        )
    }

    /// Place the given columns and partitions of a table on an adapter
    pub fn place(&self, adapter_id: u64, table_id: u64, columns: &[u64], partitions: &[u64]) -> FixtureResult<()> {
        let c = &self.catalog;
        let table = c.get_table(table_id)?;
        for column_id in columns {
            c.add_column_placement(adapter_id, *column_id, PlacementType::Manual, None, None)?;
        }
        for partition_id in partitions {
            c.add_partition_placement(
                table.namespace_id,
                adapter_id,
                table_id,
                *partition_id,
                PlacementType::Manual,
                None,
                None,
                DataPlacementRole::UpToDate,
            )?;
        }
        Ok(())
    }

    /// Place every column and partition of a table on an adapter
    pub fn place_fully(&self, adapter_id: u64, table_id: u64) -> FixtureResult<()> {
        let table = self.catalog.get_table(table_id)?;
        self.place(
            adapter_id,
            table_id,
            &table.column_ids,
            &table.partition_property.partition_ids,
        )
    }

    /// Assert the validator finds nothing wrong
    pub fn assert_consistent(&self) {
        let violations = self
            .catalog
            .consistency_violations()
            .expect("validator failed to run");
        assert!(violations.is_empty(), "inconsistencies: {:?}", violations);
    }
}
