//! Schema graph tests
//!
//! Namespaces, tables, views and columns: naming rules, cascading deletes and
//! the open-table commit guard.

#[path = "testutils/mod.rs"]
mod testutils;

use polycat::catalog::{
    CatalogError, CatalogEvent, Collation, ColumnType, DataModel, EntityType, EventKind, Pattern,
    PlanNode, PolyType, QueryLanguage, ViewDefinition,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use testutils::test_fixture::{integer, varchar, TestFixture};

#[derive(Debug)]
struct Scan(String);

impl PlanNode for Scan {
    fn describe(&self) -> String {
        format!("Scan({})", self.0)
    }
}

fn view_over(table_id: u64, column_ids: &[u64]) -> ViewDefinition {
    let mut underlying = BTreeMap::new();
    underlying.insert(table_id, column_ids.to_vec());
    ViewDefinition {
        query: "SELECT * FROM emps".into(),
        language: QueryLanguage::Sql,
        underlying_tables: underlying,
        materialized: None,
        ordered: false,
    }
}

#[test]
fn test_namespace_rename_keeps_tables() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();

    let sales = c.add_namespace("Sales", DataModel::Relational, false).unwrap();
    assert_eq!(c.get_namespace(sales).unwrap().name, "sales");
    fixture
        .create_table_in(sales, "orders", &[("id", integer())])
        .unwrap();
    c.commit().unwrap();

    c.rename_namespace(sales, "CRM").unwrap();
    assert_eq!(c.get_table_by_names("crm", "orders").unwrap().namespace_id, sales);
    assert!(matches!(
        c.get_namespace_by_name("sales"),
        Err(CatalogError::UnknownNamespace(_))
    ));
    assert!(c
        .rename_namespace(sales, "public")
        .unwrap_err()
        .is_invariant());
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_names_follow_namespace_case_rules() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();

    let (emps, _) = fixture.create_table("Emps", &[("EmpId", integer())]).unwrap();
    let table = c.get_table(emps).unwrap();
    assert_eq!(table.name, "emps");
    assert_eq!(c.get_table_by_name(fixture.namespace_id(), "EMPS").unwrap().id, emps);
    assert_eq!(c.get_column_by_name(emps, "empid").unwrap().name, "empid");

    let docs = c.add_namespace("docs", DataModel::Document, false).unwrap();
    let namespace = c.get_namespace(docs).unwrap();
    assert!(namespace.case_sensitive);
    let users = c
        .add_table("Users", docs, "admin", EntityType::Entity, true)
        .unwrap();
    assert_eq!(c.get_table(users).unwrap().name, "Users");
    assert!(c.get_table_by_name(docs, "users").unwrap_err().is_not_found());
    assert!(c.check_if_exists_table(docs, "Users").unwrap());
}

#[test]
fn test_table_without_primary_key_blocks_commit() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let ns = fixture.namespace_id();

    let table = c.add_table("depts", ns, "admin", EntityType::Entity, true).unwrap();
    assert_eq!(c.open_table(), Some(table));
    assert!(matches!(c.commit(), Err(CatalogError::NoTablePrimaryKey(name)) if name == "depts"));

    let deptno = c.add_column("deptno", table, 1, integer(), false, None).unwrap();
    c.add_primary_key(table, &[deptno]).unwrap();
    assert_eq!(c.open_table(), None);
    c.commit().unwrap();

    // rollback discards an open table
    c.add_table("scratch", ns, "admin", EntityType::Entity, true).unwrap();
    c.rollback().unwrap();
    assert_eq!(c.open_table(), None);
    assert!(!c.check_if_exists_table(ns, "scratch").unwrap());
    assert!(c.check_if_exists_table(ns, "depts").unwrap());
}

#[test]
fn test_delete_table_removes_dependents() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let store = fixture.add_store("store1").unwrap();
    let (emps, cols) = fixture.create_emps().unwrap();
    fixture.place_fully(store, emps).unwrap();
    c.add_unique_constraint(emps, "uq_name", &[cols[2]]).unwrap();
    c.commit().unwrap();

    let before = c.statistics().unwrap();
    assert_eq!(before.columns, 5);
    assert_eq!(before.column_placements, 5);
    assert_eq!(before.partition_placements, 1);

    c.delete_table(emps).unwrap();
    c.commit().unwrap();

    let after = c.statistics().unwrap();
    assert_eq!(after.tables, 0);
    assert_eq!(after.columns, 0);
    assert_eq!(after.keys, 0);
    assert_eq!(after.constraints, 0);
    assert_eq!(after.partition_groups, 0);
    assert_eq!(after.partitions, 0);
    assert_eq!(after.data_placements, 0);
    assert_eq!(after.column_placements, 0);
    assert_eq!(after.partition_placements, 0);
    assert!(!c.is_table_flagged_for_deletion(emps));
    assert!(c.get_namespace_children(fixture.namespace_id()).unwrap().is_empty());
    fixture.assert_consistent();
}

#[test]
fn test_view_blocks_base_table_drop() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let ns = fixture.namespace_id();
    let (emps, cols) = fixture.create_emps().unwrap();

    let view = c
        .add_view("emp_names", ns, "admin", view_over(emps, &cols[..3]), Arc::new(Scan("emps".into())))
        .unwrap();
    c.commit().unwrap();
    assert_eq!(c.get_table(emps).unwrap().connected_views, vec![view]);
    assert_eq!(c.get_table(view).unwrap().entity_type, EntityType::View);
    assert_eq!(c.get_view_plan(view).unwrap().describe(), "Scan(emps)");

    assert!(c.delete_table(emps).unwrap_err().is_invariant());

    c.delete_table(view).unwrap();
    assert!(c.get_table(emps).unwrap().connected_views.is_empty());
    assert!(c.get_view_plan(view).is_none());
    c.delete_table(emps).unwrap();
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_materialized_view_requires_criteria() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let ns = fixture.namespace_id();
    let (emps, cols) = fixture.create_emps().unwrap();

    let plain = view_over(emps, &cols);
    assert!(c
        .add_materialized_view("mv", ns, "admin", plain.clone(), Arc::new(Scan("emps".into())))
        .unwrap_err()
        .is_invariant());

    let definition = ViewDefinition {
        materialized: Some(polycat::catalog::MaterializedCriteria::new(
            polycat::catalog::RefreshPolicy::Manual,
        )),
        ..plain
    };
    let mv = c
        .add_materialized_view("mv", ns, "admin", definition, Arc::new(Scan("emps".into())))
        .unwrap();
    assert_eq!(c.get_partition_groups(mv).unwrap().len(), 1);
    c.update_materialized_view_refresh_time(mv).unwrap();
    let refreshed = c.get_table(mv).unwrap();
    assert!(refreshed
        .view
        .and_then(|d| d.materialized)
        .and_then(|m| m.last_update)
        .is_some());
    assert!(c
        .update_materialized_view_refresh_time(emps)
        .unwrap_err()
        .is_invariant());
}

#[test]
fn test_delete_namespace_drops_views_before_tables() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let hr = c.add_namespace("hr", DataModel::Relational, false).unwrap();
    let (depts, cols) = fixture
        .create_table_in(hr, "depts", &[("deptno", integer()), ("name", varchar(20))])
        .unwrap();
    let (emps, emp_cols) = fixture
        .create_table_in(hr, "emps", &[("empid", integer()), ("deptno", integer())])
        .unwrap();
    c.add_foreign_key(
        emps,
        &[emp_cols[1]],
        depts,
        &[cols[0]],
        "fk_dept",
        polycat::catalog::ForeignKeyOption::Restrict,
        polycat::catalog::ForeignKeyOption::Restrict,
    )
    .unwrap();
    c.add_view("dept_names", hr, "admin", view_over(depts, &cols), Arc::new(Scan("depts".into())))
        .unwrap();
    c.commit().unwrap();

    c.delete_namespace(hr).unwrap();
    c.commit().unwrap();
    assert!(!c.check_if_exists_namespace("hr").unwrap());
    assert_eq!(c.statistics().unwrap().tables, 0);
    assert_eq!(c.statistics().unwrap().foreign_keys, 0);
    fixture.assert_consistent();
}

#[test]
fn test_delete_namespace_refused_while_referenced() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let hr = c.add_namespace("hr", DataModel::Relational, false).unwrap();
    let (depts, cols) = fixture
        .create_table_in(hr, "depts", &[("deptno", integer())])
        .unwrap();
    let (emps, emp_cols) = fixture
        .create_table("emps", &[("empid", integer()), ("deptno", integer())])
        .unwrap();
    c.add_foreign_key(
        emps,
        &[emp_cols[1]],
        depts,
        &[cols[0]],
        "fk_dept",
        polycat::catalog::ForeignKeyOption::None,
        polycat::catalog::ForeignKeyOption::None,
    )
    .unwrap();

    assert!(c.delete_namespace(hr).unwrap_err().is_invariant());
    assert!(c.check_if_exists_namespace("hr").unwrap());
    assert!(c.check_if_exists_table_id(depts).unwrap());
}

#[test]
fn test_column_rules() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let (emps, cols) = fixture.create_emps().unwrap();

    assert!(c
        .add_column("note", emps, 9, varchar(10), true, None)
        .unwrap_err()
        .is_invariant());
    let decimal = ColumnType::new(PolyType::Decimal).with_length(4).with_scale(6);
    assert!(c.add_column("ratio", emps, 9, decimal, true, None).is_err());
    assert!(c
        .add_column("salary", emps, 9, integer(), true, None)
        .unwrap_err()
        .is_invariant());

    // primary key column
    assert!(c.set_nullable(cols[0], true).unwrap_err().is_invariant());
    assert!(c.delete_column(cols[0]).unwrap_err().is_invariant());
    assert!(c.set_collation(cols[1], Collation::CaseSensitive).is_err());

    c.set_column_type(cols[3], ColumnType::new(PolyType::BigInt)).unwrap();
    c.set_column_type(cols[4], varchar(12)).unwrap();
    assert_eq!(c.get_column(cols[4]).unwrap().collation, Some(Collation::default()));
    c.set_default_value(cols[3], PolyType::BigInt, "0").unwrap();
    assert_eq!(c.get_column(cols[3]).unwrap().default_value.unwrap().value, "0");
    c.delete_default_value(cols[3]).unwrap();
    assert!(c.get_column(cols[3]).unwrap().default_value.is_none());

    c.rename_column(cols[2], "full_name").unwrap();
    assert_eq!(c.get_column_by_name(emps, "full_name").unwrap().id, cols[2]);
    c.delete_column(cols[4]).unwrap();
    assert_eq!(c.get_columns(emps).unwrap().len(), 4);
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_columns_ordered_by_position_and_pattern() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let (emps, cols) = fixture.create_emps().unwrap();

    c.set_column_position(cols[0], 10).unwrap();
    let names: Vec<String> = c.get_columns(emps).unwrap().into_iter().map(|col| col.name).collect();
    assert_eq!(names, vec!["deptno", "name", "salary", "commission", "empid"]);

    let like = Pattern::new("%id").unwrap();
    let table = Pattern::new("emp_").unwrap();
    let matched = c.get_columns_by_pattern(None, Some(&table), Some(&like)).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, cols[0]);
    assert_eq!(
        c.get_column_by_names("public", "emps", "salary").unwrap().id,
        cols[3]
    );
}

#[test]
fn test_listeners_receive_changes() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let tables = Arc::new(AtomicUsize::new(0));
    let all = Arc::new(AtomicUsize::new(0));

    let counter = tables.clone();
    let id = c
        .add_listener(
            "table",
            Arc::new(move |event: &CatalogEvent| {
                assert_eq!(event.kind(), EventKind::Table);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    let counter = all.clone();
    c.add_listener_for(
        None,
        Arc::new(move |_: &CatalogEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert!(c.add_listener("no_such_event", Arc::new(|_: &CatalogEvent| {})).is_err());

    let ns = fixture.namespace_id();
    let table = c.add_table("t", ns, "admin", EntityType::Entity, true).unwrap();
    assert_eq!(tables.load(Ordering::SeqCst), 1);
    c.rename_table(table, "u").unwrap();
    assert_eq!(tables.load(Ordering::SeqCst), 2);
    assert!(all.load(Ordering::SeqCst) > 2);

    assert!(c.remove_listener(id));
    c.set_table_owner(table, "bob").unwrap();
    assert_eq!(tables.load(Ordering::SeqCst), 2);
    assert_eq!(c.get_table_by_name(ns, "u").unwrap().owner, "bob");
}
