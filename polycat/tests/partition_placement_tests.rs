//! Partitioning and placement tests
//!
//! Every column of a table has to stay available for every partition on at
//! least one adapter. Removals that would break this are refused unless the
//! table itself is being dropped.

#[path = "testutils/mod.rs"]
mod testutils;

use polycat::catalog::{
    Catalog, CatalogConfig, CatalogError, EntityType, PartitionProperty, PartitionType,
    PeriodicTask, PlacementType, DEFAULT_NAMESPACE, DEFAULT_PARTITION_GROUP,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use testutils::test_fixture::TestFixture;

/// emps split into four hash partitions; returns (table, columns, partitions)
fn partitioned_emps(fixture: &TestFixture, periodic: bool) -> (u64, Vec<u64>, Vec<u64>) {
    let c = fixture.catalog();
    let ns = fixture.namespace_id();
    let (emps, cols) = fixture.create_emps().unwrap();
    let default_group = c.get_table(emps).unwrap().partition_property.partition_group_ids[0];

    let group = c
        .add_partition_group(emps, "by_empid", ns, PartitionType::Hash, 4, Vec::new(), false)
        .unwrap();
    let parts = c.get_partition_group(group).unwrap().partition_ids;
    c.partition_table(
        emps,
        PartitionProperty {
            partition_type: PartitionType::Hash,
            partition_column_id: Some(cols[0]),
            is_partitioned: true,
            partition_group_ids: vec![group],
            partition_ids: parts.clone(),
            relies_on_periodic_checks: periodic,
        },
    )
    .unwrap();
    c.delete_partition_group(emps, ns, default_group).unwrap();
    (emps, cols, parts)
}

#[test]
fn test_remove_data_placement() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let (emps, cols) = fixture.create_emps().unwrap();

    fixture.place_fully(a, emps).unwrap();
    assert!(c.remove_data_placement(a, emps).unwrap_err().is_invariant());

    fixture.place_fully(b, emps).unwrap();
    assert_eq!(c.get_all_full_data_placements(emps).unwrap().len(), 2);
    assert_eq!(c.get_table(emps).unwrap().adapter_ids, vec![a, b]);

    c.remove_data_placement(a, emps).unwrap();
    assert!(c.get_data_placement(a, emps).unwrap_err().is_not_found());
    assert!(c.get_column_placements_on_adapter(a).unwrap().is_empty());
    assert!(c.get_partition_placements_on_adapter(a).unwrap().is_empty());
    assert_eq!(c.get_table(emps).unwrap().adapter_ids, vec![b]);
    assert_eq!(c.get_column_placements_by_column(cols[3]).unwrap().len(), 1);

    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_coverage_over_partitions() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let (emps, cols, parts) = partitioned_emps(&fixture, false);
    let salary = cols[3];

    fixture.place(a, emps, &cols, &parts[..3]).unwrap();
    fixture.place(b, emps, &cols, &parts).unwrap();

    assert_eq!(c.get_all_full_data_placements(emps).unwrap().len(), 1);
    assert_eq!(c.get_all_column_full_data_placements(emps).unwrap().len(), 2);
    assert_eq!(c.get_partitions_on_data_placement(a, emps).unwrap(), parts[..3].to_vec());

    // b still holds everything
    assert!(c
        .validate_data_placements_constraints(emps, a, &[salary], &[])
        .unwrap());
    // nobody else holds salary for the fourth partition
    assert!(!c
        .validate_data_placements_constraints(emps, b, &[salary], &[])
        .unwrap());
    assert!(c
        .validate_data_placements_constraints(emps, b, &[], &[parts[0]])
        .unwrap());
    assert!(!c
        .validate_data_placements_constraints(emps, b, &[], &[parts[3]])
        .unwrap());
    assert!(c.validate_data_placements_constraints(emps, b, &[], &[]).unwrap());

    assert!(c.delete_column_placement(b, salary, false).unwrap_err().is_invariant());
    assert!(c.delete_partition_placement(b, parts[3]).unwrap_err().is_invariant());
    c.delete_partition_placement(b, parts[0]).unwrap();
    assert!(!c.check_if_exists_partition_placement(b, parts[0]).unwrap());
    assert_eq!(c.get_partition_placements(parts[0]).unwrap().len(), 1);
    assert!(c.get_all_full_data_placements(emps).unwrap().is_empty());

    // a is now the only holder of the first partition
    assert!(c.delete_column_placement(a, salary, false).unwrap_err().is_invariant());
    assert!(c.remove_data_placement(a, emps).unwrap_err().is_invariant());

    c.flag_table_for_deletion(emps, true).unwrap();
    assert!(c
        .validate_data_placements_constraints(emps, b, &[salary], &[])
        .unwrap());
    c.flag_table_for_deletion(emps, false).unwrap();

    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_placement_queries() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let (emps, cols, parts) = partitioned_emps(&fixture, false);

    // placed in reverse order, listed by column position
    let reversed: Vec<u64> = cols.iter().rev().copied().collect();
    fixture.place(a, emps, &reversed, &parts).unwrap();
    fixture.place(b, emps, &cols[..2], &parts[..1]).unwrap();

    let on_a: Vec<u64> = c
        .get_column_placements_on_adapter_per_table(a, emps)
        .unwrap()
        .into_iter()
        .map(|p| p.column_id)
        .collect();
    assert_eq!(on_a, cols);

    let by_adapter = c.get_column_placements_by_adapter(emps).unwrap();
    assert_eq!(by_adapter[&a].len(), 5);
    assert_eq!(by_adapter[&b], cols[..2].to_vec());
    assert_eq!(c.get_partition_placements_by_adapter(emps).unwrap()[&b], vec![parts[0]]);

    let group = c.get_partition_groups(emps).unwrap()[0].id;
    let adapters: Vec<u64> = c
        .get_adapters_by_partition_group(emps, group)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(adapters, vec![a, b]);
    assert_eq!(c.get_partition_groups_on_data_placement(b, emps).unwrap(), vec![group]);
    assert_eq!(c.get_partition_groups_index_on_data_placement(b, emps).unwrap(), vec![0]);
    assert_eq!(
        c.get_column_placements_by_partition_group(emps, group, cols[4])
            .unwrap()
            .len(),
        1
    );

    assert!(matches!(
        c.add_column_placement(a, cols[0], PlacementType::Manual, None, None),
        Err(CatalogError::EntityAlreadyExists(_))
    ));
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_physical_names_and_positions() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let (emps, cols) = fixture.create_emps().unwrap();
    fixture.place_fully(a, emps).unwrap();

    let before = c.get_column_placement(a, cols[2]).unwrap();
    assert!(before.physical_column_name.is_none());
    c.update_column_placement_physical_names(a, cols[2], "public", "col_name", true)
        .unwrap();
    let after = c.get_column_placement(a, cols[2]).unwrap();
    assert_eq!(after.physical_schema_name.as_deref(), Some("public"));
    assert_eq!(after.physical_column_name.as_deref(), Some("col_name"));
    assert!(after.physical_position > before.physical_position);

    c.update_column_placement_physical_position(a, cols[0], Some(100)).unwrap();
    c.update_column_placement_physical_position(a, cols[1], None).unwrap();
    assert_eq!(c.get_column_placement(a, cols[0]).unwrap().physical_position, 100);
    assert!(c.get_column_placement(a, cols[1]).unwrap().physical_position > 100);

    c.update_column_placement_type(a, cols[0], PlacementType::Static).unwrap();
    assert_eq!(
        c.get_column_placement(a, cols[0]).unwrap().placement_type,
        PlacementType::Static
    );

    let partition = c.get_table(emps).unwrap().partition_property.partition_ids[0];
    c.update_partition_placement_physical_names(a, partition, "public", "tab_emps_p0")
        .unwrap();
    assert_eq!(
        c.get_partition_placement(a, partition)
            .unwrap()
            .physical_table_name
            .as_deref(),
        Some("tab_emps_p0")
    );
    c.commit().unwrap();
}

#[test]
fn test_merge_table() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let (emps, cols, parts) = partitioned_emps(&fixture, true);
    fixture.place(a, emps, &cols, &parts[..2]).unwrap();
    fixture.place(b, emps, &cols, &parts).unwrap();
    assert!(c.is_periodic_job_running());

    let group = c.merge_table(emps).unwrap();
    let table = c.get_table(emps).unwrap();
    assert!(!table.partition_property.is_partitioned);
    assert_eq!(table.partition_property.partition_group_ids, vec![group]);
    assert_eq!(c.get_partition_group_names(emps).unwrap(), vec![DEFAULT_PARTITION_GROUP]);

    let partition = table.partition_property.partition_ids[0];
    assert_eq!(c.get_partitions_by_table(emps).unwrap().len(), 1);
    assert_eq!(c.get_all_full_data_placements(emps).unwrap().len(), 2);
    assert_eq!(c.get_partition_placements(partition).unwrap().len(), 2);
    for old in &parts {
        assert!(c.get_partition(*old).unwrap_err().is_integrity());
    }

    assert!(!c.is_periodic_job_running());
    assert!(c.get_tables_for_periodic_processing().unwrap().is_empty());
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_delete_partition_group_updates_table() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let ns = fixture.namespace_id();
    let a = fixture.add_store("store_a").unwrap();
    let (emps, cols, parts) = partitioned_emps(&fixture, false);
    fixture.place(a, emps, &cols, &parts).unwrap();

    let extra = c
        .add_partition_group(emps, "extra", ns, PartitionType::List, 1, vec!["x".into()], false)
        .unwrap();
    let added = c.add_partition(emps, ns, extra, vec!["y".into()], false).unwrap();
    assert_eq!(c.get_partitions(extra).unwrap().len(), 2);

    c.delete_partition(emps, ns, parts[3]).unwrap();
    let table = c.get_table(emps).unwrap();
    assert_eq!(table.partition_property.partition_ids, parts[..3].to_vec());
    assert!(!c.check_if_exists_partition_placement(a, parts[3]).unwrap());
    let group = table.partition_property.partition_group_ids[0];
    assert_eq!(c.get_partition_group(group).unwrap().partition_ids.len(), 3);

    c.delete_partition_group(emps, ns, extra).unwrap();
    assert!(c.get_partition(added).unwrap_err().is_integrity());
    assert!(matches!(
        c.delete_partition(emps, ns + 100, parts[0]),
        Err(CatalogError::InvalidParameters(_))
    ));
    c.commit().unwrap();
    fixture.assert_consistent();
}

struct Recorder(Mutex<Vec<Vec<u64>>>);

impl PeriodicTask for Recorder {
    fn run(&self, table_ids: &[u64]) {
        self.0.lock().unwrap().push(table_ids.to_vec());
    }
}

#[test]
fn test_periodic_processing() {
    let catalog = Catalog::open(CatalogConfig {
        periodic_interval_secs: 1,
        ..CatalogConfig::in_memory()
    })
    .unwrap();
    let ns = catalog.get_namespace_by_name(DEFAULT_NAMESPACE).unwrap().id;
    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    catalog.set_periodic_task(recorder.clone());

    let table = catalog
        .add_table("readings", ns, "admin", EntityType::Entity, true)
        .unwrap();
    assert!(!catalog.is_periodic_job_running());
    catalog.add_table_to_periodic_processing(table).unwrap();
    assert!(catalog.is_periodic_job_running());
    assert_eq!(catalog.get_tables_for_periodic_processing().unwrap(), vec![table]);

    let deadline = Instant::now() + Duration::from_secs(10);
    while catalog.periodic_ticks() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(catalog.periodic_ticks() > 0);
    assert_eq!(recorder.0.lock().unwrap()[0], vec![table]);

    catalog.delete_table(table).unwrap();
    assert!(!catalog.is_periodic_job_running());
    assert!(catalog.get_tables_for_periodic_processing().unwrap().is_empty());
    catalog.close().unwrap();
}

#[test]
fn test_repartitioning_without_periodic_checks_stops_tracking() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let (emps, _, _) = partitioned_emps(&fixture, true);
    assert!(c.is_periodic_job_running());
    assert_eq!(c.get_tables_for_periodic_processing().unwrap(), vec![emps]);

    let property = PartitionProperty {
        relies_on_periodic_checks: false,
        ..c.get_table(emps).unwrap().partition_property
    };
    c.partition_table(emps, property).unwrap();
    assert!(!c.is_periodic_job_running());
    assert!(c.get_tables_for_periodic_processing().unwrap().is_empty());
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_rollback_stops_periodic_processing_of_discarded_tables() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    c.commit().unwrap();
    partitioned_emps(&fixture, true);
    let flagged = c.get_table_by_name(fixture.namespace_id(), "emps").unwrap().id;
    c.flag_table_for_deletion(flagged, true).unwrap();
    assert!(c.is_periodic_job_running());

    c.rollback().unwrap();
    assert!(!c.is_periodic_job_running());
    assert!(c.get_tables_for_periodic_processing().unwrap().is_empty());
    assert!(!c.is_table_flagged_for_deletion(flagged));
}

#[test]
fn test_rollback_keeps_committed_periodic_tables() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let (emps, _, _) = partitioned_emps(&fixture, true);
    c.commit().unwrap();

    let property = PartitionProperty {
        relies_on_periodic_checks: false,
        ..c.get_table(emps).unwrap().partition_property
    };
    c.partition_table(emps, property).unwrap();
    assert!(!c.is_periodic_job_running());

    c.rollback().unwrap();
    assert!(c.is_periodic_job_running());
    assert_eq!(c.get_tables_for_periodic_processing().unwrap(), vec![emps]);
    c.close().unwrap();
}
