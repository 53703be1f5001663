//! Graph and document collection tests
//!
//! Graphs and collections are stored as synthetic relational tables; these
//! tests go through the public logistics operations only.

#[path = "testutils/mod.rs"]
mod testutils;

use polycat::catalog::{CatalogError, DataModel, IndexType, Pattern, PolyType};
use testutils::test_fixture::TestFixture;

#[test]
fn test_graph_logistics() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();

    let graph = c.add_graph("Social", true, false).unwrap();
    assert_eq!(c.add_graph("social", true, true).unwrap(), graph);
    assert!(matches!(
        c.add_graph("social", true, false),
        Err(CatalogError::EntityAlreadyExists(_))
    ));
    let namespace = c.get_namespace(graph).unwrap();
    assert_eq!(namespace.name, "social");
    assert_eq!(namespace.model, DataModel::Graph);
    assert!(namespace.case_sensitive);

    c.add_graph_logistics(graph, &[a, b], false).unwrap();
    let mapping = c.get_graph_mapping(graph).unwrap();
    assert_eq!(c.get_namespace_children(graph).unwrap().len(), 4);
    assert_eq!(c.get_table_by_name(graph, "_nodes_").unwrap().id, mapping.nodes_id);
    assert_eq!(c.get_column(mapping.source_edge_id).unwrap().table_id, mapping.edges_id);
    assert_eq!(
        c.get_column(mapping.value_nodes_property_id).unwrap().column_type.base,
        PolyType::Varchar
    );
    for table_id in mapping.table_ids() {
        assert_eq!(c.get_all_full_data_placements(table_id).unwrap().len(), 2);
        assert!(c.get_table(table_id).unwrap().primary_key.is_some());
    }
    assert_eq!(c.get_graph(graph).unwrap().placements, vec![a, b]);
    assert_eq!(c.get_graph_placements(graph).unwrap().len(), 2);
    assert!(matches!(
        c.add_graph_logistics(graph, &[a], false),
        Err(CatalogError::EntityAlreadyExists(_))
    ));
    c.commit().unwrap();

    c.update_graph_placement_physical_name(graph, b, "graph_social").unwrap();
    assert_eq!(
        c.get_graph_placement(graph, b).unwrap().physical_name.as_deref(),
        Some("graph_social")
    );

    c.delete_graph_placement(a, graph).unwrap();
    assert_eq!(c.get_graph(graph).unwrap().placements, vec![b]);
    assert!(c.get_data_placements_on_adapter(a).unwrap().is_empty());
    assert!(c.delete_graph_placement(b, graph).unwrap_err().is_invariant());
    assert!(c.get_graph_placement(graph, a).unwrap_err().is_not_found());

    c.add_graph_logistics(graph, &[a], true).unwrap();
    assert_eq!(c.get_graph_placements(graph).unwrap().len(), 2);
    assert_eq!(c.get_all_full_data_placements(mapping.edges_id).unwrap().len(), 2);

    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_graph_aliases() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let graph = c.add_graph("social", true, false).unwrap();
    let other = c.add_graph("roads", false, false).unwrap();

    c.add_graph_alias(graph, "Friends", false).unwrap();
    assert_eq!(c.get_graph_by_name("FRIENDS").unwrap().id, graph);
    assert_eq!(c.get_graph_aliases(graph).unwrap(), vec!["friends".to_string()]);
    assert!(matches!(
        c.add_graph_alias(other, "friends", false),
        Err(CatalogError::EntityAlreadyExists(_))
    ));
    c.add_graph_alias(graph, "friends", true).unwrap();
    assert!(matches!(
        c.add_graph_alias(graph, "roads", false),
        Err(CatalogError::EntityAlreadyExists(_))
    ));
    // a graph cannot take a name already used by a namespace or alias
    assert!(c.add_graph("public", true, false).is_err());
    assert!(c.add_graph("friends", true, false).is_err());

    let pattern = Pattern::new("fri%").unwrap();
    let found = c.get_graphs(Some(&pattern)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, graph);
    assert_eq!(c.get_graphs(None).unwrap().len(), 2);

    c.remove_graph_alias(graph, "friends", false).unwrap();
    assert!(c.get_graph_by_name("friends").unwrap_err().is_not_found());
    assert!(c.remove_graph_alias(graph, "friends", false).unwrap_err().is_not_found());
    c.remove_graph_alias(graph, "friends", true).unwrap();
    c.commit().unwrap();
}

#[test]
fn test_delete_graph() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let graph = c.add_graph("social", true, false).unwrap();
    c.add_graph_logistics(graph, &[a], false).unwrap();
    c.add_graph_alias(graph, "friends", false).unwrap();
    c.commit().unwrap();

    assert!(c.delete_adapter(a).unwrap_err().is_invariant());
    c.delete_graph(graph).unwrap();

    assert!(c.get_graph_by_name("social").unwrap_err().is_not_found());
    assert!(c.get_graph_by_name("friends").unwrap_err().is_not_found());
    assert!(c.get_namespace(graph).unwrap_err().is_integrity());
    assert!(c.get_graph_mapping(graph).unwrap_err().is_not_found());
    let stats = c.statistics().unwrap();
    assert_eq!(stats.graphs, 0);
    assert_eq!(stats.tables, 0);
    assert_eq!(stats.data_placements, 0);

    c.delete_adapter(a).unwrap();
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_collection_logistics() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let docs = c.add_namespace("docs", DataModel::Document, false).unwrap();
    assert!(c.get_namespace(docs).unwrap().case_sensitive);

    assert!(matches!(
        c.add_collection_logistics(fixture.namespace_id(), "orders", &[a], false),
        Err(CatalogError::InvalidParameters(_))
    ));

    let orders = c.add_collection_logistics(docs, "Orders", &[a, b], false).unwrap();
    let mapping = c.get_collection_mapping(orders).unwrap();
    assert_eq!(c.get_table(orders).unwrap().name, "Orders");
    assert!(c.get_table_by_name(docs, "orders").unwrap_err().is_not_found());
    assert_eq!(c.get_column(mapping.data_id).unwrap().column_type.base, PolyType::Json);
    assert_eq!(c.get_collections(docs, None).unwrap().len(), 1);
    assert_eq!(c.get_collection_placements(orders).unwrap().len(), 2);
    assert_eq!(c.get_collection_placements_by_adapter(a).unwrap().len(), 1);
    c.commit().unwrap();

    c.drop_collection_placement(orders, a).unwrap();
    assert!(c.get_collection_placements_by_adapter(a).unwrap().is_empty());
    assert!(c.drop_collection_placement(orders, b).unwrap_err().is_invariant());

    assert_eq!(c.add_collection_logistics(docs, "Orders", &[a], true).unwrap(), orders);
    assert_eq!(c.get_collection_placements(orders).unwrap().len(), 2);

    c.delete_collection(orders).unwrap();
    assert!(c.get_collection_mapping(orders).unwrap_err().is_not_found());
    assert!(c.get_collections(docs, None).unwrap().is_empty());
    assert!(c.get_data_placements_on_adapter(b).unwrap().is_empty());
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_delete_document_namespace_drops_collections() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let docs = c.add_namespace("docs", DataModel::Document, false).unwrap();
    let orders = c.add_collection_logistics(docs, "orders", &[a], false).unwrap();
    let items = c.add_collection_logistics(docs, "items", &[a], false).unwrap();
    c.commit().unwrap();

    c.delete_namespace(docs).unwrap();
    for collection in [orders, items] {
        assert!(c.get_collection_mapping(collection).unwrap_err().is_not_found());
    }
    assert!(c.get_collection_placements_by_adapter(a).unwrap().is_empty());
    fixture.assert_consistent();
    c.delete_adapter(a).unwrap();
    c.commit().unwrap();
    fixture.assert_consistent();
}

#[test]
fn test_deleting_synthetic_tables_drops_their_mappings() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let docs = c.add_namespace("docs", DataModel::Document, false).unwrap();
    let orders = c.add_collection_logistics(docs, "orders", &[a], false).unwrap();
    let graph = c.add_graph("social", true, false).unwrap();
    c.add_graph_logistics(graph, &[a], false).unwrap();
    let mapping = c.get_graph_mapping(graph).unwrap();
    c.commit().unwrap();

    c.delete_table(orders).unwrap();
    assert!(c.get_collection_mapping(orders).unwrap_err().is_not_found());
    assert!(c.get_collections(docs, None).unwrap().is_empty());

    c.delete_table(mapping.edges_property_id).unwrap();
    assert!(c.get_graph_mapping(graph).unwrap_err().is_not_found());
    fixture.assert_consistent();
    c.commit().unwrap();
}

#[test]
fn test_adapter_with_index_or_graph_placement_is_kept() {
    let fixture = TestFixture::new().expect("Failed to create test fixture");
    let c = fixture.catalog();
    let a = fixture.add_store("store_a").unwrap();
    let b = fixture.add_store("store_b").unwrap();
    let (emps, cols) = fixture.create_emps().unwrap();

    let index = c
        .add_index(emps, &[cols[3]], false, "hash", "Hash", a, IndexType::Manual, "idx_salary")
        .unwrap();
    assert!(c.delete_adapter(a).unwrap_err().is_invariant());
    assert!(c.check_if_exists_adapter(a).unwrap());
    c.delete_index(index).unwrap();
    c.delete_adapter(a).unwrap();

    let graph = c.add_graph("social", true, false).unwrap();
    c.add_graph_placement(b, graph).unwrap();
    assert!(c.delete_adapter(b).unwrap_err().is_invariant());
    c.delete_graph(graph).unwrap();
    c.delete_adapter(b).unwrap();

    c.commit().unwrap();
    fixture.assert_consistent();
}
