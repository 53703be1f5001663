// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for PolyCat

use colored::Colorize;
use std::path::{Path, PathBuf};

use super::commands::OutputFormat;
use super::output::{join_ids, or_dash, Listing, ListingFormatter};
use polycat::catalog::{Catalog, CatalogConfig, Pattern, SAMPLE_ADAPTER};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open an existing catalog, or the one described by a JSON configuration file
fn load_catalog(config: Option<&PathBuf>, path: &Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    let config = match config {
        Some(file) => CatalogConfig::from_json_file(file)?,
        None => {
            if !path.exists() {
                return Err(format!(
                    "Catalog not found at {:?}. Run 'polycat init' first.",
                    path
                )
                .into());
            }
            CatalogConfig::persistent(path)
        }
    };
    Ok(Catalog::open(config).map_err(|e| format!("Failed to open catalog: {}", e))?)
}

/// Split `namespace.table`; a bare name means the default namespace
fn split_table_name(qualified: &str) -> (&str, &str) {
    match qualified.split_once('.') {
        Some((namespace, table)) => (namespace, table),
        None => (polycat::catalog::DEFAULT_NAMESPACE, qualified),
    }
}

fn pattern(like: Option<&str>) -> Result<Option<Pattern>, Box<dyn std::error::Error>> {
    Ok(match like {
        Some(p) => Some(Pattern::new(p)?),
        None => None,
    })
}

/// Handle the init command
pub fn handle_init(config: Option<PathBuf>, path: PathBuf, reset: bool, sample: bool) -> CliResult {
    let mut config = match config {
        Some(file) => CatalogConfig::from_json_file(file)?,
        None => CatalogConfig::persistent(&path),
    };
    config.reset = reset;

    println!("{}", "Initializing PolyCat catalog...".bold().green());
    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let catalog =
        Catalog::open(config).map_err(|e| format!("Failed to initialize catalog: {}", e))?;
    println!("  → Storage: {}", catalog.storage_type());

    if sample {
        match catalog.get_adapter_by_name(SAMPLE_ADAPTER) {
            Ok(_) => println!("  → Sample schema already present"),
            Err(e) if e.is_not_found() => {
                println!("  → Adding sample schema...");
                catalog.add_sample_schema()?;
                catalog.commit()?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let stats = catalog.statistics()?;
    println!(
        "    {} namespaces, {} tables, {} adapters",
        stats.namespaces, stats.tables, stats.adapters
    );
    catalog.close()?;

    println!(
        "{}",
        format!("\nPolyCat catalog ready at {:?}", catalog.config().path).green()
    );
    println!("{}", "\nInspect it with:".yellow());
    println!(
        "{}",
        format!("  polycat tables --path {:?}", catalog.config().path).cyan()
    );
    Ok(())
}

/// Handle the validate command
pub fn handle_validate(config: Option<PathBuf>, path: PathBuf) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let violations = catalog.consistency_violations()?;
    catalog.close()?;

    if violations.is_empty() {
        println!("{}", "✅ Catalog is consistent".green());
        return Ok(());
    }
    println!(
        "{}",
        format!("Found {} inconsistencies:", violations.len()).bold().red()
    );
    for (i, violation) in violations.iter().enumerate() {
        println!("  {}. {}", i + 1, violation.red());
    }
    Err("Catalog validation failed".into())
}

pub fn handle_namespaces(
    config: Option<PathBuf>,
    path: PathBuf,
    like: Option<String>,
    format: OutputFormat,
) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let mut listing = Listing::new(
        "namespaces",
        vec!["id", "name", "model", "owner", "case_sensitive", "tables"],
    );
    for namespace in catalog.get_namespaces(pattern(like.as_deref())?.as_ref())? {
        let children = catalog.get_namespace_children(namespace.id)?;
        listing.push(vec![
            namespace.id.to_string(),
            namespace.name,
            namespace.model.to_string(),
            namespace.owner,
            namespace.case_sensitive.to_string(),
            children.len().to_string(),
        ]);
    }
    catalog.close()?;
    print!("{}", ListingFormatter::format(&listing, format));
    Ok(())
}

pub fn handle_tables(
    config: Option<PathBuf>,
    path: PathBuf,
    namespace: Option<String>,
    like: Option<String>,
    format: OutputFormat,
) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let tables = catalog.get_tables_by_pattern(
        pattern(namespace.as_deref())?.as_ref(),
        pattern(like.as_deref())?.as_ref(),
    )?;
    let mut listing = Listing::new(
        "tables",
        vec![
            "id",
            "namespace",
            "name",
            "type",
            "owner",
            "columns",
            "primary_key",
            "adapters",
            "partitions",
        ],
    );
    for table in tables {
        let namespace = catalog.get_namespace(table.namespace_id)?;
        listing.push(vec![
            table.id.to_string(),
            namespace.name,
            table.name,
            table.entity_type.as_str().to_string(),
            table.owner,
            table.column_ids.len().to_string(),
            or_dash(table.primary_key),
            join_ids(&table.adapter_ids),
            table.partition_property.partition_ids.len().to_string(),
        ]);
    }
    catalog.close()?;
    print!("{}", ListingFormatter::format(&listing, format));
    Ok(())
}

pub fn handle_columns(
    config: Option<PathBuf>,
    path: PathBuf,
    table: String,
    format: OutputFormat,
) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let (namespace_name, table_name) = split_table_name(&table);
    let table = catalog.get_table_by_names(namespace_name, table_name)?;
    let pk_columns = match table.primary_key {
        Some(key) => catalog.get_key(key)?.column_ids,
        None => Vec::new(),
    };

    let mut listing = Listing::new(
        format!("columns of {}.{}", namespace_name, table.name),
        vec!["position", "id", "name", "type", "length", "nullable", "collation", "pk"],
    );
    for column in catalog.get_columns(table.id)? {
        listing.push(vec![
            column.position.to_string(),
            column.id.to_string(),
            column.name,
            column.column_type.base.to_string(),
            or_dash(column.column_type.length),
            column.nullable.to_string(),
            or_dash(column.collation.map(|c| format!("{:?}", c))),
            pk_columns.contains(&column.id).to_string(),
        ]);
    }
    catalog.close()?;
    print!("{}", ListingFormatter::format(&listing, format));
    Ok(())
}

pub fn handle_adapters(config: Option<PathBuf>, path: PathBuf, format: OutputFormat) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let mut listing = Listing::new(
        "adapters",
        vec!["id", "unique_name", "adapter", "kind", "placements", "settings"],
    );
    for adapter in catalog.get_adapters()? {
        let placements = catalog.get_data_placements_on_adapter(adapter.id)?;
        let settings = adapter
            .settings
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        listing.push(vec![
            adapter.id.to_string(),
            adapter.unique_name,
            adapter.adapter_name,
            adapter.kind.as_str().to_string(),
            placements.len().to_string(),
            settings,
        ]);
    }
    catalog.close()?;
    print!("{}", ListingFormatter::format(&listing, format));
    Ok(())
}

pub fn handle_placements(
    config: Option<PathBuf>,
    path: PathBuf,
    table: String,
    format: OutputFormat,
) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let (namespace_name, table_name) = split_table_name(&table);
    let table = catalog.get_table_by_names(namespace_name, table_name)?;

    let mut listing = Listing::new(
        format!("placements of {}.{}", namespace_name, table.name),
        vec!["adapter", "column", "type", "physical_name", "position", "partitions", "full"],
    );
    for placement in catalog.get_data_placements(table.id)? {
        let adapter = catalog.get_adapter(placement.adapter_id)?;
        let partitions = join_ids(&placement.all_partition_ids());
        let full = placement.has_full_placement(&table).to_string();
        for column_placement in
            catalog.get_column_placements_on_adapter_per_table(adapter.id, table.id)?
        {
            let column = catalog.get_column(column_placement.column_id)?;
            listing.push(vec![
                adapter.unique_name.clone(),
                column.name,
                format!("{:?}", column_placement.placement_type),
                or_dash(column_placement.physical_column_name),
                column_placement.physical_position.to_string(),
                partitions.clone(),
                full.clone(),
            ]);
        }
    }
    catalog.close()?;
    print!("{}", ListingFormatter::format(&listing, format));
    Ok(())
}

pub fn handle_stats(config: Option<PathBuf>, path: PathBuf, format: OutputFormat) -> CliResult {
    let catalog = load_catalog(config.as_ref(), &path)?;
    let stats = catalog.statistics()?;
    let collections = catalog.collection_statistics()?;
    let storage_type = catalog.storage_type();
    catalog.close()?;

    if let OutputFormat::Json = format {
        let json = serde_json::json!({
            "storage": storage_type.to_string(),
            "entities": stats,
            "collections": collections
                .iter()
                .map(|(name, s)| serde_json::json!({
                    "name": name,
                    "entries": s.entry_count,
                    "bytes": s.size_bytes,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let mut entities = Listing::new(format!("entities ({})", storage_type), vec!["kind", "count"]);
    let counts = [
        ("namespaces", stats.namespaces),
        ("tables", stats.tables),
        ("columns", stats.columns),
        ("keys", stats.keys),
        ("constraints", stats.constraints),
        ("foreign keys", stats.foreign_keys),
        ("indexes", stats.indexes),
        ("adapters", stats.adapters),
        ("partition groups", stats.partition_groups),
        ("partitions", stats.partitions),
        ("data placements", stats.data_placements),
        ("column placements", stats.column_placements),
        ("partition placements", stats.partition_placements),
        ("graphs", stats.graphs),
    ];
    for (kind, count) in counts {
        entities.push(vec![kind.to_string(), count.to_string()]);
    }
    print!("{}", ListingFormatter::format(&entities, format));

    let mut storage = Listing::new("collections", vec!["name", "entries", "bytes"]);
    for (name, s) in collections {
        storage.push(vec![name, s.entry_count.to_string(), s.size_bytes.to_string()]);
    }
    print!("{}", ListingFormatter::format(&storage, format));
    Ok(())
}
