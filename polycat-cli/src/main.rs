// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! PolyCat CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = cli.config;
    match cli.command {
        Commands::Version => {
            println!("{} {}", "PolyCat".bold().green(), polycat::VERSION);
            println!("Polystore metadata catalog");
            Ok(())
        }

        Commands::Init {
            path,
            reset,
            sample,
        } => cli::handle_init(config, path, reset, sample),

        Commands::Validate { path } => cli::handle_validate(config, path),

        Commands::Namespaces { path, like, format } => {
            cli::handle_namespaces(config, path, like, format)
        }

        Commands::Tables {
            path,
            namespace,
            like,
            format,
        } => cli::handle_tables(config, path, namespace, like, format),

        Commands::Columns {
            path,
            table,
            format,
        } => cli::handle_columns(config, path, table, format),

        Commands::Adapters { path, format } => cli::handle_adapters(config, path, format),

        Commands::Placements {
            path,
            table,
            format,
        } => cli::handle_placements(config, path, table, format),

        Commands::Stats { path, format } => cli::handle_stats(config, path, format),
    }
}
