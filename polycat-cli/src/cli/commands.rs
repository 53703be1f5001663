// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const DEFAULT_PATH: &str = "./polycat-data/catalog";

#[derive(Parser)]
#[command(name = "polycat")]
#[command(about = "Inspect and initialise PolyCat metadata catalogs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (overridden by --verbose)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// JSON catalog configuration file; --path is ignored when given
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version information
    Version,

    /// Create a catalog (or open an existing one) and commit the defaults
    Init {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        /// Discard any existing catalog first
        #[arg(long)]
        reset: bool,

        /// Add the sample HR schema on a CSV source adapter
        #[arg(long)]
        sample: bool,
    },

    /// Run the consistency checks and report every violation
    Validate {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,
    },

    /// List namespaces
    Namespaces {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        /// LIKE pattern over namespace names
        #[arg(long)]
        like: Option<String>,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List tables, views and collections
    Tables {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        /// LIKE pattern over namespace names
        #[arg(short, long)]
        namespace: Option<String>,

        /// LIKE pattern over table names
        #[arg(long)]
        like: Option<String>,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the columns of one table
    Columns {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        /// Table as `namespace.table`
        table: String,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List registered adapters
    Adapters {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show where the columns and partitions of one table are placed
    Placements {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        /// Table as `namespace.table`
        table: String,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Entity counts and per-collection storage statistics
    Stats {
        #[arg(short, long, default_value = DEFAULT_PATH)]
        path: PathBuf,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
