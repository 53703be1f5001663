// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for PolyCat
//!
//! Provides catalog initialization, consistency validation and read-only
//! listings of the schema and placement metadata.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_adapters, handle_columns, handle_init, handle_namespaces, handle_placements,
    handle_stats, handle_tables, handle_validate,
};
