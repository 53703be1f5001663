// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the metadata catalog
//!
//! Errors fall into three families:
//! - not-found: a caller named something that does not exist (recoverable)
//! - invariant: a mutation was rejected before any collection was touched
//! - integrity: an id handed out by the catalog itself no longer resolves

use crate::storage::StorageDriverError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("Unknown constraint: {0}")]
    UnknownConstraint(String),

    #[error("Unknown foreign key: {0}")]
    UnknownForeignKey(String),

    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    #[error("Unknown graph: {0}")]
    UnknownGraph(String),

    #[error("Unknown placement: {0}")]
    UnknownPlacement(String),

    #[error("Unknown partition: {0}")]
    UnknownPartition(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Entity already exists: {0}")]
    EntityAlreadyExists(String),

    #[error("Table '{0}' has no primary key")]
    NoTablePrimaryKey(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Catalog integrity error: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl CatalogError {
    /// Caller named an entity that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::UnknownNamespace(_)
                | CatalogError::UnknownTable(_)
                | CatalogError::UnknownColumn(_)
                | CatalogError::UnknownAdapter(_)
                | CatalogError::UnknownConstraint(_)
                | CatalogError::UnknownForeignKey(_)
                | CatalogError::UnknownIndex(_)
                | CatalogError::UnknownGraph(_)
                | CatalogError::UnknownPlacement(_)
                | CatalogError::UnknownPartition(_)
        )
    }

    /// Mutation was refused and left the catalog unchanged
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            CatalogError::InvariantViolation(_)
                | CatalogError::EntityAlreadyExists(_)
                | CatalogError::NoTablePrimaryKey(_)
                | CatalogError::InvalidParameters(_)
        )
    }

    /// Internal state is inconsistent; not meant to be handled by ordinary callers
    pub fn is_integrity(&self) -> bool {
        matches!(self, CatalogError::Integrity(_))
    }

    pub(crate) fn integrity(kind: &str, id: impl std::fmt::Display) -> Self {
        CatalogError::Integrity(format!("no {} with id {}", kind, id))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for CatalogError {
    fn from(err: bincode::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}

impl From<StorageDriverError> for CatalogError {
    fn from(err: StorageDriverError) -> Self {
        CatalogError::StorageError(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families_are_disjoint() {
        let not_found = CatalogError::UnknownTable("emps".into());
        let invariant = CatalogError::InvariantViolation("fk".into());
        let integrity = CatalogError::integrity("table", 7);

        assert!(not_found.is_not_found() && !not_found.is_invariant());
        assert!(invariant.is_invariant() && !invariant.is_integrity());
        assert!(integrity.is_integrity() && !integrity.is_not_found());
        assert_eq!(integrity.to_string(), "Catalog integrity error: no table with id 7");
    }
}
