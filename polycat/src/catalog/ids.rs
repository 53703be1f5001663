// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identifier allocators, one per entity class

use std::sync::atomic::{AtomicU64, Ordering};

/// Strictly increasing id counter
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to [`IdAllocator::next`] would return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Move the counter past `max_existing`; never moves it backwards
    pub fn reseed(&self, max_existing: Option<u64>) {
        if let Some(max) = max_existing {
            self.next.fetch_max(max + 1, Ordering::SeqCst);
        }
    }

    pub(crate) fn reset(&self) {
        self.next.store(0, Ordering::SeqCst);
    }
}

/// All allocators owned by a catalog instance
#[derive(Debug, Default)]
pub struct IdAllocators {
    pub namespace: IdAllocator,
    pub entity: IdAllocator,
    pub column: IdAllocator,
    pub key: IdAllocator,
    pub constraint: IdAllocator,
    pub foreign_key: IdAllocator,
    pub index: IdAllocator,
    pub adapter: IdAllocator,
    pub partition_group: IdAllocator,
    pub partition: IdAllocator,
    pub physical_position: IdAllocator,
}

impl IdAllocators {
    pub(crate) fn reset_all(&self) {
        for allocator in [
            &self.namespace,
            &self.entity,
            &self.column,
            &self.key,
            &self.constraint,
            &self.foreign_key,
            &self.index,
            &self.adapter,
            &self.partition_group,
            &self.partition,
            &self.physical_position,
        ] {
            allocator.reset();
        }
    }
}
