// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Change notifications
//!
//! Every add, replace and delete emits one [`CatalogEvent`] carrying the old and
//! the new value. Listeners run synchronously inside the catalog's critical
//! section and must not call back into the catalog.

use super::entities::*;
use super::error::{CatalogError, CatalogResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Old and new value of one entity; `old == None` on create, `new == None` on delete
#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub old: Option<T>,
    pub new: Option<T>,
}

impl<T> Change<T> {
    pub fn created(new: T) -> Self {
        Self {
            old: None,
            new: Some(new),
        }
    }

    pub fn replaced(old: T, new: T) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn deleted(old: T) -> Self {
        Self {
            old: Some(old),
            new: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    Namespace(Change<Namespace>),
    Table(Change<Table>),
    Column(Change<Column>),
    ColumnPlacement(Change<ColumnPlacement>),
    DataPlacement(Change<DataPlacement>),
    PartitionPlacement(Change<PartitionPlacement>),
    Partition(Change<Partition>),
    PartitionGroup(Change<PartitionGroup>),
    Key(Change<Key>),
    ForeignKey(Change<ForeignKey>),
    Constraint(Change<Constraint>),
    Index(Change<Index>),
    Adapter(Change<Adapter>),
    Graph(Change<Graph>),
    GraphAlias(Change<String>),
    GraphPlacement(Change<GraphPlacement>),
}

impl CatalogEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CatalogEvent::Namespace(_) => EventKind::Namespace,
            CatalogEvent::Table(_) => EventKind::Table,
            CatalogEvent::Column(_) => EventKind::Column,
            CatalogEvent::ColumnPlacement(_) => EventKind::ColumnPlacement,
            CatalogEvent::DataPlacement(_) => EventKind::DataPlacement,
            CatalogEvent::PartitionPlacement(_) => EventKind::PartitionPlacement,
            CatalogEvent::Partition(_) => EventKind::Partition,
            CatalogEvent::PartitionGroup(_) => EventKind::PartitionGroup,
            CatalogEvent::Key(_) => EventKind::Key,
            CatalogEvent::ForeignKey(_) => EventKind::ForeignKey,
            CatalogEvent::Constraint(_) => EventKind::Constraint,
            CatalogEvent::Index(_) => EventKind::Index,
            CatalogEvent::Adapter(_) => EventKind::Adapter,
            CatalogEvent::Graph(_) => EventKind::Graph,
            CatalogEvent::GraphAlias(_) => EventKind::GraphAlias,
            CatalogEvent::GraphPlacement(_) => EventKind::GraphPlacement,
        }
    }
}

/// Event name a listener subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Namespace,
    Table,
    Column,
    ColumnPlacement,
    DataPlacement,
    PartitionPlacement,
    Partition,
    PartitionGroup,
    Key,
    ForeignKey,
    Constraint,
    Index,
    Adapter,
    Graph,
    GraphAlias,
    GraphPlacement,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::Namespace,
        EventKind::Table,
        EventKind::Column,
        EventKind::ColumnPlacement,
        EventKind::DataPlacement,
        EventKind::PartitionPlacement,
        EventKind::Partition,
        EventKind::PartitionGroup,
        EventKind::Key,
        EventKind::ForeignKey,
        EventKind::Constraint,
        EventKind::Index,
        EventKind::Adapter,
        EventKind::Graph,
        EventKind::GraphAlias,
        EventKind::GraphPlacement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Namespace => "namespace",
            EventKind::Table => "table",
            EventKind::Column => "column",
            EventKind::ColumnPlacement => "columnPlacement",
            EventKind::DataPlacement => "dataPlacement",
            EventKind::PartitionPlacement => "partitionPlacement",
            EventKind::Partition => "partition",
            EventKind::PartitionGroup => "partitionGroup",
            EventKind::Key => "key",
            EventKind::ForeignKey => "foreignKey",
            EventKind::Constraint => "constraint",
            EventKind::Index => "index",
            EventKind::Adapter => "adapter",
            EventKind::Graph => "graph",
            EventKind::GraphAlias => "graphAlias",
            EventKind::GraphPlacement => "graphPlacement",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| CatalogError::InvalidParameters(format!("unknown event name '{}'", s)))
    }
}

/// Receiver of catalog change notifications
pub trait CatalogListener: Send + Sync {
    fn on_event(&self, event: &CatalogEvent);
}

impl<F> CatalogListener for F
where
    F: Fn(&CatalogEvent) + Send + Sync,
{
    fn on_event(&self, event: &CatalogEvent) {
        self(event)
    }
}

/// Handle returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    kind: Option<EventKind>,
    listener: Arc<dyn CatalogListener>,
}

/// Listener registry and synchronous dispatcher
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: RwLock<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind, or to every kind when `kind` is `None`
    pub fn subscribe(
        &self,
        kind: Option<EventKind>,
        listener: Arc<dyn CatalogListener>,
    ) -> ListenerId {
        let id = {
            let mut next = self.next_id.write();
            let id = ListenerId(*next);
            *next += 1;
            id
        };
        self.subscriptions.write().push(Subscription { id, kind, listener });
        id
    }

    /// Subscribe by event name such as `"table"` or `"columnPlacement"`
    pub fn subscribe_named(
        &self,
        name: &str,
        listener: Arc<dyn CatalogListener>,
    ) -> CatalogResult<ListenerId> {
        let kind = name.parse::<EventKind>()?;
        Ok(self.subscribe(Some(kind), listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn emit(&self, event: CatalogEvent) {
        let kind = event.kind();
        let targets: Vec<Arc<dyn CatalogListener>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| s.listener.clone())
            .collect();
        for listener in targets {
            listener.on_event(&event);
        }
    }
}
