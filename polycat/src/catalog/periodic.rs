// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Periodic partition re-evaluation
//!
//! Tables whose partitioning relies on periodic checks (for example temperature
//! partitioning) are kept in a set. A single background thread runs while the
//! set is non-empty: it is started when the first table enters and stopped when
//! the last one leaves.

use super::error::CatalogResult;
use super::manager::Catalog;
use log::{debug, info};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Work executed on every tick of the periodic job
pub trait PeriodicTask: Send + Sync {
    fn run(&self, table_ids: &[u64]);
}

impl<F> PeriodicTask for F
where
    F: Fn(&[u64]) + Send + Sync,
{
    fn run(&self, table_ids: &[u64]) {
        self(table_ids)
    }
}

#[derive(Default)]
struct JobControl {
    stop: Mutex<bool>,
    wake: Condvar,
}

struct Job {
    control: Arc<JobControl>,
    thread: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    tables: Mutex<BTreeSet<u64>>,
    task: RwLock<Option<Arc<dyn PeriodicTask>>>,
    ticks: AtomicU64,
}

pub(crate) struct PeriodicProcessor {
    interval: Duration,
    shared: Arc<Shared>,
    job: Mutex<Option<Job>>,
}

impl PeriodicProcessor {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared::default()),
            job: Mutex::new(None),
        }
    }

    /// Returns true if the table was not tracked yet
    fn add(&self, table_id: u64) -> CatalogResult<bool> {
        let first = {
            let mut tables = self.shared.tables.lock();
            if !tables.insert(table_id) {
                return Ok(false);
            }
            tables.len() == 1
        };
        if first {
            self.start()?;
        }
        Ok(true)
    }

    fn remove(&self, table_id: u64) -> bool {
        let (removed, now_empty) = {
            let mut tables = self.shared.tables.lock();
            let removed = tables.remove(&table_id);
            (removed, tables.is_empty())
        };
        if removed && now_empty {
            self.stop(false);
        }
        removed
    }

    pub(crate) fn tables(&self) -> Vec<u64> {
        self.shared.tables.lock().iter().copied().collect()
    }

    fn clear(&self) {
        self.shared.tables.lock().clear();
        self.stop(false);
    }

    fn is_running(&self) -> bool {
        self.job.lock().is_some()
    }

    fn start(&self) -> CatalogResult<()> {
        let mut job = self.job.lock();
        if job.is_some() {
            return Ok(());
        }
        let control = Arc::new(JobControl::default());
        let thread_control = control.clone();
        let shared = self.shared.clone();
        let interval = self.interval;
        let thread = std::thread::Builder::new()
            .name("polycat-periodic".to_string())
            .spawn(move || run_job(thread_control, shared, interval))?;
        info!("Started periodic partition processing every {:?}", interval);
        *job = Some(Job { control, thread });
        Ok(())
    }

    /// Signal the job to stop; joins the thread only when `wait` is set
    fn stop(&self, wait: bool) {
        if let Some(job) = self.job.lock().take() {
            *job.control.stop.lock() = true;
            job.control.wake.notify_all();
            if wait {
                let _ = job.thread.join();
            }
            info!("Stopped periodic partition processing");
        }
    }

    pub(crate) fn shutdown(&self) {
        self.stop(true);
    }

    pub(crate) fn set_task(&self, task: Arc<dyn PeriodicTask>) {
        *self.shared.task.write() = Some(task);
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::SeqCst)
    }
}

impl Drop for PeriodicProcessor {
    fn drop(&mut self) {
        self.stop(true);
    }
}

fn run_job(control: Arc<JobControl>, shared: Arc<Shared>, interval: Duration) {
    loop {
        {
            let mut stop = control.stop.lock();
            if *stop {
                break;
            }
            control.wake.wait_for(&mut stop, interval);
            if *stop {
                break;
            }
        }
        let table_ids: Vec<u64> = shared.tables.lock().iter().copied().collect();
        let task = shared.task.read().clone();
        if let Some(task) = task {
            task.run(&table_ids);
        }
        shared.ticks.fetch_add(1, Ordering::SeqCst);
        debug!("Periodic partition check over {} tables", table_ids.len());
    }
}

impl Catalog {
    /// Track a table for periodic re-evaluation, starting the job if it is the first
    pub fn add_table_to_periodic_processing(&self, table_id: u64) -> CatalogResult<()> {
        let _guard = self.lock.lock();
        self.table(table_id)?;
        if self.periodic.add(table_id)? {
            debug!("Table {} added to periodic processing", table_id);
        }
        Ok(())
    }

    /// Stop tracking a table, stopping the job if no table is left
    pub fn remove_table_from_periodic_processing(&self, table_id: u64) {
        let _guard = self.lock.lock();
        if self.periodic.remove(table_id) {
            debug!("Table {} removed from periodic processing", table_id);
        }
    }

    /// Tracked tables; ids of tables that no longer exist are dropped from the set
    pub fn get_tables_for_periodic_processing(&self) -> CatalogResult<Vec<u64>> {
        let _guard = self.lock.lock();
        let mut live = Vec::new();
        for id in self.periodic.tables() {
            if self.store.tables.contains(&id)? {
                live.push(id);
            } else {
                self.periodic.remove(id);
            }
        }
        Ok(live)
    }

    pub fn is_periodic_job_running(&self) -> bool {
        self.periodic.is_running()
    }

    /// Install the work run on every periodic tick
    pub fn set_periodic_task(&self, task: Arc<dyn PeriodicTask>) {
        self.periodic.set_task(task);
    }

    /// Number of ticks the periodic job has completed
    pub fn periodic_ticks(&self) -> u64 {
        self.periodic.ticks()
    }

    pub(crate) fn clear_periodic_processing(&self) {
        self.periodic.clear();
    }
}
