//! # Change Synchronisation
//!
//! Batches logged changes and sends them to the persistence collaborator off
//! the main timeline.
//!
//! ## Behavior
//! - Every queued change restarts the debounce timer, so a burst of edits is
//!   sent as one batch once the player pauses
//! - At most one batch is in flight; changes made meanwhile wait for the next one
//! - A failed batch goes back to the front of the queue and is retried after the
//!   next debounce window
//! - Local play never waits on the collaborator, except in [`ChangeSyncer::flush`]

use std::{
    mem,
    sync::{
        mpsc::{self, Receiver, TryRecvError},
        Arc,
    },
    thread,
};

use web_time::{Duration, Instant};

use super::{PersistenceClient, WorldData};
use crate::engine_state::{
    error::PersistenceError,
    metrics::{Counter, MetricsSink},
    voxels::change_log::{BlockChange, PersistedChange},
};

type SyncResult = Result<WorldData, PersistenceError>;

/// A batch handed to the sync thread.
struct InFlight {
    batch: Vec<PersistedChange>,
    result: Receiver<SyncResult>,
}

/// Debounced, batched delivery of changes for one world.
pub struct ChangeSyncer {
    world_id: u64,
    client: Arc<dyn PersistenceClient>,
    debounce: Duration,
    pending: Vec<PersistedChange>,
    /// When the debounce window was last restarted
    last_queued: Option<Instant>,
    in_flight: Option<InFlight>,
    metrics: Arc<dyn MetricsSink>,
}

impl ChangeSyncer {
    pub fn new(
        world_id: u64,
        client: Arc<dyn PersistenceClient>,
        debounce: Duration,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        ChangeSyncer {
            world_id,
            client,
            debounce,
            pending: Vec::new(),
            last_queued: None,
            in_flight: None,
            metrics,
        }
    }

    pub fn world_id(&self) -> u64 {
        self.world_id
    }

    /// Changes waiting for the next batch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether everything queued so far has been delivered.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }

    /// Queues a change and restarts the debounce timer.
    pub fn enqueue(&mut self, change: &BlockChange, now: Instant) {
        self.pending.push(PersistedChange::from(change));
        self.last_queued = Some(now);
    }

    /// Collects a finished batch and starts the next one when the debounce
    /// window has passed. Call once per tick.
    pub fn poll(&mut self, now: Instant) {
        if let Some(in_flight) = self.in_flight.take() {
            match in_flight.result.try_recv() {
                Ok(result) => {
                    self.settle(in_flight.batch, result, now);
                }
                Err(TryRecvError::Empty) => {
                    self.in_flight = Some(in_flight);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    let lost = PersistenceError::Rejected("sync thread exited without a result".into());
                    self.settle(in_flight.batch, Err(lost), now);
                }
            }
        }

        let Some(last_queued) = self.last_queued else {
            return;
        };
        if self.pending.is_empty() || now.saturating_duration_since(last_queued) < self.debounce {
            return;
        }
        let batch = mem::take(&mut self.pending);
        self.send(batch);
    }

    /// Waits for the batch in flight, then sends anything still queued and waits
    /// for that too.
    ///
    /// # Returns
    /// The first failure. Failed changes stay queued.
    pub fn flush(&mut self) -> Result<(), PersistenceError> {
        let now = Instant::now();
        if let Some(in_flight) = self.in_flight.take() {
            let result = in_flight.result.recv().unwrap_or_else(|_| {
                Err(PersistenceError::Rejected("sync thread exited without a result".into()))
            });
            if let Some(err) = self.settle(in_flight.batch, result, now) {
                return Err(err);
            }
        }
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = mem::take(&mut self.pending);
        let result = self.client.update_world_changes(self.world_id, &batch);
        match self.settle(batch, result, now) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hands a batch to a background thread.
    fn send(&mut self, batch: Vec<PersistedChange>) {
        let (sender, receiver) = mpsc::channel();
        let client = Arc::clone(&self.client);
        let world_id = self.world_id;
        let payload = batch.clone();

        let spawned = thread::Builder::new()
            .name("change-sync".into())
            .spawn(move || {
                let result = client.update_world_changes(world_id, &payload);
                // The syncer may have been dropped; nothing left to report to
                let _ = sender.send(result);
            });

        match spawned {
            Ok(_) => {
                self.in_flight = Some(InFlight {
                    batch,
                    result: receiver,
                })
            }
            Err(err) => {
                log::warn!("Could not start sync thread: {err}");
                self.settle(batch, Err(err.into()), Instant::now());
            }
        }
    }

    /// Applies the outcome of a batch.
    ///
    /// # Returns
    /// The failure, after the batch has been put back at the front of the queue.
    fn settle(
        &mut self,
        batch: Vec<PersistedChange>,
        result: SyncResult,
        now: Instant,
    ) -> Option<PersistenceError> {
        match result {
            Ok(world) => {
                self.metrics.increment(Counter::SyncBatchesSent);
                log::debug!(
                    "Synced {} changes to world {}, {} stored",
                    batch.len(),
                    self.world_id,
                    world.changes.len()
                );
                None
            }
            Err(err) => {
                self.metrics.increment(Counter::SyncFailures);
                log::warn!(
                    "Sync of {} changes to world {} failed, will retry: {err}",
                    batch.len(),
                    self.world_id
                );
                let newer = mem::replace(&mut self.pending, batch);
                self.pending.extend(newer);
                self.last_queued = Some(now);
                Some(err)
            }
        }
    }
}
