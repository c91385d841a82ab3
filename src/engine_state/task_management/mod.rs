//! # Task Management System
//!
//! This module provides a small worker pool for executing pure work (chunk
//! generation) off the simulation timeline, and for merging the results back on it.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskResult`: The result of a completed task, merged into a context `C`
//! - `TaskChannel`: Communication channel between the main thread and a worker thread
//!
//! Workers are plain `std::thread`s, one `mpsc` channel pair each. A manager
//! created with zero workers runs every task inline when queued tasks are
//! processed, which keeps tests deterministic.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are merged on the main thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks
//!
//! ## Example Usage
//! ```ignore
//! let mut task_manager = TaskManager::<WorldState>::new(2);
//! task_manager.publish_task(Box::new(ChunkGenerationTask::new(generator, position)));
//!
//! // In the tick:
//! task_manager.process_queued_tasks();
//! task_manager.process_completed_tasks(&mut world_state);
//! ```

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use task::{Task, TaskResult};

type BoxedTask<C> = Box<dyn Task<C> + Send>;
type BoxedResult<C> = Box<dyn TaskResult<C> + Send>;

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `_worker`: Handle to the worker thread (kept alive by this struct)
///
/// Dropping the channel drops the sender, which ends the worker's receive loop.
pub struct TaskChannel<C> {
    task_sender: Sender<BoxedTask<C>>,
    result_receiver: Receiver<BoxedResult<C>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `inline_results`: Results of tasks run inline (zero-worker mode)
/// - `current_channel`: Index for round-robin scheduling
pub struct TaskManager<C> {
    channels: Vec<TaskChannel<C>>,
    queued_tasks: VecDeque<BoxedTask<C>>,
    inline_results: VecDeque<BoxedResult<C>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl<C: 'static> TaskManager<C> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. 0 runs tasks inline.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        if num_workers > 0 {
            log::info!(
                "Starting {num_workers} task workers (available parallelism: {:?})",
                thread::available_parallelism()
            );
        }

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<BoxedTask<C>>();
            let (result_tx, result_rx) = channel::<BoxedResult<C>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            inline_results: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Whether tasks run on the calling thread.
    pub fn is_inline(&self) -> bool {
        self.channels.is_empty()
    }

    /// Tasks waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks sent to workers whose results have not been merged yet.
    pub fn in_flight_len(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum::<usize>()
            + self.inline_results.len()
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (worker disconnected), handing the task back
    fn try_send_task(&mut self, task: BoxedTask<C>, channel_idx: usize) -> Result<(), BoxedTask<C>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(err) => Err(err.0),
        }
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// Round-robin starting from the last used channel, skipping channels that
    /// have reached `MAX_TASKS_IN_FLIGHT`.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&idx| self.channels[idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately sent to a worker
    /// - `false` if the task was queued (all workers busy, or inline mode)
    pub fn publish_task(&mut self, task: BoxedTask<C>) -> bool {
        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(task);
            return false;
        };

        match self.try_send_task(task, channel_idx) {
            Ok(_) => {
                self.current_channel = (channel_idx + 1) % self.channels.len();
                true
            }
            Err(task) => {
                log::error!("Task worker {channel_idx} disconnected, queueing task");
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Processes any queued tasks if workers are available.
    ///
    /// In inline mode every queued task is executed here, on the calling thread.
    pub fn process_queued_tasks(&mut self) {
        if self.is_inline() {
            while let Some(task) = self.queued_tasks.pop_front() {
                self.inline_results.push_back(task.process());
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Merges all completed task results into `context`.
    ///
    /// Must be called on the main timeline. Follow-up tasks returned by results
    /// are published.
    pub fn process_completed_tasks(&mut self, context: &mut C) {
        let mut tasks_to_queue = Vec::new();

        while let Some(result) = self.inline_results.pop_front() {
            tasks_to_queue.extend(result.handle_result(context));
        }

        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                tasks_to_queue.extend(result.handle_result(context));
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
    }
}
