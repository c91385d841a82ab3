//! # Task System Core Traits
//!
//! This module defines the fundamental building blocks of the task system,
//! which provides a framework for executing work off the simulation timeline.
//!
//! ## Core Components
//! - `Task`: Represents a unit of work that can be executed on a worker
//! - `TaskResult`: Represents the result of a completed task
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread (or inline)
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the main timeline with the merge context
//! 5. The result can spawn new tasks
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the main thread
//! - Tasks own their inputs; world state is only touched in `handle_result`

/// A unit of work that can be executed on a background worker.
///
/// Tasks should own all the data they need (typically an `Arc` of something
/// immutable plus a small key) and must not reach into shared mutable state.
///
/// `C` is the context results are merged into on the main timeline.
pub trait Task<C>: Send {
    /// Processes the task and returns a result.
    ///
    /// Runs on a worker thread. Errors are handled internally and carried in
    /// the returned result.
    fn process(&self) -> Box<dyn TaskResult<C> + Send>;
}

/// The result of processing a `Task`.
pub trait TaskResult<C>: Send {
    /// Handles the result of a completed task on the main timeline.
    ///
    /// This is the only point where a task's output touches `context`.
    ///
    /// # Returns
    /// Follow-up tasks to schedule (can be empty).
    fn handle_result(self: Box<Self>, context: &mut C) -> Vec<Box<dyn Task<C> + Send>>;
}
