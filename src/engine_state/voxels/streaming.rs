//! # World Streaming Controller
//!
//! Decides which chunk coordinates should be materialized around the viewpoint
//! and paces the work of getting them there.
//!
//! ## Visible set
//!
//! A chunk is visible when its horizontal offset from the viewpoint's chunk lies
//! in a Euclidean disc and its vertical offset in a fixed band:
//! `dx² + dz² <= R²` and `|dy| <= V`. The shape is applied everywhere the
//! controller reasons about visibility.
//!
//! ## Bookkeeping
//!
//! - `desired`: the visible set for the current center
//! - `visible`: chunks actually materialized and shown
//! - `pending`: desired chunks not yet visible or in flight, nearest first
//! - `in_flight`: chunks whose generation has been dispatched and not merged
//!
//! The desired set is only recomputed when the viewpoint crosses into another
//! chunk. A coordinate is in flight at most once; a failed generation goes back to
//! the end of the pending queue and is retried on a later pass.

use std::collections::{HashSet, VecDeque};

use super::chunk::ChunkCoordinate;
use crate::engine_state::config::StreamingConfig;

/// Computes the set of chunk coordinates visible from `center`.
///
/// # Arguments
/// * `center` - The chunk containing the viewpoint
/// * `radius` - Horizontal radius in chunks
/// * `vertical` - Vertical band half-height in chunks
pub fn visible_set(center: ChunkCoordinate, radius: u32, vertical: u32) -> HashSet<ChunkCoordinate> {
    let r = radius as i32;
    let v = vertical as i32;
    let r_squared = radius as i64 * radius as i64;

    let mut set = HashSet::new();
    for dx in -r..=r {
        for dz in -r..=r {
            if (dx as i64 * dx as i64) + (dz as i64 * dz as i64) > r_squared {
                continue;
            }
            for dy in -v..=v {
                // Saturate at the edge of chunk space rather than wrap around
                let (Some(x), Some(y), Some(z)) = (
                    center.x.checked_add(dx),
                    center.y.checked_add(dy),
                    center.z.checked_add(dz),
                ) else {
                    continue;
                };
                set.insert(ChunkCoordinate::new(x, y, z));
            }
        }
    }
    set
}

/// What changed when the viewpoint entered a new chunk.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamingPlan {
    /// Chunks that left the visible set and must be hidden.
    pub to_hide: Vec<ChunkCoordinate>,
    /// Number of chunks queued for loading.
    pub queued: usize,
}

/// Outcome of a merged generation result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The chunk is still wanted and is now visible.
    Show,
    /// The viewpoint moved on while the chunk was generating.
    Stale,
}

/// Tracks visibility and loading progress around the viewpoint.
#[derive(Debug)]
pub struct StreamingController {
    render_distance: u32,
    vertical_distance: u32,
    max_generations_per_tick: usize,
    center: Option<ChunkCoordinate>,
    desired: HashSet<ChunkCoordinate>,
    visible: HashSet<ChunkCoordinate>,
    pending: VecDeque<ChunkCoordinate>,
    in_flight: HashSet<ChunkCoordinate>,
}

impl StreamingController {
    pub fn new(config: &StreamingConfig) -> Self {
        StreamingController {
            render_distance: config.render_distance,
            vertical_distance: config.vertical_distance,
            max_generations_per_tick: config.max_generations_per_tick.max(1),
            center: None,
            desired: HashSet::new(),
            visible: HashSet::new(),
            pending: VecDeque::new(),
            in_flight: HashSet::new(),
        }
    }

    /// The chunk the visible set is currently centered on.
    pub fn center(&self) -> Option<ChunkCoordinate> {
        self.center
    }

    /// Generations that may be dispatched in one tick.
    pub fn generation_budget(&self) -> usize {
        self.max_generations_per_tick
    }

    /// Re-centers the visible set.
    ///
    /// Does nothing unless `center` differs from the current center.
    ///
    /// # Returns
    /// The resulting plan, or `None` if the center did not change.
    pub fn update_center(&mut self, center: ChunkCoordinate) -> Option<StreamingPlan> {
        if self.center == Some(center) {
            return None;
        }
        self.center = Some(center);
        self.desired = visible_set(center, self.render_distance, self.vertical_distance);

        let mut to_hide: Vec<ChunkCoordinate> = self
            .visible
            .iter()
            .filter(|position| !self.desired.contains(position))
            .copied()
            .collect();
        to_hide.sort_unstable();
        for position in &to_hide {
            self.visible.remove(position);
        }

        let mut wanted: Vec<ChunkCoordinate> = self
            .desired
            .iter()
            .filter(|position| !self.visible.contains(position) && !self.in_flight.contains(position))
            .copied()
            .collect();
        wanted.sort_unstable_by_key(|position| (position.distance_squared_to(&center), *position));
        let queued = wanted.len();
        self.pending = wanted.into();

        Some(StreamingPlan { to_hide, queued })
    }

    /// Pops the next coordinate that still needs loading, nearest first.
    ///
    /// Coordinates that are no longer desired, already visible or already in
    /// flight are dropped from the queue.
    pub fn next_pending(&mut self) -> Option<ChunkCoordinate> {
        while let Some(position) = self.pending.pop_front() {
            if self.desired.contains(&position)
                && !self.visible.contains(&position)
                && !self.in_flight.contains(&position)
            {
                return Some(position);
            }
        }
        None
    }

    /// Records that generation for `position` has been dispatched.
    ///
    /// # Returns
    /// `false` if the coordinate was already in flight.
    pub fn mark_in_flight(&mut self, position: ChunkCoordinate) -> bool {
        self.in_flight.insert(position)
    }

    /// Records that `position` was made visible without generation (cache restore).
    pub fn mark_visible(&mut self, position: ChunkCoordinate) {
        self.visible.insert(position);
    }

    /// Records a successful generation.
    pub fn complete(&mut self, position: ChunkCoordinate) -> Completion {
        self.in_flight.remove(&position);
        if self.desired.contains(&position) {
            self.visible.insert(position);
            Completion::Show
        } else {
            Completion::Stale
        }
    }

    /// Records a failed generation. Still-desired coordinates are requeued.
    pub fn fail(&mut self, position: ChunkCoordinate) {
        self.in_flight.remove(&position);
        if self.desired.contains(&position) {
            self.pending.push_back(position);
        }
    }

    pub fn is_visible(&self, position: &ChunkCoordinate) -> bool {
        self.visible.contains(position)
    }

    pub fn is_desired(&self, position: &ChunkCoordinate) -> bool {
        self.desired.contains(position)
    }

    pub fn is_in_flight(&self, position: &ChunkCoordinate) -> bool {
        self.in_flight.contains(position)
    }

    pub fn visible(&self) -> &HashSet<ChunkCoordinate> {
        &self.visible
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether every desired chunk is visible.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty() && self.desired.iter().all(|p| self.visible.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(radius: u32, vertical: u32) -> StreamingController {
        StreamingController::new(&StreamingConfig {
            render_distance: radius,
            vertical_distance: vertical,
            max_generations_per_tick: 4,
            cache_capacity: 0,
        })
    }

    fn drain(controller: &mut StreamingController) -> Vec<ChunkCoordinate> {
        let mut loaded = Vec::new();
        while let Some(position) = controller.next_pending() {
            controller.mark_in_flight(position);
            controller.complete(position);
            loaded.push(position);
        }
        loaded
    }

    #[test]
    fn visible_set_is_a_disc_times_a_band() {
        let set = visible_set(ChunkCoordinate::new(0, 0, 0), 2, 1);
        // 13 columns in a radius-2 disc, 3 layers each
        assert_eq!(set.len(), 13 * 3);
        assert!(set.contains(&ChunkCoordinate::new(2, 1, 0)));
        assert!(set.contains(&ChunkCoordinate::new(1, -1, 1)));
        assert!(!set.contains(&ChunkCoordinate::new(2, 0, 1)));
        assert!(!set.contains(&ChunkCoordinate::new(0, 2, 0)));
    }

    #[test]
    fn visible_set_does_not_wrap_at_the_edge() {
        let set = visible_set(ChunkCoordinate::new(i32::MAX, 0, 0), 1, 0);
        assert!(set.iter().all(|p| p.x >= i32::MAX - 1));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn unchanged_center_is_a_no_op() {
        let mut c = controller(1, 0);
        assert!(c.update_center(ChunkCoordinate::new(0, 0, 0)).is_some());
        assert!(c.update_center(ChunkCoordinate::new(0, 0, 0)).is_none());
    }

    #[test]
    fn pending_work_is_nearest_first() {
        let mut c = controller(2, 0);
        let plan = c.update_center(ChunkCoordinate::new(0, 0, 0)).unwrap();
        assert_eq!(plan.queued, 13);
        assert_eq!(c.next_pending(), Some(ChunkCoordinate::new(0, 0, 0)));
        let second = c.next_pending().unwrap();
        assert_eq!(second.horizontal_distance_squared_to(&ChunkCoordinate::new(0, 0, 0)), 1);
    }

    #[test]
    fn moving_hides_chunks_that_left_the_set() {
        let mut c = controller(1, 0);
        c.update_center(ChunkCoordinate::new(0, 0, 0));
        drain(&mut c);
        assert!(c.is_settled());

        let plan = c.update_center(ChunkCoordinate::new(5, 0, 0)).unwrap();
        assert_eq!(plan.to_hide.len(), 5);
        assert!(plan.to_hide.contains(&ChunkCoordinate::new(0, 0, 0)));
        assert!(!c.is_visible(&ChunkCoordinate::new(0, 0, 0)));
        assert_eq!(plan.queued, 5);

        let loaded = drain(&mut c);
        assert!(loaded.contains(&ChunkCoordinate::new(5, 0, 0)));
        assert!(c.is_visible(&ChunkCoordinate::new(5, 0, 0)));
    }

    #[test]
    fn in_flight_chunks_are_not_dispatched_twice() {
        let mut c = controller(1, 0);
        c.update_center(ChunkCoordinate::new(0, 0, 0));
        let first = c.next_pending().unwrap();
        assert!(c.mark_in_flight(first));

        // Re-centering back and forth must not queue the in-flight chunk again
        c.update_center(ChunkCoordinate::new(1, 0, 0));
        c.update_center(ChunkCoordinate::new(0, 0, 0));
        let mut dispatched = Vec::new();
        while let Some(position) = c.next_pending() {
            dispatched.push(position);
        }
        assert!(!dispatched.contains(&first));
        assert!(c.is_in_flight(&first));
    }

    #[test]
    fn failures_are_requeued_and_stale_results_reported() {
        let mut c = controller(0, 0);
        c.update_center(ChunkCoordinate::new(0, 0, 0));
        let only = c.next_pending().unwrap();
        c.mark_in_flight(only);
        c.fail(only);
        assert_eq!(c.next_pending(), Some(only));

        c.mark_in_flight(only);
        c.update_center(ChunkCoordinate::new(3, 0, 0));
        assert_eq!(c.complete(only), Completion::Stale);
        assert!(!c.is_visible(&only));
    }
}
