//! Renderer boundary.
//!
//! The core never builds geometry. It reports which chunks became visible,
//! changed or went away, and a renderer reads block sets from the store when it
//! handles those events.

use super::interaction::HitTester;
use super::voxels::chunk::{Chunk, ChunkCoordinate};
use super::voxels::world::World;

/// A change in the set of chunks a renderer should display.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderEvent {
    /// The chunk entered the visible set.
    ChunkShown(ChunkCoordinate),
    /// A visible chunk's block set changed.
    ChunkUpdated(ChunkCoordinate),
    /// The chunk left the visible set.
    ChunkHidden(ChunkCoordinate),
}

impl RenderEvent {
    pub fn position(&self) -> ChunkCoordinate {
        match *self {
            RenderEvent::ChunkShown(p) | RenderEvent::ChunkUpdated(p) | RenderEvent::ChunkHidden(p) => p,
        }
    }
}

/// Something that turns chunk block sets into a visible representation.
pub trait ChunkRenderer {
    fn show_chunk(&mut self, chunk: &Chunk);
    fn update_chunk(&mut self, chunk: &Chunk);
    fn hide_chunk(&mut self, position: ChunkCoordinate);

    /// Ray casting against the displayed geometry.
    ///
    /// Renderers that cannot hit-test return `None` and targeting falls back to
    /// walking the chunk store.
    fn hit_tester(&self) -> Option<&dyn HitTester> {
        None
    }
}

/// Feeds a batch of events to a renderer.
///
/// Show and update events for chunks that are no longer in the store (hidden
/// again later in the same batch) are skipped.
pub fn dispatch_render_events(events: &[RenderEvent], store: &World, renderer: &mut dyn ChunkRenderer) {
    for event in events {
        match *event {
            RenderEvent::ChunkShown(position) => {
                if let Some(chunk) = store.get(&position) {
                    renderer.show_chunk(chunk);
                }
            }
            RenderEvent::ChunkUpdated(position) => {
                if let Some(chunk) = store.get(&position) {
                    renderer.update_chunk(chunk);
                }
            }
            RenderEvent::ChunkHidden(position) => renderer.hide_chunk(position),
        }
    }
}
