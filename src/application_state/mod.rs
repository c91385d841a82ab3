//! # Application State Management
//!
//! This module drives an engine session without a window:
//! - Intents come from an [`IntentSource`] instead of input devices
//! - The tick loop runs on a fixed timestep with a simulated clock
//! - Render events are drained and counted since no renderer is attached

pub mod input_manager;
pub mod input_state;

use web_time::{Duration, Instant};

use input_manager::InputManager;
use input_state::{InputIntents, SelectionChange};

use crate::engine_state::{error::PersistenceError, render::RenderEvent, EngineState};

/// Supplies intents tick by tick.
pub trait IntentSource {
    fn next_intents(&mut self, tick: u64) -> InputIntents;
}

/// A repeating walk-and-build routine.
///
/// Walks forward and turns periodically, jumps now and then, and alternates
/// breaking and placing the block it looks at.
#[derive(Debug, Default)]
pub struct ScriptedIntents;

impl IntentSource for ScriptedIntents {
    fn next_intents(&mut self, tick: u64) -> InputIntents {
        let phase = tick % 240;
        InputIntents {
            forward: phase < 160,
            jump: tick % 90 == 45,
            // Turn right while walking, look down while building
            look_delta: match phase {
                150 => Some((300.0, 0.0)),
                160 => Some((0.0, 400.0)),
                230 => Some((0.0, -400.0)),
                _ => None,
            },
            break_block: (180..185).contains(&phase),
            place_block: (200..205).contains(&phase),
            selection: (tick % 480 == 0).then_some(SelectionChange::Next),
            ..Default::default()
        }
    }
}

/// The headless application: an engine session plus its input plumbing.
pub struct ApplicationState {
    /// The core game engine state and logic
    pub engine_state: EngineState,

    /// Manages button edges and block selection
    pub input_manager: InputManager,

    source: Box<dyn IntentSource>,

    /// Fixed simulation step
    timestep: Duration,

    /// Simulated time of the next tick
    clock: Instant,

    /// Number of ticks run so far
    tick: u64,

    /// Render events seen, for the shutdown summary
    render_events: usize,
}

impl ApplicationState {
    /// Creates a driver around a session.
    ///
    /// # Arguments
    /// * `engine_state` - The session to drive
    /// * `source` - Where intents come from
    /// * `timestep` - Simulated time per tick
    pub fn new(engine_state: EngineState, source: Box<dyn IntentSource>, timestep: Duration) -> Self {
        ApplicationState {
            engine_state,
            input_manager: InputManager::new(),
            source,
            timestep,
            clock: Instant::now(),
            tick: 0,
            render_events: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Runs one tick: intents, engine update, render event drain.
    pub fn step(&mut self) {
        let intents = self.source.next_intents(self.tick);
        let actions = self.input_manager.translate(&intents);
        self.engine_state.set_input_commands(actions);
        self.engine_state.tick(self.timestep, self.clock);

        let events = self.engine_state.drain_render_events();
        self.render_events += events.len();
        for event in events {
            if let RenderEvent::ChunkHidden(position) = event {
                log::trace!("Chunk {position:?} hidden");
            }
        }

        self.clock += self.timestep;
        self.tick += 1;
    }

    /// Runs `ticks` ticks, then flushes pending changes to persistence.
    pub fn run(&mut self, ticks: u64) -> Result<(), PersistenceError> {
        for _ in 0..ticks {
            self.step();
            if self.tick % 600 == 0 {
                let position = self.engine_state.viewpoint().position;
                log::info!(
                    "Tick {}: at ({:.1}, {:.1}, {:.1}), {} chunks loaded",
                    self.tick,
                    position.x,
                    position.y,
                    position.z,
                    self.engine_state.world().store().len()
                );
            }
        }

        log::info!(
            "Ran {} ticks: {} changes logged, {} render events",
            self.tick,
            self.engine_state.world().changes().len(),
            self.render_events
        );
        self.engine_state.shutdown()
    }
}
