#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! The simulation core of a voxel sandbox: deterministic terrain, chunked
//! storage with a persistent change log, viewpoint-driven streaming, block
//! targeting and interaction, and player movement with terrain collision.
//!
//! ## Key Modules
//!
//! * `application_state` - Headless driver and input translation
//! * `engine_state` - The session itself: voxels, camera, interaction, persistence
//!
//! ## Architecture
//!
//! The engine keeps the world model separate from its collaborators:
//! * Rendering consumes [`RenderEvent`](engine_state::render::RenderEvent)s and may provide hit testing
//! * Persistence is reached through the [`PersistenceClient`](engine_state::persistence::PersistenceClient) trait
//! * Input arrives as per-tick intents
//! * Chunk generation runs on worker threads and is merged back on the tick
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_world::run();
//! }
//! ```

use std::{path::PathBuf, sync::Arc};

use application_state::{ApplicationState, ScriptedIntents};
use engine_state::{
    config::EngineConfig,
    error::{ConfigError, EngineError},
    persistence::{InMemoryPersistence, JsonFilePersistence, PersistenceClient},
    voxels::seed::random_seed_string,
    EngineState,
};
use log::{error, info};
use web_time::Duration;

pub mod application_state;
pub mod engine_state;

/// Environment variable consulted when no `--seed` is given.
pub const SEED_ENV_VAR: &str = "VOXEL_WORLD_SEED";

const DEFAULT_TICKS: u64 = 600;
const TIMESTEP: Duration = Duration::from_millis(16);

/// Command line options of the headless binary.
#[derive(Debug, Default, PartialEq)]
pub struct RunOptions {
    pub seed: Option<String>,
    /// Load this world instead of creating one
    pub world: Option<u64>,
    pub config: Option<PathBuf>,
    pub ticks: Option<u64>,
    /// Persist worlds as JSON files here instead of in memory
    pub data: Option<PathBuf>,
}

impl RunOptions {
    /// Parses `--seed`, `--world`, `--config`, `--ticks` and `--data`.
    ///
    /// # Arguments
    /// * `args` - The arguments after the program name
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = RunOptions::default();
        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| ConfigError::Invalid(format!("{flag} needs a value")))
            };
            match flag.as_str() {
                "--seed" => options.seed = Some(value()?),
                "--world" => options.world = Some(parse_number(&flag, &value()?)?),
                "--config" => options.config = Some(value()?.into()),
                "--ticks" => options.ticks = Some(parse_number(&flag, &value()?)?),
                "--data" => options.data = Some(value()?.into()),
                _ => return Err(ConfigError::Invalid(format!("unknown argument {flag}"))),
            }
        }
        Ok(options)
    }

    /// The seed for a new world: the flag, then the environment, then a random one.
    pub fn resolve_seed(&self, from_env: Option<String>) -> String {
        self.seed
            .clone()
            .or(from_env.filter(|seed| !seed.is_empty()))
            .unwrap_or_else(random_seed_string)
    }
}

fn parse_number(flag: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{flag} expects a number, got {value:?}")))
}

/// Runs a headless session from the process arguments and logs the outcome.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    if let Err(err) = run_with(std::env::args().skip(1)) {
        error!("{err}");
    }
}

/// Runs a headless session with explicit arguments.
///
/// # Returns
/// The setup failure, if the session could not start. Sync failures during
/// shutdown are logged rather than returned.
pub fn run_with<I>(args: I) -> Result<(), EngineError>
where
    I: IntoIterator<Item = String>,
{
    let options = RunOptions::parse(args)?;
    let config = match &options.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let client: Arc<dyn PersistenceClient> = match &options.data {
        Some(dir) => Arc::new(JsonFilePersistence::open(dir)?),
        None => Arc::new(InMemoryPersistence::new()),
    };

    let engine = match options.world {
        Some(id) => EngineState::load(config, client, id)?,
        None => {
            let seed = options.resolve_seed(std::env::var(SEED_ENV_VAR).ok());
            EngineState::create(config, client, &seed)?
        }
    };

    let mut app = ApplicationState::new(engine, Box::new(ScriptedIntents), TIMESTEP);
    if let Err(err) = app.run(options.ticks.unwrap_or(DEFAULT_TICKS)) {
        error!("Final sync of world {} failed: {err}", app.engine_state.world_id());
    }
    Ok(())
}
