//! # Voxel World Entry Point
//!
//! Runs a headless session. All the work happens in the library's `run()`.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- --seed abc --ticks 1200 --data ./worlds
//! ```

fn main() {
    voxel_world::run();
}
