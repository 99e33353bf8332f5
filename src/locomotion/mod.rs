//! Locomotion module
//!
//! Phase-driven biped gait and an angle-limited look-at controller.

mod gait;
mod look_at;

pub use gait::{GaitConfig, GaitState, ProceduralGait};
pub use look_at::{LookAtConfig, LookAtController, LookAtState};
