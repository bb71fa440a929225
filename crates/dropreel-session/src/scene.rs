//! The collaborator side of a run: the physics scene and its renderer.

use crate::trigger::SoundTrigger;
use dropreel_core::{ClockState, FrameBuffer};

pub use dropreel_core::Outcome;

/// Result of one scene step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStatus {
    Running,
    /// The win condition fired; physics stops this tick.
    Settled(Outcome),
}

/// A physics scene driven by [`crate::RunSession`].
///
/// `step` is called once per tick while physics is active, after the clock has
/// advanced; sounds are requested through `triggers`. `render` is called every
/// tick, including during the settle window.
pub trait Scene {
    fn step(&mut self, clock: &ClockState, triggers: &SoundTrigger) -> SceneStatus;

    fn render(&mut self, clock: &ClockState) -> FrameBuffer;

    /// Start over after a rejected outcome. The clock restarts at zero.
    fn reset(&mut self) {}
}
