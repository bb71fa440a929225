//! DropReel Session - owns one run from first frame to final file
//!
//! - `RunSession`: the tick loop driving clock, recorder and capture in order
//! - `SoundTrigger`: the capability collaborators use to request sounds
//! - `Scene`: what a physics/rendering collaborator implements
//! - `render_deliverable`: offline mixdown and muxing after the run

pub mod pipeline;
pub mod scene;
pub mod session;
pub mod trigger;

pub use pipeline::{compose_audio, render_deliverable, Deliverable};
pub use scene::{Outcome, Scene, SceneStatus};
pub use session::{RunArtifacts, RunSession, RunStatus};
pub use trigger::SoundTrigger;
