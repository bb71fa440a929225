//! DropReel Core - Foundation types for the capture and mixdown pipeline
//!
//! This crate provides the types every other DropReel crate builds on:
//! - Frame-derived time (`FrameRate`, `RationalTime`) and the three-timeline `Clock`
//! - Frame buffers handed to the capture stage
//! - Run configuration loaded from JSON
//! - The `Outcome` of a settled run
//! - The shared error type

pub mod config;
pub mod error;
pub mod frame;
pub mod outcome;
pub mod time;

pub use config::{
    AudioCodec, DeliveryConfig, MixConfig, RunConfig, SoundEntryConfig, TimingConfig,
    VideoCodec, VideoConfig, WavSampleFormat,
};
pub use error::{DropReelError, Result};
pub use frame::{FrameBuffer, PixelFormat};
pub use outcome::Outcome;
pub use time::{
    Clock, ClockState, FrameRate, ManualTime, MonotonicTime, RationalTime, TimeSource,
};

/// Canonical sample rate of every mixed audio asset.
pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;
