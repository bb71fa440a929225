//! DropReel Media - FFmpeg integration for video capture and delivery
//!
//! This crate handles:
//! - Locating and running the external encoder
//! - Frame capture: streaming rendered frames into a bounded video file
//! - Muxing the captured video with the mixed soundtrack
//! - One-time generation of pitch-shifted sound variants

pub mod capture;
pub mod encoder;
pub mod mux;
pub mod variants;

pub use capture::{CaptureSettings, CaptureSignal, FfmpegSink, FrameCapture, FrameSink, MemorySink};
pub use encoder::locate_ffmpeg;
pub use mux::Multiplexer;
pub use variants::{prepare_catalog_variants, prepare_pitch_variants, VariantReport};
