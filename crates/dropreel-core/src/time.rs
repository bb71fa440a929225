//! Frame-derived time for reproducible runs
//!
//! Every "seconds" value the pipeline records is derived from an integer frame
//! count through rational arithmetic, never accumulated from wall-clock deltas.
//! The wall clock is consulted for exactly one thing: deciding when the settle
//! window that follows the end of physics has elapsed.

use num_rational::Rational64;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A rational time value in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// Create a new RationalTime of `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Time at which frame `frames` starts at the given rate.
    #[inline]
    pub fn from_frames(frames: u64, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(
                frames as i64 * rate.denominator as i64,
                rate.numerator as i64,
            ),
        }
    }

    /// Create a RationalTime from seconds as a float, at millisecond precision.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Convert to seconds as f64.
    ///
    /// A single correctly-rounded division, so for an integral rate this equals
    /// `frames as f64 / fps as f64` bit for bit.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Number of whole frames elapsed at the given rate (floored).
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> u64 {
        let frames = self.value * Rational64::new(rate.numerator as i64, rate.denominator as i64);
        (*frames.numer() / *frames.denom()).max(0) as u64
    }

    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 60/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whole-number frame rate.
    #[inline]
    pub const fn fps(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Frames that fit in `seconds`, rounded to the nearest frame.
    pub fn frames_in(self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.to_fps_f64()).round() as u64
    }

    /// Wall-clock length of a single frame.
    pub fn frame_interval(self) -> Duration {
        Duration::from_secs_f64(self.denominator as f64 / self.numerator as f64)
    }

    pub const FPS_30: Self = Self::fps(30);
    pub const FPS_60: Self = Self::fps(60);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_60
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// Source of wall-clock time, expressed as time elapsed since the source's origin.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven wall clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    pub fn set(&self, to: Duration) {
        *self.elapsed.lock() = to;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        *self.elapsed.lock()
    }
}

/// Snapshot of the three timelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    pub total_frames: u64,
    pub total_seconds: f64,
    pub physics_frames: u64,
    pub physics_seconds: f64,
    pub game_frames: u64,
    pub game_seconds: f64,
    pub physics_active: bool,
    pub game_active: bool,
}

/// Tracks total, physics-active and game (physics + settle) frame counts.
///
/// Owned by the run orchestrator and advanced exactly once per simulated tick.
#[derive(Debug)]
pub struct Clock<T: TimeSource = MonotonicTime> {
    rate: FrameRate,
    post_physics: Duration,
    source: T,
    total_frames: u64,
    physics_frames: u64,
    game_frames: u64,
    physics_active: bool,
    game_active: bool,
    game_started: bool,
    physics_stopped_at: Option<Duration>,
}

impl Clock<MonotonicTime> {
    /// Clock reading the process monotonic clock for the settle window.
    pub fn new(rate: FrameRate, post_physics: Duration) -> Self {
        Self::with_source(rate, post_physics, MonotonicTime::new())
    }
}

impl<T: TimeSource> Clock<T> {
    pub fn with_source(rate: FrameRate, post_physics: Duration, source: T) -> Self {
        Self {
            rate,
            post_physics,
            source,
            total_frames: 0,
            physics_frames: 0,
            game_frames: 0,
            physics_active: false,
            game_active: false,
            game_started: false,
            physics_stopped_at: None,
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    pub fn post_physics_duration(&self) -> Duration {
        self.post_physics
    }

    /// Begin (or resume) the physics timeline. The game timeline starts with the
    /// first activation only.
    pub fn start_physics(&mut self) {
        if self.physics_active {
            return;
        }
        self.physics_active = true;
        self.physics_frames = 0;
        self.physics_stopped_at = None;
        if !self.game_started {
            self.game_started = true;
            self.game_active = true;
            self.game_frames = 0;
        }
    }

    /// End the physics timeline and open the settle window.
    pub fn stop_physics(&mut self) {
        if !self.physics_active {
            return;
        }
        self.physics_active = false;
        self.physics_stopped_at = Some(self.source.now());
    }

    /// Advance every active timeline by one frame.
    pub fn advance_frame(&mut self) {
        self.total_frames += 1;
        if self.physics_active {
            self.physics_frames += 1;
        }
        if self.game_active {
            self.game_frames += 1;
            if !self.physics_active {
                if let Some(stopped_at) = self.physics_stopped_at {
                    let settled = self.source.now().saturating_sub(stopped_at);
                    if settled >= self.post_physics {
                        self.game_active = false;
                    }
                }
            }
        }
    }

    /// True once physics has stopped and the settle window has run out.
    pub fn is_concluded(&self) -> bool {
        self.game_started && !self.game_active && !self.physics_active
    }

    pub fn snapshot(&self) -> ClockState {
        ClockState {
            total_frames: self.total_frames,
            total_seconds: self.seconds(self.total_frames),
            physics_frames: self.physics_frames,
            physics_seconds: self.seconds(self.physics_frames),
            game_frames: self.game_frames,
            game_seconds: self.seconds(self.game_frames),
            physics_active: self.physics_active,
            game_active: self.game_active,
        }
    }

    /// Return to the freshly-constructed state for a run restart.
    pub fn reset(&mut self) {
        self.total_frames = 0;
        self.physics_frames = 0;
        self.game_frames = 0;
        self.physics_active = false;
        self.game_active = false;
        self.game_started = false;
        self.physics_stopped_at = None;
    }

    /// `"12.34s (740f)"`, or `"12.34s"` without frames.
    pub fn format_time(&self, seconds: f64, include_frames: bool) -> String {
        if include_frames {
            let frames = (seconds * self.rate.to_fps_f64()) as u64;
            format!("{:.2}s ({}f)", seconds, frames)
        } else {
            format!("{:.2}s", seconds)
        }
    }

    /// Total, physics and game times formatted for diagnostics.
    pub fn formatted_times(&self) -> [(&'static str, String); 3] {
        let state = self.snapshot();
        [
            ("total", self.format_time(state.total_seconds, true)),
            ("physics", self.format_time(state.physics_seconds, true)),
            ("game", self.format_time(state.game_seconds, true)),
        ]
    }

    fn seconds(&self, frames: u64) -> f64 {
        RationalTime::from_frames(frames, self.rate).to_seconds_f64()
    }
}
