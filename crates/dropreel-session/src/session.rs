//! The live run: one clock, one recorder, one capture, advanced tick by tick.
//!
//! Per tick the order is fixed: the clock advances, the scene steps, triggers
//! are recorded against the clock of this tick, physics stops if the scene
//! settled, and the rendered frame goes to capture.
//!
//! When the config names an expected winner and the scene settles on the other
//! side, the attempt is thrown away: capture rewinds, the clock and the log
//! start over and the scene is reset.

use crate::scene::{Outcome, Scene, SceneStatus};
use crate::trigger::SoundTrigger;
use crossbeam_channel::Receiver;
use dropreel_audio::{EventLog, EventRecorder, SoundCatalog};
use dropreel_core::{
    Clock, ClockState, FrameBuffer, MonotonicTime, Result, RunConfig, TimeSource,
};
use dropreel_media::{CaptureSettings, CaptureSignal, FrameCapture, FrameSink};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Sounds fired when a run begins.
pub const OPENING_SOUNDS: [&str; 2] = ["background", "question"];

/// Whether the run loop should keep ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Complete,
}

/// What a finished run leaves behind for the offline stages.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Captured video, `None` when capture never started or failed to close.
    pub video_path: Option<PathBuf>,
    /// Why the video is unusable, if it is.
    pub capture_error: Option<String>,
    pub events_path: PathBuf,
    pub event_log: EventLog,
    pub outcome: Option<Outcome>,
    pub ticks: u64,
    pub frames_written: u64,
    pub frames_skipped: u64,
    /// Attempts discarded because the wrong side won.
    pub rerolls: u32,
}

/// Sleeps the loop to the frame interval.
struct Pacer {
    interval: Duration,
    next: Instant,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
            self.next += self.interval;
        } else {
            // Running behind: don't try to catch up with a burst of frames.
            self.next = now + self.interval;
        }
    }
}

/// Owns every stateful piece of a live run.
pub struct RunSession<T: TimeSource = MonotonicTime> {
    config: RunConfig,
    catalog: SoundCatalog,
    clock: Clock<T>,
    recorder: EventRecorder,
    capture: FrameCapture,
    trigger: SoundTrigger,
    requests: Receiver<String>,
    outcome: Option<Outcome>,
    pacer: Option<Pacer>,
    rerolls: u32,
    rewind_error: Option<String>,
}

impl RunSession<MonotonicTime> {
    pub fn new(config: RunConfig, catalog: SoundCatalog) -> Result<Self> {
        Self::with_time_source(config, catalog, MonotonicTime::new())
    }
}

impl<T: TimeSource> RunSession<T> {
    /// Session whose settle window reads `source`. Fails on an invalid config.
    pub fn with_time_source(config: RunConfig, catalog: SoundCatalog, source: T) -> Result<Self> {
        config.validate()?;
        let rate = config.video.frame_rate();
        let post_physics = Duration::from_secs_f64(config.timing.settle_duration_secs);
        let (trigger, requests) = SoundTrigger::channel();
        Ok(Self {
            clock: Clock::with_source(rate, post_physics, source),
            recorder: EventRecorder::new(),
            capture: FrameCapture::new(CaptureSettings::from_config(&config)),
            trigger,
            requests,
            outcome: None,
            pacer: None,
            rerolls: 0,
            rewind_error: None,
            catalog,
            config,
        })
    }

    /// Open the ffmpeg capture in the output directory and start the run.
    pub fn begin(&mut self, ffmpeg: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let video = self.config.video_path();
        self.capture.start(ffmpeg, &video)?;
        self.start_run();
        Ok(())
    }

    /// Start the run capturing into `sink` (dry runs, tests).
    pub fn begin_with_sink(&mut self, sink: Box<dyn FrameSink>) -> Result<()> {
        let video = self.config.video_path();
        self.capture.start_with_sink(sink, &video)?;
        self.start_run();
        Ok(())
    }

    fn start_run(&mut self) {
        self.recorder.start_recording();
        self.recorder.set_frame(self.clock.snapshot().total_frames);
        self.clock.start_physics();
        for sound in OPENING_SOUNDS {
            self.trigger(sound);
        }
        if self.config.realtime {
            self.pacer = Some(Pacer::new(self.clock.rate().frame_interval()));
        }
        info!(
            rate = %self.clock.rate(),
            max_frames = self.capture.max_frames(),
            "Run started"
        );
    }

    /// Advance the run by one frame.
    pub fn tick(&mut self, scene: &mut dyn Scene) -> RunStatus {
        self.advance_frame();
        let state = self.clock.snapshot();

        let mut settled = false;
        if state.physics_active {
            if let SceneStatus::Settled(outcome) = scene.step(&state, &self.trigger) {
                info!(
                    ?outcome,
                    physics = %self.clock.format_time(state.physics_seconds, true),
                    "Scene settled"
                );
                if self
                    .config
                    .expected_winner
                    .is_some_and(|expected| outcome.contradicts(expected))
                {
                    return self.reroll(scene, outcome);
                }
                self.outcome = Some(outcome);
                if let Some(line) = outcome.voice_line() {
                    self.trigger.fire(line);
                }
                settled = true;
            }
        }
        // Recorded before physics stops so the voice line lands inside the run.
        self.drain_triggers(&state);
        if settled {
            self.stop_physics();
        }

        let frame = scene.render(&state);
        let signal = self.submit_frame(&frame);

        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
        }

        if signal == CaptureSignal::Stop || self.clock.is_concluded() {
            RunStatus::Complete
        } else {
            RunStatus::Running
        }
    }

    /// Discard the current attempt and start a new one on the next tick.
    fn reroll(&mut self, scene: &mut dyn Scene, outcome: Outcome) -> RunStatus {
        warn!(
            ?outcome,
            expected = ?self.config.expected_winner,
            attempt = self.rerolls + 1,
            "Wrong side won, restarting the run"
        );
        while self.requests.try_recv().is_ok() {}
        if let Err(e) = self.capture.rewind() {
            error!("Capture could not be rewound: {}", e);
            self.rewind_error = Some(e.to_string());
            return RunStatus::Complete;
        }
        self.restart(scene);
        self.rerolls += 1;
        self.start_run();
        RunStatus::Running
    }

    /// Tick `scene` until the run completes, then finish.
    pub fn run(&mut self, scene: &mut dyn Scene) -> Result<RunArtifacts> {
        while self.tick(scene) == RunStatus::Running {}
        for (name, time) in self.clock.formatted_times() {
            debug!(timeline = name, time = %time, "Run length");
        }
        self.finish()
    }

    // ── collaborator surface ──────────────────────────────────────

    /// Record `sound_name` against the current clock.
    pub fn trigger(&mut self, sound_name: &str) {
        let state = self.clock.snapshot();
        self.drain_triggers(&state);
        self.record(sound_name, &state);
    }

    /// A cloneable trigger for collaborators outside the session.
    pub fn trigger_handle(&self) -> SoundTrigger {
        self.trigger.clone()
    }

    pub fn submit_frame(&mut self, frame: &FrameBuffer) -> CaptureSignal {
        self.capture.submit(frame)
    }

    pub fn advance_frame(&mut self) {
        self.clock.advance_frame();
        self.recorder.set_frame(self.clock.snapshot().total_frames);
    }

    pub fn start_physics(&mut self) {
        self.clock.start_physics();
    }

    pub fn stop_physics(&mut self) {
        self.clock.stop_physics();
    }

    pub fn snapshot(&self) -> ClockState {
        self.clock.snapshot()
    }

    // ── accessors ─────────────────────────────────────────────────

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn capture(&self) -> &FrameCapture {
        &self.capture
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Close capture, stop recording and export the event log.
    ///
    /// A capture that fails to close is reported through
    /// [`RunArtifacts::capture_error`]; the event log is still written.
    pub fn finish(&mut self) -> Result<RunArtifacts> {
        let state = self.clock.snapshot();
        self.drain_triggers(&state);
        self.recorder.stop_recording();
        self.pacer = None;

        let closed = self.capture.finish();
        let (video_path, capture_error) = match (self.rewind_error.take(), closed) {
            (Some(e), _) => (None, Some(e)),
            (None, Ok(())) => (self.capture.output_path().map(Path::to_path_buf), None),
            (None, Err(e)) => {
                error!("Capture failed to close, video unusable: {}", e);
                (None, Some(e.to_string()))
            }
        };

        std::fs::create_dir_all(&self.config.output_dir)?;
        let events_path = self.config.events_path();
        let event_log = self.recorder.export();
        event_log.write_to(&events_path)?;

        info!(
            ticks = self.capture.ticks(),
            written = self.capture.frames_written(),
            skipped = self.capture.frames_skipped(),
            events = event_log.len(),
            outcome = ?self.outcome,
            rerolls = self.rerolls,
            "Run finished"
        );

        Ok(RunArtifacts {
            video_path,
            capture_error,
            events_path,
            event_log,
            outcome: self.outcome,
            ticks: self.capture.ticks(),
            frames_written: self.capture.frames_written(),
            frames_skipped: self.capture.frames_skipped(),
            rerolls: self.rerolls,
        })
    }

    /// Back to a fresh clock, an empty log and a reset scene.
    fn restart(&mut self, scene: &mut dyn Scene) {
        self.clock.reset();
        self.recorder.reset();
        self.outcome = None;
        self.pacer = None;
        scene.reset();
        debug!("Run reset");
    }

    fn drain_triggers(&mut self, state: &ClockState) {
        while let Ok(name) = self.requests.try_recv() {
            self.record(&name, state);
        }
    }

    fn record(&mut self, sound_name: &str, state: &ClockState) {
        if !self.catalog.contains(sound_name) {
            debug!(sound = sound_name, "Unknown sound, ignoring trigger");
            return;
        }
        if let Some(event) = self.recorder.on_trigger(sound_name, state) {
            debug!(
                sound = %event.sound_name,
                frame = event.frame_number,
                time = event.time_seconds,
                "Sound event recorded"
            );
        }
    }
}
