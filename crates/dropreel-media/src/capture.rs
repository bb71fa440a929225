//! Frame capture stage.
//!
//! Rendered frames are streamed straight into an encoder as raw video. The stage
//! owns a hard frame budget (`fps * run + fps * settle`): every tick counts
//! against it, written or skipped, and the call that exhausts it returns
//! [`CaptureSignal::Stop`].

use crate::encoder::{rate_arg, stderr_tail};
use dropreel_core::{DropReelError, FrameBuffer, FrameRate, PixelFormat, Result, RunConfig};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Written frames between progress log lines.
const PROGRESS_INTERVAL: u64 = 100;

/// What the caller should do after submitting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSignal {
    Continue,
    Stop,
}

/// Geometry, rate and budget of one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_rate: FrameRate,
    pub max_frames: u64,
}

impl CaptureSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        let frame_rate = config.video.frame_rate();
        Self {
            width: config.video.width,
            height: config.video.height,
            pixel_format: config.video.pixel_format,
            frame_rate,
            max_frames: config.timing.max_frames(frame_rate),
        }
    }
}

/// Destination of captured frames.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Flush and close. Called once by [`FrameCapture::finish`].
    fn finish(&mut self) -> Result<()>;

    /// Throw away everything written so far and continue into an empty stream.
    fn rewind(&mut self) -> Result<()>;
}

// ── ffmpeg sink ─────────────────────────────────────────────────

/// Pipes raw frames into an ffmpeg child encoding H.264.
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<Vec<u8>>>,
    ffmpeg: PathBuf,
    settings: CaptureSettings,
    output: PathBuf,
    finished: bool,
}

impl FfmpegSink {
    /// Encoder arguments for a raw-video stdin capture into `output`.
    pub fn capture_args(settings: &CaptureSettings, output: &Path) -> Vec<String> {
        let rate = rate_arg(settings.frame_rate);
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-vcodec".into(),
            "rawvideo".into(),
            "-s".into(),
            format!("{}x{}", settings.width, settings.height),
            "-pix_fmt".into(),
            settings.pixel_format.ffmpeg_name().into(),
            "-r".into(),
            rate.clone(),
            "-i".into(),
            "-".into(),
            "-an".into(),
        ];
        args.extend(
            [
                "-c:v", "libx264", "-preset", "ultrafast", "-crf", "23", "-pix_fmt", "yuv420p",
                "-movflags", "+faststart", "-profile:v", "high", "-level", "4.2",
            ]
            .map(String::from),
        );
        args.extend([
            "-r".into(),
            rate,
            "-threads".into(),
            "0".into(),
            "-tune".into(),
            "zerolatency".into(),
        ]);
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Spawn the encoder. Fails if the binary cannot be started.
    pub fn open(ffmpeg: &Path, settings: &CaptureSettings, output: &Path) -> Result<Self> {
        let args = Self::capture_args(settings, output);
        debug!(binary = %ffmpeg.display(), args = ?args, "Spawning capture encoder");
        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DropReelError::Encoder(format!("Failed to spawn {}: {e}", ffmpeg.display()))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DropReelError::Encoder("Failed to open ffmpeg stdin".into()))?;
        // A full stderr pipe would stall the encoder and, through stdin, the run.
        let stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain,
            ffmpeg: ffmpeg.to_path_buf(),
            settings: settings.clone(),
            output: output.to_path_buf(),
            finished: false,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DropReelError::Capture("Encoder input already closed".into()))?;
        stdin.write_all(&frame.data).map_err(|e| {
            DropReelError::Encoder(format!("Failed to write frame: {e}"))
        })
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // Closing stdin signals end-of-stream.
        drop(self.stdin.take());
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let status = self.child.wait().map_err(|e| {
            DropReelError::Encoder(format!("Failed to wait for ffmpeg: {e}"))
        })?;

        if !status.success() {
            return Err(DropReelError::Encoder(format!(
                "Capture encoder for {} exited with status {}: {}",
                self.output.display(),
                status,
                stderr_tail(&stderr)
            )));
        }
        Ok(())
    }

    /// Kill the running encoder and spawn a fresh one over the same output.
    fn rewind(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(drain) = self.stderr_drain.take() {
            let _ = drain.join();
        }
        self.finished = true;
        *self = Self::open(&self.ffmpeg, &self.settings, &self.output)?;
        debug!(path = %self.output.display(), "Capture encoder restarted");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.stdin.take());
            let _ = self.child.wait();
        }
    }
}

// ── in-memory sink ──────────────────────────────────────────────

/// Keeps frames in memory, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<FrameBuffer>>>,
    finished: Arc<Mutex<bool>>,
    fail_on: Vec<usize>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given write attempts (0-based), as a broken pipe would.
    pub fn failing_on(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on = attempts.into_iter().collect();
        self
    }

    /// Shared view of the stored frames; stays valid after the sink is handed off.
    pub fn frames(&self) -> Arc<Mutex<Vec<FrameBuffer>>> {
        Arc::clone(&self.frames)
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        let attempt = self.writes;
        self.writes += 1;
        if self.fail_on.contains(&attempt) {
            return Err(DropReelError::Capture(format!(
                "Simulated write failure on attempt {}",
                attempt
            )));
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        *self.finished.lock() = true;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        self.frames.lock().clear();
        Ok(())
    }
}

// ── capture stage ───────────────────────────────────────────────

/// Bounded frame capture feeding a [`FrameSink`].
pub struct FrameCapture {
    settings: CaptureSettings,
    sink: Option<Box<dyn FrameSink>>,
    output_path: Option<PathBuf>,
    ticks: u64,
    frames_written: u64,
    frames_skipped: u64,
}

impl FrameCapture {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            sink: None,
            output_path: None,
            ticks: 0,
            frames_written: 0,
            frames_skipped: 0,
        }
    }

    /// Open an ffmpeg stream at `output`, creating its directory.
    pub fn start(&mut self, ffmpeg: &Path, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let sink = FfmpegSink::open(ffmpeg, &self.settings, output)?;
        self.start_with_sink(Box::new(sink), output)
    }

    /// Begin capturing into an already opened sink.
    pub fn start_with_sink(&mut self, sink: Box<dyn FrameSink>, output: &Path) -> Result<()> {
        if self.sink.is_some() {
            return Err(DropReelError::Capture(
                "Capture already active; finish it first".into(),
            ));
        }
        self.sink = Some(sink);
        self.output_path = Some(output.to_path_buf());
        self.ticks = 0;
        self.frames_written = 0;
        self.frames_skipped = 0;
        info!(
            path = %output.display(),
            width = self.settings.width,
            height = self.settings.height,
            rate = %self.settings.frame_rate,
            max_frames = self.settings.max_frames,
            "Capture started"
        );
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    /// Hand one rendered frame to the stream.
    ///
    /// Malformed frames and failed writes are logged and dropped; they still
    /// use up a tick of the budget.
    pub fn submit(&mut self, frame: &FrameBuffer) -> CaptureSignal {
        let max = self.settings.max_frames;
        let Some(sink) = self.sink.as_mut() else {
            return CaptureSignal::Stop;
        };
        if self.ticks >= max {
            return CaptureSignal::Stop;
        }
        self.ticks += 1;
        let tick = self.ticks;

        let s = &self.settings;
        if frame.width != s.width || frame.height != s.height || frame.format != s.pixel_format {
            warn!(
                tick,
                expected = %format!("{}x{} {:?}", s.width, s.height, s.pixel_format),
                got = %format!("{}x{} {:?}", frame.width, frame.height, frame.format),
                "Frame does not match capture format, skipping"
            );
            self.frames_skipped += 1;
        } else if !frame.is_well_formed() {
            warn!(tick, bytes = frame.data.len(), "Frame data is empty or truncated, skipping");
            self.frames_skipped += 1;
        } else {
            match sink.write_frame(frame) {
                Ok(()) => {
                    self.frames_written += 1;
                    if self.frames_written % PROGRESS_INTERVAL == 0 {
                        debug!(
                            written = self.frames_written,
                            max_frames = max,
                            progress = %format!("{:.1}%", self.progress() * 100.0),
                            "Capture progress"
                        );
                    }
                }
                Err(e) => {
                    warn!(tick, "Frame write failed, dropping frame: {}", e);
                    self.frames_skipped += 1;
                }
            }
        }

        if self.ticks >= max {
            info!(ticks = self.ticks, "Frame budget reached");
            CaptureSignal::Stop
        } else {
            CaptureSignal::Continue
        }
    }

    /// Restart the stream from its first frame with a fresh frame budget.
    pub fn rewind(&mut self) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| DropReelError::Capture("Cannot rewind an inactive capture".into()))?;
        sink.rewind()?;
        info!(
            discarded_ticks = self.ticks,
            path = ?self.output_path,
            "Capture rewound"
        );
        self.ticks = 0;
        self.frames_written = 0;
        self.frames_skipped = 0;
        Ok(())
    }

    /// Close the stream. Calling it again is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        sink.finish()?;
        info!(
            path = ?self.output_path,
            written = self.frames_written,
            skipped = self.frames_skipped,
            "Capture finished"
        );
        Ok(())
    }

    /// Fraction of the frame budget used, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.settings.max_frames == 0 {
            return 1.0;
        }
        self.ticks as f64 / self.settings.max_frames as f64
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn max_frames(&self) -> u64 {
        self.settings.max_frames
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}
