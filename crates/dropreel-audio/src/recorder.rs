//! Live-run sound event recording and the event-log wire format.
//!
//! The exported log is the only thing the offline compositor reads, so its text
//! form is fixed: a `Frame,Time(s),Sound` header followed by one row per event,
//! times printed with three decimals.

use dropreel_core::{ClockState, DropReelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Header row of the event log.
pub const EVENT_LOG_HEADER: &str = "Frame,Time(s),Sound";

/// One triggered sound, timestamped against the physics clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub sound_name: String,
    pub frame_number: u64,
    pub time_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
}

/// Appends a [`SoundEvent`] for every trigger that arrives while recording and
/// while physics is running.
#[derive(Debug, Default)]
pub struct EventRecorder {
    state: RecorderState,
    events: Vec<SoundEvent>,
    current_frame: u64,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the log and enter `Recording`.
    pub fn start_recording(&mut self) {
        self.events.clear();
        self.state = RecorderState::Recording;
        debug!("Sound event recording started");
    }

    /// Enter `Idle`; the log is kept until exported or reset.
    pub fn stop_recording(&mut self) {
        if self.state == RecorderState::Recording {
            info!(events = self.events.len(), "Sound event recording stopped");
        }
        self.state = RecorderState::Idle;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Frame index stamped on subsequent events.
    pub fn set_frame(&mut self, frame: u64) {
        self.current_frame = frame;
    }

    /// Record `sound_name` at the clock's current physics time.
    ///
    /// Returns `None` when not recording or when physics is inactive.
    pub fn on_trigger(&mut self, sound_name: &str, clock: &ClockState) -> Option<&SoundEvent> {
        if self.state != RecorderState::Recording || !clock.physics_active {
            return None;
        }
        self.events.push(SoundEvent {
            sound_name: sound_name.to_string(),
            frame_number: self.current_frame,
            time_seconds: clock.physics_seconds,
        });
        self.events.last()
    }

    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.current_frame = 0;
        self.state = RecorderState::Idle;
    }

    /// Snapshot of the recorded events as an exportable table.
    pub fn export(&self) -> EventLog {
        EventLog::new(self.events.clone())
    }
}

/// Ordered table of sound events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SoundEvent>,
}

impl EventLog {
    pub fn new(events: Vec<SoundEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in ascending time order; ties keep their insertion order.
    pub fn sorted_by_time(&self) -> Vec<SoundEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        events
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(32 * (self.events.len() + 1));
        out.push_str(EVENT_LOG_HEADER);
        out.push('\n');
        for event in &self.events {
            out.push_str(&format!(
                "{},{:.3},{}\n",
                event.frame_number, event.time_seconds, event.sound_name
            ));
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_csv())?;
        info!(path = %path.display(), events = self.events.len(), "Sound events exported");
        Ok(())
    }

    /// Parse the CSV form. Line numbers in errors are 1-based.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate();
        match lines.next() {
            Some((_, header)) if header.trim() == EVENT_LOG_HEADER => {}
            Some((_, header)) => {
                return Err(DropReelError::MalformedEventLog {
                    line: 1,
                    reason: format!("expected header '{}', got '{}'", EVENT_LOG_HEADER, header.trim()),
                })
            }
            None => {
                return Err(DropReelError::MalformedEventLog {
                    line: 1,
                    reason: "missing header".into(),
                })
            }
        }

        let mut events = Vec::new();
        for (idx, raw) in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            events.push(parse_row(line).map_err(|reason| DropReelError::MalformedEventLog {
                line: idx + 1,
                reason,
            })?);
        }
        Ok(Self { events })
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DropReelError::NotFound(format!(
                "Event log not found: {}",
                path.display()
            )));
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

fn parse_row(line: &str) -> std::result::Result<SoundEvent, String> {
    let mut cols = line.splitn(3, ',');
    let (Some(frame), Some(time), Some(sound)) = (cols.next(), cols.next(), cols.next()) else {
        return Err(format!("expected 3 columns in '{}'", line));
    };
    let frame_number = frame
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad frame '{}': {}", frame.trim(), e))?;
    let time_seconds = time
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad time '{}': {}", time.trim(), e))?;
    if !time_seconds.is_finite() || time_seconds < 0.0 {
        return Err(format!("time must be a non-negative number, got {}", time_seconds));
    }
    let sound_name = sound.trim();
    if sound_name.is_empty() {
        return Err("empty sound name".into());
    }
    Ok(SoundEvent {
        sound_name: sound_name.to_string(),
        frame_number,
        time_seconds,
    })
}
