//! Sound-trigger capability handed to collaborators.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

/// Requests a named sound. Cloneable, so every collaborator can hold one; the
/// run session drains the requests once per tick and records them against the
/// clock of that tick.
#[derive(Debug, Clone)]
pub struct SoundTrigger {
    tx: Sender<String>,
}

impl SoundTrigger {
    /// A trigger and the receiving end the session drains.
    pub fn channel() -> (Self, Receiver<String>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Request `sound_name`. Requests made after the session is gone are dropped.
    pub fn fire(&self, sound_name: &str) {
        trace!(sound = sound_name, "Sound triggered");
        let _ = self.tx.send(sound_name.to_string());
    }
}
