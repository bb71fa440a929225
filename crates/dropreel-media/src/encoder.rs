//! Locating and invoking the external encoder.

use dropreel_core::{DropReelError, FrameRate, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Binary name searched on `PATH`.
pub const FFMPEG_BINARY: &str = "ffmpeg";

/// Resolve the ffmpeg binary: an explicit path wins, otherwise `PATH` is searched.
pub fn locate_ffmpeg(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(DropReelError::NotFound(format!(
            "Configured ffmpeg binary not found: {}",
            path.display()
        )));
    }
    which::which(FFMPEG_BINARY).map_err(|e| {
        DropReelError::NotFound(format!("{} not found on PATH: {}", FFMPEG_BINARY, e))
    })
}

/// Frame rate as ffmpeg expects it: `60` or `30000/1001`.
pub fn rate_arg(rate: FrameRate) -> String {
    if rate.denominator == 1 {
        rate.numerator.to_string()
    } else {
        format!("{}/{}", rate.numerator, rate.denominator)
    }
}

/// Run ffmpeg to completion. A nonzero exit becomes an encoder error carrying
/// the tail of stderr.
pub fn run_to_completion(ffmpeg: &Path, args: &[String]) -> Result<Output> {
    debug!(binary = %ffmpeg.display(), args = ?args, "Running encoder");
    let output = Command::new(ffmpeg).args(args).output().map_err(|e| {
        DropReelError::Encoder(format!("Failed to spawn {}: {e}", ffmpeg.display()))
    })?;
    if !output.status.success() {
        return Err(DropReelError::Encoder(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        )));
    }
    Ok(output)
}

/// Last few lines of an encoder's stderr, where its actual error lives.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    const LINES: usize = 20;
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(LINES)..].join("\n")
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::process::{Command, Stdio};
    use std::time::Duration;

    /// Write an executable shell script standing in for ffmpeg.
    pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("ffmpeg");
        let script = format!("#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\n{}\n", body);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        // ETXTBSY while a concurrently forked test child still holds the write fd.
        for _ in 0..50 {
            let spawned = Command::new(&path)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match spawned {
                Err(e) if e.raw_os_error() == Some(26) => std::thread::sleep(Duration::from_millis(10)),
                _ => break,
            }
        }
        path
    }
}
