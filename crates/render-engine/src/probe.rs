//! Source duration probing.

use std::path::Path;
use std::process::Command;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};

use crate::engine::command_exists;

/// Reports the playable duration of a media file in seconds.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, path: &Path) -> ClipforgeResult<f64>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Reads `format=duration` through `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeDurationProbe {
    binary: String,
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeDurationProbe {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn probe(&self, path: &Path) -> ClipforgeResult<f64> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| ClipforgeError::probe(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ClipforgeError::probe(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let duration = parse_duration_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(path = %path.display(), duration_secs = duration, "Probed duration");
        Ok(duration)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }
}

/// Parse ffprobe's bare duration output.
///
/// Containers without a duration make ffprobe print `N/A` or nothing; both
/// are reported as [`ClipforgeError::InvalidDuration`] since there is no
/// usable value. Anything else that fails to parse is a probe failure.
pub fn parse_duration_output(stdout: &str) -> ClipforgeResult<f64> {
    let text = stdout.lines().map(str::trim).find(|l| !l.is_empty());
    let text = match text {
        None | Some("N/A") => {
            return Err(ClipforgeError::invalid_duration(
                "source reports no duration",
            ))
        }
        Some(text) => text,
    };

    let duration: f64 = text.parse().map_err(|_| {
        ClipforgeError::probe(format!("unparsable ffprobe duration output: {text:?}"))
    })?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(ClipforgeError::invalid_duration(format!(
            "duration must be finite and > 0, got {duration}"
        )));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_seconds() {
        assert_eq!(parse_duration_output("12.345000\n").unwrap(), 12.345);
        assert_eq!(parse_duration_output("\n  7\n").unwrap(), 7.0);
    }

    #[test]
    fn test_missing_duration_is_invalid() {
        for output in ["", "   \n", "N/A\n"] {
            let err = parse_duration_output(output).unwrap_err();
            assert!(matches!(err, ClipforgeError::InvalidDuration { .. }));
        }
    }

    #[test]
    fn test_non_positive_duration_is_invalid() {
        for output in ["0", "-3.5", "inf", "NaN"] {
            let err = parse_duration_output(output).unwrap_err();
            assert!(matches!(err, ClipforgeError::InvalidDuration { .. }), "{output}");
        }
    }

    #[test]
    fn test_garbage_is_probe_failure() {
        let err = parse_duration_output("duration=abc").unwrap_err();
        assert!(matches!(err, ClipforgeError::ProbeFailure { .. }));
    }
}
