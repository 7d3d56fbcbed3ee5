//! Engine invocation adapter: turns an input plan and a compiled graph into
//! an ffmpeg run.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use clipforge_common::config::EncoderProfile;
use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_filter_graph::{Graph, InputPlan, InputRole, ProcessingConfig};

/// Everything the engine needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    /// Main input (slot 0).
    pub source: &'a Path,

    /// Supplies the asset handles for auxiliary slots.
    pub config: &'a ProcessingConfig,

    pub plan: &'a InputPlan,
    pub graph: &'a Graph,
    pub output: &'a Path,
    pub encoder: EncoderProfile,

    /// Output duration after retiming, used for progress estimates.
    pub expected_duration_secs: f64,
}

/// Progress callback for engine runs.
pub type ProgressCallback = Box<dyn Fn(EngineProgress) + Send>;

/// Engine progress report.
#[derive(Debug, Clone)]
pub struct EngineProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output timestamp reached so far.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: EngineStage,
}

/// Stages of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Preparing,
    Running,
    Finalizing,
    Complete,
}

/// Trait for engine backends. Implementations only report pass/fail; they
/// never interpret engine-internal failure codes.
pub trait EngineAdapter: Send {
    /// Execute the run to completion.
    fn invoke(
        &mut self,
        request: &EngineRequest<'_>,
        progress: Option<&ProgressCallback>,
    ) -> ClipforgeResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// How often the run loop wakes up when ffmpeg is silent.
const PROGRESS_POLL: Duration = Duration::from_millis(500);

/// Silence after which a stalled run is reported.
const STALL_WARNING_AFTER: Duration = Duration::from_secs(10);

/// Runs the `ffmpeg` binary with `-filter_complex`.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: String,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EngineAdapter for FfmpegEngine {
    fn invoke(
        &mut self,
        request: &EngineRequest<'_>,
        progress: Option<&ProgressCallback>,
    ) -> ClipforgeResult<()> {
        let args = build_ffmpeg_args(request)?;
        tracing::debug!(args = ?args, "Running ffmpeg");

        if let Some(cb) = progress {
            cb(EngineProgress {
                progress: 0.0,
                out_time_secs: 0.0,
                eta_secs: 0.0,
                stage: EngineStage::Preparing,
            });
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ClipforgeError::engine(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            inputs = request.plan.len(),
            "ffmpeg process started"
        );

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(ClipforgeError::engine("Failed to capture ffmpeg stdout"));
        };
        let Some(stderr) = child.stderr.take() else {
            reap(&mut child);
            return Err(ClipforgeError::engine("Failed to capture ffmpeg stderr"));
        };

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let (line_tx, line_rx) = mpsc::channel::<std::io::Result<String>>();
        let stdout_task = std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                if line_tx.send(line).is_err() || failed {
                    break;
                }
            }
        });

        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = Instant::now();
        loop {
            match line_rx.recv_timeout(PROGRESS_POLL) {
                Ok(Ok(line)) => {
                    let Some((key, value)) = line.trim().split_once('=') else {
                        continue;
                    };
                    latest.update(key, value);
                    if key != "progress" {
                        continue;
                    }

                    if latest.out_time_secs > last_progress_secs + 0.001 {
                        last_progress_secs = latest.out_time_secs;
                        last_progress_wall = Instant::now();
                    }
                    if let Some(cb) = progress {
                        cb(progress_report(
                            &latest,
                            request.expected_duration_secs,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                }
                Ok(Err(e)) => {
                    reap(&mut child);
                    let _ = stdout_task.join();
                    let _ = stderr_task.join();
                    return Err(ClipforgeError::engine(format!(
                        "Failed reading ffmpeg progress: {e}"
                    )));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if last_progress_wall.elapsed() >= STALL_WARNING_AFTER {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for {}s",
                    STALL_WARNING_AFTER.as_secs()
                );
                last_progress_wall = Instant::now();
            }
        }
        let _ = stdout_task.join();

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                reap(&mut child);
                return Err(ClipforgeError::engine(format!(
                    "Failed to wait on ffmpeg: {e}"
                )));
            }
        };

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ClipforgeError::engine(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = progress {
            cb(EngineProgress {
                progress: 1.0,
                out_time_secs: latest.out_time_secs,
                eta_secs: 0.0,
                stage: EngineStage::Complete,
            });
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            output = %request.output.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument vector for a request, program name excluded.
pub fn build_ffmpeg_args(request: &EngineRequest<'_>) -> ClipforgeResult<Vec<String>> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for slot in request.plan.iter() {
        match slot.role {
            InputRole::Main => {
                if request.encoder == EncoderProfile::Nvenc {
                    args.extend(
                        ["-hwaccel", "cuda", "-hwaccel_device", "0"]
                            .iter()
                            .map(|s| s.to_string()),
                    );
                }
                args.push("-i".to_string());
                args.push(request.source.display().to_string());
            }
            InputRole::GifOverlay => {
                let handle = request.config.gif_overlay.as_ref().ok_or_else(|| {
                    ClipforgeError::invalid_configuration("GIF slot planned without an asset")
                })?;
                // Keep the GIF's own loop setting so it cycles for the whole window.
                args.push("-ignore_loop".to_string());
                args.push("0".to_string());
                args.push("-i".to_string());
                args.push(handle.path().display().to_string());
            }
            InputRole::HairOverlay => {
                let handle = request.config.hair_overlay.as_ref().ok_or_else(|| {
                    ClipforgeError::invalid_configuration("hair slot planned without an asset")
                })?;
                args.push("-i".to_string());
                args.push(handle.path().display().to_string());
            }
        }
    }

    args.push("-filter_complex".to_string());
    args.push(request.graph.to_filter_complex());
    for map in request.graph.map_args() {
        args.push("-map".to_string());
        args.push(map);
    }
    if request.graph.has_overlay() {
        args.push("-shortest".to_string());
    }

    args.extend(codec_args_for_encoder(request.encoder));
    args.push(request.output.display().to_string());

    Ok(args)
}

fn codec_args_for_encoder(encoder: EncoderProfile) -> Vec<String> {
    let args: &[&str] = match encoder {
        EncoderProfile::Cpu => &[
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-movflags",
            "+faststart",
        ],
        EncoderProfile::Nvenc => &[
            "-c:v",
            "h264_nvenc",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-movflags",
            "+faststart",
        ],
    };
    args.iter().map(|s| s.to_string()).collect()
}

/// Kill and wait on a child that is being abandoned.
fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!(error = %err, "ffmpeg already exited");
    }
    if let Err(err) = child.wait() {
        tracing::warn!(error = %err, "Failed to reap ffmpeg");
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> EngineProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    EngineProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            EngineStage::Finalizing
        } else {
            EngineStage::Running
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_filter_graph::{build_input_plan, compile_graph, AssetHandle};
    use std::path::PathBuf;

    fn config(subscribe: bool, hair: bool) -> ProcessingConfig {
        ProcessingConfig {
            enable_subscribe_overlay: subscribe,
            enable_hair_overlay: hair,
            gif_overlay: Some(AssetHandle::new("/assets/overlay.gif")),
            hair_overlay: Some(AssetHandle::new("/assets/hair.png")),
            ..ProcessingConfig::default()
        }
    }

    fn args_for(config: &ProcessingConfig, encoder: EncoderProfile) -> Vec<String> {
        let plan = build_input_plan(config);
        let graph = compile_graph(config, &plan, 10.0).unwrap();
        let source = PathBuf::from("/videos/clip.mp4");
        let output = PathBuf::from("/videos/clip_final.mp4");
        build_ffmpeg_args(&EngineRequest {
            source: &source,
            config,
            plan: &plan,
            graph: &graph,
            output: &output,
            encoder,
            expected_duration_secs: 10.0,
        })
        .unwrap()
    }

    fn position(args: &[String], needle: &str) -> usize {
        args.iter().position(|a| a == needle).unwrap()
    }

    #[test]
    fn test_inputs_follow_plan_order() {
        let args = args_for(&config(true, true), EncoderProfile::Cpu);
        let inputs: Vec<&str> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(
            inputs,
            vec!["/videos/clip.mp4", "/assets/overlay.gif", "/assets/hair.png"]
        );

        let ignore_loop = position(&args, "-ignore_loop");
        assert_eq!(args[ignore_loop + 3], "/assets/overlay.gif");
    }

    #[test]
    fn test_maps_and_shortest() {
        let args = args_for(&config(true, false), EncoderProfile::Cpu);
        let filter = position(&args, "-filter_complex");
        assert_eq!(args[filter + 2..filter + 6], ["-map", "[v]", "-map", "[a]"]);
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().unwrap(), "/videos/clip_final.mp4");
    }

    #[test]
    fn test_no_shortest_without_overlays() {
        let args = args_for(&config(false, false), EncoderProfile::Cpu);
        assert!(!args.contains(&"-shortest".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    #[test]
    fn test_nvenc_profile_adds_hwaccel_before_main_input() {
        let args = args_for(&config(false, true), EncoderProfile::Nvenc);
        let hwaccel = position(&args, "-hwaccel");
        let main_input = position(&args, "/videos/clip.mp4");
        assert!(hwaccel < main_input);
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(!args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_missing_asset_for_planned_slot_is_error() {
        let cfg = config(true, false);
        let plan = build_input_plan(&cfg);
        let graph = compile_graph(&cfg, &plan, 10.0).unwrap();
        let stripped = ProcessingConfig {
            gif_overlay: None,
            ..cfg.clone()
        };
        let source = PathBuf::from("in.mp4");
        let output = PathBuf::from("out.mp4");
        let result = build_ffmpeg_args(&EngineRequest {
            source: &source,
            config: &stripped,
            plan: &plan,
            graph: &graph,
            output: &output,
            encoder: EncoderProfile::Cpu,
            expected_duration_secs: 10.0,
        });
        assert!(result.is_err());
    }

    fn invoke_with_binary(binary: &str) -> ClipforgeResult<()> {
        let cfg = config(false, false);
        let plan = build_input_plan(&cfg);
        let graph = compile_graph(&cfg, &plan, 10.0).unwrap();
        let source = PathBuf::from("in.mp4");
        let output = std::env::temp_dir().join(format!(
            "clipforge-engine-{}-{binary}.mp4",
            std::process::id()
        ));
        let request = EngineRequest {
            source: &source,
            config: &cfg,
            plan: &plan,
            graph: &graph,
            output: &output,
            encoder: EncoderProfile::Cpu,
            expected_duration_secs: 10.0,
        };
        FfmpegEngine::with_binary(binary).invoke(&request, None)
    }

    #[test]
    fn test_non_zero_exit_is_engine_failure() {
        let err = invoke_with_binary("false").unwrap_err();
        match err {
            ClipforgeError::EngineFailure { diagnostic } => {
                assert!(diagnostic.starts_with("ffmpeg failed (status"), "{diagnostic}");
            }
            other => panic!("expected EngineFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_failure_carries_stderr() {
        // `sh` rejects the leading `-y` flag and explains why on stderr.
        let err = invoke_with_binary("sh").unwrap_err();
        let ClipforgeError::EngineFailure { diagnostic } = err else {
            panic!("expected EngineFailure");
        };
        let (_, stderr) = diagnostic.split_once("): ").unwrap();
        assert!(!stderr.trim().is_empty(), "{diagnostic}");
    }

    #[test]
    fn test_missing_binary_is_engine_failure() {
        let err = invoke_with_binary("clipforge-no-such-ffmpeg").unwrap_err();
        assert!(matches!(err, ClipforgeError::EngineFailure { .. }));
    }

    #[test]
    fn test_progress_state_parses_microseconds() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_progress_report_eta() {
        let state = ProgressState {
            out_time_secs: 5.0,
            complete: false,
        };
        let report = progress_report(&state, 10.0, 4.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 4.0).abs() < 1e-9);
        assert_eq!(report.stage, EngineStage::Running);
    }
}
