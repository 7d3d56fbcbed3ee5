//! Per-request orchestration: probe, plan, compile, invoke, clean up.

use std::path::PathBuf;

use clipforge_common::config::EncoderProfile;
use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_filter_graph::{build_input_plan, compile_graph, ProcessingConfig};

use crate::engine::{EngineAdapter, EngineRequest, FfmpegEngine, ProgressCallback};
use crate::output::{derive_output_path, DEFAULT_OUTPUT_SUFFIX};
use crate::probe::{DurationProbe, FfprobeDurationProbe};

/// One processing request.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    /// Source video.
    pub source: PathBuf,

    /// Explicit output path. Derived from `source` and `output_suffix` when `None`.
    pub output: Option<PathBuf>,

    pub config: ProcessingConfig,
    pub encoder: EncoderProfile,
    pub output_suffix: String,

    /// Remove `source` after the engine reports success.
    pub delete_source_on_success: bool,

    /// Write the compiled graph as JSON next to the output.
    pub write_graph_report: bool,
}

impl ProcessingJob {
    pub fn new(source: impl Into<PathBuf>, config: ProcessingConfig) -> Self {
        Self {
            source: source.into(),
            output: None,
            config,
            encoder: EncoderProfile::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            delete_source_on_success: true,
            write_graph_report: false,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.source, &self.output_suffix))
    }
}

/// Run one request to completion. The source is only deleted after the
/// engine succeeds; any earlier failure leaves it in place.
pub fn run_pipeline(
    job: &ProcessingJob,
    probe: &dyn DurationProbe,
    engine: &mut dyn EngineAdapter,
    progress: Option<ProgressCallback>,
) -> ClipforgeResult<PathBuf> {
    if !job.source.is_file() {
        return Err(ClipforgeError::FileNotFound {
            path: job.source.clone(),
        });
    }

    let output = job.output_path();
    if output == job.source {
        return Err(ClipforgeError::invalid_configuration(format!(
            "output path {} is the same as the source",
            output.display()
        )));
    }

    if !engine.is_available() {
        return Err(ClipforgeError::unsupported(format!(
            "engine backend {} is not available (expected it in PATH)",
            engine.name()
        )));
    }

    let duration = probe.probe(&job.source)?;
    let plan = build_input_plan(&job.config);
    let graph = compile_graph(&job.config, &plan, duration)?;

    tracing::info!(
        source = %job.source.display(),
        output = %output.display(),
        duration_secs = duration,
        inputs = plan.len(),
        nodes = graph.nodes().len(),
        encoder = job.encoder.as_str(),
        backend = engine.name(),
        "Processing source"
    );

    if job.write_graph_report {
        let report_path = output.with_extension("filtergraph.json");
        match graph.to_json_pretty() {
            Ok(json) => {
                if let Err(err) = std::fs::write(&report_path, json) {
                    tracing::warn!(
                        error = %err,
                        path = %report_path.display(),
                        "Failed to write filter graph report"
                    );
                } else {
                    tracing::info!(path = %report_path.display(), "Wrote filter graph report");
                }
            }
            Err(err) => tracing::warn!(error = %err, "Failed to serialize filter graph"),
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let request = EngineRequest {
        source: &job.source,
        config: &job.config,
        plan: &plan,
        graph: &graph,
        output: &output,
        encoder: job.encoder,
        expected_duration_secs: duration / job.config.speed_factor,
    };
    let output_existed = output.exists();
    if let Err(err) = engine.invoke(&request, progress.as_ref()) {
        // A failed run never leaves a half-written output behind.
        if !output_existed && output.exists() {
            if let Err(remove_err) = std::fs::remove_file(&output) {
                tracing::warn!(
                    error = %remove_err,
                    output = %output.display(),
                    "Failed to remove partial output"
                );
            }
        }
        return Err(err);
    }

    if job.delete_source_on_success {
        std::fs::remove_file(&job.source)?;
        tracing::debug!(source = %job.source.display(), "Removed source after success");
    }

    Ok(output)
}

/// Process `job` with the ffprobe and ffmpeg adapters on tokio's blocking pool.
pub async fn apply_overlays(
    job: ProcessingJob,
    progress: Option<ProgressCallback>,
) -> ClipforgeResult<PathBuf> {
    tokio::task::spawn_blocking(move || {
        let probe = FfprobeDurationProbe::default();
        let mut engine = FfmpegEngine::new();
        run_pipeline(&job, &probe, &mut engine, progress)
    })
    .await
    .map_err(|e| ClipforgeError::Other(anyhow::anyhow!("processing task failed: {e}")))?
}
