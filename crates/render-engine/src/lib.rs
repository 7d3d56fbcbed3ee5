//! Clipforge Render Engine
//!
//! Boundary adapters around the pure filter-graph compiler: duration
//! probing, overlay asset lookup, source download and ffmpeg invocation,
//! tied together by a sequential per-request pipeline.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source.mp4 ──► ffprobe ──► duration
//!                               │
//! assets/ ──► AssetResolver ──► ProcessingConfig ──► InputPlan
//!                               │                      │
//!                               └──── compile_graph ◄──┘
//!                                          │
//!                                          ▼
//!                                  ffmpeg -filter_complex
//!                                          │
//!                                          ▼
//!                                  source_final.mp4
//! ```

pub mod assets;
pub mod engine;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod probe;

pub use assets::{build_processing_config, AssetResolver, DirectoryAssetResolver};
pub use engine::{
    build_ffmpeg_args, command_exists, EngineAdapter, EngineProgress, EngineRequest, EngineStage,
    FfmpegEngine, ProgressCallback,
};
pub use fetch::{video_id_from_url, SourceFetcher, YtDlpFetcher};
pub use output::{derive_output_path, DEFAULT_OUTPUT_SUFFIX};
pub use pipeline::{apply_overlays, run_pipeline, ProcessingJob};
pub use probe::{parse_duration_output, DurationProbe, FfprobeDurationProbe};
