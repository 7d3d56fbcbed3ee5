//! Process local videos.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use clipforge_common::config::{AppConfig, EncoderProfile};
use clipforge_render_engine::{apply_overlays, EngineProgress, ProcessingJob, ProgressCallback};
use tokio::task::JoinSet;

use super::OverlayArgs;

/// Output-side flags of `apply`.
pub struct OutputOptions {
    pub output: Option<PathBuf>,
    pub suffix: Option<String>,
    pub keep_source: bool,
    pub encoder: Option<String>,
    pub graph_report: bool,
}

pub async fn run(
    app: &AppConfig,
    sources: Vec<PathBuf>,
    overlay: OverlayArgs,
    options: OutputOptions,
    jobs: usize,
) -> anyhow::Result<()> {
    let sources = dedup_sources(sources);
    if options.output.is_some() && sources.len() > 1 {
        anyhow::bail!("--output can only be used with a single source");
    }

    let encoder = match &options.encoder {
        Some(name) => name.parse::<EncoderProfile>()?,
        None => app.encoding.encoder,
    };
    let config = overlay.processing_config(app);
    config.validate()?;

    let template = ProcessingJob {
        source: PathBuf::new(),
        output: options.output,
        config,
        encoder,
        output_suffix: options
            .suffix
            .unwrap_or_else(|| app.encoding.output_suffix.clone()),
        delete_source_on_success: app.encoding.delete_source_on_success && !options.keep_source,
        write_graph_report: options.graph_report,
    };
    reject_output_collisions(&sources, &template)?;

    let total = sources.len();
    let show_progress = total == 1;
    let jobs = jobs.max(1);
    println!("Processing {total} source(s), {} at a time", jobs.min(total));

    let mut pending = sources.into_iter();
    let mut running = JoinSet::new();
    let mut failed = 0usize;

    loop {
        while running.len() < jobs {
            let Some(source) = pending.next() else {
                break;
            };
            let job = ProcessingJob {
                source: source.clone(),
                ..template.clone()
            };
            let progress: Option<ProgressCallback> = if show_progress {
                Some(Box::new(|p: EngineProgress| {
                    print!(
                        "\r  Progress: {:.1}% ({:.1}s, ETA: {:.0}s)  ",
                        p.progress * 100.0,
                        p.out_time_secs,
                        p.eta_secs,
                    );
                    let _ = std::io::stdout().flush();
                }))
            } else {
                None
            };
            running.spawn(async move { (source, apply_overlays(job, progress).await) });
        }

        let Some(joined) = running.join_next().await else {
            break;
        };
        let (source, result) = joined?;
        match result {
            Ok(output) => {
                if show_progress {
                    println!();
                }
                println!("[OK]   {} -> {}", source.display(), output.display());
            }
            Err(e) => {
                failed += 1;
                if show_progress {
                    println!();
                }
                println!("[FAIL] {}: {e}", source.display());
                tracing::error!(source = %source.display(), error = %e, "Processing failed");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} source(s) failed");
    }
    Ok(())
}

/// Drop repeated sources so at most one request per file is in flight.
/// Paths that cannot be canonicalized are kept as given.
fn dedup_sources(sources: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| {
            let key = std::fs::canonicalize(source).unwrap_or_else(|_| source.clone());
            let fresh = seen.insert(key);
            if !fresh {
                tracing::warn!(source = %source.display(), "Skipping duplicate source");
            }
            fresh
        })
        .collect()
}

/// Fail when two sources would be written to the same output file, e.g.
/// `clip.mp4` and `clip.mov` in one directory.
fn reject_output_collisions(
    sources: &[PathBuf],
    template: &ProcessingJob,
) -> anyhow::Result<()> {
    let mut outputs: HashMap<PathBuf, &Path> = HashMap::new();
    for source in sources {
        let job = ProcessingJob {
            source: source.clone(),
            ..template.clone()
        };
        let output = job.output_path();
        if let Some(previous) = outputs.insert(output_key(&output), source) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                source.display(),
                output.display()
            );
        }
    }
    Ok(())
}

/// Output path with its directory canonicalized when it exists.
fn output_key(output: &Path) -> PathBuf {
    let (Some(dir), Some(name)) = (output.parent(), output.file_name()) else {
        return output.to_path_buf();
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    std::fs::canonicalize(dir)
        .map(|dir| dir.join(name))
        .unwrap_or_else(|_| output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_collapses_equivalent_paths() {
        let dir = std::env::temp_dir().join(format!("clipforge-dedup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("a.mp4");
        std::fs::write(&file, b"x").unwrap();

        let sources = vec![
            file.clone(),
            dir.join(".").join("a.mp4"),
            PathBuf::from("/missing/b.mp4"),
            PathBuf::from("/missing/b.mp4"),
        ];
        let deduped = dedup_sources(sources);
        assert_eq!(deduped, vec![file, PathBuf::from("/missing/b.mp4")]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn template() -> ProcessingJob {
        ProcessingJob::new(PathBuf::new(), Default::default())
    }

    #[test]
    fn test_sources_sharing_an_output_are_rejected() {
        let dir =
            std::env::temp_dir().join(format!("clipforge-collide-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sources = vec![dir.join("clip.mp4"), dir.join("clip.mov")];

        let err = reject_output_collisions(&sources, &template()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("clip.mp4"), "{message}");
        assert!(message.contains("clip.mov"), "{message}");
        assert!(message.contains("clip_final.mp4"), "{message}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_distinct_outputs_are_accepted() {
        let sources = vec![
            PathBuf::from("/videos/a.mp4"),
            PathBuf::from("/videos/b.mp4"),
            PathBuf::from("/other/a.mp4"),
        ];
        assert!(reject_output_collisions(&sources, &template()).is_ok());
    }
}
