//! Download a source video.

use std::path::PathBuf;

use clipforge_render_engine::{SourceFetcher, YtDlpFetcher};

pub async fn run(url: String, output: PathBuf) -> anyhow::Result<()> {
    let fetcher = YtDlpFetcher::default();
    if !fetcher.is_available() {
        anyhow::bail!("yt-dlp not found in PATH");
    }

    println!("Fetching {url} into {}", output.display());
    let path = tokio::task::spawn_blocking(move || fetcher.fetch(&url, &output)).await??;
    println!("Downloaded: {}", path.display());
    Ok(())
}
