//! Check external tool availability.

use clipforge_common::config::AppConfig;
use clipforge_render_engine::{
    DurationProbe, EngineAdapter, FfmpegEngine, FfprobeDurationProbe, SourceFetcher, YtDlpFetcher,
};

pub fn run(app: &AppConfig) -> anyhow::Result<()> {
    println!("Clipforge System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("ffmpeg", FfmpegEngine::new().is_available(), true),
        ("ffprobe", FfprobeDurationProbe::default().is_available(), true),
        ("yt-dlp", YtDlpFetcher::default().is_available(), false),
    ];
    for (name, available, required) in tools {
        match (available, required) {
            (true, _) => println!("[OK]   {name}"),
            (false, true) => println!("[FAIL] {name} not found in PATH"),
            (false, false) => println!("[WARN] {name} not found in PATH (needed for `fetch`)"),
        }
    }

    let assets = &app.assets;
    for file in [&assets.gif_file, &assets.hair_file] {
        let path = assets.dir.join(file);
        if path.is_file() {
            println!("[OK]   asset {}", path.display());
        } else {
            println!("[WARN] asset {} missing", path.display());
        }
    }

    println!();
    if tools.iter().all(|(_, available, required)| *available || !*required) {
        println!("All required tools are available. Clipforge is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to continue.");
    }

    Ok(())
}
