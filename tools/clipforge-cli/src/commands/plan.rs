//! Print the filter graph for a clip without running anything.

use clipforge_common::config::AppConfig;
use clipforge_filter_graph::{build_input_plan, compile_graph, AssetHandle};

use super::OverlayArgs;

pub fn run(app: &AppConfig, duration: f64, overlay: OverlayArgs, json: bool) -> anyhow::Result<()> {
    let mut config = overlay.processing_config(app);

    // Nothing is opened here, so show the configured paths even when absent.
    let assets = overlay.asset_config(app);
    config
        .gif_overlay
        .get_or_insert_with(|| AssetHandle::new(assets.dir.join(&assets.gif_file)));
    config
        .hair_overlay
        .get_or_insert_with(|| AssetHandle::new(assets.dir.join(&assets.hair_file)));

    let plan = build_input_plan(&config);
    let graph = compile_graph(&config, &plan, duration)?;

    if json {
        let report = serde_json::json!({
            "duration_secs": duration,
            "inputs": plan,
            "graph": graph,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Inputs:");
    for slot in plan.iter() {
        println!("  {}: {}", slot.index, slot.role.as_str());
    }
    if let Some(window) = graph.overlay_window() {
        println!(
            "GIF window: {}s - {}s",
            window.start_secs, window.end_secs
        );
    }
    println!("Nodes: {}", graph.nodes().len());
    println!();
    println!("{}", graph.to_filter_complex());
    Ok(())
}
