pub mod apply;
pub mod check;
pub mod fetch;
pub mod init_config;
pub mod plan;

use std::path::PathBuf;

use clap::Args;
use clipforge_common::config::{AppConfig, AssetConfig};
use clipforge_filter_graph::ProcessingConfig;
use clipforge_render_engine::{build_processing_config, DirectoryAssetResolver};

/// Overlay flags shared by `apply` and `plan`. Unset values come from the
/// config file.
#[derive(Args, Debug, Clone, Default)]
pub struct OverlayArgs {
    /// Disable the rotated hair overlay
    #[arg(long)]
    pub no_hair: bool,

    /// Disable the subscribe GIF overlay
    #[arg(long)]
    pub no_subscribe: bool,

    /// Playback speed factor
    #[arg(long)]
    pub speed: Option<f64>,

    /// Hair rotation in degrees
    #[arg(long)]
    pub rotation: Option<f64>,

    /// Seconds before the end at which the GIF appears
    #[arg(long)]
    pub overlay_window: Option<f64>,

    /// Overlay asset directory
    #[arg(long)]
    pub assets: Option<PathBuf>,
}

impl OverlayArgs {
    pub fn asset_config(&self, app: &AppConfig) -> AssetConfig {
        let mut assets = app.assets.clone();
        if let Some(dir) = &self.assets {
            assets.dir = dir.clone();
        }
        assets
    }

    /// Flags layered over the configured defaults, with assets resolved
    /// from disk.
    pub fn processing_config(&self, app: &AppConfig) -> ProcessingConfig {
        let mut defaults = app.overlay.clone();
        if self.no_hair {
            defaults.enable_hair = false;
        }
        if self.no_subscribe {
            defaults.enable_subscribe = false;
        }
        if let Some(speed) = self.speed {
            defaults.speed_factor = speed;
        }
        if let Some(rotation) = self.rotation {
            defaults.rotation_degrees = rotation;
        }
        if let Some(window) = self.overlay_window {
            defaults.overlay_window_secs = window;
        }

        let resolver = DirectoryAssetResolver::from_config(&self.asset_config(app));
        build_processing_config(&defaults, &resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_defaults() {
        let app = AppConfig::default();
        let args = OverlayArgs {
            no_hair: true,
            speed: Some(2.0),
            overlay_window: Some(5.0),
            assets: Some(PathBuf::from("/nonexistent/assets")),
            ..OverlayArgs::default()
        };

        let config = args.processing_config(&app);
        assert!(!config.enable_hair_overlay);
        assert!(config.enable_subscribe_overlay);
        assert_eq!(config.speed_factor, 2.0);
        assert_eq!(config.overlay_window_secs, 5.0);
        assert_eq!(config.rotation_degrees, 45.0);
        assert_eq!(config.gif_overlay, None);
    }
}
