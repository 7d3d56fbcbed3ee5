//! Overlay asset lookup.

use std::path::PathBuf;

use clipforge_common::config::{AssetConfig, OverlayDefaults};
use clipforge_filter_graph::{AssetHandle, InputRole, ProcessingConfig};

/// Maps an overlay role to the asset that fills it.
pub trait AssetResolver: Send + Sync {
    /// `None` when no asset is available for the role.
    fn resolve(&self, role: InputRole) -> Option<AssetHandle>;
}

/// Finds assets by file name inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssetResolver {
    dir: PathBuf,
    gif_file: String,
    hair_file: String,
}

impl DirectoryAssetResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let defaults = AssetConfig::default();
        Self {
            dir: dir.into(),
            gif_file: defaults.gif_file,
            hair_file: defaults.hair_file,
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            gif_file: config.gif_file.clone(),
            hair_file: config.hair_file.clone(),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl AssetResolver for DirectoryAssetResolver {
    fn resolve(&self, role: InputRole) -> Option<AssetHandle> {
        let file = match role {
            InputRole::Main => return None,
            InputRole::GifOverlay => &self.gif_file,
            InputRole::HairOverlay => &self.hair_file,
        };
        let path = self.dir.join(file);
        if path.is_file() {
            Some(AssetHandle::new(path))
        } else {
            tracing::debug!(
                role = role.as_str(),
                path = %path.display(),
                "Overlay asset not found"
            );
            None
        }
    }
}

/// Processing configuration from defaults with assets filled in by `resolver`.
pub fn build_processing_config(
    defaults: &OverlayDefaults,
    resolver: &dyn AssetResolver,
) -> ProcessingConfig {
    ProcessingConfig::from_defaults(
        defaults,
        resolver.resolve(InputRole::GifOverlay),
        resolver.resolve(InputRole::HairOverlay),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "clipforge-assets-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolves_existing_files_only() {
        let dir = scratch_dir("existing");
        std::fs::write(dir.join("overlay.gif"), b"GIF89a").unwrap();

        let resolver = DirectoryAssetResolver::new(&dir);
        assert_eq!(
            resolver.resolve(InputRole::GifOverlay),
            Some(AssetHandle::new(dir.join("overlay.gif")))
        );
        assert_eq!(resolver.resolve(InputRole::HairOverlay), None);
        assert_eq!(resolver.resolve(InputRole::Main), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_custom_file_names() {
        let dir = scratch_dir("custom");
        std::fs::write(dir.join("wig.png"), b"png").unwrap();

        let resolver = DirectoryAssetResolver::from_config(&AssetConfig {
            dir: dir.clone(),
            gif_file: "sub.gif".to_string(),
            hair_file: "wig.png".to_string(),
        });
        let config = build_processing_config(&OverlayDefaults::default(), &resolver);
        assert_eq!(config.hair_overlay, Some(AssetHandle::new(dir.join("wig.png"))));
        assert_eq!(config.gif_overlay, None);
        assert_eq!(config.speed_factor, 1.01);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
