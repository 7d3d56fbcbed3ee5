//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClipforgeError, ClipforgeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where overlay assets live.
    pub assets: AssetConfig,

    /// Default overlay and speed settings.
    pub overlay: OverlayDefaults,

    /// Output and encoder settings.
    pub encoding: EncodingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Overlay asset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory searched for overlay assets.
    pub dir: PathBuf,

    /// File name of the animated "subscribe" GIF.
    pub gif_file: String,

    /// File name of the hair PNG.
    pub hair_file: String,
}

/// Default processing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayDefaults {
    /// Playback speed-up factor (1.01 = 1% faster).
    pub speed_factor: f64,

    /// Hair overlay rotation in degrees.
    pub rotation_degrees: f64,

    /// Seconds before the end of the clip at which the GIF appears.
    pub overlay_window_secs: f64,

    /// Square edge length the hair asset is scaled to.
    pub hair_size: u32,

    pub enable_hair: bool,
    pub enable_subscribe: bool,
}

/// Encoder family used by the engine adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderProfile {
    /// Software decode, libx264/aac encode.
    #[default]
    Cpu,
    /// CUDA decode, h264_nvenc encode.
    Nvenc,
}

impl EncoderProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            EncoderProfile::Cpu => "cpu",
            EncoderProfile::Nvenc => "nvenc",
        }
    }
}

impl std::str::FromStr for EncoderProfile {
    type Err = ClipforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "x264" | "libx264" => Ok(EncoderProfile::Cpu),
            "nvenc" | "gpu" | "cuda" => Ok(EncoderProfile::Nvenc),
            other => Err(ClipforgeError::invalid_configuration(format!(
                "Unknown encoder profile: {other}. Use: cpu, nvenc"
            ))),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingDefaults {
    pub encoder: EncoderProfile,

    /// Appended to the source file stem to derive the output name.
    pub output_suffix: String,

    /// Remove the source file once the engine reports success.
    pub delete_source_on_success: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets: AssetConfig::default(),
            overlay: OverlayDefaults::default(),
            encoding: EncodingDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: dirs_default_assets(),
            gif_file: "overlay.gif".to_string(),
            hair_file: "hair.png".to_string(),
        }
    }
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            speed_factor: 1.01,
            rotation_degrees: 45.0,
            overlay_window_secs: 3.0,
            hair_size: 360,
            enable_hair: true,
            enable_subscribe: true,
        }
    }
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            encoder: EncoderProfile::Cpu,
            output_suffix: "_final".to_string(),
            delete_source_on_success: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> ClipforgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClipforgeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ClipforgeError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ClipforgeResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ClipforgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipforge").join("config.json")
}

/// Default overlay asset directory.
fn dirs_default_assets() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("clipforge").join("assets")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("clipforge-config-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert!((config.overlay.speed_factor - 1.01).abs() < 1e-12);
        assert_eq!(config.overlay.rotation_degrees, 45.0);
        assert_eq!(config.overlay.overlay_window_secs, 3.0);
        assert_eq!(config.overlay.hair_size, 360);
        assert_eq!(config.assets.gif_file, "overlay.gif");
        assert_eq!(config.assets.hair_file, "hair.png");
        assert_eq!(config.encoding.output_suffix, "_final");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{"overlay":{"speed_factor":1.05},"encoding":{"encoder":"nvenc"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!((config.overlay.speed_factor - 1.05).abs() < 1e-12);
        assert_eq!(config.overlay.hair_size, 360);
        assert_eq!(config.encoding.encoder, EncoderProfile::Nvenc);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_then_load_from() {
        let path = scratch_path("save_then_load.json");
        let mut config = AppConfig::default();
        config.overlay.enable_hair = false;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert!(!loaded.overlay.enable_hair);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_malformed_is_error() {
        let path = scratch_path("malformed.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ClipforgeError::Config { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_encoder_profile_parse() {
        assert_eq!("cpu".parse::<EncoderProfile>().unwrap(), EncoderProfile::Cpu);
        assert_eq!("NVENC".parse::<EncoderProfile>().unwrap(), EncoderProfile::Nvenc);
        assert!("vaapi".parse::<EncoderProfile>().is_err());
    }
}
