//! Per-request processing configuration.

use std::path::{Path, PathBuf};

use clipforge_common::config::OverlayDefaults;
use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use serde::{Deserialize, Serialize};

/// Location of an overlay asset. The compiler never opens it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(PathBuf);

impl AssetHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Immutable configuration for one processing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub enable_hair_overlay: bool,
    pub enable_subscribe_overlay: bool,

    /// Desired speed-up. Must be finite and strictly positive.
    pub speed_factor: f64,

    /// Hair overlay rotation in degrees.
    pub rotation_degrees: f64,

    /// Animated GIF composited during the last seconds of the clip.
    pub gif_overlay: Option<AssetHandle>,

    /// PNG scaled, rotated and composited over the whole clip.
    pub hair_overlay: Option<AssetHandle>,

    /// How long before the end of the clip the GIF becomes active.
    pub overlay_window_secs: f64,

    /// Square edge length, in pixels, the hair asset is scaled to.
    pub hair_size: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::from_defaults(&OverlayDefaults::default(), None, None)
    }
}

impl ProcessingConfig {
    /// Build a configuration from application defaults and resolved assets.
    pub fn from_defaults(
        defaults: &OverlayDefaults,
        gif_overlay: Option<AssetHandle>,
        hair_overlay: Option<AssetHandle>,
    ) -> Self {
        Self {
            enable_hair_overlay: defaults.enable_hair,
            enable_subscribe_overlay: defaults.enable_subscribe,
            speed_factor: defaults.speed_factor,
            rotation_degrees: defaults.rotation_degrees,
            gif_overlay,
            hair_overlay,
            overlay_window_secs: defaults.overlay_window_secs,
            hair_size: defaults.hair_size,
        }
    }

    /// Whether any auxiliary input will be composited onto the main stream.
    pub fn has_overlays(&self) -> bool {
        self.enable_hair_overlay || self.enable_subscribe_overlay
    }

    /// Hair rotation converted to radians.
    pub fn rotation_radians(&self) -> f64 {
        self.rotation_degrees * std::f64::consts::PI / 180.0
    }

    /// Reject values the engine would misinterpret.
    pub fn validate(&self) -> ClipforgeResult<()> {
        if !self.speed_factor.is_finite() || self.speed_factor <= 0.0 {
            return Err(ClipforgeError::invalid_configuration(format!(
                "speed factor must be finite and > 0, got {}",
                self.speed_factor
            )));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(ClipforgeError::invalid_configuration(format!(
                "rotation must be finite, got {}",
                self.rotation_degrees
            )));
        }
        if self.enable_subscribe_overlay {
            if self.gif_overlay.is_none() {
                return Err(ClipforgeError::invalid_configuration(
                    "subscribe overlay enabled but no GIF asset was resolved",
                ));
            }
            if !self.overlay_window_secs.is_finite() || self.overlay_window_secs <= 0.0 {
                return Err(ClipforgeError::invalid_configuration(format!(
                    "overlay window must be finite and > 0, got {}",
                    self.overlay_window_secs
                )));
            }
        }
        if self.enable_hair_overlay {
            if self.hair_overlay.is_none() {
                return Err(ClipforgeError::invalid_configuration(
                    "hair overlay enabled but no PNG asset was resolved",
                ));
            }
            if self.hair_size == 0 {
                return Err(ClipforgeError::invalid_configuration(
                    "hair size must be at least 1 pixel",
                ));
            }
        }
        Ok(())
    }
}
