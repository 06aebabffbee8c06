//! Runtime overlay settings.
//!
//! Consolidates the engine-wide knobs into a single typed struct. The engine
//! keeps it behind a `parking_lot::RwLock` so the host can batch-update
//! everything at once between ticks.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HudError, HudResult};

/// How the virtual canvas is mapped onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Uniform `min(sx, sy)`, letterboxed and centered.
    Fit,
    /// Uniform `max(sx, sy)`; groups are re-anchored on the overflowing axis.
    #[default]
    Fill,
    /// Independent `sx`, `sy`.
    Stretch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlaySettings {
    pub scale_mode: ScaleMode,

    /// Shift overflowing groups back onto the surface.
    pub nudge_overflow: bool,

    /// Margin kept from the surface edge when nudging (0-200 px).
    pub nudge_gutter: f64,

    /// Render tick period (5-1000 ms).
    pub tick_interval_ms: u64,

    /// Minimum time between bounds cache writes (0-60000 ms).
    pub bounds_flush_interval_ms: u64,

    /// Diagnostics queue capacity (16-4096).
    pub diagnostics_capacity: usize,

    /// TTL applied to messages that do not carry one, in seconds.
    pub default_ttl_secs: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::Fill,
            nudge_overflow: false,
            nudge_gutter: 0.0,
            tick_interval_ms: 50,
            bounds_flush_interval_ms: 1000,
            diagnostics_capacity: 256,
            default_ttl_secs: 4.0,
        }
    }
}

impl OverlaySettings {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.nudge_gutter = if self.nudge_gutter.is_finite() {
            self.nudge_gutter.clamp(0.0, 200.0)
        } else {
            0.0
        };
        self.tick_interval_ms = self.tick_interval_ms.clamp(5, 1000);
        self.bounds_flush_interval_ms = self.bounds_flush_interval_ms.clamp(0, 60_000);
        self.diagnostics_capacity = self.diagnostics_capacity.clamp(16, 4096);
        if !self.default_ttl_secs.is_finite() {
            self.default_ttl_secs = Self::default().default_ttl_secs;
        }
    }

    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> HudResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[SETTINGS] {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(HudError::StorageError(e)),
        };
        let mut settings: OverlaySettings = serde_json::from_str(&text)?;
        settings.validate();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = OverlaySettings::default();
        assert_eq!(settings.scale_mode, ScaleMode::Fill);
        assert!(!settings.nudge_overflow);
        assert_eq!(settings.tick_interval_ms, 50);
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = OverlaySettings {
            nudge_gutter: 999.0,
            tick_interval_ms: 0,
            diagnostics_capacity: 1,
            default_ttl_secs: f64::NAN,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.nudge_gutter, 200.0);
        assert_eq!(settings.tick_interval_ms, 5);
        assert_eq!(settings.diagnostics_capacity, 16);
        assert_eq!(settings.default_ttl_secs, 4.0);
    }

    #[test]
    fn test_load_partial_file_uses_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "scaleMode": "fit", "nudgeOverflow": true }"#).unwrap();

        let settings = OverlaySettings::load(&path).unwrap();
        assert_eq!(settings.scale_mode, ScaleMode::Fit);
        assert!(settings.nudge_overflow);
        assert_eq!(settings.bounds_flush_interval_ms, 1000);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let settings = OverlaySettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, OverlaySettings::default());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ scaleMode: ").unwrap();
        assert!(matches!(
            OverlaySettings::load(&path),
            Err(HudError::JsonError(_))
        ));
    }
}
