//! Editor and export settings.

use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

/// What happens to existing layers when the canvas preset changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectPolicy {
    /// Leave coordinates untouched; layers may end up off-canvas.
    #[default]
    Keep,
    /// Move layers back inside the new bounds, keeping their size.
    Clamp,
    /// Scale positions and sizes by the change in canvas size.
    Rescale,
}

/// Settings consumed by the interaction controller and the exporter.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudioConfig {
    /// Snap distance in canvas pixels, independent of zoom. Default: **8**.
    pub snap_threshold: f32,

    /// Export resolution multiplier over the logical canvas. Default: **2**.
    pub export_scale: f32,

    /// Default: **keep**.
    pub aspect_policy: AspectPolicy,

    /// How long export waits for one image to load and decode before
    /// drawing a placeholder instead. Default: **10000** ms.
    pub image_load_timeout_ms: u64,

    /// Color painted under all layers on export. Default: **#FFFFFF**.
    pub export_background: String,

    /// Hit radius of resize handles and gradient stop handles. Default: **6**.
    pub handle_radius: f32,

    /// Width of the gradient bar in the inspector, in px. Default: **240**.
    pub gradient_bar_width: f32,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            snap_threshold: 8.0,
            export_scale: 2.0,
            aspect_policy: AspectPolicy::Keep,
            image_load_timeout_ms: 10_000,
            export_background: "#FFFFFF".to_string(),
            handle_radius: 6.0,
            gradient_bar_width: 240.0,
        }
    }
}

impl StudioConfig {
    pub fn image_load_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.image_load_timeout_ms)
    }

    /// Parse a JSON config; missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid studio config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = StudioConfig::from_json(r#"{ "exportScale": 3, "aspectPolicy": "rescale" }"#).unwrap();
        assert_eq!(cfg.export_scale, 3.0);
        assert_eq!(cfg.aspect_policy, AspectPolicy::Rescale);
        assert_eq!(cfg.snap_threshold, 8.0);
        assert_eq!(cfg.export_background, "#FFFFFF");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = StudioConfig::from_json("{ nope").unwrap_err();
        assert!(err.starts_with("invalid studio config"));
    }
}
