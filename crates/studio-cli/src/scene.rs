//! Scene and config files.

use anyhow::{Context, Result};
use std::path::Path;
use studio_core::{Document, StudioConfig};

/// Read a JSON scene. A scene that names a background but carries no
/// flagged background layer gets one imported, as the editor would.
pub fn load_scene(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene {}", path.display()))?;
    let mut doc: Document = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scene {}", path.display()))?;

    if doc.background_layer().is_none() {
        if let Some(bg) = doc.background.clone() {
            if let Some(id) = doc.import_background(&bg) {
                log::info!("imported background {bg:?} as {id}");
            }
        }
    }
    log::debug!("loaded {} layers from {}", doc.layers.len(), path.display());
    Ok(doc)
}

/// Read a JSON config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<StudioConfig> {
    let Some(path) = path else {
        return Ok(StudioConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    StudioConfig::from_json(&text)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("in {}", path.display()))
}
