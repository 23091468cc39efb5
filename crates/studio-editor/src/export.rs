//! Flattened PNG export.
//!
//! Every distinct image source is fetched and decoded on tokio's blocking
//! pool under one shared deadline. A source that fails or misses the
//! deadline is drawn as a placeholder, so an export always finishes.
//! Rasterizing and PNG encoding run on the blocking pool too; the finished
//! artifact is handed to the [`ExportSink`] with the caption topic.

use std::sync::Arc;
use std::time::Duration;
use studio_core::{Document, LayerKind, StudioConfig};
use studio_render::assets::load_image;
use studio_render::{
    FontBook, ImageError, ImageLoader, ImageSlot, ImageStore, RasterError, RasterOptions,
    encode_png, rasterize,
};
use thiserror::Error;
use tokio::task::JoinError;

/// A finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Background reference the scene was built from.
    pub background: Option<String>,
}

/// Receives finished exports (saving, uploading, posting).
pub trait ExportSink {
    fn on_export_complete(&mut self, artifact: &ExportArtifact, topic: &str);
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("render task failed: {0}")]
    Join(#[from] JoinError),
}

/// Render `doc` and deliver the PNG to `sink`.
pub async fn export(
    doc: &Document,
    loader: Arc<dyn ImageLoader>,
    fonts: Arc<FontBook>,
    config: &StudioConfig,
    topic: &str,
    sink: &mut dyn ExportSink,
) -> Result<ExportArtifact, ExportError> {
    let options = RasterOptions::from_config(config);
    let sources = image_sources(doc);
    let images = load_images(&sources, loader, config.image_load_timeout()).await;

    // Layers whose picture size was never measured get it from the decode.
    // Authored pan offsets stay as they are.
    let mut snapshot = doc.clone();
    for src in &sources {
        if let ImageSlot::Ready(img) = images.get(src) {
            let (w, h) = img.size();
            snapshot.fill_image_size(src, w, h);
        }
    }

    let (png, width, height) = tokio::task::spawn_blocking(move || {
        let pixmap = rasterize(&snapshot, &images, &fonts, &options)?;
        let png = encode_png(&pixmap)?;
        Ok::<_, RasterError>((png, pixmap.width(), pixmap.height()))
    })
    .await??;

    let artifact = ExportArtifact {
        png,
        width,
        height,
        background: doc.background.clone(),
    };
    log::info!("exported {width}x{height} PNG ({} bytes)", artifact.png.len());
    sink.on_export_complete(&artifact, topic);
    Ok(artifact)
}

/// Distinct non-empty image sources, bottom layer first.
pub fn image_sources(doc: &Document) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for layer in &doc.layers {
        if let LayerKind::Image(img) = &layer.kind {
            if !img.src.is_empty() && !out.contains(&img.src) {
                out.push(img.src.clone());
            }
        }
    }
    out
}

/// Fetch and decode every source concurrently. Sources still pending when
/// `timeout` elapses are recorded as timed out.
pub async fn load_images(sources: &[String], loader: Arc<dyn ImageLoader>, timeout: Duration) -> ImageStore {
    let deadline = tokio::time::Instant::now() + timeout;
    let tasks: Vec<_> = sources
        .iter()
        .map(|src| {
            let loader = Arc::clone(&loader);
            let owned = src.clone();
            let task = tokio::task::spawn_blocking(move || load_image(loader.as_ref(), &owned));
            (src, task)
        })
        .collect();

    let mut store = ImageStore::new();
    for (src, task) in tasks {
        let result = match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ImageError::Loader(join.to_string())),
            Err(_) => Err(ImageError::Timeout(timeout)),
        };
        store.insert(src.as_str(), result);
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{AspectRatio, LayerPatch, LayerType};

    struct Collect(Vec<(usize, String)>);

    impl ExportSink for Collect {
        fn on_export_complete(&mut self, artifact: &ExportArtifact, topic: &str) {
            self.0.push((artifact.png.len(), topic.to_string()));
        }
    }

    struct Slow;

    impl ImageLoader for Slow {
        fn fetch(&self, _src: &str) -> Result<Vec<u8>, ImageError> {
            std::thread::sleep(Duration::from_millis(300));
            Err(ImageError::Empty)
        }
    }

    #[test]
    fn sources_are_distinct_and_ordered() {
        let mut doc = Document::new(AspectRatio::Square);
        for src in ["b.png", "a.png", "b.png", ""] {
            doc.add_layer(
                LayerType::Image,
                &LayerPatch {
                    src: Some(src.into()),
                    ..Default::default()
                },
            );
        }
        doc.add_layer(LayerType::Text, &LayerPatch::default());
        assert_eq!(image_sources(&doc), vec!["b.png", "a.png"]);
    }

    #[tokio::test]
    async fn slow_images_time_out_and_export_still_completes() {
        let mut doc = Document::new(AspectRatio::Square);
        doc.import_background("slow.png");
        let config = StudioConfig {
            image_load_timeout_ms: 50,
            export_scale: 1.0,
            ..Default::default()
        };
        let mut sink = Collect(Vec::new());

        let artifact = export(
            &doc,
            Arc::new(Slow),
            Arc::new(FontBook::empty()),
            &config,
            "Spring launch",
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!((artifact.width, artifact.height), (400, 400));
        assert_eq!(artifact.background.as_deref(), Some("slow.png"));
        assert!(artifact.png.starts_with(b"\x89PNG"));
        assert_eq!(sink.0, vec![(artifact.png.len(), "Spring launch".to_string())]);
    }
}
