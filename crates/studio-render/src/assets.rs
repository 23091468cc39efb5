//! Image sources: fetching bytes, decoding, and the per-export image cache.
//!
//! Fetching is behind the [`ImageLoader`] trait so hosts can plug in their
//! own transport. [`DefaultLoader`] understands `data:` URIs and local
//! paths. Decoding always yields a premultiplied tiny-skia pixmap.

use base64::{Engine as _, engine::general_purpose};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tiny_skia::{IntSize, Pixmap};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image source {0:?}")]
    Unsupported(String),
    #[error("malformed data URI: {0}")]
    DataUri(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
    #[error("image did not load within {0:?}")]
    Timeout(Duration),
    /// A host loader's own failure (network, permissions, a crashed worker).
    #[error("image loader failed: {0}")]
    Loader(String),
}

/// Fetches the raw bytes behind an image reference.
pub trait ImageLoader: Send + Sync {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, ImageError>;
}

/// Loads `data:` URIs and filesystem paths (relative to `base_dir`).
/// Network URLs are reported as unsupported.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    pub base_dir: Option<PathBuf>,
}

impl DefaultLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl ImageLoader for DefaultLoader {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, ImageError> {
        let src = src.trim();
        if let Some(rest) = src.strip_prefix("data:") {
            return decode_data_uri(rest);
        }
        if src.starts_with("http://") || src.starts_with("https://") || src.is_empty() {
            return Err(ImageError::Unsupported(src.to_string()));
        }
        let raw = src.strip_prefix("file://").unwrap_or(src);
        let path = match &self.base_dir {
            Some(base) => base.join(raw),
            None => PathBuf::from(raw),
        };
        std::fs::read(&path).map_err(|source| ImageError::Io { path, source })
    }
}

/// Payload of a `data:[<mime>][;base64],<data>` URI, without the scheme.
fn decode_data_uri(rest: &str) -> Result<Vec<u8>, ImageError> {
    let Some((meta, payload)) = rest.split_once(',') else {
        return Err(ImageError::DataUri("missing ','".to_string()));
    };
    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| ImageError::DataUri(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// A decoded image ready to be drawn.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixmap: Pixmap,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width() as f32, self.height() as f32)
    }
}

/// Decode PNG/JPEG bytes into a premultiplied pixmap.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (w, h) = rgba.dimensions();
    let size = IntSize::from_wh(w, h).ok_or(ImageError::Empty)?;
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    let pixmap = Pixmap::from_vec(data, size).ok_or(ImageError::Empty)?;
    Ok(DecodedImage { pixmap })
}

/// Fetch and decode in one step.
pub fn load_image(loader: &dyn ImageLoader, src: &str) -> Result<DecodedImage, ImageError> {
    let bytes = loader.fetch(src)?;
    decode_image(&bytes)
}

/// What the raster renderer knows about one image reference.
#[derive(Debug, Clone, Copy)]
pub enum ImageSlot<'a> {
    Ready(&'a DecodedImage),
    /// Loading was attempted and failed (or timed out).
    Failed,
    /// Never requested.
    Missing,
}

/// Images resolved for one render, keyed by source string.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, Result<DecodedImage, String>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, src: impl Into<String>, result: Result<DecodedImage, ImageError>) {
        let src = src.into();
        let entry = result.map_err(|e| {
            log::warn!("image {src:?} unavailable: {e}");
            e.to_string()
        });
        self.images.insert(src, entry);
    }

    pub fn get(&self, src: &str) -> ImageSlot<'_> {
        match self.images.get(src) {
            Some(Ok(img)) => ImageSlot::Ready(img),
            Some(Err(_)) => ImageSlot::Failed,
            None => ImageSlot::Missing,
        }
    }

    pub fn contains(&self, src: &str) -> bool {
        self.images.contains_key(src)
    }

    /// Sources that failed, for the preview's broken-image state.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(k, _)| k.as_str())
    }

    /// Load every source synchronously through `loader`.
    pub fn load_all<'a>(loader: &dyn ImageLoader, sources: impl IntoIterator<Item = &'a str>) -> Self {
        let mut store = Self::new();
        for src in sources {
            if !store.contains(src) {
                store.insert(src, load_image(loader, src));
            }
        }
        store
    }
}
