//! Export sink that writes the PNG to disk.

use std::path::PathBuf;
use studio_editor::{ExportArtifact, ExportSink};

#[derive(Debug)]
pub struct FileSink {
    pub path: PathBuf,
    /// Outcome of the last write; `None` until an export completes.
    pub result: Option<std::io::Result<()>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            result: None,
        }
    }
}

impl ExportSink for FileSink {
    fn on_export_complete(&mut self, artifact: &ExportArtifact, topic: &str) {
        log::info!("saving {:?} to {}", topic, self.path.display());
        self.result = Some(std::fs::write(&self.path, &artifact.png));
    }
}
