//! The `export` and `lint` subcommands.

use crate::scene::{load_config, load_scene};
use crate::sink::FileSink;
use anyhow::{Context, Result, bail, ensure};
use clap::Args;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studio_core::{LintDiagnostic, LintSeverity, lint_document};
use studio_editor::{ExportArtifact, export};
use studio_render::{DefaultLoader, FontBook};

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Scene JSON file
    pub scene: PathBuf,

    /// Output PNG (default: the scene path with a .png extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Caption handed to the sink with the image
    #[arg(short, long, default_value = "")]
    pub topic: String,

    /// Studio config JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Export resolution multiplier (overrides the config)
    #[arg(short, long)]
    pub scale: Option<f32>,

    /// Skip system fonts; text renders as placeholder boxes
    #[arg(long)]
    pub no_system_fonts: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LintArgs {
    /// Scene JSON file
    pub scene: PathBuf,

    /// Fail when any warning is reported
    #[arg(long)]
    pub deny_warnings: bool,
}

/// A PNG written by [`run_export`].
#[derive(Debug)]
pub struct Exported {
    pub path: PathBuf,
    pub artifact: ExportArtifact,
}

pub async fn run_export(args: &ExportArgs) -> Result<Exported> {
    let doc = load_scene(&args.scene)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(scale) = args.scale {
        ensure!(scale.is_finite() && scale > 0.0, "--scale must be positive, got {scale}");
        config.export_scale = scale;
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| args.scene.with_extension("png"));
    let base = args.scene.parent().map(Path::to_path_buf).unwrap_or_default();
    let loader = Arc::new(DefaultLoader::new(base));
    let fonts = Arc::new(if args.no_system_fonts {
        FontBook::empty()
    } else {
        FontBook::system()
    });

    let mut sink = FileSink::new(&path);
    let artifact = export(&doc, loader, fonts, &config, &args.topic, &mut sink)
        .await
        .with_context(|| format!("failed to export {}", args.scene.display()))?;

    match sink.result {
        Some(Ok(())) => Ok(Exported { path, artifact }),
        Some(Err(e)) => Err(e).with_context(|| format!("failed to write {}", path.display())),
        None => bail!("export finished without reaching the sink"),
    }
}

/// Diagnostics for one scene.
#[derive(Debug)]
pub struct LintReport {
    pub diagnostics: Vec<LintDiagnostic>,
}

impl LintReport {
    pub fn warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == LintSeverity::Warning)
            .count()
    }

    /// One `severity[rule] @layer: message` line per diagnostic.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.diagnostics {
            let severity = match d.severity {
                LintSeverity::Warning => "warning",
                LintSeverity::Info => "info",
            };
            let _ = writeln!(out, "{severity}[{}] {}: {}", d.rule, d.layer_id, d.message);
        }
        out
    }
}

pub fn run_lint(args: &LintArgs) -> Result<LintReport> {
    let doc = load_scene(&args.scene)?;
    Ok(LintReport {
        diagnostics: lint_document(&doc),
    })
}
