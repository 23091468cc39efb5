//! Integration tests for the export and lint commands.

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use studio_cli::{ExportArgs, LintArgs, load_config, load_scene, run_export, run_lint};

/// Copy the flyer fixture into a fresh directory.
fn flyer() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let scene = dir.path().join("flyer.json");
    std::fs::write(&scene, include_str!("fixtures/flyer.json")).unwrap();
    (dir, scene)
}

fn export_args(scene: PathBuf) -> ExportArgs {
    ExportArgs {
        scene,
        output: None,
        topic: "Grand opening".to_string(),
        config: None,
        scale: None,
        no_system_fonts: true,
    }
}

#[test]
fn loading_imports_the_named_background() {
    let (_dir, scene) = flyer();
    let doc = load_scene(&scene).unwrap();
    assert_eq!(doc.layers.len(), 4);
    let bg = doc.background_layer().unwrap();
    assert_eq!(doc.index_of(bg.id), Some(0));
    assert_eq!((bg.width, bg.height), (400.0, 500.0));
}

#[tokio::test]
async fn export_writes_png_next_to_the_scene() {
    let (_dir, scene) = flyer();
    let out = run_export(&export_args(scene.clone())).await.unwrap();

    assert_eq!(out.path, scene.with_extension("png"));
    assert_eq!((out.artifact.width, out.artifact.height), (800, 1000));
    let written = std::fs::read(&out.path).unwrap();
    assert_eq!(written, out.artifact.png);
    assert!(written.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn scale_and_config_overrides() {
    let (dir, scene) = flyer();
    let config = dir.path().join("studio.json");
    std::fs::write(&config, r##"{ "exportScale": 3, "exportBackground": "#000000" }"##).unwrap();

    let mut args = export_args(scene);
    args.config = Some(config.clone());
    args.output = Some(dir.path().join("out").with_extension("png"));
    let out = run_export(&args).await.unwrap();
    assert_eq!(out.artifact.width, 1200);

    args.scale = Some(1.0);
    let out = run_export(&args).await.unwrap();
    assert_eq!((out.artifact.width, out.artifact.height), (400, 500));

    args.scale = Some(0.0);
    assert!(run_export(&args).await.is_err());

    assert_eq!(load_config(Some(&config)).unwrap().export_scale, 3.0);
    std::fs::write(&config, "{ not json").unwrap();
    let err = load_config(Some(&config)).unwrap_err();
    assert!(format!("{err:#}").contains("invalid studio config"), "{err:#}");
}

#[tokio::test]
async fn missing_scene_reports_the_path() {
    let args = export_args(PathBuf::from("does/not/exist.json"));
    let err = run_export(&args).await.unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.json"), "{err:#}");
}

#[test]
fn lint_flags_bad_colors_and_unsized_images() {
    let (_dir, scene) = flyer();
    let report = run_lint(&LintArgs {
        scene,
        deny_warnings: false,
    })
    .unwrap();

    let rules: Vec<_> = report.diagnostics.iter().map(|d| d.rule).collect();
    assert!(rules.contains(&"bad-color"), "{rules:?}");
    assert!(rules.contains(&"unknown-size"), "{rules:?}");
    assert!(report.warnings() >= 1);
    assert!(report.render().contains("[bad-color] @flyer_badge:"));
}
