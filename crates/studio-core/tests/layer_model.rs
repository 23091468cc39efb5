//! Integration tests: scene JSON → Document → model operations.

use pretty_assertions::assert_eq;
use studio_core::effects::{css_box_shadow, effective_blur};
use studio_core::gradient::{add_gradient_stop, remove_gradient_stop};
use studio_core::{
    AspectRatio, Document, EffectType, LayerId, LayerKind, LayerPatch, LayerType, Paint,
    SnapContext, StudioConfig, TextAlign, ZOrder, compute_move_snap, lint_document,
    to_css_gradient,
};

fn poster() -> Document {
    serde_json::from_str(include_str!("fixtures/poster.json")).expect("poster fixture parses")
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[test]
fn fixture_loads_every_kind() {
    let doc = poster();
    assert_eq!(doc.aspect, AspectRatio::Square);
    let kinds: Vec<LayerType> = doc.layers.iter().map(|l| l.layer_type()).collect();
    assert_eq!(
        kinds,
        vec![
            LayerType::Image,
            LayerType::Circle,
            LayerType::Rectangle,
            LayerType::Text
        ]
    );

    let headline = doc.layer(LayerId::intern("headline")).unwrap();
    let text = headline.text().unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Summer", "Sale"]);
    assert_eq!(text.text_align, TextAlign::Center);
    assert_eq!(text.background.as_deref(), Some("rgba(0,0,0,0.5)"));

    let panel = doc.layer(LayerId::intern("panel")).unwrap();
    assert_eq!(panel.skew().x, -10.0);
    assert_eq!(effective_blur(&panel.style.effects), Some(2.0));
}

#[test]
fn serialization_roundtrip_preserves_document() {
    let doc = poster();
    let json = serde_json::to_string(&doc).unwrap();
    let back: Document = serde_json::from_str(&json).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn disabled_effects_are_kept_but_not_rendered() {
    let doc = poster();
    let badge = doc.layer(LayerId::intern("badge")).unwrap();
    assert_eq!(badge.style.effects.len(), 2);
    assert_eq!(
        css_box_shadow(&badge.style.effects).as_deref(),
        Some("4px 4px 10px 0px rgba(0, 0, 0, 0.25)")
    );
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn circle_gradient_css_contains_colors_and_angle() {
    let mut doc = Document::default();
    let id = doc.add_layer(LayerType::Circle, &LayerPatch::default());
    doc.update_layer(
        id,
        &LayerPatch {
            is_gradient: Some(true),
            gradient_angle: Some(180.0),
            ..Default::default()
        },
    );
    let css = to_css_gradient(&doc.layer(id).unwrap().style);
    assert!(css.contains("#FF007A"), "{css}");
    assert!(css.contains("#6366F1"), "{css}");
    assert!(css.contains("180deg"), "{css}");
}

#[test]
fn two_drop_shadows_render_as_two_descriptors() {
    let mut doc = Document::default();
    let id = doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
    let first = doc.add_effect(id, EffectType::DropShadow).unwrap();
    let second = doc.add_effect(id, EffectType::DropShadow).unwrap();
    assert_ne!(first, second);
    doc.update_effect(
        id,
        second,
        &studio_core::EffectPatch {
            offset_x: Some(0.0),
            offset_y: Some(12.0),
            blur: Some(24.0),
            ..Default::default()
        },
    );
    let css = css_box_shadow(&doc.layer(id).unwrap().style.effects).unwrap();
    assert_eq!(
        css,
        "4px 4px 10px 0px rgba(0, 0, 0, 0.25), 0px 12px 24px 0px rgba(0, 0, 0, 0.25)"
    );
}

#[test]
fn minimum_gradient_stops_survive_repeated_removal() {
    let mut doc = Document::default();
    let id = doc.add_layer(
        LayerType::Rectangle,
        &LayerPatch {
            is_gradient: Some(true),
            ..Default::default()
        },
    );
    assert!(!doc.remove_gradient_stop(id, 0));
    assert!(!doc.remove_gradient_stop(id, 0));
    assert_eq!(doc.layer(id).unwrap().style.gradient_stops.len(), 2);

    let idx = doc.add_gradient_stop(id, 50.0).unwrap();
    assert_eq!(idx, 1);
    assert!(doc.remove_gradient_stop(id, 0));
    assert!(!doc.remove_gradient_stop(id, 0));
    assert_eq!(doc.layer(id).unwrap().style.gradient_stops.len(), 2);
}

#[test]
fn stop_lists_never_drop_below_two_over_random_sequences() {
    let mut stops = studio_core::gradient::default_stops();
    // Deterministic pseudo-random walk of adds and removes.
    let mut seed: u32 = 0x9E37_79B9;
    for _ in 0..200 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        if seed % 3 == 0 {
            add_gradient_stop(&mut stops, (seed % 101) as f32);
        } else {
            let index = (seed as usize) % (stops.len() + 1);
            remove_gradient_stop(&mut stops, index);
        }
        assert!(stops.len() >= 2);
    }
}

#[test]
fn reorder_front_on_three_layers() {
    let mut doc = Document::default();
    let a = doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
    let b = doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
    let c = doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
    assert!(doc.reorder_layer(b, ZOrder::Front));
    assert_eq!(doc.layer_ids(), vec![a, c, b]);
    assert!(!doc.reorder_layer(b, ZOrder::Front));
    assert_eq!(doc.layer_ids(), vec![a, c, b]);
}

#[test]
fn empty_patch_never_changes_any_layer() {
    let mut doc = poster();
    let before = doc.clone();
    for id in doc.layer_ids() {
        assert!(!doc.update_layer(id, &LayerPatch::default()));
    }
    assert_eq!(doc, before);
}

#[test]
fn snap_to_sibling_edge_is_exact_and_repeatable() {
    let mut doc = Document::default();
    doc.add_layer(LayerType::Rectangle, &LayerPatch::frame(100.0, 200.0, 60.0, 60.0));
    let moving = doc.add_layer(LayerType::Rectangle, &LayerPatch::frame(40.0, 50.0, 20.0, 20.0));
    let ctx = SnapContext::capture(&doc, moving, &StudioConfig::default());

    let results: Vec<_> = (0..3)
        .map(|_| compute_move_snap(&ctx, 98.0, 50.0, 20.0, 20.0))
        .collect();
    assert_eq!(results[0].x, 100.0);
    assert!(results.iter().all(|r| *r == results[0]));
}

// ─── Failure semantics ───────────────────────────────────────────────────

#[test]
fn malformed_styles_resolve_to_gray_without_failing() {
    let doc: Document = serde_json::from_str(include_str!("fixtures/broken_styles.json")).unwrap();
    let paints: Vec<Paint> = doc.layers.iter().map(|l| l.style.resolve_paint()).collect();

    assert_eq!(paints[0].primary_color().to_hex(), "#22C55E");
    assert_eq!(paints[1].primary_color().to_hex(), "#9CA3AF");
    match &paints[2] {
        Paint::Linear { stops, .. } => {
            assert!(stops.iter().all(|s| s.color.to_hex() == "#9CA3AF"));
        }
        other => panic!("expected gradient fallback, got {other:?}"),
    }

    let rules: Vec<&str> = lint_document(&doc).iter().map(|d| d.rule).collect();
    assert_eq!(rules, vec!["bad-color", "few-stops", "bad-color", "off-canvas"]);
}

#[test]
fn background_auto_import_sits_below_existing_layers() {
    let mut doc = Document::default();
    let text = doc.add_layer(LayerType::Text, &LayerPatch::default());
    let bg = doc.import_background("data:image/png;base64,AAAA").unwrap();
    assert_eq!(doc.layer_ids(), vec![bg, text]);
    match &doc.layer(bg).unwrap().kind {
        LayerKind::Image(img) => assert!(img.is_background),
        other => panic!("unexpected kind {other:?}"),
    }
}
