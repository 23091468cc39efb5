//! Integration tests: scene JSON → preview frame, hit testing and raster.

use pretty_assertions::assert_eq;
use studio_core::{Document, LayerId, lint_document};
use studio_render::hit::hit_test;
use studio_render::preview::{Overlay, PreviewContent};
use studio_render::{
    DefaultLoader, FontBook, ImageStore, PreviewState, RasterOptions, encode_png, rasterize,
    render_preview,
};

fn launch() -> Document {
    serde_json::from_str(include_str!("fixtures/launch.json")).expect("launch fixture parses")
}

fn sources(doc: &Document) -> Vec<&str> {
    doc.layers
        .iter()
        .filter_map(|l| l.image())
        .map(|i| i.src.as_str())
        .collect()
}

fn load(doc: &Document) -> ImageStore {
    ImageStore::load_all(&DefaultLoader::default(), sources(doc))
}

#[test]
fn preview_lists_layers_in_z_order() {
    let doc = launch();
    let store = load(&doc);
    let state = PreviewState {
        selected: Some(LayerId::intern("card")),
        broken_images: store.failed().map(str::to_string).collect(),
        ..Default::default()
    };
    let frame = render_preview(&doc, &state);

    let ids: Vec<&str> = frame.elements.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["hero", "card", "headline", "logo"]);
    let z: Vec<usize> = frame.elements.iter().map(|e| e.z_index).collect();
    assert_eq!(z, vec![0, 1, 2, 3]);

    let logo = frame.element(LayerId::intern("logo")).unwrap();
    assert_eq!(logo.content, PreviewContent::BrokenImage);
    let card = frame.element(LayerId::intern("card")).unwrap();
    assert_eq!(
        card.get("background"),
        Some("linear-gradient(90deg, #FFFFFFFF 0%, #F59E0BFF 100%)")
    );
    assert_eq!(
        card.get("box-shadow"),
        Some("0px 8px 16px 0px rgba(0, 0, 0, 0.3)")
    );
    assert!(matches!(frame.overlays[0], Overlay::SelectionBox { .. }));
}

#[test]
fn hit_testing_prefers_the_topmost_layer() {
    let doc = launch();
    assert_eq!(hit_test(&doc, 200.0, 140.0), Some(LayerId::intern("headline")));
    assert_eq!(hit_test(&doc, 50.0, 220.0), Some(LayerId::intern("card")));
    assert_eq!(hit_test(&doc, 5.0, 395.0), Some(LayerId::intern("hero")));
    assert_eq!(hit_test(&doc, 330.0, 330.0), Some(LayerId::intern("logo")));
}

#[test]
fn export_renders_every_layer_despite_a_missing_image() {
    let mut doc = launch();
    let store = load(&doc);
    assert_eq!(store.failed().collect::<Vec<_>>(), vec!["missing/logo.png"]);

    // Decoded size recorded on the background centers the cover-fit.
    let hero_src = sources(&doc)[0].to_string();
    assert_eq!(doc.image_loaded(&hero_src, 8.0, 4.0), vec![LayerId::intern("hero")]);
    let hero = doc.layer(LayerId::intern("hero")).unwrap().image().unwrap();
    assert_eq!((hero.img_x, hero.img_y), (-200.0, 0.0));

    let pm = rasterize(&doc, &store, &FontBook::empty(), &RasterOptions::default()).unwrap();
    assert_eq!((pm.width(), pm.height()), (800, 800));

    let px = |x: u32, y: u32| {
        let c = pm.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue()]
    };
    let close = |a: [u8; 3], b: [u8; 3]| a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2);
    // Background image corner.
    assert!(close(px(4, 790), [30, 64, 175]), "{:?}", px(4, 790));
    // Broken logo placeholder, away from its diagonals.
    assert!(close(px(660, 610), [229, 231, 235]), "{:?}", px(660, 610));
    // Card gradient runs left (white) to right (amber).
    let left = px(100, 420);
    let right = px(700, 420);
    assert!(left[2] > right[2], "{left:?} vs {right:?}");

    let png = encode_png(&pm).unwrap();
    assert!(png.len() > 100);
}

#[test]
fn fixture_only_reports_unknown_image_sizes() {
    let doc = launch();
    let rules: Vec<&str> = lint_document(&doc).iter().map(|d| d.rule).collect();
    assert_eq!(rules, vec!["unknown-size", "unknown-size"]);
}
