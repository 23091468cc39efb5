//! Integration tests: a scripted editing session over a JSON scene.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use studio_core::{Document, Guide, LayerId, StudioConfig, to_css_gradient};
use studio_editor::{
    ChangeKind, ExportArtifact, ExportSink, InputEvent, InteractionState, ModelChange,
    ShortcutAction, Studio, export,
};
use studio_render::assets::decode_image;
use studio_render::{DefaultLoader, FontBook};

fn session() -> Studio {
    let doc: Document =
        serde_json::from_str(include_str!("fixtures/session.json")).expect("session fixture parses");
    Studio::new(doc, StudioConfig::default())
}

fn id(name: &str) -> LayerId {
    LayerId::intern(name)
}

fn click(studio: &mut Studio, x: f32, y: f32) {
    studio.dispatch(&InputEvent::pointer_down(x, y));
    studio.dispatch(&InputEvent::pointer_up(x, y));
}

#[test]
fn delete_selected_layer_from_the_middle() {
    let mut studio = session();
    click(&mut studio, 290.0, 240.0);
    assert_eq!(studio.selected(), Some(id("dot")));

    assert!(studio.dispatch(&InputEvent::Action(ShortcutAction::Delete)));
    assert_eq!(
        studio.document().layer_ids(),
        vec![id("panel"), id("caption"), id("chip")]
    );
    assert_eq!(studio.selected(), None);
}

/// Drag the chip (x = 98, width 20) so it would land at x = 102.
fn drag_chip(studio: &mut Studio) -> Vec<Guide> {
    studio.dispatch(&InputEvent::pointer_down(108.0, 60.0));
    studio.dispatch(&InputEvent::pointer_move(112.0, 60.0));
    let guides = studio.guides().to_vec();
    studio.dispatch(&InputEvent::pointer_up(112.0, 60.0));
    guides
}

#[test]
fn dragging_snaps_to_a_sibling_edge_deterministically() {
    let mut first = session();
    let mut second = session();
    let guides = drag_chip(&mut first);
    drag_chip(&mut second);

    let chip = first.document().layer(id("chip")).unwrap();
    assert_eq!((chip.x, chip.y), (100.0, 50.0));
    assert_eq!(guides, vec![Guide::Vertical(100.0)]);
    assert_eq!(first.document(), second.document());

    assert_eq!(first.state(), InteractionState::Selected(id("chip")));
    assert!(first.guides().is_empty());
}

#[test]
fn every_drag_frame_commits_and_notifies() {
    let mut studio = session();
    let log: Rc<RefCell<Vec<ModelChange>>> = Rc::default();
    let sink = Rc::clone(&log);
    studio.subscribe(Box::new(move |c: &ModelChange| sink.borrow_mut().push(c.clone())));

    studio.dispatch(&InputEvent::pointer_down(140.0, 230.0));
    for x in [150.0, 160.0, 170.0] {
        studio.dispatch(&InputEvent::pointer_move(x, 230.0));
    }
    studio.dispatch(&InputEvent::pointer_up(170.0, 230.0));

    let kinds: Vec<_> = log.borrow().iter().map(|c| (c.revision, c.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (1, ChangeKind::Updated),
            (2, ChangeKind::Updated),
            (3, ChangeKind::Updated),
        ]
    );
    assert_eq!(studio.document().layer(id("panel")).unwrap().x, 130.0);
}

#[test]
fn escape_beats_an_in_flight_resize() {
    let mut studio = session();
    click(&mut studio, 140.0, 230.0);
    // South-east handle of the panel.
    studio.dispatch(&InputEvent::pointer_down(180.0, 260.0));
    assert!(matches!(studio.state(), InteractionState::Resizing { .. }));
    studio.dispatch(&InputEvent::pointer_move(150.0, 230.0));

    studio.dispatch(&InputEvent::key("Escape"));
    assert_eq!(studio.state(), InteractionState::Selected(id("panel")));
    let panel = studio.document().layer(id("panel")).unwrap();
    assert_eq!((panel.width, panel.height), (50.0, 30.0));
    assert!(panel.width >= 20.0 && panel.height >= 20.0);
}

#[test]
fn gradient_bar_keeps_at_least_two_stops() {
    let mut studio = session();
    click(&mut studio, 140.0, 230.0);

    // 120px of the 240px bar: a stop at 50%.
    studio.dispatch(&InputEvent::GradientBarDown { x: 120.0 });
    studio.dispatch(&InputEvent::GradientBarUp);
    let css = to_css_gradient(&studio.document().layer(id("panel")).unwrap().style);
    assert!(css.starts_with("linear-gradient(90deg"), "{css}");
    assert_eq!(studio.document().layer(id("panel")).unwrap().style.gradient_stops.len(), 3);

    for x in [120.0, 0.0, 240.0] {
        studio.dispatch(&InputEvent::GradientBarDoubleClick { x });
    }
    let stops = &studio.document().layer(id("panel")).unwrap().style.gradient_stops;
    assert_eq!(stops.len(), 2);
}

#[test]
fn text_edit_round_trip() {
    let mut studio = session();
    studio.dispatch(&InputEvent::DoubleClick { x: 140.0, y: 345.0 });
    assert_eq!(studio.state(), InteractionState::TextEditing(id("caption")));
    studio.dispatch(&InputEvent::TextInput("Hello\nWorld".into()));
    // Clicking elsewhere on the canvas also commits.
    click(&mut studio, 390.0, 10.0);

    let text = studio.document().layer(id("caption")).unwrap().text().unwrap();
    assert_eq!(text.text, "Hello\nWorld");
    assert_eq!(studio.selected(), None);
}

#[derive(Default)]
struct Outbox(Vec<(u32, u32, String)>);

impl ExportSink for Outbox {
    fn on_export_complete(&mut self, artifact: &ExportArtifact, topic: &str) {
        self.0.push((artifact.width, artifact.height, topic.to_string()));
    }
}

#[tokio::test]
async fn export_hands_the_artifact_to_the_sink() {
    let studio = session();
    let mut outbox = Outbox::default();
    let artifact = export(
        studio.document(),
        Arc::new(DefaultLoader::default()),
        Arc::new(FontBook::empty()),
        studio.config(),
        "Weekend promo",
        &mut outbox,
    )
    .await
    .unwrap();

    assert_eq!((artifact.width, artifact.height), (800, 800));
    assert_eq!(artifact.background, None);
    assert_eq!(outbox.0, vec![(800, 800, "Weekend promo".to_string())]);
}

#[tokio::test]
async fn export_keeps_an_authored_image_pan() {
    let doc: Document =
        serde_json::from_str(include_str!("fixtures/panned.json")).expect("panned fixture parses");
    let mut outbox = Outbox::default();
    let artifact = export(
        &doc,
        Arc::new(DefaultLoader::default()),
        Arc::new(FontBook::empty()),
        &StudioConfig::default(),
        "",
        &mut outbox,
    )
    .await
    .unwrap();

    // The 8x4 picture covers the 100px frame at 200x100, shifted 30px right.
    let pm = decode_image(&artifact.png).unwrap().pixmap;
    let rgb = |x: u32, y: u32| {
        let c = pm.pixel(x, y).unwrap().demultiply();
        (c.red(), c.green(), c.blue())
    };
    assert_eq!(rgb(20, 100), (255, 255, 255));
    assert_eq!(rgb(120, 100), (0x1e, 0x40, 0xaf));
}
