//! The studio engine: single owner of the Layer Model.
//!
//! Input events go through the [`Controller`]; the mutations it returns are
//! applied here in order. Every mutation that actually changes the document
//! bumps the revision and notifies subscribers, which is the renderer's
//! cue to redraw. Rejected or no-op mutations stay silent.

use crate::input::InputEvent;
use crate::interaction::{Controller, InteractionState};
use smallvec::{SmallVec, smallvec};
use std::collections::HashSet;
use studio_core::{
    AspectRatio, Document, EffectId, EffectPatch, EffectType, Guide, LayerId, LayerPatch,
    LayerType, StopPatch, StudioConfig, ZOrder,
};
use studio_render::{PreviewFrame, PreviewState, render_preview};

/// One committed edit of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerMutation {
    Update {
        id: LayerId,
        patch: LayerPatch,
    },
    Remove {
        id: LayerId,
    },
    Reorder {
        id: LayerId,
        to: ZOrder,
    },
    AddGradientStop {
        id: LayerId,
        position: f32,
    },
    RemoveGradientStop {
        id: LayerId,
        index: usize,
    },
    UpdateGradientStop {
        id: LayerId,
        index: usize,
        patch: StopPatch,
    },
    AddEffect {
        id: LayerId,
        ty: EffectType,
    },
    ToggleEffect {
        id: LayerId,
        effect: EffectId,
    },
    UpdateEffect {
        id: LayerId,
        effect: EffectId,
        patch: EffectPatch,
    },
    RemoveEffect {
        id: LayerId,
        effect: EffectId,
    },
}

impl LayerMutation {
    /// The layer this mutation targets.
    pub fn layer(&self) -> LayerId {
        match *self {
            Self::Update { id, .. }
            | Self::Remove { id }
            | Self::Reorder { id, .. }
            | Self::AddGradientStop { id, .. }
            | Self::RemoveGradientStop { id, .. }
            | Self::UpdateGradientStop { id, .. }
            | Self::AddEffect { id, .. }
            | Self::ToggleEffect { id, .. }
            | Self::UpdateEffect { id, .. }
            | Self::RemoveEffect { id, .. } => id,
        }
    }

    fn change_kind(&self) -> ChangeKind {
        match self {
            Self::Remove { .. } => ChangeKind::Removed,
            Self::Reorder { .. } => ChangeKind::Reordered,
            _ => ChangeKind::Updated,
        }
    }

    /// Apply to `doc`. Returns whether anything changed.
    pub fn apply_to(&self, doc: &mut Document) -> bool {
        match self {
            Self::Update { id, patch } => doc.update_layer(*id, patch),
            Self::Remove { id } => doc.remove_layer(*id).is_some(),
            Self::Reorder { id, to } => doc.reorder_layer(*id, *to),
            Self::AddGradientStop { id, position } => doc.add_gradient_stop(*id, *position).is_some(),
            Self::RemoveGradientStop { id, index } => doc.remove_gradient_stop(*id, *index),
            Self::UpdateGradientStop { id, index, patch } => doc.update_gradient_stop(*id, *index, patch),
            Self::AddEffect { id, ty } => doc.add_effect(*id, *ty).is_some(),
            Self::ToggleEffect { id, effect } => doc.toggle_effect(*id, *effect),
            Self::UpdateEffect { id, effect, patch } => doc.update_effect(*id, *effect, patch),
            Self::RemoveEffect { id, effect } => doc.remove_effect(*id, *effect),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
    Reordered,
    /// Background reference or aspect preset.
    Canvas,
    /// Nothing in the document changed, but the view must be rebuilt
    /// (recovery, a failed image).
    Redraw,
}

/// Notification sent to subscribers after a committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    pub revision: u64,
    pub kind: ChangeKind,
    /// Layers touched; empty for canvas-wide changes.
    pub layers: SmallVec<[LayerId; 4]>,
}

pub type Subscriber = Box<dyn FnMut(&ModelChange)>;

pub struct Studio {
    document: Document,
    config: StudioConfig,
    controller: Controller,
    revision: u64,
    /// Image sources whose decode failed, drawn as placeholders.
    broken_images: HashSet<String>,
    subscribers: Vec<Subscriber>,
}

impl Studio {
    pub fn new(document: Document, config: StudioConfig) -> Self {
        Self {
            document,
            config,
            controller: Controller::new(),
            revision: 0,
            broken_images: HashSet::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.controller.selected()
    }

    pub fn guides(&self) -> &[Guide] {
        self.controller.guides()
    }

    /// Number of committed changes so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Feed one input event through the controller and apply the result.
    /// Returns whether the view needs a redraw: the model changed, or the
    /// selection, mode, guides or text draft did.
    pub fn dispatch(&mut self, event: &InputEvent) -> bool {
        let before = ViewKey::of(&self.controller);
        let mutations = self.controller.handle(event, &self.document, &self.config);
        let mut changed = false;
        for m in mutations {
            changed |= self.apply(m);
        }
        changed || ViewKey::of(&self.controller) != before
    }

    /// Apply one mutation. Returns whether the document changed.
    pub fn apply(&mut self, mutation: LayerMutation) -> bool {
        if !mutation.apply_to(&mut self.document) {
            log::trace!("ignored {mutation:?}");
            return false;
        }
        let id = mutation.layer();
        let kind = mutation.change_kind();
        if kind == ChangeKind::Removed {
            self.controller.forget(id);
        }
        self.commit(kind, smallvec![id]);
        true
    }

    // ─── Toolbar & host operations ───────────────────────────────────────

    pub fn add_text(&mut self) -> LayerId {
        self.add_layer(LayerType::Text, &LayerPatch::default())
    }

    pub fn add_rectangle(&mut self) -> LayerId {
        self.add_layer(LayerType::Rectangle, &LayerPatch::default())
    }

    pub fn add_circle(&mut self) -> LayerId {
        self.add_layer(LayerType::Circle, &LayerPatch::default())
    }

    pub fn add_image(&mut self, src: impl Into<String>) -> LayerId {
        let patch = LayerPatch {
            src: Some(src.into()),
            ..Default::default()
        };
        self.add_layer(LayerType::Image, &patch)
    }

    /// Append a layer on top and select it. Any open mode is finished
    /// first, committing a pending text draft.
    pub fn add_layer(&mut self, ty: LayerType, overrides: &LayerPatch) -> LayerId {
        self.finish_interaction();
        let id = self.document.add_layer(ty, overrides);
        self.controller.select(id);
        self.commit(ChangeKind::Added, smallvec![id]);
        id
    }

    /// Remove the selected layer and clear the selection.
    pub fn delete_selected(&mut self) -> bool {
        self.finish_interaction();
        match self.controller.selected() {
            Some(id) => self.apply(LayerMutation::Remove { id }),
            None => false,
        }
    }

    /// New background reference from the host. A new non-empty value is
    /// imported once as a full-canvas layer at the bottom of the stack.
    /// An empty value is ignored; `None` only forgets the reference.
    pub fn set_background(&mut self, src: Option<String>) -> Option<LayerId> {
        match src {
            Some(src) if src.is_empty() => None,
            Some(src) => {
                let changed = self.document.background.as_deref() != Some(src.as_str());
                let imported = self.document.import_background(&src);
                match imported {
                    Some(id) => self.commit(ChangeKind::Added, smallvec![id]),
                    None if changed => self.commit(ChangeKind::Canvas, SmallVec::new()),
                    None => {}
                }
                imported
            }
            None => {
                if self.document.background.take().is_some() {
                    self.commit(ChangeKind::Canvas, SmallVec::new());
                }
                None
            }
        }
    }

    /// Switch the aspect preset under the configured policy.
    pub fn set_aspect(&mut self, aspect: AspectRatio) -> bool {
        if !self.document.set_aspect(aspect, self.config.aspect_policy) {
            return false;
        }
        self.commit(ChangeKind::Canvas, SmallVec::new());
        true
    }

    /// An image finished decoding: record its size on every layer showing
    /// it (centering the picture the first time).
    pub fn image_loaded(&mut self, src: &str, width: f32, height: f32) -> Vec<LayerId> {
        let was_broken = self.broken_images.remove(src);
        let changed = self.document.image_loaded(src, width, height);
        if !changed.is_empty() {
            self.commit(ChangeKind::Updated, changed.iter().copied().collect());
        } else if was_broken {
            self.notify(ChangeKind::Redraw, SmallVec::new());
        }
        changed
    }

    /// An image failed to load: the preview shows a placeholder for it.
    pub fn image_failed(&mut self, src: &str) {
        log::warn!("image {src:?} failed to load");
        if self.broken_images.insert(src.to_string()) {
            self.notify(ChangeKind::Redraw, SmallVec::new());
        }
    }

    /// Recovery action after an unexpected fault: drop all interaction
    /// state and force a redraw.
    pub fn recover(&mut self) {
        log::warn!("recovering: interaction reset from {:?}", self.controller.state());
        self.controller.reset();
        self.notify(ChangeKind::Redraw, SmallVec::new());
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Everything the live preview needs beyond the document.
    pub fn preview_state(&self) -> PreviewState {
        let state = self.controller.state();
        PreviewState {
            selected: state.selected(),
            guides: self.controller.guides().to_vec(),
            panning: match state {
                InteractionState::ImageFramePanning(id) => Some(id),
                _ => None,
            },
            editing_text: match state {
                InteractionState::TextEditing(id) => Some(id),
                _ => None,
            },
            text_draft: self.controller.text_draft().map(str::to_string),
            broken_images: self.broken_images.clone(),
            handle_radius: self.config.handle_radius,
        }
    }

    pub fn render_preview(&self) -> PreviewFrame {
        render_preview(&self.document, &self.preview_state())
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn finish_interaction(&mut self) {
        for m in self.controller.finish(&self.document) {
            self.apply(m);
        }
    }

    fn commit(&mut self, kind: ChangeKind, layers: SmallVec<[LayerId; 4]>) {
        self.revision += 1;
        self.notify(kind, layers);
    }

    fn notify(&mut self, kind: ChangeKind, layers: SmallVec<[LayerId; 4]>) {
        let change = ModelChange {
            revision: self.revision,
            kind,
            layers,
        };
        log::debug!("model change r{} {:?} {:?}", change.revision, change.kind, change.layers);
        for subscriber in &mut self.subscribers {
            subscriber(&change);
        }
    }
}

/// The controller state a redraw depends on.
#[derive(PartialEq)]
struct ViewKey {
    state: InteractionState,
    guides: Vec<Guide>,
    draft: Option<String>,
    stop: Option<usize>,
}

impl ViewKey {
    fn of(controller: &Controller) -> Self {
        Self {
            state: controller.state(),
            guides: controller.guides().to_vec(),
            draft: controller.text_draft().map(str::to_string),
            stop: controller.selected_stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(studio: &mut Studio) -> Rc<RefCell<Vec<ModelChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        studio.subscribe(Box::new(move |c: &ModelChange| sink.borrow_mut().push(c.clone())));
        log
    }

    #[test]
    fn delete_selected_middle_layer() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let a = studio.add_rectangle();
        let b = studio.add_circle();
        let c = studio.add_text();

        studio.controller.select(b);
        assert!(studio.delete_selected());
        assert_eq!(studio.document().layer_ids(), vec![a, c]);
        assert_eq!(studio.selected(), None);
        assert!(!studio.delete_selected());
    }

    #[test]
    fn add_selects_and_notifies() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let log = recording(&mut studio);
        let id = studio.add_text();
        assert_eq!(studio.selected(), Some(id));
        assert_eq!(studio.revision(), 1);
        assert_eq!(
            log.borrow().as_slice(),
            &[ModelChange {
                revision: 1,
                kind: ChangeKind::Added,
                layers: smallvec![id],
            }]
        );
    }

    #[test]
    fn no_op_mutations_stay_silent() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let id = studio.add_rectangle();
        let log = recording(&mut studio);

        assert!(!studio.apply(LayerMutation::Update {
            id,
            patch: LayerPatch::default(),
        }));
        assert!(!studio.apply(LayerMutation::Reorder { id, to: ZOrder::Front }));
        assert!(!studio.apply(LayerMutation::RemoveGradientStop { id, index: 0 }));
        assert!(log.borrow().is_empty());
        assert_eq!(studio.revision(), 1);

        assert!(studio.apply(LayerMutation::Update {
            id,
            patch: LayerPatch::position(10.0, 10.0),
        }));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].kind, ChangeKind::Updated);
    }

    #[test]
    fn dispatch_reports_view_changes() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let id = studio.add_rectangle();
        studio.controller.reset();

        assert!(studio.dispatch(&InputEvent::pointer_down(200.0, 200.0)));
        assert_eq!(studio.selected(), Some(id));
        // Same spot again: nothing to redraw.
        assert!(!studio.dispatch(&InputEvent::pointer_up(200.0, 200.0)));
        assert!(studio.dispatch(&InputEvent::key("Escape")));
        assert_eq!(studio.selected(), None);
    }

    #[test]
    fn background_imports_once_per_value() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let top = studio.add_text();
        let log = recording(&mut studio);

        let bg = studio.set_background(Some("hero.png".into())).unwrap();
        assert_eq!(studio.document().layer_ids(), vec![bg, top]);
        assert_eq!(studio.set_background(Some("hero.png".into())), None);
        assert_eq!(studio.set_background(Some(String::new())), None);
        assert_eq!(log.borrow().len(), 1);

        // A deleted background is not re-imported for the same value.
        studio.controller.select(bg);
        studio.delete_selected();
        assert_eq!(studio.set_background(Some("hero.png".into())), None);
        assert_eq!(studio.document().layer_ids(), vec![top]);

        assert_eq!(studio.set_background(None), None);
        assert_eq!(studio.document().background, None);
        assert_eq!(log.borrow().last().unwrap().kind, ChangeKind::Canvas);
    }

    #[test]
    fn image_lifecycle_feeds_preview_state() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let id = studio.add_image("pic.png");
        studio.image_failed("pic.png");
        assert!(studio.preview_state().broken_images.contains("pic.png"));

        assert_eq!(studio.image_loaded("pic.png", 300.0, 150.0), vec![id]);
        assert!(studio.preview_state().broken_images.is_empty());
        let img = studio.document().layer(id).unwrap().image().unwrap().clone();
        assert_eq!((img.original_width, img.original_height), (300.0, 150.0));
    }

    #[test]
    fn text_draft_shows_in_preview_until_commit() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let id = studio.add_text();
        studio.dispatch(&InputEvent::DoubleClick { x: 150.0, y: 175.0 });
        studio.dispatch(&InputEvent::TextInput("Big\nSale".into()));
        let state = studio.preview_state();
        assert_eq!(state.editing_text, Some(id));
        assert_eq!(state.text_draft.as_deref(), Some("Big\nSale"));
        assert_eq!(studio.document().layer(id).unwrap().text().unwrap().text, "Text");

        // Adding another layer commits the draft first.
        studio.add_rectangle();
        assert_eq!(studio.document().layer(id).unwrap().text().unwrap().text, "Big\nSale");
    }

    #[test]
    fn recover_resets_and_redraws() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        studio.add_rectangle();
        studio.dispatch(&InputEvent::pointer_down(200.0, 200.0));
        studio.dispatch(&InputEvent::pointer_move(220.0, 200.0));
        let log = recording(&mut studio);

        studio.recover();
        assert_eq!(studio.state(), InteractionState::Idle);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].kind, ChangeKind::Redraw);
    }

    #[test]
    fn aspect_change_notifies_canvas() {
        let mut studio = Studio::new(Document::default(), StudioConfig::default());
        let log = recording(&mut studio);
        assert!(!studio.set_aspect(AspectRatio::Square));
        assert!(studio.set_aspect(AspectRatio::Story));
        assert_eq!(studio.document().canvas_size(), (360.0, 640.0));
        assert_eq!(log.borrow()[0].kind, ChangeKind::Canvas);
    }
}
