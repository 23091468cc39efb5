//! Interaction controller: the editor's state machine.
//!
//! The controller translates input events into `LayerMutation`s that the
//! [`Studio`](crate::studio::Studio) applies. It only ever reads the
//! document snapshot handed to `handle`, so snapping for an event always
//! sees the model as it stood before that event.
//!
//! | State | Entered by | Left by |
//! |-------|------------|---------|
//! | `Selected` | pointer-down on a layer | pointer-down on empty canvas, Escape |
//! | `Dragging` | moving with the button held | pointer-up, Escape/Enter, blur |
//! | `Resizing` | pointer-down on a handle | pointer-up, Escape/Enter, blur |
//! | `BackgroundPanning` | dragging the background layer | pointer-up, Escape/Enter, blur |
//! | `GradientStopDragging` | pointer-down on a stop handle | bar pointer-up, Escape/Enter |
//! | `ImageFramePanning` | double-click on an image | double-click, Escape/Enter, click outside |
//! | `FreeTransforming` | double-click on a shape | double-click, Escape/Enter, click outside |
//! | `TextEditing` | double-click on text | Escape, blur, click outside |

use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::studio::LayerMutation;
use studio_core::gradient::insertion_index;
use studio_core::{
    Bounds, Document, GradientStop, Guide, Handle, Layer, LayerId, LayerKind, LayerPatch,
    SnapContext, StopPatch, StudioConfig, ZOrder, compute_move_snap, compute_resize_snap,
};
use studio_render::hit::{hit_handle, hit_test, layer_contains};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Selected(LayerId),
    Dragging(LayerId),
    Resizing { id: LayerId, handle: Handle },
    GradientStopDragging { id: LayerId, stop: usize },
    ImageFramePanning(LayerId),
    BackgroundPanning(LayerId),
    FreeTransforming(LayerId),
    TextEditing(LayerId),
}

impl InteractionState {
    /// The selected layer. Every state but `Idle` has one.
    pub fn selected(&self) -> Option<LayerId> {
        match *self {
            Self::Idle => None,
            Self::Selected(id)
            | Self::Dragging(id)
            | Self::Resizing { id, .. }
            | Self::GradientStopDragging { id, .. }
            | Self::ImageFramePanning(id)
            | Self::BackgroundPanning(id)
            | Self::FreeTransforming(id)
            | Self::TextEditing(id) => Some(id),
        }
    }

    /// A pointer gesture that ends on release.
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            Self::Dragging(_)
                | Self::Resizing { .. }
                | Self::BackgroundPanning(_)
                | Self::GradientStopDragging { .. }
        )
    }
}

// ─── Gradient bar ────────────────────────────────────────────────────────

/// Geometry of the inspector's gradient bar. Handle positions come from
/// stop positions, never from the rendered widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientBar {
    /// Bar width in pixels; position 0 is x = 0, position 100 is x = width.
    pub width: f32,
    pub handle_radius: f32,
}

impl GradientBar {
    pub fn new(width: f32, handle_radius: f32) -> Self {
        Self {
            width,
            handle_radius,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.gradient_bar_width, config.handle_radius)
    }

    /// Bar x of a stop at `position` (0..100).
    pub fn stop_x(&self, position: f32) -> f32 {
        position.clamp(0.0, 100.0) / 100.0 * self.width
    }

    /// Stop position (0..100) under bar x.
    pub fn position_at(&self, x: f32) -> f32 {
        if !(self.width > 0.0) || !x.is_finite() {
            return 0.0;
        }
        (x / self.width * 100.0).clamp(0.0, 100.0)
    }

    /// Index of the stop handle under `x`. The nearest handle wins; on a
    /// tie the later stop (drawn on top) does.
    pub fn hit_stop(&self, stops: &[GradientStop], x: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, stop) in stops.iter().enumerate() {
            if !stop.position.is_finite() {
                continue;
            }
            let d = (self.stop_x(stop.position) - x).abs();
            if d <= self.handle_radius && best.is_none_or(|(_, bd)| d <= bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

// ─── Controller ──────────────────────────────────────────────────────────

/// Pointer origin and the layer geometry captured at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragStart {
    pointer: (f32, f32),
    bounds: Bounds,
    /// Image pan offsets, for panning gestures.
    img: (f32, f32),
}

impl DragStart {
    fn capture(layer: &Layer, x: f32, y: f32) -> Self {
        Self {
            pointer: (x, y),
            bounds: layer.bounds(),
            img: layer.image().map_or((0.0, 0.0), |i| (i.img_x, i.img_y)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: InteractionState,
    /// Set between pointer-down and pointer-up when a gesture may start.
    drag: Option<DragStart>,
    guides: Vec<Guide>,
    /// Uncommitted text while `TextEditing`.
    text_draft: Option<String>,
    /// Stop highlighted in the gradient bar.
    selected_stop: Option<usize>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
            drag: None,
            guides: Vec::new(),
            text_draft: None,
            selected_stop: None,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.state.selected()
    }

    /// Alignment guides of the gesture in progress.
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    pub fn text_draft(&self) -> Option<&str> {
        self.text_draft.as_deref()
    }

    pub fn selected_stop(&self) -> Option<usize> {
        self.selected_stop
    }

    /// Select `id` outright, abandoning any mode (used by toolbar actions
    /// that create a layer).
    pub fn select(&mut self, id: LayerId) {
        self.clear_transient();
        self.set_state(InteractionState::Selected(id));
    }

    /// Drop everything back to `Idle`.
    pub fn reset(&mut self) {
        self.clear_transient();
        self.set_state(InteractionState::Idle);
    }

    /// The layer `id` left the document: any state referencing it ends.
    pub fn forget(&mut self, id: LayerId) {
        if self.state.selected() == Some(id) {
            self.reset();
        }
    }

    /// Commit a pending text draft and leave any mode, keeping the
    /// selection.
    pub fn finish(&mut self, doc: &Document) -> Vec<LayerMutation> {
        let out = self.commit_text(doc);
        if let Some(id) = self.state.selected() {
            self.clear_transient();
            self.set_state(InteractionState::Selected(id));
        }
        out
    }

    /// Handle an input event against the current document snapshot,
    /// returning the mutations to apply in order.
    pub fn handle(&mut self, event: &InputEvent, doc: &Document, config: &StudioConfig) -> Vec<LayerMutation> {
        if let Some(id) = self.state.selected() {
            if doc.layer(id).is_none() {
                self.reset();
            }
        }

        match event {
            InputEvent::PointerDown { x, y, .. } => self.pointer_down(*x, *y, doc, config),
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(*x, *y, doc, config),
            InputEvent::PointerUp { .. } => {
                self.pointer_up();
                vec![]
            }
            InputEvent::DoubleClick { x, y } => self.double_click(*x, *y, doc),
            InputEvent::Key { key, modifiers } => {
                let action = if matches!(self.state, InteractionState::TextEditing(_)) {
                    ShortcutMap::resolve_in_text(key, modifiers)
                } else {
                    ShortcutMap::resolve(key, modifiers)
                };
                match action {
                    Some(action) => self.action(action, doc),
                    None => vec![],
                }
            }
            InputEvent::Action(action) => self.action(*action, doc),
            InputEvent::Blur => self.blur(doc),
            InputEvent::TextInput(text) => {
                if matches!(self.state, InteractionState::TextEditing(_)) {
                    self.text_draft = Some(text.clone());
                }
                vec![]
            }
            InputEvent::GradientBarDown { x } => self.gradient_down(*x, doc, config),
            InputEvent::GradientBarMove { x } => self.gradient_move(*x, config),
            InputEvent::GradientBarUp => {
                if let InteractionState::GradientStopDragging { id, .. } = self.state {
                    self.set_state(InteractionState::Selected(id));
                }
                vec![]
            }
            InputEvent::GradientBarDoubleClick { x } => self.gradient_double_click(*x, doc, config),
            InputEvent::ImageScale(scale) => match self.state {
                InteractionState::ImageFramePanning(id) => vec![LayerMutation::Update {
                    id,
                    patch: LayerPatch {
                        img_scale: Some(*scale),
                        ..Default::default()
                    },
                }],
                _ => vec![],
            },
            InputEvent::Skew { x, y } => match self.state {
                InteractionState::FreeTransforming(id) => vec![LayerMutation::Update {
                    id,
                    patch: LayerPatch {
                        skew_x: Some(*x),
                        skew_y: Some(*y),
                        ..Default::default()
                    },
                }],
                _ => vec![],
            },
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down(&mut self, x: f32, y: f32, doc: &Document, config: &StudioConfig) -> Vec<LayerMutation> {
        let mut out = Vec::new();
        self.drag = None;
        self.guides.clear();

        // Modes keep clicks inside their own layer.
        match self.state {
            InteractionState::TextEditing(id) => {
                if doc.layer(id).is_some_and(|l| layer_contains(l, x, y)) {
                    return out;
                }
                out.extend(self.commit_text(doc));
            }
            InteractionState::ImageFramePanning(id) => {
                if let Some(layer) = doc.layer(id) {
                    if panning_area(layer).contains(x, y) {
                        self.drag = Some(DragStart::capture(layer, x, y));
                        return out;
                    }
                }
            }
            InteractionState::FreeTransforming(id) => {
                if let Some(layer) = doc.layer(id) {
                    if hit_handle(layer, x, y, config.handle_radius).is_none()
                        && layer_contains(layer, x, y)
                    {
                        return out;
                    }
                }
            }
            _ => {}
        }

        // Handles of the current selection sit above every layer body.
        if let Some(layer) = self.state.selected().and_then(|id| doc.layer(id)) {
            if let Some(handle) = hit_handle(layer, x, y, config.handle_radius) {
                self.drag = Some(DragStart::capture(layer, x, y));
                self.set_state(InteractionState::Resizing {
                    id: layer.id,
                    handle,
                });
                return out;
            }
        }

        match hit_test(doc, x, y).and_then(|id| doc.layer(id)) {
            Some(layer) => {
                if self.state.selected() != Some(layer.id) {
                    self.selected_stop = None;
                }
                self.drag = Some(DragStart::capture(layer, x, y));
                self.set_state(InteractionState::Selected(layer.id));
            }
            None => {
                self.selected_stop = None;
                self.set_state(InteractionState::Idle);
            }
        }
        out
    }

    fn pointer_move(&mut self, x: f32, y: f32, doc: &Document, config: &StudioConfig) -> Vec<LayerMutation> {
        let Some(start) = self.drag else {
            return vec![];
        };
        let (dx, dy) = (x - start.pointer.0, y - start.pointer.1);

        if let InteractionState::Selected(id) = self.state {
            let background = doc.layer(id).is_some_and(Layer::is_background);
            self.set_state(if background {
                InteractionState::BackgroundPanning(id)
            } else {
                InteractionState::Dragging(id)
            });
        }

        match self.state {
            InteractionState::Dragging(id) => {
                let ctx = SnapContext::capture(doc, id, config);
                let b = start.bounds;
                let snap = compute_move_snap(&ctx, b.x + dx, b.y + dy, b.width, b.height);
                self.guides = snap.guides;
                vec![LayerMutation::Update {
                    id,
                    patch: LayerPatch::position(snap.x, snap.y),
                }]
            }
            InteractionState::Resizing { id, handle } => {
                let ctx = SnapContext::capture(doc, id, config);
                let p = handle.drag(start.bounds, dx, dy);
                let snap = compute_resize_snap(&ctx, p.x, p.y, p.width, p.height, handle);
                self.guides = snap.guides;
                vec![LayerMutation::Update {
                    id,
                    patch: LayerPatch::frame(snap.x, snap.y, snap.width, snap.height),
                }]
            }
            InteractionState::BackgroundPanning(id) | InteractionState::ImageFramePanning(id) => {
                vec![LayerMutation::Update {
                    id,
                    patch: LayerPatch {
                        img_x: Some(start.img.0 + dx),
                        img_y: Some(start.img.1 + dy),
                        ..Default::default()
                    },
                }]
            }
            _ => vec![],
        }
    }

    fn pointer_up(&mut self) {
        self.drag = None;
        self.guides.clear();
        match self.state {
            InteractionState::Dragging(id)
            | InteractionState::Resizing { id, .. }
            | InteractionState::BackgroundPanning(id) => {
                self.set_state(InteractionState::Selected(id));
            }
            _ => {}
        }
    }

    fn double_click(&mut self, x: f32, y: f32, doc: &Document) -> Vec<LayerMutation> {
        let Some(layer) = hit_test(doc, x, y).and_then(|id| doc.layer(id)) else {
            return vec![];
        };
        let id = layer.id;
        self.drag = None;
        self.guides.clear();

        // Double-clicking the layer whose mode is active toggles it off
        // (text keeps editing: the editor selects a word instead).
        match self.state {
            InteractionState::TextEditing(cur) if cur == id => return vec![],
            InteractionState::ImageFramePanning(cur) | InteractionState::FreeTransforming(cur)
                if cur == id =>
            {
                self.set_state(InteractionState::Selected(id));
                return vec![];
            }
            _ => {}
        }

        let out = self.commit_text(doc);
        let next = match &layer.kind {
            LayerKind::Text(text) => {
                self.text_draft = Some(text.text.clone());
                InteractionState::TextEditing(id)
            }
            LayerKind::Image(_) => InteractionState::ImageFramePanning(id),
            LayerKind::Rectangle(_) | LayerKind::Circle(_) => InteractionState::FreeTransforming(id),
        };
        self.set_state(next);
        out
    }

    // ─── Keys & actions ──────────────────────────────────────────────────

    fn action(&mut self, action: ShortcutAction, doc: &Document) -> Vec<LayerMutation> {
        match action {
            ShortcutAction::Cancel | ShortcutAction::Commit => match self.state {
                InteractionState::Idle => vec![],
                InteractionState::TextEditing(_) => self.commit_text(doc),
                InteractionState::Selected(_) => {
                    if action == ShortcutAction::Cancel {
                        self.reset();
                    }
                    vec![]
                }
                // Keys win over in-flight drags and leave every mode.
                other => {
                    self.clear_transient();
                    if let Some(id) = other.selected() {
                        self.set_state(InteractionState::Selected(id));
                    }
                    vec![]
                }
            },
            ShortcutAction::Delete => match self.state {
                InteractionState::Selected(id) => {
                    self.reset();
                    vec![LayerMutation::Remove { id }]
                }
                _ => vec![],
            },
            ShortcutAction::BringForward => self.reorder(ZOrder::Forward),
            ShortcutAction::SendBackward => self.reorder(ZOrder::Backward),
            ShortcutAction::BringToFront => self.reorder(ZOrder::Front),
            ShortcutAction::SendToBack => self.reorder(ZOrder::Back),
        }
    }

    fn reorder(&mut self, to: ZOrder) -> Vec<LayerMutation> {
        if self.state.is_gesture() || matches!(self.state, InteractionState::TextEditing(_)) {
            return vec![];
        }
        match self.state.selected() {
            Some(id) => vec![LayerMutation::Reorder { id, to }],
            None => vec![],
        }
    }

    fn blur(&mut self, doc: &Document) -> Vec<LayerMutation> {
        match self.state {
            InteractionState::TextEditing(_) => self.commit_text(doc),
            state if state.is_gesture() => {
                self.clear_transient();
                if let Some(id) = state.selected() {
                    self.set_state(InteractionState::Selected(id));
                }
                vec![]
            }
            _ => vec![],
        }
    }

    /// Leave `TextEditing`, emitting the draft if it differs from the
    /// stored text.
    fn commit_text(&mut self, doc: &Document) -> Vec<LayerMutation> {
        let InteractionState::TextEditing(id) = self.state else {
            return vec![];
        };
        self.set_state(InteractionState::Selected(id));
        let Some(draft) = self.text_draft.take() else {
            return vec![];
        };
        match doc.layer(id).and_then(Layer::text) {
            Some(current) if current.text != draft => vec![LayerMutation::Update {
                id,
                patch: LayerPatch {
                    text: Some(draft),
                    ..Default::default()
                },
            }],
            _ => vec![],
        }
    }

    // ─── Gradient bar ────────────────────────────────────────────────────

    fn gradient_down(&mut self, x: f32, doc: &Document, config: &StudioConfig) -> Vec<LayerMutation> {
        let Some(layer) = self.gradient_layer(doc) else {
            return vec![];
        };
        let id = layer.id;
        let stops = &layer.style.gradient_stops;
        let bar = GradientBar::from_config(config);
        let mut out = self.commit_text(doc);
        self.clear_transient();

        match bar.hit_stop(stops, x) {
            Some(stop) => {
                self.selected_stop = Some(stop);
                self.set_state(InteractionState::GradientStopDragging { id, stop });
            }
            None => {
                let position = bar.position_at(x);
                self.selected_stop = Some(insertion_index(stops, position));
                self.set_state(InteractionState::Selected(id));
                out.push(LayerMutation::AddGradientStop { id, position });
            }
        }
        out
    }

    fn gradient_move(&mut self, x: f32, config: &StudioConfig) -> Vec<LayerMutation> {
        let InteractionState::GradientStopDragging { id, stop } = self.state else {
            return vec![];
        };
        let position = GradientBar::from_config(config).position_at(x);
        vec![LayerMutation::UpdateGradientStop {
            id,
            index: stop,
            patch: StopPatch {
                position: Some(position),
                ..Default::default()
            },
        }]
    }

    fn gradient_double_click(&mut self, x: f32, doc: &Document, config: &StudioConfig) -> Vec<LayerMutation> {
        let Some(layer) = self.gradient_layer(doc) else {
            return vec![];
        };
        let id = layer.id;
        if let InteractionState::GradientStopDragging { .. } = self.state {
            self.set_state(InteractionState::Selected(id));
        }
        match GradientBar::from_config(config).hit_stop(&layer.style.gradient_stops, x) {
            Some(index) => {
                self.selected_stop = None;
                vec![LayerMutation::RemoveGradientStop { id, index }]
            }
            None => vec![],
        }
    }

    /// The selected layer, when it has a gradient fill to edit.
    fn gradient_layer<'d>(&self, doc: &'d Document) -> Option<&'d Layer> {
        self.state
            .selected()
            .and_then(|id| doc.layer(id))
            .filter(|l| l.style.is_gradient)
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn set_state(&mut self, next: InteractionState) {
        if next != self.state {
            log::debug!("interaction {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn clear_transient(&mut self) {
        self.drag = None;
        self.guides.clear();
        self.text_draft = None;
    }
}

/// Where a pointer-down keeps panning an image: its frame plus the
/// unclipped picture shown while panning.
fn panning_area(layer: &Layer) -> Bounds {
    let frame = layer.bounds();
    let Some(img) = layer.image() else {
        return frame;
    };
    let pic = img.placement(frame, None);
    let left = frame.left().min(pic.left());
    let top = frame.top().min(pic.top());
    Bounds::new(
        left,
        top,
        frame.right().max(pic.right()) - left,
        frame.bottom().max(pic.bottom()) - top,
    )
}
