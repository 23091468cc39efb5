//! Live preview: the document as positioned, CSS-styled boxes.
//!
//! Each layer becomes one [`PreviewElement`] in z-order with its
//! declarations in a fixed order, so a host can write them straight into a
//! DOM or a test can compare them. Editor chrome (guides, handles, crop
//! frame) comes back separately as [`Overlay`]s drawn above every layer.

use crate::hit::handle_position;
use std::collections::HashSet;
use studio_core::effects::{css_box_shadow, css_filter, css_text_shadow};
use studio_core::paint::resolve_color;
use studio_core::{
    Bounds, Color, Document, Guide, Handle, Layer, LayerId, LayerKind, MIN_LAYER_SIZE, TextAlign,
    fmt_num, to_css_gradient,
};

/// Editor state the preview needs beyond the document.
#[derive(Debug, Clone)]
pub struct PreviewState {
    pub selected: Option<LayerId>,
    pub guides: Vec<Guide>,
    /// Image layer whose picture is being panned: drawn unclipped with a
    /// crop frame overlay.
    pub panning: Option<LayerId>,
    pub editing_text: Option<LayerId>,
    /// Uncommitted text of the layer in `editing_text`.
    pub text_draft: Option<String>,
    /// Image sources known to have failed decoding.
    pub broken_images: HashSet<String>,
    pub handle_radius: f32,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            selected: None,
            guides: Vec::new(),
            panning: None,
            editing_text: None,
            text_draft: None,
            broken_images: HashSet::new(),
            handle_radius: 6.0,
        }
    }
}

pub type Declarations = Vec<(&'static str, String)>;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewContent {
    Empty,
    Text {
        lines: Vec<String>,
        /// Declarations of the inner glyph span: a solid color, or a
        /// frame-sized box whose gradient is clipped to the glyphs.
        fill: Declarations,
        editing: bool,
    },
    Image {
        src: String,
        /// Placement of the picture relative to the frame.
        style: Declarations,
    },
    BrokenImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewElement {
    pub id: LayerId,
    pub z_index: usize,
    pub style: Declarations,
    pub content: PreviewContent,
}

impl PreviewElement {
    pub fn get(&self, property: &str) -> Option<&str> {
        lookup(&self.style, property)
    }

    /// Inline `style` attribute text.
    pub fn css(&self) -> String {
        to_inline_css(&self.style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Guide(Guide),
    SelectionBox { id: LayerId, bounds: Bounds },
    Handle { handle: Handle, x: f32, y: f32, size: f32 },
    /// Frame boundary over an unclipped image while panning.
    CropFrame { frame: Bounds, image: Bounds },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<PreviewElement>,
    pub overlays: Vec<Overlay>,
}

impl PreviewFrame {
    pub fn element(&self, id: LayerId) -> Option<&PreviewElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

pub fn lookup<'a>(decls: &'a Declarations, property: &str) -> Option<&'a str> {
    decls
        .iter()
        .find(|(k, _)| *k == property)
        .map(|(_, v)| v.as_str())
}

pub fn to_inline_css(decls: &Declarations) -> String {
    decls
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn px(v: f32) -> String {
    format!("{}px", fmt_num(v))
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Build the preview for the current document and editor state.
pub fn render_preview(doc: &Document, state: &PreviewState) -> PreviewFrame {
    let (width, height) = doc.canvas_size();
    let elements = doc
        .layers
        .iter()
        .enumerate()
        .map(|(z, layer)| {
            log::trace!("preview {}", layer.id);
            if layer.bounds().is_finite() {
                layer_element(layer, z, state)
            } else {
                log::warn!("layer {} has non-finite geometry, drawing fallback", layer.id);
                fallback_element(layer, z)
            }
        })
        .collect();

    PreviewFrame {
        width,
        height,
        elements,
        overlays: overlays(doc, state),
    }
}

// ─── Elements ─────────────────────────────────────────────────────────────

fn frame_declarations(layer: &Layer, z: usize) -> Declarations {
    vec![
        ("position", "absolute".to_string()),
        ("left", px(layer.x)),
        ("top", px(layer.y)),
        ("width", px(layer.width)),
        ("height", px(layer.height)),
        ("z-index", z.to_string()),
        ("opacity", fmt_num(layer.style.opacity.clamp(0.0, 1.0))),
        ("box-sizing", "border-box".to_string()),
    ]
}

fn background_value(layer: &Layer) -> String {
    if layer.style.is_gradient {
        to_css_gradient(&layer.style)
    } else {
        resolve_color(&layer.style.color, Color::NEUTRAL_GRAY).to_hex()
    }
}

fn radius_value(layer: &Layer) -> Option<String> {
    match layer.kind {
        LayerKind::Circle(_) => Some("50%".to_string()),
        _ if layer.style.border_radius > 0.0 => Some(px(layer.corner_radius())),
        _ => None,
    }
}

fn skew_value(layer: &Layer) -> Option<String> {
    let skew = layer.skew();
    (!skew.is_identity()).then(|| format!("skew({}deg, {}deg)", fmt_num(skew.x), fmt_num(skew.y)))
}

fn layer_element(layer: &Layer, z: usize, state: &PreviewState) -> PreviewElement {
    let mut style = frame_declarations(layer, z);
    if let Some(r) = radius_value(layer) {
        style.push(("border-radius", r));
    }

    let content = match &layer.kind {
        LayerKind::Rectangle(shape) | LayerKind::Circle(shape) => {
            style.push(("background", background_value(layer)));
            if shape.stroke_width > 0.0 {
                let stroke = resolve_color(&shape.stroke_color, Color::NEUTRAL_GRAY);
                style.push((
                    "border",
                    format!("{} solid {}", px(shape.stroke_width), stroke.to_hex()),
                ));
            }
            if let Some(shadow) = css_box_shadow(&layer.style.effects) {
                style.push(("box-shadow", shadow));
            }
            PreviewContent::Empty
        }
        LayerKind::Text(text) => {
            let justify = match text.text_align {
                TextAlign::Left => "flex-start",
                TextAlign::Center => "center",
                TextAlign::Right => "flex-end",
            };
            let align = match text.text_align {
                TextAlign::Left => "left",
                TextAlign::Center => "center",
                TextAlign::Right => "right",
            };
            style.extend([
                ("display", "flex".to_string()),
                ("align-items", "center".to_string()),
                ("justify-content", justify.to_string()),
                ("text-align", align.to_string()),
                ("padding", "0 10px".to_string()),
                ("white-space", "pre".to_string()),
                ("font-family", text.font_family.clone()),
                ("font-size", px(text.font_size)),
                ("font-weight", text.font_weight.to_string()),
                ("letter-spacing", px(text.letter_spacing)),
                ("line-height", fmt_num(text.line_height)),
            ]);
            if let Some(bg) = &text.background {
                style.push(("background", resolve_color(bg, Color::NEUTRAL_GRAY).to_css_rgba()));
            }
            if let Some(shadow) = css_text_shadow(&layer.style.effects) {
                style.push(("text-shadow", shadow));
            }

            // A gradient span stretches over the whole frame so the
            // gradient box matches the exported glyph fill.
            let fill = if layer.style.is_gradient {
                vec![
                    ("position", "absolute".to_string()),
                    ("inset", "0".to_string()),
                    ("display", "flex".to_string()),
                    ("align-items", "center".to_string()),
                    ("justify-content", justify.to_string()),
                    ("padding", "0 10px".to_string()),
                    ("box-sizing", "border-box".to_string()),
                    ("background-image", to_css_gradient(&layer.style)),
                    ("-webkit-background-clip", "text".to_string()),
                    ("background-clip", "text".to_string()),
                    ("color", "transparent".to_string()),
                ]
            } else {
                vec![(
                    "color",
                    resolve_color(&layer.style.color, Color::NEUTRAL_GRAY).to_hex(),
                )]
            };
            let editing = state.editing_text == Some(layer.id);
            let lines = match (&state.text_draft, editing) {
                (Some(draft), true) => draft.split('\n').map(str::to_string).collect(),
                _ => text.lines().map(str::to_string).collect(),
            };
            PreviewContent::Text { lines, fill, editing }
        }
        LayerKind::Image(img) => {
            let panning = state.panning == Some(layer.id);
            style.push(("overflow", if panning { "visible" } else { "hidden" }.to_string()));
            if state.broken_images.contains(&img.src) || img.src.is_empty() {
                style.push(("background", "#E5E7EB".to_string()));
                PreviewContent::BrokenImage
            } else {
                let placed = img.placement(Bounds::new(0.0, 0.0, layer.width, layer.height), None);
                PreviewContent::Image {
                    src: img.src.clone(),
                    style: vec![
                        ("position", "absolute".to_string()),
                        ("left", px(placed.x)),
                        ("top", px(placed.y)),
                        ("width", px(placed.width)),
                        ("height", px(placed.height)),
                        ("max-width", "none".to_string()),
                    ],
                }
            }
        }
    };

    if let Some(filter) = css_filter(&layer.style.effects) {
        style.push(("filter", filter));
    }
    if let Some(skew) = skew_value(layer) {
        style.push(("transform", skew));
        style.push(("transform-origin", "center".to_string()));
    }

    PreviewElement {
        id: layer.id,
        z_index: z,
        style,
        content,
    }
}

/// Gray box for a layer whose geometry cannot be placed.
fn fallback_element(layer: &Layer, z: usize) -> PreviewElement {
    let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
    PreviewElement {
        id: layer.id,
        z_index: z,
        style: vec![
            ("position", "absolute".to_string()),
            ("left", px(finite_or(layer.x, 0.0))),
            ("top", px(finite_or(layer.y, 0.0))),
            ("width", px(finite_or(layer.width, MIN_LAYER_SIZE))),
            ("height", px(finite_or(layer.height, MIN_LAYER_SIZE))),
            ("z-index", z.to_string()),
            ("background", Color::NEUTRAL_GRAY.to_hex()),
        ],
        content: PreviewContent::Empty,
    }
}

// ─── Overlays ─────────────────────────────────────────────────────────────

fn overlays(doc: &Document, state: &PreviewState) -> Vec<Overlay> {
    let mut out: Vec<Overlay> = state.guides.iter().copied().map(Overlay::Guide).collect();

    let Some(layer) = state.selected.and_then(|id| doc.layer(id)) else {
        return out;
    };
    let bounds = layer.bounds();
    if !bounds.is_finite() {
        return out;
    }

    if state.panning == Some(layer.id) {
        if let Some(img) = layer.image() {
            out.push(Overlay::CropFrame {
                frame: bounds,
                image: img.placement(bounds, None),
            });
        }
        return out;
    }

    out.push(Overlay::SelectionBox {
        id: layer.id,
        bounds,
    });
    if state.editing_text != Some(layer.id) {
        let size = state.handle_radius * 2.0;
        out.extend(Handle::ALL.into_iter().map(|handle| {
            let (x, y) = handle_position(bounds, handle);
            Overlay::Handle { handle, x, y, size }
        }));
    }
    out
}
