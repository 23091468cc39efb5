//! Core layer model for Studio documents.
//!
//! A document is a flat, ordered stack of layers: index 0 is painted first
//! (bottom), the last layer is painted on top. Every layer shares a common
//! base (geometry, opacity, fill, effects) and carries kind-specific fields
//! in [`LayerKind`]. The document is the single source of truth; renderers
//! only read it.

use crate::config::AspectPolicy;
use crate::effects::{self, Effect, EffectPatch, EffectType};
use crate::gradient::{self, StopPatch, default_stops};
use crate::id::{EffectId, LayerId};
use serde::{Deserialize, Serialize};

/// Layers never shrink below this many canvas pixels on either axis.
pub const MIN_LAYER_SIZE: f32 = 20.0;
/// Lower bound for the zoom factor of an image inside its frame.
pub const MIN_IMAGE_SCALE: f32 = 0.1;
/// Skew angles are limited to this many degrees on each axis.
pub const MAX_SKEW: f32 = 45.0;
/// Logical width every aspect preset's export scale is derived from.
pub const BASE_CANVAS_WIDTH: f32 = 400.0;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex_byte(out: &mut String, v: u8) {
    out.push(HEX_CHARS[(v >> 4) as usize] as char);
    out.push(HEX_CHARS[(v & 0xF) as usize] as char);
}

fn channel_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Color {
    /// Fallback fill for style data that cannot be resolved (`#9CA3AF`).
    pub const NEUTRAL_GRAY: Color = Color::rgba(156.0 / 255.0, 163.0 / 255.0, 175.0 / 255.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 | 4 => {
                let mut ch = [15u8; 4];
                for (i, b) in bytes.iter().enumerate() {
                    ch[i] = hex_val(*b)?;
                }
                Some(Self::rgba(
                    (ch[0] * 17) as f32 / 255.0,
                    (ch[1] * 17) as f32 / 255.0,
                    (ch[2] * 17) as f32 / 255.0,
                    (ch[3] * 17) as f32 / 255.0,
                ))
            }
            6 | 8 => {
                let mut ch = [255u8; 4];
                for (i, pair) in bytes.chunks(2).enumerate() {
                    ch[i] = hex_val(pair[0])? << 4 | hex_val(pair[1])?;
                }
                Some(Self::rgba(
                    ch[0] as f32 / 255.0,
                    ch[1] as f32 / 255.0,
                    ch[2] as f32 / 255.0,
                    ch[3] as f32 / 255.0,
                ))
            }
            _ => None,
        }
    }

    /// Parse the CSS color forms layers carry: hex, `rgb()`/`rgba()`
    /// (comma or space separated, optional `/ alpha`), `transparent`,
    /// `black` and `white`.
    pub fn parse_css(s: &str) -> Option<Self> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "transparent" => return Some(Self::TRANSPARENT),
            "black" => return Some(Self::BLACK),
            "white" => return Some(Self::WHITE),
            _ => {}
        }

        let args = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'));
        let Some(args) = args else {
            return Self::from_hex(s);
        };

        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |p: &str| -> Option<f32> {
            let v = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()? / 255.0,
            };
            v.is_finite().then(|| v.clamp(0.0, 1.0))
        };
        let alpha = |p: &str| -> Option<f32> {
            let v = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()?,
            };
            v.is_finite().then(|| v.clamp(0.0, 1.0))
        };

        Some(Self::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            match parts.get(3) {
                Some(a) => alpha(a)?,
                None => 1.0,
            },
        ))
    }

    /// Emit as shortest valid hex string (`#RRGGBB` when opaque).
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(9);
        out.push('#');
        push_hex_byte(&mut out, channel_u8(self.r));
        push_hex_byte(&mut out, channel_u8(self.g));
        push_hex_byte(&mut out, channel_u8(self.b));
        let a = channel_u8(self.a);
        if a != 255 {
            push_hex_byte(&mut out, a);
        }
        out
    }

    /// Always `#RRGGBBAA`.
    pub fn to_hex_alpha(&self) -> String {
        let mut out = self.with_alpha(1.0).to_hex();
        push_hex_byte(&mut out, channel_u8(self.a));
        out
    }

    /// CSS functional notation, e.g. `rgba(0, 0, 0, 0.25)`.
    pub fn to_css_rgba(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            channel_u8(self.r),
            channel_u8(self.g),
            channel_u8(self.b),
            fmt_num(self.a.clamp(0.0, 1.0))
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Multiply the alpha channel, e.g. by an effect or stop opacity.
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Linear interpolation in straight (non-premultiplied) RGBA.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            channel_u8(self.r),
            channel_u8(self.g),
            channel_u8(self.b),
            channel_u8(self.a),
        ]
    }
}

/// Compact number formatting for CSS output: at most two decimals,
/// trailing zeros dropped (`180`, `12.5`, `33.33`).
pub fn fmt_num(v: f32) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{rounded:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// Axis-aligned box in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.center_x(), self.center_y())
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// AABB overlap test.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn scaled(&self, s: f32) -> Bounds {
        Bounds::new(self.x * s, self.y * s, self.width * s, self.height * s)
    }

    pub fn inset(&self, d: f32) -> Bounds {
        Bounds::new(
            self.x + d,
            self.y + d,
            (self.width - 2.0 * d).max(0.0),
            (self.height - 2.0 * d).max(0.0),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Skew angles in degrees, each within ±[`MAX_SKEW`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Skew {
    pub x: f32,
    pub y: f32,
}

impl Skew {
    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

fn clamp_skew(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-MAX_SKEW, MAX_SKEW)
    } else {
        0.0
    }
}

// ─── Canvas presets ──────────────────────────────────────────────────────

/// Supported canvas presets, each with a fixed editing size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Portrait,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "3:4")]
    Classic,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Story,
        AspectRatio::Landscape,
        AspectRatio::Classic,
    ];

    /// Logical editing size in canvas pixels.
    pub fn size(self) -> (f32, f32) {
        match self {
            AspectRatio::Square => (400.0, 400.0),
            AspectRatio::Portrait => (400.0, 500.0),
            AspectRatio::Story => (360.0, 640.0),
            AspectRatio::Landscape => (640.0, 360.0),
            AspectRatio::Classic => (384.0, 512.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Story => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Classic => "3:4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == s.trim())
    }
}

// ─── Layer kinds ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One color checkpoint of a linear gradient. Position is in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: String,
    #[serde(default = "one")]
    pub alpha: f32,
}

impl GradientStop {
    pub fn new(position: f32, color: impl Into<String>, alpha: f32) -> Self {
        Self {
            position,
            color: color.into(),
            alpha,
        }
    }
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProps {
    /// May contain explicit newlines; no automatic word wrap.
    pub text: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub font_family: String,
    pub text_align: TextAlign,
    pub letter_spacing: f32,
    pub line_height: f32,
    /// Optional box painted behind the glyphs (any CSS color).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: "Text".to_string(),
            font_size: 24.0,
            font_weight: 700,
            font_family: "sans-serif".to_string(),
            text_align: TextAlign::Left,
            letter_spacing: 0.0,
            line_height: 1.2,
            background: None,
        }
    }
}

impl TextProps {
    /// Lines split on explicit newlines only.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    /// Vertical distance between consecutive baselines.
    pub fn line_advance(&self) -> f32 {
        self.font_size * self.line_height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeProps {
    pub stroke_width: f32,
    pub stroke_color: String,
    pub skew: Skew,
}

impl Default for ShapeProps {
    fn default() -> Self {
        Self {
            stroke_width: 0.0,
            stroke_color: "#000000".to_string(),
            skew: Skew::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageProps {
    pub src: String,
    /// Intrinsic pixel size; 0 until the image has been decoded.
    pub original_width: f32,
    pub original_height: f32,
    pub img_x: f32,
    pub img_y: f32,
    pub img_scale: f32,
    pub skew: Skew,
    pub is_background: bool,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            src: String::new(),
            original_width: 0.0,
            original_height: 0.0,
            img_x: 0.0,
            img_y: 0.0,
            img_scale: 1.0,
            skew: Skew::default(),
            is_background: false,
        }
    }
}

impl ImageProps {
    pub fn has_intrinsic_size(&self) -> bool {
        self.original_width > 0.0 && self.original_height > 0.0
    }

    /// Where the source image lands for a given frame: cover-fitted to the
    /// frame, zoomed by `img_scale`, offset from the frame origin by
    /// `img_x`/`img_y`. `intrinsic` is used when the stored size is unknown.
    pub fn placement(&self, frame: Bounds, intrinsic: Option<(f32, f32)>) -> Bounds {
        let scale = self.img_scale.max(MIN_IMAGE_SCALE);
        let (ow, oh) = if self.has_intrinsic_size() {
            (self.original_width, self.original_height)
        } else {
            match intrinsic {
                Some((w, h)) if w > 0.0 && h > 0.0 => (w, h),
                _ => (frame.width, frame.height),
            }
        };
        let cover = (frame.width / ow).max(frame.height / oh) * scale;
        Bounds::new(
            frame.x + self.img_x,
            frame.y + self.img_y,
            ow * cover,
            oh * cover,
        )
    }

    /// Offsets that center the cover-fitted image in a `width`×`height` frame.
    pub fn centered_offsets(&self, width: f32, height: f32) -> (f32, f32) {
        let placed = self.placement(Bounds::new(0.0, 0.0, width, height), None);
        ((width - placed.width) / 2.0, (height - placed.height) / 2.0)
    }
}

/// Kind selector used when creating layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Text,
    Rectangle,
    Circle,
    Image,
}

impl LayerType {
    pub fn id_prefix(self) -> &'static str {
        match self {
            LayerType::Text => "text",
            LayerType::Rectangle => "rect",
            LayerType::Circle => "circle",
            LayerType::Image => "image",
        }
    }
}

/// Kind-specific payload of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Text(TextProps),
    Rectangle(ShapeProps),
    Circle(ShapeProps),
    Image(ImageProps),
}

impl LayerKind {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerKind::Text(_) => LayerType::Text,
            LayerKind::Rectangle(_) => LayerType::Rectangle,
            LayerKind::Circle(_) => LayerType::Circle,
            LayerKind::Image(_) => LayerType::Image,
        }
    }
}

// ─── Layer ───────────────────────────────────────────────────────────────

/// Style record shared by every layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerStyle {
    pub opacity: f32,
    /// Corner radius in px. Circles ignore it and are always elliptical.
    pub border_radius: f32,
    /// Solid fill (or glyph color for text), stored verbatim.
    pub color: String,
    pub is_gradient: bool,
    pub gradient_stops: Vec<GradientStop>,
    /// Degrees, CSS convention: 0 points up, 90 points right.
    pub gradient_angle: f32,
    pub effects: Vec<Effect>,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            border_radius: 0.0,
            color: "#000000".to_string(),
            is_gradient: false,
            gradient_stops: default_stops(),
            gradient_angle: 180.0,
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(flatten)]
    pub style: LayerStyle,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl Layer {
    /// A layer with the toolbar defaults for `ty` and a fresh id.
    pub fn new(ty: LayerType) -> Self {
        let id = LayerId::with_prefix(ty.id_prefix());
        let mut style = LayerStyle::default();
        let (x, y, width, height, kind) = match ty {
            LayerType::Text => (100.0, 150.0, 200.0, 50.0, LayerKind::Text(TextProps::default())),
            LayerType::Rectangle => {
                style.color = "#FF007A".to_string();
                (125.0, 125.0, 150.0, 150.0, LayerKind::Rectangle(ShapeProps::default()))
            }
            LayerType::Circle => {
                style.color = "#FF007A".to_string();
                style.border_radius = 100.0;
                (125.0, 125.0, 150.0, 150.0, LayerKind::Circle(ShapeProps::default()))
            }
            LayerType::Image => (100.0, 100.0, 200.0, 200.0, LayerKind::Image(ImageProps::default())),
        };
        Self {
            id,
            x,
            y,
            width,
            height,
            style,
            kind,
        }
    }

    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Skew of shape and image layers; text is never skewed.
    pub fn skew(&self) -> Skew {
        match &self.kind {
            LayerKind::Rectangle(s) | LayerKind::Circle(s) => s.skew,
            LayerKind::Image(i) => i.skew,
            LayerKind::Text(_) => Skew::default(),
        }
    }

    pub fn text(&self) -> Option<&TextProps> {
        match &self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageProps> {
        match &self.kind {
            LayerKind::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<&ShapeProps> {
        match &self.kind {
            LayerKind::Rectangle(s) | LayerKind::Circle(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_background(&self) -> bool {
        self.image().is_some_and(|i| i.is_background)
    }

    /// Corner radius actually drawn, limited to half the shorter side.
    pub fn corner_radius(&self) -> f32 {
        let max = self.width.min(self.height) / 2.0;
        match self.kind {
            LayerKind::Circle(_) => max,
            _ => self.style.border_radius.clamp(0.0, max.max(0.0)),
        }
    }

    /// Shallow merge: only `Some` fields of `patch` are written, fields that
    /// do not apply to this layer's kind are ignored, and every written value
    /// is clamped to the model invariants. Returns true if anything changed.
    pub fn apply_patch(&mut self, patch: &LayerPatch) -> bool {
        let before = self.clone();

        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            self.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            self.y = y;
        }
        if let Some(w) = patch.width {
            self.width = w.max(MIN_LAYER_SIZE);
        }
        if let Some(h) = patch.height {
            self.height = h.max(MIN_LAYER_SIZE);
        }

        let style = &mut self.style;
        if let Some(o) = patch.opacity {
            style.opacity = if o.is_finite() { o.clamp(0.0, 1.0) } else { 1.0 };
        }
        if let Some(r) = patch.border_radius {
            style.border_radius = r.max(0.0);
        }
        if let Some(c) = &patch.color {
            style.color = c.clone();
        }
        if let Some(stops) = &patch.gradient_stops {
            style.gradient_stops = stops.clone();
        }
        if let Some(a) = patch.gradient_angle.filter(|v| v.is_finite()) {
            style.gradient_angle = a;
        }
        if let Some(g) = patch.is_gradient {
            style.is_gradient = g;
        }
        if (patch.is_gradient.is_some() || patch.gradient_stops.is_some())
            && style.is_gradient
            && style.gradient_stops.len() < 2
        {
            style.gradient_stops = default_stops();
        }
        if let Some(effects) = &patch.effects {
            style.effects = effects.clone();
        }

        match &mut self.kind {
            LayerKind::Text(t) => {
                if let Some(v) = &patch.text {
                    t.text = v.clone();
                }
                if let Some(v) = patch.font_size {
                    t.font_size = v.max(1.0);
                }
                if let Some(v) = patch.font_weight {
                    t.font_weight = v.clamp(100, 900);
                }
                if let Some(v) = &patch.font_family {
                    t.font_family = v.clone();
                }
                if let Some(v) = patch.text_align {
                    t.text_align = v;
                }
                if let Some(v) = patch.letter_spacing.filter(|v| v.is_finite()) {
                    t.letter_spacing = v;
                }
                if let Some(v) = patch.line_height {
                    t.line_height = v.max(0.1);
                }
                if let Some(v) = &patch.text_background {
                    t.background = v.clone();
                }
            }
            LayerKind::Rectangle(s) | LayerKind::Circle(s) => {
                if let Some(v) = patch.stroke_width {
                    s.stroke_width = v.max(0.0);
                }
                if let Some(v) = &patch.stroke_color {
                    s.stroke_color = v.clone();
                }
                if let Some(v) = patch.skew_x {
                    s.skew.x = clamp_skew(v);
                }
                if let Some(v) = patch.skew_y {
                    s.skew.y = clamp_skew(v);
                }
            }
            LayerKind::Image(i) => {
                if let Some(v) = &patch.src {
                    i.src = v.clone();
                }
                if let Some(v) = patch.original_width {
                    i.original_width = v.max(0.0);
                }
                if let Some(v) = patch.original_height {
                    i.original_height = v.max(0.0);
                }
                if let Some(v) = patch.img_x.filter(|v| v.is_finite()) {
                    i.img_x = v;
                }
                if let Some(v) = patch.img_y.filter(|v| v.is_finite()) {
                    i.img_y = v;
                }
                if let Some(v) = patch.img_scale {
                    i.img_scale = v.max(MIN_IMAGE_SCALE);
                }
                if let Some(v) = patch.skew_x {
                    i.skew.x = clamp_skew(v);
                }
                if let Some(v) = patch.skew_y {
                    i.skew.y = clamp_skew(v);
                }
            }
        }

        *self != before
    }
}

/// Partial update for a layer. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub opacity: Option<f32>,
    pub border_radius: Option<f32>,
    pub color: Option<String>,
    pub is_gradient: Option<bool>,
    pub gradient_stops: Option<Vec<GradientStop>>,
    pub gradient_angle: Option<f32>,
    pub effects: Option<Vec<Effect>>,
    // Text
    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<u16>,
    pub font_family: Option<String>,
    pub text_align: Option<TextAlign>,
    pub letter_spacing: Option<f32>,
    pub line_height: Option<f32>,
    pub text_background: Option<Option<String>>,
    // Rectangle / circle
    pub stroke_width: Option<f32>,
    pub stroke_color: Option<String>,
    // Rectangle / circle / image
    pub skew_x: Option<f32>,
    pub skew_y: Option<f32>,
    // Image
    pub src: Option<String>,
    pub original_width: Option<f32>,
    pub original_height: Option<f32>,
    pub img_x: Option<f32>,
    pub img_y: Option<f32>,
    pub img_scale: Option<f32>,
}

impl LayerPatch {
    pub fn is_empty(&self) -> bool {
        *self == LayerPatch::default()
    }

    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn frame(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }
}

/// Z-order moves for [`Document::reorder_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZOrder {
    Front,
    Back,
    Forward,
    Backward,
}

// ─── Document ────────────────────────────────────────────────────────────

/// The canvas: background reference, aspect preset and the layer stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub aspect: AspectRatio,
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Last background reference turned into a layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    imported_background: Option<String>,
}

impl Document {
    pub fn new(aspect: AspectRatio) -> Self {
        Self {
            aspect,
            ..Default::default()
        }
    }

    pub fn canvas_size(&self) -> (f32, f32) {
        self.aspect.size()
    }

    pub fn canvas_bounds(&self) -> Bounds {
        let (w, h) = self.canvas_size();
        Bounds::new(0.0, 0.0, w, h)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// The layer currently flagged as the auto-imported background.
    pub fn background_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.is_background())
    }

    /// Create a layer with kind defaults, apply `overrides`, append on top.
    pub fn add_layer(&mut self, ty: LayerType, overrides: &LayerPatch) -> LayerId {
        let mut layer = Layer::new(ty);
        layer.apply_patch(overrides);
        let id = layer.id;
        log::debug!("add layer {id} ({ty:?})");
        self.layers.push(layer);
        id
    }

    /// Insert an existing layer at `index` (clamped to the stack size).
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> LayerId {
        let id = layer.id;
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        id
    }

    /// Shallow-merge `patch` into one layer. Other layers are never touched.
    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        match self.layer_mut(id) {
            Some(layer) => layer.apply_patch(patch),
            None => false,
        }
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let idx = self.index_of(id)?;
        log::debug!("remove layer {id}");
        Some(self.layers.remove(idx))
    }

    /// Move a layer within the stack. Returns false when it is already at
    /// the requested extreme (or unknown).
    pub fn reorder_layer(&mut self, id: LayerId, to: ZOrder) -> bool {
        let Some(pos) = self.index_of(id) else {
            return false;
        };
        let last = self.layers.len() - 1;
        let target = match to {
            ZOrder::Front => last,
            ZOrder::Back => 0,
            ZOrder::Forward => (pos + 1).min(last),
            ZOrder::Backward => pos.saturating_sub(1),
        };
        if target == pos {
            return false;
        }
        let layer = self.layers.remove(pos);
        self.layers.insert(target, layer);
        true
    }

    /// Switch presets, applying `policy` to existing layer geometry.
    pub fn set_aspect(&mut self, aspect: AspectRatio, policy: AspectPolicy) -> bool {
        if aspect == self.aspect {
            return false;
        }
        let (old_w, old_h) = self.aspect.size();
        let (new_w, new_h) = aspect.size();
        self.aspect = aspect;

        match policy {
            AspectPolicy::Keep => {}
            AspectPolicy::Clamp => {
                for layer in &mut self.layers {
                    layer.x = layer.x.clamp(0.0, (new_w - layer.width).max(0.0));
                    layer.y = layer.y.clamp(0.0, (new_h - layer.height).max(0.0));
                }
            }
            AspectPolicy::Rescale => {
                let (sx, sy) = (new_w / old_w, new_h / old_h);
                for layer in &mut self.layers {
                    layer.x *= sx;
                    layer.y *= sy;
                    layer.width = (layer.width * sx).max(MIN_LAYER_SIZE);
                    layer.height = (layer.height * sy).max(MIN_LAYER_SIZE);
                }
            }
        }
        log::debug!("aspect -> {} ({policy:?})", aspect.label());
        true
    }

    /// Record a new background reference. A full-canvas image layer is
    /// created at the bottom of the stack the first time a non-empty value
    /// appears; repeated values are ignored. Earlier background layers only
    /// lose their flag.
    pub fn import_background(&mut self, src: &str) -> Option<LayerId> {
        if src.is_empty() {
            return None;
        }
        self.background = Some(src.to_string());
        if self.imported_background.as_deref() == Some(src) {
            return None;
        }
        self.imported_background = Some(src.to_string());

        for layer in &mut self.layers {
            if let LayerKind::Image(img) = &mut layer.kind {
                img.is_background = false;
            }
        }

        let (w, h) = self.canvas_size();
        let mut layer = Layer::new(LayerType::Image);
        layer.x = 0.0;
        layer.y = 0.0;
        layer.width = w;
        layer.height = h;
        if let LayerKind::Image(img) = &mut layer.kind {
            img.src = src.to_string();
            img.is_background = true;
        }
        log::debug!("import background as {}", layer.id);
        Some(self.insert_layer(0, layer))
    }

    /// Record the decoded size of `src` on every image layer showing it.
    /// Layers seeing their size for the first time get the image centered.
    pub fn image_loaded(&mut self, src: &str, width: f32, height: f32) -> Vec<LayerId> {
        if !(width > 0.0 && height > 0.0) {
            return Vec::new();
        }
        let mut changed = Vec::new();
        for layer in &mut self.layers {
            let (fw, fh) = (layer.width, layer.height);
            let LayerKind::Image(img) = &mut layer.kind else {
                continue;
            };
            if img.src != src {
                continue;
            }
            let first_load = !img.has_intrinsic_size();
            if !first_load && img.original_width == width && img.original_height == height {
                continue;
            }
            img.original_width = width;
            img.original_height = height;
            if first_load {
                let (ox, oy) = img.centered_offsets(fw, fh);
                img.img_x = ox;
                img.img_y = oy;
            }
            changed.push(layer.id);
        }
        changed
    }

    /// Store the decoded size of `src` on image layers that lack one,
    /// leaving their pan offsets untouched.
    pub fn fill_image_size(&mut self, src: &str, width: f32, height: f32) -> Vec<LayerId> {
        if !(width > 0.0 && height > 0.0) {
            return Vec::new();
        }
        let mut filled = Vec::new();
        for layer in &mut self.layers {
            if let LayerKind::Image(img) = &mut layer.kind {
                if img.src == src && !img.has_intrinsic_size() {
                    img.original_width = width;
                    img.original_height = height;
                    filled.push(layer.id);
                }
            }
        }
        filled
    }
}

// ─── Gradient & effect editing ───────────────────────────────────────────

impl Document {
    /// Insert an interpolated stop into a layer's gradient; returns its index.
    pub fn add_gradient_stop(&mut self, id: LayerId, position: f32) -> Option<usize> {
        let layer = self.layer_mut(id)?;
        Some(gradient::add_gradient_stop(&mut layer.style.gradient_stops, position))
    }

    /// Remove one stop; rejected while only two remain.
    pub fn remove_gradient_stop(&mut self, id: LayerId, index: usize) -> bool {
        self.layer_mut(id)
            .is_some_and(|l| gradient::remove_gradient_stop(&mut l.style.gradient_stops, index))
    }

    pub fn update_gradient_stop(&mut self, id: LayerId, index: usize, patch: &StopPatch) -> bool {
        self.layer_mut(id)
            .is_some_and(|l| gradient::update_gradient_stop(&mut l.style.gradient_stops, index, patch))
    }

    pub fn add_effect(&mut self, id: LayerId, ty: EffectType) -> Option<EffectId> {
        let layer = self.layer_mut(id)?;
        Some(effects::add_effect(&mut layer.style.effects, ty))
    }

    pub fn toggle_effect(&mut self, id: LayerId, effect: EffectId) -> bool {
        self.layer_mut(id)
            .is_some_and(|l| effects::toggle_effect(&mut l.style.effects, effect))
    }

    pub fn update_effect(&mut self, id: LayerId, effect: EffectId, patch: &EffectPatch) -> bool {
        self.layer_mut(id)
            .is_some_and(|l| effects::update_effect(&mut l.style.effects, effect, patch))
    }

    pub fn remove_effect(&mut self, id: LayerId, effect: EffectId) -> bool {
        self.layer_mut(id)
            .is_some_and(|l| effects::remove_effect(&mut l.style.effects, effect))
    }
}
