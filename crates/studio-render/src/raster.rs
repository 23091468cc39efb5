//! Offline export renderer: the document flattened into one pixmap.
//!
//! Every layer is painted into its own canvas-sized pixmap (shadows, then
//! content, then layer blur) and composited with its opacity. A layer that
//! cannot be painted is replaced by a gray box; the rest of the scene still
//! renders.

use crate::assets::{ImageSlot, ImageStore};
use crate::blur::gaussian_blur;
use crate::fonts::FontBook;
use crate::shape::{layer_outline, layer_transform, outline, spread_outline, to_skia_path, to_skia_transform};
use crate::text::{glyph_mask, layout_text};
use studio_core::effects::{effective_blur, enabled_shadows};
use studio_core::paint::resolve_color;
use studio_core::{
    Bounds, Color, Document, ImageProps, Layer, LayerId, LayerKind, MIN_LAYER_SIZE, Paint,
    ShadowSpec, ShapeProps, StudioConfig, TextProps, gradient_line,
};
use thiserror::Error;
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, LinearGradient, Mask, PathBuilder, Pixmap, PixmapPaint,
    Point, Rect, SpreadMode, Stroke, Transform,
};

const PLACEHOLDER_FILL: Color = Color::rgba(229.0 / 255.0, 231.0 / 255.0, 235.0 / 255.0, 1.0);

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("cannot allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },
    #[error("layer {0} has unusable geometry")]
    Geometry(LayerId),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per canvas pixel.
    pub scale: f32,
    /// Painted under every layer; `None` leaves the canvas transparent.
    pub background: Option<Color>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Some(Color::WHITE),
        }
    }
}

impl RasterOptions {
    pub fn from_config(config: &StudioConfig) -> Self {
        let scale = if config.export_scale.is_finite() && config.export_scale > 0.0 {
            config.export_scale
        } else {
            log::warn!("invalid export scale {}, using 1", config.export_scale);
            1.0
        };
        Self {
            scale,
            background: Some(resolve_color(&config.export_background, Color::WHITE)),
        }
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Render the document at `canvas size × options.scale`.
pub fn rasterize(
    doc: &Document,
    images: &ImageStore,
    fonts: &FontBook,
    options: &RasterOptions,
) -> Result<Pixmap, RasterError> {
    let (cw, ch) = doc.canvas_size();
    let width = (cw * options.scale).round().max(1.0) as u32;
    let height = (ch * options.scale).round().max(1.0) as u32;
    let mut canvas = Pixmap::new(width, height).ok_or(RasterError::Allocation { width, height })?;
    if let Some(bg) = options.background {
        canvas.fill(skia_color(bg));
    }

    let cx = LayerCx {
        images,
        fonts,
        scale: options.scale,
        width,
        height,
    };
    for layer in &doc.layers {
        let opacity = layer.style.opacity;
        let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
        if opacity == 0.0 {
            continue;
        }
        log::trace!("rasterize {}", layer.id);
        match cx.render_layer(layer) {
            Ok(pm) => canvas.draw_pixmap(
                0,
                0,
                pm.as_ref(),
                &PixmapPaint {
                    opacity,
                    ..Default::default()
                },
                Transform::identity(),
                None,
            ),
            Err(e) => {
                log::warn!("layer {} failed to render ({e}), drawing fallback box", layer.id);
                draw_fallback_box(&mut canvas, layer, options.scale);
            }
        }
    }
    Ok(canvas)
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
    pixmap
        .encode_png()
        .map_err(|e| RasterError::Encode(e.to_string()))
}

// ─── Paint helpers ────────────────────────────────────────────────────────

fn skia_color(c: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        c.r.clamp(0.0, 1.0),
        c.g.clamp(0.0, 1.0),
        c.b.clamp(0.0, 1.0),
        c.a.clamp(0.0, 1.0),
    )
    .unwrap_or(tiny_skia::Color::TRANSPARENT)
}

fn solid(c: Color) -> tiny_skia::Paint<'static> {
    let mut p = tiny_skia::Paint::default();
    p.set_color(skia_color(c));
    p.anti_alias = true;
    p
}

/// Shader for a resolved fill. Gradients run along the CSS gradient line
/// of `rect` (device px, before the layer transform).
fn skia_paint(paint: &Paint, rect: Bounds) -> tiny_skia::Paint<'static> {
    match paint {
        Paint::Solid(c) => solid(*c),
        Paint::Linear { angle, stops } => {
            let ((x0, y0), (x1, y1)) = gradient_line(*angle, rect);
            let skia_stops = stops
                .iter()
                .map(|s| GradientStop::new(s.offset, skia_color(s.color)))
                .collect();
            match LinearGradient::new(
                Point::from_xy(x0, y0),
                Point::from_xy(x1, y1),
                skia_stops,
                SpreadMode::Pad,
                Transform::identity(),
            ) {
                Some(shader) => {
                    let mut p = tiny_skia::Paint::default();
                    p.shader = shader;
                    p.anti_alias = true;
                    p
                }
                None => solid(paint.primary_color()),
            }
        }
    }
}

fn full_rect(width: u32, height: u32) -> Option<Rect> {
    Rect::from_xywh(0.0, 0.0, width as f32, height as f32)
}

// ─── Layers ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Silhouette<'a> {
    /// The layer outline (grown by shadow spread).
    Frame,
    Glyphs(&'a Mask),
}

struct LayerCx<'a> {
    images: &'a ImageStore,
    fonts: &'a FontBook,
    scale: f32,
    width: u32,
    height: u32,
}

impl LayerCx<'_> {
    fn new_pixmap(&self) -> Result<Pixmap, RasterError> {
        Pixmap::new(self.width, self.height).ok_or(RasterError::Allocation {
            width: self.width,
            height: self.height,
        })
    }

    fn render_layer(&self, layer: &Layer) -> Result<Pixmap, RasterError> {
        if !layer.bounds().is_finite() {
            return Err(RasterError::Geometry(layer.id));
        }
        let ts = to_skia_transform(layer_transform(layer, self.scale));
        let shadows = enabled_shadows(&layer.style.effects);
        let mut out = self.new_pixmap()?;

        match &layer.kind {
            LayerKind::Rectangle(shape) | LayerKind::Circle(shape) => {
                self.draw_shadows(&mut out, layer, &shadows, Silhouette::Frame, ts)?;
                self.paint_shape(&mut out, layer, shape, ts)?;
            }
            LayerKind::Image(img) => {
                self.draw_shadows(&mut out, layer, &shadows, Silhouette::Frame, ts)?;
                self.paint_image(&mut out, layer, img, ts)?;
            }
            LayerKind::Text(text) => self.paint_text(&mut out, layer, text, &shadows)?,
        }

        if let Some(blur) = effective_blur(&layer.style.effects) {
            gaussian_blur(&mut out, blur * self.scale);
        }
        Ok(out)
    }

    /// Shadows in list order, the first one ending up on top. CSS blur
    /// radii are twice the Gaussian sigma.
    fn draw_shadows(
        &self,
        out: &mut Pixmap,
        layer: &Layer,
        shadows: &[ShadowSpec],
        silhouette: Silhouette<'_>,
        ts: Transform,
    ) -> Result<(), RasterError> {
        for shadow in shadows.iter().rev() {
            let mut sp = self.new_pixmap()?;
            let paint = solid(shadow.color);
            match silhouette {
                Silhouette::Frame => {
                    let grown = spread_outline(layer, self.scale, shadow.spread * self.scale);
                    let Some(path) = to_skia_path(&grown) else {
                        continue;
                    };
                    sp.fill_path(&path, &paint, FillRule::Winding, ts, None);
                }
                Silhouette::Glyphs(mask) => {
                    if let Some(rect) = full_rect(self.width, self.height) {
                        sp.fill_rect(rect, &paint, Transform::identity(), Some(mask));
                    }
                }
            }
            gaussian_blur(&mut sp, shadow.blur * self.scale / 2.0);
            out.draw_pixmap(
                0,
                0,
                sp.as_ref(),
                &PixmapPaint::default(),
                Transform::from_translate(shadow.offset_x * self.scale, shadow.offset_y * self.scale),
                None,
            );
        }
        Ok(())
    }

    fn paint_shape(
        &self,
        out: &mut Pixmap,
        layer: &Layer,
        shape: &ShapeProps,
        ts: Transform,
    ) -> Result<(), RasterError> {
        let frame = layer.bounds().scaled(self.scale);
        let path = to_skia_path(&layer_outline(layer, self.scale)).ok_or(RasterError::Geometry(layer.id))?;
        let fill = skia_paint(&layer.style.resolve_paint(), frame);
        out.fill_path(&path, &fill, FillRule::Winding, ts, None);

        if shape.stroke_width > 0.0 {
            // Stroke sits inside the border box.
            let sw = shape.stroke_width * self.scale;
            let radius = (layer.corner_radius() * self.scale - sw / 2.0).max(0.0);
            let inner = outline(
                frame.inset(sw / 2.0),
                radius,
                matches!(layer.kind, LayerKind::Circle(_)),
            );
            if let Some(stroke_path) = to_skia_path(&inner) {
                let color = resolve_color(&shape.stroke_color, Color::NEUTRAL_GRAY);
                let stroke = Stroke {
                    width: sw,
                    ..Default::default()
                };
                out.stroke_path(&stroke_path, &solid(color), &stroke, ts, None);
            }
        }
        Ok(())
    }

    fn paint_image(
        &self,
        out: &mut Pixmap,
        layer: &Layer,
        img: &ImageProps,
        ts: Transform,
    ) -> Result<(), RasterError> {
        let frame = layer.bounds();
        let clip_path = to_skia_path(&layer_outline(layer, self.scale)).ok_or(RasterError::Geometry(layer.id))?;
        let mut clip = Mask::new(self.width, self.height).ok_or(RasterError::Allocation {
            width: self.width,
            height: self.height,
        })?;
        clip.fill_path(&clip_path, FillRule::Winding, true, ts);

        match self.images.get(&img.src) {
            ImageSlot::Ready(decoded) => {
                let placed = img.placement(frame, Some(decoded.size())).scaled(self.scale);
                let sx = placed.width / decoded.width() as f32;
                let sy = placed.height / decoded.height() as f32;
                let image_ts = ts.pre_concat(Transform::from_row(sx, 0.0, 0.0, sy, placed.x, placed.y));
                out.draw_pixmap(
                    0,
                    0,
                    decoded.pixmap.as_ref(),
                    &PixmapPaint {
                        quality: FilterQuality::Bilinear,
                        ..Default::default()
                    },
                    image_ts,
                    Some(&clip),
                );
            }
            slot => {
                log::debug!("image {:?} not available ({slot:?}), drawing placeholder", img.src);
                out.fill_path(&clip_path, &solid(PLACEHOLDER_FILL), FillRule::Winding, ts, Some(&clip));
                let f = frame.scaled(self.scale);
                let mut pb = PathBuilder::new();
                pb.move_to(f.left(), f.top());
                pb.line_to(f.right(), f.bottom());
                pb.move_to(f.right(), f.top());
                pb.line_to(f.left(), f.bottom());
                if let Some(cross) = pb.finish() {
                    let stroke = Stroke {
                        width: 2.0 * self.scale,
                        ..Default::default()
                    };
                    out.stroke_path(&cross, &solid(Color::NEUTRAL_GRAY), &stroke, ts, Some(&clip));
                }
            }
        }
        Ok(())
    }

    /// Background box, then text shadows from the glyph coverage, then the
    /// glyphs filled with the layer paint over the frame.
    fn paint_text(
        &self,
        out: &mut Pixmap,
        layer: &Layer,
        text: &TextProps,
        shadows: &[ShadowSpec],
    ) -> Result<(), RasterError> {
        let frame = layer.bounds().scaled(self.scale);
        if let Some(bg) = &text.background {
            let color = resolve_color(bg, Color::NEUTRAL_GRAY);
            let path = to_skia_path(&outline(frame, layer.corner_radius() * self.scale, false))
                .ok_or(RasterError::Geometry(layer.id))?;
            out.fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
        }

        let font = self.fonts.font(&text.font_family, text.font_weight);
        let layout = layout_text(text, layer.bounds(), self.scale, font.as_deref());
        let mask = glyph_mask(&layout, font.as_deref(), self.width, self.height).ok_or(
            RasterError::Allocation {
                width: self.width,
                height: self.height,
            },
        )?;
        self.draw_shadows(out, layer, shadows, Silhouette::Glyphs(&mask), Transform::identity())?;

        let fill = skia_paint(&layer.style.resolve_paint(), frame);
        if let Some(rect) = full_rect(self.width, self.height) {
            out.fill_rect(rect, &fill, Transform::identity(), Some(&mask));
        }
        Ok(())
    }
}

/// Neutral gray box standing in for a layer that failed to paint.
fn draw_fallback_box(canvas: &mut Pixmap, layer: &Layer, scale: f32) {
    let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
    let b = Bounds::new(
        finite_or(layer.x, 0.0),
        finite_or(layer.y, 0.0),
        finite_or(layer.width, MIN_LAYER_SIZE),
        finite_or(layer.height, MIN_LAYER_SIZE),
    )
    .scaled(scale);
    if let Some(rect) = Rect::from_xywh(b.x, b.y, b.width, b.height) {
        canvas.fill_rect(rect, &solid(Color::NEUTRAL_GRAY), Transform::identity(), None);
    }
}
