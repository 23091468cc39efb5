//! Text layout and glyph coverage for the raster renderer.
//!
//! Mirrors how the preview lays text out: explicit lines only, a 10px
//! horizontal inset, the block centered vertically in the frame, half
//! leading above and below every line, and letter spacing after every
//! character.

use rusttype::{Font, Point, Scale};
use studio_core::{Bounds, TextAlign, TextProps};
use tiny_skia::{FillRule, Mask, PathBuilder, Rect, Transform};

/// Horizontal padding between the frame edge and aligned text, in canvas px.
pub const TEXT_INSET: f32 = 10.0;

// Metrics used when no font face is available, as fractions of the em.
const FALLBACK_ADVANCE: f32 = 0.55;
const FALLBACK_ASCENT: f32 = 0.8;
const FALLBACK_DESCENT: f32 = -0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedChar {
    pub ch: char,
    /// Pen position (left edge of the glyph advance).
    pub x: f32,
    pub advance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub baseline: f32,
    pub left: f32,
    /// Advance width including letter spacing.
    pub width: f32,
    pub chars: Vec<PlacedChar>,
}

/// Positioned lines in device pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Font size in device px (the em).
    pub em: f32,
    pub ascent: f32,
    /// Negative, below the baseline.
    pub descent: f32,
    pub lines: Vec<TextLine>,
}

impl TextLayout {
    /// Union of every line's advance box, `None` for all-empty text.
    pub fn ink_bounds(&self) -> Option<Bounds> {
        let mut out: Option<(f32, f32, f32, f32)> = None;
        for line in self.lines.iter().filter(|l| l.width > 0.0) {
            let (l, t, r, b) = (
                line.left,
                line.baseline - self.ascent,
                line.left + line.width,
                line.baseline - self.descent,
            );
            out = Some(match out {
                Some((ol, ot, or, ob)) => (ol.min(l), ot.min(t), or.max(r), ob.max(b)),
                None => (l, t, r, b),
            });
        }
        out.map(|(l, t, r, b)| Bounds::new(l, t, r - l, b - t))
    }
}

/// rusttype scale whose em square is `em` pixels (rusttype scales by
/// ascent minus descent, CSS by units per em).
fn font_scale(font: &Font<'_>, em: f32) -> Scale {
    let v = font.v_metrics_unscaled();
    let upem = font.units_per_em().max(1) as f32;
    let height = v.ascent - v.descent;
    if height > 0.0 {
        Scale::uniform(em * height / upem)
    } else {
        Scale::uniform(em)
    }
}

/// Lay `props` out inside `frame` (canvas px) at `scale` device px per
/// canvas px. `font` of `None` uses fixed fallback metrics.
pub fn layout_text(props: &TextProps, frame: Bounds, scale: f32, font: Option<&Font<'_>>) -> TextLayout {
    let em = props.font_size * scale;
    let spacing = props.letter_spacing * scale;
    let line_adv = props.line_advance() * scale;
    let frame = frame.scaled(scale);
    let inset = TEXT_INSET * scale;

    let (ascent, descent, rt_scale) = match font {
        Some(f) => {
            let s = font_scale(f, em);
            let v = f.v_metrics(s);
            (v.ascent, v.descent, Some(s))
        }
        None => (em * FALLBACK_ASCENT, em * FALLBACK_DESCENT, None),
    };

    let texts: Vec<&str> = props.lines().collect();
    let block = line_adv * texts.len() as f32;
    let top = frame.center_y() - block / 2.0;
    let half_leading = (line_adv - (ascent - descent)) / 2.0;

    let lines = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let baseline = top + line_adv * i as f32 + half_leading + ascent;
            let mut chars = Vec::with_capacity(text.len());
            let mut pen = 0.0f32;
            let mut prev = None;
            for ch in text.chars() {
                let advance = match (font, rt_scale) {
                    (Some(f), Some(s)) => {
                        let glyph = f.glyph(ch);
                        if let Some(p) = prev {
                            pen += f.pair_kerning(s, p, glyph.id());
                        }
                        prev = Some(glyph.id());
                        glyph.scaled(s).h_metrics().advance_width
                    }
                    _ => em * FALLBACK_ADVANCE,
                };
                chars.push(PlacedChar { ch, x: pen, advance });
                pen += advance + spacing;
            }
            let width = pen.max(0.0);
            let left = match props.text_align {
                TextAlign::Left => frame.left() + inset,
                TextAlign::Center => frame.center_x() - width / 2.0,
                TextAlign::Right => frame.right() - inset - width,
            };
            for c in &mut chars {
                c.x += left;
            }
            TextLine {
                baseline,
                left,
                width,
                chars,
            }
        })
        .collect();

    TextLayout {
        em,
        ascent,
        descent,
        lines,
    }
}

/// Coverage mask of the laid-out glyphs on a `width`×`height` surface.
/// Without a font every visible character becomes a placeholder box.
pub fn glyph_mask(layout: &TextLayout, font: Option<&Font<'_>>, width: u32, height: u32) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    match font {
        Some(f) => {
            let s = font_scale(f, layout.em);
            let data = mask.data_mut();
            for line in &layout.lines {
                for pc in &line.chars {
                    let glyph = f
                        .glyph(pc.ch)
                        .scaled(s)
                        .positioned(Point { x: pc.x, y: line.baseline });
                    let Some(bb) = glyph.pixel_bounding_box() else {
                        continue;
                    };
                    glyph.draw(|gx, gy, v| {
                        let x = bb.min.x + gx as i32;
                        let y = bb.min.y + gy as i32;
                        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                            return;
                        }
                        let idx = y as usize * width as usize + x as usize;
                        let cov = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                        data[idx] = data[idx].saturating_add(cov);
                    });
                }
            }
        }
        None => {
            let mut pb = PathBuilder::new();
            for line in &layout.lines {
                for pc in line.chars.iter().filter(|c| !c.ch.is_whitespace()) {
                    let h = layout.em * 0.7;
                    if let Some(r) = Rect::from_xywh(
                        pc.x + pc.advance * 0.1,
                        line.baseline - h,
                        pc.advance * 0.8,
                        h,
                    ) {
                        pb.push_rect(r);
                    }
                }
            }
            if let Some(path) = pb.finish() {
                mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
            }
        }
    }
    Some(mask)
}
