//! Resolved paint: layer style data turned into concrete colors.
//!
//! Style strings come straight from user input and may be malformed.
//! Resolution never fails; anything unusable degrades to neutral gray so a
//! bad layer still renders and never takes the rest of the scene with it.

use crate::model::{Bounds, Color, GradientStop, LayerStyle};

/// A gradient stop with position normalized to 0..1 and alpha folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

/// Fill ready for either renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear {
        /// Degrees, CSS convention.
        angle: f32,
        stops: Vec<ColorStop>,
    },
}

impl Paint {
    /// A representative color (first stop for gradients).
    pub fn primary_color(&self) -> Color {
        match self {
            Paint::Solid(c) => *c,
            Paint::Linear { stops, .. } => stops.first().map_or(Color::NEUTRAL_GRAY, |s| s.color),
        }
    }
}

/// Parse a CSS color, substituting `fallback` (and logging) on failure.
pub fn resolve_color(value: &str, fallback: Color) -> Color {
    match Color::parse_css(value) {
        Some(c) => c,
        None => {
            log::warn!("unparseable color {value:?}, using {}", fallback.to_hex());
            fallback
        }
    }
}

fn gray_gradient() -> Vec<ColorStop> {
    vec![
        ColorStop {
            offset: 0.0,
            color: Color::NEUTRAL_GRAY,
        },
        ColorStop {
            offset: 1.0,
            color: Color::NEUTRAL_GRAY,
        },
    ]
}

/// Repair raw stops: drop entries with bad colors or positions, clamp,
/// sort ascending, and fall back to a gray pair below two valid stops.
pub fn resolve_stops(stops: &[GradientStop]) -> Vec<ColorStop> {
    let mut out: Vec<ColorStop> = stops
        .iter()
        .filter_map(|s| {
            if !s.position.is_finite() {
                log::warn!("dropping gradient stop with position {}", s.position);
                return None;
            }
            let Some(color) = Color::parse_css(&s.color) else {
                log::warn!("dropping gradient stop with color {:?}", s.color);
                return None;
            };
            let alpha = if s.alpha.is_finite() { s.alpha.clamp(0.0, 1.0) } else { 1.0 };
            Some(ColorStop {
                offset: s.position.clamp(0.0, 100.0) / 100.0,
                color: color.fade(alpha),
            })
        })
        .collect();

    if out.len() < 2 {
        log::warn!("gradient has {} usable stops, using gray fallback", out.len());
        return gray_gradient();
    }
    out.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    out
}

impl LayerStyle {
    /// Concrete fill for this style. Never fails.
    pub fn resolve_paint(&self) -> Paint {
        if self.is_gradient {
            let angle = if self.gradient_angle.is_finite() {
                self.gradient_angle
            } else {
                log::warn!("non-finite gradient angle, using 180");
                180.0
            };
            Paint::Linear {
                angle,
                stops: resolve_stops(&self.gradient_stops),
            }
        } else {
            Paint::Solid(resolve_color(&self.color, Color::NEUTRAL_GRAY))
        }
    }
}

/// Start and end points of a CSS `linear-gradient(<angle>deg, ...)` over
/// `rect`: the line passes through the center in direction
/// `(sin a, -cos a)` with length `|w sin a| + |h cos a|`, so the 0% and
/// 100% stops touch opposite corners exactly like a browser draws them.
pub fn gradient_line(angle_deg: f32, rect: Bounds) -> ((f32, f32), (f32, f32)) {
    let a = angle_deg.to_radians();
    let (sin, cos) = a.sin_cos();
    let len = (rect.width * sin).abs() + (rect.height * cos).abs();
    let (cx, cy) = rect.center();
    let (dx, dy) = (sin * len / 2.0, -cos * len / 2.0);
    ((cx - dx, cy - dy), (cx + dx, cy + dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn bad_solid_color_becomes_gray() {
        let style = LayerStyle {
            color: "#zzz".into(),
            ..Default::default()
        };
        assert_eq!(style.resolve_paint(), Paint::Solid(Color::NEUTRAL_GRAY));
    }

    #[test]
    fn malformed_stops_are_repaired() {
        let style = LayerStyle {
            is_gradient: true,
            gradient_stops: vec![
                GradientStop::new(150.0, "#0000FF", 0.5),
                GradientStop::new(f32::NAN, "#FF0000", 1.0),
                GradientStop::new(-10.0, "#00FF00", 1.0),
                GradientStop::new(50.0, "banana", 1.0),
            ],
            ..Default::default()
        };
        let Paint::Linear { stops, angle } = style.resolve_paint() else {
            panic!("expected gradient");
        };
        assert_eq!(angle, 180.0);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].offset, 0.0);
        assert_eq!(stops[0].color.to_hex(), "#00FF00");
        assert_eq!(stops[1].offset, 1.0);
        assert_eq!(stops[1].color.to_hex_alpha(), "#0000FF80");
    }

    #[test]
    fn too_few_stops_fall_back_to_gray_pair() {
        let style = LayerStyle {
            is_gradient: true,
            gradient_stops: vec![GradientStop::new(0.0, "#FF0000", 1.0)],
            gradient_angle: f32::INFINITY,
            ..Default::default()
        };
        assert_eq!(
            style.resolve_paint(),
            Paint::Linear {
                angle: 180.0,
                stops: gray_gradient()
            }
        );
    }

    #[test]
    fn gradient_line_follows_css_angles() {
        let rect = Bounds::new(0.0, 0.0, 200.0, 100.0);
        // 180deg: top to bottom.
        assert!(close(gradient_line(180.0, rect).0, (100.0, 0.0)));
        assert!(close(gradient_line(180.0, rect).1, (100.0, 100.0)));
        // 90deg: left to right.
        assert!(close(gradient_line(90.0, rect).0, (0.0, 50.0)));
        assert!(close(gradient_line(90.0, rect).1, (200.0, 50.0)));
        // 45deg on a square reaches the corners.
        let sq = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let (start, end) = gradient_line(45.0, sq);
        assert!(close(start, (0.0, 100.0)));
        assert!(close(end, (100.0, 0.0)));
    }
}
