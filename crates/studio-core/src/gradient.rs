//! Multi-stop gradient editing and CSS serialization.

use crate::model::{Color, GradientStop, LayerStyle, fmt_num};
use crate::paint::{Paint, resolve_color};

/// Stops seeded whenever a layer switches to a gradient fill.
pub fn default_stops() -> Vec<GradientStop> {
    vec![
        GradientStop::new(0.0, "#FF007A", 1.0),
        GradientStop::new(100.0, "#6366F1", 1.0),
    ]
}

/// Partial update for one stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopPatch {
    pub position: Option<f32>,
    pub color: Option<String>,
    pub alpha: Option<f32>,
}

/// Copy of `stops` ordered by position (stable; NaN sorts last).
pub fn sorted_stops(stops: &[GradientStop]) -> Vec<GradientStop> {
    let mut out = stops.to_vec();
    out.sort_by(|a, b| a.position.total_cmp(&b.position));
    out
}

/// The stop a new handle at `position` would get: color and alpha blended
/// from the nearest neighbors on each side, or copied from the nearest edge
/// stop outside the covered range.
pub fn interpolate_stop(stops: &[GradientStop], position: f32) -> GradientStop {
    let position = if position.is_finite() { position.clamp(0.0, 100.0) } else { 50.0 };
    let sorted = sorted_stops(stops);

    let left = sorted.iter().rev().find(|s| s.position <= position);
    let right = sorted.iter().find(|s| s.position >= position);
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        (Some(edge), None) | (None, Some(edge)) => (edge, edge),
        (None, None) => {
            return GradientStop::new(position, Color::NEUTRAL_GRAY.to_hex(), 1.0);
        }
    };

    let span = right.position - left.position;
    let t = if span > 0.0 { (position - left.position) / span } else { 0.0 };
    let lc = resolve_color(&left.color, Color::NEUTRAL_GRAY).with_alpha(1.0);
    let rc = resolve_color(&right.color, Color::NEUTRAL_GRAY).with_alpha(1.0);
    let alpha = left.alpha + (right.alpha - left.alpha) * t;
    GradientStop::new(position, lc.lerp(rc, t).to_hex(), alpha.clamp(0.0, 1.0))
}

/// Index a stop at `position` lands on once the list is sorted.
pub fn insertion_index(stops: &[GradientStop], position: f32) -> usize {
    sorted_stops(stops).partition_point(|s| s.position <= position)
}

/// Insert an interpolated stop at `position`. The list is left sorted;
/// returns the new stop's index.
pub fn add_gradient_stop(stops: &mut Vec<GradientStop>, position: f32) -> usize {
    let stop = interpolate_stop(stops, position);
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    let idx = stops.partition_point(|s| s.position <= stop.position);
    stops.insert(idx, stop);
    idx
}

/// Remove the stop at `index`. Rejected when only two stops remain.
pub fn remove_gradient_stop(stops: &mut Vec<GradientStop>, index: usize) -> bool {
    if stops.len() <= 2 || index >= stops.len() {
        return false;
    }
    stops.remove(index);
    true
}

/// Apply a partial update to the stop at `index`.
pub fn update_gradient_stop(stops: &mut [GradientStop], index: usize, patch: &StopPatch) -> bool {
    let Some(stop) = stops.get_mut(index) else {
        return false;
    };
    let before = stop.clone();
    if let Some(p) = patch.position.filter(|p| p.is_finite()) {
        stop.position = p.clamp(0.0, 100.0);
    }
    if let Some(c) = &patch.color {
        stop.color = c.clone();
    }
    if let Some(a) = patch.alpha.filter(|a| a.is_finite()) {
        stop.alpha = a.clamp(0.0, 1.0);
    }
    *stop != before
}

/// `linear-gradient(<angle>deg, #RRGGBBAA <p>%, ...)` for the style's
/// gradient. Malformed stop data yields the gray fallback pair.
pub fn to_css_gradient(style: &LayerStyle) -> String {
    let gradient = LayerStyle {
        is_gradient: true,
        ..style.clone()
    };
    match gradient.resolve_paint() {
        Paint::Linear { angle, stops } => {
            let mut css = format!("linear-gradient({}deg", fmt_num(angle));
            for stop in &stops {
                css.push_str(&format!(
                    ", {} {}%",
                    stop.color.to_hex_alpha(),
                    fmt_num(stop.offset * 100.0)
                ));
            }
            css.push(')');
            css
        }
        // resolve_paint always yields a gradient when is_gradient is set.
        Paint::Solid(c) => c.to_hex_alpha(),
    }
}
