//! Hit testing: point → layer lookup.
//!
//! Walks the stack front-to-back against the stored layer geometry, so it
//! never depends on what a renderer happened to draw.

use crate::shape::skew_affine;
use kurbo::{Ellipse, Point, Rect, Shape};
use studio_core::{Bounds, Document, Handle, Layer, LayerId, LayerKind};

/// Find the topmost layer at canvas position (px, py).
/// Returns `None` on empty canvas.
pub fn hit_test(doc: &Document, px: f32, py: f32) -> Option<LayerId> {
    doc.layers
        .iter()
        .rev()
        .find(|layer| layer_contains(layer, px, py))
        .map(|layer| layer.id)
}

/// Whether (px, py) falls inside the layer's drawn shape: skew is undone
/// first, circles only count inside the ellipse.
pub fn layer_contains(layer: &Layer, px: f32, py: f32) -> bool {
    let b = layer.bounds();
    if !b.is_finite() {
        return false;
    }
    let local = skew_affine(b, layer.skew()).inverse() * Point::new(px as f64, py as f64);
    let rect = Rect::new(b.x as f64, b.y as f64, b.right() as f64, b.bottom() as f64);
    match layer.kind {
        LayerKind::Circle(_) => Ellipse::from_rect(rect).contains(local),
        _ => {
            local.x >= rect.x0 && local.x <= rect.x1 && local.y >= rect.y0 && local.y <= rect.y1
        }
    }
}

/// Canvas position of a resize handle on `b`.
pub fn handle_position(b: Bounds, handle: Handle) -> (f32, f32) {
    let x = if handle.affects_left() {
        b.left()
    } else if handle.affects_right() {
        b.right()
    } else {
        b.center_x()
    };
    let y = if handle.affects_top() {
        b.top()
    } else if handle.affects_bottom() {
        b.bottom()
    } else {
        b.center_y()
    };
    (x, y)
}

/// Resize handle of `layer` under (px, py), if any. Handles are square
/// hit areas of half-size `radius` on the unskewed frame.
pub fn hit_handle(layer: &Layer, px: f32, py: f32, radius: f32) -> Option<Handle> {
    let b = layer.bounds();
    Handle::ALL.into_iter().find(|&h| {
        let (hx, hy) = handle_position(b, h);
        (px - hx).abs() <= radius && (py - hy).abs() <= radius
    })
}
