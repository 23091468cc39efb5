//! Layer outlines and transforms shared by hit testing and rasterizing.
//!
//! Geometry is built with kurbo in canvas space, then converted to
//! tiny-skia paths for painting.

use kurbo::{Affine, BezPath, Ellipse, PathEl, Rect, Shape};
use studio_core::{Bounds, Layer, LayerKind, Skew};

const TOLERANCE: f64 = 0.1;

fn to_rect(b: Bounds) -> Rect {
    Rect::new(b.x as f64, b.y as f64, b.right() as f64, b.bottom() as f64)
}

/// Ellipse inscribed in `frame`, or a rectangle with `radius` corners.
pub fn outline(frame: Bounds, radius: f32, elliptical: bool) -> BezPath {
    let rect = to_rect(frame);
    if elliptical {
        Ellipse::from_rect(rect).to_path(TOLERANCE)
    } else if radius > 0.0 {
        let r = radius.min(frame.width.min(frame.height) / 2.0).max(0.0);
        rect.to_rounded_rect(r as f64).to_path(TOLERANCE)
    } else {
        rect.to_path(TOLERANCE)
    }
}

/// Outline of a layer's frame at `scale`, before skew.
pub fn layer_outline(layer: &Layer, scale: f32) -> BezPath {
    outline(
        layer.bounds().scaled(scale),
        layer.corner_radius() * scale,
        matches!(layer.kind, LayerKind::Circle(_)),
    )
}

/// Same outline grown by `spread` on every side (box-shadow spread).
pub fn spread_outline(layer: &Layer, scale: f32, spread: f32) -> BezPath {
    let frame = layer.bounds().scaled(scale);
    let grown = Bounds::new(
        frame.x - spread,
        frame.y - spread,
        (frame.width + 2.0 * spread).max(0.0),
        (frame.height + 2.0 * spread).max(0.0),
    );
    let radius = if layer.corner_radius() > 0.0 {
        (layer.corner_radius() * scale + spread).max(0.0)
    } else {
        0.0
    };
    outline(grown, radius, matches!(layer.kind, LayerKind::Circle(_)))
}

/// CSS `skew(x, y)` around the frame center.
pub fn skew_affine(frame: Bounds, skew: Skew) -> Affine {
    if skew.is_identity() {
        return Affine::IDENTITY;
    }
    let (cx, cy) = frame.center();
    let kx = (skew.x as f64).to_radians().tan();
    let ky = (skew.y as f64).to_radians().tan();
    Affine::translate((cx as f64, cy as f64))
        * Affine::skew(kx, ky)
        * Affine::translate((-cx as f64, -cy as f64))
}

/// The layer's skew transform at `scale`.
pub fn layer_transform(layer: &Layer, scale: f32) -> Affine {
    skew_affine(layer.bounds().scaled(scale), layer.skew())
}

pub fn to_skia_transform(a: Affine) -> tiny_skia::Transform {
    let [sx, ky, kx, sy, tx, ty] = a.as_coeffs();
    tiny_skia::Transform::from_row(
        sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32,
    )
}

/// Convert to a tiny-skia path. `None` for empty or degenerate paths.
pub fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => {
                pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32)
            }
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn skew_keeps_center_fixed() {
        let frame = Bounds::new(100.0, 100.0, 50.0, 50.0);
        let a = skew_affine(frame, Skew { x: 30.0, y: -10.0 });
        let c = a * Point::new(125.0, 125.0);
        assert!((c.x - 125.0).abs() < 1e-9 && (c.y - 125.0).abs() < 1e-9);
        // Top edge shifts left for a positive x skew (y above center).
        let top = a * Point::new(125.0, 100.0);
        assert!(top.x < 125.0);
    }

    #[test]
    fn skia_transform_matches_affine() {
        let a = skew_affine(Bounds::new(0.0, 0.0, 10.0, 10.0), Skew { x: 45.0, y: 0.0 });
        let t = to_skia_transform(a);
        assert!((t.kx - 1.0).abs() < 1e-6);
        assert_eq!(t.sx, 1.0);
    }

    #[test]
    fn circle_outline_is_elliptical() {
        let path = outline(Bounds::new(0.0, 0.0, 100.0, 50.0), 0.0, true);
        assert!(path.contains(Point::new(50.0, 25.0)));
        assert!(!path.contains(Point::new(3.0, 3.0)));
        assert!(to_skia_path(&path).is_some());
    }
}
