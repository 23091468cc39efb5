//! Alignment snapping for move and resize gestures.
//!
//! Candidates are grouped in priority tiers per axis:
//!
//! 1. canvas center
//! 2. canvas edges
//! 3. edges and centers of the other layers
//!
//! The first tier holding any candidate within the threshold decides the
//! axis; inside a tier the smallest distance wins and ties keep the
//! earliest candidate. Each axis snaps at most once, so a result carries at
//! most one vertical and one horizontal guide.

use crate::config::StudioConfig;
use crate::id::LayerId;
use crate::model::{Bounds, Document, MIN_LAYER_SIZE};
use serde::{Deserialize, Serialize};

/// An alignment line to draw: vertical guides carry an x, horizontal a y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Guide {
    Vertical(f32),
    Horizontal(f32),
}

/// Compass resize handles around a layer's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::NW,
        Handle::N,
        Handle::NE,
        Handle::E,
        Handle::SE,
        Handle::S,
        Handle::SW,
        Handle::W,
    ];

    pub fn affects_left(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    pub fn affects_right(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    pub fn affects_top(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    pub fn affects_bottom(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }

    /// CSS cursor name for the handle.
    pub fn cursor(self) -> &'static str {
        match self {
            Handle::N | Handle::S => "ns-resize",
            Handle::E | Handle::W => "ew-resize",
            Handle::NE | Handle::SW => "nesw-resize",
            Handle::NW | Handle::SE => "nwse-resize",
        }
    }

    /// Frame produced by dragging this handle by `(dx, dy)` from `start`.
    /// Near-side handles move the origin so the opposite edge stays put.
    /// No minimum is applied here.
    pub fn drag(self, start: Bounds, dx: f32, dy: f32) -> Bounds {
        let mut b = start;
        if self.affects_right() {
            b.width = start.width + dx;
        }
        if self.affects_left() {
            b.x = start.x + dx;
            b.width = start.width - dx;
        }
        if self.affects_bottom() {
            b.height = start.height + dy;
        }
        if self.affects_top() {
            b.y = start.y + dy;
            b.height = start.height - dy;
        }
        b
    }
}

/// Everything snapping needs, captured before the event mutates anything.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapContext {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub threshold: f32,
    /// Bounds of every other layer, in z-order.
    pub others: Vec<Bounds>,
}

impl SnapContext {
    pub fn new(canvas_width: f32, canvas_height: f32, threshold: f32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            threshold,
            others: Vec::new(),
        }
    }

    /// Snapshot of `doc` for a gesture on `moving`.
    pub fn capture(doc: &Document, moving: LayerId, config: &StudioConfig) -> Self {
        let (w, h) = doc.canvas_size();
        Self {
            canvas_width: w,
            canvas_height: h,
            threshold: config.snap_threshold,
            others: doc
                .layers
                .iter()
                .filter(|l| l.id != moving)
                .map(|l| l.bounds())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveSnap {
    pub x: f32,
    pub y: f32,
    pub guides: Vec<Guide>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSnap {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub guides: Vec<Guide>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Amount to add to the probed coordinate.
    delta: f32,
    /// Guide coordinate.
    line: f32,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// One probed coordinate of the moving box, e.g. its left edge.
#[derive(Clone, Copy)]
enum Probe {
    Start,
    Center,
    End,
}

fn probe_of(b: &Bounds, axis: Axis, probe: Probe) -> f32 {
    match (axis, probe) {
        (Axis::X, Probe::Start) => b.left(),
        (Axis::X, Probe::Center) => b.center_x(),
        (Axis::X, Probe::End) => b.right(),
        (Axis::Y, Probe::Start) => b.top(),
        (Axis::Y, Probe::Center) => b.center_y(),
        (Axis::Y, Probe::End) => b.bottom(),
    }
}

fn best(candidates: impl IntoIterator<Item = Candidate>, threshold: f32) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for c in candidates {
        if !(c.delta.abs() <= threshold) {
            continue;
        }
        if best.is_none_or(|b| c.delta.abs() < b.delta.abs()) {
            best = Some(c);
        }
    }
    best
}

impl SnapContext {
    fn extent(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.canvas_width,
            Axis::Y => self.canvas_height,
        }
    }

    /// Best snap for a set of probed coordinates of the moving box along
    /// one axis. `probes` pairs each coordinate with which edge/center it is.
    fn snap_axis(&self, axis: Axis, probes: &[(Probe, f32)]) -> Option<Candidate> {
        let extent = self.extent(axis);
        let center = extent / 2.0;

        let tier1 = probes
            .iter()
            .filter(|(p, _)| matches!(p, Probe::Center))
            .map(|&(_, v)| Candidate {
                delta: center - v,
                line: center,
            });
        if let Some(c) = best(tier1, self.threshold) {
            return Some(c);
        }

        let tier2 = probes.iter().filter_map(|&(p, v)| match p {
            Probe::Start => Some(Candidate {
                delta: 0.0 - v,
                line: 0.0,
            }),
            Probe::End => Some(Candidate {
                delta: extent - v,
                line: extent,
            }),
            Probe::Center => None,
        });
        if let Some(c) = best(tier2, self.threshold) {
            return Some(c);
        }

        let tier3 = self.others.iter().flat_map(|o| {
            probes.iter().map(move |&(p, v)| {
                let line = probe_of(o, axis, p);
                Candidate {
                    delta: line - v,
                    line,
                }
            })
        });
        best(tier3, self.threshold)
    }
}

/// Snap a box being moved to `(x, y)`.
pub fn compute_move_snap(ctx: &SnapContext, x: f32, y: f32, width: f32, height: f32) -> MoveSnap {
    let b = Bounds::new(x, y, width, height);
    let mut out = MoveSnap {
        x,
        y,
        guides: Vec::new(),
    };

    let probes_x = [
        (Probe::Start, b.left()),
        (Probe::Center, b.center_x()),
        (Probe::End, b.right()),
    ];
    if let Some(c) = ctx.snap_axis(Axis::X, &probes_x) {
        out.x += c.delta;
        out.guides.push(Guide::Vertical(c.line));
    }

    let probes_y = [
        (Probe::Start, b.top()),
        (Probe::Center, b.center_y()),
        (Probe::End, b.bottom()),
    ];
    if let Some(c) = ctx.snap_axis(Axis::Y, &probes_y) {
        out.y += c.delta;
        out.guides.push(Guide::Horizontal(c.line));
    }

    out
}

/// Snap the edges `handle` moves, then enforce the minimum size. The edge
/// opposite the handle never moves.
pub fn compute_resize_snap(
    ctx: &SnapContext,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    handle: Handle,
) -> ResizeSnap {
    let mut left = x;
    let mut right = x + width;
    let mut top = y;
    let mut bottom = y + height;
    let mut guides = Vec::new();

    // An edge being dragged is matched against canvas center too, so it
    // is probed both as its own edge type and as a center line.
    if handle.affects_left() {
        if let Some(c) = ctx.snap_axis(Axis::X, &[(Probe::Start, left), (Probe::Center, left)]) {
            left += c.delta;
            guides.push(Guide::Vertical(c.line));
        }
        left = left.min(right - MIN_LAYER_SIZE);
    }
    if handle.affects_right() {
        if let Some(c) = ctx.snap_axis(Axis::X, &[(Probe::End, right), (Probe::Center, right)]) {
            right += c.delta;
            guides.push(Guide::Vertical(c.line));
        }
        right = right.max(left + MIN_LAYER_SIZE);
    }
    if handle.affects_top() {
        if let Some(c) = ctx.snap_axis(Axis::Y, &[(Probe::Start, top), (Probe::Center, top)]) {
            top += c.delta;
            guides.push(Guide::Horizontal(c.line));
        }
        top = top.min(bottom - MIN_LAYER_SIZE);
    }
    if handle.affects_bottom() {
        if let Some(c) = ctx.snap_axis(Axis::Y, &[(Probe::End, bottom), (Probe::Center, bottom)]) {
            bottom += c.delta;
            guides.push(Guide::Horizontal(c.line));
        }
        bottom = bottom.max(top + MIN_LAYER_SIZE);
    }

    // Drop guides the minimum-size clamp pulled the edge away from.
    guides.retain(|g| match *g {
        Guide::Vertical(gx) => gx == left || gx == right,
        Guide::Horizontal(gy) => gy == top || gy == bottom,
    });

    ResizeSnap {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
        guides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canvas() -> SnapContext {
        SnapContext::new(400.0, 400.0, 8.0)
    }

    #[test]
    fn snaps_to_canvas_center_first() {
        // Center at 197 is 3 away from 200; left edge 147 is nowhere near.
        let snap = compute_move_snap(&canvas(), 147.0, 10.0, 100.0, 40.0);
        assert_eq!(snap.x, 150.0);
        assert_eq!(snap.guides[0], Guide::Vertical(200.0));
    }

    #[test]
    fn center_beats_closer_edge_candidate() {
        let mut ctx = canvas();
        ctx.others.push(Bounds::new(151.0, 300.0, 10.0, 10.0));
        // Left edge is 1px from a sibling, center is 5px from canvas center.
        let snap = compute_move_snap(&ctx, 150.0, 100.0, 90.0, 20.0);
        assert_eq!(snap.x, 155.0);
    }

    #[test]
    fn snap_determinism_near_edge() {
        let ctx = canvas();
        let first = compute_move_snap(&ctx, 98.0, 50.0, 20.0, 20.0);
        for _ in 0..5 {
            assert_eq!(compute_move_snap(&ctx, 98.0, 50.0, 20.0, 20.0), first);
        }
    }

    #[test]
    fn snaps_to_sibling_edges() {
        let mut ctx = canvas();
        ctx.others.push(Bounds::new(100.0, 40.0, 60.0, 60.0));
        // Left edge 98 is 2px from the sibling's left edge at 100.
        let snap = compute_move_snap(&ctx, 98.0, 250.0, 20.0, 20.0);
        assert_eq!(snap.x, 100.0);
        assert_eq!(snap.guides, vec![Guide::Vertical(100.0)]);
    }

    #[test]
    fn snaps_both_axes_independently() {
        let snap = compute_move_snap(&canvas(), 3.0, 395.0 - 50.0, 50.0, 52.0);
        assert_eq!((snap.x, snap.y), (0.0, 348.0));
        assert_eq!(
            snap.guides,
            vec![Guide::Vertical(0.0), Guide::Horizontal(400.0)]
        );
    }

    #[test]
    fn no_snap_outside_threshold() {
        let snap = compute_move_snap(&canvas(), 60.0, 60.0, 30.0, 30.0);
        assert_eq!((snap.x, snap.y), (60.0, 60.0));
        assert!(snap.guides.is_empty());
    }

    #[test]
    fn west_handle_keeps_east_edge() {
        let start = Bounds::new(100.0, 100.0, 100.0, 100.0);
        let dragged = Handle::W.drag(start, 30.0, 0.0);
        let snap = compute_resize_snap(&canvas(), dragged.x, dragged.y, dragged.width, dragged.height, Handle::W);
        assert_eq!(snap.x + snap.width, 200.0);
        assert_eq!((snap.x, snap.width), (130.0, 70.0));
    }

    #[test]
    fn resize_never_below_minimum() {
        let start = Bounds::new(100.0, 100.0, 100.0, 100.0);
        for handle in Handle::ALL {
            for (dx, dy) in [(500.0, 500.0), (-500.0, -500.0), (95.0, -95.0), (-99.0, 99.0)] {
                let d = handle.drag(start, dx, dy);
                let snap = compute_resize_snap(&canvas(), d.x, d.y, d.width, d.height, handle);
                assert!(snap.width >= MIN_LAYER_SIZE, "{handle:?} {dx} {dy}");
                assert!(snap.height >= MIN_LAYER_SIZE, "{handle:?} {dx} {dy}");
            }
        }
    }

    #[test]
    fn resize_snaps_dragged_edge_only() {
        let start = Bounds::new(100.0, 100.0, 100.0, 100.0);
        let d = Handle::SE.drag(start, 95.0, 0.0);
        let snap = compute_resize_snap(&canvas(), d.x, d.y, d.width, d.height, Handle::SE);
        // Right edge 295 is untouched by tiers 1-2 (200 and 400 are far).
        assert_eq!(snap.width, 195.0);

        let d = Handle::E.drag(start, 196.0, 0.0);
        let snap = compute_resize_snap(&canvas(), d.x, d.y, d.width, d.height, Handle::E);
        assert_eq!((snap.x, snap.width), (100.0, 300.0));
        assert_eq!(snap.guides, vec![Guide::Vertical(400.0)]);
    }

    #[test]
    fn clamped_edge_drops_its_guide() {
        // Dragging the west edge almost onto the east edge near canvas center.
        let ctx = canvas();
        let snap = compute_resize_snap(&ctx, 195.0, 100.0, 10.0, 100.0, Handle::W);
        assert_eq!((snap.x, snap.width), (185.0, 20.0));
        assert!(snap.guides.is_empty());
    }

    #[test]
    fn capture_excludes_moving_layer() {
        use crate::model::{LayerPatch, LayerType};
        let mut doc = Document::default();
        let a = doc.add_layer(LayerType::Rectangle, &LayerPatch::default());
        doc.add_layer(LayerType::Text, &LayerPatch::default());
        let ctx = SnapContext::capture(&doc, a, &StudioConfig::default());
        assert_eq!(ctx.others, vec![Bounds::new(100.0, 150.0, 200.0, 50.0)]);
        assert_eq!(ctx.threshold, 8.0);
    }
}
