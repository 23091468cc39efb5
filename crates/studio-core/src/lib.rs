pub mod config;
pub mod effects;
pub mod gradient;
pub mod id;
pub mod lint;
pub mod model;
pub mod paint;
pub mod snap;

pub use config::{AspectPolicy, StudioConfig};
pub use effects::{Effect, EffectKind, EffectPatch, EffectType, ShadowSpec};
pub use gradient::{StopPatch, to_css_gradient};
pub use id::{EffectId, LayerId};
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use model::*;
pub use paint::{ColorStop, Paint, gradient_line};
pub use snap::{Guide, Handle, MoveSnap, ResizeSnap, SnapContext, compute_move_snap, compute_resize_snap};
