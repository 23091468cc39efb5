pub mod export;
pub mod input;
pub mod interaction;
pub mod shortcuts;
pub mod studio;

pub use export::{ExportArtifact, ExportError, ExportSink, export};
pub use input::{InputEvent, Modifiers};
pub use interaction::{Controller, GradientBar, InteractionState};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use studio::{ChangeKind, LayerMutation, ModelChange, Studio};
