//! Input abstraction layer.
//!
//! Host pointer, keyboard and inspector-widget events, normalized into one
//! `InputEvent` enum the controller consumes. Canvas coordinates are
//! logical canvas pixels; gradient bar coordinates are bar-local pixels.

use crate::shortcuts::ShortcutAction;

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed on the canvas.
    PointerDown { x: f32, y: f32, modifiers: Modifiers },

    /// Pointer moved over the canvas, button held or not.
    PointerMove { x: f32, y: f32, modifiers: Modifiers },

    PointerUp { x: f32, y: f32 },

    DoubleClick { x: f32, y: f32 },

    /// `KeyboardEvent.key` value (e.g. `"Escape"`, `"]"`).
    Key { key: String, modifiers: Modifiers },

    /// The editing surface lost focus.
    Blur,

    /// Full replacement text from the inline text editor.
    TextInput(String),

    // ── Gradient bar (inspector) ──
    GradientBarDown { x: f32 },
    GradientBarMove { x: f32 },
    GradientBarUp,
    GradientBarDoubleClick { x: f32 },

    /// Image scale slider while panning an image inside its frame.
    ImageScale(f32),

    /// Skew sliders while free-transforming, in degrees.
    Skew { x: f32, y: f32 },

    /// Toolbar button or menu item.
    Action(ShortcutAction),
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract the canvas position if this is a canvas pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y }
            | Self::DoubleClick { x, y } => Some((*x, *y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_only_for_canvas_pointer_events() {
        assert_eq!(InputEvent::pointer_down(3.0, 4.0).position(), Some((3.0, 4.0)));
        assert_eq!(InputEvent::DoubleClick { x: 1.0, y: 2.0 }.position(), Some((1.0, 2.0)));
        assert_eq!(InputEvent::GradientBarDown { x: 5.0 }.position(), None);
        assert_eq!(InputEvent::key("Escape").position(), None);
    }

    #[test]
    fn command_is_ctrl_or_meta() {
        assert!(!Modifiers::NONE.command());
        assert!(Modifiers { ctrl: true, ..Modifiers::NONE }.command());
        assert!(Modifiers { meta: true, ..Modifiers::NONE }.command());
        assert!(!Modifiers { shift: true, alt: true, ..Modifiers::NONE }.command());
    }
}
