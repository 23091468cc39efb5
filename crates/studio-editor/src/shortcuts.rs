//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Toolbar
//! buttons feed the same actions in through `InputEvent::Action`.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts (or toolbar buttons) can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Escape: leave the current mode, or deselect.
    Cancel,
    /// Enter: leave the current mode, keeping the selection.
    Commit,
    Delete,

    // ── Z-order ──
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,
}

/// Resolves key events into shortcut actions.
///
/// `Cmd` means ⌘ on macOS and Ctrl elsewhere; both are accepted.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value. Returns `None` if the combo
    /// has no binding.
    pub fn resolve(key: &str, modifiers: &Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                // Shift turns `[`/`]` into `{`/`}` on most layouts.
                "]" | "}" => Some(ShortcutAction::BringToFront),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "]" => Some(ShortcutAction::BringForward),
                "[" => Some(ShortcutAction::SendBackward),
                _ => None,
            };
        }

        // ── Single keys ──
        match key {
            "Escape" => Some(ShortcutAction::Cancel),
            "Enter" => Some(ShortcutAction::Commit),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            _ => None,
        }
    }

    /// Like [`resolve`](Self::resolve), but while the inline text editor
    /// has focus only Escape is a shortcut; every other key is typing.
    pub fn resolve_in_text(key: &str, modifiers: &Modifiers) -> Option<ShortcutAction> {
        match Self::resolve(key, modifiers) {
            Some(ShortcutAction::Cancel) => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }
}
