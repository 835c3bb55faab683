//! Keyboard bindings for marker manipulation.

/// A key press as delivered by the host's capture-phase listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput<'a> {
    /// Key value, e.g. `"Delete"`, `"r"`, `"Escape"`.
    pub key: &'a str,
    pub shift: bool,
    /// Focus is in a text input; marker shortcuts must not fire.
    pub in_text_input: bool,
}

impl<'a> KeyInput<'a> {
    pub fn new(key: &'a str) -> Self {
        Self {
            key,
            shift: false,
            in_text_input: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.in_text_input = true;
        self
    }
}

/// Actions marker shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerAction {
    DeleteSelected,
    /// Rotate the selected marker by the given number of degrees.
    RotateSelected(f64),
    StartMove,
    CancelMove,
}

/// Resolve a key press to a marker action.
///
/// Everything except Escape requires a selected marker.
pub fn resolve(
    input: KeyInput<'_>,
    has_selection: bool,
    is_moving: bool,
    rotation_step_degrees: f64,
) -> Option<MarkerAction> {
    if input.in_text_input {
        return None;
    }
    if input.key == "Escape" {
        return is_moving.then_some(MarkerAction::CancelMove);
    }
    if !has_selection {
        return None;
    }
    match input.key {
        "Delete" | "Backspace" => Some(MarkerAction::DeleteSelected),
        "r" | "R" => {
            let step = if input.shift {
                -rotation_step_degrees
            } else {
                rotation_step_degrees
            };
            Some(MarkerAction::RotateSelected(step))
        }
        "m" | "M" if !is_moving => Some(MarkerAction::StartMove),
        _ => None,
    }
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, shift: bool, description: &'static str) -> Self {
        Self {
            key,
            shift,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Shift+R").
    pub fn format(&self) -> String {
        if self.shift {
            format!("Shift+{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Registry of all marker shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Delete", false, "Delete selected marker"),
            Shortcut::new("Backspace", false, "Delete selected marker"),
            Shortcut::new("R", false, "Rotate selected marker clockwise"),
            Shortcut::new("R", true, "Rotate selected marker counter-clockwise"),
            Shortcut::new("M", false, "Move selected marker"),
            Shortcut::new("Escape", false, "Cancel move"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_selection() {
        assert_eq!(resolve(KeyInput::new("Delete"), false, false, 15.0), None);
        assert_eq!(
            resolve(KeyInput::new("Backspace"), true, false, 15.0),
            Some(MarkerAction::DeleteSelected)
        );
    }

    #[test]
    fn test_rotation_direction() {
        assert_eq!(
            resolve(KeyInput::new("r"), true, false, 15.0),
            Some(MarkerAction::RotateSelected(15.0))
        );
        assert_eq!(
            resolve(KeyInput::new("R").with_shift(), true, false, 15.0),
            Some(MarkerAction::RotateSelected(-15.0))
        );
    }

    #[test]
    fn test_move_only_when_idle() {
        assert_eq!(
            resolve(KeyInput::new("m"), true, false, 15.0),
            Some(MarkerAction::StartMove)
        );
        assert_eq!(resolve(KeyInput::new("M"), true, true, 15.0), None);
    }

    #[test]
    fn test_escape_without_selection() {
        assert_eq!(
            resolve(KeyInput::new("Escape"), false, true, 15.0),
            Some(MarkerAction::CancelMove)
        );
        assert_eq!(resolve(KeyInput::new("Escape"), false, false, 15.0), None);
    }

    #[test]
    fn test_text_input_ignored() {
        assert_eq!(resolve(KeyInput::new("Delete").in_text_input(), true, false, 15.0), None);
        assert_eq!(resolve(KeyInput::new("Escape").in_text_input(), true, true, 15.0), None);
    }

    #[test]
    fn test_registry_format() {
        let all = ShortcutRegistry::all();
        assert!(all.iter().any(|s| s.format() == "Shift+R"));
    }
}
