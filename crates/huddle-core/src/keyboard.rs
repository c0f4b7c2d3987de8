//! Key-press notifications consumed by the shortcut detector.
//!
//! Hosts capture raw input however they like and translate it into
//! [`KeyEvent`]s. Browser-style hosts usually hold a numeric key code; use
//! [`Key::from_code`] for those.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Keyboard modifier state carried by a key notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held.
    pub control: bool,
    /// The Alt key is held (Option on macOS).
    pub alt: bool,
    /// The Meta/Super key is held.
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        control: false,
        alt: false,
        meta: false,
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        shift: false,
        control: true,
        alt: false,
        meta: false,
    };

    /// Alt modifier only.
    pub const ALT: Self = Self {
        shift: false,
        control: false,
        alt: true,
        meta: false,
    };

    /// Meta modifier only.
    pub const META: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: true,
    };

    /// Whether no modifier is held.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Whether every modifier held in `other` is also held here.
    pub fn contains(&self, other: Self) -> bool {
        (self.shift || !other.shift)
            && (self.control || !other.control)
            && (self.alt || !other.alt)
            && (self.meta || !other.meta)
    }
}

/// A keyboard key.
///
/// Covers the keys a widget shortcut can reasonably be bound to. Anything
/// else is carried through as [`Key::Unknown`] with its raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Numbers (main keyboard)
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    // Editing and whitespace
    Backspace, Tab, Enter, Escape, Space,

    // Modifiers as keys in their own right
    Shift, Control, Alt, Meta,

    /// A key without a dedicated variant.
    Unknown(u16),
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

const DIGITS: [Key; 10] = [
    Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
    Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
];

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
    Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
];

impl Key {
    /// Convert a legacy DOM `keyCode`/`which` value.
    ///
    /// ```
    /// use huddle_core::Key;
    ///
    /// assert_eq!(Key::from_code(84), Key::T);
    /// assert_eq!(Key::from_code(999), Key::Unknown(999));
    /// ```
    pub fn from_code(code: u16) -> Self {
        match code {
            8 => Self::Backspace,
            9 => Self::Tab,
            13 => Self::Enter,
            16 => Self::Shift,
            17 => Self::Control,
            18 => Self::Alt,
            27 => Self::Escape,
            32 => Self::Space,
            48..=57 => DIGITS[usize::from(code - 48)],
            65..=90 => LETTERS[usize::from(code - 65)],
            91 | 93 => Self::Meta,
            112..=123 => FUNCTION_KEYS[usize::from(code - 112)],
            other => Self::Unknown(other),
        }
    }

    /// Convert a single character, ignoring case.
    pub fn from_char(ch: char) -> Option<Self> {
        let ch = ch.to_ascii_uppercase();
        match ch {
            'A'..='Z' => Some(LETTERS[(ch as u8 - b'A') as usize]),
            '0'..='9' => Some(DIGITS[(ch as u8 - b'0') as usize]),
            ' ' => Some(Self::Space),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Key({code})"),
            other => {
                let name = format!("{other:?}");
                f.write_str(name.strip_prefix("Digit").unwrap_or(&name))
            }
        }
    }
}

/// Whether a notification reports a key going down or coming up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyEventKind {
    /// A fresh key press.
    #[default]
    Press,
    /// A key or modifier being lifted.
    Release,
}

/// A single key notification from the host's input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    /// The key involved.
    pub key: Key,
    /// Modifiers held at the time of the event.
    pub modifiers: KeyboardModifiers,
    /// Press or release.
    #[serde(default)]
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press.
    pub fn press(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self {
            key,
            modifiers,
            kind: KeyEventKind::Press,
        }
    }

    /// A key release.
    pub fn release(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self {
            key,
            modifiers,
            kind: KeyEventKind::Release,
        }
    }

    /// Whether this is a press notification.
    pub fn is_press(&self) -> bool {
        self.kind == KeyEventKind::Press
    }
}

/// A single key combination: one key with an exact set of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombination {
    /// The primary key.
    pub key: Key,
    /// The modifier keys that must be held.
    pub modifiers: KeyboardModifiers,
}

impl KeyCombination {
    /// Create a new key combination from a key and modifiers.
    pub fn new(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self { key, modifiers }
    }

    /// Create an Alt+key combination.
    pub fn alt(key: Key) -> Self {
        Self::new(key, KeyboardModifiers::ALT)
    }

    /// Create a Ctrl+key combination.
    pub fn ctrl(key: Key) -> Self {
        Self::new(key, KeyboardModifiers::CTRL)
    }

    /// Check if this combination matches the given key and modifiers exactly.
    pub fn matches(&self, key: Key, modifiers: KeyboardModifiers) -> bool {
        self.key == key && self.modifiers == modifiers
    }

    /// Check if `key` is this combination's key and every required modifier
    /// is held. Extra modifiers are allowed.
    pub fn matches_held(&self, key: Key, modifiers: KeyboardModifiers) -> bool {
        self.key == key && modifiers.contains(self.modifiers)
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.modifiers.control {
            parts.push("Ctrl".to_owned());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_owned());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_owned());
        }
        if self.modifiers.meta {
            parts.push("Meta".to_owned());
        }
        parts.push(self.key.to_string());
        write!(f, "{}", parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_letters_and_digits() {
        assert_eq!(Key::from_code(65), Key::A);
        assert_eq!(Key::from_code(84), Key::T);
        assert_eq!(Key::from_code(85), Key::U);
        assert_eq!(Key::from_code(90), Key::Z);
        assert_eq!(Key::from_code(48), Key::Digit0);
        assert_eq!(Key::from_code(57), Key::Digit9);
        assert_eq!(Key::from_code(112), Key::F1);
        assert_eq!(Key::from_code(123), Key::F12);
        assert_eq!(Key::from_code(18), Key::Alt);
        assert_eq!(Key::from_code(200), Key::Unknown(200));
    }

    #[test]
    fn test_from_char() {
        assert_eq!(Key::from_char('t'), Some(Key::T));
        assert_eq!(Key::from_char('T'), Some(Key::T));
        assert_eq!(Key::from_char('7'), Some(Key::Digit7));
        assert_eq!(Key::from_char('%'), None);
    }

    #[test]
    fn test_combination_matches_exact_modifiers() {
        let alt_t = KeyCombination::alt(Key::T);

        assert!(alt_t.matches(Key::T, KeyboardModifiers::ALT));
        assert!(!alt_t.matches(Key::T, KeyboardModifiers::NONE));
        assert!(!alt_t.matches(Key::U, KeyboardModifiers::ALT));
        assert!(!alt_t.matches(
            Key::T,
            KeyboardModifiers {
                alt: true,
                shift: true,
                ..Default::default()
            }
        ));
    }

    #[test]
    fn test_combination_matches_held_allows_extra_modifiers() {
        let alt_t = KeyCombination::alt(Key::T);
        let alt_shift = KeyboardModifiers {
            alt: true,
            shift: true,
            ..Default::default()
        };

        assert!(alt_t.matches_held(Key::T, KeyboardModifiers::ALT));
        assert!(alt_t.matches_held(Key::T, alt_shift));
        assert!(!alt_t.matches_held(Key::T, KeyboardModifiers::SHIFT));
        assert!(!alt_t.matches_held(Key::U, alt_shift));
        assert!(alt_shift.contains(KeyboardModifiers::NONE));
    }

    #[test]
    fn test_combination_display() {
        assert_eq!(KeyCombination::alt(Key::T).to_string(), "Alt+T");
        assert_eq!(KeyCombination::ctrl(Key::Digit1).to_string(), "Ctrl+1");
        assert_eq!(Key::Unknown(7).to_string(), "Key(7)");
    }

    #[test]
    fn test_key_event_deserialize_defaults_to_press() {
        let event: KeyEvent = serde_json::from_str(
            r#"{"key":"T","modifiers":{"shift":false,"control":false,"alt":true,"meta":false}}"#,
        )
        .unwrap();

        assert_eq!(event, KeyEvent::press(Key::T, KeyboardModifiers::ALT));
    }
}
