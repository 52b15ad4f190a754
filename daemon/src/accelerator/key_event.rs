//! Building accelerators from captured key events
//!
//! Windows report key presses in DOM `KeyboardEvent` shape: a physical
//! `code`, a layout-dependent `key` and four modifier flags.

use serde::{Deserialize, Serialize};

use super::grammar::COMMAND_OR_CONTROL;

/// Tracks which modifier keys are held during a key event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Meta/Command/Windows key is held
    pub meta: bool,
    /// Alt/Option key is held
    pub alt: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// Control and Meta both map to the platform command modifier
    pub fn command_or_control(&self) -> bool {
        self.control || self.meta
    }

    /// Modifier tokens in canonical order
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::with_capacity(3);
        if self.command_or_control() {
            tokens.push(COMMAND_OR_CONTROL);
        }
        if self.alt {
            tokens.push("Alt");
        }
        if self.shift {
            tokens.push("Shift");
        }
        tokens
    }
}

/// A key press as reported by a window.
///
/// Every field defaults, so partial or odd payloads still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEvent {
    pub key: String,
    pub code: String,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub alt_key: bool,
    pub shift_key: bool,
}

impl KeyEvent {
    pub fn modifiers(&self) -> ModifierState {
        ModifierState {
            control: self.ctrl_key,
            meta: self.meta_key,
            alt: self.alt_key,
            shift: self.shift_key,
        }
    }
}

/// Physical codes that are modifiers themselves
const MODIFIER_CODES: &[&str] = &[
    "ControlLeft", "ControlRight", "ShiftLeft", "ShiftRight", "AltLeft", "AltRight",
    "MetaLeft", "MetaRight", "OSLeft", "OSRight",
];

/// Logical key values that are modifiers themselves
const MODIFIER_KEYS: &[&str] = &["Control", "Shift", "Alt", "Meta", "OS", "AltGraph"];

/// Derive an accelerator string from a key event.
///
/// Never panics. When the pressed key is itself a modifier the result holds
/// modifiers only and will not validate.
pub fn from_key_event(event: &KeyEvent) -> String {
    let mut parts: Vec<String> = event
        .modifiers()
        .tokens()
        .into_iter()
        .map(str::to_string)
        .collect();

    if let Some(key) = key_token(event) {
        parts.push(key);
    }

    parts.join("+")
}

fn key_token(event: &KeyEvent) -> Option<String> {
    if MODIFIER_CODES.contains(&event.code.as_str()) {
        return None;
    }
    if let Some(token) = code_to_token(&event.code) {
        return Some(token);
    }

    let key = event.key.as_str();
    if key.is_empty() || MODIFIER_KEYS.contains(&key) {
        return None;
    }
    if key.chars().count() == 1 {
        Some(key.to_uppercase())
    } else {
        Some(key.to_string())
    }
}

/// Map a DOM `code` to an accelerator key token
fn code_to_token(code: &str) -> Option<String> {
    if let Some(letter) = code.strip_prefix("Key") {
        if letter.len() == 1 && letter.bytes().all(|b| b.is_ascii_uppercase()) {
            return Some(letter.to_string());
        }
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        if digit.len() == 1 && digit.bytes().all(|b| b.is_ascii_digit()) {
            return Some(digit.to_string());
        }
    }
    if let Some(rest) = code.strip_prefix("Numpad") {
        let token = match rest {
            "Add" => "numadd".to_string(),
            "Subtract" => "numsub".to_string(),
            "Multiply" => "nummult".to_string(),
            "Divide" => "numdiv".to_string(),
            "Decimal" => "numdec".to_string(),
            "Enter" => "Enter".to_string(),
            d if d.len() == 1 && d.bytes().all(|b| b.is_ascii_digit()) => format!("num{}", d),
            _ => return None,
        };
        return Some(token);
    }
    if let Some(n) = code.strip_prefix('F') {
        if let Ok(n) = n.parse::<u8>() {
            if (1..=24).contains(&n) && !code[1..].starts_with('0') {
                return Some(code.to_string());
            }
        }
    }

    let token = match code {
        "Space" => "Space",
        "Enter" => "Enter",
        "Tab" => "Tab",
        "Backspace" => "Backspace",
        "Delete" => "Delete",
        "Insert" => "Insert",
        "Escape" => "Escape",
        "Home" => "Home",
        "End" => "End",
        "PageUp" => "PageUp",
        "PageDown" => "PageDown",
        "ArrowUp" => "Up",
        "ArrowDown" => "Down",
        "ArrowLeft" => "Left",
        "ArrowRight" => "Right",
        "Minus" => "-",
        "Equal" => "=",
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        "Backslash" => "\\",
        "Semicolon" => ";",
        "Quote" => "'",
        "Backquote" => "`",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "PrintScreen" => "PrintScreen",
        _ => return None,
    };
    Some(token.to_string())
}
