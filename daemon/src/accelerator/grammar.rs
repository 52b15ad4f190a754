//! Accelerator string grammar
//!
//! An accelerator is `Modifier(+Modifier)*+Key`. Tokens are matched
//! case-insensitively against fixed modifier and key vocabularies.
//! Every function here is total: malformed input yields `false` or a
//! best-effort string, never a panic.

use thiserror::Error;

/// Canonical name every command/control synonym folds to
pub const COMMAND_OR_CONTROL: &str = "CommandOrControl";

/// Longest slice of an offending token kept in error messages
const MAX_REPORTED_TOKEN: usize = 32;

/// Named (multi-character) keys, lowercase
const NAMED_KEYS: &[&str] = &[
    "space", "tab", "enter", "return", "backspace", "delete", "insert", "escape", "esc",
    "up", "down", "left", "right", "home", "end", "pageup", "pagedown",
    "plus", "minus", "equal", "comma", "period", "slash", "backslash", "semicolon",
    "quote", "backquote", "bracketleft", "bracketright",
    "numadd", "numsub", "nummult", "numdiv", "numdec",
    "printscreen", "capslock", "numlock", "scrolllock",
    "volumeup", "volumedown", "volumemute",
    "medianexttrack", "mediaprevioustrack", "mediastop", "mediaplaypause",
];

/// Single-character punctuation keys
const PUNCTUATION_KEYS: &[char] = &['-', '=', ',', '.', '/', '\\', ';', '\'', '`', '[', ']'];

/// Reasons an accelerator string is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    #[error("accelerator is empty")]
    Empty,

    #[error("unrecognized token '{0}'")]
    Unrecognized(String),

    #[error("accelerator has no modifier")]
    NoModifier,

    #[error("accelerator has no key, only modifiers")]
    MissingKey,

    #[error("accelerator has more than one key")]
    MultipleKeys,
}

/// Modifier classes after synonym folding.
///
/// The declaration order of the ranked classes is the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ModifierClass {
    CommandOrControl,
    Alt,
    Shift,
    /// Recognized but not folded; kept in encounter order after the ranked ones
    Unranked,
}

impl ModifierClass {
    fn classify(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "commandorcontrol" | "cmdorctrl" | "command" | "cmd" | "control" | "ctrl" | "meta"
            | "super" => Some(Self::CommandOrControl),
            "alt" | "option" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "altgr" => Some(Self::Unranked),
            _ => None,
        }
    }

    fn canonical_name(self) -> Option<&'static str> {
        match self {
            Self::CommandOrControl => Some(COMMAND_OR_CONTROL),
            Self::Alt => Some("Alt"),
            Self::Shift => Some("Shift"),
            Self::Unranked => None,
        }
    }
}

/// Result of splitting an accelerator into classified tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAccelerator {
    /// Modifier tokens in encounter order, as written (trimmed)
    pub modifiers: Vec<String>,
    /// The last recognized key token
    pub key: Option<String>,
    /// Recognized key tokens that were superseded by a later key
    pub dropped_keys: Vec<String>,
    /// Tokens that are neither a modifier nor a key (including empty ones)
    pub unrecognized: Vec<String>,
}

impl ParsedAccelerator {
    /// Number of recognized key tokens, including dropped ones
    pub fn key_count(&self) -> usize {
        self.dropped_keys.len() + usize::from(self.key.is_some())
    }
}

/// Returns true if `token` is in the key vocabulary
pub fn is_key(token: &str) -> bool {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_ascii_alphanumeric() || PUNCTUATION_KEYS.contains(&c);
    }

    let lower = token.to_ascii_lowercase();
    if NAMED_KEYS.contains(&lower.as_str()) {
        return true;
    }

    if let Some(n) = lower.strip_prefix('f') {
        return is_number_in(n, 1, 24);
    }
    if let Some(n) = lower.strip_prefix("num") {
        return is_number_in(n, 0, 9);
    }
    false
}

/// Returns true if `token` is in the modifier vocabulary
pub fn is_modifier(token: &str) -> bool {
    ModifierClass::classify(token).is_some()
}

fn is_number_in(digits: &str, min: u8, max: u8) -> bool {
    // Rejects "+1", leading zeros and anything longer than two digits
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() == 2 && digits.starts_with('0') {
        return false;
    }
    digits.parse::<u8>().map(|n| n >= min && n <= max).unwrap_or(false)
}

/// Split and classify an accelerator.
///
/// When several key tokens appear, the last one wins and the earlier ones
/// land in `dropped_keys`.
pub fn parse(raw: &str) -> ParsedAccelerator {
    let mut parsed = ParsedAccelerator::default();

    for token in raw.split('+').map(str::trim) {
        if is_modifier(token) {
            parsed.modifiers.push(token.to_string());
        } else if is_key(token) {
            if let Some(previous) = parsed.key.replace(token.to_string()) {
                parsed.dropped_keys.push(previous);
            }
        } else {
            parsed.unrecognized.push(token.to_string());
        }
    }

    parsed
}

/// Explain why an accelerator is rejected, if it is
pub fn check(raw: &str) -> Result<(), AcceleratorError> {
    if raw.trim().is_empty() {
        return Err(AcceleratorError::Empty);
    }

    let parsed = parse(raw);
    if let Some(token) = parsed.unrecognized.first() {
        let shown: String = token.chars().take(MAX_REPORTED_TOKEN).collect();
        return Err(AcceleratorError::Unrecognized(shown));
    }
    if parsed.modifiers.is_empty() {
        return Err(AcceleratorError::NoModifier);
    }
    match parsed.key_count() {
        0 => Err(AcceleratorError::MissingKey),
        1 => Ok(()),
        _ => Err(AcceleratorError::MultipleKeys),
    }
}

/// True iff the accelerator has at least one modifier, exactly one key and
/// no unrecognized tokens
pub fn validate(raw: &str) -> bool {
    check(raw).is_ok()
}

/// Produce the canonical form of an accelerator.
///
/// Synonyms are folded and duplicates collapsed. Modifiers are ordered
/// `CommandOrControl, Alt, Shift`, then unranked modifiers in encounter order.
/// Single-character keys are uppercased. Unrecognized tokens are carried
/// through after the modifiers so the output stays best-effort.
pub fn normalize(raw: &str) -> String {
    let parsed = parse(raw);

    let mut ranked: Vec<ModifierClass> = Vec::with_capacity(3);
    let mut unranked: Vec<&str> = Vec::new();

    for modifier in &parsed.modifiers {
        match ModifierClass::classify(modifier) {
            Some(ModifierClass::Unranked) => {
                if !unranked.iter().any(|seen| seen.eq_ignore_ascii_case(modifier)) {
                    unranked.push(modifier);
                }
            }
            Some(class) => {
                if !ranked.contains(&class) {
                    ranked.push(class);
                }
            }
            None => {}
        }
    }
    ranked.sort();

    let mut tokens: Vec<String> = ranked
        .into_iter()
        .filter_map(ModifierClass::canonical_name)
        .map(str::to_string)
        .collect();
    tokens.extend(unranked.into_iter().map(str::to_string));
    tokens.extend(parsed.unrecognized);

    if let Some(key) = parsed.key {
        tokens.push(normalize_key(&key));
    }

    tokens.join("+")
}

fn normalize_key(key: &str) -> String {
    if key.chars().count() == 1 {
        key.to_uppercase()
    } else {
        key.to_string()
    }
}
