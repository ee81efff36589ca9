use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use thiserror::Error;

/// One key press, after host-specific decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Ctrl(char),
    Escape,
    Enter,
    Tab,
    Backspace,
}

impl KeyToken {
    /// Maps a terminal key event onto a token; keys the engine has no use
    /// for (alt chords, function keys) map to `None`.
    pub fn from_key_event(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::ALT) {
            return None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(ch) = key.code {
                return Some(KeyToken::Ctrl(ch.to_ascii_lowercase()));
            }
            return None;
        }

        match key.code {
            KeyCode::Char(ch) => Some(KeyToken::Char(ch)),
            KeyCode::Esc => Some(KeyToken::Escape),
            KeyCode::Enter => Some(KeyToken::Enter),
            KeyCode::Tab => Some(KeyToken::Tab),
            KeyCode::Backspace => Some(KeyToken::Backspace),
            _ => None,
        }
    }

    pub fn chars(sequence: &str) -> Vec<KeyToken> {
        sequence.chars().map(KeyToken::Char).collect()
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(ch) => write!(f, "{}", ch),
            KeyToken::Ctrl(ch) => write!(f, "<C-{}>", ch),
            KeyToken::Escape => write!(f, "<esc>"),
            KeyToken::Enter => write!(f, "<cr>"),
            KeyToken::Tab => write!(f, "<tab>"),
            KeyToken::Backspace => write!(f, "<bs>"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized key token: {input}")]
pub struct KeyTokenParseError {
    input: String,
}

impl FromStr for KeyToken {
    type Err = KeyTokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            return Ok(KeyToken::Char(ch));
        }

        match s.to_ascii_lowercase().as_str() {
            "<esc>" | "esc" | "escape" => return Ok(KeyToken::Escape),
            "<cr>" | "<enter>" | "enter" => return Ok(KeyToken::Enter),
            "<tab>" | "tab" => return Ok(KeyToken::Tab),
            "<bs>" | "backspace" => return Ok(KeyToken::Backspace),
            _ => {}
        }

        let lowered = s.to_ascii_lowercase();
        if let Some(body) = lowered.strip_prefix("<c-").and_then(|rest| rest.strip_suffix('>')) {
            let mut body_chars = body.chars();
            if let (Some(ch), None) = (body_chars.next(), body_chars.next()) {
                return Ok(KeyToken::Ctrl(ch));
            }
        }

        Err(KeyTokenParseError {
            input: s.to_string(),
        })
    }
}

/// Named single-character captures produced by a pattern match.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captures(Vec<(&'static str, char)>);

impl Captures {
    pub fn get(&self, name: &str) -> Option<char> {
        self.0
            .iter()
            .find(|(capture_name, _)| *capture_name == name)
            .map(|(_, ch)| *ch)
    }

    fn insert(&mut self, name: &'static str, ch: char) {
        self.0.push((name, ch));
    }
}

/// Tri-state outcome shared by every sequence parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Match(Captures),
    Pending,
    NoMatch,
}

/// Matches one fixed key sequence exactly; any strict non-empty prefix
/// reports `Pending`.
#[derive(Debug, Clone)]
pub struct PrefixParser {
    keys: Vec<KeyToken>,
}

impl PrefixParser {
    pub fn new(keys: Vec<KeyToken>) -> Self {
        Self { keys }
    }

    pub fn parse(&self, pressed: &[KeyToken]) -> KeyMatch {
        if pressed.is_empty() {
            return KeyMatch::NoMatch;
        }
        if pressed == self.keys.as_slice() {
            return KeyMatch::Match(Captures::default());
        }
        if self.keys.starts_with(pressed) {
            return KeyMatch::Pending;
        }
        KeyMatch::NoMatch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAtom {
    Key(KeyToken),
    Capture(&'static str),
}

/// Fixed literal tokens interleaved with named free-character captures,
/// e.g. `f{char}` or `cs{old}{new}`. The full atom list is the complete
/// matcher; every strict prefix of it is the partial matcher.
#[derive(Debug, Clone)]
pub struct PatternParser {
    atoms: Vec<PatternAtom>,
}

impl PatternParser {
    pub fn new(atoms: Vec<PatternAtom>) -> Self {
        Self { atoms }
    }

    pub fn parse(&self, pressed: &[KeyToken]) -> KeyMatch {
        if pressed.is_empty() || pressed.len() > self.atoms.len() {
            return KeyMatch::NoMatch;
        }

        let mut captures = Captures::default();
        for (atom, key) in self.atoms.iter().zip(pressed) {
            match atom {
                PatternAtom::Key(expected) if key == expected => {}
                PatternAtom::Key(_) => return KeyMatch::NoMatch,
                PatternAtom::Capture(name) => match key {
                    KeyToken::Char(ch) => captures.insert(name, *ch),
                    _ => return KeyMatch::NoMatch,
                },
            }
        }

        if pressed.len() == self.atoms.len() {
            KeyMatch::Match(captures)
        } else {
            KeyMatch::Pending
        }
    }
}

#[derive(Debug, Clone)]
pub enum SequenceParser {
    Prefix(PrefixParser),
    Pattern(PatternParser),
}

impl SequenceParser {
    pub fn prefix(sequence: &str) -> Self {
        SequenceParser::Prefix(PrefixParser::new(KeyToken::chars(sequence)))
    }

    pub fn pattern(atoms: Vec<PatternAtom>) -> Self {
        SequenceParser::Pattern(PatternParser::new(atoms))
    }

    pub fn parse(&self, pressed: &[KeyToken]) -> KeyMatch {
        match self {
            SequenceParser::Prefix(parser) => parser.parse(pressed),
            SequenceParser::Pattern(parser) => parser.parse(pressed),
        }
    }
}

pub(crate) fn render_keys(keys: &[KeyToken]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("")
}
