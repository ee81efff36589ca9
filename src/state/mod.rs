use tracing::debug;

use crate::config::EngineConfig;
use crate::host::Host;
use crate::keys::KeyToken;
use crate::register::RegisterFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    VisualLine,
}

impl Mode {
    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Visual => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindDistance {
    /// Land on the target character (f/F).
    Nearer,
    /// Stop one position short of it (t/T).
    Further,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindDirection {
    Forward,
    Backward,
}

impl FindDirection {
    pub fn flipped(self) -> Self {
        match self {
            FindDirection::Forward => FindDirection::Backward,
            FindDirection::Backward => FindDirection::Forward,
        }
    }
}

/// The most recent f/F/t/T invocation. Overwritten by each new character
/// search, read but never mutated by the repeat motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindCharState {
    pub target: char,
    pub distance: FindDistance,
    pub direction: FindDirection,
}

/// The one mutable state record for an editing session. Created at
/// activation, torn down at deactivation, passed by reference into every
/// action invocation.
#[derive(Debug)]
pub struct EngineState {
    pub mode: Mode,
    pub pending_keys: Vec<KeyToken>,
    pub registers: RegisterFile,
    pub last_find: Option<FindCharState>,
    pub kept_column: Option<usize>,
    pub config: EngineConfig,
}

impl EngineState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            mode: Mode::Normal,
            pending_keys: Vec::new(),
            registers: RegisterFile::new(),
            last_find: None,
            kept_column: None,
            config,
        }
    }

    pub fn enter_normal_mode(&mut self, host: &dyn Host) {
        self.apply_mode(host, Mode::Normal);
    }

    pub fn enter_insert_mode(&mut self, host: &dyn Host) {
        self.apply_mode(host, Mode::Insert);
    }

    pub fn enter_visual_mode(&mut self, host: &dyn Host) {
        self.apply_mode(host, Mode::Visual);
    }

    pub fn enter_visual_line_mode(&mut self, host: &dyn Host) {
        self.apply_mode(host, Mode::VisualLine);
    }

    pub fn clear_pending(&mut self, host: &dyn Host) {
        if !self.pending_keys.is_empty() {
            self.pending_keys.clear();
        }
        host.pending_keys_changed("");
    }

    /// Transitions are the only way mode changes. Every transition clears
    /// the pending buffer, retargets the raw intercept, and pushes the new
    /// mode to the host's presentation layer.
    fn apply_mode(&mut self, host: &dyn Host, mode: Mode) {
        if self.mode == mode {
            return;
        }
        debug!("mode transition: {} -> {}", self.mode.label(), mode.label());
        self.mode = mode;
        self.clear_pending(host);
        host.set_raw_intercept(mode != Mode::Insert);
        host.mode_changed(mode);
    }
}

#[cfg(test)]
mod tests;
