use slotmap::new_key_type;

use crate::state::Mode;

pub mod memory;

new_key_type! { pub struct ViewId; }

/// Zero-based line/column position, column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Half-open range: `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    pub fn caret(position: Position) -> Self {
        Self {
            anchor: position,
            active: position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChangeCause {
    Mouse,
    Command,
    /// Produced by this engine's own selection writes.
    Programmatic,
}

impl SelectionChangeCause {
    pub fn is_external(self) -> bool {
        !matches!(self, SelectionChangeCause::Programmatic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChangeCause {
    UndoRedo,
    Edit,
}

/// Host-side happenings the engine reacts to. Delivered through the
/// engine handle so they are serialized with keystrokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    SelectionChanged {
        cause: SelectionChangeCause,
        empty: bool,
    },
    ActiveViewChanged,
    DocumentChanged {
        cause: DocumentChangeCause,
    },
    WillSave,
    ConfigChanged {
        text: String,
    },
}

/// Coarse host-native operations used when no document view exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOp {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    DocumentStart,
    DocumentEnd,
}

/// The host editor as seen by the engine. The engine never mutates text
/// itself; every edit and selection change goes through here.
pub trait Host: Send + Sync {
    /// Absence of a view is a recognized state, not an error.
    fn active_view(&self) -> Option<ViewId>;

    fn line_count(&self, view: ViewId) -> usize;
    fn line_text(&self, view: ViewId, line: usize) -> Option<String>;

    fn selections(&self, view: ViewId) -> Vec<Selection>;
    fn set_selections(&self, view: ViewId, selections: &[Selection]) -> anyhow::Result<()>;

    /// Replace `range` with `replacement`; empty replacement deletes,
    /// empty range inserts.
    fn apply_edit(&self, view: ViewId, range: Range, replacement: &str) -> anyhow::Result<()>;

    fn read_clipboard(&self) -> anyhow::Result<String>;
    fn write_clipboard(&self, text: &str) -> anyhow::Result<()>;

    fn register_action(&self, name: &str);
    fn set_raw_intercept(&self, active: bool);

    fn mode_changed(&self, mode: Mode);
    fn pending_keys_changed(&self, rendered: &str);
    fn show_notice(&self, message: &str);

    fn run_fallback(&self, op: FallbackOp) -> anyhow::Result<()>;
}

/// Read-only view of a document, the context motions and text objects
/// compute against.
pub trait DocumentRead {
    fn line_count(&self) -> usize;
    fn line(&self, index: usize) -> Option<String>;

    fn line_len(&self, index: usize) -> usize {
        self.line(index)
            .map(|line| line.chars().count())
            .unwrap_or(0)
    }

    fn last_line(&self) -> usize {
        self.line_count().saturating_sub(1)
    }

    /// Last column a normal-mode cursor may occupy on `index`.
    fn max_navigable_col(&self, index: usize) -> usize {
        self.line_len(index).max(1) - 1
    }

    fn clamp_navigable(&self, position: Position) -> Position {
        let line = position.line.min(self.last_line());
        Position::new(line, position.column.min(self.max_navigable_col(line)))
    }
}

pub struct DocView<'a> {
    pub host: &'a dyn Host,
    pub view: ViewId,
}

impl DocumentRead for DocView<'_> {
    fn line_count(&self) -> usize {
        self.host.line_count(self.view)
    }

    fn line(&self, index: usize) -> Option<String> {
        self.host.line_text(self.view, index)
    }
}

pub(crate) fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    s.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}
