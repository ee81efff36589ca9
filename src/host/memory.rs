use std::sync::Mutex;

use anyhow::{Context, bail};
use slotmap::SlotMap;

use crate::host::{
    FallbackOp, Host, Position, Range, Selection, ViewId, char_to_byte_idx,
};
use crate::state::Mode;

/// In-memory host used by tests and headless replay. Documents live in a
/// `SlotMap`; all interior state sits behind one mutex so the host can be
/// shared between the engine loop and a driving thread.
pub struct MemoryHost {
    inner: Mutex<MemoryHostInner>,
}

#[derive(Default)]
struct MemoryHostInner {
    views: SlotMap<ViewId, DocumentState>,
    active: Option<ViewId>,
    clipboard: String,
    registered_actions: Vec<String>,
    raw_intercept: bool,
    last_mode: Option<Mode>,
    pending_display: String,
    notices: Vec<String>,
    fallback_ops: Vec<FallbackOp>,
}

struct DocumentState {
    text: String,
    selections: Vec<Selection>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryHostInner::default()),
        }
    }

    /// Opens a document, makes it the active view, caret at the origin.
    pub fn open(&self, text: &str) -> ViewId {
        let mut inner = self.lock();
        let view = inner.views.insert(DocumentState {
            text: text.to_string(),
            selections: vec![Selection::caret(Position::default())],
        });
        inner.active = Some(view);
        view
    }

    pub fn set_active(&self, view: Option<ViewId>) {
        self.lock().active = view;
    }

    pub fn text(&self, view: ViewId) -> String {
        self.lock()
            .views
            .get(view)
            .map(|doc| doc.text.clone())
            .unwrap_or_default()
    }

    pub fn cursor(&self, view: ViewId) -> Position {
        self.selection(view).active
    }

    pub fn set_cursor(&self, view: ViewId, position: Position) {
        if let Some(doc) = self.lock().views.get_mut(view) {
            doc.selections = vec![Selection::caret(position)];
        }
    }

    pub fn selection(&self, view: ViewId) -> Selection {
        self.lock()
            .views
            .get(view)
            .and_then(|doc| doc.selections.first().copied())
            .unwrap_or(Selection::caret(Position::default()))
    }

    pub fn clipboard(&self) -> String {
        self.lock().clipboard.clone()
    }

    pub fn set_clipboard(&self, text: &str) {
        self.lock().clipboard = text.to_string();
    }

    pub fn notices(&self) -> Vec<String> {
        self.lock().notices.clone()
    }

    pub fn fallback_ops(&self) -> Vec<FallbackOp> {
        self.lock().fallback_ops.clone()
    }

    pub fn registered_actions(&self) -> Vec<String> {
        self.lock().registered_actions.clone()
    }

    pub fn raw_intercept(&self) -> bool {
        self.lock().raw_intercept
    }

    pub fn last_mode(&self) -> Option<Mode> {
        self.lock().last_mode
    }

    pub fn pending_display(&self) -> String {
        self.lock().pending_display.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryHostInner> {
        self.inner.lock().expect("memory host lock poisoned")
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn active_view(&self) -> Option<ViewId> {
        self.lock().active
    }

    fn line_count(&self, view: ViewId) -> usize {
        self.lock()
            .views
            .get(view)
            .map(|doc| doc.text.split('\n').count())
            .unwrap_or(0)
    }

    fn line_text(&self, view: ViewId, line: usize) -> Option<String> {
        self.lock()
            .views
            .get(view)?
            .text
            .split('\n')
            .nth(line)
            .map(ToString::to_string)
    }

    fn selections(&self, view: ViewId) -> Vec<Selection> {
        self.lock()
            .views
            .get(view)
            .map(|doc| doc.selections.clone())
            .unwrap_or_default()
    }

    fn set_selections(&self, view: ViewId, selections: &[Selection]) -> anyhow::Result<()> {
        let mut inner = self.lock();
        let doc = inner.views.get_mut(view).context("view does not exist")?;
        let clamped = selections
            .iter()
            .map(|selection| Selection {
                anchor: clamp_to_document(&doc.text, selection.anchor),
                active: clamp_to_document(&doc.text, selection.active),
            })
            .collect::<Vec<_>>();
        if clamped.is_empty() {
            bail!("at least one selection is required");
        }
        doc.selections = clamped;
        Ok(())
    }

    fn apply_edit(&self, view: ViewId, range: Range, replacement: &str) -> anyhow::Result<()> {
        let mut inner = self.lock();
        let doc = inner.views.get_mut(view).context("view does not exist")?;
        let start = byte_offset(&doc.text, range.start).context("edit start out of range")?;
        let end = byte_offset(&doc.text, range.end).context("edit end out of range")?;
        if start > end {
            bail!("edit range is inverted");
        }
        doc.text.replace_range(start..end, replacement);
        doc.selections = doc
            .selections
            .iter()
            .map(|selection| Selection {
                anchor: clamp_to_document(&doc.text, selection.anchor),
                active: clamp_to_document(&doc.text, selection.active),
            })
            .collect();
        Ok(())
    }

    fn read_clipboard(&self) -> anyhow::Result<String> {
        Ok(self.lock().clipboard.clone())
    }

    fn write_clipboard(&self, text: &str) -> anyhow::Result<()> {
        self.lock().clipboard = text.to_string();
        Ok(())
    }

    fn register_action(&self, name: &str) {
        self.lock().registered_actions.push(name.to_string());
    }

    fn set_raw_intercept(&self, active: bool) {
        self.lock().raw_intercept = active;
    }

    fn mode_changed(&self, mode: Mode) {
        self.lock().last_mode = Some(mode);
    }

    fn pending_keys_changed(&self, rendered: &str) {
        self.lock().pending_display = rendered.to_string();
    }

    fn show_notice(&self, message: &str) {
        self.lock().notices.push(message.to_string());
    }

    fn run_fallback(&self, op: FallbackOp) -> anyhow::Result<()> {
        self.lock().fallback_ops.push(op);
        Ok(())
    }
}

fn byte_offset(text: &str, position: Position) -> Option<usize> {
    let mut offset = 0usize;
    for (index, line) in text.split('\n').enumerate() {
        if index == position.line {
            let chars = line.chars().count();
            if position.column > chars {
                return None;
            }
            return Some(offset + char_to_byte_idx(line, position.column));
        }
        offset += line.len() + 1;
    }
    None
}

fn clamp_to_document(text: &str, position: Position) -> Position {
    let line_count = text.split('\n').count();
    let line = position.line.min(line_count.saturating_sub(1));
    let line_chars = text
        .split('\n')
        .nth(line)
        .map(|line_text| line_text.chars().count())
        .unwrap_or(0);
    Position::new(line, position.column.min(line_chars))
}
