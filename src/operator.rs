use anyhow::Result;
use tracing::{debug, error};

use crate::host::{DocView, DocumentRead, Host, Position, Range, Selection, ViewId, char_to_byte_idx};
use crate::keys::Captures;
use crate::motion::{Motion, advance};
use crate::register::normalize_linewise;
use crate::state::{EngineState, Mode};
use crate::text_object::{TextObject, enclosing_pair, quote_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperatorKind {
    Delete,
    Change,
    Yank,
}

/// What an operator acts upon for one invocation; exactly one variant,
/// constructed by the key-sequence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OperatorArgs {
    Line,
    Motion { name: &'static str },
    TextObject { id: &'static str },
}

pub(crate) struct OperatorCtx<'a> {
    pub host: &'a dyn Host,
    pub view: ViewId,
    pub state: &'a mut EngineState,
    pub motions: &'a [Motion],
    pub text_objects: &'a [TextObject],
}

pub(crate) fn execute(
    ctx: OperatorCtx<'_>,
    kind: OperatorKind,
    args: &OperatorArgs,
    captures: &Captures,
) -> Result<()> {
    let OperatorCtx {
        host,
        view,
        state,
        motions,
        text_objects,
    } = ctx;
    let cursor = primary_position(host, view);
    let doc = DocView { host, view };

    let (range, linewise) = match args {
        OperatorArgs::Line => {
            let range = if kind == OperatorKind::Change {
                // changing a line keeps the line itself; only its content goes
                span_content_range(&doc, cursor.line, cursor.line)
            } else {
                linewise_span_range(&doc, cursor.line, cursor.line)
            };
            (range, true)
        }
        OperatorArgs::TextObject { id } => {
            let Some(object) = text_objects.iter().find(|object| object.id == *id) else {
                debug!("operator referenced unknown text object: {}", id);
                return Ok(());
            };
            match object.resolve(cursor, &doc) {
                Some(range) => (range, false),
                None => {
                    debug!("text object {} resolved to nothing, operator is a no-op", id);
                    return Ok(());
                }
            }
        }
        OperatorArgs::Motion { name } => {
            let Some(motion) = motions.iter().find(|motion| motion.name == *name) else {
                debug!("operator referenced unknown motion: {}", name);
                return Ok(());
            };
            let target = (motion.compute)(cursor, &doc, state, captures);
            let (start, end) = if target >= cursor {
                (cursor, target)
            } else {
                (target, cursor)
            };
            (Range::new(start, end), false)
        }
    };

    if range.is_empty() && !linewise {
        return Ok(());
    }

    let text = range_text(&doc, range);
    let stored = if linewise {
        normalize_linewise(&text).to_string()
    } else {
        text
    };

    match kind {
        OperatorKind::Yank => {
            record_register(state, host, stored, linewise);
        }
        OperatorKind::Delete => {
            host.apply_edit(view, range, "")?;
            record_register(state, host, stored, linewise);
            let doc = DocView { host, view };
            let target = if linewise {
                Position::new(range.start.line.min(doc.last_line()), 0)
            } else {
                doc.clamp_navigable(range.start)
            };
            host.set_selections(view, &[Selection::caret(target)])?;
        }
        OperatorKind::Change => {
            host.apply_edit(view, range, "")?;
            record_register(state, host, stored, linewise);
            host.set_selections(view, &[Selection::caret(range.start)])?;
            state.enter_insert_mode(host);
        }
    }
    Ok(())
}

/// Visual-mode operators act on the live selection; VisualLine spans are
/// linewise with the same boundary rules as a doubled operator key.
pub(crate) fn execute_visual(ctx: OperatorCtx<'_>, kind: OperatorKind) -> Result<()> {
    let OperatorCtx {
        host, view, state, ..
    } = ctx;
    let selection = primary_selection(host, view);
    let linewise = state.mode == Mode::VisualLine;
    let doc = DocView { host, view };

    let range = if linewise {
        let first = selection.anchor.line.min(selection.active.line);
        let last = selection.anchor.line.max(selection.active.line);
        if kind == OperatorKind::Change {
            span_content_range(&doc, first, last)
        } else {
            linewise_span_range(&doc, first, last)
        }
    } else {
        let (start, end_inclusive) = if selection.anchor <= selection.active {
            (selection.anchor, selection.active)
        } else {
            (selection.active, selection.anchor)
        };
        let end = advance(&doc, end_inclusive)
            .unwrap_or(Position::new(end_inclusive.line, end_inclusive.column + 1));
        Range::new(start, end)
    };

    let text = range_text(&doc, range);
    let stored = if linewise {
        normalize_linewise(&text).to_string()
    } else {
        text
    };
    let start_line = selection.anchor.line.min(selection.active.line);

    match kind {
        OperatorKind::Yank => {
            record_register(state, host, stored, linewise);
            let caret = if linewise {
                Position::new(start_line, 0)
            } else {
                doc.clamp_navigable(range.start)
            };
            host.set_selections(view, &[Selection::caret(caret)])?;
            state.enter_normal_mode(host);
        }
        OperatorKind::Delete => {
            host.apply_edit(view, range, "")?;
            record_register(state, host, stored, linewise);
            let doc = DocView { host, view };
            let caret = if linewise {
                Position::new(start_line.min(doc.last_line()), 0)
            } else {
                doc.clamp_navigable(range.start)
            };
            host.set_selections(view, &[Selection::caret(caret)])?;
            state.enter_normal_mode(host);
        }
        OperatorKind::Change => {
            host.apply_edit(view, range, "")?;
            record_register(state, host, stored, linewise);
            host.set_selections(view, &[Selection::caret(range.start)])?;
            state.enter_insert_mode(host);
        }
    }
    Ok(())
}

pub(crate) fn cut_char(ctx: OperatorCtx<'_>) -> Result<()> {
    let OperatorCtx {
        host, view, state, ..
    } = ctx;
    let cursor = primary_position(host, view);
    let doc = DocView { host, view };
    if doc.line_len(cursor.line) == 0 {
        return Ok(());
    }
    let cursor = doc.clamp_navigable(cursor);
    let range = Range::new(cursor, Position::new(cursor.line, cursor.column + 1));
    let text = range_text(&doc, range);
    host.apply_edit(view, range, "")?;
    record_register(state, host, text, false);
    let doc = DocView { host, view };
    host.set_selections(view, &[Selection::caret(doc.clamp_navigable(cursor))])?;
    Ok(())
}

pub(crate) fn paste(ctx: OperatorCtx<'_>, before: bool) -> Result<()> {
    let OperatorCtx {
        host, view, state, ..
    } = ctx;

    // an externally copied clipboard takes precedence over our own entry
    if state.config.sync_clipboard {
        match host.read_clipboard() {
            Ok(clipboard) if !clipboard.is_empty() && state.registers.clipboard_diverged(&clipboard) => {
                state.registers.adopt_external(clipboard);
            }
            Ok(_) => {}
            Err(err) => error!("clipboard read failed: {:#}", err),
        }
    }

    let Some(entry) = state.registers.latest().cloned() else {
        host.show_notice("nothing to paste");
        return Ok(());
    };

    let cursor = primary_position(host, view);
    let doc = DocView { host, view };
    if entry.linewise {
        if before {
            let at = Position::new(cursor.line, 0);
            host.apply_edit(view, Range::new(at, at), &format!("{}\n", entry.text))?;
            host.set_selections(view, &[Selection::caret(at)])?;
        } else {
            let eol = Position::new(cursor.line, doc.line_len(cursor.line));
            host.apply_edit(view, Range::new(eol, eol), &format!("\n{}", entry.text))?;
            host.set_selections(view, &[Selection::caret(Position::new(cursor.line + 1, 0))])?;
        }
    } else {
        let at = if before {
            cursor
        } else {
            Position::new(cursor.line, (cursor.column + 1).min(doc.line_len(cursor.line)))
        };
        host.apply_edit(view, Range::new(at, at), &entry.text)?;
        let caret = if entry.text.contains('\n') {
            at
        } else {
            Position::new(at.line, at.column + entry.text.chars().count().saturating_sub(1))
        };
        host.set_selections(view, &[Selection::caret(caret)])?;
    }
    Ok(())
}

// ── surround ─────────────────────────────────────────────────

pub(crate) fn surround_pair(delim: char) -> (char, char) {
    match delim {
        '(' | ')' => ('(', ')'),
        '[' | ']' => ('[', ']'),
        '{' | '}' => ('{', '}'),
        '<' | '>' => ('<', '>'),
        other => (other, other),
    }
}

pub(crate) fn surround_add(
    ctx: OperatorCtx<'_>,
    args: &OperatorArgs,
    captures: &Captures,
    delim: char,
) -> Result<()> {
    let OperatorCtx {
        host,
        view,
        state,
        motions,
        text_objects,
    } = ctx;
    let cursor = primary_position(host, view);
    let doc = DocView { host, view };

    let range = match args {
        OperatorArgs::Line => span_content_range(&doc, cursor.line, cursor.line),
        OperatorArgs::TextObject { id } => {
            let Some(object) = text_objects.iter().find(|object| object.id == *id) else {
                debug!("surround referenced unknown text object: {}", id);
                return Ok(());
            };
            match object.resolve(cursor, &doc) {
                Some(range) => range,
                None => return Ok(()),
            }
        }
        OperatorArgs::Motion { name } => {
            let Some(motion) = motions.iter().find(|motion| motion.name == *name) else {
                debug!("surround referenced unknown motion: {}", name);
                return Ok(());
            };
            let target = (motion.compute)(cursor, &doc, state, captures);
            let (start, end) = if target >= cursor {
                (cursor, target)
            } else {
                (target, cursor)
            };
            Range::new(start, end)
        }
    };

    wrap_range(host, view, range, delim)
}

pub(crate) fn surround_delete(ctx: OperatorCtx<'_>, delim: char) -> Result<()> {
    let OperatorCtx { host, view, .. } = ctx;
    let cursor = primary_position(host, view);
    let doc = DocView { host, view };
    let Some((open_pos, close_pos)) = enclosing_delim_span(&doc, cursor, delim) else {
        return Ok(());
    };
    host.apply_edit(view, one_char_range(close_pos), "")?;
    host.apply_edit(view, one_char_range(open_pos), "")?;
    let doc = DocView { host, view };
    host.set_selections(view, &[Selection::caret(doc.clamp_navigable(open_pos))])?;
    Ok(())
}

pub(crate) fn surround_change(ctx: OperatorCtx<'_>, old: char, new: char) -> Result<()> {
    let OperatorCtx { host, view, .. } = ctx;
    let cursor = primary_position(host, view);
    let doc = DocView { host, view };
    let Some((open_pos, close_pos)) = enclosing_delim_span(&doc, cursor, old) else {
        return Ok(());
    };
    let (new_open, new_close) = surround_pair(new);
    host.apply_edit(view, one_char_range(close_pos), &new_close.to_string())?;
    host.apply_edit(view, one_char_range(open_pos), &new_open.to_string())?;
    Ok(())
}

pub(crate) fn surround_visual(ctx: OperatorCtx<'_>, delim: char) -> Result<()> {
    let OperatorCtx {
        host, view, state, ..
    } = ctx;
    let selection = primary_selection(host, view);
    let doc = DocView { host, view };
    let (start, end_inclusive) = if selection.anchor <= selection.active {
        (selection.anchor, selection.active)
    } else {
        (selection.active, selection.anchor)
    };
    let end = advance(&doc, end_inclusive)
        .unwrap_or(Position::new(end_inclusive.line, end_inclusive.column + 1));
    wrap_range(host, view, Range::new(start, end), delim)?;
    host.set_selections(view, &[Selection::caret(start)])?;
    state.enter_normal_mode(host);
    Ok(())
}

fn wrap_range(host: &dyn Host, view: ViewId, range: Range, delim: char) -> Result<()> {
    let (open, close) = surround_pair(delim);
    // close first so the open insertion cannot shift it
    host.apply_edit(view, Range::new(range.end, range.end), &close.to_string())?;
    host.apply_edit(view, Range::new(range.start, range.start), &open.to_string())?;
    host.set_selections(view, &[Selection::caret(range.start)])?;
    Ok(())
}

fn enclosing_delim_span(
    doc: &dyn DocumentRead,
    pos: Position,
    delim: char,
) -> Option<(Position, Position)> {
    let (open, close) = surround_pair(delim);
    if open == close {
        quote_span(doc, pos, open)
    } else {
        enclosing_pair(doc, pos, open, close)
    }
}

fn one_char_range(pos: Position) -> Range {
    Range::new(pos, Position::new(pos.line, pos.column + 1))
}

// ── ranges and register plumbing ─────────────────────────────

/// The document range that makes lines `first..=last` disappear whole.
/// A following line donates its start; the last line of the document
/// reaches back for the previous line's newline instead; a whole-document
/// span has no newline to take on either side.
pub(crate) fn linewise_span_range(doc: &dyn DocumentRead, first: usize, last: usize) -> Range {
    let line_count = doc.line_count();
    let last = last.min(line_count.saturating_sub(1));
    let first = first.min(last);
    if last + 1 < line_count {
        Range::new(Position::new(first, 0), Position::new(last + 1, 0))
    } else if first > 0 {
        Range::new(
            Position::new(first - 1, doc.line_len(first - 1)),
            Position::new(last, doc.line_len(last)),
        )
    } else {
        Range::new(Position::new(0, 0), Position::new(last, doc.line_len(last)))
    }
}

fn span_content_range(doc: &dyn DocumentRead, first: usize, last: usize) -> Range {
    Range::new(Position::new(first, 0), Position::new(last, doc.line_len(last)))
}

pub(crate) fn range_text(doc: &dyn DocumentRead, range: Range) -> String {
    if range.start.line == range.end.line {
        let line = doc.line(range.start.line).unwrap_or_default();
        let start = char_to_byte_idx(&line, range.start.column);
        let end = char_to_byte_idx(&line, range.end.column);
        return line[start..end].to_string();
    }
    let mut parts = Vec::new();
    let first = doc.line(range.start.line).unwrap_or_default();
    parts.push(first[char_to_byte_idx(&first, range.start.column)..].to_string());
    for index in range.start.line + 1..range.end.line {
        parts.push(doc.line(index).unwrap_or_default());
    }
    let last = doc.line(range.end.line).unwrap_or_default();
    parts.push(last[..char_to_byte_idx(&last, range.end.column)].to_string());
    parts.join("\n")
}

fn record_register(state: &mut EngineState, host: &dyn Host, text: String, linewise: bool) {
    if state.config.sync_clipboard {
        match host.write_clipboard(&text) {
            Ok(()) => state.registers.note_clipboard(&text),
            Err(err) => error!("clipboard write failed: {:#}", err),
        }
    }
    state.registers.record(text, linewise);
}

pub(crate) fn primary_selection(host: &dyn Host, view: ViewId) -> Selection {
    host.selections(view)
        .first()
        .copied()
        .unwrap_or(Selection::caret(Position::default()))
}

pub(crate) fn primary_position(host: &dyn Host, view: ViewId) -> Position {
    primary_selection(host, view).active
}

#[cfg(test)]
mod tests {
    use super::{OperatorArgs, OperatorCtx, OperatorKind, execute, paste};
    use crate::config::EngineConfig;
    use crate::host::Position;
    use crate::host::memory::MemoryHost;
    use crate::keys::Captures;
    use crate::motion::{Motion, registry as motion_registry};
    use crate::state::{EngineState, Mode};
    use crate::text_object::{TextObject, registry as object_registry};

    struct Fixture {
        host: MemoryHost,
        state: EngineState,
        motions: Vec<Motion>,
        text_objects: Vec<TextObject>,
    }

    fn fixture() -> Fixture {
        Fixture {
            host: MemoryHost::new(),
            state: EngineState::new(EngineConfig::default()),
            motions: motion_registry(),
            text_objects: object_registry(),
        }
    }

    fn run_operator(
        fixture: &mut Fixture,
        text: &str,
        cursor: Position,
        kind: OperatorKind,
        args: OperatorArgs,
    ) {
        let view = fixture.host.open(text);
        fixture.host.set_cursor(view, cursor);
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, kind, &args, &Captures::default()).unwrap();
    }

    fn latest_register(fixture: &Fixture) -> (String, bool) {
        let entry = fixture.state.registers.latest().expect("register written");
        (entry.text.clone(), entry.linewise)
    }

    #[test]
    fn delete_line_in_the_middle_should_take_its_trailing_newline() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline2\nline3");
        fixture.host.set_cursor(view, Position::new(1, 0));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Delete, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline3");
        assert_eq!(latest_register(&fixture), ("line2".to_string(), true));
        assert_eq!(fixture.host.cursor(view), Position::new(1, 0));
    }

    #[test]
    fn delete_last_line_without_trailing_newline_should_reach_back() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline2\nline3");
        fixture.host.set_cursor(view, Position::new(2, 1));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Delete, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline2");
        assert_eq!(latest_register(&fixture), ("line3".to_string(), true));
        assert_eq!(fixture.host.cursor(view), Position::new(1, 0));
    }

    #[test]
    fn delete_last_content_line_of_newline_terminated_file_should_keep_terminator() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline2\nline3\n");
        fixture.host.set_cursor(view, Position::new(2, 0));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Delete, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline2\n");
        assert_eq!(latest_register(&fixture), ("line3".to_string(), true));
    }

    #[test]
    fn delete_the_only_line_should_empty_the_document() {
        let mut fixture = fixture();
        let view = fixture.host.open("only line");
        fixture.host.set_cursor(view, Position::new(0, 4));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Delete, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "");
        assert_eq!(latest_register(&fixture), ("only line".to_string(), true));
    }

    #[test]
    fn yank_line_should_not_mutate_the_document() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline2");
        fixture.host.set_cursor(view, Position::new(0, 3));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Yank, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline2");
        assert_eq!(latest_register(&fixture), ("line1".to_string(), true));
        assert_eq!(fixture.host.clipboard(), "line1");
    }

    #[test]
    fn delete_inner_word_should_leave_surrounding_space() {
        let mut fixture = fixture();
        let view = fixture.host.open("line 3");
        fixture.host.set_cursor(view, Position::new(0, 2));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(
            ctx,
            OperatorKind::Delete,
            &OperatorArgs::TextObject { id: "iw" },
            &Captures::default(),
        )
        .unwrap();

        assert_eq!(fixture.host.text(view), " 3");
    }

    #[test]
    fn delete_around_word_should_take_adjacent_whitespace_too() {
        let mut fixture = fixture();
        let view = fixture.host.open("line 3");
        fixture.host.set_cursor(view, Position::new(0, 2));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(
            ctx,
            OperatorKind::Delete,
            &OperatorArgs::TextObject { id: "aw" },
            &Captures::default(),
        )
        .unwrap();

        assert_eq!(fixture.host.text(view), "3");
    }

    #[test]
    fn unresolved_text_object_should_make_the_operator_a_no_op() {
        let mut fixture = fixture();
        let view = fixture.host.open("no pair here");
        fixture.host.set_cursor(view, Position::new(0, 3));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(
            ctx,
            OperatorKind::Delete,
            &OperatorArgs::TextObject { id: "i(" },
            &Captures::default(),
        )
        .unwrap();

        assert_eq!(fixture.host.text(view), "no pair here");
        assert!(fixture.state.registers.latest().is_none());
    }

    #[test]
    fn delete_with_forward_motion_should_span_cursor_to_target() {
        let mut fixture = fixture();
        let view = fixture.host.open("one two three");
        fixture.host.set_cursor(view, Position::new(0, 0));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(
            ctx,
            OperatorKind::Delete,
            &OperatorArgs::Motion {
                name: "motion.word-forward",
            },
            &Captures::default(),
        )
        .unwrap();

        assert_eq!(fixture.host.text(view), "two three");
        assert_eq!(latest_register(&fixture), ("one ".to_string(), false));
    }

    #[test]
    fn change_line_should_keep_the_line_and_enter_insert() {
        let mut fixture = fixture();
        let view = fixture.host.open("alpha\nbeta");
        fixture.host.set_cursor(view, Position::new(0, 2));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Change, &OperatorArgs::Line, &Captures::default()).unwrap();

        assert_eq!(fixture.host.text(view), "\nbeta");
        assert_eq!(fixture.state.mode, Mode::Insert);
        assert_eq!(latest_register(&fixture), ("alpha".to_string(), true));
        assert_eq!(fixture.host.cursor(view), Position::new(0, 0));
    }

    #[test]
    fn linewise_paste_after_should_open_a_line_below() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline3");
        fixture.host.set_cursor(view, Position::new(0, 0));
        fixture.state.registers.record("line2".to_string(), true);
        // keep the clipboard in agreement so paste uses the register entry
        fixture.host.set_clipboard("line2");
        fixture.state.registers.note_clipboard("line2");
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        paste(ctx, false).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline2\nline3");
        assert_eq!(fixture.host.cursor(view), Position::new(1, 0));
    }

    #[test]
    fn linewise_paste_before_should_open_a_line_above() {
        let mut fixture = fixture();
        let view = fixture.host.open("line2");
        fixture.host.set_cursor(view, Position::new(0, 3));
        fixture.state.registers.record("line1".to_string(), true);
        fixture.host.set_clipboard("line1");
        fixture.state.registers.note_clipboard("line1");
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        paste(ctx, true).unwrap();

        assert_eq!(fixture.host.text(view), "line1\nline2");
        assert_eq!(fixture.host.cursor(view), Position::new(0, 0));
    }

    #[test]
    fn paste_should_adopt_externally_copied_clipboard_text() {
        let mut fixture = fixture();
        let view = fixture.host.open("ab");
        fixture.host.set_cursor(view, Position::new(0, 0));
        fixture.state.registers.record("stale".to_string(), true);
        fixture.host.set_clipboard("external");
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        paste(ctx, false).unwrap();

        assert_eq!(fixture.host.text(view), "aexternalb");
        let entry = fixture.state.registers.latest().unwrap();
        assert_eq!(entry.text, "external");
        assert!(!entry.linewise);
    }

    #[test]
    fn dd_then_p_should_round_trip_the_line() {
        let mut fixture = fixture();
        let view = fixture.host.open("line1\nline2\nline3");
        fixture.host.set_cursor(view, Position::new(1, 0));
        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        execute(ctx, OperatorKind::Delete, &OperatorArgs::Line, &Captures::default()).unwrap();
        assert_eq!(fixture.host.text(view), "line1\nline3");

        let ctx = OperatorCtx {
            host: &fixture.host,
            view,
            state: &mut fixture.state,
            motions: &fixture.motions,
            text_objects: &fixture.text_objects,
        };
        paste(ctx, false).unwrap();
        assert_eq!(fixture.host.text(view), "line1\nline3\nline2");
    }

    #[test]
    fn run_operator_helper_should_not_panic_on_empty_document() {
        let mut fixture = fixture();
        run_operator(
            &mut fixture,
            "",
            Position::new(0, 0),
            OperatorKind::Delete,
            OperatorArgs::Line,
        );
        assert_eq!(latest_register(&fixture), (String::new(), true));
    }
}
