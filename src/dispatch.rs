use tracing::{debug, error, trace, warn};

use crate::host::{DocView, DocumentRead, Host, Position, Selection, ViewId};
use crate::keys::{Captures, KeyMatch, KeyToken, PatternAtom, SequenceParser, render_keys};
use crate::motion::{Motion, registry as motion_registry};
use crate::operator::{self, OperatorArgs, OperatorCtx, OperatorKind};
use crate::state::{EngineState, Mode};
use crate::text_object::{TextObject, registry as object_registry};

const NORMAL_ONLY: &[Mode] = &[Mode::Normal];
const VISUAL_MODES: &[Mode] = &[Mode::Visual, Mode::VisualLine];
const MOTION_MODES: &[Mode] = &[Mode::Normal, Mode::Visual, Mode::VisualLine];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchOutcome {
    Executed,
    ExecutedViaFallback,
    Pending,
    NoMatch,
    /// Keys arriving while the raw intercept is off (insert mode) are the
    /// host's to handle.
    Ignored,
}

impl DispatchOutcome {
    pub(crate) fn is_executed(self) -> bool {
        matches!(
            self,
            DispatchOutcome::Executed | DispatchOutcome::ExecutedViaFallback
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertEntry {
    Here,
    Append,
    LineStart,
    LineEnd,
    OpenBelow,
    OpenAbove,
}

enum ActionKind {
    Motion(usize),
    Operator { kind: OperatorKind, key: KeyToken },
    VisualOperator(OperatorKind),
    SurroundAdd,
    SurroundDelete,
    SurroundChange,
    SurroundVisual,
    Insert(InsertEntry),
    VisualToggle { line: bool },
    Paste { before: bool },
    CutChar,
}

/// One dispatch-level unit: a parser, a mode gate, and what to do on a
/// full match.
struct Action {
    name: &'static str,
    modes: &'static [Mode],
    /// `None` for composite kinds that stage their own parsing.
    parser: Option<SequenceParser>,
    kind: ActionKind,
}

impl Action {
    fn parse(&self, keys: &[KeyToken]) -> KeyMatch {
        match &self.parser {
            Some(parser) => parser.parse(keys),
            None => KeyMatch::NoMatch,
        }
    }
}

/// Tries registered actions against the pending key sequence in fixed
/// priority order; the first full match wins. The order of the action
/// list is part of the dispatch contract.
pub(crate) struct Dispatcher {
    actions: Vec<Action>,
    motions: Vec<Motion>,
    text_objects: Vec<TextObject>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        let motions = motion_registry();
        let text_objects = object_registry();
        let mut actions = Vec::new();

        actions.push(Action {
            name: "surround.visual-wrap",
            modes: VISUAL_MODES,
            parser: Some(SequenceParser::pattern(vec![
                PatternAtom::Key(KeyToken::Char('S')),
                PatternAtom::Capture("delim"),
            ])),
            kind: ActionKind::SurroundVisual,
        });
        for (name, key, kind) in [
            ("visual.delete", 'd', OperatorKind::Delete),
            ("visual.change", 'c', OperatorKind::Change),
            ("visual.yank", 'y', OperatorKind::Yank),
        ] {
            actions.push(Action {
                name,
                modes: VISUAL_MODES,
                parser: Some(SequenceParser::Prefix(crate::keys::PrefixParser::new(
                    vec![KeyToken::Char(key)],
                ))),
                kind: ActionKind::VisualOperator(kind),
            });
        }

        actions.push(Action {
            name: "surround.add",
            modes: NORMAL_ONLY,
            parser: None,
            kind: ActionKind::SurroundAdd,
        });
        actions.push(Action {
            name: "surround.delete",
            modes: NORMAL_ONLY,
            parser: Some(SequenceParser::pattern(vec![
                PatternAtom::Key(KeyToken::Char('d')),
                PatternAtom::Key(KeyToken::Char('s')),
                PatternAtom::Capture("delim"),
            ])),
            kind: ActionKind::SurroundDelete,
        });
        actions.push(Action {
            name: "surround.change",
            modes: NORMAL_ONLY,
            parser: Some(SequenceParser::pattern(vec![
                PatternAtom::Key(KeyToken::Char('c')),
                PatternAtom::Key(KeyToken::Char('s')),
                PatternAtom::Capture("old"),
                PatternAtom::Capture("new"),
            ])),
            kind: ActionKind::SurroundChange,
        });

        for (name, key, kind) in [
            ("operator.delete", 'd', OperatorKind::Delete),
            ("operator.change", 'c', OperatorKind::Change),
            ("operator.yank", 'y', OperatorKind::Yank),
        ] {
            actions.push(Action {
                name,
                modes: NORMAL_ONLY,
                parser: None,
                kind: ActionKind::Operator {
                    kind,
                    key: KeyToken::Char(key),
                },
            });
        }

        actions.push(Action {
            name: "edit.cut-char",
            modes: NORMAL_ONLY,
            parser: Some(SequenceParser::prefix("x")),
            kind: ActionKind::CutChar,
        });
        actions.push(Action {
            name: "edit.paste-after",
            modes: NORMAL_ONLY,
            parser: Some(SequenceParser::prefix("p")),
            kind: ActionKind::Paste { before: false },
        });
        actions.push(Action {
            name: "edit.paste-before",
            modes: NORMAL_ONLY,
            parser: Some(SequenceParser::prefix("P")),
            kind: ActionKind::Paste { before: true },
        });

        for (name, key, entry) in [
            ("insert.here", "i", InsertEntry::Here),
            ("insert.append", "a", InsertEntry::Append),
            ("insert.line-start", "I", InsertEntry::LineStart),
            ("insert.line-end", "A", InsertEntry::LineEnd),
            ("insert.open-below", "o", InsertEntry::OpenBelow),
            ("insert.open-above", "O", InsertEntry::OpenAbove),
        ] {
            actions.push(Action {
                name,
                modes: NORMAL_ONLY,
                parser: Some(SequenceParser::prefix(key)),
                kind: ActionKind::Insert(entry),
            });
        }

        actions.push(Action {
            name: "visual.enter",
            modes: MOTION_MODES,
            parser: Some(SequenceParser::prefix("v")),
            kind: ActionKind::VisualToggle { line: false },
        });
        actions.push(Action {
            name: "visual.enter-line",
            modes: MOTION_MODES,
            parser: Some(SequenceParser::prefix("V")),
            kind: ActionKind::VisualToggle { line: true },
        });

        for index in 0..motions.len() {
            actions.push(Action {
                name: motions[index].name,
                modes: MOTION_MODES,
                parser: None,
                kind: ActionKind::Motion(index),
            });
        }

        Self {
            actions,
            motions,
            text_objects,
        }
    }

    pub(crate) fn action_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|action| action.name)
    }

    pub(crate) fn handle_key(
        &self,
        state: &mut EngineState,
        host: &dyn Host,
        token: KeyToken,
    ) -> DispatchOutcome {
        trace!("key: {}", token);
        if token == KeyToken::Escape {
            return self.handle_escape(state, host);
        }
        if state.mode == Mode::Insert {
            return DispatchOutcome::Ignored;
        }

        state.pending_keys.push(token);
        let keys = state.pending_keys.clone();
        let view = host.active_view();

        let mut any_pending = false;
        for action in &self.actions {
            if !action.modes.contains(&state.mode) {
                continue;
            }
            let outcome = self.try_action(action, &keys, state, host, view);
            match outcome {
                DispatchOutcome::Executed | DispatchOutcome::ExecutedViaFallback => {
                    state.clear_pending(host);
                    return outcome;
                }
                DispatchOutcome::Pending => any_pending = true,
                _ => {}
            }
        }

        if any_pending {
            host.pending_keys_changed(&render_keys(&state.pending_keys));
            return DispatchOutcome::Pending;
        }

        let rendered = render_keys(&state.pending_keys);
        state.clear_pending(host);
        debug!("key sequence dead-ended: {}", rendered);
        if state.config.notify_unmatched {
            host.show_notice(&format!("no matching command: {}", rendered));
        }
        DispatchOutcome::NoMatch
    }

    /// Escape never reaches the action list: it cancels pending keys and
    /// drops visual/insert back to normal, collapsing selections.
    fn handle_escape(&self, state: &mut EngineState, host: &dyn Host) -> DispatchOutcome {
        state.clear_pending(host);
        match state.mode {
            Mode::Insert | Mode::Visual | Mode::VisualLine => {
                if let Some(view) = host.active_view() {
                    let active = operator::primary_selection(host, view).active;
                    let doc = DocView { host, view };
                    let caret = doc.clamp_navigable(active);
                    if let Err(err) = host.set_selections(view, &[Selection::caret(caret)]) {
                        warn!("collapse selection failed: {:#}", err);
                    }
                }
                state.enter_normal_mode(host);
            }
            Mode::Normal => {}
        }
        DispatchOutcome::Executed
    }

    fn try_action(
        &self,
        action: &Action,
        keys: &[KeyToken],
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        match &action.kind {
            ActionKind::Motion(index) => self.try_motion(*index, keys, state, host, view),
            ActionKind::Operator { kind, key } => {
                self.try_operator(*kind, *key, keys, state, host, view)
            }
            ActionKind::VisualOperator(kind) => {
                match action.parse(keys) {
                    KeyMatch::Match(_) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::execute_visual(ctx, *kind), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::SurroundAdd => self.try_surround_add(keys, state, host, view),
            ActionKind::SurroundDelete => {
                match action.parse(keys) {
                    KeyMatch::Match(captures) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let Some(delim) = captures.get("delim") else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::surround_delete(ctx, delim), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::SurroundChange => {
                match action.parse(keys) {
                    KeyMatch::Match(captures) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let (Some(old), Some(new)) = (captures.get("old"), captures.get("new"))
                        else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::surround_change(ctx, old, new), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::SurroundVisual => {
                match action.parse(keys) {
                    KeyMatch::Match(captures) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let Some(delim) = captures.get("delim") else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::surround_visual(ctx, delim), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::Insert(entry) => {
                match action.parse(keys) {
                    KeyMatch::Match(_) => self.run_insert_entry(*entry, state, host, view),
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::VisualToggle { line } => {
                match action.parse(keys) {
                    KeyMatch::Match(_) => self.run_visual_toggle(*line, state, host, view),
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::Paste { before } => {
                match action.parse(keys) {
                    KeyMatch::Match(_) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::paste(ctx, *before), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
            ActionKind::CutChar => {
                match action.parse(keys) {
                    KeyMatch::Match(_) => {
                        let Some(view) = view else {
                            return DispatchOutcome::NoMatch;
                        };
                        let ctx = self.ctx(state, host, view);
                        complete(operator::cut_char(ctx), action.name)
                    }
                    KeyMatch::Pending => DispatchOutcome::Pending,
                    KeyMatch::NoMatch => DispatchOutcome::NoMatch,
                }
            }
        }
    }

    fn try_motion(
        &self,
        index: usize,
        keys: &[KeyToken],
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        let motion = &self.motions[index];
        match motion.parser.parse(keys) {
            KeyMatch::NoMatch => DispatchOutcome::NoMatch,
            KeyMatch::Pending => DispatchOutcome::Pending,
            KeyMatch::Match(captures) => {
                let Some(view) = view else {
                    // degraded: no document view, only coarse host ops work
                    let Some(op) = motion.fallback else {
                        return DispatchOutcome::NoMatch;
                    };
                    if let Err(err) = host.run_fallback(op) {
                        error!("fallback for {} failed: {:#}", motion.name, err);
                    }
                    return DispatchOutcome::ExecutedViaFallback;
                };
                let doc = DocView { host, view };
                match state.mode {
                    Mode::Normal => {
                        let cursor =
                            doc.clamp_navigable(operator::primary_position(host, view));
                        let target = (motion.compute)(cursor, &doc, state, &captures);
                        if let Err(err) =
                            host.set_selections(view, &[Selection::caret(target)])
                        {
                            error!("motion {} failed to move cursor: {:#}", motion.name, err);
                        }
                    }
                    Mode::Visual | Mode::VisualLine => {
                        let selection = operator::primary_selection(host, view);
                        let cursor = doc.clamp_navigable(selection.active);
                        let target = (motion.compute)(cursor, &doc, state, &captures);
                        let extended = visual_selection(
                            &doc,
                            selection.anchor,
                            target,
                            state.mode == Mode::VisualLine,
                        );
                        if let Err(err) = host.set_selections(view, &[extended]) {
                            error!("motion {} failed to extend selection: {:#}", motion.name, err);
                        }
                    }
                    Mode::Insert => {}
                }
                DispatchOutcome::Executed
            }
        }
    }

    /// Operator composition: the operator key, then whichever of
    /// {doubled key, text object, motion} the following keys resolve to.
    fn try_operator(
        &self,
        kind: OperatorKind,
        key: KeyToken,
        keys: &[KeyToken],
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        if keys.first() != Some(&key) {
            return DispatchOutcome::NoMatch;
        }
        let target = &keys[1..];
        if target.is_empty() {
            return DispatchOutcome::Pending;
        }
        let Some(view) = view else {
            return DispatchOutcome::NoMatch;
        };

        if target.len() == 1 && target[0] == key {
            let ctx = self.ctx(state, host, view);
            return complete(
                operator::execute(ctx, kind, &OperatorArgs::Line, &Captures::default()),
                "operator doubled key",
            );
        }

        let mut any_pending = false;
        for object in &self.text_objects {
            match object.parser.parse(target) {
                KeyMatch::Match(_) => {
                    let ctx = self.ctx(state, host, view);
                    return complete(
                        operator::execute(
                            ctx,
                            kind,
                            &OperatorArgs::TextObject { id: object.id },
                            &Captures::default(),
                        ),
                        object.id,
                    );
                }
                KeyMatch::Pending => any_pending = true,
                KeyMatch::NoMatch => {}
            }
        }
        for motion in &self.motions {
            match motion.parser.parse(target) {
                KeyMatch::Match(captures) => {
                    let ctx = self.ctx(state, host, view);
                    return complete(
                        operator::execute(
                            ctx,
                            kind,
                            &OperatorArgs::Motion { name: motion.name },
                            &captures,
                        ),
                        motion.name,
                    );
                }
                KeyMatch::Pending => any_pending = true,
                KeyMatch::NoMatch => {}
            }
        }

        if any_pending {
            DispatchOutcome::Pending
        } else {
            DispatchOutcome::NoMatch
        }
    }

    /// `ys{target}{delim}` and `yss{delim}`: the target grammar is reused
    /// from the operator layer, with one trailing delimiter capture.
    fn try_surround_add(
        &self,
        keys: &[KeyToken],
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        if keys[0] != KeyToken::Char('y') {
            return DispatchOutcome::NoMatch;
        }
        let Some(second) = keys.get(1) else {
            return DispatchOutcome::Pending;
        };
        if *second != KeyToken::Char('s') {
            return DispatchOutcome::NoMatch;
        }
        let rest = &keys[2..];
        if rest.is_empty() {
            return DispatchOutcome::Pending;
        }
        let Some(view) = view else {
            return DispatchOutcome::NoMatch;
        };

        if rest[0] == KeyToken::Char('s') {
            return match rest.len() {
                1 => DispatchOutcome::Pending,
                2 => {
                    let KeyToken::Char(delim) = rest[1] else {
                        return DispatchOutcome::NoMatch;
                    };
                    let ctx = self.ctx(state, host, view);
                    complete(
                        operator::surround_add(
                            ctx,
                            &OperatorArgs::Line,
                            &Captures::default(),
                            delim,
                        ),
                        "surround.add",
                    )
                }
                _ => DispatchOutcome::NoMatch,
            };
        }

        let mut any_pending = false;
        for split in 1..=rest.len() {
            let (target, tail) = rest.split_at(split);
            for object in &self.text_objects {
                match object.parser.parse(target) {
                    KeyMatch::Match(_) if tail.len() == 1 => {
                        let KeyToken::Char(delim) = tail[0] else {
                            continue;
                        };
                        let ctx = self.ctx(state, host, view);
                        return complete(
                            operator::surround_add(
                                ctx,
                                &OperatorArgs::TextObject { id: object.id },
                                &Captures::default(),
                                delim,
                            ),
                            "surround.add",
                        );
                    }
                    KeyMatch::Match(_) if tail.is_empty() => any_pending = true,
                    KeyMatch::Pending if tail.is_empty() => any_pending = true,
                    _ => {}
                }
            }
            for motion in &self.motions {
                match motion.parser.parse(target) {
                    KeyMatch::Match(captures) if tail.len() == 1 => {
                        let KeyToken::Char(delim) = tail[0] else {
                            continue;
                        };
                        let ctx = self.ctx(state, host, view);
                        return complete(
                            operator::surround_add(
                                ctx,
                                &OperatorArgs::Motion { name: motion.name },
                                &captures,
                                delim,
                            ),
                            "surround.add",
                        );
                    }
                    KeyMatch::Match(_) if tail.is_empty() => any_pending = true,
                    KeyMatch::Pending if tail.is_empty() => any_pending = true,
                    _ => {}
                }
            }
        }

        if any_pending {
            DispatchOutcome::Pending
        } else {
            DispatchOutcome::NoMatch
        }
    }

    fn run_insert_entry(
        &self,
        entry: InsertEntry,
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        let Some(view) = view else {
            return DispatchOutcome::NoMatch;
        };
        let doc = DocView { host, view };
        let cursor = operator::primary_position(host, view);
        let result: anyhow::Result<()> = (|| {
            match entry {
                InsertEntry::Here => {}
                InsertEntry::Append => {
                    let caret = Position::new(
                        cursor.line,
                        (cursor.column + 1).min(doc.line_len(cursor.line)),
                    );
                    host.set_selections(view, &[Selection::caret(caret)])?;
                }
                InsertEntry::LineStart => {
                    let line = doc.line(cursor.line).unwrap_or_default();
                    let column = line
                        .chars()
                        .position(|ch| !ch.is_whitespace())
                        .unwrap_or(0);
                    host.set_selections(
                        view,
                        &[Selection::caret(Position::new(cursor.line, column))],
                    )?;
                }
                InsertEntry::LineEnd => {
                    let caret = Position::new(cursor.line, doc.line_len(cursor.line));
                    host.set_selections(view, &[Selection::caret(caret)])?;
                }
                InsertEntry::OpenBelow => {
                    let eol = Position::new(cursor.line, doc.line_len(cursor.line));
                    host.apply_edit(view, crate::host::Range::new(eol, eol), "\n")?;
                    host.set_selections(
                        view,
                        &[Selection::caret(Position::new(cursor.line + 1, 0))],
                    )?;
                }
                InsertEntry::OpenAbove => {
                    let bol = Position::new(cursor.line, 0);
                    host.apply_edit(view, crate::host::Range::new(bol, bol), "\n")?;
                    host.set_selections(
                        view,
                        &[Selection::caret(Position::new(cursor.line, 0))],
                    )?;
                }
            }
            Ok(())
        })();
        if let Err(err) = result {
            error!("insert entry failed: {:#}", err);
        }
        state.enter_insert_mode(host);
        DispatchOutcome::Executed
    }

    fn run_visual_toggle(
        &self,
        line: bool,
        state: &mut EngineState,
        host: &dyn Host,
        view: Option<ViewId>,
    ) -> DispatchOutcome {
        let Some(view) = view else {
            return DispatchOutcome::NoMatch;
        };
        let doc = DocView { host, view };
        let selection = operator::primary_selection(host, view);
        match (state.mode, line) {
            (Mode::Normal, false) => state.enter_visual_mode(host),
            (Mode::Normal, true) | (Mode::Visual, true) => {
                let snapped =
                    visual_selection(&doc, selection.anchor, selection.active, true);
                if let Err(err) = host.set_selections(view, &[snapped]) {
                    warn!("snap selection to lines failed: {:#}", err);
                }
                state.enter_visual_line_mode(host);
            }
            (Mode::Visual, false) | (Mode::VisualLine, true) => {
                let caret = doc.clamp_navigable(selection.active);
                if let Err(err) = host.set_selections(view, &[Selection::caret(caret)]) {
                    warn!("collapse selection failed: {:#}", err);
                }
                state.enter_normal_mode(host);
            }
            (Mode::VisualLine, false) => state.enter_visual_mode(host),
            (Mode::Insert, _) => return DispatchOutcome::NoMatch,
        }
        DispatchOutcome::Executed
    }

    fn ctx<'a>(
        &'a self,
        state: &'a mut EngineState,
        host: &'a dyn Host,
        view: ViewId,
    ) -> OperatorCtx<'a> {
        OperatorCtx {
            host,
            view,
            state,
            motions: &self.motions,
            text_objects: &self.text_objects,
        }
    }
}

fn visual_selection(
    doc: &dyn DocumentRead,
    anchor: Position,
    active: Position,
    line_mode: bool,
) -> Selection {
    if !line_mode {
        return Selection { anchor, active };
    }
    if active.line >= anchor.line {
        Selection {
            anchor: Position::new(anchor.line, 0),
            active: Position::new(active.line, doc.line_len(active.line)),
        }
    } else {
        Selection {
            anchor: Position::new(anchor.line, doc.line_len(anchor.line)),
            active: Position::new(active.line, 0),
        }
    }
}

fn complete(result: anyhow::Result<()>, what: &str) -> DispatchOutcome {
    if let Err(err) = result {
        error!("{} failed: {:#}", what, err);
    }
    DispatchOutcome::Executed
}
