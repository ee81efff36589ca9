use crate::host::{DocumentRead, FallbackOp, Position};
use crate::keys::{Captures, KeyToken, PatternAtom, SequenceParser};
use crate::state::{EngineState, FindCharState, FindDirection, FindDistance};

pub(crate) type MotionFn =
    fn(Position, &dyn DocumentRead, &mut EngineState, &Captures) -> Position;

/// A named motion: its own key-sequence parser, a pure position
/// computation, and an optional coarse host operation for the
/// no-document-view state.
pub(crate) struct Motion {
    pub name: &'static str,
    pub parser: SequenceParser,
    pub compute: MotionFn,
    pub fallback: Option<FallbackOp>,
}

pub(crate) fn registry() -> Vec<Motion> {
    vec![
        fixed("motion.left", "h", left, Some(FallbackOp::Left)),
        fixed("motion.right", "l", right, Some(FallbackOp::Right)),
        fixed("motion.down", "j", down, Some(FallbackOp::Down)),
        fixed("motion.up", "k", up, Some(FallbackOp::Up)),
        fixed("motion.line-start", "0", line_start, Some(FallbackOp::LineStart)),
        fixed("motion.line-end", "$", line_end, Some(FallbackOp::LineEnd)),
        fixed("motion.word-forward", "w", word_forward, None),
        fixed("motion.word-back", "b", word_back, None),
        fixed("motion.word-end", "e", word_end, None),
        fixed("motion.big-word-forward", "W", big_word_forward, None),
        fixed("motion.big-word-back", "B", big_word_back, None),
        fixed("motion.big-word-end", "E", big_word_end, None),
        capture("motion.find-char", 'f', find_forward),
        capture("motion.find-char-back", 'F', find_back),
        capture("motion.till-char", 't', till_forward),
        capture("motion.till-char-back", 'T', till_back),
        fixed("motion.repeat-find", ";", repeat_find, None),
        fixed("motion.repeat-find-reverse", ",", repeat_find_reverse, None),
        fixed("motion.document-start", "gg", document_start, Some(FallbackOp::DocumentStart)),
        fixed("motion.document-end", "G", document_end, Some(FallbackOp::DocumentEnd)),
    ]
}

fn fixed(
    name: &'static str,
    sequence: &str,
    compute: MotionFn,
    fallback: Option<FallbackOp>,
) -> Motion {
    Motion {
        name,
        parser: SequenceParser::prefix(sequence),
        compute,
        fallback,
    }
}

fn capture(name: &'static str, prefix: char, compute: MotionFn) -> Motion {
    Motion {
        name,
        parser: SequenceParser::pattern(vec![
            PatternAtom::Key(KeyToken::Char(prefix)),
            PatternAtom::Capture("char"),
        ]),
        compute,
        fallback: None,
    }
}

// ── horizontal ───────────────────────────────────────────────

fn left(pos: Position, _doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    if pos.column > 0 {
        Position::new(pos.line, pos.column - 1)
    } else {
        pos
    }
}

fn right(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    Position::new(
        pos.line,
        (pos.column + 1).min(doc.max_navigable_col(pos.line)),
    )
}

fn line_start(
    pos: Position,
    _doc: &dyn DocumentRead,
    state: &mut EngineState,
    _: &Captures,
) -> Position {
    state.kept_column = None;
    Position::new(pos.line, 0)
}

fn line_end(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    Position::new(pos.line, doc.max_navigable_col(pos.line))
}

// ── vertical, column-preserving across short lines ───────────

fn down(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    let line = (pos.line + 1).min(doc.last_line());
    vertical_to_line(pos, doc, state, line)
}

fn up(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    vertical_to_line(pos, doc, state, pos.line.saturating_sub(1))
}

fn document_start(
    pos: Position,
    doc: &dyn DocumentRead,
    state: &mut EngineState,
    _: &Captures,
) -> Position {
    vertical_to_line(pos, doc, state, 0)
}

fn document_end(
    pos: Position,
    doc: &dyn DocumentRead,
    state: &mut EngineState,
    _: &Captures,
) -> Position {
    vertical_to_line(pos, doc, state, doc.last_line())
}

/// Keeps the originally requested column alive across lines too short to
/// hold it; the memory dies the moment a motion lands on its column.
fn vertical_to_line(
    pos: Position,
    doc: &dyn DocumentRead,
    state: &mut EngineState,
    line: usize,
) -> Position {
    let requested = state.kept_column.unwrap_or(pos.column);
    let column = requested.min(doc.max_navigable_col(line));
    state.kept_column = if column < requested {
        Some(requested)
    } else {
        None
    };
    Position::new(line, column)
}

// ── word motions ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Whitespace,
    Word,
    Symbol,
}

pub(crate) fn classify(ch: char, broad: bool) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Whitespace
    } else if broad || ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Symbol
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordTarget {
    NextStart,
    RunEnd,
    PrevStart,
}

fn word_forward(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, false, WordTarget::NextStart)
}

fn word_back(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, false, WordTarget::PrevStart)
}

fn word_end(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, false, WordTarget::RunEnd)
}

fn big_word_forward(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, true, WordTarget::NextStart)
}

fn big_word_back(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, true, WordTarget::PrevStart)
}

fn big_word_end(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    state.kept_column = None;
    scan_word(doc, pos, true, WordTarget::RunEnd)
}

/// The one boundary-scanning primitive behind all six word motions,
/// parameterized by the class predicate (`broad` treats every non-blank
/// as one class) and the scan target.
fn scan_word(doc: &dyn DocumentRead, pos: Position, broad: bool, target: WordTarget) -> Position {
    match target {
        WordTarget::NextStart => {
            let mut cur = pos;
            if let Some(start_class) = class_at(doc, pos, broad)
                && start_class != CharClass::Whitespace
            {
                while let Some(next) = advance(doc, cur) {
                    cur = next;
                    if class_at(doc, cur, broad) != Some(start_class) {
                        break;
                    }
                }
            }
            while class_at(doc, cur, broad) == Some(CharClass::Whitespace) {
                match advance(doc, cur) {
                    Some(next) => cur = next,
                    None => break,
                }
            }
            doc.clamp_navigable(cur)
        }
        WordTarget::RunEnd => {
            let mut cur = match advance(doc, pos) {
                Some(next) => next,
                None => return doc.clamp_navigable(pos),
            };
            while class_at(doc, cur, broad) == Some(CharClass::Whitespace) {
                match advance(doc, cur) {
                    Some(next) => cur = next,
                    None => return doc.clamp_navigable(cur),
                }
            }
            let Some(class) = class_at(doc, cur, broad) else {
                return doc.clamp_navigable(cur);
            };
            while let Some(next) = advance(doc, cur) {
                if class_at(doc, next, broad) == Some(class) {
                    cur = next;
                } else {
                    break;
                }
            }
            cur
        }
        WordTarget::PrevStart => {
            let mut cur = match retreat(doc, pos) {
                Some(prev) => prev,
                None => return pos,
            };
            while class_at(doc, cur, broad) == Some(CharClass::Whitespace) {
                match retreat(doc, cur) {
                    Some(prev) => cur = prev,
                    None => return doc.clamp_navigable(cur),
                }
            }
            let Some(class) = class_at(doc, cur, broad) else {
                return doc.clamp_navigable(cur);
            };
            while let Some(prev) = retreat(doc, cur) {
                if class_at(doc, prev, broad) == Some(class) {
                    cur = prev;
                } else {
                    break;
                }
            }
            doc.clamp_navigable(cur)
        }
    }
}

fn class_at(doc: &dyn DocumentRead, pos: Position, broad: bool) -> Option<CharClass> {
    char_at(doc, pos).map(|ch| classify(ch, broad))
}

// ── character search ─────────────────────────────────────────

fn find_forward(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, caps: &Captures) -> Position {
    run_find(pos, doc, state, caps, FindDirection::Forward, FindDistance::Nearer)
}

fn find_back(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, caps: &Captures) -> Position {
    run_find(pos, doc, state, caps, FindDirection::Backward, FindDistance::Nearer)
}

fn till_forward(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, caps: &Captures) -> Position {
    run_find(pos, doc, state, caps, FindDirection::Forward, FindDistance::Further)
}

fn till_back(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, caps: &Captures) -> Position {
    run_find(pos, doc, state, caps, FindDirection::Backward, FindDistance::Further)
}

fn run_find(
    pos: Position,
    doc: &dyn DocumentRead,
    state: &mut EngineState,
    caps: &Captures,
    direction: FindDirection,
    distance: FindDistance,
) -> Position {
    let Some(target) = caps.get("char") else {
        return pos;
    };
    let find = FindCharState {
        target,
        distance,
        direction,
    };
    match find_target(doc, pos, find) {
        Some(found) => {
            state.last_find = Some(find);
            state.kept_column = None;
            found
        }
        None => pos,
    }
}

fn repeat_find(pos: Position, doc: &dyn DocumentRead, state: &mut EngineState, _: &Captures) -> Position {
    let Some(find) = state.last_find else {
        return pos;
    };
    match find_target(doc, pos, find) {
        Some(found) => {
            state.kept_column = None;
            found
        }
        None => pos,
    }
}

fn repeat_find_reverse(
    pos: Position,
    doc: &dyn DocumentRead,
    state: &mut EngineState,
    _: &Captures,
) -> Position {
    let Some(find) = state.last_find else {
        return pos;
    };
    let reversed = FindCharState {
        direction: find.direction.flipped(),
        ..find
    };
    match find_target(doc, pos, reversed) {
        Some(found) => {
            state.kept_column = None;
            found
        }
        None => pos,
    }
}

/// Character search constrained to the current line. `Further` stops one
/// position short of the target in the search direction.
fn find_target(doc: &dyn DocumentRead, pos: Position, find: FindCharState) -> Option<Position> {
    let line = doc.line(pos.line)?;
    let chars = line.chars().collect::<Vec<_>>();
    match find.direction {
        FindDirection::Forward => {
            let mut idx = pos.column + 1;
            while idx < chars.len() {
                if chars[idx] == find.target {
                    let column = match find.distance {
                        FindDistance::Nearer => idx,
                        FindDistance::Further => idx - 1,
                    };
                    return Some(Position::new(pos.line, column));
                }
                idx += 1;
            }
            None
        }
        FindDirection::Backward => {
            let mut idx = pos.column.min(chars.len());
            while idx > 0 {
                idx -= 1;
                if chars[idx] == find.target {
                    let column = match find.distance {
                        FindDistance::Nearer => idx,
                        FindDistance::Further => idx + 1,
                    };
                    return Some(Position::new(pos.line, column));
                }
            }
            None
        }
    }
}

// ── document scanning primitives ─────────────────────────────

/// The character at `pos`; the slot one past the end of a non-final line
/// reads as the newline that separates it from the next.
pub(crate) fn char_at(doc: &dyn DocumentRead, pos: Position) -> Option<char> {
    let line = doc.line(pos.line)?;
    if let Some(ch) = line.chars().nth(pos.column) {
        return Some(ch);
    }
    if pos.column == line.chars().count() && pos.line + 1 < doc.line_count() {
        return Some('\n');
    }
    None
}

pub(crate) fn advance(doc: &dyn DocumentRead, pos: Position) -> Option<Position> {
    let len = doc.line_len(pos.line);
    if pos.column < len {
        let next = pos.column + 1;
        if next < len || pos.line + 1 < doc.line_count() {
            return Some(Position::new(pos.line, next));
        }
        return None;
    }
    if pos.line + 1 < doc.line_count() {
        return Some(Position::new(pos.line + 1, 0));
    }
    None
}

pub(crate) fn retreat(doc: &dyn DocumentRead, pos: Position) -> Option<Position> {
    if pos.column > 0 {
        return Some(Position::new(pos.line, pos.column - 1));
    }
    if pos.line > 0 {
        return Some(Position::new(pos.line - 1, doc.line_len(pos.line - 1)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{Motion, registry};
    use crate::config::EngineConfig;
    use crate::host::{DocumentRead, Position};
    use crate::keys::{Captures, KeyMatch, KeyToken};
    use crate::state::{EngineState, FindDirection};

    struct Doc(Vec<String>);

    impl DocumentRead for Doc {
        fn line_count(&self) -> usize {
            self.0.len()
        }

        fn line(&self, index: usize) -> Option<String> {
            self.0.get(index).cloned()
        }
    }

    fn doc(text: &str) -> Doc {
        Doc(text.split('\n').map(ToString::to_string).collect())
    }

    fn state() -> EngineState {
        EngineState::new(EngineConfig::default())
    }

    fn motion(name: &str) -> Motion {
        registry()
            .into_iter()
            .find(|motion| motion.name == name)
            .expect("motion is registered")
    }

    fn run(name: &str, text: &str, pos: Position, state: &mut EngineState) -> Position {
        let document = doc(text);
        (motion(name).compute)(pos, &document, state, &Captures::default())
    }

    fn run_keys(name: &str, keys: &str, text: &str, pos: Position, state: &mut EngineState) -> Position {
        let document = doc(text);
        let motion = motion(name);
        let KeyMatch::Match(captures) = motion.parser.parse(&KeyToken::chars(keys)) else {
            panic!("keys {:?} do not match {}", keys, name);
        };
        (motion.compute)(pos, &document, state, &captures)
    }

    #[test]
    fn right_should_stop_at_last_character() {
        let mut state = state();
        let pos = run("motion.right", "abc", Position::new(0, 2), &mut state);
        assert_eq!(pos, Position::new(0, 2));
    }

    #[test]
    fn left_should_not_cross_to_previous_line() {
        let mut state = state();
        let pos = run("motion.left", "ab\ncd", Position::new(1, 0), &mut state);
        assert_eq!(pos, Position::new(1, 0));
    }

    #[test]
    fn down_then_up_should_restore_kept_column() {
        let mut state = state();
        let mid = run("motion.down", "abcd\nx\nabcd", Position::new(0, 3), &mut state);
        assert_eq!(mid, Position::new(1, 0));
        assert_eq!(state.kept_column, Some(3));

        let back = run("motion.up", "abcd\nx\nabcd", mid, &mut state);
        assert_eq!(back, Position::new(0, 3));
        assert_eq!(state.kept_column, None);
    }

    #[test]
    fn horizontal_motion_should_drop_kept_column() {
        let mut state = state();
        let mid = run("motion.down", "abcd\nx\nabcd", Position::new(0, 3), &mut state);
        assert_eq!(state.kept_column, Some(3));
        let _ = run("motion.left", "abcd\nx\nabcd", mid, &mut state);
        assert_eq!(state.kept_column, None);
    }

    #[test]
    fn word_forward_should_land_on_next_word_start() {
        let mut state = state();
        let pos = run("motion.word-forward", "one two", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 4));
    }

    #[test]
    fn word_forward_should_stop_at_symbol_run() {
        let mut state = state();
        let pos = run("motion.word-forward", "foo(bar)", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 3));
    }

    #[test]
    fn big_word_forward_should_ignore_symbol_boundaries() {
        let mut state = state();
        let pos = run("motion.big-word-forward", "foo(bar) baz", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 9));
    }

    #[test]
    fn word_forward_should_cross_line_boundary() {
        let mut state = state();
        let pos = run("motion.word-forward", "one\ntwo", Position::new(0, 2), &mut state);
        assert_eq!(pos, Position::new(1, 0));
    }

    #[test]
    fn word_end_should_land_on_last_character_of_next_run() {
        let mut state = state();
        let pos = run("motion.word-end", "one two", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 2));
    }

    #[test]
    fn word_back_should_land_on_run_start() {
        let mut state = state();
        let pos = run("motion.word-back", "one two", Position::new(0, 5), &mut state);
        assert_eq!(pos, Position::new(0, 4));
        let pos = run("motion.word-back", "one two", pos, &mut state);
        assert_eq!(pos, Position::new(0, 0));
    }

    #[test]
    fn find_char_should_land_on_target_and_record_state() {
        let mut state = state();
        let pos = run_keys("motion.find-char", "f3", "line 3", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 5));
        let recorded = state.last_find.expect("find state recorded");
        assert_eq!(recorded.target, '3');
        assert_eq!(recorded.direction, FindDirection::Forward);
    }

    #[test]
    fn till_char_should_stop_one_position_short() {
        let mut state = state();
        let pos = run_keys("motion.till-char", "t3", "line 3", Position::new(0, 0), &mut state);
        assert_eq!(pos, Position::new(0, 4));
    }

    #[test]
    fn failed_find_should_not_move_or_record() {
        let mut state = state();
        let pos = run_keys("motion.find-char", "fz", "line 3", Position::new(0, 2), &mut state);
        assert_eq!(pos, Position::new(0, 2));
        assert!(state.last_find.is_none());
    }

    #[test]
    fn repeat_find_should_reuse_recorded_search() {
        let mut state = state();
        let first = run_keys("motion.find-char", "fa", "a_a_a", Position::new(0, 0), &mut state);
        assert_eq!(first, Position::new(0, 2));
        let second = run("motion.repeat-find", "a_a_a", first, &mut state);
        assert_eq!(second, Position::new(0, 4));
    }

    #[test]
    fn repeat_reverse_should_flip_direction_without_mutating_state() {
        let mut state = state();
        let found = run_keys("motion.find-char", "fa", "a_a_a", Position::new(0, 0), &mut state);
        assert_eq!(found, Position::new(0, 2));
        let back = run("motion.repeat-find-reverse", "a_a_a", found, &mut state);
        assert_eq!(back, Position::new(0, 0));
        assert_eq!(
            state.last_find.expect("still recorded").direction,
            FindDirection::Forward
        );
    }

    #[test]
    fn repeat_reverse_twice_should_be_identity_when_nothing_precedes() {
        let mut state = state();
        let found = run_keys("motion.find-char", "fx", "_x__", Position::new(0, 0), &mut state);
        assert_eq!(found, Position::new(0, 1));
        let once = run("motion.repeat-find-reverse", "_x__", found, &mut state);
        let twice = run("motion.repeat-find-reverse", "_x__", once, &mut state);
        assert_eq!(twice, found);
    }

    #[test]
    fn repeat_without_recorded_search_should_be_a_no_op() {
        let mut state = state();
        let pos = run("motion.repeat-find", "abc", Position::new(0, 1), &mut state);
        assert_eq!(pos, Position::new(0, 1));
    }

    #[test]
    fn document_motions_should_jump_to_first_and_last_line() {
        let mut state = state();
        let top = run_keys("motion.document-start", "gg", "a\nb\nc", Position::new(2, 0), &mut state);
        assert_eq!(top, Position::new(0, 0));
        let bottom = run("motion.document-end", "a\nb\nc", top, &mut state);
        assert_eq!(bottom, Position::new(2, 0));
    }
}
