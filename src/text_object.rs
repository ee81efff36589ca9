use crate::host::{DocumentRead, Position, Range};
use crate::keys::SequenceParser;
use crate::motion::{CharClass, advance, char_at, classify, retreat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Word { broad: bool },
    Pair { open: char, close: char },
    Quote { quote: char },
}

/// Resolves an id like `iw` or `a(` to a range around a position. Inner
/// and around variants differ only in whether delimiters (or, for words,
/// adjacent whitespace) are included.
pub(crate) struct TextObject {
    pub id: &'static str,
    pub parser: SequenceParser,
    kind: ObjectKind,
    around: bool,
}

impl TextObject {
    pub fn resolve(&self, pos: Position, doc: &dyn DocumentRead) -> Option<Range> {
        match self.kind {
            ObjectKind::Word { broad } => word_range(doc, pos, broad, self.around),
            ObjectKind::Pair { open, close } => {
                let (open_pos, close_pos) = enclosing_pair(doc, pos, open, close)?;
                Some(delimited_range(doc, open_pos, close_pos, self.around))
            }
            ObjectKind::Quote { quote } => {
                let (open_pos, close_pos) = quote_span(doc, pos, quote)?;
                Some(delimited_range(doc, open_pos, close_pos, self.around))
            }
        }
    }
}

pub(crate) fn registry() -> Vec<TextObject> {
    let mut objects = vec![
        word_object("iw", false, false),
        word_object("aw", false, true),
        word_object("iW", true, false),
        word_object("aW", true, true),
    ];
    for (open, close) in [('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')] {
        for delim in [open, close] {
            objects.push(pair_object(open, close, delim, false));
            objects.push(pair_object(open, close, delim, true));
        }
    }
    for quote in ['"', '\'', '`'] {
        objects.push(quote_object(quote, false));
        objects.push(quote_object(quote, true));
    }
    objects
}

fn word_object(id: &'static str, broad: bool, around: bool) -> TextObject {
    TextObject {
        id,
        parser: SequenceParser::prefix(id),
        kind: ObjectKind::Word { broad },
        around,
    }
}

fn pair_object(open: char, close: char, delim: char, around: bool) -> TextObject {
    let id = object_id(around, delim);
    TextObject {
        id,
        parser: SequenceParser::prefix(id),
        kind: ObjectKind::Pair { open, close },
        around,
    }
}

fn quote_object(quote: char, around: bool) -> TextObject {
    let id = object_id(around, quote);
    TextObject {
        id,
        parser: SequenceParser::prefix(id),
        kind: ObjectKind::Quote { quote },
        around,
    }
}

fn object_id(around: bool, delim: char) -> &'static str {
    match (around, delim) {
        (false, '(') => "i(",
        (true, '(') => "a(",
        (false, ')') => "i)",
        (true, ')') => "a)",
        (false, '[') => "i[",
        (true, '[') => "a[",
        (false, ']') => "i]",
        (true, ']') => "a]",
        (false, '{') => "i{",
        (true, '{') => "a{",
        (false, '}') => "i}",
        (true, '}') => "a}",
        (false, '<') => "i<",
        (true, '<') => "a<",
        (false, '>') => "i>",
        (true, '>') => "a>",
        (false, '"') => "i\"",
        (true, '"') => "a\"",
        (false, '\'') => "i'",
        (true, '\'') => "a'",
        (false, '`') => "i`",
        (true, '`') => "a`",
        _ => unreachable!("object id for unknown delimiter"),
    }
}

fn word_range(doc: &dyn DocumentRead, pos: Position, broad: bool, around: bool) -> Option<Range> {
    let line = doc.line(pos.line)?;
    let chars = line.chars().collect::<Vec<_>>();
    if chars.is_empty() {
        return None;
    }

    let col = pos.column.min(chars.len() - 1);
    let class = classify(chars[col], broad);

    let mut start = col;
    while start > 0 && classify(chars[start - 1], broad) == class {
        start -= 1;
    }
    let mut end = col;
    while end + 1 < chars.len() && classify(chars[end + 1], broad) == class {
        end += 1;
    }

    if around && class != CharClass::Whitespace {
        let mut trailing = end;
        while trailing + 1 < chars.len()
            && classify(chars[trailing + 1], broad) == CharClass::Whitespace
        {
            trailing += 1;
        }
        if trailing > end {
            end = trailing;
        } else {
            while start > 0 && classify(chars[start - 1], broad) == CharClass::Whitespace {
                start -= 1;
            }
        }
    }

    Some(Range::new(
        Position::new(pos.line, start),
        Position::new(pos.line, end + 1),
    ))
}

/// Nearest enclosing bracket pair, searched outward across lines. The
/// cursor sitting on either delimiter addresses that pair.
pub(crate) fn enclosing_pair(
    doc: &dyn DocumentRead,
    pos: Position,
    open: char,
    close: char,
) -> Option<(Position, Position)> {
    match char_at(doc, pos) {
        Some(ch) if ch == open => {
            let close_pos = scan_forward_for_close(doc, advance(doc, pos)?, open, close)?;
            Some((pos, close_pos))
        }
        Some(ch) if ch == close => {
            let open_pos = scan_back_for_open(doc, retreat(doc, pos)?, open, close)?;
            Some((open_pos, pos))
        }
        _ => {
            let open_pos = scan_back_for_open(doc, retreat(doc, pos)?, open, close)?;
            let close_pos = scan_forward_for_close(doc, advance(doc, pos)?, open, close)?;
            Some((open_pos, close_pos))
        }
    }
}

fn scan_back_for_open(
    doc: &dyn DocumentRead,
    from: Position,
    open: char,
    close: char,
) -> Option<Position> {
    let mut depth = 0usize;
    let mut cur = Some(from);
    while let Some(pos) = cur {
        match char_at(doc, pos) {
            Some(ch) if ch == close => depth += 1,
            Some(ch) if ch == open => {
                if depth == 0 {
                    return Some(pos);
                }
                depth -= 1;
            }
            _ => {}
        }
        cur = retreat(doc, pos);
    }
    None
}

fn scan_forward_for_close(
    doc: &dyn DocumentRead,
    from: Position,
    open: char,
    close: char,
) -> Option<Position> {
    let mut depth = 0usize;
    let mut cur = Some(from);
    while let Some(pos) = cur {
        match char_at(doc, pos) {
            Some(ch) if ch == open => depth += 1,
            Some(ch) if ch == close => {
                if depth == 0 {
                    return Some(pos);
                }
                depth -= 1;
            }
            _ => {}
        }
        cur = advance(doc, pos);
    }
    None
}

/// Quotes cannot nest, so pairing is positional: occurrences on the
/// current line pair up left to right, and the first pair ending at or
/// after the cursor wins.
pub(crate) fn quote_span(
    doc: &dyn DocumentRead,
    pos: Position,
    quote: char,
) -> Option<(Position, Position)> {
    let line = doc.line(pos.line)?;
    let columns = line
        .chars()
        .enumerate()
        .filter(|(_, ch)| *ch == quote)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    for pair in columns.chunks(2) {
        if let [start, end] = *pair
            && end >= pos.column
        {
            return Some((
                Position::new(pos.line, start),
                Position::new(pos.line, end),
            ));
        }
    }
    None
}

fn delimited_range(
    doc: &dyn DocumentRead,
    open_pos: Position,
    close_pos: Position,
    around: bool,
) -> Range {
    if around {
        let end = advance(doc, close_pos)
            .unwrap_or(Position::new(close_pos.line, close_pos.column + 1));
        Range::new(open_pos, end)
    } else {
        let start = advance(doc, open_pos)
            .unwrap_or(Position::new(open_pos.line, open_pos.column + 1));
        Range::new(start, close_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{TextObject, registry};
    use crate::host::{DocumentRead, Position, Range};

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

    fn object(id: &str) -> TextObject {
        registry()
            .into_iter()
            .find(|object| object.id == id)
            .expect("text object is registered")
    }

    fn resolve(id: &str, text: &str, pos: Position) -> Option<Range> {
        object(id).resolve(pos, &doc(text))
    }

    #[test]
    fn inner_word_should_cover_the_word_only() {
        let range = resolve("iw", "line 3", Position::new(0, 2)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 0), Position::new(0, 4)));
    }

    #[test]
    fn around_word_should_take_trailing_whitespace() {
        let range = resolve("aw", "line 3", Position::new(0, 2)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 0), Position::new(0, 5)));
    }

    #[test]
    fn around_word_should_fall_back_to_leading_whitespace() {
        let range = resolve("aw", "line 3", Position::new(0, 5)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 4), Position::new(0, 6)));
    }

    #[test]
    fn inner_word_should_treat_symbol_run_as_its_own_word() {
        let range = resolve("iw", "a(()b", Position::new(0, 2)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 1), Position::new(0, 4)));
    }

    #[test]
    fn inner_pair_should_exclude_delimiters() {
        let range = resolve("i(", "f(a, b)", Position::new(0, 3)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 2), Position::new(0, 6)));
    }

    #[test]
    fn around_pair_should_include_delimiters() {
        let range = resolve("a(", "f(a, b)", Position::new(0, 3)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 1), Position::new(0, 7)));
    }

    #[test]
    fn pair_resolution_should_respect_nesting() {
        let range = resolve("i(", "(a (b) c)", Position::new(0, 7)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 1), Position::new(0, 8)));
    }

    #[test]
    fn pair_should_resolve_when_cursor_sits_on_a_delimiter() {
        let range = resolve("i(", "(ab)", Position::new(0, 0)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 1), Position::new(0, 3)));
        let range = resolve("i(", "(ab)", Position::new(0, 3)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 1), Position::new(0, 3)));
    }

    #[test]
    fn pair_should_resolve_across_lines() {
        let range = resolve("a{", "fn f() {\n    body\n}", Position::new(1, 5)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 7), Position::new(2, 1)));
    }

    #[test]
    fn unmatched_pair_should_yield_no_range() {
        assert!(resolve("i(", "no brackets here", Position::new(0, 3)).is_none());
        assert!(resolve("i(", "only ( open", Position::new(0, 8)).is_none());
    }

    #[test]
    fn inner_quotes_should_cover_quoted_text() {
        let range = resolve("i\"", "say \"hi\" now", Position::new(0, 5)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 5), Position::new(0, 7)));
    }

    #[test]
    fn around_quotes_should_include_both_quotes() {
        let range = resolve("a\"", "say \"hi\" now", Position::new(0, 5)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 4), Position::new(0, 8)));
    }

    #[test]
    fn quote_pairing_should_be_positional() {
        // cursor between two pairs picks the pair that ends after it
        let range = resolve("i'", "'a' x 'b'", Position::new(0, 4)).unwrap();
        assert_eq!(range, Range::new(Position::new(0, 7), Position::new(0, 8)));
    }

    #[test]
    fn quote_without_closing_partner_should_yield_no_range() {
        assert!(resolve("i\"", "lonely \" quote", Position::new(0, 9)).is_none());
    }
}
