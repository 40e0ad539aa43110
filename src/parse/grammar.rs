use winnow::combinator::{alt, delimited, fail, preceded, repeat, terminated};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

/// One whitespace-separated term with its quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub(super) text: String,
    /// Some part of the term was written inside quotes.
    pub(super) quoted: bool,
}

enum Piece<'i> {
    Quoted(&'i str),
    Bare(&'i str),
}

// -- Term lexer --------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

fn quoted<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .parse_next(input)
}

fn bare<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_till(1.., |c: char| c.is_whitespace() || c == '"' || c == '\'').parse_next(input)
}

// A quote with no closing partner is an ordinary character.
fn stray_quote<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    one_of(['"', '\'']).take().parse_next(input)
}

fn piece<'i>(input: &mut &'i str) -> ModalResult<Piece<'i>> {
    alt((
        quoted.map(Piece::Quoted),
        bare.map(Piece::Bare),
        stray_quote.map(Piece::Bare),
    ))
    .parse_next(input)
}

fn token(input: &mut &str) -> ModalResult<Token> {
    repeat(1.., piece)
        .fold(
            || Token {
                text: String::new(),
                quoted: false,
            },
            |mut tok, piece| {
                match piece {
                    Piece::Quoted(s) => {
                        tok.text.push_str(s);
                        tok.quoted = true;
                    }
                    Piece::Bare(s) => tok.text.push_str(s),
                }
                tok
            },
        )
        .parse_next(input)
}

fn tokens(input: &mut &str) -> ModalResult<Vec<Token>> {
    preceded(ws, repeat(0.., terminated(token, ws))).parse_next(input)
}

/// Whitespace-split `content`, keeping quoted spans together.
pub(super) fn split_tokens(content: &str) -> Vec<Token> {
    match tokens.parse(content) {
        Ok(toks) => toks.into_iter().filter(|t| !t.text.is_empty()).collect(),
        Err(_) => content
            .split_whitespace()
            .map(|w| Token {
                text: w.to_owned(),
                quoted: false,
            })
            .collect(),
    }
}

// -- Top-level structure -----------------------------------------------------

/// Bracket groups nested deeper than this are not decomposed: the opener at
/// the limit takes the rest of the input.
const MAX_NESTING: usize = 64;

const OPENERS: [char; 2] = ['(', '{'];
const CLOSERS: [char; 2] = [')', '}'];

fn is_special(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '{' | ')' | '}')
}

/// One top-level slice of a search string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom<'i> {
    Space(&'i str),
    /// Plain characters, a stray quote or a stray closer.
    Text(&'i str),
    /// A quoted span or a bracket group, never split.
    Shielded(&'i str),
}

impl<'i> Atom<'i> {
    fn as_str(self) -> &'i str {
        match self {
            Atom::Space(s) | Atom::Text(s) | Atom::Shielded(s) => s,
        }
    }
}

/// A closed `(...)` or `{...}` group. Either closer ends either opener.
fn closed_group<'i>(input: &mut &'i str, depth: usize) -> ModalResult<&'i str> {
    if depth >= MAX_NESTING {
        return fail(input);
    }
    (
        one_of(OPENERS),
        |i: &mut &'i str| group_body(i, depth + 1),
        one_of(CLOSERS),
    )
        .take()
        .parse_next(input)
}

fn group_body<'i>(input: &mut &'i str, depth: usize) -> ModalResult<()> {
    repeat(0.., |i: &mut &'i str| group_item(i, depth)).parse_next(input)
}

fn unclosed<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (one_of(OPENERS), take_while(0.., |_: char| true))
        .take()
        .parse_next(input)
}

fn group<'i>(input: &mut &'i str, depth: usize) -> ModalResult<&'i str> {
    alt((|i: &mut &'i str| closed_group(i, depth), unclosed)).parse_next(input)
}

fn group_item<'i>(input: &mut &'i str, depth: usize) -> ModalResult<&'i str> {
    alt((
        quoted.take(),
        |i: &mut &'i str| group(i, depth),
        take_till(1.., is_special),
        stray_quote,
    ))
    .parse_next(input)
}

fn atom<'i>(input: &mut &'i str) -> ModalResult<Atom<'i>> {
    alt((
        take_while(1.., |c: char| c.is_whitespace()).map(Atom::Space),
        quoted.take().map(Atom::Shielded),
        (|i: &mut &'i str| group(i, 0)).map(Atom::Shielded),
        take_till(1.., |c: char| c.is_whitespace() || is_special(c)).map(Atom::Text),
        one_of(['"', '\'', ')', '}']).take().map(Atom::Text),
    ))
    .parse_next(input)
}

/// Top-level atoms of `s` with their byte offsets.
fn atoms(s: &str) -> Vec<(usize, Atom<'_>)> {
    let parsed: Vec<Atom<'_>> = repeat(0.., atom)
        .parse(s)
        .unwrap_or_else(|_| vec![Atom::Text(s)]);
    let mut offset = 0;
    parsed
        .into_iter()
        .map(|a| {
            let at = offset;
            offset += a.as_str().len();
            (at, a)
        })
        .collect()
}

/// Offset of the bracket closing the group that opens at offset 0.
pub(super) fn group_end(s: &str) -> Option<usize> {
    let mut input = s;
    let group = closed_group(&mut input, 0).ok()?;
    Some(group.len() - 1)
}

/// Interior of `s` when a single `open`..`close` group spans all of it.
pub(super) fn enclosed(s: &str, open: char, close: char) -> Option<&str> {
    if s.starts_with(open) && s.ends_with(close) && group_end(s) == Some(s.len() - 1) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

/// `s` opens with a quote whose partner is its last character.
pub(super) fn fully_quoted(s: &str) -> bool {
    quoted.parse(s).is_ok()
}

fn keyword_cuts(s: &str, keyword: &str) -> Vec<(usize, usize)> {
    atoms(s)
        .windows(3)
        .filter_map(|w| match *w {
            [(_, Atom::Space(_)), (at, Atom::Text(word)), (_, Atom::Space(_))]
                if word == keyword =>
            {
                Some((at, at + word.len()))
            }
            _ => None,
        })
        .collect()
}

fn split_at<'a>(s: &'a str, cuts: &[(usize, usize)]) -> Option<Vec<&'a str>> {
    if cuts.is_empty() {
        return None;
    }
    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &(from, to) in cuts {
        pieces.push(s[start..from].trim());
        start = to;
    }
    pieces.push(s[start..].trim());
    if pieces.iter().any(|p| p.is_empty()) {
        None
    } else {
        Some(pieces)
    }
}

/// Whether `keyword` occurs as a standalone word outside quotes and groups.
pub(super) fn has_keyword(s: &str, keyword: &str) -> bool {
    !keyword_cuts(s, keyword).is_empty()
}

/// Splits at every top-level occurrence of `keyword`. `None` when there is
/// nothing to split or a split leaves an empty operand.
pub(super) fn split_keyword<'a>(s: &'a str, keyword: &str) -> Option<Vec<&'a str>> {
    split_at(s, &keyword_cuts(s, keyword))
}

/// Like [`split_keyword`], for a single separator character.
pub(super) fn split_char(s: &str, sep: char) -> Option<Vec<&str>> {
    let cuts: Vec<_> = atoms(s)
        .into_iter()
        .filter_map(|(at, a)| match a {
            Atom::Text(text) => Some((at, text)),
            _ => None,
        })
        .flat_map(|(at, text)| {
            text.match_indices(sep)
                .map(move |(i, m)| (at + i, at + i + m.len()))
        })
        .collect();
    split_at(s, &cuts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &str) -> Vec<String> {
        split_tokens(content).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn tokens_respect_quotes() {
        assert_eq!(texts("\"a b\" c"), vec!["a b", "c"]);
        assert_eq!(texts("'x y'  z  "), vec!["x y", "z"]);
    }

    #[test]
    fn unterminated_quote_is_literal() {
        assert_eq!(texts("\"a b"), vec!["\"a", "b"]);
    }

    #[test]
    fn quoted_flag_tracks_pieces() {
        let toks = split_tokens("plain \"phrase here\" mi\"x\"ed");
        let flags: Vec<_> = toks.iter().map(|t| t.quoted).collect();
        assert_eq!(flags, vec![false, true, true]);
        assert_eq!(toks[2].text, "mixed");
    }

    #[test]
    fn empty_quotes_are_skipped() {
        assert_eq!(texts("\"\" a"), vec!["a"]);
    }

    #[test]
    fn group_end_skips_nested_and_quoted() {
        assert_eq!(group_end("(a (b) c) d"), Some(8));
        assert_eq!(group_end("(a \")\" b)"), Some(8));
        assert_eq!(group_end("(unclosed"), None);
        assert_eq!(group_end("plain"), None);
    }

    #[test]
    fn enclosed_requires_full_span() {
        assert_eq!(enclosed("(a OR b)", '(', ')'), Some("a OR b"));
        assert_eq!(enclosed("(a) OR (b)", '(', ')'), None);
        assert_eq!(enclosed("{a b}", '{', '}'), Some("a b"));
    }

    #[test]
    fn fully_quoted_detection() {
        assert!(fully_quoted("\"a b\""));
        assert!(!fully_quoted("\"a\" OR \"b\""));
        assert!(!fully_quoted("\""));
        assert!(!fully_quoted("a"));
    }

    #[test]
    fn keyword_split_at_top_level_only() {
        assert_eq!(
            split_keyword("a OR (b OR c) OR \"d OR e\"", "OR"),
            Some(vec!["a", "(b OR c)", "\"d OR e\""])
        );
        assert_eq!(split_keyword("ANDROID OR b", "AND"), None);
    }

    #[test]
    fn keyword_split_rejects_empty_operands() {
        assert_eq!(split_keyword("a OR  OR b", "OR"), None);
        assert!(has_keyword("a OR  OR b", "OR"));
    }

    #[test]
    fn atoms_shield_quotes_and_groups() {
        let kinds: Vec<_> = atoms("a (b c) \"d e\" f)")
            .into_iter()
            .map(|(_, a)| a)
            .collect();
        assert_eq!(
            kinds,
            vec![
                Atom::Text("a"),
                Atom::Space(" "),
                Atom::Shielded("(b c)"),
                Atom::Space(" "),
                Atom::Shielded("\"d e\""),
                Atom::Space(" "),
                Atom::Text("f"),
                Atom::Text(")"),
            ]
        );
    }

    #[test]
    fn unclosed_opener_takes_the_rest() {
        assert_eq!(split_keyword("((a OR b", "OR"), None);
        assert_eq!(split_keyword("a) OR (b", "OR"), Some(vec!["a)", "(b"]));
    }

    #[test]
    fn mixed_closers_end_a_group() {
        assert_eq!(group_end("(a}"), Some(2));
        assert_eq!(group_end("{a (b} c)"), Some(8));
    }

    #[test]
    fn deep_nesting_is_not_decomposed() {
        let deep = format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(group_end(&deep), None);
        assert_eq!(split_keyword(&format!("x OR {deep}"), "OR").map(|p| p.len()), Some(2));

        let shallow = format!("{}a{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(group_end(&shallow), Some(shallow.len() - 1));
    }

    #[test]
    fn char_split() {
        assert_eq!(split_char("a|b|c", '|'), Some(vec!["a", "b", "c"]));
        assert_eq!(split_char("|a", '|'), None);
        assert_eq!(split_char("\"a|b\"", '|'), None);
    }
}
