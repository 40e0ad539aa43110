//! Boolean search syntax inference.
//!
//! Provider search strings use a loose operator syntax: `a OR b`, `a AND b`,
//! `-a`, `{a b}`, `a|b`, parenthesised groups. [`parse_expression`] turns such
//! a string into an [`Expression`] by trying the recognised shapes from the
//! most to the least specific; the first match wins. Parsing never fails: a
//! string with no recognised operator comes back as a quote-stripped term,
//! and nesting past a fixed depth is kept as literal text.

mod grammar;

use tracing::trace;

use crate::{Condition, Expression, FieldValue, Rule};

use grammar::Token;

/// Parse a field value. Returns [`FieldValue::Text`] when no operator was
/// recognised, [`FieldValue::Expr`] otherwise.
#[must_use]
pub fn parse(raw: &str) -> FieldValue {
    FieldValue::from(parse_expression(raw))
}

/// Parse a search string into an expression tree, falling back to a single
/// [`Expression::Term`].
#[must_use]
pub fn parse_expression(raw: &str) -> Expression {
    expression(raw, 0)
}

/// Operators nested deeper than this are kept as literal text.
const MAX_DEPTH: usize = 64;

fn expression(raw: &str, depth: usize) -> Expression {
    let value = raw.trim();
    if depth >= MAX_DEPTH {
        return Expression::term(strip_quotes(value));
    }
    negated_group(value, depth)
        .or_else(|| group_then_and(value, depth))
        .or_else(|| negation(value, depth))
        .or_else(|| any_of(value, depth))
        .or_else(|| all_of(value, depth))
        .unwrap_or_else(|| Expression::term(strip_quotes(value)))
}

/// Whitespace-split `content`, keeping quoted phrases together and removing
/// their quotes. An unterminated quote is kept as a literal character.
#[must_use]
pub fn split_terms(content: &str) -> Vec<String> {
    grammar::split_tokens(content)
        .into_iter()
        .map(|t| t.text)
        .collect()
}

/// Remove one pair of matching surrounding quotes, if present.
#[must_use]
pub fn strip_quotes(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(value)
}

/// Run the parser over every condition field of `rule`, including the text
/// items of list values. Returns the rewritten rule and the fields that
/// received an expression tree.
#[must_use]
pub fn infer_operators(rule: &Rule) -> (Rule, Vec<Condition>) {
    let mut out = rule.clone();
    let mut inferred = Vec::new();
    for (field, value) in &mut out.conditions {
        let (parsed, changed) = parse_value(value);
        if changed {
            trace!(field = %field, from = %value, to = %parsed, "inferred operators");
            inferred.push(*field);
        }
        *value = parsed;
    }
    (out, inferred)
}

fn parse_value(value: &FieldValue) -> (FieldValue, bool) {
    match value {
        FieldValue::Text(raw) => {
            let parsed = parse(raw);
            let changed = matches!(parsed, FieldValue::Expr(_));
            (parsed, changed)
        }
        FieldValue::List(items) => {
            let mut changed = false;
            let items = items
                .iter()
                .map(|item| {
                    let (parsed, c) = parse_value(item);
                    changed |= c;
                    parsed
                })
                .collect();
            (FieldValue::List(items), changed)
        }
        FieldValue::Expr(_) => (value.clone(), false),
    }
}

/// Operands of an explicit, optionally parenthesised `a AND b` string, in
/// their raw form (quotes kept).
pub(crate) fn and_operands(raw: &str) -> Option<Vec<&str>> {
    grammar::split_keyword(unwrap_parens(raw.trim(), "AND"), "AND")
}

// -- Operands ----------------------------------------------------------------

/// A lone `-` negates nothing; it abandons the shape it appears in.
fn bare_marker(piece: &str) -> bool {
    piece == "-"
}

// A fully quoted operand is a literal phrase and is not parsed further. A
// parenthesised single token loses its parentheses.
fn operand(piece: &str, depth: usize) -> Expression {
    if grammar::fully_quoted(piece) {
        return Expression::term(strip_quotes(piece));
    }
    if let Some(inner) = grammar::enclosed(piece, '(', ')') {
        if let [token] = grammar::split_tokens(inner).as_slice() {
            if token.quoted || !bare_marker(&token.text) {
                return token_operand(token.clone(), depth);
            }
        }
    }
    expression(piece, depth + 1)
}

fn operands(pieces: Vec<&str>, depth: usize) -> Option<Vec<Expression>> {
    if pieces.iter().any(|p| bare_marker(p)) {
        return None;
    }
    Some(pieces.into_iter().map(|p| operand(p, depth)).collect())
}

fn token_operand(token: Token, depth: usize) -> Expression {
    if token.quoted {
        Expression::Term(token.text)
    } else {
        expression(&token.text, depth + 1)
    }
}

fn token_group(content: &str, depth: usize) -> Option<Vec<Expression>> {
    let tokens = grammar::split_tokens(content);
    if tokens.len() < 2 || tokens.iter().any(|t| !t.quoted && bare_marker(&t.text)) {
        return None;
    }
    Some(
        tokens
            .into_iter()
            .map(|t| token_operand(t, depth))
            .collect(),
    )
}

/// Interior of an enclosing `( )` pair, when the interior itself carries
/// `keyword` at its top level.
fn unwrap_parens<'a>(value: &'a str, keyword: &str) -> &'a str {
    match grammar::enclosed(value, '(', ')') {
        Some(inner) if grammar::has_keyword(inner, keyword) => inner.trim(),
        _ => value,
    }
}

// -- Shapes, in detection order ---------------------------------------------

/// `-(...)` and `-{...}`.
fn negated_group(value: &str, depth: usize) -> Option<Expression> {
    let rest = value.strip_prefix('-')?;
    if let Some(inner) = grammar::enclosed(rest, '(', ')') {
        let inner = inner.trim();
        if inner.is_empty() {
            return None;
        }
        // The group keeps its parentheses so `-(-a OR b)` negates an OR.
        return Some(match expression(rest, depth + 1) {
            Expression::Term(_) => !expression(inner, depth + 1),
            grouped => !grouped,
        });
    }
    let inner = grammar::enclosed(rest, '{', '}')?;
    let items = token_group(inner, depth)?;
    Expression::any(items).ok().map(Expression::negate)
}

/// `(x OR y) AND z [AND ...]`
fn group_then_and(value: &str, depth: usize) -> Option<Expression> {
    if !value.starts_with('(') {
        return None;
    }
    let close = grammar::group_end(value)?;
    let group = &value[1..close];
    let rest = &value[close + 1..];
    if !grammar::has_keyword(group, "OR") || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let tail = rest.trim_start().strip_prefix("AND")?;
    if !tail.starts_with(char::is_whitespace) {
        return None;
    }
    let tail = tail.trim();
    let items = if grammar::has_keyword(tail, "AND") {
        grammar::split_keyword(tail, "AND")?
    } else {
        vec![tail]
    };
    if items.iter().any(|p| bare_marker(p)) {
        return None;
    }

    let mut children = vec![any_of(group.trim(), depth)?];
    children.extend(items.into_iter().map(|p| operand(p, depth)));
    Expression::all(children).ok()
}

/// `-term`, recursively parsed unless the remainder is a quoted phrase.
fn negation(value: &str, depth: usize) -> Option<Expression> {
    let rest = value.strip_prefix('-')?.trim();
    if rest.is_empty() || bare_marker(rest) {
        return None;
    }
    Some(!operand(rest, depth))
}

/// `a OR b`, `(a OR b)`, `{a b}`, `a|b`.
fn any_of(value: &str, depth: usize) -> Option<Expression> {
    let body = unwrap_parens(value, "OR");
    if let Some(pieces) = grammar::split_keyword(body, "OR") {
        return Expression::any(operands(pieces, depth)?).ok();
    }
    if let Some(inner) = grammar::enclosed(value, '{', '}') {
        if let Some(items) = token_group(inner, depth) {
            return Expression::any(items).ok();
        }
    }
    let pieces = grammar::split_char(value, '|')?;
    Expression::any(operands(pieces, depth)?).ok()
}

/// `a AND b`, `(a AND b)`, and implicit AND `(a b c)`.
fn all_of(value: &str, depth: usize) -> Option<Expression> {
    let body = unwrap_parens(value, "AND");
    if let Some(pieces) = grammar::split_keyword(body, "AND") {
        return Expression::all(operands(pieces, depth)?).ok();
    }
    let inner = grammar::enclosed(value, '(', ')')?;
    if inner.contains(['(', ')', '{']) || grammar::has_keyword(inner, "OR") {
        return None;
    }
    Expression::all(token_group(inner, depth)?).ok()
}
