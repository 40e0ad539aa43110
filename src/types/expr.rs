use std::fmt;
use std::ops::Not;

use super::error::ModelError;

/// Boolean search expression inferred from a provider search string.
///
/// `Any` and `All` always hold at least two children; the [`Expression::any`]
/// and [`Expression::all`] constructors collapse a single child to the child
/// itself. A `Term` never carries its surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    Term(String),
    Any(Vec<Expression>),
    All(Vec<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    #[must_use]
    pub fn term(text: impl Into<String>) -> Expression {
        Expression::Term(text.into())
    }

    /// Logical OR over `children`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyGroup`] when `children` is empty.
    pub fn any(children: Vec<Expression>) -> Result<Expression, ModelError> {
        group(children, "any", Expression::Any)
    }

    /// Logical AND over `children`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyGroup`] when `children` is empty.
    pub fn all(children: Vec<Expression>) -> Result<Expression, ModelError> {
        group(children, "all", Expression::All)
    }

    #[must_use]
    pub fn negate(self) -> Expression {
        Expression::Not(Box::new(self))
    }

    /// Leaf texts in left-to-right order.
    #[must_use]
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Term(t) => out.push(t),
            Expression::Any(children) | Expression::All(children) => {
                for child in children {
                    child.collect_terms(out);
                }
            }
            Expression::Not(inner) => inner.collect_terms(out),
        }
    }

    /// One-line description of what was inferred.
    #[must_use]
    pub fn explain(&self) -> String {
        match self {
            Expression::Term(t) => format!("no operators, kept as: {t}"),
            Expression::Any(children) => format!("OR pattern: any of [{}]", join(children)),
            Expression::All(children) => format!("AND pattern: all of [{}]", join(children)),
            Expression::Not(inner) => match inner.as_ref() {
                Expression::Term(t) => format!("NOT pattern: exclude {t}"),
                nested => format!("NOT pattern with nested {}", nested.explain()),
            },
        }
    }
}

fn group(
    mut children: Vec<Expression>,
    kind: &'static str,
    wrap: fn(Vec<Expression>) -> Expression,
) -> Result<Expression, ModelError> {
    match children.len() {
        0 => Err(ModelError::EmptyGroup { kind }),
        1 => Ok(children.remove(0)),
        _ => Ok(wrap(children)),
    }
}

fn join(children: &[Expression]) -> String {
    children
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        self.negate()
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression::Term(text.to_owned())
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Expression::Term(text)
    }
}

/// Whether a term must be quoted to survive re-parsing as a single literal.
fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text == "OR"
        || text == "AND"
        || text.starts_with('-')
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '{' | '}' | '|'))
}

fn write_term(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if !needs_quoting(text) {
        write!(f, "{text}")
    } else if !text.contains('"') {
        write!(f, "\"{text}\"")
    } else if !text.contains('\'') {
        write!(f, "'{text}'")
    } else {
        write!(f, "{text}")
    }
}

/// Canonical search-syntax rendering; parsing it yields the same expression.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Term(t) => write_term(f, t),
            Expression::Any(children) => write_group(f, children, "OR"),
            Expression::All(children) => write_group(f, children, "AND"),
            Expression::Not(inner) => write!(f, "-{inner}"),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Expression], op: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
