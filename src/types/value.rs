use std::collections::BTreeSet;
use std::fmt;

use super::expr::Expression;

/// Value held by a condition field or the label action.
///
/// `List` items are `Text` or `Expr`; ingestion rejects nested lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldValue {
    /// A raw provider string, or a parsed string with no operators.
    Text(String),
    /// Several values for the same field.
    List(Vec<FieldValue>),
    /// A parsed boolean expression.
    Expr(Expression),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_expr(&self) -> Option<&Expression> {
        match self {
            FieldValue::Expr(e) => Some(e),
            _ => None,
        }
    }

    /// Every textual leaf: the text itself, list items, or expression terms.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(t) => vec![t.as_str()],
            FieldValue::List(items) => items.iter().flat_map(FieldValue::texts).collect(),
            FieldValue::Expr(e) => e.terms(),
        }
    }

    /// Equality where list values compare as sets.
    #[must_use]
    pub fn set_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::List(a), FieldValue::List(b)) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            _ => self == other,
        }
    }

    /// Copy with list items sorted and de-duplicated, so set-equal values compare equal.
    pub(crate) fn canonical(&self) -> FieldValue {
        match self {
            FieldValue::List(items) => {
                let set: BTreeSet<&FieldValue> = items.iter().collect();
                FieldValue::List(set.into_iter().cloned().collect())
            }
            other => other.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// A bare `Term` is plain text, so it normalizes to `Text`.
impl From<Expression> for FieldValue {
    fn from(e: Expression) -> Self {
        match e {
            Expression::Term(t) => FieldValue::Text(t),
            other => FieldValue::Expr(other),
        }
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(t) => write!(f, "{t}"),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            FieldValue::Expr(e) => write!(f, "{e}"),
        }
    }
}
