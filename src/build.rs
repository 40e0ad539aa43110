//! Nesting accepted hierarchies.

use std::collections::BTreeSet;

use tracing::debug;

use crate::detect::{as_expression, Hierarchy};
use crate::parse::{and_operands, strip_quotes};
use crate::{Condition, Expression, FieldValue, InferenceError, Rule};

/// Produce the structured rule list: each hierarchy's parent with its
/// children nested in `more`, in hierarchy order, followed by every rule
/// not named by any hierarchy in its original order.
///
/// Children lose the conditions they share with their parent and any
/// passthrough entries identical to the parent's. A hierarchy with no
/// children passes its parent through unchanged.
///
/// # Errors
///
/// Fails before building anything if an index is out of range or appears
/// twice. A rule that already has children can neither gain more nor
/// become a child.
pub fn build(hierarchies: &[Hierarchy], rules: &[Rule]) -> Result<Vec<Rule>, InferenceError> {
    validate(hierarchies, rules)?;

    let mut placed = vec![false; rules.len()];
    let mut out = Vec::with_capacity(rules.len());

    for hierarchy in hierarchies {
        let parent = &rules[hierarchy.parent];
        let mut structured = parent.clone();
        structured
            .more
            .extend(hierarchy.children.iter().map(|&c| strip_inherited(parent, &rules[c])));
        placed[hierarchy.parent] = true;
        for &c in &hierarchy.children {
            placed[c] = true;
        }
        out.push(structured);
    }

    out.extend(
        rules
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .map(|(_, rule)| rule.clone()),
    );

    debug!(
        hierarchies = hierarchies.len(),
        rules_in = rules.len(),
        rules_out = out.len(),
        "built hierarchies"
    );
    Ok(out)
}

fn validate(hierarchies: &[Hierarchy], rules: &[Rule]) -> Result<(), InferenceError> {
    let len = rules.len();
    let mut seen = BTreeSet::new();
    for hierarchy in hierarchies {
        for &index in std::iter::once(&hierarchy.parent).chain(&hierarchy.children) {
            if index >= len {
                return Err(InferenceError::IndexOutOfRange { index, len });
            }
            if !seen.insert(index) {
                return Err(InferenceError::DuplicateIndex { index });
            }
        }
        if let Some(&index) = hierarchy.children.iter().find(|&&c| !rules[c].more.is_empty()) {
            return Err(InferenceError::NestedChild { index });
        }
        if !hierarchy.children.is_empty() && !rules[hierarchy.parent].more.is_empty() {
            return Err(InferenceError::ReentrantHierarchy {
                index: hierarchy.parent,
            });
        }
    }
    Ok(())
}

/// Copy of `child` without what it would inherit from `parent`.
#[must_use]
pub fn strip_inherited(parent: &Rule, child: &Rule) -> Rule {
    let mut out = child.clone();

    for (field, parent_value) in &parent.conditions {
        let Some(child_value) = out.conditions.get(field) else {
            continue;
        };
        let simplified = match field {
            Condition::Has => simplify_has(parent_value, child_value),
            _ if child_value == parent_value => None,
            _ => Some(child_value.clone()),
        };
        match simplified {
            Some(value) => {
                out.conditions.insert(*field, value);
            }
            None => {
                out.conditions.remove(field);
            }
        }
    }

    out.passthrough
        .retain(|key, value| parent.passthrough.get(key) != Some(&*value));
    out
}

/// Remove the parent's `has` value from the child's. `None` when nothing is
/// left; the child's value unchanged when the parent's is not exactly one
/// of its conjuncts.
#[must_use]
pub fn simplify_has(parent: &FieldValue, child: &FieldValue) -> Option<FieldValue> {
    if parent == child {
        return None;
    }
    let simplified = match (parent, child) {
        (FieldValue::Text(p), FieldValue::Text(c)) => simplify_text(p, c).map(FieldValue::Text),
        (_, FieldValue::Expr(Expression::All(conjuncts))) => {
            as_expression(parent).and_then(|p| remove_conjunct(conjuncts, &p))
        }
        _ => None,
    };
    Some(simplified.unwrap_or_else(|| child.clone()))
}

fn simplify_text(parent: &str, child: &str) -> Option<String> {
    let operands = and_operands(child)?;
    let needle = strip_quotes(parent);
    let (matching, rest): (Vec<&str>, Vec<&str>) = operands
        .into_iter()
        .partition(|operand| strip_quotes(operand) == needle);
    match (matching.len(), rest.as_slice()) {
        (1, [single]) => Some((*single).to_owned()),
        (1, rest) if !rest.is_empty() => Some(format!("({})", rest.join(" AND "))),
        _ => None,
    }
}

fn remove_conjunct(conjuncts: &[Expression], target: &Expression) -> Option<FieldValue> {
    if conjuncts.iter().filter(|c| *c == target).count() != 1 {
        return None;
    }
    let rest: Vec<Expression> = conjuncts.iter().filter(|c| *c != target).cloned().collect();
    Expression::all(rest).ok().map(FieldValue::from)
}
