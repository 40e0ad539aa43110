//! Duplicate merging.

use std::collections::HashMap;

use tracing::debug;

use crate::{FieldValue, Rule};

/// Merge rules that are identical apart from their label.
///
/// List-valued fields compare as sets. The first rule of each duplicate set
/// keeps its position and collects every distinct label in first-seen
/// order: one label stays a scalar, several become a list. Returns the
/// merged rules and how many rules were folded away.
#[must_use]
pub fn merge_duplicates(rules: Vec<Rule>) -> (Vec<Rule>, usize) {
    let mut out: Vec<Rule> = Vec::with_capacity(rules.len());
    let mut labels: Vec<Vec<FieldValue>> = Vec::with_capacity(rules.len());
    let mut folded: Vec<bool> = Vec::with_capacity(rules.len());
    let mut index: HashMap<Rule, usize> = HashMap::with_capacity(rules.len());
    let mut merged = 0;

    for rule in rules {
        let key = identity(&rule);
        let incoming = label_items(rule.label.as_ref());
        if let Some(&slot) = index.get(&key) {
            merged += 1;
            folded[slot] = true;
            for label in incoming {
                if !labels[slot].contains(&label) {
                    labels[slot].push(label);
                }
            }
        } else {
            index.insert(key, out.len());
            let mut distinct = Vec::with_capacity(incoming.len());
            for label in incoming {
                if !distinct.contains(&label) {
                    distinct.push(label);
                }
            }
            labels.push(distinct);
            folded.push(false);
            out.push(rule);
        }
    }

    for ((rule, mut collected), folded) in out.iter_mut().zip(labels).zip(folded) {
        if !folded {
            continue;
        }
        rule.label = match collected.len() {
            0 => rule.label.take(),
            1 => collected.pop(),
            _ => Some(FieldValue::List(collected)),
        };
    }
    if merged > 0 {
        debug!(merged, remaining = out.len(), "merged duplicate rules");
    }
    (out, merged)
}

/// The rule with its label removed and its lists in canonical order.
fn identity(rule: &Rule) -> Rule {
    let mut key = rule.clone();
    key.label = None;
    for value in key.conditions.values_mut() {
        *value = value.canonical();
    }
    key
}

fn label_items(label: Option<&FieldValue>) -> Vec<FieldValue> {
    match label {
        None => Vec::new(),
        Some(FieldValue::List(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, Flag};

    fn base() -> Rule {
        Rule::new()
            .condition(Condition::From, "alice@example.com")
            .flag(Flag::Archive, true)
    }

    #[test]
    fn labels_are_unioned() {
        let (rules, merged) = merge_duplicates(vec![base().label("A"), base().label("B")]);
        assert_eq!(merged, 1);
        assert_eq!(rules, vec![base().label(vec!["A", "B"])]);
    }

    #[test]
    fn different_condition_is_not_merged() {
        let other = Rule::new()
            .condition(Condition::From, "bob@example.com")
            .flag(Flag::Archive, true)
            .label("C");
        let (rules, merged) = merge_duplicates(vec![
            base().label("A"),
            other.clone(),
            base().label("B"),
        ]);
        assert_eq!(merged, 1);
        assert_eq!(rules, vec![base().label(vec!["A", "B"]), other]);
    }

    #[test]
    fn repeated_label_stays_scalar() {
        let (rules, merged) = merge_duplicates(vec![base().label("A"), base().label("A")]);
        assert_eq!(merged, 1);
        assert_eq!(rules, vec![base().label("A")]);
    }

    #[test]
    fn list_labels_are_flattened_in_first_seen_order() {
        let (rules, _) = merge_duplicates(vec![
            base().label(vec!["B", "A"]),
            base().label("C"),
            base().label(vec!["A", "D"]),
        ]);
        assert_eq!(rules, vec![base().label(vec!["B", "A", "C", "D"])]);
    }

    #[test]
    fn unlabeled_duplicate_keeps_other_label() {
        let (rules, merged) = merge_duplicates(vec![base(), base().label("A")]);
        assert_eq!(merged, 1);
        assert_eq!(rules, vec![base().label("A")]);
    }

    #[test]
    fn list_conditions_compare_as_sets() {
        let a = Rule::new().condition(Condition::From, vec!["x", "y"]).label("A");
        let b = Rule::new().condition(Condition::From, vec!["y", "x"]).label("B");
        let (rules, merged) = merge_duplicates(vec![a, b]);
        assert_eq!(merged, 1);
        assert_eq!(
            rules[0].conditions[&Condition::From],
            FieldValue::from(vec!["x", "y"])
        );
    }

    #[test]
    fn differing_flags_are_not_merged() {
        let (rules, merged) = merge_duplicates(vec![
            base().label("A"),
            base().flag(Flag::Archive, false).label("B"),
        ]);
        assert_eq!(merged, 0);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn no_duplicates_leaves_rules_untouched() {
        let input = vec![base().label(vec!["A", "A"])];
        let (rules, merged) = merge_duplicates(input.clone());
        assert_eq!(merged, 0);
        assert_eq!(rules, input);
    }
}
