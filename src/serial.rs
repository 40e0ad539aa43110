//! Textual rule form.
//!
//! Rules travel as JSON-shaped mappings, the same shape a YAML front end
//! would produce:
//!
//! ```text
//! - from: {any: [alice@example.com, bob@example.com]}
//!   has: "-unsubscribe"
//!   label: Team
//!   archive: true
//!   _gmail_raw: {sizeOperator: s_sl}
//!   more:
//!     - subject: standup
//!       label: Team/Standup
//! ```
//!
//! An expression is a plain string (a term) or a single-key mapping
//! `{any: [..]}`, `{all: [..]}`, `{not: expr}`. The serde impls for
//! [`Rule`], [`FieldValue`] and [`Expression`] go through private mirror
//! types so the runtime model stays free of wire concerns. Provider data the
//! model does not know belongs in `_gmail_raw`; any other unknown key is
//! rejected.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{Condition, Expression, FieldValue, FilterfoldError, Flag, ModelError, Rule};

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SerializedExpr {
    Term(String),
    Op(SerializedOp),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SerializedOp {
    Any(Vec<SerializedExpr>),
    All(Vec<SerializedExpr>),
    Not(Box<SerializedExpr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SerializedValue {
    Text(String),
    List(Vec<SerializedValue>),
    Expr(SerializedOp),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SerializedRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    does_not_have: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list: Option<SerializedValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    archive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not_archive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not_important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spam: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not_spam: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unread: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    star: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unstar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trash: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    forward: Option<String>,

    #[serde(rename = "_gmail_raw", default, skip_serializing_if = "BTreeMap::is_empty")]
    gmail_raw: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    more: Vec<SerializedRule>,
}

impl SerializedRule {
    fn condition_slot(&mut self, field: Condition) -> &mut Option<SerializedValue> {
        match field {
            Condition::From => &mut self.from,
            Condition::To => &mut self.to,
            Condition::Subject => &mut self.subject,
            Condition::Has => &mut self.has,
            Condition::DoesNotHave => &mut self.does_not_have,
            Condition::List => &mut self.list,
        }
    }

    fn flag_slot(&mut self, flag: Flag) -> &mut Option<bool> {
        match flag {
            Flag::Archive => &mut self.archive,
            Flag::NotArchive => &mut self.not_archive,
            Flag::Important => &mut self.important,
            Flag::NotImportant => &mut self.not_important,
            Flag::Spam => &mut self.spam,
            Flag::NotSpam => &mut self.not_spam,
            Flag::Read => &mut self.read,
            Flag::Unread => &mut self.unread,
            Flag::Star => &mut self.star,
            Flag::Unstar => &mut self.unstar,
            Flag::Delete => &mut self.delete,
            Flag::Trash => &mut self.trash,
        }
    }
}

// ---------------------------------------------------------------------------
// Expression conversion
// ---------------------------------------------------------------------------

fn serialize_expr(expr: &Expression) -> SerializedExpr {
    match expr {
        Expression::Term(t) => SerializedExpr::Term(t.clone()),
        Expression::Any(children) => {
            SerializedExpr::Op(SerializedOp::Any(children.iter().map(serialize_expr).collect()))
        }
        Expression::All(children) => {
            SerializedExpr::Op(SerializedOp::All(children.iter().map(serialize_expr).collect()))
        }
        Expression::Not(inner) => {
            SerializedExpr::Op(SerializedOp::Not(Box::new(serialize_expr(inner))))
        }
    }
}

fn deserialize_expr(expr: SerializedExpr) -> Result<Expression, ModelError> {
    match expr {
        SerializedExpr::Term(t) => Ok(Expression::Term(t)),
        SerializedExpr::Op(op) => deserialize_op(op),
    }
}

fn deserialize_op(op: SerializedOp) -> Result<Expression, ModelError> {
    let children = |items: Vec<SerializedExpr>| {
        items
            .into_iter()
            .map(deserialize_expr)
            .collect::<Result<Vec<_>, _>>()
    };
    match op {
        SerializedOp::Any(items) => Expression::any(children(items)?),
        SerializedOp::All(items) => Expression::all(children(items)?),
        SerializedOp::Not(inner) => Ok(!deserialize_expr(*inner)?),
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn serialize_value(value: &FieldValue) -> SerializedValue {
    match value {
        FieldValue::Text(t) => SerializedValue::Text(t.clone()),
        FieldValue::List(items) => SerializedValue::List(items.iter().map(serialize_value).collect()),
        FieldValue::Expr(e) => match serialize_expr(e) {
            SerializedExpr::Term(t) => SerializedValue::Text(t),
            SerializedExpr::Op(op) => SerializedValue::Expr(op),
        },
    }
}

fn deserialize_value(field: &str, value: SerializedValue) -> Result<FieldValue, ModelError> {
    match value {
        SerializedValue::Text(t) => Ok(FieldValue::Text(t)),
        SerializedValue::Expr(op) => deserialize_op(op).map(FieldValue::from),
        SerializedValue::List(items) => items
            .into_iter()
            .map(|item| match item {
                SerializedValue::List(_) => Err(ModelError::NestedList {
                    field: field.to_owned(),
                }),
                other => deserialize_value(field, other),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List),
    }
}

// ---------------------------------------------------------------------------
// Rule conversion
// ---------------------------------------------------------------------------

fn serialize_rule(rule: &Rule) -> SerializedRule {
    let mut ser = SerializedRule::default();
    for (field, value) in &rule.conditions {
        *ser.condition_slot(*field) = Some(serialize_value(value));
    }
    ser.label = rule.label.as_ref().map(serialize_value);
    for (flag, value) in &rule.flags {
        *ser.flag_slot(*flag) = Some(*value);
    }
    ser.forward.clone_from(&rule.forward);
    ser.gmail_raw.clone_from(&rule.passthrough);
    ser.more = rule.more.iter().map(serialize_rule).collect();
    ser
}

fn deserialize_rule(mut ser: SerializedRule) -> Result<Rule, ModelError> {
    let mut rule = Rule::new();
    for field in Condition::ALL {
        if let Some(value) = ser.condition_slot(field).take() {
            rule.conditions
                .insert(field, deserialize_value(field.key(), value)?);
        }
    }
    rule.label = ser
        .label
        .take()
        .map(|value| deserialize_value("label", value))
        .transpose()?;
    for flag in Flag::ALL {
        if let Some(value) = *ser.flag_slot(flag) {
            rule.flags.insert(flag, value);
        }
    }
    rule.forward = ser.forward;
    rule.passthrough = ser.gmail_raw;
    rule.more = ser
        .more
        .into_iter()
        .map(deserialize_rule)
        .collect::<Result<_, _>>()?;
    Ok(rule)
}

// ---------------------------------------------------------------------------
// serde impls
// ---------------------------------------------------------------------------

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_expr(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_expr(SerializedExpr::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_value("value", SerializedValue::deserialize(deserializer)?)
            .map_err(de::Error::custom)
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_rule(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_rule(SerializedRule::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Read a rule list from an already-parsed document.
///
/// # Errors
///
/// Fails on the first malformed element with a [`ModelError`] naming its
/// index: a document that is not a list, an element that is not a mapping,
/// an unknown key, a wrongly typed value, a nested list or an empty group.
pub fn rules_from_value(value: Value) -> Result<Vec<Rule>, ModelError> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ModelError::NotAList { found: kind(&other) }),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(ModelError::NotARule {
                    index,
                    found: kind(&item),
                });
            }
            let ser: SerializedRule =
                serde_json::from_value(item).map_err(|e| ModelError::InvalidRule {
                    index,
                    message: e.to_string(),
                })?;
            deserialize_rule(ser).map_err(|e| ModelError::InvalidRule {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Read a rule list from JSON text.
///
/// # Errors
///
/// [`FilterfoldError::Json`] for malformed JSON, [`FilterfoldError::Model`]
/// for a well-formed document that is not a valid rule list.
pub fn rules_from_json(text: &str) -> Result<Vec<Rule>, FilterfoldError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(rules_from_value(value)?)
}

/// Render rules as a JSON document.
///
/// # Errors
///
/// Only if the serializer itself fails.
pub fn rules_to_value(rules: &[Rule]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(rules)
}

/// Render rules as compact JSON text.
///
/// # Errors
///
/// Only if the serializer itself fails.
pub fn rules_to_json(rules: &[Rule]) -> Result<String, serde_json::Error> {
    serde_json::to_string(rules)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn expression_shape() {
        let e = !Expression::any(vec![Expression::term("a"), Expression::term("b")]).unwrap();
        assert_eq!(serde_json::to_value(&e).unwrap(), json!({"not": {"any": ["a", "b"]}}));
        let back: Expression = serde_json::from_value(json!({"not": {"any": ["a", "b"]}})).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn single_child_group_collapses() {
        let e: Expression = serde_json::from_value(json!({"all": ["only"]})).unwrap();
        assert_eq!(e, Expression::term("only"));
    }

    #[test]
    fn empty_group_is_rejected() {
        let err = serde_json::from_value::<Expression>(json!({"any": []})).unwrap_err();
        assert!(err.to_string().contains("empty 'any' group"));
    }

    #[test]
    fn rule_shape() {
        let rule = Rule::new()
            .condition(Condition::From, crate::parse::parse("alice OR bob"))
            .label("Team")
            .flag(Flag::Archive, false)
            .raw("sizeOperator", "s_sl")
            .child(Rule::new().condition(Condition::Subject, "standup"));
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "from": {"any": ["alice", "bob"]},
                "label": "Team",
                "archive": false,
                "_gmail_raw": {"sizeOperator": "s_sl"},
                "more": [{"subject": "standup"}]
            })
        );
        let back: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn label_list() {
        let rules = rules_from_value(json!([{"label": ["A", "B"]}])).unwrap();
        assert_eq!(rules[0].label, Some(FieldValue::from(vec!["A", "B"])));
    }

    #[test]
    fn not_a_list() {
        let err = rules_from_value(json!({"from": "x"})).unwrap_err();
        assert!(matches!(err, ModelError::NotAList { found: "mapping" }));
    }

    #[test]
    fn element_not_a_mapping() {
        let err = rules_from_value(json!([{"from": "x"}, "oops"])).unwrap_err();
        assert!(matches!(err, ModelError::NotARule { index: 1, found: "string" }));
    }

    #[test]
    fn unknown_key_names_index() {
        let err = rules_from_value(json!([{"from": "x"}, {"colour": "red"}])).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("rule #1: "), "{message}");
        assert!(message.contains("colour"), "{message}");
    }

    #[test]
    fn nested_list_rejected() {
        let err = rules_from_value(json!([{"from": [["a"]]}])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "rule #0: field 'from' contains a nested list"
        );
    }

    #[test]
    fn passthrough_values_must_be_strings() {
        let err = rules_from_value(json!([{"_gmail_raw": {"id": 5}}])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn malformed_json() {
        let err = rules_from_json("[{").unwrap_err();
        assert!(matches!(err, FilterfoldError::Json(_)));
    }

    #[test]
    fn json_text_round_trip() {
        let text = r#"[{"from":{"any":["alice","bob"]},"label":"Team"}]"#;
        let rules = rules_from_json(text).unwrap();
        assert_eq!(rules_to_json(&rules).unwrap(), text);
    }
}
