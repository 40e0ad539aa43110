use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::value::FieldValue;

/// Condition fields: they decide whether a message matches a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Condition {
    From,
    To,
    Subject,
    Has,
    DoesNotHave,
    List,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::From,
        Condition::To,
        Condition::Subject,
        Condition::Has,
        Condition::DoesNotHave,
        Condition::List,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Condition::From => "from",
            Condition::To => "to",
            Condition::Subject => "subject",
            Condition::Has => "has",
            Condition::DoesNotHave => "does_not_have",
            Condition::List => "list",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Boolean actions. A flag missing from [`Rule::flags`] is unspecified,
/// which is distinct from an explicit `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    Archive,
    NotArchive,
    Important,
    NotImportant,
    Spam,
    NotSpam,
    Read,
    Unread,
    Star,
    Unstar,
    Delete,
    Trash,
}

impl Flag {
    pub const ALL: [Flag; 12] = [
        Flag::Archive,
        Flag::NotArchive,
        Flag::Important,
        Flag::NotImportant,
        Flag::Spam,
        Flag::NotSpam,
        Flag::Read,
        Flag::Unread,
        Flag::Star,
        Flag::Unstar,
        Flag::Delete,
        Flag::Trash,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Flag::Archive => "archive",
            Flag::NotArchive => "not_archive",
            Flag::Important => "important",
            Flag::NotImportant => "not_important",
            Flag::Spam => "spam",
            Flag::NotSpam => "not_spam",
            Flag::Read => "read",
            Flag::Unread => "unread",
            Flag::Star => "star",
            Flag::Unstar => "unstar",
            Flag::Delete => "delete",
            Flag::Trash => "trash",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One mail filter: conditions, actions, an opaque passthrough bag and,
/// after hierarchy inference, nested refinements in `more`.
///
/// A child in `more` is implicitly ANDed with its parent's conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rule {
    pub conditions: BTreeMap<Condition, FieldValue>,
    pub label: Option<FieldValue>,
    pub flags: BTreeMap<Flag, bool>,
    pub forward: Option<String>,
    /// Provider-specific properties carried through verbatim.
    pub passthrough: BTreeMap<String, String>,
    pub more: Vec<Rule>,
}

impl Rule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn condition(mut self, field: Condition, value: impl Into<FieldValue>) -> Self {
        self.conditions.insert(field, value.into());
        self
    }

    #[must_use]
    pub fn label(mut self, value: impl Into<FieldValue>) -> Self {
        self.label = Some(value.into());
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: Flag, value: bool) -> Self {
        self.flags.insert(flag, value);
        self
    }

    #[must_use]
    pub fn forward(mut self, address: impl Into<String>) -> Self {
        self.forward = Some(address.into());
        self
    }

    #[must_use]
    pub fn raw(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.passthrough.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn child(mut self, rule: Rule) -> Self {
        self.more.push(rule);
        self
    }

    /// `Some(value)` if the flag is specified, `None` if absent.
    #[must_use]
    pub fn flag_value(&self, flag: Flag) -> Option<bool> {
        self.flags.get(&flag).copied()
    }

    /// True only when the flag is explicitly set to `true`.
    #[must_use]
    pub fn is_set(&self, flag: Flag) -> bool {
        self.flag_value(flag) == Some(true)
    }

    /// Label texts, empty when no label is applied.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.label.as_ref().map(FieldValue::texts).unwrap_or_default()
    }

    /// Keys present on this rule, in their textual form.
    #[must_use]
    pub fn field_names(&self) -> BTreeSet<&'static str> {
        let mut names: BTreeSet<&'static str> = self.conditions.keys().map(|c| c.key()).collect();
        names.extend(self.flags.keys().map(|f| f.key()));
        if self.label.is_some() {
            names.insert("label");
        }
        if self.forward.is_some() {
            names.insert("forward");
        }
        if !self.passthrough.is_empty() {
            names.insert("_gmail_raw");
        }
        if !self.more.is_empty() {
            names.insert("more");
        }
        names
    }

    /// Multi-line `key: value` listing, conditions first, then the actions
    /// that are switched on.
    #[must_use]
    pub fn summary(&self, indent: &str) -> String {
        let mut lines = Vec::new();
        for (field, value) in &self.conditions {
            lines.push(format!("{indent}{field}: {value}"));
        }
        if let Some(label) = &self.label {
            lines.push(format!("{indent}label: {label}"));
        }
        for (flag, on) in &self.flags {
            if *on {
                lines.push(format!("{indent}{flag}: yes"));
            }
        }
        if let Some(address) = &self.forward {
            lines.push(format!("{indent}forward: {address}"));
        }
        lines.join("\n")
    }
}
