//! Risk scoring for nesting one rule under another.
//!
//! Nesting a child under a parent makes the child inherit the parent's
//! actions. [`SafetyAnalyzer::analyze`] scores how likely that inheritance is
//! to change what happens to the child's mail, with particular care for
//! security mail (password resets, sign-in codes) that must not be archived,
//! deleted, marked read or forwarded silently.

use std::fmt;

use tracing::trace;

use crate::decision::PatternKey;
use crate::{Condition, Flag, Rule, SafetyVerdict, Severity};

/// Substrings that mark mail as security-related.
pub const SECURITY_KEYWORDS: &[&str] = &[
    "password",
    "reset",
    "verification",
    "verify",
    "verified",
    "2fa",
    "two-factor",
    "two factor",
    "otp",
    "one-time",
    "code",
    "token",
    "security",
    "secure",
    "confirm",
    "confirmation",
    "activate",
    "activation",
    "recover",
    "recovery",
    "authenticate",
    "authorization",
    "account",
    "signin",
    "sign-in",
    "login",
    "log-in",
];

/// Flag pairs that cannot both hold for the same message.
pub const CONFLICTING_FLAGS: &[(Flag, Flag)] = &[
    (Flag::Archive, Flag::NotArchive),
    (Flag::Important, Flag::NotImportant),
    (Flag::Spam, Flag::NotSpam),
    (Flag::Read, Flag::Unread),
    (Flag::Star, Flag::Unstar),
];

/// Parent actions a security-sensitive child must not inherit.
pub const DANGEROUS_TO_INHERIT: &[Flag] = &[Flag::Archive, Flag::Delete, Flag::Trash, Flag::Read];

/// Label substrings suggesting security or high-priority mail.
pub const SECURITY_LABEL_HINTS: &[&str] = &["security", "auth", "verification", "important", "urgent"];

/// Label substrings suggesting bulk or automated mail.
pub const AUTOMATED_LABEL_HINTS: &[&str] = &[
    "automated",
    "notification",
    "no-reply",
    "newsletter",
    "marketing",
];

// Condition fields scanned for security keywords, together with the label.
const SCANNED_FIELDS: [Condition; 4] = [
    Condition::From,
    Condition::To,
    Condition::Subject,
    Condition::Has,
];

const SECURITY_PENALTY: i32 = 40;
const DANGEROUS_INHERIT_PENALTY: i32 = 30;
const CRITICAL_CONFLICT_PENALTY: i32 = 40;
const CONFLICT_PENALTY: i32 = 20;
const FORWARDING_PENALTY: i32 = 50;
const LABEL_PENALTY: i32 = 10;

/// Keyword and action tables consulted by [`SafetyAnalyzer`]. Keywords and
/// hints are matched as case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyTables {
    pub security_keywords: Vec<String>,
    pub conflicting_flags: Vec<(Flag, Flag)>,
    pub dangerous_to_inherit: Vec<Flag>,
    pub security_label_hints: Vec<String>,
    pub automated_label_hints: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_owned()).collect()
}

impl Default for SafetyTables {
    fn default() -> Self {
        Self {
            security_keywords: owned(SECURITY_KEYWORDS),
            conflicting_flags: CONFLICTING_FLAGS.to_vec(),
            dangerous_to_inherit: DANGEROUS_TO_INHERIT.to_vec(),
            security_label_hints: owned(SECURITY_LABEL_HINTS),
            automated_label_hints: owned(AUTOMATED_LABEL_HINTS),
        }
    }
}

/// One pair of incompatible actions between a parent and a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConflict {
    pub parent: String,
    pub child: String,
    /// Parent and child set `archive` explicitly to different values, so the
    /// same message would land in different places.
    pub critical: bool,
}

impl ActionConflict {
    fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            critical: false,
        }
    }
}

impl fmt::Display for ActionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.critical {
            write!(f, "**{} vs {}**", self.parent, self.child)
        } else {
            write!(f, "{} vs {}", self.parent, self.child)
        }
    }
}

/// Scores parent/child pairings. Stateless apart from its tables.
#[derive(Debug, Clone, Default)]
pub struct SafetyAnalyzer {
    tables: SafetyTables,
}

impl SafetyAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tables(tables: SafetyTables) -> Self {
        let lowercase =
            |words: Vec<String>| -> Vec<String> { words.iter().map(|w| w.to_lowercase()).collect() };
        let tables = SafetyTables {
            security_keywords: lowercase(tables.security_keywords),
            security_label_hints: lowercase(tables.security_label_hints),
            automated_label_hints: lowercase(tables.automated_label_hints),
            ..tables
        };
        Self { tables }
    }

    #[must_use]
    pub fn tables(&self) -> &SafetyTables {
        &self.tables
    }

    /// Score nesting `child` under `parent`.
    ///
    /// Confidence starts at 100 and every issue subtracts from it. Warnings
    /// appear in detection order: security, action conflicts, forwarding,
    /// labels.
    pub fn analyze(&self, parent: &Rule, child: &Rule) -> SafetyVerdict {
        let mut warnings = Vec::new();
        let mut confidence = 100;
        let mut severity = Severity::Low;

        if self.is_security_sensitive(child) {
            warnings.push("Security-sensitive: contains security-related keywords".to_owned());
            confidence -= SECURITY_PENALTY;
            severity = severity.max(Severity::High);

            let dangerous = self.dangerous_inherited_actions(parent);
            if !dangerous.is_empty() {
                let names: Vec<&str> = dangerous.iter().map(|f| f.key()).collect();
                warnings.push(format!(
                    "Would inherit dangerous actions for security email: {}",
                    names.join(", ")
                ));
                confidence -= DANGEROUS_INHERIT_PENALTY;
                severity = Severity::Critical;
            }
        }

        let conflicts = self.action_conflicts(parent, child);
        if !conflicts.is_empty() {
            let listed: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
            warnings.push(format!("Action conflicts: {}", listed.join(", ")));

            for conflict in conflicts.iter().filter(|c| !c.critical) {
                trace!(%conflict, "action conflict");
                confidence -= CONFLICT_PENALTY;
            }
            if conflicts.iter().any(|c| c.critical) {
                warnings.push(
                    "CRITICAL: different archive states, messages would end up in different places"
                        .to_owned(),
                );
                confidence -= CRITICAL_CONFLICT_PENALTY;
                severity = Severity::Critical;
            } else {
                severity = severity.max(Severity::Medium);
            }
        }

        if let Some(message) = self.forwarding_conflict(parent, child) {
            warnings.push(format!("Forwarding conflict: {message}"));
            confidence -= FORWARDING_PENALTY;
            severity = Severity::Critical;
        }

        if let Some(message) = self.label_compatibility(parent, child) {
            warnings.push(format!("Label mismatch: {message}"));
            confidence -= LABEL_PENALTY;
        }

        let verdict = SafetyVerdict::new(confidence, severity, warnings);
        trace!(%verdict, warnings = verdict.warnings().len(), "analyzed pairing");
        verdict
    }

    /// Whether the rule's sender, recipient, subject, body or label text
    /// mentions a security keyword.
    #[must_use]
    pub fn is_security_sensitive(&self, rule: &Rule) -> bool {
        let conditions = SCANNED_FIELDS
            .iter()
            .filter_map(|field| rule.conditions.get(field))
            .flat_map(|value| value.texts());
        let mut texts = conditions.chain(rule.labels());
        texts.any(|text| {
            let text = text.to_lowercase();
            self.tables
                .security_keywords
                .iter()
                .any(|keyword| text.contains(keyword.as_str()))
        })
    }

    /// Pairs of parent/child actions that contradict each other.
    #[must_use]
    pub fn action_conflicts(&self, parent: &Rule, child: &Rule) -> Vec<ActionConflict> {
        let mut conflicts = Vec::new();

        for &(a, b) in &self.tables.conflicting_flags {
            if parent.is_set(a) && child.is_set(b) {
                conflicts.push(ActionConflict::new(a.key(), b.key()));
            }
            if parent.is_set(b) && child.is_set(a) {
                conflicts.push(ActionConflict::new(b.key(), a.key()));
            }
        }

        if parent.is_set(Flag::Archive) && child.is_set(Flag::Important) {
            conflicts.push(ActionConflict::new("archive", "important"));
        }
        if (parent.is_set(Flag::Delete) || parent.is_set(Flag::Trash)) && child.is_set(Flag::Star) {
            conflicts.push(ActionConflict::new("delete/trash", "star"));
        }

        match (parent.flag_value(Flag::Archive), child.flag_value(Flag::Archive)) {
            (Some(p), Some(c)) if p != c => conflicts.push(ActionConflict {
                parent: format!("archive={p}"),
                child: format!("archive={c}"),
                critical: true,
            }),
            (Some(true), None) => {
                conflicts.push(ActionConflict::new("archive", "no-archive-specified"));
            }
            (None, Some(true)) => conflicts.push(ActionConflict::new("no-archive", "archive")),
            _ => {}
        }

        conflicts
    }

    /// Parent actions from the dangerous-to-inherit table that are switched on.
    #[must_use]
    pub fn dangerous_inherited_actions(&self, parent: &Rule) -> Vec<Flag> {
        self.tables
            .dangerous_to_inherit
            .iter()
            .copied()
            .filter(|&flag| parent.is_set(flag))
            .collect()
    }

    /// Differing forward targets, or a security-sensitive child that would
    /// silently inherit the parent's forwarding.
    #[must_use]
    pub fn forwarding_conflict(&self, parent: &Rule, child: &Rule) -> Option<String> {
        let parent_forward = parent.forward.as_deref().filter(|f| !f.is_empty())?;
        match child.forward.as_deref().filter(|f| !f.is_empty()) {
            Some(child_forward) if child_forward != parent_forward => Some(format!(
                "Parent forwards to {parent_forward}, child to {child_forward}"
            )),
            Some(_) => None,
            None if self.is_security_sensitive(child) => Some(format!(
                "Security-sensitive email would be forwarded to {parent_forward}"
            )),
            None => None,
        }
    }

    /// Warning when the two label sets suggest the rules serve different
    /// purposes. A child label that equals or extends a parent label
    /// (`Team` / `Team/Meetings`) is compatible.
    #[must_use]
    pub fn label_compatibility(&self, parent: &Rule, child: &Rule) -> Option<String> {
        let parent_labels = parent.labels();
        let child_labels = child.labels();
        if parent_labels.is_empty() || child_labels.is_empty() {
            return None;
        }

        let hints = |labels: &[&str], table: &[String]| {
            labels.iter().any(|label| {
                let label = label.to_lowercase();
                table.iter().any(|hint| label.contains(hint.as_str()))
            })
        };
        let security = &self.tables.security_label_hints;
        let automated = &self.tables.automated_label_hints;

        if hints(&parent_labels, automated) && hints(&child_labels, security) {
            return Some("Parent appears automated, child appears security-related".to_owned());
        }
        if hints(&parent_labels, security) && hints(&child_labels, automated) {
            return Some("Parent appears security-related, child appears automated".to_owned());
        }
        if labels_nest(&parent_labels, &child_labels) {
            None
        } else {
            Some("Different labels suggest different purposes".to_owned())
        }
    }

    /// Fingerprint of the pairing's shape, used to replay interactive
    /// decisions.
    #[must_use]
    pub fn pattern_key(&self, parent: &Rule, child: &Rule) -> PatternKey {
        PatternKey::new(
            parent.field_names(),
            child.field_names(),
            self.is_security_sensitive(child),
            !self.action_conflicts(parent, child).is_empty(),
        )
    }
}

/// Some child label equals or string-prefix-extends some parent label.
fn labels_nest(parent_labels: &[&str], child_labels: &[&str]) -> bool {
    parent_labels
        .iter()
        .any(|p| child_labels.iter().any(|c| c.starts_with(p)))
}
