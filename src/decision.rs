//! Interactive merge decisions.
//!
//! The interactive strategy asks a [`Prompt`] whether each eligible pairing
//! should be nested. Batch answers ("accept all", "skip all") are remembered
//! per [`PatternKey`] in a [`DecisionMemory`] that lives for one run only.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};

use crate::{Rule, SafetyVerdict};

/// An answer to one merge question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Yes,
    No,
    /// Yes, and accept every later pairing with the same pattern key.
    AcceptAll,
    /// No, and skip every later pairing with the same pattern key.
    SkipAll,
    /// Show usage text and ask again.
    Help,
}

impl Choice {
    /// Interpret one line of user input. Unrecognised replies yield `None`.
    #[must_use]
    pub fn from_reply(reply: &str) -> Option<Choice> {
        match reply.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Choice::Yes),
            "n" | "no" | "" => Some(Choice::No),
            "a" | "accept all" => Some(Choice::AcceptAll),
            "s" | "skip all" => Some(Choice::SkipAll),
            "?" | "h" | "help" => Some(Choice::Help),
            _ => None,
        }
    }

    /// Whether the pairing is accepted. `Help` accepts nothing.
    #[must_use]
    pub fn accepts(self) -> bool {
        matches!(self, Choice::Yes | Choice::AcceptAll)
    }
}

/// Source of interactive decisions.
pub trait Prompt {
    /// Present a candidate pairing and return the answer. `Ok(None)` signals
    /// end of input.
    ///
    /// # Errors
    ///
    /// Any I/O failure talking to the user.
    fn ask(
        &mut self,
        parent: &Rule,
        child: &Rule,
        verdict: &SafetyVerdict,
    ) -> io::Result<Option<Choice>>;

    /// Show usage text before the same question is asked again.
    ///
    /// # Errors
    ///
    /// Any I/O failure talking to the user.
    fn help(&mut self) -> io::Result<()>;
}

const HELP: &str = "\
  y, yes         nest this child under the parent
  n, no          keep both rules separate (default)
  a, accept all  nest this and every similar pairing
  s, skip all    skip this and every similar pairing
  ?, h, help     show this help";

/// Line-oriented [`Prompt`] over any reader/writer pair, typically stdin and
/// stdout.
#[derive(Debug)]
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn ask(
        &mut self,
        parent: &Rule,
        child: &Rule,
        verdict: &SafetyVerdict,
    ) -> io::Result<Option<Choice>> {
        writeln!(self.output)?;
        writeln!(self.output, "Parent filter:")?;
        writeln!(self.output, "{}", parent.summary("  "))?;
        writeln!(self.output, "Child filter:")?;
        writeln!(self.output, "{}", child.summary("  "))?;
        writeln!(self.output, "Safety: {verdict}")?;
        for warning in verdict.warnings() {
            writeln!(self.output, "  - {warning}")?;
        }
        write!(self.output, "Nest child under parent? [y/N/a/s/?] ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(Choice::from_reply(&line).unwrap_or(Choice::Help)))
    }

    fn help(&mut self) -> io::Result<()> {
        writeln!(self.output, "{HELP}")
    }
}

/// Fingerprint of a pairing's shape: which fields each side has, whether
/// the child is security-sensitive and whether their actions conflict.
/// A BLAKE3 digest truncated to 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey([u8; 16]);

impl PatternKey {
    /// Field names are hashed in iteration order; pass them sorted.
    #[must_use]
    pub fn new<'a>(
        parent_fields: impl IntoIterator<Item = &'a str>,
        child_fields: impl IntoIterator<Item = &'a str>,
        security_sensitive: bool,
        has_conflicts: bool,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        for name in parent_fields {
            hasher.update(name.as_bytes());
            hasher.update(b",");
        }
        hasher.update(b"|");
        for name in child_fields {
            hasher.update(name.as_bytes());
            hasher.update(b",");
        }
        hasher.update(b"|");
        hasher.update(if security_sensitive { b"sec" as &[u8] } else { b"nosec" });
        hasher.update(b"|");
        hasher.update(if has_conflicts { b"conflict" as &[u8] } else { b"noconflict" });

        let mut key = [0u8; 16];
        key.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Self(key)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Last answer per pattern key, scoped to one inference run.
#[derive(Debug, Clone, Default)]
pub struct DecisionMemory {
    choices: HashMap<PatternKey, Choice>,
}

impl DecisionMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, key: PatternKey, choice: Choice) {
        self.choices.insert(key, choice);
    }

    #[must_use]
    pub fn recall(&self, key: &PatternKey) -> Option<Choice> {
        self.choices.get(key).copied()
    }

    /// `Some(accept)` when a batch answer was remembered for `key`.
    #[must_use]
    pub fn batch_decision(&self, key: &PatternKey) -> Option<bool> {
        match self.recall(key)? {
            Choice::AcceptAll => Some(true),
            Choice::SkipAll => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}
