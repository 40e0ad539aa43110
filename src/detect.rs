//! Parent/child hierarchy detection.
//!
//! A rule is a refinement of another when it has strictly more conditions
//! and repeats every one of the other rule's conditions. Detection pairs
//! each candidate parent with its refinements and lets the [`Strategy`]
//! decide which pairings are nested.

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::decision::{Choice, DecisionMemory, Prompt};
use crate::safety::SafetyAnalyzer;
use crate::{Condition, Expression, FieldValue, InferenceError, Rule, SafetyVerdict, Severity};

/// How eligible pairings are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Nest only pairings with a clean verdict and nesting labels.
    #[default]
    Conservative,
    /// Nest everything short of a critical verdict.
    Aggressive,
    /// Ask a [`Prompt`] about every pairing.
    Interactive,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Conservative => "conservative",
            Strategy::Aggressive => "aggressive",
            Strategy::Interactive => "interactive",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Strategy::Conservative),
            "aggressive" => Ok(Strategy::Aggressive),
            "interactive" => Ok(Strategy::Interactive),
            other => Err(format!(
                "unknown strategy '{other}', expected conservative, aggressive or interactive"
            )),
        }
    }
}

/// One accepted grouping: indices into the rule list passed to
/// [`HierarchyDetector::detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub parent: usize,
    pub children: Vec<usize>,
}

/// Outcome of a detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub hierarchies: Vec<Hierarchy>,
    /// Eligible parent/child pairings examined.
    pub pairs_considered: usize,
    /// Eligible pairings the strategy declined.
    pub skipped_for_safety: usize,
}

/// Finds parent/child groupings over a flat rule list.
pub struct HierarchyDetector<'p> {
    strategy: Strategy,
    analyzer: SafetyAnalyzer,
    prompt: Option<&'p mut dyn Prompt>,
}

impl fmt::Debug for HierarchyDetector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyDetector")
            .field("strategy", &self.strategy)
            .field("analyzer", &self.analyzer)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl<'p> HierarchyDetector<'p> {
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            analyzer: SafetyAnalyzer::new(),
            prompt: None,
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: SafetyAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: &'p mut dyn Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Group `rules` into hierarchies.
    ///
    /// Candidates are visited by ascending condition count, ties in input
    /// order. Rules that already carry children take no part.
    ///
    /// # Errors
    ///
    /// [`InferenceError::MissingPrompt`] when the strategy is interactive and
    /// no prompt was supplied.
    pub fn detect(&mut self, rules: &[Rule]) -> Result<Detection, InferenceError> {
        let Self {
            strategy,
            analyzer,
            prompt,
        } = self;
        let strategy = *strategy;
        let mut prompt = match (strategy, prompt.as_deref_mut()) {
            (Strategy::Interactive, None) => return Err(InferenceError::MissingPrompt),
            (_, prompt) => prompt,
        };

        let mut order: Vec<usize> = (0..rules.len()).filter(|&i| rules[i].more.is_empty()).collect();
        order.sort_by_key(|&i| rules[i].conditions.len());

        let mut consumed = vec![false; rules.len()];
        let mut memory = DecisionMemory::new();
        let mut detection = Detection::default();

        for (pos, &p) in order.iter().enumerate() {
            if consumed[p] {
                continue;
            }
            let parent = &rules[p];
            let mut children = Vec::new();

            for &c in &order[pos + 1..] {
                if consumed[c] || !is_refinement(parent, &rules[c]) {
                    continue;
                }
                let child = &rules[c];
                detection.pairs_considered += 1;
                let verdict = analyzer.analyze(parent, child);

                let accepted = match strategy {
                    Strategy::Conservative => {
                        verdict.is_safe()
                            && verdict.warnings().is_empty()
                            && labels_extend(parent, child)
                    }
                    Strategy::Aggressive => verdict.severity() != Severity::Critical,
                    Strategy::Interactive => {
                        let key = analyzer.pattern_key(parent, child);
                        if let Some(accept) = memory.batch_decision(&key) {
                            accept
                        } else if let Some(open) = prompt.as_deref_mut() {
                            match ask(open, parent, child, &verdict) {
                                Ok(Some(choice)) => {
                                    memory.remember(key, choice);
                                    choice.accepts()
                                }
                                Ok(None) => {
                                    warn!("prompt input ended, declining remaining pairings");
                                    prompt = None;
                                    false
                                }
                                Err(error) => {
                                    warn!(%error, "prompt failed, declining remaining pairings");
                                    prompt = None;
                                    false
                                }
                            }
                        } else {
                            false
                        }
                    }
                };

                trace!(parent = p, child = c, %verdict, accepted, "pairing");
                if accepted {
                    consumed[c] = true;
                    children.push(c);
                } else {
                    detection.skipped_for_safety += 1;
                }
            }

            if !children.is_empty() {
                detection.hierarchies.push(Hierarchy {
                    parent: p,
                    children,
                });
            }
        }

        debug!(
            %strategy,
            hierarchies = detection.hierarchies.len(),
            pairs = detection.pairs_considered,
            skipped = detection.skipped_for_safety,
            "hierarchy detection finished"
        );
        Ok(detection)
    }
}

fn ask(
    prompt: &mut dyn Prompt,
    parent: &Rule,
    child: &Rule,
    verdict: &SafetyVerdict,
) -> io::Result<Option<Choice>> {
    loop {
        match prompt.ask(parent, child, verdict)? {
            Some(Choice::Help) => prompt.help()?,
            other => return Ok(other),
        }
    }
}

/// `child` has strictly more conditions than `parent` and agrees with every
/// one of them; `has` may extend the parent's value instead of repeating it.
#[must_use]
pub fn is_refinement(parent: &Rule, child: &Rule) -> bool {
    child.conditions.len() > parent.conditions.len()
        && parent.conditions.iter().all(|(field, value)| {
            child.conditions.get(field).is_some_and(|other| match field {
                Condition::Has => has_value_extends(value, other),
                _ => value == other,
            })
        })
}

/// The child's `has` value repeats the parent's, contains it as a literal
/// substring, or is an AND group with the parent's value as a conjunct.
#[must_use]
pub fn has_value_extends(parent: &FieldValue, child: &FieldValue) -> bool {
    if parent == child {
        return true;
    }
    match (parent, child) {
        (FieldValue::Text(p), FieldValue::Text(c)) => c.contains(p.as_str()),
        (_, FieldValue::Expr(Expression::All(conjuncts))) => {
            as_expression(parent).is_some_and(|p| conjuncts.contains(&p))
        }
        _ => false,
    }
}

pub(crate) fn as_expression(value: &FieldValue) -> Option<Expression> {
    match value {
        FieldValue::Text(t) => Some(Expression::term(t.as_str())),
        FieldValue::Expr(e) => Some(e.clone()),
        FieldValue::List(_) => None,
    }
}

/// Every parent label is repeated or string-prefix-extended by a child label.
fn labels_extend(parent: &Rule, child: &Rule) -> bool {
    let child_labels = child.labels();
    parent
        .labels()
        .iter()
        .all(|p| child_labels.iter().any(|c| c.starts_with(p)))
}
