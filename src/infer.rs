//! The inference pipeline: merge, parse, detect, build.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision::Prompt;
use crate::detect::{HierarchyDetector, Strategy};
use crate::safety::SafetyAnalyzer;
use crate::{
    build, merge, parse, ExpressionField, InferenceError, InferenceReport, InferenceStats, Rule,
};

/// Which pipeline stages run, and how hierarchies are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceOptions {
    pub merge_duplicates: bool,
    pub parse_expressions: bool,
    pub infer_hierarchy: bool,
    pub strategy: Strategy,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            merge_duplicates: true,
            parse_expressions: true,
            infer_hierarchy: false,
            strategy: Strategy::Conservative,
        }
    }
}

impl InferenceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn merge_duplicates(mut self, enabled: bool) -> Self {
        self.merge_duplicates = enabled;
        self
    }

    #[must_use]
    pub fn parse_expressions(mut self, enabled: bool) -> Self {
        self.parse_expressions = enabled;
        self
    }

    #[must_use]
    pub fn infer_hierarchy(mut self, enabled: bool) -> Self {
        self.infer_hierarchy = enabled;
        self
    }

    /// Sets the strategy and switches hierarchy inference on.
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self.infer_hierarchy = true;
        self
    }
}

/// One configured inference run.
///
/// ```
/// use filterfold::{Condition, Inference, InferenceOptions, Rule};
///
/// let rules = vec![Rule::new()
///     .condition(Condition::From, "alice OR bob")
///     .label("Team")];
/// let report = Inference::new(InferenceOptions::default()).run(rules).unwrap();
/// assert_eq!(report.stats().expression_fields.len(), 1);
/// ```
pub struct Inference<'p> {
    options: InferenceOptions,
    analyzer: SafetyAnalyzer,
    prompt: Option<&'p mut dyn Prompt>,
}

impl fmt::Debug for Inference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inference")
            .field("options", &self.options)
            .field("analyzer", &self.analyzer)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl<'p> Inference<'p> {
    #[must_use]
    pub fn new(options: InferenceOptions) -> Self {
        Self {
            options,
            analyzer: SafetyAnalyzer::new(),
            prompt: None,
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: SafetyAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Prompt consulted by the interactive strategy.
    #[must_use]
    pub fn with_prompt(mut self, prompt: &'p mut dyn Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    #[must_use]
    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    /// Run the enabled stages over `rules` in order: duplicate merging,
    /// expression parsing, hierarchy detection and building.
    ///
    /// # Errors
    ///
    /// [`InferenceError::MissingPrompt`] when hierarchy inference is enabled
    /// with the interactive strategy and no prompt was supplied. Rule content
    /// never causes an error.
    pub fn run(self, rules: Vec<Rule>) -> Result<InferenceReport, InferenceError> {
        let Self {
            options,
            analyzer,
            prompt,
        } = self;
        if options.infer_hierarchy && options.strategy == Strategy::Interactive && prompt.is_none() {
            return Err(InferenceError::MissingPrompt);
        }

        let mut stats = InferenceStats::default();
        let mut rules = rules;

        if options.merge_duplicates {
            let (merged, count) = merge::merge_duplicates(rules);
            rules = merged;
            stats.filters_merged = count;
        }

        if options.parse_expressions {
            for (index, rule) in rules.iter_mut().enumerate() {
                let (parsed, fields) = parse::infer_operators(rule);
                *rule = parsed;
                stats
                    .expression_fields
                    .extend(fields.into_iter().map(|field| ExpressionField { rule: index, field }));
            }
            debug!(
                fields = stats.expression_fields.len(),
                "inferred operators"
            );
        }

        if options.infer_hierarchy {
            let mut detector = HierarchyDetector::new(options.strategy).with_analyzer(analyzer);
            if let Some(prompt) = prompt {
                detector = detector.with_prompt(prompt);
            }
            let detection = detector.detect(&rules)?;
            stats.pairs_considered = detection.pairs_considered;
            stats.skipped_for_safety = detection.skipped_for_safety;
            stats.hierarchies_inferred = detection
                .hierarchies
                .iter()
                .filter(|h| !h.children.is_empty())
                .count();
            stats.children_nested = detection.hierarchies.iter().map(|h| h.children.len()).sum();
            rules = build::build(&detection.hierarchies, &rules)?;
        }

        debug!(%stats, "inference finished");
        Ok(InferenceReport::new(rules, stats))
    }
}

/// Run the pipeline with the default analyzer and no prompt.
///
/// # Errors
///
/// See [`Inference::run`].
pub fn run(rules: Vec<Rule>, options: InferenceOptions) -> Result<InferenceReport, InferenceError> {
    Inference::new(options).run(rules)
}
