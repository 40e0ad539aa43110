use std::fmt;

use super::rule::{Condition, Rule};

/// A condition field that received an expression tree during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionField {
    /// Index into the rule list after duplicate merging.
    pub rule: usize,
    pub field: Condition,
}

/// Counters aggregated over one inference run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceStats {
    pub filters_merged: usize,
    pub hierarchies_inferred: usize,
    pub children_nested: usize,
    pub pairs_considered: usize,
    pub skipped_for_safety: usize,
    pub expression_fields: Vec<ExpressionField>,
}

impl fmt::Display for InferenceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "merged: {}", self.filters_merged)?;
        write!(
            f,
            ", hierarchies: {} ({} children)",
            self.hierarchies_inferred, self.children_nested
        )?;
        write!(
            f,
            ", skipped for safety: {}/{}",
            self.skipped_for_safety, self.pairs_considered
        )?;
        write!(f, ", expression fields: {}", self.expression_fields.len())?;
        Ok(())
    }
}

/// Result of [`Inference::run()`](crate::Inference::run): the restructured
/// rules plus the run's statistics.
#[derive(Debug, Clone)]
#[must_use]
pub struct InferenceReport {
    rules: Vec<Rule>,
    stats: InferenceStats,
}

impl InferenceReport {
    pub(crate) fn new(rules: Vec<Rule>, stats: InferenceStats) -> Self {
        Self { rules, stats }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Rule>, InferenceStats) {
        (self.rules, self.stats)
    }
}

impl fmt::Display for InferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rules: {}, {}", self.rules.len(), self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> InferenceStats {
        InferenceStats {
            filters_merged: 2,
            hierarchies_inferred: 1,
            children_nested: 3,
            pairs_considered: 5,
            skipped_for_safety: 2,
            expression_fields: vec![ExpressionField {
                rule: 0,
                field: Condition::From,
            }],
        }
    }

    #[test]
    fn report_accessors() {
        let report = InferenceReport::new(vec![Rule::new()], sample_stats());
        assert_eq!(report.rules().len(), 1);
        assert_eq!(report.stats().children_nested, 3);

        let (rules, stats) = report.into_parts();
        assert_eq!(rules, vec![Rule::new()]);
        assert_eq!(stats, sample_stats());
    }

    #[test]
    fn stats_display() {
        let s = sample_stats().to_string();
        assert!(s.contains("merged: 2"));
        assert!(s.contains("hierarchies: 1 (3 children)"));
        assert!(s.contains("skipped for safety: 2/5"));
        assert!(s.contains("expression fields: 1"));
    }

    #[test]
    fn report_display() {
        let report = InferenceReport::new(vec![], InferenceStats::default());
        assert!(report.to_string().starts_with("rules: 0, merged: 0"));
    }
}
