use std::fmt;

/// How serious the worst issue found for a parent/child pairing is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        })
    }
}

/// Risk assessment of nesting one rule under another. Always recomputed,
/// never stored on a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct SafetyVerdict {
    safe: bool,
    confidence: u8,
    severity: Severity,
    warnings: Vec<String>,
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (confidence {}%, severity {})",
            if self.safe { "safe" } else { "unsafe" },
            self.confidence,
            self.severity
        )
    }
}

impl SafetyVerdict {
    /// Builds a verdict from the accumulated confidence (clamped to `0..=100`).
    /// A pairing is safe when confidence stays above 50 and nothing critical
    /// was found.
    pub fn new(confidence: i32, severity: Severity, warnings: Vec<String>) -> Self {
        let confidence = u8::try_from(confidence.clamp(0, 100)).unwrap_or_default();
        Self {
            safe: confidence > 50 && severity != Severity::Critical,
            confidence,
            severity,
            warnings,
        }
    }

    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    #[must_use]
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_verdict_is_safe() {
        let v = SafetyVerdict::new(100, Severity::Low, vec![]);
        assert!(v.is_safe());
        assert_eq!(v.confidence(), 100);
        assert!(v.warnings().is_empty());
    }

    #[test]
    fn critical_is_never_safe() {
        let v = SafetyVerdict::new(90, Severity::Critical, vec!["x".into()]);
        assert!(!v.is_safe());
    }

    #[test]
    fn confidence_of_fifty_is_unsafe() {
        assert!(!SafetyVerdict::new(50, Severity::Low, vec![]).is_safe());
        assert!(SafetyVerdict::new(51, Severity::Low, vec![]).is_safe());
    }

    #[test]
    fn confidence_floors_at_zero() {
        assert_eq!(SafetyVerdict::new(-80, Severity::High, vec![]).confidence(), 0);
    }

    #[test]
    fn severity_orders_by_seriousness() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Medium.max(Severity::Low), Severity::Medium);
    }

    #[test]
    fn display() {
        let v = SafetyVerdict::new(60, Severity::Critical, vec![]);
        assert_eq!(v.to_string(), "unsafe (confidence 60%, severity critical)");
    }
}
