mod error;
mod types;

pub mod build;
pub mod decision;
pub mod detect;
pub mod infer;
pub mod merge;
pub mod parse;
pub mod safety;
pub mod serial;

pub use error::FilterfoldError;
pub use types::{
    Condition, Expression, ExpressionField, FieldValue, Flag, InferenceError, InferenceReport,
    InferenceStats, ModelError, Rule, SafetyVerdict, Severity,
};

pub use build::build;
pub use decision::{Choice, DecisionMemory, PatternKey, Prompt, TerminalPrompt};
pub use detect::{Detection, Hierarchy, HierarchyDetector, Strategy};
pub use infer::{run, Inference, InferenceOptions};
pub use merge::merge_duplicates;
pub use parse::{infer_operators, parse_expression, split_terms, strip_quotes};
pub use safety::{ActionConflict, SafetyAnalyzer, SafetyTables};
pub use serial::{rules_from_json, rules_from_value, rules_to_json, rules_to_value};
