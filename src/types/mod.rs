mod error;
mod expr;
mod report;
mod rule;
mod value;
mod verdict;

pub use error::{InferenceError, ModelError};
pub use expr::Expression;
pub use report::{ExpressionField, InferenceReport, InferenceStats};
pub use rule::{Condition, Flag, Rule};
pub use value::FieldValue;
pub use verdict::{SafetyVerdict, Severity};
