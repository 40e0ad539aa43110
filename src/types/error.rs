use thiserror::Error;

/// Structural problems in rule input. Raised at ingestion; content the
/// parser merely fails to understand is never an error.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("expected a list of rules, found {found}")]
    NotAList { found: &'static str },

    #[error("rule #{index}: expected a mapping, found {found}")]
    NotARule { index: usize, found: &'static str },

    #[error("rule #{index}: {message}")]
    InvalidRule { index: usize, message: String },

    #[error("empty '{kind}' group; at least one expression is required")]
    EmptyGroup { kind: &'static str },

    #[error("field '{field}' contains a nested list")]
    NestedList { field: String },
}

/// Contract violations detected while running the inference pipeline.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("hierarchy references rule {index}, but only {len} rules were given")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("rule {index} appears in more than one hierarchy position")]
    DuplicateIndex { index: usize },

    #[error("rule {index} already has nested rules and cannot be nested again")]
    ReentrantHierarchy { index: usize },

    #[error("rule {index} already has nested rules and cannot become a child")]
    NestedChild { index: usize },

    #[error("interactive strategy requires a prompt")]
    MissingPrompt,
}
