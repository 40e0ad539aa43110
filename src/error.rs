use thiserror::Error;

use crate::{InferenceError, ModelError};

/// Unified error type covering ingestion, inference, and I/O.
///
/// Returned by convenience functions like
/// [`rules_from_json()`](crate::rules_from_json) that cross more than one
/// stage.
#[derive(Debug, Error)]
pub enum FilterfoldError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
