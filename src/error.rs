//! Loading-boundary errors.
//!
//! Only the loader returns these. Once a document is parsed, the resolver and
//! layout engine degrade to "unscheduled" or "phase omitted" instead of failing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("Protocol document has no id")]
    MissingId,
}
