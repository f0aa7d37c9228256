//! Error types for the apidrift core library.

/// Top-level error enum for the apidrift core library.
///
/// Expected analysis outcomes (ambiguous renames, unresolvable call sites,
/// values that need manual input) are *not* errors; they are surfaced as
/// [`crate::models::Diagnostic`] values. This enum covers contract
/// violations that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    /// A surface model handed in by the extractor is malformed (duplicate
    /// symbol identity, duplicate parameter name). Fatal: the extractor
    /// broke its contract and no output is produced.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// An internal invariant was violated (e.g. a change referencing a
    /// symbol absent from its model). Programmer error, not bad input.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DriftResult<T> = Result<T, DriftError>;
