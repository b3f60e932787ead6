use thiserror::Error;

/// Terminal error kinds surfaced by `pack`/`pack_multi`/`estimate`.
///
/// Per-candidate misses are not errors: they are recorded as
/// [`crate::model::UnplacedItem`] entries or emitted as
/// [`crate::progress::Event::Warning`], never propagated here.
#[derive(Debug, Error)]
pub enum NestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient space: {warning}")]
    InsufficientSpace { warning: String },

    #[error("operation cancelled with {placed} placement(s) recorded")]
    Cancelled { placed: usize },

    #[error("internal invariant violated for candidate '{candidate_id}': {detail}")]
    Internal { candidate_id: String, detail: String },
}

pub type Result<T> = std::result::Result<T, NestError>;
