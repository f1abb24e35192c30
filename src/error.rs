use thiserror::Error;

/// Transport-agnostic error surface for the injection engine.
///
/// Mirrors `pysqli.core.exceptions`: one variant per failure mode the
/// forge/injector/pool/dbms stack can raise. Triggers never produce an
/// error variant themselves — a failing oracle call still resolves to an
/// unambiguous boolean, per the trigger contract.
#[derive(Debug, Error)]
pub enum SqliError {
    /// Bisection hit the configured upper cap; the true value (typically
    /// a string length) likely exceeds `limit_count_max`.
    #[error("bisection exceeded the configured bound (limit_count_max)")]
    OutOfRange,

    /// The requested enumeration is not supported by the active dialect's
    /// capability bitset.
    #[error("operation not available for this dialect")]
    Unavailable,

    /// A forge method that a dialect is required to override was called
    /// on the base implementation.
    #[error("forge method `{0}` must be overridden by the dialect")]
    NotImplemented(&'static str),

    /// `target` does not name a key/index present in `Context`'s params.
    #[error("target parameter `{0}` not found in injection parameters")]
    InvalidTarget(String),

    /// A field name was looked up in a table's cached field list (in
    /// strict mode) and was not found.
    #[error("unknown field `{0}` on table `{1}`")]
    UnknownField(String, String),

    /// Underlying I/O or subprocess failure.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

pub type Result<T> = std::result::Result<T, SqliError>;
