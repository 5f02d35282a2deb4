//! Error Types
//!
//! One error enum for the whole core. Recoverable absences (missing
//! lookups, out-of-bounds queries) are `Option`/`bool` returns at the call
//! site, not errors; this enum covers contract violations and structural
//! failures that must surface to the caller.

use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A caller violated an API contract (empty pick, mismatched weights,
    /// duplicate system name, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A `require`-style lookup found nothing.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Branch creation beyond the configured limit.
    #[error("branch limit reached ({limit} branches)")]
    BranchLimitReached { limit: usize },

    /// A system panicked during `execute`. The offending tick was not
    /// applied; the clock stays on it.
    #[error("system '{system}' failed at tick {tick}: {message}")]
    EngineFault {
        system: String,
        tick: u64,
        message: String,
    },

    /// Malformed save data or an unknown component kind on restore.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// Result alias used across the core.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidArgument("empty pick".to_string());
        assert_eq!(err.to_string(), "invalid argument: empty pick");

        let err = CoreError::NotFound { kind: "branch", id: 9 };
        assert_eq!(err.to_string(), "branch 9 not found");

        let err = CoreError::BranchLimitReached { limit: 3 };
        assert!(err.to_string().contains("3"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
