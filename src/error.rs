//! Error types for the inline translation pipeline
//!
//! Every failure is caught at the boundary of the component that produced it
//! and converted into either a failure envelope ([`crate::relay::RelayResponse`])
//! or a rendered bubble state. No error crosses a component boundary as an
//! unhandled panic or stray `Err`.

use thiserror::Error;

/// Error taxonomy for the translator.
///
/// The variants mirror the places a translation attempt can fail:
/// bundled-resource loading, persisted-settings I/O, input validation,
/// the network hop, and the response payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// A bundled resource is missing or unparseable. Non-fatal: callers
    /// degrade to compiled-in defaults.
    #[error("Failed to load bundled config: {0}")]
    ConfigLoad(String),

    /// Persisted-settings read or write failure. Reads degrade silently to
    /// defaults; writes surface this on explicit save actions.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input (selection too long, missing request URL).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The endpoint string could not be resolved to an absolute URL.
    #[error("Invalid endpoint configuration: {0}")]
    Config(String),

    /// The fetch itself failed (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status.
    #[error("Translation API responded with {status}")]
    Http { status: u16 },

    /// The response parsed but carried no recognized translation field.
    #[error("No translation returned from API")]
    Payload,
}

/// Result type for translator operations
pub type TranslateResult<T> = Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_embeds_status() {
        let err = TranslateError::Http { status: 503 };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_storage_error_carries_backend_message() {
        let err = TranslateError::Storage("quota exceeded".to_string());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
