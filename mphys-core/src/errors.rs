use thiserror::Error;

/// Error type for invalid operations.
///
/// Every error aborts the current test case; nothing in the core retries or recovers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MPhysError {
    /// Malformed or inconsistent driver/test-case parameters, detected before stepping begins.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Physically invalid input to a dynamics or scheme computation.
    #[error("Domain error: {0}")]
    Domain(String),
    /// Inconsistent thermodynamic state or an operation invalid in the current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// A microphysics or advection engine failed or could not be started.
    #[error("Engine error in {engine}: {reason}")]
    Engine { engine: String, reason: String },
}

impl MPhysError {
    pub fn engine(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        MPhysError::Engine {
            engine: engine.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, MPhysError>`.
pub type MPhysResult<T> = Result<T, MPhysError>;
