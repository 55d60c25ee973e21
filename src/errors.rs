/*!
 * Error types for the estrans engine.
 *
 * This module contains custom error types for different parts of the engine,
 * using the thiserror crate for ergonomic error definitions. The taxonomy
 * separates document-scoped failures (which never stop a run) from
 * run-scoped failures (which do).
 */

use thiserror::Error;

/// Errors raised by translation backends
#[derive(Error, Debug)]
pub enum InterpreterError {
    /// The backend runtime is not installed or not reachable
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend does not know the requested language pair
    #[error("Unsupported language pair: {0}")]
    UnsupportedPair(String),

    /// The translation exceeded the caller-supplied timeout
    #[error("Translation timed out after {0}s")]
    Timeout(u64),

    /// Another process held the pack lock past the acquisition timeout
    #[error("Could not acquire pack lock for pair {0}")]
    PackLockTimeout(String),

    /// The backend accepted the pair but failed to translate
    #[error("Translation failed: {0}")]
    Failed(String),
}

/// Errors raised by the document store client
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached at all (fatal for the run)
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The scan cursor lease expired before the next page was fetched
    #[error("Scan cursor expired (lease {0}s)")]
    CursorExpired(u64),

    /// The store rejected a query or returned an unreadable response
    #[error("Store query error: {0}")]
    Query(String),

    /// A partial document update was rejected
    #[error("Write failed for doc {id}: {reason}")]
    Write {
        /// Identifier of the document whose update failed
        id: String,
        /// Reason reported by the store
        reason: String,
    },

    /// The document disappeared between scan and fetch
    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Errors raised by the job broker
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The queue database could not be opened or queried
    #[error("Broker error: {0}")]
    Database(String),

    /// A queued payload could not be decoded back into a job
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

/// Top-level engine error type that wraps all other errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// A malformed language code was supplied (fatal before any work starts)
    #[error("Invalid language code: '{0}'")]
    InvalidLanguageCode(String),

    /// Source and target normalize to the same language
    #[error("Degenerate language pair: '{0}' and '{1}' are the same language")]
    DegeneratePair(String, String),

    /// No direct or two-hop path exists for the requested pair
    #[error("No translation path available for pair {0}")]
    PairNotAvailable(String),

    /// Error from a translation backend
    #[error("Interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    /// Error from the document store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the job broker
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl EngineError {
    /// Whether this error must terminate the whole run.
    ///
    /// Document-scoped errors (unsupported pair, timeout, write failure)
    /// are reported per document and the run continues; connectivity and
    /// configuration errors are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Store(StoreError::Connection(_))
                | EngineError::InvalidLanguageCode(_)
                | EngineError::DegeneratePair(_, _)
                | EngineError::Config(_)
                | EngineError::Interpreter(InterpreterError::BackendUnavailable(_))
        )
    }
}

// Utility conversions for the application boundary
impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
