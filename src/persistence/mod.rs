//! Boundary contract for the durable persistence collaborator. The engine
//! never blocks on it: registration failures are surfaced to the session,
//! update/complete failures are logged and dropped.

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dto::snapshot::MatchSnapshot;

/// Result alias for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Error raised by persistence backends regardless of the underlying service.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend understood the request and refused it.
    #[error("persistence rejected the request: {reason}")]
    Rejected { reason: String },
}

impl PersistenceError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        PersistenceError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Outcome of an ingest-key check performed at session start.
#[derive(Debug, Clone)]
pub struct KeyValidation {
    pub valid: bool,
    /// Human-readable rejection reason when `valid` is false.
    pub reason: Option<String>,
    /// Organization the key belongs to when `valid` is true.
    pub organization_id: Option<String>,
}

/// Abstraction over the durable match store and key service.
pub trait MatchPersistence: Send + Sync {
    /// Register a freshly started match.
    fn register_match(&self, snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>>;
    /// Push the latest state of a registered match.
    fn update_match(&self, snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>>;
    /// Mark a registered match as finished.
    fn complete_match(&self, snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>>;
    /// Check an ingest key before a session is accepted.
    fn verify_key(&self, key: String) -> BoxFuture<'static, PersistenceResult<KeyValidation>>;
}

/// Persistence backend that accepts everything and stores nothing. Used when
/// the deployment runs without a backend, and in tests.
#[derive(Debug, Default)]
pub struct NullPersistence;

impl MatchPersistence for NullPersistence {
    fn register_match(&self, _snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn update_match(&self, _snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn complete_match(&self, _snapshot: MatchSnapshot) -> BoxFuture<'static, PersistenceResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn verify_key(&self, _key: String) -> BoxFuture<'static, PersistenceResult<KeyValidation>> {
        Box::pin(async {
            Ok(KeyValidation {
                valid: true,
                reason: None,
                organization_id: None,
            })
        })
    }
}
