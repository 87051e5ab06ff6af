/// A specialized result type for lease operations.
pub type Result<T, E = LeaseError> = core::result::Result<T, E>;

/// A failed round trip to the coordination store.
///
/// Store backends are free to fail in backend-specific ways (lost
/// connections, command timeouts, cluster failover), so this type carries a
/// human-readable context plus the backend's own error as an opaque source.
#[derive(thiserror::Error, Debug)]
#[error("coordination store failure: {context}")]
pub struct StoreError {
    context: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Creates a store error from a bare description.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a store error wrapping the backend's underlying error.
    pub fn with_source(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            context: context.into(),
            source: Some(source.into()),
        }
    }
}

/// All possible errors the lease manager can produce.
///
/// Everything here surfaces from [`acquire`]; renewal runs in the background
/// and reports trouble through [`lease_lost`] instead of an error channel.
///
/// [`acquire`]: crate::WorkerLeaseManager::acquire
/// [`lease_lost`]: crate::WorkerLeaseManager::lease_lost
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum LeaseError {
    /// Every candidate worker id in range is currently leased by a live
    /// instance. Fatal at startup: the process has no identity to run under.
    #[error("no free worker id: all {attempted} candidates are leased")]
    WorkerIdExhausted { attempted: u64 },

    /// This manager already holds a lease; release it before acquiring again.
    #[error("a worker lease is already held by this manager")]
    AlreadyAcquired,

    /// The lease configuration cannot be used as given.
    #[error("invalid lease config: {reason}")]
    InvalidConfig { reason: String },

    /// A coordination-store round trip failed during acquisition.
    #[error(transparent)]
    Store(#[from] StoreError),
}
