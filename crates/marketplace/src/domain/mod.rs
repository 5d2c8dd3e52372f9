pub mod catalog;
pub mod request;
pub mod shipment;

use model::{CarrierId, FarmerId, MarketId};

/// Typed failure of a core operation.
///
/// Every state machine operation reports why it refused instead of silently
/// doing nothing; the application layer translates these into user-facing
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range input, e.g. a non-positive quantity.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The operation is not legal in the entity's current state.
    #[error("operation not allowed: {0}")]
    InvalidState(&'static str),
    /// The acting party may not perform this transition.
    #[error("actor is not permitted to {0}")]
    Authorization(&'static str),
    /// Referential mismatch between the entities involved.
    #[error("inconsistent reference: {0}")]
    Consistency(&'static str),
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The underlying store failed; any open transaction was rolled back and
    /// no partial state is visible.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The party attempting an operation, resolved once at the application
/// boundary.
///
/// The engines consume this capability tag directly and never re-derive
/// roles from user records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Actor {
    Farmer(FarmerId),
    Market(MarketId),
    Carrier(CarrierId),
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "lifecycle")]
pub(crate) struct Metrics {
    /// Successful lifecycle transitions by entity and transition.
    #[metric(labels("entity", "transition"))]
    pub(crate) transitions: prometheus::IntCounterVec,
}

impl Metrics {
    pub(crate) fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    pub(crate) fn on_transition(entity: &str, transition: &str) {
        Self::get()
            .transitions
            .with_label_values(&[entity, transition])
            .inc();
    }
}
