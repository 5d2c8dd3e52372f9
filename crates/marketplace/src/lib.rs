//! Lifecycle engines of the produce marketplace.
//!
//! `domain` holds the state machines and the matching orchestration: the
//! listing catalog, the purchase request lifecycle and the shipment bidding
//! engine. `infra` holds the seams to the outside world: the Postgres
//! persistence handle and the traits through which profiles are resolved and
//! notifications dispatched. `maintenance` holds the periodic jobs.
//!
//! Every state transition executes as a single database transaction scoped
//! to the affected rows; concurrent workers coordinate purely through the
//! database, never through in-process state.

pub mod domain;
pub mod infra;
pub mod maintenance;

#[cfg(test)]
mod testutil;

pub use {
    domain::{
        Actor,
        Error,
        catalog::{Catalog, MatchFilter, NewListing},
        request::{Decision, NewRequest, RequestLifecycle, RequestOutcome},
        shipment::{BidSummary, NewBid, ShipmentBiddingEngine},
    },
    infra::{
        notifications::{LoggingDispatcher, NotificationDispatcher},
        persistence::Persistence,
        profiles::ProfileDirectory,
    },
};
