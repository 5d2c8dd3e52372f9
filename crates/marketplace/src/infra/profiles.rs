//! Read access to the party profiles owned by the surrounding application.
//!
//! Profiles arrive fully resolved: whatever geocoding happens, happens
//! before they cross this boundary. Absent coordinates mean the party's
//! location is unknown.

use {
    anyhow::Result,
    model::{CarrierId, MarketId, MarketProfile},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileDirectory: Send + Sync + 'static {
    /// The market profile for the given id, when it exists.
    async fn market(&self, id: MarketId) -> Result<Option<MarketProfile>>;

    /// All market profiles, for preference-based fan-out notifications.
    async fn markets(&self) -> Result<Vec<MarketProfile>>;

    /// Ids of all registered carriers, for new-shipment fan-out.
    async fn carriers(&self) -> Result<Vec<CarrierId>>;
}
