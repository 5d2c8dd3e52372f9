use {
    crate::{listing::ListingId, profile::MarketId},
    bigdecimal::BigDecimal,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
pub struct RequestId(pub i64);

/// Lifecycle state of a purchase request.
///
/// `Pending` transitions to `Accepted`, `Declined` or `Cancelled`;
/// `Accepted` transitions to `Completed` only through shipment delivery.
/// Terminal states are never mutated again.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Cancelled | Self::Completed)
    }
}

/// A market's offer to buy (part of) a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub id: RequestId,
    pub market: MarketId,
    pub listing: ListingId,
    pub quantity: BigDecimal,
    pub price_offered: Option<BigDecimal>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl ProduceRequest {
    /// Total amount the market offered, when a price was offered at all.
    pub fn total_offered_amount(&self) -> Option<BigDecimal> {
        self.price_offered
            .as_ref()
            .map(|price| &self.quantity * price)
    }
}
