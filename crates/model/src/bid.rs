use {
    crate::{profile::CarrierId, shipment::ShipmentId},
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
pub struct BidId(pub i64);

/// Lifecycle state of a carrier bid.
///
/// At most one bid per shipment ever holds `Accepted`; accepting one bid
/// rejects all pending siblings in the same transaction. A carrier may
/// withdraw (`Cancelled`) its own bid only while it is still `Pending`.
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
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// A carrier's priced, timed offer to fulfil a shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipmentBid {
    pub id: BidId,
    pub shipment: ShipmentId,
    pub carrier: CarrierId,
    pub bid_amount: BigDecimal,
    pub message: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl ShipmentBid {
    /// Offered transport duration in hours, rounded to one decimal place.
    pub fn delivery_duration_hours(&self) -> f64 {
        let seconds = (self.estimated_delivery - self.pickup_time).num_seconds();
        (seconds as f64 / 3600.0 * 10.0).round() / 10.0
    }
}
