use {
    crate::{listing::ListingId, profile::CarrierId, request::RequestId},
    bigdecimal::{BigDecimal, ToPrimitive},
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
pub struct ShipmentId(pub i64);

/// Lifecycle state of a shipment.
///
/// `Pending` and `BiddingOpen` both accept carrier bids; the first submitted
/// bid moves a `Pending` shipment to `BiddingOpen`. Accepting a bid moves it
/// to `BidAccepted`, then `InTransit` and `Delivered`. Any pre-transit state
/// can be `Cancelled`; `Failed` is the terminal exceptional outcome of an
/// in-transit shipment.
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
pub enum ShipmentStatus {
    Pending,
    BiddingOpen,
    BidAccepted,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

/// The logistics unit created once a request is accepted, needing a carrier.
///
/// `origin_address`/`destination_address` are frozen at creation time; later
/// edits to the profiles they were copied from do not propagate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub listing: ListingId,
    pub request: RequestId,
    pub carrier: Option<CarrierId>,
    pub origin_address: String,
    pub destination_address: String,
    pub distance_km: Option<f64>,
    pub agreed_price: Option<BigDecimal>,
    pub status: ShipmentStatus,
    pub tracking_number: String,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    pub fn can_accept_bids(&self) -> bool {
        matches!(
            self.status,
            ShipmentStatus::Pending | ShipmentStatus::BiddingOpen
        )
    }

    pub fn can_start_transit(&self) -> bool {
        self.status == ShipmentStatus::BidAccepted && self.carrier.is_some()
    }

    pub fn can_complete(&self) -> bool {
        self.status == ShipmentStatus::InTransit
    }

    /// Agreed price per kilometre, when both price and a positive distance
    /// are known. Rounded to 2 decimal places.
    pub fn cost_per_km(&self) -> Option<f64> {
        let price = self.agreed_price.as_ref()?.to_f64()?;
        let distance = self.distance_km.filter(|km| *km > 0.0)?;
        Some((price / distance * 100.0).round() / 100.0)
    }
}
