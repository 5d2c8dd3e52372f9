//! Lifecycle events emitted by the engines and consumed by the notification
//! dispatcher.
//!
//! Payloads carry ids and the figures a notification template needs; the
//! dispatcher implementation (outside this core) resolves display names.

use {
    crate::{
        bid::BidId,
        listing::ListingId,
        profile::{CarrierId, FarmerId, MarketId},
        request::RequestId,
        shipment::ShipmentId,
    },
    bigdecimal::BigDecimal,
    chrono::NaiveDate,
    serde::Serialize,
};

/// The party a notification is addressed to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Farmer(FarmerId),
    Market(MarketId),
    Carrier(CarrierId),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    ListingPublished {
        listing: ListingId,
        produce_type: String,
    },
    ListingExpiringSoon {
        listing: ListingId,
        produce_type: String,
        available_until: NaiveDate,
    },
    RequestCreated {
        request: RequestId,
        listing: ListingId,
        quantity: BigDecimal,
    },
    RequestAccepted {
        request: RequestId,
        shipment: ShipmentId,
    },
    RequestDeclined {
        request: RequestId,
    },
    RequestCancelled {
        request: RequestId,
    },
    ShipmentOpenForBids {
        shipment: ShipmentId,
        origin_address: String,
        destination_address: String,
        distance_km: Option<f64>,
        estimated_cost: Option<BigDecimal>,
    },
    BidSubmitted {
        shipment: ShipmentId,
        bid: BidId,
        amount: BigDecimal,
    },
    BidAccepted {
        shipment: ShipmentId,
        bid: BidId,
        amount: BigDecimal,
    },
    ShipmentInTransit {
        shipment: ShipmentId,
        tracking_number: String,
    },
    ShipmentDelivered {
        shipment: ShipmentId,
        tracking_number: String,
    },
    ShipmentFailed {
        shipment: ShipmentId,
        tracking_number: String,
    },
    ShipmentCancelled {
        shipment: ShipmentId,
    },
}
