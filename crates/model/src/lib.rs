//! Data model of the produce marketplace core.
//!
//! Plain data types shared between the matching logic, the persistence layer
//! and the lifecycle engines. Status fields are closed enums; the lifecycle
//! engines are the only components that may drive them through transitions.

pub mod bid;
pub mod events;
pub mod listing;
pub mod location;
pub mod profile;
pub mod request;
pub mod shipment;

pub use {
    bid::{BidId, BidStatus, ShipmentBid},
    events::{Event, Recipient},
    listing::{ListingId, ListingStatus, ProduceListing},
    location::{Coordinates, Location},
    profile::{CarrierId, FarmerId, FarmerProfile, MarketId, MarketProfile, TruckingCompany},
    request::{ProduceRequest, RequestId, RequestStatus},
    shipment::{Shipment, ShipmentId, ShipmentStatus},
};
