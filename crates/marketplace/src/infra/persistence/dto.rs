//! Conversions between the database row types and the domain model.

use model::{
    BidId, BidStatus, CarrierId, Coordinates, FarmerId, ListingId, ListingStatus, Location,
    MarketId, ProduceListing, ProduceRequest, RequestId, RequestStatus, Shipment, ShipmentBid,
    ShipmentId, ShipmentStatus,
};

pub fn listing_from_row(row: database::produce_listings::ProduceListing) -> ProduceListing {
    let coordinates = match (row.latitude, row.longitude) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    };
    ProduceListing {
        id: ListingId(row.id),
        farmer: FarmerId(row.farmer_id),
        title: row.title,
        produce_type: row.produce_type,
        quantity: row.quantity,
        unit: row.unit,
        price_per_unit: row.price_per_unit,
        available_from: row.available_from,
        available_until: row.available_until,
        status: listing_status_from_row(row.status),
        organic: row.organic,
        location: Location {
            address: row.address,
            coordinates,
        },
        created_at: row.created_at,
    }
}

pub fn listing_status_from_row(
    status: database::produce_listings::ListingStatus,
) -> ListingStatus {
    match status {
        database::produce_listings::ListingStatus::Available => ListingStatus::Available,
        database::produce_listings::ListingStatus::Reserved => ListingStatus::Reserved,
        database::produce_listings::ListingStatus::Sold => ListingStatus::Sold,
        database::produce_listings::ListingStatus::Expired => ListingStatus::Expired,
    }
}

pub fn request_from_row(row: database::produce_requests::ProduceRequest) -> ProduceRequest {
    ProduceRequest {
        id: RequestId(row.id),
        market: MarketId(row.market_id),
        listing: ListingId(row.listing_id),
        quantity: row.quantity,
        price_offered: row.price_offered,
        message: row.message,
        status: request_status_from_row(row.status),
        created_at: row.created_at,
    }
}

pub fn request_status_from_row(
    status: database::produce_requests::RequestStatus,
) -> RequestStatus {
    match status {
        database::produce_requests::RequestStatus::Pending => RequestStatus::Pending,
        database::produce_requests::RequestStatus::Accepted => RequestStatus::Accepted,
        database::produce_requests::RequestStatus::Declined => RequestStatus::Declined,
        database::produce_requests::RequestStatus::Cancelled => RequestStatus::Cancelled,
        database::produce_requests::RequestStatus::Completed => RequestStatus::Completed,
    }
}

pub fn shipment_from_row(row: database::shipments::Shipment) -> Shipment {
    Shipment {
        id: ShipmentId(row.id),
        listing: ListingId(row.listing_id),
        request: RequestId(row.request_id),
        carrier: row.carrier_id.map(CarrierId),
        origin_address: row.origin_address,
        destination_address: row.destination_address,
        distance_km: row.distance_km,
        agreed_price: row.agreed_price,
        status: shipment_status_from_row(row.status),
        tracking_number: row.tracking_number,
        created_at: row.created_at,
    }
}

pub fn shipment_status_from_row(status: database::shipments::ShipmentStatus) -> ShipmentStatus {
    match status {
        database::shipments::ShipmentStatus::Pending => ShipmentStatus::Pending,
        database::shipments::ShipmentStatus::BiddingOpen => ShipmentStatus::BiddingOpen,
        database::shipments::ShipmentStatus::BidAccepted => ShipmentStatus::BidAccepted,
        database::shipments::ShipmentStatus::InTransit => ShipmentStatus::InTransit,
        database::shipments::ShipmentStatus::Delivered => ShipmentStatus::Delivered,
        database::shipments::ShipmentStatus::Cancelled => ShipmentStatus::Cancelled,
        database::shipments::ShipmentStatus::Failed => ShipmentStatus::Failed,
    }
}

pub fn bid_from_row(row: database::shipment_bids::ShipmentBid) -> ShipmentBid {
    ShipmentBid {
        id: BidId(row.id),
        shipment: ShipmentId(row.shipment_id),
        carrier: CarrierId(row.carrier_id),
        bid_amount: row.bid_amount,
        message: row.message,
        pickup_time: row.pickup_time,
        estimated_delivery: row.estimated_delivery,
        status: bid_status_from_row(row.status),
        created_at: row.created_at,
    }
}

pub fn bid_status_from_row(status: database::shipment_bids::BidStatus) -> BidStatus {
    match status {
        database::shipment_bids::BidStatus::Pending => BidStatus::Pending,
        database::shipment_bids::BidStatus::Accepted => BidStatus::Accepted,
        database::shipment_bids::BidStatus::Rejected => BidStatus::Rejected,
        database::shipment_bids::BidStatus::Cancelled => BidStatus::Cancelled,
    }
}
