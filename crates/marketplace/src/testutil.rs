//! Shared fixtures for the engine tests. The `postgres_*` tests commit real
//! transactions, so every harness starts by clearing the tables.

use {
    crate::{
        domain::{
            Actor,
            catalog::{Catalog, NewListing},
            request::{Decision, NewRequest, RequestLifecycle},
            shipment::{NewBid, ShipmentBiddingEngine},
        },
        infra::{
            notifications::LoggingDispatcher,
            persistence::{Persistence, dto},
            profiles::ProfileDirectory,
        },
    },
    anyhow::Result,
    bigdecimal::BigDecimal,
    chrono::{Duration, Utc},
    model::{
        CarrierId, Coordinates, FarmerId, FarmerProfile, ListingStatus, Location, MarketId,
        MarketProfile, ProduceListing, ProduceRequest, RequestStatus, Shipment, ShipmentStatus,
        TruckingCompany,
    },
    std::sync::Arc,
};

/// Dispatcher that records everything it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    events: std::sync::Mutex<Vec<(model::Recipient, model::Event)>>,
}

impl RecordingDispatcher {
    pub(crate) fn events(&self) -> Vec<(model::Recipient, model::Event)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::infra::notifications::NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, recipient: model::Recipient, event: model::Event) -> Result<()> {
        self.events.lock().unwrap().push((recipient, event));
        Ok(())
    }
}

/// Profile directory backed by fixed data.
pub(crate) struct StaticProfiles {
    pub markets: Vec<MarketProfile>,
    pub carriers: Vec<CarrierId>,
}

#[async_trait::async_trait]
impl ProfileDirectory for StaticProfiles {
    async fn market(&self, id: MarketId) -> Result<Option<MarketProfile>> {
        Ok(self.markets.iter().find(|market| market.id == id).cloned())
    }

    async fn markets(&self) -> Result<Vec<MarketProfile>> {
        Ok(self.markets.clone())
    }

    async fn carriers(&self) -> Result<Vec<CarrierId>> {
        Ok(self.carriers.clone())
    }
}

pub(crate) fn farmer() -> FarmerProfile {
    FarmerProfile {
        id: FarmerId(1),
        farm_name: "Green Acres".to_string(),
        location: Location::new("Farm Road 1", Some(Coordinates { lat: 0.045, lng: 37.0 })),
    }
}

pub(crate) fn market() -> MarketProfile {
    MarketProfile {
        id: MarketId(4),
        market_name: "City Market".to_string(),
        preferred_produces: vec!["Maize".to_string()],
        location: Location::new("Market Square 2", Some(Coordinates { lat: 0.0, lng: 37.0 })),
    }
}

pub(crate) fn carrier(id: i64) -> TruckingCompany {
    TruckingCompany {
        id: CarrierId(id),
        company_name: format!("Haulage {id}"),
        rates: vec![],
    }
}

pub(crate) fn new_listing() -> NewListing {
    let today = Utc::now().date_naive();
    NewListing {
        title: "Fresh maize".to_string(),
        produce_type: "Maize".to_string(),
        quantity: BigDecimal::from(200),
        unit: "kg".to_string(),
        price_per_unit: BigDecimal::from(100),
        available_from: today - Duration::days(1),
        available_until: today + Duration::days(10),
        organic: false,
    }
}

pub(crate) fn new_bid(amount: i64) -> NewBid {
    let pickup = Utc::now() + Duration::days(1);
    NewBid {
        amount: BigDecimal::from(amount),
        message: None,
        pickup_time: pickup,
        estimated_delivery: pickup + Duration::days(1),
    }
}

pub(crate) struct Harness {
    pub persistence: Persistence,
    pub catalog: Catalog,
    pub lifecycle: RequestLifecycle,
    pub bidding: ShipmentBiddingEngine,
    pub farmer: FarmerProfile,
    pub market: MarketProfile,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let persistence = Persistence::new("postgresql://").unwrap();
        database::clear_DANGER(persistence.pool()).await.unwrap();

        let dispatcher = Arc::new(LoggingDispatcher);
        let profiles = Arc::new(StaticProfiles {
            markets: vec![market()],
            carriers: vec![CarrierId(1), CarrierId(2), CarrierId(3)],
        });
        Self {
            catalog: Catalog::new(persistence.clone(), dispatcher.clone(), profiles.clone()),
            lifecycle: RequestLifecycle::new(
                persistence.clone(),
                dispatcher.clone(),
                profiles.clone(),
            ),
            bidding: ShipmentBiddingEngine::new(persistence.clone(), dispatcher),
            persistence,
            farmer: farmer(),
            market: market(),
        }
    }

    /// Publishes a listing of 200 kg, requests `quantity` of it and has the
    /// farmer accept, producing a shipment that accepts bids.
    pub(crate) async fn seed_accepted_shipment(
        &self,
        quantity: i64,
    ) -> (ProduceListing, ProduceRequest, Shipment) {
        let listing = self
            .catalog
            .add_listing(&self.farmer, new_listing())
            .await
            .unwrap();
        let request = self
            .lifecycle
            .create(&self.market, NewRequest {
                listing: listing.id,
                quantity: BigDecimal::from(quantity),
                price_offered: None,
                message: None,
            })
            .await
            .unwrap();
        let outcome = self
            .lifecycle
            .respond(
                Actor::Farmer(self.farmer.id),
                request.id,
                Decision::Accepted,
            )
            .await
            .unwrap();
        (listing, outcome.request, outcome.shipment.unwrap())
    }

    /// Bids, accepts the bid and picks up, leaving the shipment in transit.
    pub(crate) async fn drive_to_transit(&self, shipment: &Shipment) {
        let bid = self
            .bidding
            .submit_bid(&carrier(9), shipment.id, new_bid(120))
            .await
            .unwrap();
        self.bidding.accept_bid(shipment.id, bid.id).await.unwrap();
        self.bidding.mark_in_transit(shipment.id).await.unwrap();
    }

    /// Current stored statuses of the three entities.
    pub(crate) async fn statuses(
        &self,
        listing: &ProduceListing,
        request: &ProduceRequest,
        shipment: &Shipment,
    ) -> (ListingStatus, RequestStatus, ShipmentStatus) {
        let mut ex = self.persistence.connection().await.unwrap();
        let listing = database::produce_listings::fetch(&mut ex, listing.id.into())
            .await
            .unwrap()
            .unwrap();
        let request = database::produce_requests::fetch(&mut ex, request.id.into())
            .await
            .unwrap()
            .unwrap();
        let shipment = database::shipments::fetch(&mut ex, shipment.id.into())
            .await
            .unwrap()
            .unwrap();
        (
            dto::listing_status_from_row(listing.status),
            dto::request_status_from_row(request.status),
            dto::shipment_status_from_row(shipment.status),
        )
    }
}
