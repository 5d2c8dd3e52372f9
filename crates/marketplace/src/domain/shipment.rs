//! The shipment bidding engine: carriers compete for a shipment, exactly one
//! bid wins, and the winning carrier drives the shipment to delivery.
//!
//! Every transition runs in one transaction that locks the shipment row, so
//! two workers accepting bids concurrently serialize on the row and the
//! loser of the race observes a shipment that is no longer accepting bids.

use {
    crate::{
        domain::{Actor, Error, Metrics},
        infra::{
            notifications::{self, NotificationDispatcher},
            persistence::{Persistence, dto},
        },
    },
    bigdecimal::{BigDecimal, Zero},
    chrono::{DateTime, Utc},
    model::{
        BidId, Event, FarmerId, MarketId, Recipient, Shipment, ShipmentBid, ShipmentId,
        TruckingCompany,
    },
    sqlx::PgConnection,
    std::sync::Arc,
};

/// A bid as submitted by a carrier.
#[derive(Clone, Debug)]
pub struct NewBid {
    pub amount: BigDecimal,
    pub message: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
}

/// Aggregate view over a shipment's pending bids. Accepted, rejected and
/// withdrawn bids are excluded.
#[derive(Clone, Debug, PartialEq)]
pub struct BidSummary {
    pub pending_bids: i64,
    pub lowest: Option<BigDecimal>,
    pub highest: Option<BigDecimal>,
    pub average: Option<BigDecimal>,
}

pub struct ShipmentBiddingEngine {
    persistence: Persistence,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ShipmentBiddingEngine {
    pub fn new(persistence: Persistence, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            persistence,
            dispatcher,
        }
    }

    /// A carrier offers to fulfil a shipment. The first bid moves a fresh
    /// shipment from `pending` to `bidding_open`.
    pub async fn submit_bid(
        &self,
        carrier: &TruckingCompany,
        shipment_id: ShipmentId,
        bid: NewBid,
    ) -> Result<ShipmentBid, Error> {
        if bid.amount <= BigDecimal::zero() {
            return Err(Error::Validation("bid amount must be positive".to_string()));
        }
        if bid.estimated_delivery <= bid.pickup_time {
            return Err(Error::Validation(
                "estimated delivery must be after pickup".to_string(),
            ));
        }

        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if !accepts_bids(&shipment) {
            return Err(Error::InvalidState("shipment is not accepting bids"));
        }
        if shipment.status == database::shipments::ShipmentStatus::Pending {
            database::shipments::update_status(
                &mut tx,
                shipment.id,
                database::shipments::ShipmentStatus::BiddingOpen,
            )
            .await?;
        }

        let row = database::shipment_bids::ShipmentBid {
            id: 0,
            shipment_id: shipment.id,
            carrier_id: carrier.id.into(),
            bid_amount: bid.amount,
            message: bid.message,
            pickup_time: bid.pickup_time,
            estimated_delivery: bid.estimated_delivery,
            status: database::shipment_bids::BidStatus::Pending,
            created_at: Utc::now(),
        };
        let id = database::shipment_bids::insert(&mut tx, &row).await?;
        let (farmer, market) = parties(&mut tx, &shipment).await?;
        tx.commit().await?;

        Metrics::on_transition("bid", "submitted");
        let bid = dto::bid_from_row(database::shipment_bids::ShipmentBid { id, ..row });
        self.notify_all(
            [Recipient::Farmer(farmer), Recipient::Market(market)],
            Event::BidSubmitted {
                shipment: bid.shipment,
                bid: bid.id,
                amount: bid.bid_amount.clone(),
            },
        )
        .await;
        Ok(bid)
    }

    /// Selects the winning bid: the bid becomes `accepted`, every other
    /// pending bid `rejected`, and the shipment takes over the bid's carrier
    /// and amount — all in one transaction, so no reader ever observes an
    /// accepted bid without an assigned carrier or two accepted bids.
    pub async fn accept_bid(
        &self,
        shipment_id: ShipmentId,
        bid_id: BidId,
    ) -> Result<Shipment, Error> {
        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if !accepts_bids(&shipment) {
            return Err(Error::InvalidState("shipment is not accepting bids"));
        }
        let bid = database::shipment_bids::fetch_for_update(&mut tx, bid_id.into())
            .await?
            .ok_or(Error::NotFound("bid"))?;
        if bid.shipment_id != shipment.id {
            return Err(Error::Consistency("bid does not belong to this shipment"));
        }
        if bid.status != database::shipment_bids::BidStatus::Pending {
            return Err(Error::InvalidState("bid is not pending"));
        }

        database::shipment_bids::update_status(
            &mut tx,
            bid.id,
            database::shipment_bids::BidStatus::Accepted,
        )
        .await?;
        let rejected =
            database::shipment_bids::reject_pending_siblings(&mut tx, shipment.id, bid.id).await?;
        database::shipments::assign_winning_bid(
            &mut tx,
            shipment.id,
            bid.carrier_id,
            &bid.bid_amount,
        )
        .await?;
        let updated = database::shipments::fetch(&mut tx, shipment.id)
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        let (farmer, market) = parties(&mut tx, &shipment).await?;
        tx.commit().await?;

        Metrics::on_transition("bid", "accepted");
        tracing::debug!(
            shipment = shipment.id,
            bid = bid.id,
            rejected,
            "accepted bid and rejected competitors"
        );
        self.notify_all(
            [
                Recipient::Carrier(model::CarrierId(bid.carrier_id)),
                Recipient::Farmer(farmer),
                Recipient::Market(market),
            ],
            Event::BidAccepted {
                shipment: shipment_id,
                bid: bid_id,
                amount: bid.bid_amount.clone(),
            },
        )
        .await;
        Ok(dto::shipment_from_row(updated))
    }

    /// The assigned carrier picks the cargo up.
    pub async fn mark_in_transit(&self, shipment_id: ShipmentId) -> Result<(), Error> {
        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if shipment.status != database::shipments::ShipmentStatus::BidAccepted
            || shipment.carrier_id.is_none()
        {
            return Err(Error::InvalidState(
                "shipment has no accepted bid and assigned carrier",
            ));
        }
        database::shipments::update_status(
            &mut tx,
            shipment.id,
            database::shipments::ShipmentStatus::InTransit,
        )
        .await?;
        let (farmer, market) = parties(&mut tx, &shipment).await?;
        tx.commit().await?;

        Metrics::on_transition("shipment", "in_transit");
        self.notify_parties(&shipment, farmer, market, Event::ShipmentInTransit {
            shipment: shipment_id,
            tracking_number: shipment.tracking_number.clone(),
        })
        .await;
        Ok(())
    }

    /// Completes the shipment: the shipment becomes `delivered`, the request
    /// `completed`, and — only when the accepted request covers the whole
    /// listed quantity — the listing `sold`. One transaction, all or
    /// nothing.
    pub async fn mark_delivered(&self, shipment_id: ShipmentId) -> Result<(), Error> {
        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if shipment.status != database::shipments::ShipmentStatus::InTransit {
            return Err(Error::InvalidState("shipment is not in transit"));
        }
        let request = database::produce_requests::fetch_for_update(&mut tx, shipment.request_id)
            .await?
            .ok_or(Error::NotFound("request"))?;
        let listing = database::produce_listings::fetch_for_update(&mut tx, shipment.listing_id)
            .await?
            .ok_or(Error::NotFound("listing"))?;

        database::shipments::update_status(
            &mut tx,
            shipment.id,
            database::shipments::ShipmentStatus::Delivered,
        )
        .await?;
        database::produce_requests::update_status(
            &mut tx,
            request.id,
            database::produce_requests::RequestStatus::Completed,
        )
        .await?;
        if request.quantity >= listing.quantity {
            database::produce_listings::update_status(
                &mut tx,
                listing.id,
                database::produce_listings::ListingStatus::Sold,
            )
            .await?;
        }
        tx.commit().await?;

        Metrics::on_transition("shipment", "delivered");
        self.notify_parties(
            &shipment,
            FarmerId(listing.farmer_id),
            MarketId(request.market_id),
            Event::ShipmentDelivered {
                shipment: shipment_id,
                tracking_number: shipment.tracking_number.clone(),
            },
        )
        .await;
        Ok(())
    }

    /// Records that an in-transit shipment will not arrive. Terminal.
    pub async fn mark_failed(&self, shipment_id: ShipmentId) -> Result<(), Error> {
        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if shipment.status != database::shipments::ShipmentStatus::InTransit {
            return Err(Error::InvalidState("shipment is not in transit"));
        }
        database::shipments::update_status(
            &mut tx,
            shipment.id,
            database::shipments::ShipmentStatus::Failed,
        )
        .await?;
        let (farmer, market) = parties(&mut tx, &shipment).await?;
        tx.commit().await?;

        Metrics::on_transition("shipment", "failed");
        self.notify_parties(&shipment, farmer, market, Event::ShipmentFailed {
            shipment: shipment_id,
            tracking_number: shipment.tracking_number.clone(),
        })
        .await;
        Ok(())
    }

    /// The farmer or market side calls the shipment off before any bid was
    /// accepted; every pending bid is rejected along the way.
    pub async fn cancel(&self, actor: Actor, shipment_id: ShipmentId) -> Result<(), Error> {
        let mut tx = self.persistence.begin().await?;
        let shipment = database::shipments::fetch_for_update(&mut tx, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        if !accepts_bids(&shipment) {
            return Err(Error::InvalidState(
                "shipment can no longer be cancelled by the trading parties",
            ));
        }
        let (farmer, market) = parties(&mut tx, &shipment).await?;
        if actor != Actor::Farmer(farmer) && actor != Actor::Market(market) {
            return Err(Error::Authorization("cancel this shipment"));
        }

        database::shipment_bids::reject_all_pending(&mut tx, shipment.id).await?;
        database::shipments::update_status(
            &mut tx,
            shipment.id,
            database::shipments::ShipmentStatus::Cancelled,
        )
        .await?;
        tx.commit().await?;

        Metrics::on_transition("shipment", "cancelled");
        self.notify_parties(&shipment, farmer, market, Event::ShipmentCancelled {
            shipment: shipment_id,
        })
        .await;
        Ok(())
    }

    /// The owning carrier withdraws its own bid while it is still pending.
    pub async fn withdraw_bid(&self, actor: Actor, bid_id: BidId) -> Result<(), Error> {
        let Actor::Carrier(carrier) = actor else {
            return Err(Error::Authorization("withdraw this bid"));
        };
        let mut tx = self.persistence.begin().await?;
        let bid = database::shipment_bids::fetch_for_update(&mut tx, bid_id.into())
            .await?
            .ok_or(Error::NotFound("bid"))?;
        if bid.carrier_id != i64::from(carrier) {
            return Err(Error::Authorization("withdraw this bid"));
        }
        if bid.status != database::shipment_bids::BidStatus::Pending {
            return Err(Error::InvalidState("bid is not pending"));
        }
        database::shipment_bids::update_status(
            &mut tx,
            bid.id,
            database::shipment_bids::BidStatus::Cancelled,
        )
        .await?;
        tx.commit().await?;

        Metrics::on_transition("bid", "withdrawn");
        Ok(())
    }

    /// Pending-bid statistics for a shipment.
    pub async fn bid_summary(&self, shipment_id: ShipmentId) -> Result<BidSummary, Error> {
        let mut ex = self.persistence.connection().await?;
        database::shipments::fetch(&mut ex, shipment_id.into())
            .await?
            .ok_or(Error::NotFound("shipment"))?;
        let aggregates = database::shipment_bids::aggregates(&mut ex, shipment_id.into()).await?;
        Ok(BidSummary {
            pending_bids: aggregates.pending_count,
            lowest: aggregates.lowest,
            highest: aggregates.highest,
            average: aggregates.average,
        })
    }

    /// All bids ever submitted for a shipment, newest first.
    pub async fn bids(&self, shipment_id: ShipmentId) -> Result<Vec<ShipmentBid>, Error> {
        let mut ex = self.persistence.connection().await?;
        let rows = database::shipment_bids::for_shipment(&mut ex, shipment_id.into()).await?;
        Ok(rows.into_iter().map(dto::bid_from_row).collect())
    }

    /// Shipments still looking for a carrier, newest first.
    pub async fn awaiting_carrier(&self, limit: i64) -> Result<Vec<Shipment>, Error> {
        let mut ex = self.persistence.connection().await?;
        let rows = database::shipments::available_for_bidding(&mut ex, limit).await?;
        Ok(rows.into_iter().map(dto::shipment_from_row).collect())
    }

    async fn notify_parties(
        &self,
        shipment: &database::shipments::Shipment,
        farmer: FarmerId,
        market: MarketId,
        event: Event,
    ) {
        let mut recipients = vec![Recipient::Farmer(farmer), Recipient::Market(market)];
        if let Some(carrier) = shipment.carrier_id {
            recipients.push(Recipient::Carrier(model::CarrierId(carrier)));
        }
        self.notify_all(recipients, event).await;
    }

    async fn notify_all(
        &self,
        recipients: impl IntoIterator<Item = Recipient>,
        event: Event,
    ) {
        for recipient in recipients {
            notifications::dispatch(self.dispatcher.as_ref(), recipient, event.clone()).await;
        }
    }
}

fn accepts_bids(shipment: &database::shipments::Shipment) -> bool {
    matches!(
        shipment.status,
        database::shipments::ShipmentStatus::Pending
            | database::shipments::ShipmentStatus::BiddingOpen
    )
}

/// The farmer and market behind a shipment, via its listing and request.
async fn parties(
    ex: &mut PgConnection,
    shipment: &database::shipments::Shipment,
) -> Result<(FarmerId, MarketId), Error> {
    let listing = database::produce_listings::fetch(ex, shipment.listing_id)
        .await?
        .ok_or(Error::NotFound("listing"))?;
    let request = database::produce_requests::fetch(ex, shipment.request_id)
        .await?
        .ok_or(Error::NotFound("request"))?;
    Ok((FarmerId(listing.farmer_id), MarketId(request.market_id)))
}
