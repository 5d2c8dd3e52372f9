//! Periodic maintenance: the listing expiry sweep.
//!
//! Runs in a background task next to the request-serving workers. Failures
//! are logged and retried on the next tick, never propagated.

use {
    crate::infra::{
        notifications::{self, NotificationDispatcher},
        persistence::{Persistence, dto},
        profiles::ProfileDirectory,
    },
    anyhow::Result,
    chrono::{NaiveDate, Utc},
    matching::geo,
    model::{Event, MarketProfile, ProduceListing, Recipient},
    std::{sync::Arc, time::Duration},
};

/// Listings whose window closes within this many days trigger an
/// expiring-soon notice to interested markets.
const NOTICE_WINDOW_DAYS: std::ops::RangeInclusive<i64> = 2..=3;

/// Markets farther away than this are not bothered with expiring-soon
/// notices. Parties without coordinates are always notified.
const MAX_NOTICE_DISTANCE_KM: f64 = 200.0;

/// Moves available listings whose availability window has passed to
/// `expired` and warns markets about preferred produce that is about to
/// expire.
pub struct ListingExpirySweep {
    persistence: Persistence,
    dispatcher: Arc<dyn NotificationDispatcher>,
    profiles: Arc<dyn ProfileDirectory>,
    interval: Duration,
}

impl ListingExpirySweep {
    pub fn new(
        persistence: Persistence,
        dispatcher: Arc<dyn NotificationDispatcher>,
        profiles: Arc<dyn ProfileDirectory>,
        interval: Duration,
    ) -> Self {
        Self {
            persistence,
            dispatcher,
            profiles,
            interval,
        }
    }

    pub async fn run_forever(self) -> ! {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            match self.run_once(Utc::now().date_naive()).await {
                Ok(expired) => {
                    Metrics::get().expired_listings.inc_by(expired);
                }
                Err(err) => {
                    tracing::warn!(?err, "listing expiry sweep failed");
                }
            }
        }
    }

    /// One sweep pass; returns how many listings were marked expired.
    pub async fn run_once(&self, today: NaiveDate) -> Result<u64> {
        let mut ex = self.persistence.connection().await?;
        let expired = database::produce_listings::expire_outdated(&mut ex, today).await?;
        if expired > 0 {
            tracing::info!(expired, "marked listings expired");
        }

        let expiring = database::produce_listings::expiring_within(
            &mut ex,
            today + chrono::Duration::days(*NOTICE_WINDOW_DAYS.start()),
            today + chrono::Duration::days(*NOTICE_WINDOW_DAYS.end()),
        )
        .await?;
        drop(ex);
        if expiring.is_empty() {
            return Ok(expired);
        }

        let markets = self.profiles.markets().await?;
        for row in expiring {
            let listing = dto::listing_from_row(row);
            for market in &markets {
                if !market.prefers(&listing.produce_type) {
                    continue;
                }
                if !within_notice_distance(market, &listing) {
                    continue;
                }
                notifications::dispatch(
                    self.dispatcher.as_ref(),
                    Recipient::Market(market.id),
                    Event::ListingExpiringSoon {
                        listing: listing.id,
                        produce_type: listing.produce_type.clone(),
                        available_until: listing.available_until,
                    },
                )
                .await;
            }
        }
        Ok(expired)
    }
}

fn within_notice_distance(market: &MarketProfile, listing: &ProduceListing) -> bool {
    match (market.location.coordinates, listing.location.coordinates) {
        (Some(market), Some(listing)) => {
            geo::within_radius(market, listing, MAX_NOTICE_DISTANCE_KM)
        }
        _ => true,
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "maintenance")]
struct Metrics {
    /// Total number of listings marked expired by the sweep.
    expired_listings: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{self, RecordingDispatcher, StaticProfiles},
        bigdecimal::BigDecimal,
        model::{CarrierId, ListingId},
    };

    #[tokio::test]
    #[ignore]
    async fn postgres_sweep_expires_and_notifies() {
        let persistence = Persistence::new("postgresql://").unwrap();
        database::clear_DANGER(persistence.pool()).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut ex = persistence.connection().await.unwrap();
        let row = |from_offset: i64, until_offset: i64| database::produce_listings::ProduceListing {
            id: 0,
            farmer_id: 1,
            title: "Fresh maize".to_string(),
            produce_type: "Maize".to_string(),
            quantity: BigDecimal::from(200),
            unit: "kg".to_string(),
            price_per_unit: BigDecimal::from(100),
            available_from: today + chrono::Duration::days(from_offset),
            available_until: today + chrono::Duration::days(until_offset),
            status: database::produce_listings::ListingStatus::Available,
            organic: false,
            address: "Farm Road 1".to_string(),
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        };
        let outdated = database::produce_listings::insert(&mut ex, &row(-10, -1))
            .await
            .unwrap();
        let expiring = database::produce_listings::insert(&mut ex, &row(-1, 2))
            .await
            .unwrap();
        let fresh = database::produce_listings::insert(&mut ex, &row(-1, 30))
            .await
            .unwrap();
        drop(ex);

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let sweep = ListingExpirySweep::new(
            persistence.clone(),
            dispatcher.clone(),
            Arc::new(StaticProfiles {
                markets: vec![testutil::market()],
                carriers: vec![CarrierId(1)],
            }),
            Duration::from_secs(3600),
        );

        assert_eq!(sweep.run_once(today).await.unwrap(), 1);

        let mut ex = persistence.connection().await.unwrap();
        for (id, expected) in [
            (outdated, database::produce_listings::ListingStatus::Expired),
            (expiring, database::produce_listings::ListingStatus::Available),
            (fresh, database::produce_listings::ListingStatus::Available),
        ] {
            let listing = database::produce_listings::fetch(&mut ex, id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(listing.status, expected);
        }

        let notices = dispatcher.events();
        assert_eq!(notices.len(), 1);
        assert!(matches!(
            &notices[0].1,
            Event::ListingExpiringSoon { listing, .. } if *listing == ListingId(expiring)
        ));
    }
}
