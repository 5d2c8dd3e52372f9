//! The listing catalog: publishing listings and querying them ranked
//! against a market's preferences.

use {
    crate::{
        domain::{Error, Metrics},
        infra::{
            notifications::{self, NotificationDispatcher},
            persistence::{Persistence, dto},
            profiles::ProfileDirectory,
        },
    },
    bigdecimal::{BigDecimal, Zero},
    chrono::{Duration, NaiveDate, Utc},
    matching::{geo, scorer},
    model::{Event, FarmerProfile, ListingId, MarketProfile, ProduceListing, Recipient},
    std::{collections::HashMap, sync::Arc},
};

/// How far out a listing's window end still counts as urgent.
const URGENT_WINDOW_DAYS: i64 = 3;
const URGENT_LIMIT: i64 = 10;

/// A listing as submitted by a farmer, before it has an id or a status.
#[derive(Clone, Debug)]
pub struct NewListing {
    pub title: String,
    pub produce_type: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub price_per_unit: BigDecimal,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub organic: bool,
}

/// Filters for [`Catalog::find_matches`].
#[derive(Clone, Debug)]
pub struct MatchFilter {
    /// Restrict to one produce type instead of the market's whole preferred
    /// set.
    pub produce_type: Option<String>,
    pub max_distance_km: f64,
    pub limit: i64,
}

impl Default for MatchFilter {
    fn default() -> Self {
        Self {
            produce_type: None,
            max_distance_km: 100.0,
            limit: 20,
        }
    }
}

pub struct Catalog {
    persistence: Persistence,
    dispatcher: Arc<dyn NotificationDispatcher>,
    profiles: Arc<dyn ProfileDirectory>,
}

impl Catalog {
    pub fn new(
        persistence: Persistence,
        dispatcher: Arc<dyn NotificationDispatcher>,
        profiles: Arc<dyn ProfileDirectory>,
    ) -> Self {
        Self {
            persistence,
            dispatcher,
            profiles,
        }
    }

    /// Publishes a new listing for the farmer and tells every market that
    /// prefers its produce type about it.
    pub async fn add_listing(
        &self,
        farmer: &FarmerProfile,
        listing: NewListing,
    ) -> Result<ProduceListing, Error> {
        validate_listing(&listing)?;

        let row = database::produce_listings::ProduceListing {
            id: 0,
            farmer_id: farmer.id.into(),
            title: listing.title,
            produce_type: listing.produce_type,
            quantity: listing.quantity,
            unit: listing.unit,
            price_per_unit: listing.price_per_unit,
            available_from: listing.available_from,
            available_until: listing.available_until,
            status: database::produce_listings::ListingStatus::Available,
            organic: listing.organic,
            address: farmer.location.address.clone(),
            latitude: farmer.location.coordinates.map(|c| c.lat),
            longitude: farmer.location.coordinates.map(|c| c.lng),
            created_at: Utc::now(),
        };

        let mut ex = self.persistence.connection().await?;
        let id = database::produce_listings::insert(&mut ex, &row).await?;
        drop(ex);

        Metrics::on_transition("listing", "published");
        let listing = dto::listing_from_row(database::produce_listings::ProduceListing {
            id,
            ..row
        });
        self.notify_interested_markets(&listing).await;
        Ok(listing)
    }

    /// Scores a single listing against the market's preferences.
    pub async fn score(&self, market: &MarketProfile, listing: ListingId) -> Result<f64, Error> {
        let mut ex = self.persistence.connection().await?;
        let row = database::produce_listings::fetch(&mut ex, listing.into())
            .await?
            .ok_or(Error::NotFound("listing"))?;
        let averages =
            database::produce_listings::average_prices(&mut ex, &[row.produce_type.clone()])
                .await?;
        let listing = dto::listing_from_row(row);

        Ok(scorer::match_score(
            market,
            &listing,
            averages.first().map(|(_, average)| average),
            Utc::now().date_naive(),
        ))
    }

    /// Available-now listings matching the market's preferences, ranked by
    /// descending match score.
    ///
    /// Candidate generation pre-filters by an approximate bounding box when
    /// the market has coordinates, and applies the generic storefront order
    /// before the limit, so a very low limit favours organic and cheap
    /// listings over near ones.
    pub async fn find_matches(
        &self,
        market: &MarketProfile,
        filter: &MatchFilter,
    ) -> Result<Vec<scorer::Ranked>, Error> {
        let produce_types = match &filter.produce_type {
            Some(produce_type) => vec![produce_type.clone()],
            None => market.preferred_produces.clone(),
        };
        let within = market.location.coordinates.map(|center| {
            let bbox = geo::bounding_box(center, filter.max_distance_km);
            database::produce_listings::CoordinateRange {
                min_lat: bbox.min_lat,
                max_lat: bbox.max_lat,
                min_lng: bbox.min_lng,
                max_lng: bbox.max_lng,
            }
        });
        let today = Utc::now().date_naive();

        let mut ex = self.persistence.connection().await?;
        let rows = database::produce_listings::available_now(
            &mut ex,
            &database::produce_listings::AvailableFilter {
                today,
                produce_types: &produce_types,
                within,
                limit: filter.limit,
            },
        )
        .await?;
        let averages: HashMap<String, BigDecimal> =
            database::produce_listings::average_prices(&mut ex, &produce_types)
                .await?
                .into_iter()
                .collect();

        let candidates = rows.into_iter().map(dto::listing_from_row).collect();
        Ok(scorer::rank(market, candidates, &averages, today))
    }

    /// Listings of the market's preferred produce types whose availability
    /// window closes within the next few days, soonest first.
    pub async fn find_urgent_matches(
        &self,
        market: &MarketProfile,
    ) -> Result<Vec<ProduceListing>, Error> {
        let today = Utc::now().date_naive();
        let mut ex = self.persistence.connection().await?;
        let rows = database::produce_listings::expiring_until(
            &mut ex,
            today,
            today + Duration::days(URGENT_WINDOW_DAYS),
            &market.preferred_produces,
            URGENT_LIMIT,
        )
        .await?;
        Ok(rows.into_iter().map(dto::listing_from_row).collect())
    }

    async fn notify_interested_markets(&self, listing: &ProduceListing) {
        let markets = match self.profiles.markets().await {
            Ok(markets) => markets,
            Err(err) => {
                tracing::warn!(?err, "could not resolve markets for listing fan-out");
                return;
            }
        };
        for market in markets {
            if !market.prefers(&listing.produce_type) {
                continue;
            }
            notifications::dispatch(
                self.dispatcher.as_ref(),
                Recipient::Market(market.id),
                Event::ListingPublished {
                    listing: listing.id,
                    produce_type: listing.produce_type.clone(),
                },
            )
            .await;
        }
    }
}

fn validate_listing(listing: &NewListing) -> Result<(), Error> {
    if !(3..=100).contains(&listing.title.chars().count()) {
        return Err(Error::Validation(
            "title must be between 3 and 100 characters".to_string(),
        ));
    }
    if listing.produce_type.is_empty() {
        return Err(Error::Validation("produce type must be given".to_string()));
    }
    if listing.quantity <= BigDecimal::zero() {
        return Err(Error::Validation("quantity must be positive".to_string()));
    }
    if listing.price_per_unit < BigDecimal::zero() {
        return Err(Error::Validation(
            "price per unit must not be negative".to_string(),
        ));
    }
    if listing.available_from > listing.available_until {
        return Err(Error::Validation(
            "availability window must end after it starts".to_string(),
        ));
    }
    Ok(())
}
