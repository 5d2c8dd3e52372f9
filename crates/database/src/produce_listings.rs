use {
    bigdecimal::BigDecimal,
    sqlx::{
        PgConnection,
        types::chrono::{DateTime, NaiveDate, Utc},
    },
};

pub type ListingId = i64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "ListingStatus")]
#[sqlx(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Reserved,
    Sold,
    Expired,
}

/// One row in the `produce_listings` table.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ProduceListing {
    pub id: ListingId,
    pub farmer_id: i64,
    pub title: String,
    pub produce_type: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub price_per_unit: BigDecimal,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub status: ListingStatus,
    pub organic: bool,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Stores the listing and returns the id. The id of the listing parameter is
/// not used.
pub async fn insert(
    ex: &mut PgConnection,
    listing: &ProduceListing,
) -> Result<ListingId, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO produce_listings (
    farmer_id,
    title,
    produce_type,
    quantity,
    unit,
    price_per_unit,
    available_from,
    available_until,
    status,
    organic,
    address,
    latitude,
    longitude,
    created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
RETURNING id
    "#;
    let (id,) = sqlx::query_as(QUERY)
        .bind(listing.farmer_id)
        .bind(&listing.title)
        .bind(&listing.produce_type)
        .bind(&listing.quantity)
        .bind(&listing.unit)
        .bind(&listing.price_per_unit)
        .bind(listing.available_from)
        .bind(listing.available_until)
        .bind(listing.status)
        .bind(listing.organic)
        .bind(&listing.address)
        .bind(listing.latitude)
        .bind(listing.longitude)
        .bind(listing.created_at)
        .fetch_one(ex)
        .await?;
    Ok(id)
}

pub async fn fetch(
    ex: &mut PgConnection,
    id: ListingId,
) -> Result<Option<ProduceListing>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM produce_listings WHERE id = $1"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// Like [`fetch`] but locks the row for the remainder of the surrounding
/// transaction.
pub async fn fetch_for_update(
    ex: &mut PgConnection,
    id: ListingId,
) -> Result<Option<ProduceListing>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM produce_listings WHERE id = $1 FOR UPDATE"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

pub async fn update_status(
    ex: &mut PgConnection,
    id: ListingId,
    status: ListingStatus,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"UPDATE produce_listings SET status = $2 WHERE id = $1"#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(status)
        .execute(ex)
        .await
        .map(|_| ())
}

/// Latitude/longitude ranges for the approximate distance pre-filter.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoordinateRange {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

#[derive(Clone, Debug)]
pub struct AvailableFilter<'a> {
    pub today: NaiveDate,
    /// Only listings of these produce types match; an empty slice matches
    /// nothing.
    pub produce_types: &'a [String],
    pub within: Option<CoordinateRange>,
    pub limit: i64,
}

/// Listings open for requests today, in the generic storefront order:
/// organic first, then cheapest, then longest remaining availability.
pub async fn available_now(
    ex: &mut PgConnection,
    filter: &AvailableFilter<'_>,
) -> Result<Vec<ProduceListing>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM produce_listings
WHERE status = 'available'
AND available_from <= $1 AND available_until >= $1
AND produce_type = ANY($2)
AND ($3::double precision IS NULL OR (
    latitude BETWEEN $3 AND $4 AND longitude BETWEEN $5 AND $6
))
ORDER BY organic DESC, price_per_unit ASC, available_until DESC
LIMIT $7
    "#;
    sqlx::query_as(QUERY)
        .bind(filter.today)
        .bind(filter.produce_types)
        .bind(filter.within.map(|range| range.min_lat))
        .bind(filter.within.map(|range| range.max_lat))
        .bind(filter.within.map(|range| range.min_lng))
        .bind(filter.within.map(|range| range.max_lng))
        .bind(filter.limit)
        .fetch_all(ex)
        .await
}

/// Available listings of the given types whose window closes on or before
/// `cutoff`, soonest-expiring first.
pub async fn expiring_until(
    ex: &mut PgConnection,
    today: NaiveDate,
    cutoff: NaiveDate,
    produce_types: &[String],
    limit: i64,
) -> Result<Vec<ProduceListing>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM produce_listings
WHERE status = 'available'
AND available_from <= $1 AND available_until >= $1
AND produce_type = ANY($2)
AND available_until <= $3
ORDER BY available_until ASC
LIMIT $4
    "#;
    sqlx::query_as(QUERY)
        .bind(today)
        .bind(produce_types)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(ex)
        .await
}

/// Available listings, of any produce type, whose window closes within the
/// given date range (bounds inclusive).
pub async fn expiring_within(
    ex: &mut PgConnection,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<ProduceListing>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM produce_listings
WHERE status = 'available'
AND available_until BETWEEN $1 AND $2
ORDER BY available_until ASC
    "#;
    sqlx::query_as(QUERY)
        .bind(from)
        .bind(until)
        .fetch_all(ex)
        .await
}

/// Average `price_per_unit` per produce type over all listings of that type,
/// regardless of status.
pub async fn average_prices(
    ex: &mut PgConnection,
    produce_types: &[String],
) -> Result<Vec<(String, BigDecimal)>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT produce_type, AVG(price_per_unit)
FROM produce_listings
WHERE produce_type = ANY($1)
GROUP BY produce_type
    "#;
    sqlx::query_as(QUERY).bind(produce_types).fetch_all(ex).await
}

/// Marks every available listing whose window has passed as expired and
/// returns how many rows were affected.
#[tracing::instrument(skip_all)]
pub async fn expire_outdated(ex: &mut PgConnection, today: NaiveDate) -> Result<u64, sqlx::Error> {
    const QUERY: &str = r#"
UPDATE produce_listings
SET status = 'expired'
WHERE status = 'available' AND available_until < $1
    "#;
    sqlx::query(QUERY)
        .bind(today)
        .execute(ex)
        .await
        .map(|result| result.rows_affected())
}
