use {
    crate::{produce_listings::ListingId, produce_requests::RequestId},
    bigdecimal::BigDecimal,
    sqlx::{
        PgConnection,
        types::chrono::{DateTime, Utc},
    },
};

pub type ShipmentId = i64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "ShipmentStatus")]
#[sqlx(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    BiddingOpen,
    BidAccepted,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

/// One row in the `shipments` table.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Shipment {
    pub id: ShipmentId,
    pub listing_id: ListingId,
    pub request_id: RequestId,
    pub carrier_id: Option<i64>,
    pub origin_address: String,
    pub destination_address: String,
    pub distance_km: Option<f64>,
    pub agreed_price: Option<BigDecimal>,
    pub status: ShipmentStatus,
    pub tracking_number: String,
    pub created_at: DateTime<Utc>,
}

/// Stores the shipment and returns the id. The id of the shipment parameter
/// is not used. Fails with a unique violation when the tracking number is
/// already taken.
pub async fn insert(
    ex: &mut PgConnection,
    shipment: &Shipment,
) -> Result<ShipmentId, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO shipments (
    listing_id,
    request_id,
    carrier_id,
    origin_address,
    destination_address,
    distance_km,
    agreed_price,
    status,
    tracking_number,
    created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
RETURNING id
    "#;
    let (id,) = sqlx::query_as(QUERY)
        .bind(shipment.listing_id)
        .bind(shipment.request_id)
        .bind(shipment.carrier_id)
        .bind(&shipment.origin_address)
        .bind(&shipment.destination_address)
        .bind(shipment.distance_km)
        .bind(&shipment.agreed_price)
        .bind(shipment.status)
        .bind(&shipment.tracking_number)
        .bind(shipment.created_at)
        .fetch_one(ex)
        .await?;
    Ok(id)
}

pub async fn fetch(
    ex: &mut PgConnection,
    id: ShipmentId,
) -> Result<Option<Shipment>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM shipments WHERE id = $1"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// Like [`fetch`] but locks the row for the remainder of the surrounding
/// transaction. All shipment state transitions go through this lock.
pub async fn fetch_for_update(
    ex: &mut PgConnection,
    id: ShipmentId,
) -> Result<Option<Shipment>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM shipments WHERE id = $1 FOR UPDATE"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

pub async fn fetch_by_tracking_number(
    ex: &mut PgConnection,
    tracking_number: &str,
) -> Result<Option<Shipment>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM shipments WHERE tracking_number = $1"#;
    sqlx::query_as(QUERY)
        .bind(tracking_number)
        .fetch_optional(ex)
        .await
}

pub async fn update_status(
    ex: &mut PgConnection,
    id: ShipmentId,
    status: ShipmentStatus,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"UPDATE shipments SET status = $2 WHERE id = $1"#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(status)
        .execute(ex)
        .await
        .map(|_| ())
}

/// Applies the winning side of a bid acceptance: assigns the carrier, takes
/// over the bid amount as the agreed price and moves the shipment to
/// `bid_accepted`. Part of the bid acceptance transaction.
pub async fn assign_winning_bid(
    ex: &mut PgConnection,
    id: ShipmentId,
    carrier_id: i64,
    agreed_price: &BigDecimal,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"
UPDATE shipments
SET carrier_id = $2, agreed_price = $3, status = 'bid_accepted'
WHERE id = $1
    "#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(carrier_id)
        .bind(agreed_price)
        .execute(ex)
        .await
        .map(|_| ())
}

/// Shipments still looking for a carrier, newest first.
pub async fn available_for_bidding(
    ex: &mut PgConnection,
    limit: i64,
) -> Result<Vec<Shipment>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM shipments
WHERE status IN ('pending', 'bidding_open') AND carrier_id IS NULL
ORDER BY created_at DESC
LIMIT $1
    "#;
    sqlx::query_as(QUERY).bind(limit).fetch_all(ex).await
}
