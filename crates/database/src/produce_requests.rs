use {
    crate::produce_listings::ListingId,
    bigdecimal::BigDecimal,
    sqlx::{
        PgConnection,
        types::chrono::{DateTime, Utc},
    },
};

pub type RequestId = i64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "RequestStatus")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Completed,
}

/// One row in the `produce_requests` table.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ProduceRequest {
    pub id: RequestId,
    pub market_id: i64,
    pub listing_id: ListingId,
    pub quantity: BigDecimal,
    pub price_offered: Option<BigDecimal>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Stores the request and returns the id. The id of the request parameter is
/// not used.
pub async fn insert(
    ex: &mut PgConnection,
    request: &ProduceRequest,
) -> Result<RequestId, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO produce_requests (
    market_id,
    listing_id,
    quantity,
    price_offered,
    message,
    status,
    created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
RETURNING id
    "#;
    let (id,) = sqlx::query_as(QUERY)
        .bind(request.market_id)
        .bind(request.listing_id)
        .bind(&request.quantity)
        .bind(&request.price_offered)
        .bind(&request.message)
        .bind(request.status)
        .bind(request.created_at)
        .fetch_one(ex)
        .await?;
    Ok(id)
}

pub async fn fetch(
    ex: &mut PgConnection,
    id: RequestId,
) -> Result<Option<ProduceRequest>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM produce_requests WHERE id = $1"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// Like [`fetch`] but locks the row for the remainder of the surrounding
/// transaction.
pub async fn fetch_for_update(
    ex: &mut PgConnection,
    id: RequestId,
) -> Result<Option<ProduceRequest>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM produce_requests WHERE id = $1 FOR UPDATE"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

pub async fn update_status(
    ex: &mut PgConnection,
    id: RequestId,
    status: RequestStatus,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"UPDATE produce_requests SET status = $2 WHERE id = $1"#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(status)
        .execute(ex)
        .await
        .map(|_| ())
}
