use {
    crate::shipments::ShipmentId,
    bigdecimal::BigDecimal,
    sqlx::{
        PgConnection,
        types::chrono::{DateTime, Utc},
    },
};

pub type BidId = i64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "BidStatus")]
#[sqlx(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// One row in the `shipment_bids` table.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ShipmentBid {
    pub id: BidId,
    pub shipment_id: ShipmentId,
    pub carrier_id: i64,
    pub bid_amount: BigDecimal,
    pub message: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

/// Stores the bid and returns the id. The id of the bid parameter is not
/// used.
pub async fn insert(ex: &mut PgConnection, bid: &ShipmentBid) -> Result<BidId, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO shipment_bids (
    shipment_id,
    carrier_id,
    bid_amount,
    message,
    pickup_time,
    estimated_delivery,
    status,
    created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING id
    "#;
    let (id,) = sqlx::query_as(QUERY)
        .bind(bid.shipment_id)
        .bind(bid.carrier_id)
        .bind(&bid.bid_amount)
        .bind(&bid.message)
        .bind(bid.pickup_time)
        .bind(bid.estimated_delivery)
        .bind(bid.status)
        .bind(bid.created_at)
        .fetch_one(ex)
        .await?;
    Ok(id)
}

pub async fn fetch(ex: &mut PgConnection, id: BidId) -> Result<Option<ShipmentBid>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM shipment_bids WHERE id = $1"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// Like [`fetch`] but locks the row for the remainder of the surrounding
/// transaction.
pub async fn fetch_for_update(
    ex: &mut PgConnection,
    id: BidId,
) -> Result<Option<ShipmentBid>, sqlx::Error> {
    const QUERY: &str = r#"SELECT * FROM shipment_bids WHERE id = $1 FOR UPDATE"#;
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// All bids for a shipment, newest first.
pub async fn for_shipment(
    ex: &mut PgConnection,
    shipment_id: ShipmentId,
) -> Result<Vec<ShipmentBid>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM shipment_bids
WHERE shipment_id = $1
ORDER BY created_at DESC
    "#;
    sqlx::query_as(QUERY).bind(shipment_id).fetch_all(ex).await
}

pub async fn update_status(
    ex: &mut PgConnection,
    id: BidId,
    status: BidStatus,
) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"UPDATE shipment_bids SET status = $2 WHERE id = $1"#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(status)
        .execute(ex)
        .await
        .map(|_| ())
}

/// Rejects every pending bid of the shipment except the given one. Part of
/// the bid acceptance transaction; returns how many competitors were
/// rejected.
pub async fn reject_pending_siblings(
    ex: &mut PgConnection,
    shipment_id: ShipmentId,
    winner: BidId,
) -> Result<u64, sqlx::Error> {
    const QUERY: &str = r#"
UPDATE shipment_bids
SET status = 'rejected'
WHERE shipment_id = $1 AND id != $2 AND status = 'pending'
    "#;
    sqlx::query(QUERY)
        .bind(shipment_id)
        .bind(winner)
        .execute(ex)
        .await
        .map(|result| result.rows_affected())
}

/// Rejects every pending bid of the shipment, used when the shipment itself
/// is cancelled.
pub async fn reject_all_pending(
    ex: &mut PgConnection,
    shipment_id: ShipmentId,
) -> Result<u64, sqlx::Error> {
    const QUERY: &str = r#"
UPDATE shipment_bids
SET status = 'rejected'
WHERE shipment_id = $1 AND status = 'pending'
    "#;
    sqlx::query(QUERY)
        .bind(shipment_id)
        .execute(ex)
        .await
        .map(|result| result.rows_affected())
}

/// Aggregate view over a shipment's *pending* bids; accepted and rejected
/// bids are excluded.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct BidAggregates {
    pub pending_count: i64,
    pub lowest: Option<BigDecimal>,
    pub highest: Option<BigDecimal>,
    pub average: Option<BigDecimal>,
}

pub async fn aggregates(
    ex: &mut PgConnection,
    shipment_id: ShipmentId,
) -> Result<BidAggregates, sqlx::Error> {
    const QUERY: &str = r#"
SELECT
    COUNT(*) AS pending_count,
    MIN(bid_amount) AS lowest,
    MAX(bid_amount) AS highest,
    ROUND(AVG(bid_amount), 2) AS average
FROM shipment_bids
WHERE shipment_id = $1 AND status = 'pending'
    "#;
    sqlx::query_as(QUERY).bind(shipment_id).fetch_one(ex).await
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::shipments,
        sqlx::Connection,
    };

    fn bid(shipment_id: ShipmentId, carrier_id: i64, amount: i64) -> ShipmentBid {
        let pickup = Utc::now();
        ShipmentBid {
            id: 0,
            shipment_id,
            carrier_id,
            bid_amount: BigDecimal::from(amount),
            message: None,
            pickup_time: pickup,
            estimated_delivery: pickup + chrono::Duration::hours(8),
            status: BidStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_roundtrip() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let shipment = shipments::tests::shipment(&mut db).await;
        let shipment_id = shipments::insert(&mut db, &shipment).await.unwrap();

        let bid = bid(shipment_id, 7, 100);
        let id = insert(&mut db, &bid).await.unwrap();
        let fetched = fetch(&mut db, id).await.unwrap().unwrap();
        assert_eq!(
            fetched,
            ShipmentBid {
                id,
                pickup_time: fetched.pickup_time,
                estimated_delivery: fetched.estimated_delivery,
                created_at: fetched.created_at,
                ..bid
            }
        );
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_reject_pending_siblings() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let shipment = shipments::tests::shipment(&mut db).await;
        let shipment_id = shipments::insert(&mut db, &shipment).await.unwrap();

        let winner = insert(&mut db, &bid(shipment_id, 1, 80)).await.unwrap();
        let loser = insert(&mut db, &bid(shipment_id, 2, 100)).await.unwrap();
        let withdrawn = insert(&mut db, &bid(shipment_id, 3, 90)).await.unwrap();
        update_status(&mut db, withdrawn, BidStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(
            reject_pending_siblings(&mut db, shipment_id, winner)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            fetch(&mut db, winner).await.unwrap().unwrap().status,
            BidStatus::Pending
        );
        assert_eq!(
            fetch(&mut db, loser).await.unwrap().unwrap().status,
            BidStatus::Rejected
        );
        // Withdrawn bids keep their status.
        assert_eq!(
            fetch(&mut db, withdrawn).await.unwrap().unwrap().status,
            BidStatus::Cancelled
        );
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_aggregates_cover_pending_bids_only() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let shipment = shipments::tests::shipment(&mut db).await;
        let shipment_id = shipments::insert(&mut db, &shipment).await.unwrap();

        insert(&mut db, &bid(shipment_id, 1, 80)).await.unwrap();
        insert(&mut db, &bid(shipment_id, 2, 101)).await.unwrap();
        let rejected = insert(&mut db, &bid(shipment_id, 3, 10)).await.unwrap();
        update_status(&mut db, rejected, BidStatus::Rejected)
            .await
            .unwrap();

        let aggregates = aggregates(&mut db, shipment_id).await.unwrap();
        assert_eq!(aggregates, BidAggregates {
            pending_count: 2,
            lowest: Some(BigDecimal::from(80)),
            highest: Some(BigDecimal::from(101)),
            average: Some(BigDecimal::try_from(90.5).unwrap()),
        });

        let empty = aggregates_for_missing_shipment(&mut db).await;
        assert_eq!(empty, BidAggregates {
            pending_count: 0,
            lowest: None,
            highest: None,
            average: None,
        });
    }

    async fn aggregates_for_missing_shipment(db: &mut PgConnection) -> BidAggregates {
        aggregates(db, 424242).await.unwrap()
    }
}
