pub mod produce_listings;
pub mod produce_requests;
pub mod shipment_bids;
pub mod shipments;

use sqlx::{Executor, PgPool};

// Functions that run several statements take `&mut PgTransaction` so the
// whole group commits or rolls back together; functions that run a single
// statement take `&mut PgConnection` and can be used standalone or inside a
// caller's transaction (`PgTransaction` derefs to `PgConnection`). The
// executor parameter is called `ex` throughout. Committing is the caller's
// job.
//
// Tests against a live Postgres open a transaction at the start and never
// commit it; the rollback on drop keeps tables clean and lets tests run in
// parallel.

pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// The tables this crate owns, dependents first so truncation order does not
/// matter.
pub const TABLES: &[&str] = &[
    "shipment_bids",
    "shipments",
    "produce_requests",
    "produce_listings",
];

/// Delete all data in the database. Only used by tests.
#[allow(non_snake_case)]
pub async fn clear_DANGER_(ex: &mut PgTransaction<'_>) -> sqlx::Result<()> {
    for table in TABLES {
        ex.execute(format!("TRUNCATE {table} CASCADE;").as_str())
            .await?;
    }
    Ok(())
}

/// Like above but more ergonomic for tests that use a pool.
#[allow(non_snake_case)]
pub async fn clear_DANGER(pool: &PgPool) -> sqlx::Result<()> {
    let mut transaction = pool.begin().await?;
    clear_DANGER_(&mut transaction).await?;
    transaction.commit().await
}

/// Whether the error is a violation of a unique constraint, e.g. a tracking
/// number collision.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
