use {
    anyhow::Result,
    database::PgTransaction,
    sqlx::{PgPool, pool::PoolConnection, postgres::Postgres},
};

pub mod dto;

/// Handle to the marketplace's Postgres store.
///
/// The pool uses an `Arc` internally, so this is cheap to clone. The engines
/// open one transaction per state transition through [`Persistence::begin`];
/// read-only queries borrow a plain connection.
#[derive(Clone)]
pub struct Persistence {
    pool: PgPool,
}

impl Persistence {
    pub fn new(uri: &str) -> Result<Self> {
        Ok(Self {
            pool: PgPool::connect_lazy(uri)?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<PgTransaction<'static>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connection(&self) -> Result<PoolConnection<Postgres>, sqlx::Error> {
        self.pool.acquire().await
    }
}
