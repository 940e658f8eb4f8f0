pub mod periods;
pub mod pool;
pub mod programs;
pub mod reports;
pub mod sectors;

#[cfg(test)]
pub mod memory;

use sqlx::PgPool;

pub use periods::ReportingPeriod;
pub use pool::create_pool;
pub use programs::ProgramRecord;
pub use reports::{InsertReport, ReportMetadata};
pub use sectors::{LeadershipEntry, Sector};

/// Read access to the upstream reporting tables plus the report metadata
/// table the engine owns.
#[async_trait::async_trait]
pub trait ReportingStore: Send + Sync {
    async fn find_period(&self, id: i32) -> Result<Option<ReportingPeriod>, sqlx::Error>;

    async fn list_sectors(&self) -> Result<Vec<Sector>, sqlx::Error>;

    async fn find_sector(&self, id: i32) -> Result<Option<Sector>, sqlx::Error>;

    async fn sector_leadership(
        &self,
        sector_id: i32,
        limit: i64,
    ) -> Result<Vec<LeadershipEntry>, sqlx::Error>;

    async fn finalized_programs(
        &self,
        sector_id: i32,
        period_id: i32,
    ) -> Result<Vec<ProgramRecord>, sqlx::Error>;

    /// Idempotent; must never drop or alter an existing table.
    async fn ensure_reports_table(&self) -> Result<(), sqlx::Error>;

    async fn insert_report(&self, params: &InsertReport<'_>)
    -> Result<ReportMetadata, sqlx::Error>;

    async fn get_report(&self, id: i64) -> Result<Option<ReportMetadata>, sqlx::Error>;

    async fn list_reports(&self, limit: i64, offset: i64)
    -> Result<Vec<ReportMetadata>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReportingStore for PgStore {
    async fn find_period(&self, id: i32) -> Result<Option<ReportingPeriod>, sqlx::Error> {
        periods::get_period(&self.pool, id).await
    }

    async fn list_sectors(&self) -> Result<Vec<Sector>, sqlx::Error> {
        sectors::list_sectors(&self.pool).await
    }

    async fn find_sector(&self, id: i32) -> Result<Option<Sector>, sqlx::Error> {
        sectors::get_sector(&self.pool, id).await
    }

    async fn sector_leadership(
        &self,
        sector_id: i32,
        limit: i64,
    ) -> Result<Vec<LeadershipEntry>, sqlx::Error> {
        sectors::top_leadership(&self.pool, sector_id, limit).await
    }

    async fn finalized_programs(
        &self,
        sector_id: i32,
        period_id: i32,
    ) -> Result<Vec<ProgramRecord>, sqlx::Error> {
        programs::finalized_programs(&self.pool, sector_id, period_id).await
    }

    async fn ensure_reports_table(&self) -> Result<(), sqlx::Error> {
        reports::ensure_table(&self.pool).await
    }

    async fn insert_report(
        &self,
        params: &InsertReport<'_>,
    ) -> Result<ReportMetadata, sqlx::Error> {
        reports::insert_report(&self.pool, params).await
    }

    async fn get_report(&self, id: i64) -> Result<Option<ReportMetadata>, sqlx::Error> {
        reports::get_report(&self.pool, id).await
    }

    async fn list_reports(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportMetadata>, sqlx::Error> {
        reports::list_reports(&self.pool, limit, offset).await
    }
}
