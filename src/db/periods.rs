use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportingPeriod {
    pub id: i32,
    pub quarter: i32,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportingPeriod {
    /// Short label used on slide badges and file names, e.g. `Q2 2024`.
    pub fn label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}

#[tracing::instrument(name = "db.reporting_periods.get", skip(pool))]
pub async fn get_period(pool: &PgPool, id: i32) -> Result<Option<ReportingPeriod>, sqlx::Error> {
    sqlx::query_as::<_, ReportingPeriod>(
        "SELECT period_id AS id, quarter, year, start_date, end_date \
         FROM reporting_periods WHERE period_id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
