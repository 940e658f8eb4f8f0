use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportMetadata {
    pub report_id: i64,
    pub period_id: i32,
    pub report_name: String,
    pub description: Option<String>,
    pub pptx_path: String,
    pub pdf_path: Option<String>,
    pub generated_by: i32,
    pub generated_at: DateTime<Utc>,
    pub is_public: bool,
}

pub struct InsertReport<'a> {
    pub period_id: i32,
    pub report_name: &'a str,
    pub description: &'a str,
    pub pptx_path: &'a str,
    pub generated_by: i32,
    pub generated_at: DateTime<Utc>,
}

const CREATE_REPORTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS reports ( \
     report_id BIGSERIAL PRIMARY KEY, \
     period_id INTEGER NOT NULL, \
     report_name TEXT NOT NULL, \
     description TEXT, \
     pptx_path TEXT NOT NULL, \
     pdf_path TEXT, \
     generated_by INTEGER NOT NULL, \
     generated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
     is_public BOOLEAN NOT NULL DEFAULT FALSE)";

/// Advisory lock key serializing the `reports` bootstrap across sessions.
const REPORTS_DDL_LOCK: i64 = 0x7265_706f_7274_73;

/// SQLSTATEs a concurrent `CREATE TABLE IF NOT EXISTS` can raise when another
/// session wins the catalog race: unique_violation and duplicate_table.
pub fn is_concurrent_create(code: Option<&str>) -> bool {
    matches!(code, Some("23505") | Some("42P07"))
}

#[tracing::instrument(name = "db.reports.ensure_table", skip_all)]
pub async fn ensure_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(REPORTS_DDL_LOCK)
        .execute(&mut *tx)
        .await?;

    match sqlx::query(CREATE_REPORTS_TABLE).execute(&mut *tx).await {
        Ok(_) => tx.commit().await,
        Err(e) => {
            let code = e.as_database_error().and_then(|db| db.code());
            if is_concurrent_create(code.as_deref()) {
                tracing::debug!(error = %e, "reports table created by a concurrent session");
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

#[tracing::instrument(name = "db.reports.insert", skip_all, fields(period_id = params.period_id))]
pub async fn insert_report(
    pool: &PgPool,
    params: &InsertReport<'_>,
) -> Result<ReportMetadata, sqlx::Error> {
    sqlx::query_as::<_, ReportMetadata>(
        "INSERT INTO reports \
         (period_id, report_name, description, pptx_path, pdf_path, \
          generated_by, generated_at, is_public) \
         VALUES ($1, $2, $3, $4, NULL, $5, $6, FALSE) \
         RETURNING report_id, period_id, report_name, description, pptx_path, \
                   pdf_path, generated_by, generated_at, is_public",
    )
    .bind(params.period_id)
    .bind(params.report_name)
    .bind(params.description)
    .bind(params.pptx_path)
    .bind(params.generated_by)
    .bind(params.generated_at)
    .fetch_one(pool)
    .await
}

#[tracing::instrument(name = "db.reports.get", skip(pool))]
pub async fn get_report(pool: &PgPool, id: i64) -> Result<Option<ReportMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ReportMetadata>(
        "SELECT report_id, period_id, report_name, description, pptx_path, \
                pdf_path, generated_by, generated_at, is_public \
         FROM reports WHERE report_id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[tracing::instrument(name = "db.reports.list", skip(pool))]
pub async fn list_reports(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReportMetadata>, sqlx::Error> {
    sqlx::query_as::<_, ReportMetadata>(
        "SELECT report_id, period_id, report_name, description, pptx_path, \
                pdf_path, generated_by, generated_at, is_public \
         FROM reports ORDER BY generated_at DESC, report_id DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
