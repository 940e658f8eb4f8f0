use serde::Serialize;
use sqlx::PgPool;

/// A program's finalized submission for one reporting period.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProgramRecord {
    pub id: i32,
    pub name: String,
    pub status: String,
    pub content_blob: Option<String>,
    pub agency_name: String,
}

#[tracing::instrument(
    name = "db.program_submissions.finalized",
    skip(pool),
    fields(program_count)
)]
pub async fn finalized_programs(
    pool: &PgPool,
    sector_id: i32,
    period_id: i32,
) -> Result<Vec<ProgramRecord>, sqlx::Error> {
    let programs = sqlx::query_as::<_, ProgramRecord>(
        "SELECT p.program_id AS id, p.program_name AS name, ps.status, \
                ps.content_json AS content_blob, a.agency_name \
         FROM programs p \
         JOIN program_submissions ps ON ps.program_id = p.program_id \
         JOIN agencies a ON a.agency_id = p.owner_agency_id \
         WHERE p.sector_id = $1 \
           AND ps.period_id = $2 \
           AND ps.is_draft = FALSE \
         ORDER BY p.program_name",
    )
    .bind(sector_id)
    .bind(period_id)
    .fetch_all(pool)
    .await?;

    tracing::Span::current().record("program_count", programs.len());

    Ok(programs)
}
