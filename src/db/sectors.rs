use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Sector {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadershipEntry {
    pub full_name: String,
    pub position: String,
}

#[tracing::instrument(name = "db.sectors.list", skip(pool), fields(sector_count))]
pub async fn list_sectors(pool: &PgPool) -> Result<Vec<Sector>, sqlx::Error> {
    let sectors = sqlx::query_as::<_, Sector>(
        "SELECT sector_id AS id, sector_name AS name FROM sectors ORDER BY sector_id",
    )
    .fetch_all(pool)
    .await?;

    tracing::Span::current().record("sector_count", sectors.len());

    Ok(sectors)
}

#[tracing::instrument(name = "db.sectors.get", skip(pool))]
pub async fn get_sector(pool: &PgPool, id: i32) -> Result<Option<Sector>, sqlx::Error> {
    sqlx::query_as::<_, Sector>(
        "SELECT sector_id AS id, sector_name AS name FROM sectors WHERE sector_id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[tracing::instrument(name = "db.sector_leaders.top", skip(pool))]
pub async fn top_leadership(
    pool: &PgPool,
    sector_id: i32,
    limit: i64,
) -> Result<Vec<LeadershipEntry>, sqlx::Error> {
    sqlx::query_as::<_, LeadershipEntry>(
        "SELECT full_name, position FROM sector_leaders \
         WHERE sector_id = $1 \
         ORDER BY position DESC \
         LIMIT $2",
    )
    .bind(sector_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
