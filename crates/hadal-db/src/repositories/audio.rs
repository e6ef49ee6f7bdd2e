use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::models::{CachedAudio, SpeedCount};

/// Fetch a clip and bump its access counter in one statement.
pub async fn touch<'e, E>(executor: E, cache_key: &str) -> Result<Option<CachedAudio>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE audio_cache
            SET access_count = access_count + 1
            WHERE cache_key = $1
            RETURNING cache_key, text, speed, audio_content, duration_seconds,
                      access_count, pregenerated, created_at
        "#,
    )
    .bind(cache_key)
    .fetch_optional(executor)
    .await
}

pub async fn exists<'e, E>(executor: E, cache_key: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(SELECT 1 FROM audio_cache WHERE cache_key = $1)
        "#,
    )
    .bind(cache_key)
    .fetch_one(executor)
    .await
}

/// Insert a clip. Re-synthesis of a cached key refreshes the audio but keeps
/// the access counter and creation time.
pub async fn upsert<'e, E>(executor: E, audio: &CachedAudio) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO audio_cache
                (cache_key, text, speed, audio_content, duration_seconds, access_count, pregenerated, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (cache_key)
            DO UPDATE SET
                audio_content = EXCLUDED.audio_content,
                duration_seconds = EXCLUDED.duration_seconds
        "#,
    )
    .bind(&audio.cache_key)
    .bind(&audio.text)
    .bind(audio.speed)
    .bind(&audio.audio_content)
    .bind(audio.duration_seconds)
    .bind(audio.access_count)
    .bind(audio.pregenerated)
    .bind(audio.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// `(items, total accesses, average accesses)`
pub async fn totals<'e, E>(executor: E) -> Result<(i64, i64, f64), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(access_count), 0)::BIGINT,
                COALESCE(AVG(access_count), 0)::FLOAT8
            FROM audio_cache
        "#,
    )
    .fetch_one(executor)
    .await
}

pub async fn speed_distribution<'e, E>(executor: E) -> Result<Vec<SpeedCount>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT speed, COUNT(*) AS count
            FROM audio_cache
            GROUP BY speed
            ORDER BY speed
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM audio_cache
        "#,
    )
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_created_before<'e, E>(
    executor: E,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM audio_cache WHERE created_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
