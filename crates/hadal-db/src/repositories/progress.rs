use hadal_engine::UserProgress;
use sqlx::{Executor, Postgres, types::Json};

pub async fn find<'e, E>(executor: E, user_id: &str) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<Json<UserProgress>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM user_progress WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|Json(progress)| progress))
}

/// Insert a fresh record; a concurrent insert for the same user wins silently.
pub async fn insert_if_absent<'e, E>(executor: E, progress: &UserProgress) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_progress (user_id, document, last_activity, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(&progress.user_id)
    .bind(Json(progress))
    .bind(progress.last_activity)
    .bind(progress.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Returns whether a record was replaced.
pub async fn update<'e, E>(executor: E, progress: &UserProgress) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE user_progress
            SET document = $2, last_activity = $3, updated_at = $4
            WHERE user_id = $1
        "#,
    )
    .bind(&progress.user_id)
    .bind(Json(progress))
    .bind(progress.last_activity)
    .bind(progress.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
