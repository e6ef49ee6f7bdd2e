use hadal_engine::QuizSession;
use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

pub async fn insert<'e, E>(executor: E, session: &QuizSession) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO quiz_sessions (id, user_id, document, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(session.id)
    .bind(&session.user_id)
    .bind(Json(session))
    .bind(session.started_at)
    .bind(session.completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find<'e, E>(executor: E, id: Uuid) -> Result<Option<QuizSession>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<Json<QuizSession>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM quiz_sessions WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|Json(session)| session))
}

/// Returns whether a session was replaced.
pub async fn update<'e, E>(executor: E, session: &QuizSession) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE quiz_sessions
            SET document = $2, completed_at = $3
            WHERE id = $1
        "#,
    )
    .bind(session.id)
    .bind(Json(session))
    .bind(session.completed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_completed_for_user<'e, E>(
    executor: E,
    user_id: &str,
    limit: i64,
) -> Result<Vec<QuizSession>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<Json<QuizSession>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM quiz_sessions
            WHERE user_id = $1 AND completed_at IS NOT NULL
            ORDER BY completed_at DESC
            LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|Json(session)| session).collect())
}
