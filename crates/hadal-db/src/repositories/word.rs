use hadal_engine::Word;
use sqlx::{Executor, Postgres, types::Json};

/// Escape LIKE wildcards in `query` and wrap it for a substring match.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*) FROM words
        "#,
    )
    .fetch_one(executor)
    .await
}

pub async fn max_position<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COALESCE(MAX(position), 0) FROM words
        "#,
    )
    .fetch_one(executor)
    .await
}

/// Insert a word unless its id is taken. Returns whether a row was added.
pub async fn insert<'e, E>(executor: E, position: i64, word: &Word) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO words (id, position, tier, category, document, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&word.id)
    .bind(position)
    .bind(i64::from(word.tier))
    .bind(word.category.as_str())
    .bind(Json(word))
    .bind(word.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Word>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<Json<Word>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM words WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|Json(word)| word))
}

/// Filtered listing. `None` filters match everything; a `None` limit means no limit.
pub async fn list<'e, E>(
    executor: E,
    tier: Option<i64>,
    category: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<Word>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<Json<Word>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM words
            WHERE ($1::BIGINT IS NULL OR tier = $1)
                AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY position
            LIMIT $3
        "#,
    )
    .bind(tier)
    .bind(category)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|Json(word)| word).collect())
}

pub async fn list_by_ids<'e, E>(executor: E, ids: &[String]) -> Result<Vec<Word>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<Json<Word>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM words
            WHERE id = ANY($1)
            ORDER BY position
        "#,
    )
    .bind(ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|Json(word)| word).collect())
}

/// Case-insensitive substring search over Somali text, translation and
/// phonetic guide, plus exact tag matches.
pub async fn search<'e, E>(executor: E, query: &str, limit: i64) -> Result<Vec<Word>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<Json<Word>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT document FROM words
            WHERE document->>'somali' ILIKE $1
                OR document->>'english' ILIKE $1
                OR document->>'phonetic' ILIKE $1
                OR EXISTS (
                    SELECT 1 FROM jsonb_array_elements_text(document->'tags') AS tag
                    WHERE LOWER(tag) = $2
                )
            ORDER BY position
            LIMIT $3
        "#,
    )
    .bind(like_pattern(query))
    .bind(query.to_lowercase())
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|Json(word)| word).collect())
}

/// `(category, word count, distinct tiers)` sorted by category.
pub async fn category_counts<'e, E>(
    executor: E,
) -> Result<Vec<(String, i64, Vec<i64>)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT category, COUNT(*), ARRAY_AGG(DISTINCT tier ORDER BY tier)
            FROM words
            GROUP BY category
            ORDER BY category
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn tier_counts<'e, E>(executor: E) -> Result<Vec<(i64, i64)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT tier, COUNT(*) FROM words GROUP BY tier ORDER BY tier
        "#,
    )
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hab"), "%hab%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
