// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;

use super::{CommentStore, insert_error, like_pattern};
use crate::{
    error::{CommentError, CommentResult},
    models::comment::{Comment, NewComment, SortKey, SortOrder},
};

/// `CommentStore` backed by PostgreSQL recursive CTEs.
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, comment: &NewComment) -> CommentResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (parent_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, parent_id, content, created_at, updated_at
            "#,
        )
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(comment.parent_id, e))
    }

    async fn get_by_id(&self, id: i64) -> CommentResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, parent_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CommentError::store("get comment"))
    }

    async fn fetch_subtrees(&self, root_ids: &[i64]) -> CommentResult<Vec<Comment>> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Comment>(
            r#"
            WITH RECURSIVE comment_tree AS (
                SELECT id, parent_id, content, created_at, updated_at
                FROM comments
                WHERE id = ANY($1)

                UNION

                SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at
                FROM comments c
                INNER JOIN comment_tree ct ON c.parent_id = ct.id
            )
            SELECT id, parent_id, content, created_at, updated_at
            FROM comment_tree
            ORDER BY id
            "#,
        )
        .bind(root_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(CommentError::store("get comment tree"))
    }

    async fn fetch_all(&self) -> CommentResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, parent_id, content, created_at, updated_at FROM comments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CommentError::store("get all comments"))
    }

    async fn fetch_forest_page(
        &self,
        key: SortKey,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> CommentResult<Vec<Comment>> {
        // Column and direction come from closed enums, never from user text.
        let query = format!(
            r#"
            WITH RECURSIVE root_page AS (
                SELECT id
                FROM comments
                WHERE parent_id IS NULL
                ORDER BY {} {}, id ASC
                LIMIT $1 OFFSET $2
            ),
            comment_tree AS (
                SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at
                FROM comments c
                INNER JOIN root_page rp ON c.id = rp.id

                UNION ALL

                SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at
                FROM comments c
                INNER JOIN comment_tree ct ON c.parent_id = ct.id
            )
            SELECT id, parent_id, content, created_at, updated_at
            FROM comment_tree
            ORDER BY id
            "#,
            key.column(),
            order.keyword()
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(CommentError::store("get comment forest page"))
    }

    async fn delete_subtree(&self, root_id: i64) -> CommentResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM comments
            WHERE id IN (
                WITH RECURSIVE comment_tree AS (
                    SELECT id FROM comments WHERE id = $1

                    UNION ALL

                    SELECT c.id
                    FROM comments c
                    INNER JOIN comment_tree ct ON c.parent_id = ct.id
                )
                SELECT id FROM comment_tree
            )
            "#,
        )
        .bind(root_id)
        .execute(&self.pool)
        .await
        .map_err(CommentError::store("delete comment"))?;

        Ok(result.rows_affected())
    }

    async fn search_by_content(&self, pattern: &str) -> CommentResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, parent_id, content, created_at, updated_at
            FROM comments
            WHERE content ILIKE $1 ESCAPE '\'
            ORDER BY id
            "#,
        )
        .bind(like_pattern(pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(CommentError::store("search comments"))
    }

    async fn find_root(&self, id: i64) -> CommentResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            WITH RECURSIVE comment_path AS (
                SELECT id, parent_id
                FROM comments
                WHERE id = $1

                UNION ALL

                SELECT c.id, c.parent_id
                FROM comments c
                INNER JOIN comment_path cp ON c.id = cp.parent_id
            )
            SELECT id FROM comment_path WHERE parent_id IS NULL LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CommentError::store("find root comment"))
    }

    async fn count(&self, root_id: Option<i64>, search: Option<&str>) -> CommentResult<i64> {
        let query = match (search, root_id) {
            (Some(text), _) => sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(DISTINCT id)
                FROM comments
                WHERE content ILIKE $1 ESCAPE '\'
                "#,
            )
            .bind(like_pattern(text)),
            (None, Some(id)) => sqlx::query_scalar::<_, i64>(
                r#"
                WITH RECURSIVE comment_tree AS (
                    SELECT id FROM comments WHERE id = $1

                    UNION ALL

                    SELECT c.id
                    FROM comments c
                    INNER JOIN comment_tree ct ON c.parent_id = ct.id
                )
                SELECT COUNT(*) FROM comment_tree
                "#,
            )
            .bind(id),
            (None, None) => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM comments WHERE parent_id IS NULL",
            ),
        };

        query
            .fetch_one(&self.pool)
            .await
            .map_err(CommentError::store("count comments"))
    }
}
