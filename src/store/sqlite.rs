// src/store/sqlite.rs

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    QueryBuilder, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use super::{CommentStore, insert_error, regex_pattern};
use crate::{
    error::{CommentError, CommentResult},
    models::comment::{Comment, NewComment, SortKey, SortOrder},
};

const COLUMNS: &str = "id, parent_id, content, created_at, updated_at";

/// `CommentStore` on an embedded SQLite database.
///
/// Used for single-node deployments (`DATABASE_URL=sqlite:...`) and by the test suite.
#[derive(Clone)]
pub struct SqliteCommentStore {
    pool: SqlitePool,
}

impl SqliteCommentStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// `sqlite::memory:` databases live in a single connection that is never recycled,
    /// otherwise every pooled connection would see its own empty database.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .with_regexp();

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;

        Ok(Self { pool })
    }
}

/// Appends `(?, ?, ...)` with every id bound.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl CommentStore for SqliteCommentStore {
    async fn insert(&self, comment: &NewComment) -> CommentResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (parent_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, parent_id, content, created_at, updated_at
            "#,
        )
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(comment.parent_id, e))
    }

    async fn get_by_id(&self, id: i64) -> CommentResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(&format!("SELECT {COLUMNS} FROM comments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CommentError::store("get comment"))
    }

    async fn fetch_subtrees(&self, root_ids: &[i64]) -> CommentResult<Vec<Comment>> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "WITH RECURSIVE comment_tree AS (SELECT {COLUMNS} FROM comments WHERE id IN "
        ));
        push_id_list(&mut builder, root_ids);
        builder.push(format!(
            " UNION \
             SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at \
             FROM comments c INNER JOIN comment_tree ct ON c.parent_id = ct.id) \
             SELECT {COLUMNS} FROM comment_tree ORDER BY id"
        ));

        builder
            .build_query_as::<Comment>()
            .fetch_all(&self.pool)
            .await
            .map_err(CommentError::store("get comment tree"))
    }

    async fn fetch_all(&self) -> CommentResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(&format!("SELECT {COLUMNS} FROM comments ORDER BY id"))
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
        let query = format!(
            "WITH RECURSIVE root_page AS (\
                 SELECT id FROM comments WHERE parent_id IS NULL \
                 ORDER BY {} {}, id ASC LIMIT ? OFFSET ?), \
             comment_tree AS (\
                 SELECT {COLUMNS} FROM comments WHERE id IN (SELECT id FROM root_page) \
                 UNION ALL \
                 SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at \
                 FROM comments c INNER JOIN comment_tree ct ON c.parent_id = ct.id) \
             SELECT {COLUMNS} FROM comment_tree ORDER BY id",
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
                    SELECT id FROM comments WHERE id = ?

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
        // LIKE folds ASCII case only, REGEXP goes through the `regex` crate.
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COLUMNS} FROM comments WHERE content REGEXP ? ORDER BY id"
        ))
        .bind(regex_pattern(pattern))
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
                WHERE id = ?

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
                "SELECT COUNT(DISTINCT id) FROM comments WHERE content REGEXP ?",
            )
            .bind(regex_pattern(text)),
            (None, Some(id)) => sqlx::query_scalar::<_, i64>(
                r#"
                WITH RECURSIVE comment_tree AS (
                    SELECT id FROM comments WHERE id = ?

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
