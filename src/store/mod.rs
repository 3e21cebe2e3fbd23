//! Record store for comments.
//!
//! The store owns the durable table and the closure queries over `parent_id`.
//! Ordering of siblings and tree assembly live outside, in [`crate::tree`].

use async_trait::async_trait;

use crate::{
    error::{CommentError, CommentResult},
    models::comment::{Comment, NewComment, SortKey, SortOrder},
};

pub mod postgres;
pub mod sqlite;

pub use postgres::PgCommentStore;
pub use sqlite::SqliteCommentStore;

/// Data access for the comments table.
///
/// Every method is a single read or a single atomic write; callers compose them.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a comment and return it as stored.
    /// Fails with `InvalidParent` when `parent_id` does not reference an existing row.
    async fn insert(&self, comment: &NewComment) -> CommentResult<Comment>;

    async fn get_by_id(&self, id: i64) -> CommentResult<Option<Comment>>;

    /// `root_id` and all of its transitive descendants.
    async fn fetch_subtree(&self, root_id: i64) -> CommentResult<Vec<Comment>> {
        self.fetch_subtrees(&[root_id]).await
    }

    /// Union of the subtrees rooted at each of `root_ids`, read by a single statement.
    async fn fetch_subtrees(&self, root_ids: &[i64]) -> CommentResult<Vec<Comment>>;

    /// Every record in the table, ordered by id.
    async fn fetch_all(&self) -> CommentResult<Vec<Comment>>;

    /// One page of root comments ordered by `key`/`order` (ties by id ascending), together
    /// with every descendant of those roots, ordered by id.
    ///
    /// Page and closure are read by a single statement, so a concurrent subtree delete is
    /// either fully visible or not at all.
    async fn fetch_forest_page(
        &self,
        key: SortKey,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> CommentResult<Vec<Comment>>;

    /// Remove `root_id` and its whole subtree atomically. Returns the number of rows removed.
    async fn delete_subtree(&self, root_id: i64) -> CommentResult<u64>;

    /// Comments whose content contains `pattern` literally, ignoring case (Unicode-aware).
    async fn search_by_content(&self, pattern: &str) -> CommentResult<Vec<Comment>>;

    /// Topmost ancestor of `id` (itself if it is a root). `None` if `id` is absent.
    async fn find_root(&self, id: i64) -> CommentResult<Option<i64>>;

    /// Matching records if `search` is given, else the subtree size of `root_id`,
    /// else the number of root comments.
    async fn count(&self, root_id: Option<i64>, search: Option<&str>) -> CommentResult<i64>;
}

/// Turns user text into a `LIKE` pattern that matches it literally as a substring.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Turns user text into a case-insensitive regular expression that matches it literally.
///
/// `(?i)` folds case with Unicode rules, so "привет" finds "Привет".
pub(crate) fn regex_pattern(text: &str) -> String {
    format!("(?i){}", regex::escape(text))
}

/// Maps insert failures caused by a vanished parent onto `InvalidParent`.
pub(crate) fn insert_error(parent_id: Option<i64>, err: sqlx::Error) -> CommentError {
    if let (sqlx::Error::Database(db), Some(pid)) = (&err, parent_id) {
        if db.is_foreign_key_violation() {
            return CommentError::InvalidParent(pid);
        }
    }

    CommentError::Store {
        context: "create comment",
        source: err,
    }
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, regex_pattern};

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hello"), "%hello%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn regex_pattern_is_literal_and_case_insensitive() {
        assert_eq!(regex_pattern("1+1=2?"), "(?i)1\\+1=2\\?");

        let re = regex::Regex::new(&regex_pattern("привет")).unwrap();
        assert!(re.is_match("Привет мир"));
        let re = regex::Regex::new(&regex_pattern("élan")).unwrap();
        assert!(re.is_match("Straße Élan"));
    }
}
