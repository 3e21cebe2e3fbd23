use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Represents the 'comments' table in the database.
///
/// `parent_id` is `None` for roots. Timestamps are stamped once at creation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment together with all of its (transitive) replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentTree {
    pub comment: Comment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentTree>,
}

impl CommentTree {
    /// Number of comments in this tree, root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CommentTree::size).sum::<usize>()
    }
}

/// Values handed to the store when inserting a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Comment must be between 1 and 10000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,
}

/// Timestamp column used to order root comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    /// Lenient parse: anything unrecognised falls back to the default.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("updated_at") => SortKey::UpdatedAt,
            _ => SortKey::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
        }
    }

    pub fn of(self, comment: &Comment) -> DateTime<Utc> {
        match self {
            SortKey::CreatedAt => comment.created_at,
            SortKey::UpdatedAt => comment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Query parameters for listing comments.
#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    /// Restrict the result to the subtree rooted at this comment. Empty means no restriction.
    pub parent: Option<String>,

    /// Case-insensitive substring to search for.
    pub search: Option<String>,

    /// 1-based page number (default: 1).
    /// Kept as text so that malformed values fall back to the default instead of failing.
    pub page: Option<String>,

    /// Number of root comments per page (default: 50, max: 500).
    pub page_size: Option<String>,

    /// 'created_at' (default) or 'updated_at'.
    pub sort_by: Option<String>,

    /// 'asc' or 'desc' (default).
    pub order: Option<String>,
}

/// Normalized filter consumed by the comment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFilter {
    pub root_id: Option<i64>,
    pub search: Option<String>,
    pub page: i64,
    pub page_size: i64,
    pub sort_key: SortKey,
    pub order: SortOrder,
}

impl Default for CommentFilter {
    fn default() -> Self {
        Self {
            root_id: None,
            search: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_key: SortKey::default(),
            order: SortOrder::default(),
        }
    }
}

impl CommentFilter {
    /// Applies the defaults: non-positive page or page size fall back to 1 and 50,
    /// blank search text means no search.
    pub fn normalized(mut self) -> Self {
        if self.page <= 0 {
            self.page = 1;
        }
        if self.page_size <= 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self.page_size = self.page_size.min(MAX_PAGE_SIZE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    /// Offset of the first root on the requested page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Integer query value, or `None` if it is missing, empty or not an integer.
fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Malformed paging falls back to the defaults; a malformed `parent` is rejected.
impl TryFrom<CommentListParams> for CommentFilter {
    type Error = AppError;

    fn try_from(params: CommentListParams) -> Result<Self, Self::Error> {
        let root_id = match params.parent.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::BadRequest(format!("invalid parent id: {raw}")))?,
            ),
            _ => None,
        };

        Ok(CommentFilter {
            root_id,
            search: params.search,
            page: parse_number(params.page.as_deref()).unwrap_or(1),
            page_size: parse_number(params.page_size.as_deref()).unwrap_or(DEFAULT_PAGE_SIZE),
            sort_key: SortKey::parse(params.sort_by.as_deref()),
            order: SortOrder::parse(params.order.as_deref()),
        }
        .normalized())
    }
}

/// Response body for `GET /comments`.
#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentTree>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_paging_falls_back_to_defaults() {
        let filter = CommentFilter {
            page: 0,
            page_size: -3,
            ..Default::default()
        }
        .normalized();

        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.sort_key, SortKey::CreatedAt);
        assert_eq!(filter.order, SortOrder::Desc);
    }

    #[test]
    fn params_parse_leniently() {
        let filter = CommentFilter::try_from(CommentListParams {
            parent: Some(" 7 ".into()),
            search: Some("   ".into()),
            page: Some(" 3".into()),
            page_size: Some("10000".into()),
            sort_by: Some("likes".into()),
            order: Some("asc".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(filter.root_id, Some(7));
        assert_eq!(filter.search, None);
        assert_eq!(filter.page, 3);
        assert_eq!(filter.page_size, MAX_PAGE_SIZE);
        assert_eq!(filter.sort_key, SortKey::CreatedAt);
        assert_eq!(filter.order, SortOrder::Asc);
        assert_eq!(filter.offset(), 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn malformed_paging_uses_defaults() {
        for (page, page_size) in [("abc", ""), ("1.5", "ten"), ("", "-")] {
            let filter = CommentFilter::try_from(CommentListParams {
                page: Some(page.into()),
                page_size: Some(page_size.into()),
                ..Default::default()
            })
            .unwrap();

            assert_eq!(filter.page, 1, "page {page:?}");
            assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE, "page_size {page_size:?}");
        }
    }

    #[test]
    fn parent_must_be_an_id_when_given() {
        let empty = CommentFilter::try_from(CommentListParams {
            parent: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(empty.root_id, None);

        let err = CommentFilter::try_from(CommentListParams {
            parent: Some("abc".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("abc")));
    }
}
