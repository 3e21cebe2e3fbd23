// src/handlers/comments.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        CommentFilter, CommentListParams, CommentListResponse, CreateCommentRequest,
    },
    services::CommentService,
    utils::html::clean_html,
};

/// Create a new comment, optionally as a reply.
pub async fn create_comment(
    State(service): State<CommentService>,
    Json(mut payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    // The length limit applies to what gets stored, i.e. after sanitizing.
    payload.content = clean_html(payload.content.trim());
    payload.validate()?;

    let comment = service.create(payload.parent_id, &payload.content).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List comment threads.
/// Supports subtree scoping (`parent`), search, sorting and pagination of root comments.
pub async fn list_comments(
    State(service): State<CommentService>,
    Query(mut params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    // Stored content is sanitized, so the search text must be too: "a & b" is kept as "a &amp; b".
    params.search = params.search.map(|s| clean_html(s.trim()));
    let filter = CommentFilter::try_from(params)?;

    let comments = service.get_forest(&filter).await?;
    let total = service
        .get_total_count(filter.root_id, filter.search.as_deref())
        .await?;

    Ok(Json(CommentListResponse {
        comments,
        total,
        page: filter.page,
        page_size: filter.page_size,
    }))
}

/// Get a single comment with all of its replies.
pub async fn get_comment_tree(
    State(service): State<CommentService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tree = service.get_subtree(id).await?;

    Ok(Json(tree))
}

/// Delete a comment and every reply below it.
pub async fn delete_comment(
    State(service): State<CommentService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
