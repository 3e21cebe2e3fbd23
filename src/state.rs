// src/state.rs

use axum::extract::FromRef;

use crate::{config::Config, services::CommentService};

#[derive(Clone)]
pub struct AppState {
    pub comments: CommentService,
    pub config: Config,
}

impl FromRef<AppState> for CommentService {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}
