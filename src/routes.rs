// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{handlers::comments, state::AppState};

/// Assembles the main application router.
///
/// * Mounts the comment API under `/comments`.
/// * Serves the optional static front-end for every other path.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let comment_routes = Router::new()
        .route(
            "/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/{id}",
            get(comments::get_comment_tree).delete(comments::delete_comment),
        );

    let mut router: Router<AppState> = Router::new().nest("/comments", comment_routes);

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
