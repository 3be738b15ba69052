// routes.rs
use axum::routing::{get, post};
use axum::Router;
use http::Method;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;

pub fn create_router(pool: PgPool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/surveys",
            get(handlers::list_surveys).post(handlers::create_survey),
        )
        .route(
            "/api/surveys/{id}",
            get(handlers::get_survey)
                .put(handlers::update_survey)
                .delete(handlers::delete_survey),
        )
        .route(
            "/api/surveys/{id}/reconcile",
            post(handlers::reconcile_survey),
        )
        .route(
            "/api/responses",
            get(handlers::list_responses).post(handlers::submit_response),
        )
        .route("/api/responses/{id}", get(handlers::get_response))
        .route(
            "/api/responses/survey/{survey_id}",
            get(handlers::list_survey_responses),
        )
        .route("/api/analytics/overview", get(handlers::overview_analytics))
        .route(
            "/api/analytics/survey/{survey_id}",
            get(handlers::survey_analytics),
        )
        .layer(cors)
        .with_state(pool)
}
