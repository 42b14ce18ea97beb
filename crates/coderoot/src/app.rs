use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health::{healthz, livez, metrics, root, status},
        users::{
            delete_user, get_by_referral_code, get_user, list_active, start, stats,
            touch_activity, update_user,
        },
    },
    state::AppState,
};

/// Counts every request and every 5xx response for `/metrics`.
async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.counters.record_request();
    let response = next.run(request).await;
    if response.status().is_server_error() {
        state.counters.record_error();
    }
    response
}

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/users", get(list_active))
        .route("/users/start", post(start))
        .route("/users/stats", get(stats))
        .route("/users/referral/{code}", get(get_by_referral_code))
        .route(
            "/users/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{user_id}/activity", post(touch_activity))
        .layer(cors);

    let request_timeout = state.config.request_timeout();

    Router::new()
        .route("/", get(root))
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}
