pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me));

    let course_routes = Router::new()
        .route("/", get(routes::course::list))
        .route("/{course_id}", get(routes::course::get));

    let admin_routes = Router::new().route("/courses", post(routes::course::create));

    let access_routes = Router::new()
        .route(
            "/admin/codes",
            post(routes::access::generate_codes).get(routes::access::list_codes),
        )
        .route("/admin/grants", post(routes::access::grant))
        .route("/redeem", post(routes::access::redeem))
        .route("/check/{course_id}", get(routes::access::check))
        .route("/me", get(routes::access::my_grants));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/courses", course_routes)
        .nest("/admin", admin_routes)
        .nest("/access", access_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

async fn health_check() -> response::ApiResponse<serde_json::Value> {
    response::ApiResponse::ok(
        serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        "Healthy",
    )
}
