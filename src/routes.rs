use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // OAuth endpoints: the authorization front door and token plumbing
    let oauth_routes = Router::new()
        .route("/authorize", get(handlers::authorize::authorize))
        .route("/login", post(handlers::authorize::login))
        .route("/consent", post(handlers::authorize::consent))
        .route("/token", post(handlers::token::token))
        .route("/revoke", post(handlers::token::revoke));

    // Account endpoints (registration is open, reads/writes take a Bearer token)
    let account_routes = Router::new()
        .route("/register", post(handlers::accounts::register))
        .route(
            "/:username",
            get(handlers::accounts::get_account).patch(handlers::accounts::update_account),
        );

    // Admin endpoints (require X-Admin-Key)
    let admin_routes = Router::new()
        .route(
            "/clients",
            get(handlers::admin::list_clients).post(handlers::admin::create_client),
        )
        .route(
            "/clients/:client_id/rotate-secret",
            post(handlers::admin::rotate_secret),
        )
        .route(
            "/scopes",
            get(handlers::admin::list_scopes).post(handlers::admin::create_scope),
        );

    Router::new()
        .nest("/oauth", oauth_routes)
        .nest("/api/accounts", account_routes)
        .nest("/admin", admin_routes)
        .route("/.well-known/jwks.json", get(handlers::well_known::jwks))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
