use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::user;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(user::get_me))
        .route_layer(axum::middleware::from_fn(require_auth))
        .route("/auth/register", post(user::register_user))
        .route("/auth/login", post(user::login_user))
}
