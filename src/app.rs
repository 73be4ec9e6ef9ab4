use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/auth", get(handlers::auth_page))
        .route("/auth/login", post(handlers::login))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/logout", post(handlers::logout))
        .route("/add", get(handlers::add_page).post(handlers::add_submit))
        .route("/history", get(handlers::history_page))
        .route("/settings", get(handlers::settings_page).post(handlers::settings_submit))
        .route("/theme/toggle", post(handlers::toggle_theme))
        .route("/api/auth/signup", post(handlers::api_signup))
        .route("/api/auth/login", post(handlers::api_login))
        .route("/api/auth/logout", post(handlers::api_logout))
        .route("/api/session", get(handlers::api_session))
        .route("/api/today", get(handlers::get_today))
        .route("/api/metrics", get(handlers::get_metric).post(handlers::save_metric))
        .route("/api/history", get(handlers::get_history))
        .route("/api/goals", get(handlers::get_goals).put(handlers::put_goals))
        .with_state(state)
}
