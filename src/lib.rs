pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod locks;
pub mod models;
pub mod progress;
pub mod resolver;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod theme;
pub mod ui;
pub mod validation;

pub use app::router;
pub use config::Settings;
pub use state::AppState;
