pub mod app;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use app::create_app;
pub use error::GameError;
pub use services::session_manager::{spawn_deadline_scheduler, SessionManager};
pub use state::AppState;
