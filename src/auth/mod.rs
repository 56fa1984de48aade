use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod password;
pub mod session;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
