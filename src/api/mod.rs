//! HTTP surface: the single chat page and its JSON API

pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;
pub mod types;

pub use handlers::AppState;
pub use server::build_state;
pub use server::serve_api;
