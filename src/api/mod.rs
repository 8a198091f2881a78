mod error;
pub mod extract;
pub mod routes;
mod server;
pub mod state;

pub use routes::{mount, route_handler};
pub use server::{AnyError, router, run};
pub use state::AppState;
