pub mod api;
pub mod config;
pub mod observability;
pub mod pipeline;
