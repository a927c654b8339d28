//! HTTP API used by the mobile and web clients

pub mod extractor;
pub mod handlers;
pub mod notification_handlers;
pub mod project_handlers;
pub mod routes;
pub mod step_handlers;
pub mod token_handlers;

pub use routes::create_router;
