//! HTTP surface: axum router, DTOs, handlers, the error envelope, and the
//! request-logging middleware.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use router::create_router;
