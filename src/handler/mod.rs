//! Request handler module
//!
//! Routing dispatch, upstream forwarding and the static asset fallback.

pub mod forward;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
