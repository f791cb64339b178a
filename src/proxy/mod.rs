//! Forward proxy pipeline
//!
//! One module per stage: disguise the outbound request, fetch the target,
//! classify challenges, sanitize response headers, rewrite HTML links.

pub mod challenge;
pub mod disguise;
pub mod fetch;
pub mod handler;
pub mod rewrite;
pub mod sanitize;
pub mod server;

pub use server::{build_router, AppState, ProxyServer};
