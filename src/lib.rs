//! Mirage - Forwarding Anti-Bot Proxy
//!
//! A forwarding HTTP proxy written in Rust.
//!
//! ## Features
//!
//! - Fetches caller-specified pages with randomized browser-disguise headers
//! - Detects CAPTCHA and rate-limit challenge responses and redirects to an
//!   external challenge-solving service
//! - Strips framing/embedding-blocking headers and adds permissive CORS
//! - Rewrites same-origin links, forms and sources so navigation keeps
//!   flowing through the proxy
//! - Streams binary bodies through without buffering

pub mod config;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use error::{MirageError, Result};
