//! Security-related request handling.
//!
//! # Responsibilities
//! - Keep hop-by-hop headers from crossing the proxy
//! - Identify the original client to backends

pub mod headers;
