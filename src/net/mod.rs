//! Network layer subsystem.
//!
//! # Responsibilities
//! - Upstream TLS configuration for `https` backends
//!
//! # Design Decisions
//! - rustls with webpki roots; no system certificate store
//! - Certificate verification can only be disabled explicitly

pub mod tls;
