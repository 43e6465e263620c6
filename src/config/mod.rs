//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, ROUTER_* env overrides)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → passed by value/clone to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; routes, not config, are hot-reloaded
//! - All fields have defaults to allow minimal (or no) config files
//! - Durations are human-readable strings ("2s", "60s")
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use validation::{config_warnings, ConfigWarning};
pub use schema::{
    AdminConfig, BackendConfig, ListenerConfig, LogFormat, ObservabilityConfig, RouterConfig,
    StoreConfig,
};
