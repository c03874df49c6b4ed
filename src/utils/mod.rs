//! Shared helpers: logging setup, best-effort error handling, environment

pub mod env;
pub mod error;
pub mod logging;
pub mod time;

pub use env::{env_opt, env_path};
pub use error::{best_effort, log_error};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
pub use time::current_timestamp;
