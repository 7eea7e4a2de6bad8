//! Observability: structured logging and the backend health check.

mod health;
mod logging;

pub use health::{HealthStatus, check_health};
pub use logging::init_logging;
