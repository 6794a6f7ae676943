//! Outbound messaging: the transport port and its decorators.

pub mod port;
pub mod throttled;
pub mod timeout;
pub mod types;
