//! Shared utilities: IP helpers and advisory topology checks.

pub mod ip_utils;
pub mod validation;

pub use ip_utils::{is_private_ip, multiaddr};
pub use validation::log_topology_warnings;
