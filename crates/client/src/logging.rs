//! Namespaced diagnostics for the dev client.
//!
//! Every line is prefixed with [`DEBUG_NAMESPACE`] and dispatched to the
//! platform backend:
//! - Web: `web_sys::console`
//! - Native: `tracing` crate
//!
//! In the browser, debug lines show up under the console's verbose level.
//! Natively they follow the subscriber's filter.

use devreload_shared::DEBUG_NAMESPACE;

fn namespaced(msg: &str) -> String {
    format!("{} {}", DEBUG_NAMESPACE, msg)
}

/// Log an error message (platform-specific)
#[cfg(target_arch = "wasm32")]
pub fn log_error_impl(msg: &str) {
    web_sys::console::error_1(&namespaced(msg).into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_error_impl(msg: &str) {
    tracing::error!("{}", namespaced(msg));
}

/// Log a warning message (platform-specific)
#[cfg(target_arch = "wasm32")]
pub fn log_warn_impl(msg: &str) {
    web_sys::console::warn_1(&namespaced(msg).into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_warn_impl(msg: &str) {
    tracing::warn!("{}", namespaced(msg));
}

/// Log a debug message (platform-specific)
#[cfg(target_arch = "wasm32")]
pub fn log_debug_impl(msg: &str) {
    web_sys::console::debug_1(&namespaced(msg).into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_debug_impl(msg: &str) {
    tracing::debug!("{}", namespaced(msg));
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_error_impl(&format!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_warn_impl(&format!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_debug_impl(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_namespace() {
        assert_eq!(namespaced("connected"), "dev-client connected");
    }
}
