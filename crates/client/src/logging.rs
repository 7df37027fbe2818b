//! Cross-platform logging module.
//!
//! The `log_*!` macros dispatch to the platform backend:
//! - Web: `web_sys::console`
//! - Native: `tracing`, installed by [`init`]
//!
//! Session tokens must never be passed to these macros.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub fn log_impl(level: Level, msg: &str) {
    let line = format!("[bizdesk] {msg}");
    match level {
        Level::Debug => web_sys::console::debug_1(&line.into()),
        Level::Info => web_sys::console::log_1(&line.into()),
        Level::Warn => web_sys::console::warn_1(&line.into()),
        Level::Error => web_sys::console::error_1(&line.into()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_impl(level: Level, msg: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "bizdesk_client", "{}", msg),
        Level::Info => tracing::info!(target: "bizdesk_client", "{}", msg),
        Level::Warn => tracing::warn!(target: "bizdesk_client", "{}", msg),
        Level::Error => tracing::error!(target: "bizdesk_client", "{}", msg),
    }
}

/// Install the native `tracing` subscriber. `RUST_LOG` overrides the default
/// `bizdesk_client=debug` filter. Calling it twice is harmless.
#[cfg(not(target_arch = "wasm32"))]
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bizdesk_client=debug")),
        )
        .try_init();
}

/// The browser console needs no setup.
#[cfg(target_arch = "wasm32")]
pub fn init() {}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Debug, &format!($($arg)*))
    };
}
