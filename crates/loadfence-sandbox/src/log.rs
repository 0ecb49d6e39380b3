//! Progress logging for successful loads.
//!
//! `info_log!` reports routine containment progress (a tree finished loading)
//! at info level. Quiet mode drops these lines entirely, while rejections and
//! failures still go through `tracing::warn!` / `tracing::error!`.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

/// Cached `LOADFENCE_QUIET` setting.
pub fn is_quiet() -> bool {
    loadfence_core::config::ObservabilityConfig::from_env().quiet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_quiet_follows_observability_config() {
        let quiet = loadfence_core::config::ObservabilityConfig::from_env().quiet;
        assert_eq!(is_quiet(), quiet);
        // expands in both modes without a subscriber installed
        crate::info_log!("loaded {} units", 3);
    }
}
