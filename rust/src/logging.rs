//! Logging macros for the allocator with verbosity level control.
//!
//! Events go through `tracing`, so they carry structured fields
//! (`phase`, `site`, `day`, ...) and are zero-cost when the verbosity
//! gate is closed. Levels:
//! - 0: SILENT (warnings only)
//! - 1: CHANGES (placements, swaps, phase results)
//! - 2: CHECKS (candidate consideration, skip reasons)
//! - 3: DEBUG (full algorithm internals)
//!
//! Soft shortfalls are not gated: they are always emitted with
//! `tracing::warn!` and recorded on the allocation result.

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: slot placements, executed swaps, phase summaries.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: site consideration, skip reasons, reservation guards.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: sequence dumps, per-phase counters.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_constants() {
        assert_eq!(VERBOSITY_SILENT, 0);
        assert_eq!(VERBOSITY_CHANGES, 1);
        assert_eq!(VERBOSITY_CHECKS, 2);
        assert_eq!(VERBOSITY_DEBUG, 3);
    }

    #[test]
    fn test_log_macros_accept_fields() {
        let verbosity = VERBOSITY_DEBUG;
        log_changes!(verbosity, phase = "main", site = "a", "placed {}", 1);
        log_checks!(verbosity, phase = "main", "skipped {}", 2);
        log_debug!(verbosity, "sequence length {}", 3);
    }
}
