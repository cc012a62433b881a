//! Base-`B` radix sort driven by `B` worker units and one coordinator that share nothing but a
//! numeric array, a bucket matrix, a completion flag, phase semaphores and a message channel.

use std::time::{Duration, Instant};

pub mod config;
pub mod coordinator;
pub mod error;
pub mod par;
pub mod shared;
pub mod sorter;
pub mod sync;
pub mod worker;

pub use config::{Args, SortConfig};
pub use error::{ArgError, Facility, SortError};
pub use par::Scheduler;
pub use sorter::{set_unit_scheduler, sort, sort_with, SortOutcome, SortedArray};

/// Profiling scope, compiled out unless the `profile` feature is enabled.
#[macro_export]
macro_rules! scope {
    ($name:expr) => {
        #[cfg(feature = "profile")]
        profiling::scope!($name);
    };
}

/// Profiling scope that also logs its duration with the `scope_print` feature.
#[macro_export]
macro_rules! scope_print {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print")]
        let _scope_print = $crate::ScopePrint::new($name);
    };
}

/// Like [`scope_print!`] but for the few coarse scopes, enabled by `scope_print_major` alone.
#[macro_export]
macro_rules! scope_print_major {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print_major")]
        let _scope_print = $crate::ScopePrint::new($name);
    };
}

/// Logs the time between its creation and drop.
#[doc(hidden)]
pub struct ScopePrint {
    name: &'static str,
    start: Instant,
}

impl ScopePrint {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopePrint {
    fn drop(&mut self) {
        tracing::debug!(scope = self.name, elapsed = %PrettyDuration(self.start.elapsed()));
    }
}

/// A wrapper struct for `std::time::Duration` to provide pretty-printing of durations.
#[doc(hidden)]
pub struct PrettyDuration(pub Duration);

impl std::fmt::Display for PrettyDuration {
    /// Durations are formatted as follows:
    /// - If the duration is greater than or equal to 1 second, it is formatted in seconds (s).
    /// - If the duration is greater than or equal to 1 millisecond but less than 1 second, it is formatted in milliseconds (ms).
    /// - If the duration is less than 1 millisecond, it is formatted in microseconds (µs).
    ///   In the case of seconds & milliseconds, the duration is always printed with a precision of two decimal places.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        if duration.as_secs() > 0 {
            let seconds =
                duration.as_secs() as f64 + f64::from(duration.subsec_nanos()) / 1_000_000_000.0;
            write!(f, "{seconds:.2}s")
        } else if duration.subsec_millis() > 0 {
            let milliseconds =
                duration.as_millis() as f64 + f64::from(duration.subsec_micros() % 1_000) / 1_000.0;
            write!(f, "{milliseconds:.2}ms")
        } else {
            let microseconds = duration.as_micros();
            write!(f, "{microseconds}µs")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_duration_units() {
        assert_eq!(PrettyDuration(Duration::from_millis(1500)).to_string(), "1.50s");
        assert_eq!(PrettyDuration(Duration::from_micros(2250)).to_string(), "2.25ms");
        assert_eq!(PrettyDuration(Duration::from_micros(40)).to_string(), "40µs");
    }
}
