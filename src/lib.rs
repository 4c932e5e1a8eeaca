#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Clock tree and power mode management for the S32K1xx family.
//!
//! The crate is split the same way the silicon is:
//!
//! * [`clocks`]: the SCG clock sources, the system clock transition engine, and
//!   peripheral clock routing through the PCC and SIM, plus the notified
//!   [`ClockManager`](clocks::manager::ClockManager).
//! * [`power`]: the SMC power mode coordinator and its notified
//!   [`PowerManager`](power::PowerManager).
//!
//! Register access goes through the traits in [`hw`], so the same driver runs on
//! real silicon or on a simulated register file.
//!
//! ## Feature flags
#![doc = document_features::document_features!(feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

#[cfg(feature = "critical-section-impl")]
use cortex_m as _;

pub mod chip;
pub mod clocks;
pub mod hw;
pub mod notify;
pub mod power;

#[cfg(test)]
pub(crate) mod testing;

pub use chip::Chip;
pub use clocks::config::{ClockSource, ClockUserConfig, SystemClockConfig};
pub use clocks::manager::ClockManager;
pub use clocks::{ClockName, Clocks};
pub use notify::{CallbackConfig, CallbackType, NotifyType, Policy, TransitionCallback};
pub use power::{PowerManager, PowerMode, PowerModeConfig};

/// Error type shared by the clock and power drivers
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested configuration was impossible or conflicting, or no safe
    /// clock source was available to perform it
    BadConfiguration {
        /// Explanation of error
        reason: &'static str,
    },
    /// The requested clock, source or mode doesn't exist on this chip
    Unsupported,
    /// The clock exists but its upstream gate or source is off
    GatedOff,
    /// The change conflicts with the current use of the resource, e.g.
    /// disabling the source that drives the system clock
    Busy,
    /// A bounded poll didn't observe the expected hardware state
    Timeout,
    /// A registered callback refused the transition before it was applied
    NotifyBefore,
    /// A registered callback failed after the transition was applied
    NotifyAfter,
}

impl Error {
    pub(crate) fn bad_config(reason: &'static str) -> Self {
        Self::BadConfiguration { reason }
    }
}

/// Spin until `done` returns `true`, checking it at most `max_attempts` times.
///
/// The budget is an iteration count, not a duration: the limits used by this
/// crate are calibrated against known core clock speeds and must stay counts.
/// Returns [`Error::Timeout`] when the budget runs out.
pub(crate) fn poll_until(max_attempts: u32, mut done: impl FnMut() -> bool) -> Result<(), Error> {
    for _ in 0..max_attempts {
        if done() {
            return Ok(());
        }
    }
    Err(Error::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_until_stops_on_first_success() {
        let mut calls = 0;
        let res = poll_until(10, || {
            calls += 1;
            true
        });
        assert_eq!(res, Ok(()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn poll_until_times_out_after_budget() {
        let mut calls = 0;
        let res = poll_until(3, || {
            calls += 1;
            false
        });
        assert_eq!(res, Err(Error::Timeout));
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_until_sees_late_success() {
        let mut calls = 0;
        let res = poll_until(5, || {
            calls += 1;
            calls == 5
        });
        assert_eq!(res, Ok(()));
    }
}
