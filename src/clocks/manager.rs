//! Switching between named clock trees with notification

use super::config::ClockUserConfig;
use super::Clocks;
use crate::hw::Hardware;
use crate::notify::{run_transition, CallbackConfig, Policy};
use crate::Error;

/// Owns the [`Clocks`] context and a caller-owned table of clock trees, and
/// moves between them by index.
///
/// The configuration and callback tables are borrowed, not copied, and must
/// outlive the manager.
pub struct ClockManager<'a, H> {
    clocks: Clocks<H>,
    configs: &'a [ClockUserConfig<'a>],
    callbacks: &'a [CallbackConfig<'a, ClockUserConfig<'a>>],
    current: Option<usize>,
    error_callback: Option<usize>,
}

impl<'a, H: Hardware> ClockManager<'a, H> {
    /// Take over `clocks` with the given tables. Nothing is applied until
    /// [`update_configuration`](Self::update_configuration) is called.
    pub fn init(
        clocks: Clocks<H>,
        configs: &'a [ClockUserConfig<'a>],
        callbacks: &'a [CallbackConfig<'a, ClockUserConfig<'a>>],
    ) -> Self {
        debug_assert!(!configs.is_empty());
        Self {
            clocks,
            configs,
            callbacks,
            current: None,
            error_callback: None,
        }
    }

    /// Apply `configs[target]`, notifying every registered callback.
    ///
    /// Interrupts are masked from the first `Before` notification until the
    /// last `After` (or `Recover`) one.
    pub fn update_configuration(&mut self, target: usize, policy: Policy) -> Result<(), Error> {
        debug_assert!(target < self.configs.len());
        let configs = self.configs;
        let config = &configs[target];
        let callbacks = self.callbacks;
        let clocks = &mut self.clocks;

        info!("clock configuration {} requested", target);
        let outcome = critical_section::with(|_| {
            run_transition(callbacks, target, config, policy, || clocks.apply(config))
        });

        self.error_callback = outcome.error_callback;
        let applied = match outcome.result {
            Ok(()) | Err(Error::NotifyAfter) => true,
            Err(Error::NotifyBefore) => policy == Policy::Forcible,
            Err(_) => false,
        };
        if applied {
            self.current = Some(target);
        }
        outcome.result
    }

    /// Index of the last configuration applied, `None` before the first
    pub fn current_configuration(&self) -> Option<usize> {
        self.current
    }

    /// Index of the first callback that failed during the last update
    pub fn error_callback_index(&self) -> Option<usize> {
        self.error_callback
    }

    /// The first callback that failed during the last update
    pub fn error_callback(&self) -> Option<&CallbackConfig<'a, ClockUserConfig<'a>>> {
        self.error_callback.and_then(|idx| self.callbacks.get(idx))
    }

    /// The clock context, for frequency queries
    pub fn clocks(&self) -> &Clocks<H> {
        &self.clocks
    }

    /// The clock context, for direct (un-notified) changes
    pub fn clocks_mut(&mut self) -> &mut Clocks<H> {
        &mut self.clocks
    }

    /// Give the clock context back
    pub fn release(self) -> Clocks<H> {
        self.clocks
    }
}
