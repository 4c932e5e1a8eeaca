//! SMC power modes
//!
//! ```text
//!                 ┌───────┐
//!                 │ HSRUN │
//!                 └───────┘
//!                     ▲│
//!                     │▼
//!  WAIT, STOP1/2 ◀─┌──────┐──▶ VLPS
//!                  │ RUN  │
//!                  └──────┘
//!                     ▲│
//!                     │▼
//!           VLPW ◀─┌──────┐──▶ VLPS
//!                  │ VLPR │
//!                  └──────┘
//! ```
//!
//! Requests that can't be reached from the current mode go through RUN first,
//! without notifying anyone about the intermediate hop. VLPR and VLPS entry
//! from RUN park the system clocks on SIRC and gate FIRC, SOSC and SPLL; the
//! previous RUN clocking is put back on the way out.

use crate::clocks::config::{ClockSource, SystemClockConfig};
use crate::clocks::Clocks;
use crate::hw::{pmstat, Hardware, RunMode, StopMode};
use crate::notify::{run_transition, CallbackConfig, Policy};
use crate::{poll_until, Error};

/// Power modes of the S32K1xx
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerMode {
    /// High speed run (S32K14x only)
    Hsrun,
    /// Run
    Run,
    /// Very low power run
    Vlpr,
    /// Wait: core clock gated, entered from RUN
    Wait,
    /// Very low power wait, entered from VLPR
    Vlpw,
    /// Stop with bus clocks still running
    Stop1,
    /// Stop with bus clocks gated
    Stop2,
    /// Very low power stop
    Vlps,
}

/// One entry of the power manager's table
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerModeConfig {
    /// Target mode
    pub mode: PowerMode,
    /// For sleep modes: go back to sleep after the wakeup interrupt returns
    pub sleep_on_exit: bool,
}

impl PowerModeConfig {
    /// `mode` without sleep-on-exit
    pub const fn new(mode: PowerMode) -> Self {
        Self {
            mode,
            sleep_on_exit: false,
        }
    }
}

/// Sources gated while in a very low power mode, in re-enable order
const VLP_GATED: [ClockSource; 3] = [ClockSource::Sosc, ClockSource::Firc, ClockSource::Spll];

/// RUN clocking captured on the way into VLPR or VLPS
#[derive(Clone, Copy, Debug)]
struct SavedClocking {
    run: SystemClockConfig,
    enabled: [bool; 3],
}

/// Moves the chip between the modes of a caller-owned table, notifying every
/// registered callback.
///
/// The tables are borrowed and must outlive the manager. The manager doesn't
/// own the clocks: every transition is handed the [`Clocks`] context.
pub struct PowerManager<'a> {
    configs: &'a [PowerModeConfig],
    callbacks: &'a [CallbackConfig<'a, PowerModeConfig>],
    current: Option<usize>,
    error_callback: Option<usize>,
    saved: Option<SavedClocking>,
}

impl<'a> PowerManager<'a> {
    /// Allow VLP modes (and HSRUN where present) in `SMC_PMPROT`. The
    /// register is write-once after reset.
    pub fn init<H: Hardware>(
        clocks: &mut Clocks<H>,
        configs: &'a [PowerModeConfig],
        callbacks: &'a [CallbackConfig<'a, PowerModeConfig>],
    ) -> Self {
        debug_assert!(!configs.is_empty());
        let allow_hsrun = clocks.chip().has_hsrun;
        clocks.hardware_mut().set_mode_protection(true, allow_hsrun);
        Self {
            configs,
            callbacks,
            current: None,
            error_callback: None,
            saved: None,
        }
    }

    /// Switch to `configs[index]`, notifying every registered callback.
    ///
    /// Sleep modes return once the core wakes up. Interrupts stay enabled
    /// throughout; callbacks must be quick and must not re-enter the manager.
    pub fn set_mode<H: Hardware>(&mut self, clocks: &mut Clocks<H>, index: usize, policy: Policy) -> Result<(), Error> {
        debug_assert!(index < self.configs.len());
        let configs = self.configs;
        let config = &configs[index];
        if config.mode == PowerMode::Hsrun && !clocks.chip().has_hsrun {
            return Err(Error::Unsupported);
        }

        let callbacks = self.callbacks;
        let outcome = run_transition(callbacks, index, config, policy, || self.enter(clocks, config));

        self.error_callback = outcome.error_callback;
        let applied = match outcome.result {
            Ok(()) | Err(Error::NotifyAfter) => true,
            Err(Error::NotifyBefore) => policy == Policy::Forcible,
            Err(_) => false,
        };
        if applied {
            self.current = Some(index);
        }
        outcome.result
    }

    /// Mode the chip reports running in, `None` if `SMC_PMSTAT` holds
    /// something other than a run or VLP status
    pub fn current_mode<H: Hardware>(&self, clocks: &Clocks<H>) -> Option<PowerMode> {
        match clocks.hardware().power_mode_status() {
            pmstat::RUN => Some(PowerMode::Run),
            pmstat::VLPR => Some(PowerMode::Vlpr),
            pmstat::HSRUN => Some(PowerMode::Hsrun),
            pmstat::VLPW => Some(PowerMode::Vlpw),
            pmstat::VLPS => Some(PowerMode::Vlps),
            _ => None,
        }
    }

    /// Index of the last mode set, `None` before the first
    pub fn last_mode_index(&self) -> Option<usize> {
        self.current
    }

    /// The last mode set
    pub fn last_mode_config(&self) -> Option<&'a PowerModeConfig> {
        self.current.and_then(|idx| self.configs.get(idx))
    }

    /// Index of the first callback that failed during the last switch
    pub fn error_callback_index(&self) -> Option<usize> {
        self.error_callback
    }

    /// The first callback that failed during the last switch
    pub fn error_callback(&self) -> Option<&CallbackConfig<'a, PowerModeConfig>> {
        self.error_callback.and_then(|idx| self.callbacks.get(idx))
    }

    fn enter<H: Hardware>(&mut self, clocks: &mut Clocks<H>, config: &PowerModeConfig) -> Result<(), Error> {
        info!("entering {:?}", config.mode);
        match config.mode {
            PowerMode::Run => self.switch_run_mode(clocks, RunMode::Run),
            PowerMode::Hsrun => self.switch_run_mode(clocks, RunMode::Hsrun),
            PowerMode::Vlpr => self.switch_run_mode(clocks, RunMode::Vlpr),
            PowerMode::Wait => {
                self.switch_run_mode(clocks, RunMode::Run)?;
                clocks.hardware_mut().wait_for_interrupt(false, config.sleep_on_exit);
                Ok(())
            }
            PowerMode::Vlpw => {
                self.switch_run_mode(clocks, RunMode::Vlpr)?;
                clocks.hardware_mut().wait_for_interrupt(false, config.sleep_on_exit);
                Ok(())
            }
            PowerMode::Stop1 | PowerMode::Stop2 => {
                self.switch_run_mode(clocks, RunMode::Run)?;
                let option = if config.mode == PowerMode::Stop1 { 1 } else { 2 };
                let hw = clocks.hardware_mut();
                hw.set_stop_mode(StopMode::Stop);
                hw.set_stop_option(option);
                hw.wait_for_interrupt(true, config.sleep_on_exit);
                Ok(())
            }
            PowerMode::Vlps => {
                if clocks.current_run_mode() == RunMode::Hsrun {
                    self.switch_run_mode(clocks, RunMode::Run)?;
                }
                let from_run = clocks.current_run_mode() == RunMode::Run;
                if from_run {
                    self.enter_vlp_clocking(clocks)?;
                }
                let hw = clocks.hardware_mut();
                hw.set_stop_mode(StopMode::Vlps);
                hw.wait_for_interrupt(true, config.sleep_on_exit);
                if from_run {
                    self.exit_vlp_clocking(clocks)?;
                }
                Ok(())
            }
        }
    }

    fn switch_run_mode<H: Hardware>(&mut self, clocks: &mut Clocks<H>, target: RunMode) -> Result<(), Error> {
        let current = clocks.current_run_mode();
        match (current, target) {
            (a, b) if a == b => Ok(()),
            (RunMode::Vlpr, RunMode::Hsrun) | (RunMode::Hsrun, RunMode::Vlpr) => {
                self.switch_run_mode(clocks, RunMode::Run)?;
                self.switch_run_mode(clocks, target)
            }
            (RunMode::Run, RunMode::Vlpr) => {
                self.enter_vlp_clocking(clocks)?;
                clocks.hardware_mut().set_run_mode(RunMode::Vlpr);
                if let Err(e) = wait_for_status(clocks, pmstat::VLPR) {
                    // Still in RUN, put the clocks back
                    self.exit_vlp_clocking(clocks)?;
                    return Err(e);
                }
                Ok(())
            }
            (RunMode::Vlpr, RunMode::Run) => {
                clocks.hardware_mut().set_run_mode(RunMode::Run);
                wait_for_status(clocks, pmstat::RUN)?;
                self.exit_vlp_clocking(clocks)
            }
            (RunMode::Run, RunMode::Hsrun) => {
                check_hsrun_clocking(clocks)?;
                clocks.hardware_mut().set_run_mode(RunMode::Hsrun);
                wait_for_status(clocks, pmstat::HSRUN)
            }
            (_, _) => {
                clocks.hardware_mut().set_run_mode(RunMode::Run);
                wait_for_status(clocks, pmstat::RUN)
            }
        }
    }

    /// Park the system clocks on SIRC and gate everything else
    fn enter_vlp_clocking<H: Hardware>(&mut self, clocks: &mut Clocks<H>) -> Result<(), Error> {
        let run = clocks.current_system_clock()?;
        let enabled = VLP_GATED.map(|source| clocks.source_enabled(source));

        // Saved before the first write, so a failure below can still be undone
        self.saved = Some(SavedClocking { run, enabled });
        if let Err(e) = park_on_sirc(clocks, run, enabled) {
            warn!("parking on SIRC failed, restoring RUN clocks");
            self.exit_vlp_clocking(clocks)?;
            return Err(e);
        }
        debug!("clocks parked on SIRC for VLP");
        Ok(())
    }

    /// Re-enable the sources gated by [`enter_vlp_clocking`](Self::enter_vlp_clocking)
    /// and restore the RUN system clocks
    fn exit_vlp_clocking<H: Hardware>(&mut self, clocks: &mut Clocks<H>) -> Result<(), Error> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        for (source, on) in VLP_GATED.iter().zip(saved.enabled) {
            if on && !clocks.source_enabled(*source) {
                clocks.enable_source(*source)?;
            }
        }
        clocks.switch_to(&saved.run)?;
        info!("RUN clocks restored to {:?}", saved.run.source);
        Ok(())
    }
}

fn park_on_sirc<H: Hardware>(
    clocks: &mut Clocks<H>,
    run: SystemClockConfig,
    enabled: [bool; 3],
) -> Result<(), Error> {
    if run.source != ClockSource::Sirc {
        if clocks.sirc_frequency() == 0 {
            clocks.enable_source(ClockSource::Sirc)?;
        }
        clocks.switch_to(&SystemClockConfig::new(ClockSource::Sirc, 1, 2, 2))?;
    }
    match clocks.system_clock_config(RunMode::Vlpr) {
        Some(vlpr) if vlpr.source == ClockSource::Sirc => {}
        _ => clocks.set_system_clock(Some(RunMode::Vlpr), None)?,
    }
    for (source, on) in VLP_GATED.iter().zip(enabled).rev() {
        if on {
            clocks.disable_source(*source)?;
        }
    }
    Ok(())
}

fn wait_for_status<H: Hardware>(clocks: &Clocks<H>, status: u8) -> Result<(), Error> {
    let hw = clocks.hardware();
    poll_until(clocks.chip().mode_poll_budget, || hw.power_mode_status() == status)
        .inspect_err(|_| warn!("power mode status stuck at {}, expected {}", hw.power_mode_status(), status))
}

/// HSRUN takes whatever `SCG_HCCR` holds, which has to be a running FIRC or
/// SPLL within the HSRUN ceilings
fn check_hsrun_clocking<H: Hardware>(clocks: &Clocks<H>) -> Result<(), Error> {
    let Some(hsrun) = clocks.system_clock_config(RunMode::Hsrun) else {
        return Err(Error::bad_config("no HSRUN system clock configured"));
    };
    let high_speed = matches!(hsrun.source, ClockSource::Firc | ClockSource::Spll);
    if !high_speed || !clocks.source_enabled(hsrun.source) {
        warn!("HSRUN source {:?} isn't running", hsrun.source);
        return Err(Error::bad_config("no high speed source running for HSRUN"));
    }
    clocks.check_ceiling(RunMode::Hsrun, &hsrun, true)
}
