//! Register access boundary
//!
//! The drivers never touch memory-mapped registers directly. Everything goes
//! through one trait per hardware block, and [`Hardware`] bundles them. A board
//! crate implements these on top of its PAC; the tests implement them on a
//! simulated register file.
//!
//! Values crossing this boundary are raw field codes (`SCS`, `PCS`, divider
//! codes...). Decoding them is the drivers' job.

use crate::clocks::config::ClockSource;
use crate::clocks::periph::Peripheral;

/// Run mode selected in `SMC_PMCTRL[RUNM]`, and the matching
/// `SCG_RCCR`/`SCG_VCCR`/`SCG_HCCR` register
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Normal run
    Run,
    /// Very low power run
    Vlpr,
    /// High speed run
    Hsrun,
}

/// `SCG_CSR` and `SCG_xCCR` layout
///
/// Dividers hold the field codes, i.e. divisor - 1.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SysClkRegister {
    /// `SCS` code
    pub source: u8,
    /// `DIVCORE`
    pub div_core: u8,
    /// `DIVBUS`
    pub div_bus: u8,
    /// `DIVSLOW`
    pub div_slow: u8,
}

/// Control bits shared by `SCG_SIRCCSR`, `SCG_FIRCCSR`, `SCG_SOSCCSR` and
/// `SCG_SPLLCSR`. Bits a given source lacks are ignored.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceControl {
    /// `xEN`
    pub enable: bool,
    /// `xSTEN`
    pub enable_in_stop: bool,
    /// `xLPEN`
    pub enable_in_low_power: bool,
    /// `xREGOFF` inverted (FIRC only)
    pub regulator: bool,
    /// `xCM`
    pub monitor: bool,
    /// `xCMRE`
    pub monitor_reset: bool,
    /// `LK`
    pub locked: bool,
}

/// Contents of a source's `SCG_xCFG` register
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceParams {
    /// `SIRCCFG`
    Sirc {
        /// `RANGE`
        range: u8,
    },
    /// `FIRCCFG`
    Firc {
        /// `RANGE`
        range: u8,
    },
    /// `SOSCCFG`
    Sosc {
        /// `RANGE`
        range: u8,
        /// `HGO`
        high_gain: bool,
        /// `EREFS`
        crystal: bool,
    },
    /// `SPLLCFG`
    Spll {
        /// `PREDIV`, divisor - 1
        prediv: u8,
        /// `MULT`, multiplier - 16
        mult: u8,
    },
}

/// System Clock Generator
pub trait ScgAccess {
    /// Read the control register
    fn source_control(&self, source: ClockSource) -> SourceControl;
    /// `xEN`
    fn source_enabled(&self, source: ClockSource) -> bool {
        self.source_control(source).enable
    }
    /// `xVLD`
    fn source_valid(&self, source: ClockSource) -> bool;
    /// Clear `LK` so the control and config registers accept writes
    fn unlock_source(&mut self, source: ClockSource);
    /// Write the control register
    fn set_source_control(&mut self, source: ClockSource, control: SourceControl);
    /// Write the config register
    fn set_source_params(&mut self, params: SourceParams);
    /// Read the config register
    fn source_params(&self, source: ClockSource) -> SourceParams;
    /// Write `SCG_xDIV`, both fields as divider codes
    fn set_async_dividers(&mut self, source: ClockSource, div1: u8, div2: u8);
    /// Read `SCG_xDIV`
    fn async_dividers(&self, source: ClockSource) -> (u8, u8);
    /// `SCG_CSR`, the configuration actually driving the system clocks
    fn system_clock_status(&self) -> SysClkRegister;
    /// `SCG_RCCR`/`SCG_VCCR`/`SCG_HCCR`
    fn system_clock_config(&self, mode: RunMode) -> SysClkRegister;
    /// Write `SCG_RCCR`/`SCG_VCCR`/`SCG_HCCR` in a single store
    fn set_system_clock_config(&mut self, mode: RunMode, value: SysClkRegister);
    /// `SCG_CLKOUTCNFG[CLKOUTSEL]`
    fn scg_clkout_select(&self) -> u8;
    /// Write `SCG_CLKOUTCNFG[CLKOUTSEL]`
    fn set_scg_clkout_select(&mut self, select: u8);
}

/// `PCC_x` layout
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PccRegister {
    /// `CGC`
    pub gate: bool,
    /// `PCS`
    pub source: u8,
    /// `PCD`, divisor - 1
    pub div: u8,
    /// `FRAC`
    pub frac: u8,
}

/// Peripheral Clock Controller
pub trait PccAccess {
    /// Read the peripheral's PCC register
    fn pcc(&self, peripheral: Peripheral) -> PccRegister;
    /// Flip `CGC` only
    fn set_pcc_gate(&mut self, peripheral: Peripheral, enable: bool);
    /// Write the whole register in a single store
    fn set_pcc(&mut self, peripheral: Peripheral, value: PccRegister);
}

/// `SIM_LPOCLKS` layout
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LpoClocks {
    /// `LPO1KCLKEN`
    pub lpo1k: bool,
    /// `LPO32KCLKEN`
    pub lpo32k: bool,
    /// `LPOCLKSEL`
    pub select: u8,
    /// `RTCCLKSEL`
    pub rtc_select: u8,
}

/// `SIM_CHIPCTL` clock out fields
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockOutRegister {
    /// `CLKOUTEN`
    pub enable: bool,
    /// `CLKOUTSEL`
    pub select: u8,
    /// `CLKOUTDIV`, divisor - 1
    pub div: u8,
}

/// System Integration Module
pub trait SimAccess {
    /// `SIM_PLATCGC` gate of a platform peripheral
    fn platform_gate(&self, peripheral: Peripheral) -> bool;
    /// Write a `SIM_PLATCGC` gate
    fn set_platform_gate(&mut self, peripheral: Peripheral, enable: bool);
    /// `SIM_LPOCLKS`
    fn lpo_clocks(&self) -> LpoClocks;
    /// Write `SIM_LPOCLKS`
    fn set_lpo_clocks(&mut self, value: LpoClocks);
    /// `SIM_CHIPCTL` clock out fields
    fn clock_out(&self) -> ClockOutRegister;
    /// Write the `SIM_CHIPCTL` clock out fields
    fn set_clock_out(&mut self, value: ClockOutRegister);
}

/// Power Management Controller
pub trait PmcAccess {
    /// `REGSC[LPODIS]` inverted
    fn lpo_enabled(&self) -> bool;
    /// Write `REGSC[LPODIS]`
    fn set_lpo_enabled(&mut self, enable: bool);
}

/// `SMC_PMCTRL[STOPM]` targets reachable from a deep sleep
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopMode {
    /// Normal stop, qualified by `SMC_STOPCTRL[STOPO]`
    Stop,
    /// Very low power stop
    Vlps,
}

/// `SMC_PMSTAT` codes
pub mod pmstat {
    /// RUN
    pub const RUN: u8 = 0x01;
    /// STOP
    pub const STOP: u8 = 0x02;
    /// VLPR
    pub const VLPR: u8 = 0x04;
    /// VLPW
    pub const VLPW: u8 = 0x08;
    /// VLPS
    pub const VLPS: u8 = 0x10;
    /// HSRUN
    pub const HSRUN: u8 = 0x80;
}

/// System Mode Controller, plus the core's sleep instruction
pub trait SmcAccess {
    /// `SMC_PMSTAT`, one of the [`pmstat`] codes
    fn power_mode_status(&self) -> u8;
    /// `SMC_PMPROT[AVLP, AHSRUN]`
    fn set_mode_protection(&mut self, allow_vlp: bool, allow_hsrun: bool);
    /// `SMC_PMCTRL[RUNM]`
    fn set_run_mode(&mut self, mode: RunMode);
    /// `SMC_PMCTRL[STOPM]`
    fn set_stop_mode(&mut self, mode: StopMode);
    /// `SMC_STOPCTRL[STOPO]`: 1 for STOP1, 2 for STOP2
    fn set_stop_option(&mut self, option: u8);
    /// Set `SCR[SLEEPDEEP]` and `SCR[SLEEPONEXIT]`, then `WFI`. Returns once
    /// the core wakes up.
    fn wait_for_interrupt(&mut self, deep: bool, sleep_on_exit: bool);
}

/// Everything the clock and power drivers need
pub trait Hardware: ScgAccess + PccAccess + SimAccess + PmcAccess + SmcAccess {}

impl<T> Hardware for T where T: ScgAccess + PccAccess + SimAccess + PmcAccess + SmcAccess {}
