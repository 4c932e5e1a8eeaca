//! Simulated S32K1xx clock and power registers for host tests
//!
//! Models just enough behavior to exercise the drivers: sources take a
//! configurable number of polls to become valid, `SCG_CSR` follows the control
//! register of the current run mode once its source is valid, and `SMC_PMSTAT`
//! follows `RUNM` when the VLP/HSRUN entry conditions hold. Every write is
//! logged in order.

use core::cell::Cell;

use crate::clocks::config::ClockSource;
use crate::clocks::periph::Peripheral;
use crate::hw::{
    pmstat, ClockOutRegister, LpoClocks, PccAccess, PccRegister, PmcAccess, RunMode, ScgAccess, SimAccess,
    SmcAccess, SourceControl, SourceParams, StopMode, SysClkRegister,
};

/// One register write, as seen by the simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Unlock(ClockSource),
    SourceControl(ClockSource, SourceControl),
    SourceParams(SourceParams),
    AsyncDividers(ClockSource, u8, u8),
    SystemClock(RunMode, SysClkRegister),
    ScgClkOut(u8),
    PccGate(Peripheral, bool),
    Pcc(Peripheral, PccRegister),
    PlatformGate(Peripheral, bool),
    LpoClocks(LpoClocks),
    ClockOut(ClockOutRegister),
    PmcLpo(bool),
    Protection { allow_vlp: bool, allow_hsrun: bool },
    RunMode(RunMode),
    StopMode(StopMode),
    StopOption(u8),
    Sleep { deep: bool, sleep_on_exit: bool },
}

struct Source {
    control: SourceControl,
    params: SourceParams,
    dividers: (u8, u8),
    /// Polls of `xVLD` left before it reads set
    settling: Cell<u32>,
    stabilize_after: u32,
    never_valid: bool,
}

impl Source {
    fn new(params: SourceParams, enabled: bool, dividers: (u8, u8)) -> Self {
        Self {
            control: SourceControl {
                enable: enabled,
                ..SourceControl::default()
            },
            params,
            dividers,
            settling: Cell::new(0),
            stabilize_after: 0,
            never_valid: false,
        }
    }
}

pub struct Simulator {
    sources: [Source; 4],
    csr: Cell<SysClkRegister>,
    /// Value `SCG_CSR` takes after the given number of further reads
    pending_csr: Cell<Option<(SysClkRegister, u32)>>,
    switch_delay: u32,
    rccr: SysClkRegister,
    vccr: SysClkRegister,
    hccr: SysClkRegister,
    scg_clkout: u8,
    pcc: [PccRegister; Peripheral::ALL.len()],
    platform_gates: [bool; Peripheral::ALL.len()],
    lpo_clocks: LpoClocks,
    clock_out: ClockOutRegister,
    lpo_enabled: bool,
    pmstat: u8,
    allow_vlp: bool,
    allow_hsrun: bool,
    events: Vec<Event>,
    writes: usize,
    /// `SCG_CSR` source after every write
    csr_samples: Vec<u8>,
    lost_system_clock: bool,
}

fn index(p: Peripheral) -> usize {
    Peripheral::ALL.iter().position(|q| *q == p).unwrap()
}

impl Simulator {
    /// FIRC driving RUN at /1 /2 /2, SIRC at 8 MHz, SOSC and SPLL off. The
    /// SIRC and FIRC dividers are set to /1.
    pub fn reset() -> Self {
        Self {
            sources: [
                Source::new(SourceParams::Sirc { range: 1 }, true, (1, 1)),
                Source::new(SourceParams::Firc { range: 0 }, true, (1, 1)),
                Source::new(
                    SourceParams::Sosc {
                        range: 3,
                        high_gain: false,
                        crystal: true,
                    },
                    false,
                    (0, 0),
                ),
                Source::new(SourceParams::Spll { prediv: 0, mult: 0 }, false, (0, 0)),
            ],
            csr: Cell::new(SysClkRegister {
                source: ClockSource::Firc.bits(),
                div_core: 0,
                div_bus: 1,
                div_slow: 1,
            }),
            pending_csr: Cell::new(None),
            switch_delay: 0,
            rccr: SysClkRegister {
                source: ClockSource::Firc.bits(),
                div_core: 0,
                div_bus: 1,
                div_slow: 1,
            },
            vccr: SysClkRegister {
                source: ClockSource::Sirc.bits(),
                div_core: 1,
                div_bus: 0,
                div_slow: 3,
            },
            hccr: SysClkRegister {
                source: ClockSource::Firc.bits(),
                div_core: 0,
                div_bus: 1,
                div_slow: 3,
            },
            scg_clkout: ClockSource::Firc.bits(),
            pcc: [PccRegister::default(); Peripheral::ALL.len()],
            platform_gates: [true; Peripheral::ALL.len()],
            lpo_clocks: LpoClocks {
                lpo1k: true,
                lpo32k: true,
                select: 0,
                rtc_select: 0,
            },
            clock_out: ClockOutRegister::default(),
            lpo_enabled: true,
            pmstat: pmstat::RUN,
            allow_vlp: false,
            allow_hsrun: false,
            events: Vec::new(),
            writes: 0,
            csr_samples: Vec::new(),
            lost_system_clock: false,
        }
    }

    /// Make `source` take `polls` reads of `xVLD` to stabilize after enabling
    pub fn set_stabilization(&mut self, source: ClockSource, polls: u32) {
        self.sources[source.index()].stabilize_after = polls;
    }

    /// `source` never becomes valid
    pub fn never_stabilize(&mut self, source: ClockSource) {
        self.sources[source.index()].never_valid = true;
    }

    /// `SCG_CSR` picks up a new configuration only after `polls` reads
    pub fn set_switch_delay(&mut self, polls: u32) {
        self.switch_delay = polls;
    }

    /// Put `source` on the system clocks of the current run mode at /1 /2 /2,
    /// bypassing the driver
    pub fn force_system_clock(&mut self, source: ClockSource) {
        let reg = SysClkRegister {
            source: source.bits(),
            div_core: 0,
            div_bus: 1,
            div_slow: 1,
        };
        *self.ccr_mut(self.run_mode()) = reg;
        self.csr.set(reg);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// `SCG_CSR` source after every write so far
    pub fn csr_samples(&self) -> &[u8] {
        &self.csr_samples
    }

    /// Whether the source driving `SCG_CSR` was ever disabled
    pub fn lost_system_clock(&self) -> bool {
        self.lost_system_clock
    }

    fn run_mode(&self) -> RunMode {
        match self.pmstat {
            pmstat::VLPR => RunMode::Vlpr,
            pmstat::HSRUN => RunMode::Hsrun,
            _ => RunMode::Run,
        }
    }

    fn ccr_mut(&mut self, mode: RunMode) -> &mut SysClkRegister {
        match mode {
            RunMode::Run => &mut self.rccr,
            RunMode::Vlpr => &mut self.vccr,
            RunMode::Hsrun => &mut self.hccr,
        }
    }

    fn ccr(&self, mode: RunMode) -> SysClkRegister {
        match mode {
            RunMode::Run => self.rccr,
            RunMode::Vlpr => self.vccr,
            RunMode::Hsrun => self.hccr,
        }
    }

    /// `xVLD` without consuming a settling poll
    fn valid_now(&self, source: ClockSource) -> bool {
        let s = &self.sources[source.index()];
        let input_ok = source != ClockSource::Spll || self.valid_now(ClockSource::Sosc);
        s.control.enable && !s.never_valid && s.settling.get() == 0 && input_ok
    }

    fn record(&mut self, event: Event) {
        self.events.push(event);
        self.writes += 1;
        let csr = self.csr.get();
        if let Some(src) = ClockSource::from_bits(csr.source) {
            if !self.sources[src.index()].control.enable {
                self.lost_system_clock = true;
            }
        }
        self.csr_samples.push(csr.source);
    }

    /// Load `SCG_CSR` from the current mode's control register if its source
    /// is valid
    fn follow_ccr(&mut self) {
        let reg = self.ccr(self.run_mode());
        let Some(src) = ClockSource::from_bits(reg.source) else {
            return;
        };
        if !self.valid_now(src) {
            return;
        }
        if self.switch_delay == 0 {
            self.csr.set(reg);
        } else {
            self.pending_csr.set(Some((reg, self.switch_delay)));
        }
    }
}

impl ScgAccess for Simulator {
    fn source_control(&self, source: ClockSource) -> SourceControl {
        self.sources[source.index()].control
    }

    fn source_valid(&self, source: ClockSource) -> bool {
        let s = &self.sources[source.index()];
        if s.control.enable && s.settling.get() > 0 {
            s.settling.set(s.settling.get() - 1);
            return false;
        }
        self.valid_now(source)
    }

    fn unlock_source(&mut self, source: ClockSource) {
        self.sources[source.index()].control.locked = false;
        self.record(Event::Unlock(source));
    }

    fn set_source_control(&mut self, source: ClockSource, control: SourceControl) {
        let s = &mut self.sources[source.index()];
        if !s.control.locked {
            if control.enable && !s.control.enable {
                s.settling.set(s.stabilize_after);
            }
            s.control = control;
        }
        self.record(Event::SourceControl(source, control));
    }

    fn set_source_params(&mut self, params: SourceParams) {
        let source = match params {
            SourceParams::Sirc { .. } => ClockSource::Sirc,
            SourceParams::Firc { .. } => ClockSource::Firc,
            SourceParams::Sosc { .. } => ClockSource::Sosc,
            SourceParams::Spll { .. } => ClockSource::Spll,
        };
        let s = &mut self.sources[source.index()];
        if !s.control.locked {
            s.params = params;
        }
        self.record(Event::SourceParams(params));
    }

    fn source_params(&self, source: ClockSource) -> SourceParams {
        self.sources[source.index()].params
    }

    fn set_async_dividers(&mut self, source: ClockSource, div1: u8, div2: u8) {
        self.sources[source.index()].dividers = (div1, div2);
        self.record(Event::AsyncDividers(source, div1, div2));
    }

    fn async_dividers(&self, source: ClockSource) -> (u8, u8) {
        self.sources[source.index()].dividers
    }

    fn system_clock_status(&self) -> SysClkRegister {
        if let Some((reg, polls)) = self.pending_csr.get() {
            if polls == 0 {
                self.csr.set(reg);
                self.pending_csr.set(None);
            } else {
                self.pending_csr.set(Some((reg, polls - 1)));
            }
        }
        self.csr.get()
    }

    fn system_clock_config(&self, mode: RunMode) -> SysClkRegister {
        self.ccr(mode)
    }

    fn set_system_clock_config(&mut self, mode: RunMode, value: SysClkRegister) {
        *self.ccr_mut(mode) = value;
        if mode == self.run_mode() {
            self.follow_ccr();
        }
        self.record(Event::SystemClock(mode, value));
    }

    fn scg_clkout_select(&self) -> u8 {
        self.scg_clkout
    }

    fn set_scg_clkout_select(&mut self, select: u8) {
        self.scg_clkout = select;
        self.record(Event::ScgClkOut(select));
    }
}

impl PccAccess for Simulator {
    fn pcc(&self, peripheral: Peripheral) -> PccRegister {
        self.pcc[index(peripheral)]
    }

    fn set_pcc_gate(&mut self, peripheral: Peripheral, enable: bool) {
        self.pcc[index(peripheral)].gate = enable;
        self.record(Event::PccGate(peripheral, enable));
    }

    fn set_pcc(&mut self, peripheral: Peripheral, value: PccRegister) {
        self.pcc[index(peripheral)] = value;
        self.record(Event::Pcc(peripheral, value));
    }
}

impl SimAccess for Simulator {
    fn platform_gate(&self, peripheral: Peripheral) -> bool {
        self.platform_gates[index(peripheral)]
    }

    fn set_platform_gate(&mut self, peripheral: Peripheral, enable: bool) {
        self.platform_gates[index(peripheral)] = enable;
        self.record(Event::PlatformGate(peripheral, enable));
    }

    fn lpo_clocks(&self) -> LpoClocks {
        self.lpo_clocks
    }

    fn set_lpo_clocks(&mut self, value: LpoClocks) {
        self.lpo_clocks = value;
        self.record(Event::LpoClocks(value));
    }

    fn clock_out(&self) -> ClockOutRegister {
        self.clock_out
    }

    fn set_clock_out(&mut self, value: ClockOutRegister) {
        self.clock_out = value;
        self.record(Event::ClockOut(value));
    }
}

impl PmcAccess for Simulator {
    fn lpo_enabled(&self) -> bool {
        self.lpo_enabled
    }

    fn set_lpo_enabled(&mut self, enable: bool) {
        self.lpo_enabled = enable;
        self.record(Event::PmcLpo(enable));
    }
}

impl SmcAccess for Simulator {
    fn power_mode_status(&self) -> u8 {
        self.pmstat
    }

    fn set_mode_protection(&mut self, allow_vlp: bool, allow_hsrun: bool) {
        self.allow_vlp = allow_vlp;
        self.allow_hsrun = allow_hsrun;
        self.record(Event::Protection { allow_vlp, allow_hsrun });
    }

    fn set_run_mode(&mut self, mode: RunMode) {
        let sirc_only = [ClockSource::Firc, ClockSource::Sosc, ClockSource::Spll]
            .iter()
            .all(|s| !self.sources[s.index()].control.enable)
            && self.csr.get().source == ClockSource::Sirc.bits();
        let next = match (self.run_mode(), mode) {
            (RunMode::Run, RunMode::Vlpr) if self.allow_vlp && sirc_only => Some(pmstat::VLPR),
            (RunMode::Run, RunMode::Hsrun) if self.allow_hsrun => Some(pmstat::HSRUN),
            (RunMode::Vlpr | RunMode::Hsrun, RunMode::Run) => Some(pmstat::RUN),
            _ => None,
        };
        if let Some(next) = next {
            self.pmstat = next;
            self.follow_ccr();
        }
        self.record(Event::RunMode(mode));
    }

    fn set_stop_mode(&mut self, mode: StopMode) {
        self.record(Event::StopMode(mode));
    }

    fn set_stop_option(&mut self, option: u8) {
        self.record(Event::StopOption(option));
    }

    fn wait_for_interrupt(&mut self, deep: bool, sleep_on_exit: bool) {
        self.record(Event::Sleep { deep, sleep_on_exit });
    }
}
