//! SCG clock sources, system clock transitions and named clock frequencies
//!
//! ```text
//!            ┌──────┐  ┌────────┐ sircdiv1/2
//!            │ SIRC │─┬▶│ DIV1/2 │─────────────▶ PCC, SIM
//!            └──────┘ │ └────────┘
//!            ┌──────┐ │ ┌────────┐ fircdiv1/2
//!            │ FIRC │─┼▶│ DIV1/2 │─────────────▶ PCC, SIM
//!            └──────┘ │ └────────┘
//!            ┌──────┐ │ ┌────────┐ soscdiv1/2
//!  EXTAL ───▶│ SOSC │─┼▶│ DIV1/2 │─────────────▶ PCC, SIM
//!            └──┬───┘ │ └────────┘
//!               ▼     │ ┌────────┐ splldiv1/2
//!            ┌──────┐ ├▶│ DIV1/2 │─────────────▶ PCC, SIM
//!            │ SPLL │─┤ └────────┘
//!            └──────┘ │   ┌─────┐  ┌─────────────────────┐ core, bus, slow
//!                     └──▶│ SCS │─▶│ DIVCORE/DIVBUS/SLOW │─────────────────▶
//!                         └─────┘  └─────────────────────┘
//!                            ▲
//!                   RCCR / VCCR / HCCR
//! ```
//!
//! [`Clocks`] is the only thing allowed to change which source drives the
//! system clocks. It never leaves them undriven: a source that currently
//! drives them is reconfigured by first moving to a temporary source, then
//! switching back.

use paste::paste;

use config::{
    ClockOutSelect, ClockSource, ClockUserConfig, LpoSelect, RtcSelect, ScgClockOutSelect, SourceConfig,
    SystemClockConfig,
};
use periph::Peripheral;

use crate::chip::Chip;
use crate::hw::{pmstat, ClockOutRegister, Hardware, LpoClocks, RunMode, SourceControl, SourceParams, SysClkRegister};
use crate::{poll_until, Error};

pub mod config;
pub mod manager;
pub mod periph;

/// Every clock whose frequency can be queried with [`Clocks::frequency`]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockName {
    /// Core (system) clock
    Core,
    /// Bus clock
    Bus,
    /// Slow (flash) clock
    Slow,
    /// Slow IRC
    Sirc,
    /// Fast IRC
    Firc,
    /// System oscillator
    Sosc,
    /// System PLL
    Spll,
    /// SIRCDIV1
    SircDiv1,
    /// SIRCDIV2
    SircDiv2,
    /// FIRCDIV1
    FircDiv1,
    /// FIRCDIV2
    FircDiv2,
    /// SOSCDIV1
    SoscDiv1,
    /// SOSCDIV2
    SoscDiv2,
    /// SPLLDIV1
    SpllDiv1,
    /// SPLLDIV2
    SpllDiv2,
    /// SCG clock out
    ScgClkOut,
    /// CLKOUT pin
    ClkOut,
    /// 128 kHz LPO
    Lpo128k,
    /// 32 kHz LPO
    Lpo32k,
    /// 1 kHz LPO
    Lpo1k,
    /// Selected LPO clock
    LpoClk,
    /// Selected RTC clock
    RtcClk,
    /// A peripheral's functional clock, or its interface clock if it has no
    /// selectable functional clock
    Peripheral(Peripheral),
}

/// Dividers used while parked on a temporary source
const fn temporary_config(source: ClockSource) -> SystemClockConfig {
    match source {
        ClockSource::Sirc => SystemClockConfig::new(ClockSource::Sirc, 1, 1, 2),
        ClockSource::Firc => SystemClockConfig::new(ClockSource::Firc, 1, 1, 2),
        ClockSource::Sosc => SystemClockConfig::new(ClockSource::Sosc, 1, 2, 2),
        ClockSource::Spll => SystemClockConfig::new(ClockSource::Spll, 2, 2, 4),
    }
}

fn encode(config: &SystemClockConfig) -> SysClkRegister {
    SysClkRegister {
        source: config.source.bits(),
        div_core: config.div_core - 1,
        div_bus: config.div_bus - 1,
        div_slow: config.div_slow - 1,
    }
}

/// Whether `driving` stops when `source` does. SPLL runs off SOSC.
fn feeds(source: ClockSource, driving: ClockSource) -> bool {
    source == driving || (source == ClockSource::Sosc && driving == ClockSource::Spll)
}

/// SPLL output from its reference and the raw `PREDIV`/`MULT` fields
fn spll_output(sosc: u32, prediv: u8, mult: u8) -> u32 {
    let vco = sosc as u64 / (prediv as u64 + 1) * (mult as u64 + 16);
    u32::try_from(vco / 2).unwrap_or(u32::MAX)
}

fn decode(reg: SysClkRegister) -> Option<SystemClockConfig> {
    Some(SystemClockConfig {
        source: ClockSource::from_bits(reg.source)?,
        div_core: reg.div_core + 1,
        div_bus: reg.div_bus + 1,
        div_slow: reg.div_slow + 1,
    })
}

/// The clock driver context.
///
/// Exactly one of these should exist per device. It owns the register access
/// and the few frequencies that can't be read back from hardware (the SOSC
/// reference and the RTC_CLKIN pin).
pub struct Clocks<H> {
    hw: H,
    chip: Chip,
    sosc_freq: u32,
    rtc_clkin_freq: u32,
}

macro_rules! source_frequency_accessors {
    ($($source:ident),*) => {
        paste! {
            $(
                #[doc = "Output frequency of " $source ", 0 when it isn't running"]
                pub fn [<$source:lower _frequency>](&self) -> u32 {
                    self.source_frequency(ClockSource::$source)
                }
            )*
        }
    };
}

impl<H: Hardware> Clocks<H> {
    /// Take over the clock hardware of `chip`
    pub fn new(hw: H, chip: Chip) -> Self {
        Self {
            hw,
            chip,
            sosc_freq: 0,
            rtc_clkin_freq: 0,
        }
    }

    /// The variant descriptor this driver was built with
    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    /// Register access
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable register access
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    source_frequency_accessors!(Sirc, Firc, Sosc, Spll);

    /// Output frequency of `source`, 0 if it isn't valid yet or doesn't exist
    pub fn source_frequency(&self, source: ClockSource) -> u32 {
        if !self.chip.has_source(source) || !self.hw.source_valid(source) {
            return 0;
        }
        match (source, self.hw.source_params(source)) {
            (ClockSource::Sirc, SourceParams::Sirc { range: 0 }) => 2_000_000,
            (ClockSource::Sirc, _) => 8_000_000,
            (ClockSource::Firc, _) => 48_000_000,
            (ClockSource::Sosc, _) => self.sosc_freq,
            (ClockSource::Spll, SourceParams::Spll { prediv, mult }) => {
                spll_output(self.source_frequency(ClockSource::Sosc), prediv, mult)
            }
            (ClockSource::Spll, _) => 0,
        }
    }

    /// `xDIV1` and `xDIV2` output frequencies of `source`
    pub(crate) fn async_frequencies(&self, source: ClockSource) -> (u32, u32) {
        let freq = self.source_frequency(source);
        let (div1, div2) = self.hw.async_dividers(source);
        let apply = |code: u8| match config::AsyncDivider::from_bits(code).divisor() {
            Some(divisor) => freq / divisor,
            None => 0,
        };
        (apply(div1), apply(div2))
    }

    /// Core, bus and slow frequencies from `SCG_CSR`
    pub(crate) fn system_frequencies(&self) -> Result<(u32, u32, u32), Error> {
        let current = self.current_system_clock()?;
        Ok(current.frequencies(self.source_frequency(current.source)))
    }

    /// Frequency of a named clock.
    ///
    /// Clocks that exist but are switched off report [`Error::GatedOff`] only
    /// where a gate sits in front of them (peripherals, platform gates).
    /// Disabled sources, dividers and outputs report `Ok(0)`.
    pub fn frequency(&self, name: ClockName) -> Result<u32, Error> {
        let needs_spll = matches!(name, ClockName::Spll | ClockName::SpllDiv1 | ClockName::SpllDiv2);
        if needs_spll && !self.chip.has_source(ClockSource::Spll) {
            return Err(Error::Unsupported);
        }

        let freq = match name {
            ClockName::Core => self.system_frequencies()?.0,
            ClockName::Bus => self.system_frequencies()?.1,
            ClockName::Slow => self.system_frequencies()?.2,
            ClockName::Sirc => self.source_frequency(ClockSource::Sirc),
            ClockName::Firc => self.source_frequency(ClockSource::Firc),
            ClockName::Sosc => self.source_frequency(ClockSource::Sosc),
            ClockName::Spll => self.source_frequency(ClockSource::Spll),
            ClockName::SircDiv1 => self.async_frequencies(ClockSource::Sirc).0,
            ClockName::SircDiv2 => self.async_frequencies(ClockSource::Sirc).1,
            ClockName::FircDiv1 => self.async_frequencies(ClockSource::Firc).0,
            ClockName::FircDiv2 => self.async_frequencies(ClockSource::Firc).1,
            ClockName::SoscDiv1 => self.async_frequencies(ClockSource::Sosc).0,
            ClockName::SoscDiv2 => self.async_frequencies(ClockSource::Sosc).1,
            ClockName::SpllDiv1 => self.async_frequencies(ClockSource::Spll).0,
            ClockName::SpllDiv2 => self.async_frequencies(ClockSource::Spll).1,
            ClockName::ScgClkOut => self.scg_clkout_frequency()?,
            ClockName::ClkOut => self.clkout_frequency()?,
            ClockName::Lpo128k => self.lpo128k_frequency(),
            ClockName::Lpo32k => self.lpo_frequencies().0,
            ClockName::Lpo1k => self.lpo_frequencies().1,
            ClockName::LpoClk => self.lpo_clk_frequency(),
            ClockName::RtcClk => self.rtc_clk_frequency(),
            ClockName::Peripheral(p) => self.peripheral_frequency(p)?,
        };
        Ok(freq)
    }

    fn scg_clkout_frequency(&self) -> Result<u32, Error> {
        let freq = match ScgClockOutSelect::from_bits(self.hw.scg_clkout_select()) {
            Some(ScgClockOutSelect::Slow) => self.system_frequencies()?.2,
            Some(ScgClockOutSelect::Sosc) => self.source_frequency(ClockSource::Sosc),
            Some(ScgClockOutSelect::Sirc) => self.source_frequency(ClockSource::Sirc),
            Some(ScgClockOutSelect::Firc) => self.source_frequency(ClockSource::Firc),
            Some(ScgClockOutSelect::Spll) => self.source_frequency(ClockSource::Spll),
            None => 0,
        };
        Ok(freq)
    }

    fn clkout_frequency(&self) -> Result<u32, Error> {
        let reg = self.hw.clock_out();
        if !reg.enable {
            return Ok(0);
        }
        let input = match ClockOutSelect::from_bits(reg.select) {
            Some(ClockOutSelect::ScgClkOut) => self.scg_clkout_frequency()?,
            Some(ClockOutSelect::SoscDiv2) => self.async_frequencies(ClockSource::Sosc).1,
            Some(ClockOutSelect::SircDiv2) => self.async_frequencies(ClockSource::Sirc).1,
            Some(ClockOutSelect::FircDiv2) => self.async_frequencies(ClockSource::Firc).1,
            Some(ClockOutSelect::Hclk) => self.system_frequencies()?.0,
            Some(ClockOutSelect::SpllDiv2) => self.async_frequencies(ClockSource::Spll).1,
            Some(ClockOutSelect::BusClk) => self.system_frequencies()?.1,
            Some(ClockOutSelect::Lpo128k) => self.lpo128k_frequency(),
            Some(ClockOutSelect::LpoClk) => self.lpo_clk_frequency(),
            Some(ClockOutSelect::RtcClk) => self.rtc_clk_frequency(),
            None => 0,
        };
        Ok(input / (reg.div as u32 + 1))
    }

    fn lpo128k_frequency(&self) -> u32 {
        if self.hw.lpo_enabled() {
            self.chip.lpo_freq
        } else {
            0
        }
    }

    /// 32 kHz and 1 kHz LPO outputs
    fn lpo_frequencies(&self) -> (u32, u32) {
        let lpo = self.lpo128k_frequency();
        let sel = self.hw.lpo_clocks();
        let lpo32k = if sel.lpo32k { lpo / 4 } else { 0 };
        let lpo1k = if sel.lpo1k { lpo / 128 } else { 0 };
        (lpo32k, lpo1k)
    }

    fn lpo_clk_frequency(&self) -> u32 {
        let (lpo32k, lpo1k) = self.lpo_frequencies();
        match self.hw.lpo_clocks().select {
            s if s == LpoSelect::Lpo128k as u8 => self.lpo128k_frequency(),
            s if s == LpoSelect::Lpo32k as u8 => lpo32k,
            s if s == LpoSelect::Lpo1k as u8 => lpo1k,
            _ => 0,
        }
    }

    fn rtc_clk_frequency(&self) -> u32 {
        match self.hw.lpo_clocks().rtc_select {
            s if s == RtcSelect::SoscDiv1 as u8 => self.async_frequencies(ClockSource::Sosc).0,
            s if s == RtcSelect::Lpo32k as u8 => self.lpo_frequencies().0,
            s if s == RtcSelect::RtcClkIn as u8 => self.rtc_clkin_freq,
            _ => self.async_frequencies(ClockSource::Firc).0,
        }
    }

    /// Run mode the chip is in, from `SMC_PMSTAT`
    pub fn current_run_mode(&self) -> RunMode {
        match self.hw.power_mode_status() {
            pmstat::HSRUN => RunMode::Hsrun,
            pmstat::VLPR => RunMode::Vlpr,
            _ => RunMode::Run,
        }
    }

    /// The configuration actually driving the system clocks
    pub fn current_system_clock(&self) -> Result<SystemClockConfig, Error> {
        decode(self.hw.system_clock_status()).ok_or(Error::bad_config("SCG_CSR holds an invalid source"))
    }

    /// The configuration stored for `mode`, `None` if the register holds an
    /// invalid source
    pub fn system_clock_config(&self, mode: RunMode) -> Option<SystemClockConfig> {
        decode(self.hw.system_clock_config(mode))
    }

    fn driving_source(&self) -> Result<ClockSource, Error> {
        Ok(self.current_system_clock()?.source)
    }

    /// Check `config` against the ceilings of `mode`. A stopped source passes
    /// unless `require_running` is set.
    pub(crate) fn check_ceiling(
        &self,
        mode: RunMode,
        config: &SystemClockConfig,
        require_running: bool,
    ) -> Result<(), Error> {
        let freq = self.source_frequency(config.source);
        self.check_ceiling_at(mode, config, freq, require_running)
    }

    /// [`check_ceiling`](Self::check_ceiling) with `config.source` running at
    /// `freq`
    fn check_ceiling_at(
        &self,
        mode: RunMode,
        config: &SystemClockConfig,
        freq: u32,
        require_running: bool,
    ) -> Result<(), Error> {
        if !config.dividers_in_range() {
            return Err(Error::bad_config("system clock divider out of range"));
        }
        if !self.chip.has_source(config.source) {
            return Err(Error::Unsupported);
        }
        let ceiling = self.chip.ceiling(mode, config.source);
        if !ceiling.allowed() {
            warn!("{:?} can't drive the system clocks in {:?}", config.source, mode);
            return Err(Error::bad_config("source not allowed in this run mode"));
        }

        let freq = freq as u64;
        if freq == 0 {
            return if require_running {
                Err(Error::bad_config("system clock source isn't running"))
            } else {
                Ok(())
            };
        }

        let core = freq / config.div_core as u64;
        let bus = freq / (config.div_core as u64 * config.div_bus as u64);
        let slow = freq / (config.div_core as u64 * config.div_slow as u64);
        if core > ceiling.core as u64 || bus > ceiling.bus as u64 || slow > ceiling.slow as u64 {
            warn!(
                "{:?} /{} /{} /{} exceeds the {:?} ceilings",
                config.source,
                config.div_core,
                config.div_bus,
                config.div_slow,
                mode
            );
            return Err(Error::bad_config("system clock exceeds the run mode ceiling"));
        }
        Ok(())
    }

    /// Switch the system clocks of the current run mode to `config` and wait
    /// until `SCG_CSR` reports the new source.
    ///
    /// Nothing is written if `config` fails validation. A timeout leaves the
    /// hardware mid-switch; there is no way to undo it.
    pub fn switch_to(&mut self, config: &SystemClockConfig) -> Result<(), Error> {
        let mode = self.current_run_mode();
        self.check_ceiling(mode, config, true)?;

        debug!(
            "system clock -> {:?} /{} /{} /{} in {:?}",
            config.source,
            config.div_core,
            config.div_bus,
            config.div_slow,
            mode
        );
        self.hw.set_system_clock_config(mode, encode(config));

        let hw = &self.hw;
        poll_until(self.chip.sysclk_poll_budget, || {
            hw.system_clock_status().source == config.source.bits()
        })
        .inspect_err(|_| warn!("timed out switching the system clock to {:?}", config.source))
    }

    /// Set the system clock configuration of `mode`.
    ///
    /// `None` for `mode` means the current run mode, `None` for `config` means
    /// that mode's default. The current mode's configuration is switched to
    /// right away. Any other mode's configuration is validated and stored, and
    /// takes effect when the chip enters that mode.
    pub fn set_system_clock(&mut self, mode: Option<RunMode>, config: Option<&SystemClockConfig>) -> Result<(), Error> {
        let current = self.current_run_mode();
        let mode = mode.unwrap_or(current);
        if mode == RunMode::Hsrun && !self.chip.has_hsrun {
            return Err(Error::Unsupported);
        }

        let config = match config {
            Some(config) => *config,
            None => self.default_system_clock(mode),
        };

        if mode == current {
            self.switch_to(&config)
        } else {
            self.check_ceiling(mode, &config, false)?;
            trace!("stored {:?} system clock {:?}", mode, config.source);
            self.hw.set_system_clock_config(mode, encode(&config));
            Ok(())
        }
    }

    /// Reset-safe system clock configuration of `mode`
    pub fn default_system_clock(&self, mode: RunMode) -> SystemClockConfig {
        match mode {
            RunMode::Run => SystemClockConfig::new(ClockSource::Firc, 1, 2, 2),
            RunMode::Vlpr => SystemClockConfig::new(ClockSource::Sirc, 2, 1, 4),
            RunMode::Hsrun if self.chip.has_spll => SystemClockConfig::new(ClockSource::Spll, 1, 2, 4),
            RunMode::Hsrun => SystemClockConfig::new(ClockSource::Firc, 1, 2, 4),
        }
    }

    /// Enable, disable or reconfigure one clock source.
    ///
    /// `None` applies the source's reset defaults. Disabling the source that
    /// drives the system clocks, or SOSC while SPLL drives them, is refused
    /// with [`Error::Busy`]. Reconfiguring either parks the system clocks on a
    /// temporary source meanwhile.
    pub fn set_clock_source(&mut self, source: ClockSource, config: Option<&SourceConfig>) -> Result<(), Error> {
        if !self.chip.has_source(source) {
            return Err(Error::Unsupported);
        }
        let config = match config {
            Some(config) if config.source() != source => {
                return Err(Error::bad_config("config is for a different source"));
            }
            Some(config) => *config,
            None => SourceConfig::default_for(source),
        };
        validate_source_config(&config)?;

        let saved = self.current_system_clock()?;
        if !feeds(source, saved.source) {
            return self.configure_source(&config);
        }
        if !config.enable() {
            warn!("{:?} drives the system clocks, not disabling it", source);
            return Err(Error::Busy);
        }

        self.transition_to_temporary_source(&[source, saved.source])?;
        self.configure_source(&config)?;
        if saved.source != source {
            self.wait_valid(saved.source)?;
        }
        self.switch_to(&saved)
    }

    /// Move the system clocks to the first running source in order SPLL,
    /// FIRC, SOSC, SIRC that isn't in `avoid`, using fixed safe dividers.
    pub fn transition_to_temporary_source(&mut self, avoid: &[ClockSource]) -> Result<ClockSource, Error> {
        for source in ClockSource::TEMPORARY_PREFERENCE {
            if avoid.contains(&source) || self.source_frequency(source) == 0 {
                continue;
            }
            match self.switch_to(&temporary_config(source)) {
                Ok(()) => {
                    info!("system clock parked on {:?}", source);
                    return Ok(source);
                }
                Err(Error::BadConfiguration { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        warn!("no temporary system clock source available");
        Err(Error::bad_config("no temporary system clock source available"))
    }

    /// Program a source that doesn't drive the system clocks
    fn configure_source(&mut self, config: &SourceConfig) -> Result<(), Error> {
        let source = config.source();
        if feeds(source, self.driving_source()?) {
            return Err(Error::Busy);
        }

        self.hw.unlock_source(source);
        self.hw.set_source_control(source, SourceControl::default());
        if !config.enable() {
            debug!("{:?} disabled", source);
            return Ok(());
        }

        let control = match *config {
            SourceConfig::Sirc(c) => {
                self.hw.set_async_dividers(source, c.div1.bits(), c.div2.bits());
                self.hw.set_source_params(SourceParams::Sirc { range: c.range as u8 });
                SourceControl {
                    enable: true,
                    enable_in_stop: c.enable_in_stop,
                    enable_in_low_power: c.enable_in_low_power,
                    locked: c.locked,
                    ..SourceControl::default()
                }
            }
            SourceConfig::Firc(c) => {
                self.hw.set_async_dividers(source, c.div1.bits(), c.div2.bits());
                self.hw.set_source_params(SourceParams::Firc { range: c.range as u8 });
                SourceControl {
                    enable: true,
                    regulator: c.regulator,
                    locked: c.locked,
                    ..SourceControl::default()
                }
            }
            SourceConfig::Sosc(c) => {
                self.sosc_freq = c.freq;
                self.hw.set_async_dividers(source, c.div1.bits(), c.div2.bits());
                self.hw.set_source_params(SourceParams::Sosc {
                    range: c.range as u8,
                    high_gain: c.gain == config::SoscGain::High,
                    crystal: c.reference == config::SoscReference::Crystal,
                });
                SourceControl {
                    enable: true,
                    enable_in_stop: c.enable_in_stop,
                    enable_in_low_power: c.enable_in_low_power,
                    monitor: c.monitor != config::MonitorMode::Disabled,
                    monitor_reset: c.monitor == config::MonitorMode::Reset,
                    locked: c.locked,
                    ..SourceControl::default()
                }
            }
            SourceConfig::Spll(c) => {
                self.hw.set_async_dividers(source, c.div1.bits(), c.div2.bits());
                self.hw.set_source_params(SourceParams::Spll {
                    prediv: c.prediv - 1,
                    mult: c.mult - 16,
                });
                SourceControl {
                    enable: true,
                    monitor: c.monitor != config::MonitorMode::Disabled,
                    monitor_reset: c.monitor == config::MonitorMode::Reset,
                    locked: c.locked,
                    ..SourceControl::default()
                }
            }
        };
        self.hw.set_source_control(source, control);
        self.wait_valid(source)
    }

    fn wait_valid(&self, source: ClockSource) -> Result<(), Error> {
        let hw = &self.hw;
        poll_until(self.chip.stabilization_budget(source), || hw.source_valid(source))
            .inspect(|_| debug!("{:?} valid", source))
            .inspect_err(|_| warn!("{:?} didn't stabilize", source))
    }

    /// Whether `source` is enabled, regardless of whether it's valid yet
    pub fn source_enabled(&self, source: ClockSource) -> bool {
        self.chip.has_source(source) && self.hw.source_enabled(source)
    }

    /// Clear the enable bit of `source` without touching its configuration
    pub(crate) fn disable_source(&mut self, source: ClockSource) -> Result<(), Error> {
        if feeds(source, self.driving_source()?) {
            return Err(Error::Busy);
        }
        let control = self.hw.source_control(source);
        self.hw.unlock_source(source);
        self.hw.set_source_control(
            source,
            SourceControl {
                enable: false,
                ..control
            },
        );
        debug!("{:?} gated off", source);
        Ok(())
    }

    /// Set the enable bit of `source` again and wait for it to stabilize
    pub(crate) fn enable_source(&mut self, source: ClockSource) -> Result<(), Error> {
        let control = self.hw.source_control(source);
        self.hw.unlock_source(source);
        self.hw.set_source_control(
            source,
            SourceControl {
                enable: true,
                ..control
            },
        );
        self.wait_valid(source)
    }

    /// Apply a whole clock tree: sources, system clocks of every run mode, SIM
    /// clock selection, peripheral routing and the PMC LPO.
    pub fn apply(&mut self, config: &ClockUserConfig<'_>) -> Result<(), Error> {
        let internal = [config.sirc.map(SourceConfig::Sirc), config.firc.map(SourceConfig::Firc)];
        let external = [
            config.sosc.map(SourceConfig::Sosc),
            config.spll.filter(|_| self.chip.has_spll).map(SourceConfig::Spll),
        ];
        for source in internal.iter().chain(&external).flatten() {
            validate_source_config(source)?;
        }

        // Every system clock config is checked against the tree it will run
        // on before anything is written
        let mode = self.current_run_mode();
        let projected = |c: &SystemClockConfig| self.projected_frequency(config, c.source);
        if mode == RunMode::Run {
            self.check_ceiling_at(RunMode::Run, &config.run, projected(&config.run), true)?;
        }
        if mode != RunMode::Vlpr {
            self.check_ceiling_at(RunMode::Vlpr, &config.vlpr, projected(&config.vlpr), false)?;
        }
        if let Some(hsrun) = config.hsrun.filter(|_| self.chip.has_hsrun && mode != RunMode::Hsrun) {
            self.check_ceiling_at(RunMode::Hsrun, &hsrun, projected(&hsrun), false)?;
        }

        // Reprogram the driving source last so it has somewhere to park
        let driving = self.driving_source()?;
        let enabled_internal = internal.iter().flatten().filter(|c| c.enable());
        for source in enabled_internal.clone().filter(|c| c.source() != driving) {
            self.set_clock_source(source.source(), Some(source))?;
        }

        // SPLL runs off SOSC, so both are reprogrammed off an internal source
        let externals = [ClockSource::Sosc, ClockSource::Spll];
        if external.iter().flatten().any(|c| c.enable()) {
            if externals.contains(&self.driving_source()?) {
                self.transition_to_temporary_source(&externals)?;
            }
            for source in external.iter().flatten().filter(|c| c.enable()) {
                self.configure_source(source)?;
            }
        }

        for source in enabled_internal.filter(|c| c.source() == driving) {
            self.set_clock_source(source.source(), Some(source))?;
        }

        if self.current_run_mode() != RunMode::Vlpr {
            self.set_system_clock(Some(RunMode::Vlpr), Some(&config.vlpr))?;
        }
        if let Some(hsrun) = config.hsrun.filter(|_| self.chip.has_hsrun) {
            if self.current_run_mode() != RunMode::Hsrun {
                self.set_system_clock(Some(RunMode::Hsrun), Some(&hsrun))?;
            }
        }
        if self.current_run_mode() == RunMode::Run {
            self.switch_to(&config.run)?;
        }
        for source in internal.iter().chain(&external).flatten().filter(|c| !c.enable()) {
            self.set_clock_source(source.source(), Some(source))?;
        }

        self.rtc_clkin_freq = config.lpo.rtc_clkin_freq;
        self.hw.set_scg_clkout_select(config.clock_out.scg_select as u8);
        self.hw.set_clock_out(ClockOutRegister {
            enable: config.clock_out.enable,
            select: config.clock_out.select as u8,
            div: config.clock_out.div.clamp(1, 8) - 1,
        });
        self.hw.set_lpo_clocks(LpoClocks {
            lpo1k: config.lpo.lpo1k,
            lpo32k: config.lpo.lpo32k,
            select: config.lpo.select as u8,
            rtc_select: config.lpo.rtc_select as u8,
        });

        for binding in config.peripherals {
            self.set_module_clock(binding.peripheral, Some(&binding.config));
        }

        self.hw.set_lpo_enabled(config.lpo.enable);
        info!("clock tree applied, core {:?} Hz", self.system_frequencies().map(|f| f.0));
        Ok(())
    }

    /// Frequency `source` will run at once the sources of `config` are
    /// programmed
    fn projected_frequency(&self, config: &ClockUserConfig<'_>, source: ClockSource) -> u32 {
        let requested = match source {
            ClockSource::Sirc => config.sirc.map(SourceConfig::Sirc),
            ClockSource::Firc => config.firc.map(SourceConfig::Firc),
            ClockSource::Sosc => config.sosc.map(SourceConfig::Sosc),
            ClockSource::Spll => config.spll.filter(|_| self.chip.has_spll).map(SourceConfig::Spll),
        };
        match requested {
            Some(c) if !c.enable() => 0,
            Some(SourceConfig::Sirc(c)) => c.range.freq(),
            Some(SourceConfig::Firc(c)) => c.range.freq(),
            Some(SourceConfig::Sosc(c)) => c.freq,
            Some(SourceConfig::Spll(c)) => {
                spll_output(self.projected_frequency(config, ClockSource::Sosc), c.prediv - 1, c.mult - 16)
            }
            None => self.source_frequency(source),
        }
    }
}

const SOSC_MIN_FREQ: u32 = 4_000_000;
const SOSC_MAX_FREQ: u32 = 40_000_000;

fn validate_source_config(config: &SourceConfig) -> Result<(), Error> {
    match config {
        SourceConfig::Spll(c) if c.enable && !(1..=8).contains(&c.prediv) => {
            Err(Error::bad_config("SPLL prediv out of range"))
        }
        SourceConfig::Spll(c) if c.enable && !(16..=47).contains(&c.mult) => {
            Err(Error::bad_config("SPLL mult out of range"))
        }
        SourceConfig::Sosc(c) if c.enable && !(SOSC_MIN_FREQ..=SOSC_MAX_FREQ).contains(&c.freq) => {
            Err(Error::bad_config("SOSC reference frequency out of range"))
        }
        _ => Ok(()),
    }
}
