//! Clock configuration types
//!
//! Every type in here is plain data. Nothing touches the hardware until it is
//! handed to [`Clocks`](super::Clocks) or the [`ClockManager`](super::manager::ClockManager).

use super::periph::{ModuleClockConfig, Peripheral};

/// The four SCG clock sources.
///
/// Discriminants are the SCG "system clock source" (`SCS`) codes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    /// System oscillator, fed by a crystal or an external reference
    Sosc = 1,
    /// Slow internal reference clock, 2 or 8 MHz
    Sirc = 2,
    /// Fast internal reference clock, 48 MHz
    Firc = 3,
    /// System PLL, fed by the system oscillator
    Spll = 6,
}

impl ClockSource {
    /// All sources, in table order
    pub const ALL: [ClockSource; 4] = [ClockSource::Sirc, ClockSource::Firc, ClockSource::Sosc, ClockSource::Spll];

    /// Order in which a temporary system clock source is picked while the
    /// active one is reconfigured
    pub(crate) const TEMPORARY_PREFERENCE: [ClockSource; 4] =
        [ClockSource::Spll, ClockSource::Firc, ClockSource::Sosc, ClockSource::Sirc];

    /// Position of this source in per-source tables
    pub(crate) const fn index(self) -> usize {
        match self {
            ClockSource::Sirc => 0,
            ClockSource::Firc => 1,
            ClockSource::Sosc => 2,
            ClockSource::Spll => 3,
        }
    }

    /// Decode a `SCS` field. `None` for the reserved/invalid codes.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(ClockSource::Sosc),
            2 => Some(ClockSource::Sirc),
            3 => Some(ClockSource::Firc),
            6 => Some(ClockSource::Spll),
            _ => None,
        }
    }

    /// The `SCS` field value for this source
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Asynchronous (`xDIV1`/`xDIV2`) divider of a clock source.
///
/// ```text
///              ┌──────────┐ xDIV1_CLK
///         ┌───▶│ /1../64  │──────────▶
///  source │    └──────────┘
///  ───────┤          ▲ xDIV1[2:0]
///         │    ┌──────────┐ xDIV2_CLK
///         └───▶│ /1../64  │──────────▶
///              └──────────┘
///                    ▲ xDIV2[2:0]
/// ```
///
/// Discriminants are the 3-bit hardware codes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AsyncDivider {
    /// Output disabled
    #[default]
    Disabled = 0,
    /// Divide by 1
    Div1 = 1,
    /// Divide by 2
    Div2 = 2,
    /// Divide by 4
    Div4 = 3,
    /// Divide by 8
    Div8 = 4,
    /// Divide by 16
    Div16 = 5,
    /// Divide by 32
    Div32 = 6,
    /// Divide by 64
    Div64 = 7,
}

impl AsyncDivider {
    /// Map a normalized "divide by N" request onto a divider.
    ///
    /// Powers of two from 1 to 64 map to the matching divider. Anything else,
    /// including 0, silently maps to [`AsyncDivider::Disabled`].
    pub const fn from_divisor(n: u32) -> Self {
        match n {
            1 => AsyncDivider::Div1,
            2 => AsyncDivider::Div2,
            4 => AsyncDivider::Div4,
            8 => AsyncDivider::Div8,
            16 => AsyncDivider::Div16,
            32 => AsyncDivider::Div32,
            64 => AsyncDivider::Div64,
            _ => AsyncDivider::Disabled,
        }
    }

    /// Decode a 3-bit divider field
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            1 => AsyncDivider::Div1,
            2 => AsyncDivider::Div2,
            3 => AsyncDivider::Div4,
            4 => AsyncDivider::Div8,
            5 => AsyncDivider::Div16,
            6 => AsyncDivider::Div32,
            7 => AsyncDivider::Div64,
            _ => AsyncDivider::Disabled,
        }
    }

    /// The 3-bit divider field value
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// The divisor, or `None` if the output is disabled
    pub const fn divisor(self) -> Option<u32> {
        match self {
            AsyncDivider::Disabled => None,
            _ => Some(1 << (self as u32 - 1)),
        }
    }
}

/// `SIRCCFG[RANGE]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SircRange {
    /// 2 MHz
    Low = 0,
    /// 8 MHz
    #[default]
    High = 1,
}

impl SircRange {
    /// Output frequency for this range
    pub const fn freq(self) -> u32 {
        match self {
            SircRange::Low => 2_000_000,
            SircRange::High => 8_000_000,
        }
    }
}

/// `FIRCCFG[RANGE]`, only the 48 MHz trim exists
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FircRange {
    /// 48 MHz
    #[default]
    Mhz48 = 0,
}

impl FircRange {
    /// Output frequency for this range
    pub const fn freq(self) -> u32 {
        48_000_000
    }
}

/// `SOSCCFG[RANGE]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SoscRange {
    /// 1 MHz to 8 MHz
    Medium = 2,
    /// 8 MHz to 40 MHz
    #[default]
    High = 3,
}

/// Where the system oscillator gets its reference
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SoscReference {
    /// External reference clock on EXTAL
    External,
    /// Crystal between EXTAL and XTAL
    #[default]
    Crystal,
}

/// `SOSCCFG[HGO]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SoscGain {
    /// Low power operation
    #[default]
    Low,
    /// High gain operation
    High,
}

/// Clock monitor behavior for SOSC and SPLL
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorMode {
    /// Monitor disabled
    #[default]
    Disabled,
    /// Loss of clock raises an interrupt
    Interrupt,
    /// Loss of clock resets the chip
    Reset,
}

/// Slow IRC configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SircConfig {
    /// Enable the source. `false` disables it.
    pub enable: bool,
    /// Frequency range
    pub range: SircRange,
    /// `SIRCDIV1` output divider
    pub div1: AsyncDivider,
    /// `SIRCDIV2` output divider
    pub div2: AsyncDivider,
    /// Keep running in STOP modes
    pub enable_in_stop: bool,
    /// Keep running in VLP modes
    pub enable_in_low_power: bool,
    /// Lock the control register after configuration
    pub locked: bool,
}

impl Default for SircConfig {
    fn default() -> Self {
        Self {
            enable: true,
            range: SircRange::High,
            div1: AsyncDivider::Div1,
            div2: AsyncDivider::Div1,
            enable_in_stop: false,
            enable_in_low_power: true,
            locked: false,
        }
    }
}

/// Fast IRC configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FircConfig {
    /// Enable the source. `false` disables it.
    pub enable: bool,
    /// Frequency range
    pub range: FircRange,
    /// `FIRCDIV1` output divider
    pub div1: AsyncDivider,
    /// `FIRCDIV2` output divider
    pub div2: AsyncDivider,
    /// Keep the FIRC regulator enabled
    pub regulator: bool,
    /// Lock the control register after configuration
    pub locked: bool,
}

impl Default for FircConfig {
    fn default() -> Self {
        Self {
            enable: true,
            range: FircRange::Mhz48,
            div1: AsyncDivider::Div1,
            div2: AsyncDivider::Div1,
            regulator: true,
            locked: false,
        }
    }
}

/// ```text
///             ┌───────────┐
///  EXTAL ────▶│System     │ sosc_clk
///   XTAL ────▶│oscillator │─────────▶
///             └───────────┘
///                   ▲
///                   │
///         SOSCCFG[EREFS,HGO,RANGE]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoscConfig {
    /// Enable the source. `false` disables it.
    pub enable: bool,
    /// Frequency of the crystal or external reference, in Hz
    pub freq: u32,
    /// Crystal or external reference
    pub reference: SoscReference,
    /// Oscillator gain
    pub gain: SoscGain,
    /// Frequency range
    pub range: SoscRange,
    /// Clock monitor
    pub monitor: MonitorMode,
    /// `SOSCDIV1` output divider
    pub div1: AsyncDivider,
    /// `SOSCDIV2` output divider
    pub div2: AsyncDivider,
    /// Keep running in STOP modes
    pub enable_in_stop: bool,
    /// Keep running in VLP modes
    pub enable_in_low_power: bool,
    /// Lock the control register after configuration
    pub locked: bool,
}

impl Default for SoscConfig {
    fn default() -> Self {
        Self {
            enable: true,
            freq: 8_000_000,
            reference: SoscReference::Crystal,
            gain: SoscGain::Low,
            range: SoscRange::High,
            monitor: MonitorMode::Disabled,
            div1: AsyncDivider::Div1,
            div2: AsyncDivider::Div1,
            enable_in_stop: false,
            enable_in_low_power: false,
            locked: false,
        }
    }
}

/// ```text
///             ┌──────────┐   ┌──────────┐   ┌────┐
///  sosc_clk ─▶│ /PREDIV  │──▶│ x MULT   │──▶│ /2 │──▶ spll_clk
///             └──────────┘   └──────────┘   └────┘
///                  ▲              ▲           VCO/2
///          SPLLCFG[PREDIV]  SPLLCFG[MULT]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpllConfig {
    /// Enable the source. `false` disables it.
    pub enable: bool,
    /// Input divider.
    ///
    /// Allowed range: `1..=8`.
    pub prediv: u8,
    /// VCO multiplier.
    ///
    /// Allowed range: `16..=47`.
    pub mult: u8,
    /// Clock monitor
    pub monitor: MonitorMode,
    /// `SPLLDIV1` output divider
    pub div1: AsyncDivider,
    /// `SPLLDIV2` output divider
    pub div2: AsyncDivider,
    /// Lock the control register after configuration
    pub locked: bool,
}

impl Default for SpllConfig {
    /// 8 MHz crystal / 1 * 40 / 2 = 160 MHz
    fn default() -> Self {
        Self {
            enable: true,
            prediv: 1,
            mult: 40,
            monitor: MonitorMode::Disabled,
            div1: AsyncDivider::Div2,
            div2: AsyncDivider::Div4,
            locked: false,
        }
    }
}

/// Configuration of one clock source, as taken by
/// [`Clocks::set_clock_source`](super::Clocks::set_clock_source)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceConfig {
    /// Slow IRC
    Sirc(SircConfig),
    /// Fast IRC
    Firc(FircConfig),
    /// System oscillator
    Sosc(SoscConfig),
    /// System PLL
    Spll(SpllConfig),
}

impl SourceConfig {
    /// The source this configuration applies to
    pub const fn source(&self) -> ClockSource {
        match self {
            SourceConfig::Sirc(_) => ClockSource::Sirc,
            SourceConfig::Firc(_) => ClockSource::Firc,
            SourceConfig::Sosc(_) => ClockSource::Sosc,
            SourceConfig::Spll(_) => ClockSource::Spll,
        }
    }

    /// Whether the source should end up enabled
    pub const fn enable(&self) -> bool {
        match self {
            SourceConfig::Sirc(c) => c.enable,
            SourceConfig::Firc(c) => c.enable,
            SourceConfig::Sosc(c) => c.enable,
            SourceConfig::Spll(c) => c.enable,
        }
    }

    /// Reset-default configuration for `source`
    pub fn default_for(source: ClockSource) -> Self {
        match source {
            ClockSource::Sirc => SourceConfig::Sirc(SircConfig::default()),
            ClockSource::Firc => SourceConfig::Firc(FircConfig::default()),
            ClockSource::Sosc => SourceConfig::Sosc(SoscConfig::default()),
            ClockSource::Spll => SourceConfig::Spll(SpllConfig::default()),
        }
    }
}

/// ```text
///                     ┌─────────┐ core_clk
///                ┌───▶│/DIVCORE │──┬──────────────────────▶
///                │    └─────────┘  │   ┌────────┐ bus_clk
///  ┌─────┐       │                 ├──▶│/DIVBUS │────────▶
///  │SCS  │───────┘                 │   └────────┘
///  └─────┘                         │   ┌────────┐ slow_clk
///     ▲                            └──▶│/DIVSLOW│────────▶
///     │                                └────────┘
///  RCCR / VCCR / HCCR
/// ```
///
/// One of these exists per run mode (RUN, VLPR, HSRUN). Dividers are the
/// actual divisors: bus and slow divide the core clock, not the source.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClockConfig {
    /// The source that drives the system clocks
    pub source: ClockSource,
    /// Core clock divider.
    ///
    /// Allowed range: `1..=16`.
    pub div_core: u8,
    /// Bus clock divider, applied to the core clock.
    ///
    /// Allowed range: `1..=16`.
    pub div_bus: u8,
    /// Slow (flash) clock divider, applied to the core clock.
    ///
    /// Allowed range: `1..=16`.
    pub div_slow: u8,
}

impl SystemClockConfig {
    /// Shorthand constructor
    pub const fn new(source: ClockSource, div_core: u8, div_bus: u8, div_slow: u8) -> Self {
        Self {
            source,
            div_core,
            div_bus,
            div_slow,
        }
    }

    /// Core, bus and slow frequencies this config produces from `source_freq`
    pub const fn frequencies(&self, source_freq: u32) -> (u32, u32, u32) {
        let core = source_freq / self.div_core as u32;
        (core, core / self.div_bus as u32, core / self.div_slow as u32)
    }

    pub(crate) fn dividers_in_range(&self) -> bool {
        [self.div_core, self.div_bus, self.div_slow]
            .iter()
            .all(|div| (1..=16).contains(div))
    }
}

/// `SCG_CLKOUTCNFG[CLKOUTSEL]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScgClockOutSelect {
    /// SCG slow clock
    #[default]
    Slow = 0,
    /// System oscillator
    Sosc = 1,
    /// Slow IRC
    Sirc = 2,
    /// Fast IRC
    Firc = 3,
    /// System PLL
    Spll = 6,
}

impl ScgClockOutSelect {
    pub(crate) const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Slow),
            1 => Some(Self::Sosc),
            2 => Some(Self::Sirc),
            3 => Some(Self::Firc),
            6 => Some(Self::Spll),
            _ => None,
        }
    }
}

/// ```text
///    scg_clkout ┌──────┐
///  ────────────▶│0000  │
///     soscdiv2  │      │
///  ────────────▶│0010  │
///     sircdiv2  │      │
///  ────────────▶│0100  │
///     fircdiv2  │      │
///  ────────────▶│0110  │    ┌─────────┐   CLKOUT
///         hclk  │      │───▶│/CLKOUTDIV│──────────▶
///  ────────────▶│0111  │    └─────────┘
///     splldiv2  │      │         ▲
///  ────────────▶│1000  │         │
///      bus_clk  │      │    SIM_CHIPCTL
///  ────────────▶│1001  │
///      lpo128k  │      │
///  ────────────▶│1010  │
///      lpo_clk  │      │
///  ────────────▶│1100  │
///      rtc_clk  │      │
///  ────────────▶│1110  │
///               └──────┘
///                  ▲
///           SIM_CHIPCTL[CLKOUTSEL]
/// ```
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockOutSelect {
    /// SCG clock out, see [`ScgClockOutSelect`]
    #[default]
    ScgClkOut = 0,
    /// SOSCDIV2
    SoscDiv2 = 2,
    /// SIRCDIV2
    SircDiv2 = 4,
    /// FIRCDIV2
    FircDiv2 = 6,
    /// Core clock
    Hclk = 7,
    /// SPLLDIV2
    SpllDiv2 = 8,
    /// Bus clock
    BusClk = 9,
    /// 128 kHz LPO
    Lpo128k = 10,
    /// Selected LPO clock
    LpoClk = 12,
    /// Selected RTC clock
    RtcClk = 14,
}

impl ClockOutSelect {
    pub(crate) const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::ScgClkOut),
            2 => Some(Self::SoscDiv2),
            4 => Some(Self::SircDiv2),
            6 => Some(Self::FircDiv2),
            7 => Some(Self::Hclk),
            8 => Some(Self::SpllDiv2),
            9 => Some(Self::BusClk),
            10 => Some(Self::Lpo128k),
            12 => Some(Self::LpoClk),
            14 => Some(Self::RtcClk),
            _ => None,
        }
    }
}

/// CLKOUT pin configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockOutConfig {
    /// Drive the CLKOUT pin
    pub enable: bool,
    /// SIM clock out select
    pub select: ClockOutSelect,
    /// SCG clock out select, used when `select` is `ScgClkOut`
    pub scg_select: ScgClockOutSelect,
    /// Output divider.
    ///
    /// Allowed range: `1..=8`.
    pub div: u8,
}

impl Default for ClockOutConfig {
    fn default() -> Self {
        Self {
            enable: false,
            select: ClockOutSelect::ScgClkOut,
            scg_select: ScgClockOutSelect::Slow,
            div: 1,
        }
    }
}

/// `SIM_LPOCLKS[LPOCLKSEL]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LpoSelect {
    /// 128 kHz LPO
    #[default]
    Lpo128k = 0,
    /// No clock
    None = 1,
    /// 32 kHz LPO
    Lpo32k = 2,
    /// 1 kHz LPO
    Lpo1k = 3,
}

/// `SIM_LPOCLKS[RTCCLKSEL]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RtcSelect {
    /// SOSCDIV1
    SoscDiv1 = 0,
    /// 32 kHz LPO
    #[default]
    Lpo32k = 1,
    /// RTC_CLKIN pin
    RtcClkIn = 2,
    /// FIRCDIV1
    FircDiv1 = 3,
}

/// ```text
///                  ┌────┐ lpo128k
///  PMC LPO ──┬────▶│    │──────────────────────────┐  ┌─────┐
///            │     └────┘                          └─▶│00   │
///            │     ┌────┐ lpo32k (LPO32KCLKEN)        │     │ lpo_clk
///            ├────▶│ /4 │────────────────────────────▶│10   │────────▶
///            │     └────┘                             │     │
///            │     ┌────┐ lpo1k (LPO1KCLKEN)          │     │
///            └────▶│/128│────────────────────────────▶│11   │
///                  └────┘                             └─────┘
///                                                        ▲
///                                                 LPOCLKS[LPOCLKSEL]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LpoConfig {
    /// PMC low power oscillator enable
    pub enable: bool,
    /// Enable the 32 kHz LPO output
    pub lpo32k: bool,
    /// Enable the 1 kHz LPO output
    pub lpo1k: bool,
    /// LPO clock select
    pub select: LpoSelect,
    /// RTC clock select
    pub rtc_select: RtcSelect,
    /// Frequency on the RTC_CLKIN pin, in Hz
    pub rtc_clkin_freq: u32,
}

impl Default for LpoConfig {
    fn default() -> Self {
        Self {
            enable: true,
            lpo32k: true,
            lpo1k: true,
            select: LpoSelect::Lpo128k,
            rtc_select: RtcSelect::Lpo32k,
            rtc_clkin_freq: 0,
        }
    }
}

/// Routing of one peripheral's clock, as part of a [`ClockUserConfig`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralClockConfig {
    /// Which peripheral
    pub peripheral: Peripheral,
    /// Its gate, source and dividers
    pub config: ModuleClockConfig,
}

/// A complete clock tree, as applied by [`Clocks::apply`](super::Clocks::apply)
/// and selected by index through the
/// [`ClockManager`](super::manager::ClockManager).
///
/// Sources set to `None` are left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockUserConfig<'a> {
    /// Slow IRC
    pub sirc: Option<SircConfig>,
    /// Fast IRC
    pub firc: Option<FircConfig>,
    /// System oscillator
    pub sosc: Option<SoscConfig>,
    /// System PLL
    pub spll: Option<SpllConfig>,
    /// System clocks in RUN
    pub run: SystemClockConfig,
    /// System clocks in VLPR
    pub vlpr: SystemClockConfig,
    /// System clocks in HSRUN, if the chip has it
    pub hsrun: Option<SystemClockConfig>,
    /// CLKOUT pin
    pub clock_out: ClockOutConfig,
    /// Low power oscillator and RTC clock
    pub lpo: LpoConfig,
    /// Peripheral clock routing
    pub peripherals: &'a [PeripheralClockConfig],
}

impl Default for ClockUserConfig<'_> {
    /// Reset state: SIRC and FIRC running, FIRC drives RUN, SIRC drives VLPR
    fn default() -> Self {
        Self {
            sirc: Some(SircConfig::default()),
            firc: Some(FircConfig::default()),
            sosc: None,
            spll: None,
            run: SystemClockConfig::new(ClockSource::Firc, 1, 2, 2),
            vlpr: SystemClockConfig::new(ClockSource::Sirc, 2, 1, 4),
            hsrun: None,
            clock_out: ClockOutConfig::default(),
            lpo: LpoConfig::default(),
            peripherals: &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_code_maps_powers_of_two() {
        for (n, code) in [(1, 1), (2, 2), (4, 3), (8, 4), (16, 5), (32, 6), (64, 7)] {
            assert_eq!(AsyncDivider::from_divisor(n).bits(), code);
            assert_eq!(AsyncDivider::from_bits(code).divisor(), Some(n));
        }
    }

    #[test]
    fn divider_code_degrades_to_disabled() {
        for n in [0, 3, 5, 6, 12, 65, 128, u32::MAX] {
            assert_eq!(AsyncDivider::from_divisor(n), AsyncDivider::Disabled);
        }
        assert_eq!(AsyncDivider::Disabled.divisor(), None);
    }

    #[test]
    fn scs_codes_round_trip_and_reject_reserved() {
        for src in ClockSource::ALL {
            assert_eq!(ClockSource::from_bits(src.bits()), Some(src));
        }
        assert_eq!(ClockSource::from_bits(0), None);
        assert_eq!(ClockSource::from_bits(4), None);
    }

    #[test]
    fn bus_and_slow_divide_the_core_clock() {
        let cfg = SystemClockConfig::new(ClockSource::Spll, 2, 2, 3);
        assert_eq!(cfg.frequencies(160_000_000), (80_000_000, 40_000_000, 26_666_666));
    }

    #[test]
    fn divider_ranges() {
        assert!(SystemClockConfig::new(ClockSource::Firc, 16, 16, 16).dividers_in_range());
        assert!(SystemClockConfig::new(ClockSource::Firc, 1, 1, 12).dividers_in_range());
        assert!(!SystemClockConfig::new(ClockSource::Firc, 0, 1, 1).dividers_in_range());
        assert!(!SystemClockConfig::new(ClockSource::Firc, 1, 1, 17).dividers_in_range());
    }
}
