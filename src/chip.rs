//! Silicon variant descriptors
//!
//! The S32K1xx parts share one clock architecture but differ in which sources,
//! run modes and peripherals exist. Instead of compiling the drivers once per
//! part, the differences live in a [`Chip`] value handed to
//! [`Clocks::new`](crate::Clocks::new).

use crate::clocks::config::ClockSource;
use crate::clocks::periph::Peripheral;
use crate::hw::RunMode;

/// Maximum core, bus and slow clock frequencies, in Hz. A zero core ceiling
/// means the source can't drive the system clocks in that mode.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ceiling {
    /// Core clock ceiling
    pub core: u32,
    /// Bus clock ceiling
    pub bus: u32,
    /// Slow clock ceiling
    pub slow: u32,
}

impl Ceiling {
    const fn new(core: u32, bus: u32, slow: u32) -> Self {
        Self { core, bus, slow }
    }

    const FORBIDDEN: Ceiling = Ceiling::new(0, 0, 0);

    /// Whether this ceiling allows the source at all
    pub const fn allowed(&self) -> bool {
        self.core != 0
    }
}

/// Per-source table, indexed in [`ClockSource::ALL`] order (SIRC, FIRC, SOSC, SPLL)
pub type CeilingTable = [Ceiling; 4];

const RUN_CEILINGS: CeilingTable = [
    Ceiling::new(80_000_000, 48_000_000, 26_670_000),
    Ceiling::new(80_000_000, 48_000_000, 26_670_000),
    Ceiling::new(80_000_000, 48_000_000, 26_670_000),
    Ceiling::new(80_000_000, 40_000_000, 26_670_000),
];

const VLPR_CEILINGS: CeilingTable = [
    Ceiling::new(4_000_000, 4_000_000, 1_000_000),
    Ceiling::FORBIDDEN,
    Ceiling::FORBIDDEN,
    Ceiling::FORBIDDEN,
];

const HSRUN_CEILINGS: CeilingTable = [
    Ceiling::FORBIDDEN,
    Ceiling::new(112_000_000, 56_000_000, 28_000_000),
    Ceiling::FORBIDDEN,
    Ceiling::new(112_000_000, 56_000_000, 28_000_000),
];

const NO_CEILINGS: CeilingTable = [Ceiling::FORBIDDEN; 4];

cfg_if::cfg_if! {
    if #[cfg(feature = "errata-e10777")] {
        const SYSCLK_POLL_BUDGET: u32 = 10;
    } else {
        const SYSCLK_POLL_BUDGET: u32 = 1;
    }
}

/// Capabilities and limits of one S32K1xx variant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chip {
    /// Part family name, for logs
    pub name: &'static str,
    /// SPLL present
    pub has_spll: bool,
    /// HSRUN present
    pub has_hsrun: bool,
    /// RUN mode ceilings
    pub run: CeilingTable,
    /// VLPR mode ceilings
    pub vlpr: CeilingTable,
    /// HSRUN mode ceilings
    pub hsrun: CeilingTable,
    /// Attempts to observe a system clock switch in `SCG_CSR`
    pub sysclk_poll_budget: u32,
    /// Attempts to observe `xVLD` after enabling a source, in table order
    pub stabilization: [u32; 4],
    /// Attempts to observe `SMC_PMSTAT` reach a requested run mode
    pub mode_poll_budget: u32,
    /// Frequency of the PMC low power oscillator, in Hz
    pub lpo_freq: u32,
    /// Peripherals this variant lacks
    pub missing_peripherals: &'static [Peripheral],
}

impl Chip {
    /// S32K142/144/146/148
    pub const S32K14X: Chip = Chip {
        name: "S32K14x",
        has_spll: true,
        has_hsrun: true,
        run: RUN_CEILINGS,
        vlpr: VLPR_CEILINGS,
        hsrun: HSRUN_CEILINGS,
        sysclk_poll_budget: SYSCLK_POLL_BUDGET,
        stabilization: [100, 20, 3_205_000, 1000],
        mode_poll_budget: 1000,
        lpo_freq: 128_000,
        missing_peripherals: &[],
    };

    /// S32K116/118
    pub const S32K11X: Chip = Chip {
        name: "S32K11x",
        has_spll: false,
        has_hsrun: false,
        run: RUN_CEILINGS,
        vlpr: VLPR_CEILINGS,
        hsrun: NO_CEILINGS,
        sysclk_poll_budget: SYSCLK_POLL_BUDGET,
        stabilization: [100, 20, 3_205_000, 1000],
        mode_poll_budget: 1000,
        lpo_freq: 128_000,
        missing_peripherals: &[
            Peripheral::FlexCan2,
            Peripheral::Ftm2,
            Peripheral::Ftm3,
            Peripheral::Adc1,
            Peripheral::Pdb1,
            Peripheral::Lpspi2,
            Peripheral::Lpuart2,
            Peripheral::Ewm0,
            Peripheral::PortE,
        ],
    };
}

cfg_if::cfg_if! {
    if #[cfg(feature = "s32k11x")] {
        impl Chip {
            /// The variant selected by the chip feature
            pub const DEFAULT: Chip = Chip::S32K11X;
        }
    } else {
        impl Chip {
            /// The variant selected by the chip feature
            pub const DEFAULT: Chip = Chip::S32K14X;
        }
    }
}

impl Default for Chip {
    fn default() -> Self {
        Chip::DEFAULT
    }
}

impl Chip {
    /// Whether `source` exists on this variant
    pub const fn has_source(&self, source: ClockSource) -> bool {
        match source {
            ClockSource::Spll => self.has_spll,
            _ => true,
        }
    }

    /// Whether `peripheral` exists on this variant
    pub fn has_peripheral(&self, peripheral: Peripheral) -> bool {
        !self.missing_peripherals.contains(&peripheral)
    }

    /// Ceiling for `source` in run mode `mode`
    pub const fn ceiling(&self, mode: RunMode, source: ClockSource) -> Ceiling {
        let table = match mode {
            RunMode::Run => &self.run,
            RunMode::Vlpr => &self.vlpr,
            RunMode::Hsrun => &self.hsrun,
        };
        table[source.index()]
    }

    /// Stabilization poll budget for `source`
    pub const fn stabilization_budget(&self, source: ClockSource) -> u32 {
        self.stabilization[source.index()]
    }
}
