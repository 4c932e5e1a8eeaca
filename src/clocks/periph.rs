//! Peripheral clock routing through the PCC and the SIM platform gates

use super::config::ClockSource;
use super::Clocks;
use crate::hw::{Hardware, PccRegister};
use crate::Error;

/// Capability bits of one peripheral's clocking
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features(u16);

impl Features {
    /// `PCC_x[FRAC]` is implemented
    pub const MULTIPLIER: Features = Features(1 << 0);
    /// `PCC_x[PCD]` is implemented
    pub const DIVIDER: Features = Features(1 << 1);
    /// Functional clock comes from the source's `xDIV1` output
    pub const PROTOCOL_FROM_ASYNC1: Features = Features(1 << 2);
    /// Functional clock comes from the source's `xDIV2` output
    pub const PROTOCOL_FROM_ASYNC2: Features = Features(1 << 3);
    /// Interface clock is the core clock
    pub const INTERFACE_FROM_SYS: Features = Features(1 << 4);
    /// Interface clock is the bus clock
    pub const INTERFACE_FROM_BUS: Features = Features(1 << 5);
    /// Interface clock is the slow clock
    pub const INTERFACE_FROM_SLOW: Features = Features(1 << 6);
    /// Gate lives in `SIM_PLATCGC`, there is no PCC register
    pub const GATE_IN_SIM: Features = Features(1 << 7);

    /// Whether all bits of `other` are set
    pub const fn contains(self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the peripheral has a selectable functional clock
    pub const fn has_protocol_clock(self) -> bool {
        self.0 & (Self::PROTOCOL_FROM_ASYNC1.0 | Self::PROTOCOL_FROM_ASYNC2.0) != 0
    }
}

macro_rules! peripherals {
    ($($(#[$meta:meta])* $name:ident => $($feature:ident)|+;)*) => {
        /// Every peripheral with a clock gate
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Peripheral {
            $($(#[$meta])* $name,)*
        }

        impl Peripheral {
            /// Every peripheral, in declaration order
            pub const ALL: &'static [Peripheral] = &[$(Peripheral::$name,)*];

            /// Capabilities of this peripheral's clocking
            pub const fn features(self) -> Features {
                match self {
                    $(Peripheral::$name => Features(0 $(| Features::$feature.0)+),)*
                }
            }
        }
    };
}

peripherals! {
    /// Analog comparator
    Cmp0 => INTERFACE_FROM_BUS;
    /// CRC engine
    Crc0 => INTERFACE_FROM_BUS;
    /// DMA channel multiplexer
    Dmamux0 => INTERFACE_FROM_BUS;
    /// External watchdog monitor
    Ewm0 => INTERFACE_FROM_BUS;
    /// Port A pin control
    PortA => INTERFACE_FROM_BUS;
    /// Port B pin control
    PortB => INTERFACE_FROM_BUS;
    /// Port C pin control
    PortC => INTERFACE_FROM_BUS;
    /// Port D pin control
    PortD => INTERFACE_FROM_BUS;
    /// Port E pin control
    PortE => INTERFACE_FROM_BUS;
    /// Flash memory controller
    Ftfc0 => INTERFACE_FROM_SLOW;
    /// Programmable delay block 0
    Pdb0 => INTERFACE_FROM_SYS;
    /// Programmable delay block 1
    Pdb1 => INTERFACE_FROM_SYS;
    /// CAN 0
    FlexCan0 => INTERFACE_FROM_SYS;
    /// CAN 1
    FlexCan1 => INTERFACE_FROM_SYS;
    /// CAN 2
    FlexCan2 => INTERFACE_FROM_SYS;
    /// FlexTimer 0
    Ftm0 => PROTOCOL_FROM_ASYNC1 | INTERFACE_FROM_SYS;
    /// FlexTimer 1
    Ftm1 => PROTOCOL_FROM_ASYNC1 | INTERFACE_FROM_SYS;
    /// FlexTimer 2
    Ftm2 => PROTOCOL_FROM_ASYNC1 | INTERFACE_FROM_SYS;
    /// FlexTimer 3
    Ftm3 => PROTOCOL_FROM_ASYNC1 | INTERFACE_FROM_SYS;
    /// ADC 0
    Adc0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// ADC 1
    Adc1 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// I2C 0
    Lpi2c0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// SPI 0
    Lpspi0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// SPI 1
    Lpspi1 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// SPI 2
    Lpspi2 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// Periodic interrupt timer
    Lpit0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// Low power timer
    Lptmr0 => PROTOCOL_FROM_ASYNC2 | DIVIDER | MULTIPLIER | INTERFACE_FROM_BUS;
    /// UART 0
    Lpuart0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// UART 1
    Lpuart1 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// UART 2
    Lpuart2 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// FlexIO
    FlexIo0 => PROTOCOL_FROM_ASYNC2 | INTERFACE_FROM_BUS;
    /// Real time clock
    Rtc0 => INTERFACE_FROM_BUS;
    /// eDMA engine
    Dma => GATE_IN_SIM | INTERFACE_FROM_SYS;
    /// Memory protection unit
    Mpu => GATE_IN_SIM | INTERFACE_FROM_SYS;
    /// Miscellaneous system control
    Mscm => GATE_IN_SIM | INTERFACE_FROM_SYS;
    /// Error injection module
    Eim => GATE_IN_SIM | INTERFACE_FROM_SYS;
    /// Error reporting module
    Erm => GATE_IN_SIM | INTERFACE_FROM_SYS;
}

/// `PCC_x[FRAC]`
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fraction {
    /// Multiply by 1
    #[default]
    X1 = 0,
    /// Multiply by 2
    X2 = 1,
}

/// ```text
///            ┌──────┐
///  off   ───▶│000   │
///  sosc  ───▶│001   │   ┌────────┐   ┌────────┐   ┌─────┐
///  sirc  ───▶│010   │──▶│ /PCD   │──▶│ xFRAC  │──▶│ CGC │──▶ functional clock
///  firc  ───▶│011   │   └────────┘   └────────┘   └─────┘
///  spll  ───▶│110   │
///            └──────┘
///               ▲
///           PCC_x[PCS]
/// ```
///
/// Sources feed through their `xDIV1` or `xDIV2` output depending on the
/// peripheral. Fields the peripheral doesn't implement are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleClockConfig {
    /// Clock gate
    pub gate: bool,
    /// Functional clock source, `None` for off
    pub source: Option<ClockSource>,
    /// Divider.
    ///
    /// Allowed range: `1..=8`.
    pub div: u8,
    /// Fractional multiplier
    pub frac: Fraction,
}

impl Default for ModuleClockConfig {
    fn default() -> Self {
        Self {
            gate: true,
            source: None,
            div: 1,
            frac: Fraction::X1,
        }
    }
}

impl<H: Hardware> Clocks<H> {
    /// Gate and route one peripheral's clock.
    ///
    /// `None` gates the peripheral on with the first running source among
    /// SIRC, FIRC, SPLL and SOSC, undivided. Peripherals gated in the SIM only
    /// have their gate toggled.
    ///
    /// The PCC gate is cleared before the combined gate/source/divider write,
    /// so the peripheral never sees a half-applied routing.
    pub fn set_module_clock(&mut self, peripheral: Peripheral, config: Option<&ModuleClockConfig>) {
        debug_assert!(self.chip.has_peripheral(peripheral));

        let config = match config {
            Some(config) => *config,
            None => ModuleClockConfig {
                source: self.first_running_source(),
                ..ModuleClockConfig::default()
            },
        };
        let features = peripheral.features();

        if features.contains(Features::GATE_IN_SIM) {
            self.hw.set_platform_gate(peripheral, config.gate);
            return;
        }

        let source = match (features.has_protocol_clock(), config.source) {
            (true, Some(src)) => src.bits(),
            _ => 0,
        };
        let div = if features.contains(Features::DIVIDER) {
            config.div.clamp(1, 8) - 1
        } else {
            0
        };
        let frac = if features.contains(Features::MULTIPLIER) {
            config.frac as u8
        } else {
            0
        };

        trace!("pcc {:?}: gate {}, pcs {}, pcd {}, frac {}", peripheral, config.gate, source, div, frac);
        self.hw.set_pcc_gate(peripheral, false);
        self.hw.set_pcc(
            peripheral,
            PccRegister {
                gate: config.gate,
                source,
                div,
                frac,
            },
        );
    }

    fn first_running_source(&self) -> Option<ClockSource> {
        [ClockSource::Sirc, ClockSource::Firc, ClockSource::Spll, ClockSource::Sosc]
            .into_iter()
            .find(|src| self.source_frequency(*src) != 0)
    }

    /// Functional clock of a peripheral if it has one, else its interface clock
    pub(super) fn peripheral_frequency(&self, peripheral: Peripheral) -> Result<u32, Error> {
        if !self.chip.has_peripheral(peripheral) {
            return Err(Error::Unsupported);
        }
        let features = peripheral.features();

        let gated_on = if features.contains(Features::GATE_IN_SIM) {
            self.hw.platform_gate(peripheral)
        } else {
            self.hw.pcc(peripheral).gate
        };
        if !gated_on {
            return Err(Error::GatedOff);
        }

        if !features.has_protocol_clock() {
            let (core, bus, slow) = self.system_frequencies()?;
            let freq = if features.contains(Features::INTERFACE_FROM_BUS) {
                bus
            } else if features.contains(Features::INTERFACE_FROM_SLOW) {
                slow
            } else {
                core
            };
            return match freq {
                0 => Err(Error::GatedOff),
                freq => Ok(freq),
            };
        }

        let pcc = self.hw.pcc(peripheral);
        let Some(source) = ClockSource::from_bits(pcc.source) else {
            return Err(Error::GatedOff);
        };
        let (div1, div2) = self.async_frequencies(source);
        let input = if features.contains(Features::PROTOCOL_FROM_ASYNC1) {
            div1
        } else {
            div2
        };
        if input == 0 {
            return Err(Error::GatedOff);
        }

        let (div, frac) = if features.contains(Features::DIVIDER) {
            (pcc.div as u32, pcc.frac as u32)
        } else {
            (0, 0)
        };
        if frac > div {
            return Ok(0);
        }
        Ok(input / (div + 1) * (frac + 1))
    }
}
