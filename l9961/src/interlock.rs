//
// L9961 battery management firmware
// Copyright (C) 2024 The quadbot-bms authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//

//! Conversion state interlock.
//!
//! Configuration registers must not be written while the device is converting.
//! All mutating commands pass through [`Interlock::quiesce`] before touching the bus.

use core::str::FromStr;
use embedded_hal::blocking::i2c;

use crate::{freshness::Duration, register, transport, Error, Result};

/// Shortest filter time of the device in µs.
pub const MIN_FILTER_US: u32 = 500;

/// Cell filter times in µs by selector.
const CELL_FILTER_US: [u32; 4] = [500, 1_000, 2_000, 4_000];

/// Periodic conversion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionState {
    /// Conversion halted, configuration may be written.
    Off,
    /// Device is periodically converting.
    On,
}

impl ConversionState {
    /// Wire name.
    pub const fn name(self) -> &'static str {
        match self {
            ConversionState::Off => "CONVERSION_OFF",
            ConversionState::On => "CONVERSION_ON",
        }
    }
}

impl FromStr for ConversionState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CONVERSION_OFF" => Ok(ConversionState::Off),
            "CONVERSION_ON" => Ok(ConversionState::On),
            _ => {
                warn!("unknown conversion state");
                Err(Error::UnknownCommand)
            }
        }
    }
}

/// Filter and cycle settings applied when conversion is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConversionCfg {
    /// Measurement cycle selector (0..=15), cycle time is 10 ms + 20 ms * cycle.
    pub cycle: u8,
    /// Current filter selector (0..=3).
    pub current_filter: u8,
    /// Short circuit filter selector (0..=15).
    pub sc_filter: u8,
    /// Cell voltage filter selector (0..=3).
    pub cell_filter: u8,
    /// Number of monitored cells (1..=5).
    pub cells: u8,
}

impl ConversionCfg {
    /// Longest cycle and filters on five cells.
    pub const MAX: Self = Self { cycle: 15, current_filter: 3, sc_filter: 15, cell_filter: 3, cells: 5 };

    /// Register value enabling conversion.
    pub const fn pack(&self) -> u16 {
        ((self.cycle as u16 & 0xf) << 8)
            | ((self.current_filter as u16 & 0x3) << 6)
            | ((self.sc_filter as u16 & 0xf) << 2)
            | (self.cell_filter as u16 & 0x3)
    }

    /// Measurement cycle time in µs.
    pub const fn cycle_us(&self) -> u32 {
        10_000 + 20_000 * (self.cycle as u32 & 0xf)
    }

    /// Cell voltage filter time in µs.
    pub const fn cell_filter_us(&self) -> u32 {
        CELL_FILTER_US[(self.cell_filter & 0x3) as usize]
    }

    /// Time after a conversion complete edge during which the measurement registers are stable.
    pub const fn validity_window(&self) -> Duration {
        let busy = (self.cells as u32 + 1) * self.cell_filter_us();
        let us = self.cycle_us().saturating_sub(busy) + 2 * MIN_FILTER_US;
        Duration::from_ticks(us)
    }
}

impl Default for ConversionCfg {
    fn default() -> Self {
        Self::MAX
    }
}

/// Tracks the conversion state and serializes configuration writes against it.
///
/// The state starts unknown; an unknown state is treated like [`ConversionState::On`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Interlock {
    cfg: ConversionCfg,
    state: Option<ConversionState>,
}

impl Interlock {
    /// Creates the interlock with unknown device state.
    pub const fn new(cfg: ConversionCfg) -> Self {
        Self { cfg, state: None }
    }

    /// Conversion settings.
    pub fn cfg(&self) -> &ConversionCfg {
        &self.cfg
    }

    /// Last known state; `None` when the device state is indeterminate.
    pub fn state(&self) -> Option<ConversionState> {
        self.state
    }

    /// Writes the conversion register for `target`.
    ///
    /// The write is issued even if the device is already in the target state.
    /// On failure the state becomes unknown.
    pub fn transition<I2C>(&mut self, i2c: &mut I2C, addr: u8, target: ConversionState) -> Result<()>
    where
        I2C: i2c::Write<i2c::SevenBitAddress>,
    {
        let value = match target {
            ConversionState::Off => 0,
            ConversionState::On => self.cfg.pack(),
        };

        match transport::write_register(i2c, addr, register::CFG1_FILTERS_CYCLES, value) {
            Ok(()) => {
                info!("{} (0x{:04x})", target.name(), value);
                self.state = Some(target);
                Ok(())
            }
            Err(err) => {
                self.state = None;
                Err(err)
            }
        }
    }

    /// Halts conversion unless it is known to be halted.
    pub fn quiesce<I2C>(&mut self, i2c: &mut I2C, addr: u8) -> Result<()>
    where
        I2C: i2c::Write<i2c::SevenBitAddress>,
    {
        if self.state == Some(ConversionState::Off) {
            return Ok(());
        }
        debug!("halting conversion before write");
        self.transition(i2c, addr, ConversionState::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_packs_to_longest_cycle() {
        assert_eq!(ConversionCfg::MAX.pack(), 0x0fff);
        assert_eq!(ConversionCfg::MAX.cycle_us(), 310_000);
        assert_eq!(ConversionCfg::MAX.cell_filter_us(), 4_000);
    }

    #[test]
    fn packing_places_fields() {
        let cfg = ConversionCfg { cycle: 2, current_filter: 1, sc_filter: 5, cell_filter: 2, cells: 3 };
        assert_eq!(cfg.pack(), 0x0200 | 0x0040 | 0x0014 | 0x0002);
    }

    #[test]
    fn validity_window() {
        // 310 ms - 6 * 4 ms + 2 * 0.5 ms
        assert_eq!(ConversionCfg::MAX.validity_window().ticks(), 287_000);

        let cfg = ConversionCfg { cycle: 0, current_filter: 0, sc_filter: 0, cell_filter: 0, cells: 2 };
        // 10 ms - 3 * 0.5 ms + 1 ms
        assert_eq!(cfg.validity_window().ticks(), 9_500);

        let cfg = ConversionCfg { cycle: 0, current_filter: 0, sc_filter: 0, cell_filter: 3, cells: 5 };
        assert_eq!(cfg.validity_window().ticks(), 2 * MIN_FILTER_US);
    }

    #[test]
    fn parse_state() {
        assert_eq!("CONVERSION_ON".parse::<ConversionState>(), Ok(ConversionState::On));
        assert_eq!("CONVERSION_OFF".parse::<ConversionState>(), Ok(ConversionState::Off));
        assert_eq!("CONVERSION".parse::<ConversionState>(), Err(Error::UnknownCommand));
    }

    #[test]
    fn starts_unknown() {
        let interlock = Interlock::new(ConversionCfg::MAX);
        assert_eq!(interlock.state(), None);
    }
}
