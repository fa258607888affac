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

//! Driver for the L9961 battery management front end.
//!
//! The chip is accessed over I2C through 16-bit registers.
//! Configuration registers must only be written while the periodic
//! conversion is halted; the driver enforces this through its
//! [conversion interlock](interlock::Interlock).
//!
//! Freshness of measurements is tracked by a [`FreshnessTracker`] that is
//! fed from the RDY edge interrupt.

#![no_std]

#[macro_use]
mod fmt;

pub mod codec;
pub mod command;
pub mod config;
pub mod device;
pub mod freshness;
pub mod interlock;
pub mod measure;
pub mod register;
pub mod transport;

pub use codec::{Arg, Calibration, Field};
pub use command::{Command, CommandClass, Dispatched};
pub use config::{L9961Cfg, SetupStep};
pub use device::L9961;
pub use freshness::{Clock, Duration, FreshnessTracker, Instant};
pub use interlock::{ConversionCfg, ConversionState};
pub use measure::{CoulombCount, Identity, Measurements};
pub use transport::{ReadStatus, Reading};

/// Default 7-bit I2C address of the L9961.
pub const DEFAULT_ADDR: u8 = 0x49;

/// Number of cells the L9961 can monitor.
pub const MAX_CELLS: usize = 5;

/// L9961 error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// I2C write failed.
    ///
    /// The content of the addressed register is indeterminate afterwards.
    I2c,
    /// Command is unknown or not accepted by the requested command class.
    UnknownCommand,
    /// Identity value 0x0000 is reserved for detecting unprogrammed storage.
    ReservedIdentity,
    /// Argument is neither a sentinel nor a number.
    InvalidArgument,
    /// Cell index is out of range.
    InvalidCell,
}

/// L9961 result.
pub type Result<T> = core::result::Result<T, Error>;
