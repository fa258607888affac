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

//! 16-bit register access over I2C.
//!
//! A write is a single transaction `[reg, msb, lsb]`.
//! A read addresses the register, waits the bus free time and then fetches two bytes MSB first.

use byteorder::{BigEndian, ByteOrder};
use embedded_hal::blocking::{delay::DelayUs, i2c};

use crate::{Error, Result};

/// Bus free time between addressing a register and reading it back in µs.
pub const TURNAROUND_US: u32 = 3;

/// Completeness of a register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadStatus {
    /// Both bytes were received.
    Complete,
    /// The transfer did not deliver both bytes; the value is a zero decode.
    Short,
}

impl ReadStatus {
    /// Combined status of two reads contributing to one value.
    pub fn and(self, other: ReadStatus) -> ReadStatus {
        match (self, other) {
            (ReadStatus::Complete, ReadStatus::Complete) => ReadStatus::Complete,
            _ => ReadStatus::Short,
        }
    }
}

/// Value obtained from the device together with the read status.
///
/// A short read decodes like a raw zero and is only distinguishable through [`Reading::status`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading<T> {
    /// Decoded value.
    pub value: T,
    /// Read status.
    pub status: ReadStatus,
}

impl<T> Reading<T> {
    /// Complete reading.
    pub fn complete(value: T) -> Self {
        Self { value, status: ReadStatus::Complete }
    }

    /// Whether all bytes were received.
    pub fn is_complete(&self) -> bool {
        self.status == ReadStatus::Complete
    }

    /// Decodes the value, keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        Reading { value: f(self.value), status: self.status }
    }

    /// Combines with another reading; the result is short if either is.
    pub fn zip<U, V>(self, other: Reading<U>, f: impl FnOnce(T, U) -> V) -> Reading<V> {
        Reading { value: f(self.value, other.value), status: self.status.and(other.status) }
    }
}

/// Writes a 16-bit register.
///
/// Failure leaves the register content indeterminate.
pub fn write_register<I2C>(i2c: &mut I2C, addr: u8, reg: u8, value: u16) -> Result<()>
where
    I2C: i2c::Write<i2c::SevenBitAddress>,
{
    let mut buf = [reg, 0, 0];
    BigEndian::write_u16(&mut buf[1..], value);
    trace!("write 0x{:02x} <- 0x{:04x}", reg, value);

    i2c.write(addr, &buf).map_err(|_| {
        warn!("write of register 0x{:02x} failed", reg);
        Error::I2c
    })
}

/// Reads a 16-bit register.
///
/// The address phase ends with STOP instead of a repeated start.
/// The device needs the bus free time that follows before the read phase.
///
/// A transfer that fails in either phase yields a zero value with [`ReadStatus::Short`].
/// No retry is attempted.
pub fn read_register<I2C, D>(i2c: &mut I2C, delay: &mut D, addr: u8, reg: u8) -> Reading<u16>
where
    I2C: i2c::Write<i2c::SevenBitAddress> + i2c::Read<i2c::SevenBitAddress>,
    D: DelayUs<u32>,
{
    if i2c.write(addr, &[reg]).is_err() {
        warn!("addressing register 0x{:02x} failed", reg);
        return Reading { value: 0, status: ReadStatus::Short };
    }

    delay.delay_us(TURNAROUND_US);

    let mut buf = [0; 2];
    if i2c.read(addr, &mut buf).is_err() {
        warn!("short read of register 0x{:02x}", reg);
        return Reading { value: 0, status: ReadStatus::Short };
    }

    let value = BigEndian::read_u16(&buf);
    trace!("read 0x{:02x} -> 0x{:04x}", reg, value);
    Reading::complete(value)
}
