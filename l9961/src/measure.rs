//! Measurement decoding.

use heapless::Vec;

use crate::{
    codec::{sign_extend, Calibration, Gauge},
    transport::Reading,
    MAX_CELLS,
};

/// Cell voltage, 12 bit over 5 V.
pub const VCELL: Gauge = Gauge { bits: 12, full_scale: 5.0 };
/// Sum of cell voltages, 15 bit over 25 V.
pub const VCELL_SUM: Gauge = Gauge { bits: 15, full_scale: 25.0 };
/// Battery voltage, 12 bit over 25 V.
pub const VB: Gauge = Gauge { bits: 12, full_scale: 25.0 };
/// NTC or GPIO voltage, 12 bit over 3.3 V.
pub const NTC: Gauge = Gauge { bits: 12, full_scale: 3.3 };

/// Die temperature in °C.
pub fn die_temp(raw: u16) -> f32 {
    343.165 - 0.196 * f32::from(raw & 0x0fff)
}

/// Instantaneous current in A, positive when charging.
pub fn current(cal: &Calibration, raw: u16) -> f32 {
    cal.current(i32::from(raw as i16), 16)
}

/// Coulomb counter from its two registers.
///
/// `msb` holds accumulator bits 23..8, `lsb_cntr` holds bits 7..0 in its high byte and
/// the sample count in its low byte.
pub fn coulomb_count(cal: &Calibration, msb: u16, lsb_cntr: u16) -> CoulombCount {
    let acc = (u32::from(msb) << 8) | u32::from(lsb_cntr >> 8);
    CoulombCount { coulombs: cal.current(sign_extend(acc, 24), 24), samples: lsb_cntr as u8 }
}

/// Accumulated charge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoulombCount {
    /// Accumulated value scaled to current full scale.
    pub coulombs: f32,
    /// Number of accumulated samples.
    pub samples: u8,
}

/// Device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    /// Manufacturer name.
    pub manufacturer_name: u32,
    /// Manufacturing date.
    pub manufacturing_date: u16,
    /// First usage date.
    pub first_usage_date: u16,
    /// Serial number.
    pub serial_number: u32,
    /// Device name.
    pub device_name: u32,
}

/// One batch of measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// Cell voltages in V, cell 1 first.
    pub cells: Vec<Reading<f32>, MAX_CELLS>,
    /// Sum of cell voltages in V.
    pub cell_sum: Reading<f32>,
    /// Battery voltage in V.
    pub pack: Reading<f32>,
    /// NTC voltage in V.
    pub ntc: Reading<f32>,
    /// Die temperature in °C.
    pub die_temp: Reading<f32>,
    /// Current in A.
    pub current: Reading<f32>,
    /// Batch was read within one freshness window.
    pub fresh: bool,
}

impl Measurements {
    /// All registers were read completely.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|c| c.is_complete())
            && self.cell_sum.is_complete()
            && self.pack.is_complete()
            && self.ntc.is_complete()
            && self.die_temp.is_complete()
            && self.current.is_complete()
    }

    /// Complete and fresh.
    pub fn is_trusted(&self) -> bool {
        self.fresh && self.is_complete()
    }
}
