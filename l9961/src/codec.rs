//! Conversion between physical quantities and register codes.

use core::str::FromStr;

use crate::{Error, Result};

/// Full-scale voltage of the current sense input in V.
pub const CURRENT_FULL_SCALE_V: f32 = 0.300;

/// Default sense resistor in Ω.
pub const SENSE_RESISTOR_OHM: f32 = 0.008;

/// Command argument.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Arg {
    /// Minimum of the field range.
    Min,
    /// Maximum of the field range.
    Max,
    /// Field default.
    Default,
    /// Physical value.
    Value(f32),
}

impl FromStr for Arg {
    type Err = Error;

    /// Parses `min`, `max`, `default` (case-insensitive) or a number.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("min") {
            Ok(Arg::Min)
        } else if s.eq_ignore_ascii_case("max") {
            Ok(Arg::Max)
        } else if s.eq_ignore_ascii_case("default") {
            Ok(Arg::Default)
        } else {
            s.parse::<f32>().map(Arg::Value).map_err(|_| Error::InvalidArgument)
        }
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Value(value)
    }
}

/// Sense path calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Sense resistor in Ω.
    pub sense_resistor_ohm: f32,
    /// Full-scale voltage across the sense resistor in V.
    pub full_scale_v: f32,
}

impl Calibration {
    /// 8 mΩ shunt with 300 mV full scale.
    pub const DEFAULT: Self = Self { sense_resistor_ohm: SENSE_RESISTOR_OHM, full_scale_v: CURRENT_FULL_SCALE_V };

    /// Full-scale current in A.
    pub fn i_max(&self) -> f32 {
        self.full_scale_v / self.sense_resistor_ohm
    }

    /// Converts a signed code of the given width to a current in A.
    ///
    /// The largest positive code maps to [`i_max`](Self::i_max).
    pub fn current(&self, code: i32, bits: u8) -> f32 {
        let code_max = ((1u32 << (bits - 1)) - 1) as f32;
        code as f32 / code_max * self.i_max()
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sign-extends the lowest `bits` of `raw`.
pub fn sign_extend(raw: u32, bits: u8) -> i32 {
    let shift = 32 - u32::from(bits);
    ((raw << shift) as i32) >> shift
}

/// Unsigned measurement spanning `full_scale` over its code range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gauge {
    /// Code width.
    pub bits: u8,
    /// Physical value of the largest code.
    pub full_scale: f32,
}

impl Gauge {
    /// Code mask.
    pub fn mask(&self) -> u16 {
        ((1u32 << self.bits) - 1) as u16
    }

    /// Decodes a raw register value.
    pub fn decode(&self, raw: u16) -> f32 {
        let mask = self.mask();
        f32::from(raw & mask) / f32::from(mask) * self.full_scale
    }
}

/// Bit field of a register holding a physical quantity.
///
/// The physical value is `offset + code * lsb`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// Value of code 0.
    pub offset: f32,
    /// Resolution.
    pub lsb: f32,
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Value used for [`Arg::Default`].
    pub default: f32,
    /// Code width.
    pub bits: u8,
    /// Position within the register.
    pub shift: u8,
}

impl Field {
    /// Field with resolution `lsb` accepting `[min, max]`.
    pub fn new(lsb: f32, min: f32, max: f32, bits: u8) -> Self {
        Self { offset: 0.0, lsb, min, max, default: min, bits, shift: 0 }
    }

    /// Plain integer field.
    pub fn count(min: u16, max: u16, bits: u8) -> Self {
        Self::new(1.0, f32::from(min), f32::from(max), bits)
    }

    /// Field of `bits` width accepting any code.
    pub fn raw(bits: u8) -> Self {
        let max = ((1u32 << bits) - 1) as f32;
        Self::new(1.0, 0.0, max, bits)
    }

    /// Places the field at bit `shift`.
    pub fn at(mut self, shift: u8) -> Self {
        self.shift = shift;
        self
    }

    /// Sets the value of code 0.
    pub fn offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the default to the value of `code`.
    pub fn default_code(mut self, code: u16) -> Self {
        self.default = self.offset + f32::from(code) * self.lsb;
        self
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: f32) -> Self {
        self.default = value;
        self
    }

    /// Code mask.
    pub fn mask(&self) -> u16 {
        ((1u32 << self.bits) - 1) as u16
    }

    /// Substitutes sentinels by physical values.
    pub fn resolve(&self, arg: Arg) -> f32 {
        match arg {
            Arg::Min => self.min,
            Arg::Max => self.max,
            Arg::Default => self.default,
            Arg::Value(v) => v,
        }
    }

    /// Largest value the field can represent within `[min, max]`.
    pub fn top(&self) -> f32 {
        self.max.min(self.offset + f32::from(self.mask()) * self.lsb)
    }

    /// Clamps a physical value into the field range.
    ///
    /// The range ends at the value of the largest code when that lies below `max`.
    /// NaN maps to the minimum.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.max(self.min).min(self.top())
        }
    }

    /// Code of a physical value, clamped to the field range and width.
    pub fn code(&self, value: f32) -> u16 {
        let scaled = (self.clamp(value) - self.offset) / self.lsb;
        let code = if scaled > 0.0 { (scaled + 0.5) as u32 } else { 0 };
        code.min(u32::from(self.mask())) as u16
    }

    /// Resolves the argument and returns the field code placed at its position.
    pub fn encode(&self, arg: Arg) -> u16 {
        let value = self.resolve(arg);
        if arg == Arg::Default && (value < self.min || value > self.max) {
            warn!("default {} outside of [{}, {}], clamping", value, self.min, self.max);
        }
        self.code(value) << self.shift
    }

    /// Physical value of the field within a register value.
    pub fn decode(&self, reg: u16) -> f32 {
        let code = (reg >> self.shift) & self.mask();
        self.offset + f32::from(code) * self.lsb
    }
}
