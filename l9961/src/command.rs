//! Command table.
//!
//! Every command the driver can issue maps to exactly one register, a payload codec and
//! a command class deciding through which entry point it is accepted.

use core::str::FromStr;

use crate::{
    codec::{Calibration, Field},
    register as reg, Error, Result,
};

/// Command class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandClass {
    /// Configuration register with a fixed default payload.
    Config,
    /// Calibrated threshold register.
    Numeric,
    /// Identity storage; the zero value is reserved.
    Identity,
    /// Immediate action.
    Realtime,
}

/// Symbolic command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Cfg2FiltersCycles,
    ToPrdvBalMsk,
    ToFuseRstMsk,
    ToFaultnMsk,
    CurrMsk,
    DiagOvOtUt,
    DiagUv,
    DiagCurr,

    CsaGainFactor,
    VcellOvTh,
    VcellUvTh,
    VcellSevereDeltaThrs,
    VcellBalUvDeltaTh,
    VbOvTh,
    VbUvTh,
    VbSumMaxDiffTh,
    VntcOtTh,
    VntcUtTh,
    VntcSevereOtDeltaTh,
    OvcThresholds,
    PersistentOvcThresholds,
    ScThreshold,

    ManufactureNameMsb,
    ManufactureNameLsb,
    ManufacturingDate,
    FirstUsageDate,
    SerialNumberMsb,
    SerialNumberLsb,
    DeviceNameMsb,
    DeviceNameLsb,

    BalEnable,
    BalDisable,
    Nvm2Dl,
    Nvm2Ul,
    Go2Ship,
    Go2Stby,
    FuseTrigDisarm,
    FuseTrigArm,
    FuseTrigFireInterrupt,
    FuseTrigFire,
}

/// How the register payload of a command is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Codec {
    /// Constant payload.
    Fixed(u16),
    /// Caller supplied non-zero value.
    Identity,
    /// One field, first argument.
    Single(FieldId),
    /// Two fields, one per argument.
    Pair(FieldId, FieldId),
}

/// Table entry of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandSpec {
    /// Target register.
    pub register: u8,
    /// Class.
    pub class: CommandClass,
    /// Payload codec.
    pub codec: Codec,
    /// Time the device needs to process the write in ms.
    pub settle_ms: u32,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dispatched {
    /// Command.
    pub command: Command,
    /// Register written.
    pub register: u8,
    /// Value written.
    pub value: u16,
}

const CFG_SETTLE_MS: u32 = 10;
const NVM_SETTLE_MS: u32 = 100;

impl Command {
    /// All commands.
    pub const ALL: [Command; 40] = [
        Command::Cfg2FiltersCycles,
        Command::ToPrdvBalMsk,
        Command::ToFuseRstMsk,
        Command::ToFaultnMsk,
        Command::CurrMsk,
        Command::DiagOvOtUt,
        Command::DiagUv,
        Command::DiagCurr,
        Command::CsaGainFactor,
        Command::VcellOvTh,
        Command::VcellUvTh,
        Command::VcellSevereDeltaThrs,
        Command::VcellBalUvDeltaTh,
        Command::VbOvTh,
        Command::VbUvTh,
        Command::VbSumMaxDiffTh,
        Command::VntcOtTh,
        Command::VntcUtTh,
        Command::VntcSevereOtDeltaTh,
        Command::OvcThresholds,
        Command::PersistentOvcThresholds,
        Command::ScThreshold,
        Command::ManufactureNameMsb,
        Command::ManufactureNameLsb,
        Command::ManufacturingDate,
        Command::FirstUsageDate,
        Command::SerialNumberMsb,
        Command::SerialNumberLsb,
        Command::DeviceNameMsb,
        Command::DeviceNameLsb,
        Command::BalEnable,
        Command::BalDisable,
        Command::Nvm2Dl,
        Command::Nvm2Ul,
        Command::Go2Ship,
        Command::Go2Stby,
        Command::FuseTrigDisarm,
        Command::FuseTrigArm,
        Command::FuseTrigFireInterrupt,
        Command::FuseTrigFire,
    ];

    /// Wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Cfg2FiltersCycles => "CFG2_FILTERS_CYCLES",
            Command::ToPrdvBalMsk => "TO_PRDV_BAL_MSK",
            Command::ToFuseRstMsk => "TO_FUSE_RST_MSK",
            Command::ToFaultnMsk => "TO_FAULTN_MSK",
            Command::CurrMsk => "CURR_MSK",
            Command::DiagOvOtUt => "DIAG_OV_OT_UT",
            Command::DiagUv => "DIAG_UV",
            Command::DiagCurr => "DIAG_CURR",
            Command::CsaGainFactor => "CSA_GAIN_FACTOR",
            Command::VcellOvTh => "VCELL_OV_TH",
            Command::VcellUvTh => "VCELL_UV_TH",
            Command::VcellSevereDeltaThrs => "VCELL_SEVERE_DELTA_THRS",
            Command::VcellBalUvDeltaTh => "VCELL_BAL_UV_DELTA_TH",
            Command::VbOvTh => "VB_OV_TH",
            Command::VbUvTh => "VB_UV_TH",
            Command::VbSumMaxDiffTh => "VB_SUM_MAX_DIFF_TH",
            Command::VntcOtTh => "VNTC_OT_TH",
            Command::VntcUtTh => "VNTC_UT_TH",
            Command::VntcSevereOtDeltaTh => "VNTC_SEVERE_OT_DELTA_TH",
            Command::OvcThresholds => "OVC_THRESHOLDS",
            Command::PersistentOvcThresholds => "PERSISTENT_OVC_THRESHOLDS",
            Command::ScThreshold => "SC_THRESHOLD",
            Command::ManufactureNameMsb => "MANUFACTURE_NAME_MSB",
            Command::ManufactureNameLsb => "MANUFACTURE_NAME_LSB",
            Command::ManufacturingDate => "MANUFACTURING_DATE",
            Command::FirstUsageDate => "FIRST_USAGE_DATE",
            Command::SerialNumberMsb => "SERIAL_NUMBER_MSB",
            Command::SerialNumberLsb => "SERIAL_NUMBER_LSB",
            Command::DeviceNameMsb => "DEVICE_NAME_MSB",
            Command::DeviceNameLsb => "DEVICE_NAME_LSB",
            Command::BalEnable => "BAL_ENABLE",
            Command::BalDisable => "BAL_DISABLE",
            Command::Nvm2Dl => "NVM_2_DL",
            Command::Nvm2Ul => "NVM_2_UL",
            Command::Go2Ship => "GO2SHIP",
            Command::Go2Stby => "GO2STBY",
            Command::FuseTrigDisarm => "FUSE_TRIG_DISARM",
            Command::FuseTrigArm => "FUSE_TRIG_ARM",
            Command::FuseTrigFireInterrupt => "FUSE_TRIG_FIRE_INTERRUPT",
            Command::FuseTrigFire => "FUSE_TRIG_FIRE",
        }
    }

    /// Table entry.
    pub const fn spec(self) -> CommandSpec {
        use CommandClass::*;
        use FieldId as F;

        let (register, class, codec) = match self {
            Command::Cfg2FiltersCycles => (reg::CFG2_ENABLES, Config, Codec::Single(F::Cfg2)),
            Command::ToPrdvBalMsk => (reg::TO_PRDV_BAL_MSK, Config, Codec::Single(F::PrdvBalMask)),
            Command::ToFuseRstMsk => (reg::TO_FUSE_RST_MSK, Config, Codec::Single(F::FuseRstMask)),
            Command::ToFaultnMsk => (reg::TO_FAULTN_MSK, Config, Codec::Single(F::FaultnMask)),
            Command::CurrMsk => (reg::CURR_MSK, Config, Codec::Single(F::CurrMask)),
            Command::DiagOvOtUt => (reg::DIAG_OV_OT_UT, Config, Codec::Single(F::Diag)),
            Command::DiagUv => (reg::DIAG_UV, Config, Codec::Single(F::Diag)),
            Command::DiagCurr => (reg::DIAG_CURR, Config, Codec::Single(F::Diag)),

            Command::CsaGainFactor => (reg::CSA_GAIN_FACTOR, Numeric, Codec::Single(F::CsaGain)),
            Command::VcellOvTh => (reg::VCELL_OV_TH, Numeric, Codec::Pair(F::VcellOv, F::VcellOvCount)),
            Command::VcellUvTh => (reg::VCELL_UV_TH, Numeric, Codec::Pair(F::VcellUv, F::VcellUvCount)),
            Command::VcellSevereDeltaThrs => {
                (reg::VCELL_SEVERE_DELTA_THRS, Numeric, Codec::Pair(F::SevereOvDelta, F::SevereUvDelta))
            }
            Command::VcellBalUvDeltaTh => {
                (reg::VCELL_BAL_UV_DELTA_TH, Numeric, Codec::Pair(F::BalUvDelta, F::BalUvCount))
            }
            Command::VbOvTh => (reg::VB_OV_TH, Numeric, Codec::Pair(F::VbOv, F::VbOvCount)),
            Command::VbUvTh => (reg::VB_UV_TH, Numeric, Codec::Pair(F::VbUv, F::VbUvCount)),
            Command::VbSumMaxDiffTh => (reg::VB_SUM_MAX_DIFF_TH, Numeric, Codec::Single(F::VbSumMaxDiff)),
            Command::VntcOtTh => (reg::VNTC_OT_TH, Numeric, Codec::Pair(F::VntcOt, F::VntcOtCount)),
            Command::VntcUtTh => (reg::VNTC_UT_TH, Numeric, Codec::Pair(F::VntcUt, F::VntcUtCount)),
            Command::VntcSevereOtDeltaTh => (reg::VNTC_SEVERE_OT_TH, Numeric, Codec::Single(F::VntcSevereOtDelta)),
            Command::OvcThresholds => (reg::OVC_THRESHOLDS, Numeric, Codec::Pair(F::OvcChg, F::OvcDchg)),
            Command::PersistentOvcThresholds => {
                (reg::PERSISTENT_OVC_THRESHOLDS, Numeric, Codec::Single(F::PersistentOvc))
            }
            Command::ScThreshold => (reg::SC_THRESHOLD, Numeric, Codec::Pair(F::Sc, F::ScPersist)),

            Command::ManufactureNameMsb => (reg::MANUFACTURER_NAME_MSB, Identity, Codec::Identity),
            Command::ManufactureNameLsb => (reg::MANUFACTURER_NAME_LSB, Identity, Codec::Identity),
            Command::ManufacturingDate => (reg::MANUFACTURING_DATE, Identity, Codec::Identity),
            Command::FirstUsageDate => (reg::FIRST_USAGE_DATE, Identity, Codec::Identity),
            Command::SerialNumberMsb => (reg::SERIAL_NUMBER_MSB, Identity, Codec::Identity),
            Command::SerialNumberLsb => (reg::SERIAL_NUMBER_LSB, Identity, Codec::Identity),
            Command::DeviceNameMsb => (reg::DEVICE_NAME_MSB, Identity, Codec::Identity),
            Command::DeviceNameLsb => (reg::DEVICE_NAME_LSB, Identity, Codec::Identity),

            Command::BalEnable => (reg::CELL_BAL, Realtime, Codec::Fixed(0x001f)),
            Command::BalDisable => (reg::CELL_BAL, Realtime, Codec::Fixed(0x0000)),
            Command::Nvm2Dl => (reg::NVM_CMD, Realtime, Codec::Fixed(reg::NVM_DOWNLOAD)),
            Command::Nvm2Ul => (reg::NVM_CMD, Realtime, Codec::Fixed(reg::NVM_UPLOAD)),
            Command::Go2Ship => (reg::GO2SHIP, Realtime, Codec::Fixed(0x2000)),
            Command::Go2Stby => (reg::GO2STBY, Realtime, Codec::Fixed(0x2000)),
            Command::FuseTrigDisarm => (reg::FUSE_TRIG_ARM, Realtime, Codec::Fixed(0x1000)),
            Command::FuseTrigArm => (reg::FUSE_TRIG_ARM, Realtime, Codec::Fixed(0x2000)),
            Command::FuseTrigFireInterrupt => (reg::FUSE_TRIG_FIRE, Realtime, Codec::Fixed(0x1000)),
            Command::FuseTrigFire => (reg::FUSE_TRIG_FIRE, Realtime, Codec::Fixed(0x2000)),
        };

        let settle_ms = match (class, register) {
            (_, reg::NVM_CMD) => NVM_SETTLE_MS,
            (Realtime, _) => 0,
            _ => CFG_SETTLE_MS,
        };

        CommandSpec { register, class, codec, settle_ms }
    }

    /// Class.
    pub const fn class(self) -> CommandClass {
        self.spec().class
    }

    /// Target register.
    pub const fn register(self) -> u8 {
        self.spec().register
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match Command::ALL.iter().find(|cmd| cmd.name() == s) {
            Some(cmd) => Ok(*cmd),
            None => {
                warn!("unknown command");
                Err(Error::UnknownCommand)
            }
        }
    }
}

/// Calibrated register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldId {
    Cfg2,
    PrdvBalMask,
    FuseRstMask,
    FaultnMask,
    CurrMask,
    Diag,
    CsaGain,
    VcellOv,
    VcellOvCount,
    VcellUv,
    VcellUvCount,
    SevereOvDelta,
    SevereUvDelta,
    BalUvDelta,
    BalUvCount,
    VbOv,
    VbOvCount,
    VbUv,
    VbUvCount,
    VbSumMaxDiff,
    VntcOt,
    VntcOtCount,
    VntcUt,
    VntcUtCount,
    VntcSevereOtDelta,
    OvcChg,
    OvcDchg,
    PersistentOvc,
    Sc,
    ScPersist,
}

/// Cell voltage threshold resolution in V.
const VCELL_TH_LSB: f32 = 16.0 * 0.00122;
/// Battery voltage threshold resolution in V.
const VB_TH_LSB: f32 = 16.0 * 0.0061;
/// NTC voltage resolution in V.
const VNTC_LSB: f32 = 0.000806;
/// Short circuit threshold at code 0 in V.
const SC_OFFSET_V: f32 = 0.04914;
/// Short circuit threshold resolution in V.
const SC_LSB_V: f32 = 0.01404;

impl FieldId {
    /// All fields.
    pub const ALL: [FieldId; 30] = [
        FieldId::Cfg2,
        FieldId::PrdvBalMask,
        FieldId::FuseRstMask,
        FieldId::FaultnMask,
        FieldId::CurrMask,
        FieldId::Diag,
        FieldId::CsaGain,
        FieldId::VcellOv,
        FieldId::VcellOvCount,
        FieldId::VcellUv,
        FieldId::VcellUvCount,
        FieldId::SevereOvDelta,
        FieldId::SevereUvDelta,
        FieldId::BalUvDelta,
        FieldId::BalUvCount,
        FieldId::VbOv,
        FieldId::VbOvCount,
        FieldId::VbUv,
        FieldId::VbUvCount,
        FieldId::VbSumMaxDiff,
        FieldId::VntcOt,
        FieldId::VntcOtCount,
        FieldId::VntcUt,
        FieldId::VntcUtCount,
        FieldId::VntcSevereOtDelta,
        FieldId::OvcChg,
        FieldId::OvcDchg,
        FieldId::PersistentOvc,
        FieldId::Sc,
        FieldId::ScPersist,
    ];

    /// Field definition for the given calibration.
    pub fn field(self, cal: &Calibration) -> Field {
        let i_max = cal.i_max();
        let r = cal.sense_resistor_ohm;

        match self {
            FieldId::Cfg2 => Field::raw(16).default_code(0x19ff),
            FieldId::PrdvBalMask => Field::raw(15).default_code(0x7fff),
            FieldId::FuseRstMask => Field::raw(7).default_code(0x007f),
            FieldId::FaultnMask => Field::raw(12).default_code(0x0fff),
            FieldId::CurrMask => Field::raw(12).default_code(0x0fff),
            FieldId::Diag => Field::raw(16),
            FieldId::CsaGain => Field::raw(16).default_code(0x8000),

            FieldId::VcellOv => Field::new(VCELL_TH_LSB, 0.0, 5.0, 8).default_code(0xe1),
            FieldId::VcellOvCount => Field::count(1, 15, 4).at(8).default_code(15),
            FieldId::VcellUv => Field::new(VCELL_TH_LSB, 2.0, 3.0, 8).default_code(0x70),
            FieldId::VcellUvCount => Field::count(3, 15, 4).at(8).default_code(15),
            FieldId::SevereOvDelta => Field::new(VCELL_TH_LSB, 2.0, 5.0, 8).default_code(0x0a),
            FieldId::SevereUvDelta => Field::new(VCELL_TH_LSB, 2.0, 5.0, 8).at(8).default_code(0x0a),
            FieldId::BalUvDelta => Field::new(VCELL_TH_LSB, 2.0, 5.0, 8).default_code(0),
            FieldId::BalUvCount => Field::count(3, 15, 4).at(8).default_code(15),

            FieldId::VbOv => Field::new(VB_TH_LSB, 0.0, 25.0, 8).default_code(0xeb),
            FieldId::VbOvCount => Field::count(0, 15, 4).at(8).default_code(15),
            FieldId::VbUv => Field::new(VB_TH_LSB, 0.0, 25.0, 8).default_code(0x70),
            FieldId::VbUvCount => Field::count(0, 15, 4).at(8).default_code(15),
            FieldId::VbSumMaxDiff => Field::new(VB_TH_LSB, 0.0, 25.0, 8).default_code(0x14),

            FieldId::VntcOt => Field::new(VNTC_LSB, 0.2, 3.3, 12).default_value(3.3),
            FieldId::VntcOtCount => Field::count(0, 15, 4).at(12).default_code(15),
            FieldId::VntcUt => Field::new(VNTC_LSB, 0.2, 3.3, 12).default_code(0),
            FieldId::VntcUtCount => Field::count(0, 15, 4).at(12).default_code(0),
            FieldId::VntcSevereOtDelta => Field::new(VNTC_LSB, 0.2, 3.3, 12).default_code(0),

            FieldId::OvcChg => Field::new(i_max / 255.0, 0.0, i_max, 8).default_value(i_max),
            FieldId::OvcDchg => Field::new(i_max / 255.0, 0.0, i_max, 8).at(8).default_value(i_max),
            FieldId::PersistentOvc => Field::new(i_max / 255.0, 0.0, i_max, 8).default_value(i_max),

            FieldId::Sc | FieldId::ScPersist => {
                let min = SC_OFFSET_V / r;
                let lsb = SC_LSB_V / r;
                let field = Field::new(lsb, min, min + 15.0 * lsb, 4).offset(min);
                let field = field.default_value(field.max);
                if self == FieldId::ScPersist {
                    field.at(4)
                } else {
                    field
                }
            }
        }
    }
}
