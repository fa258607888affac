//! Driver configuration.

use crate::{
    codec::{Arg, Calibration},
    command::Command,
    interlock::ConversionCfg,
    DEFAULT_ADDR,
};

/// One command of the setup sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupStep {
    /// Config or numeric command.
    pub command: Command,
    /// First argument.
    pub arg1: Arg,
    /// Second argument of two-field registers.
    pub arg2: Option<Arg>,
}

impl SetupStep {
    /// Step writing the defaults of all fields.
    pub const fn defaults(command: Command) -> Self {
        Self { command, arg1: Arg::Default, arg2: Some(Arg::Default) }
    }

    /// Step with explicit arguments.
    pub const fn new(command: Command, arg1: Arg, arg2: Option<Arg>) -> Self {
        Self { command, arg1, arg2 }
    }
}

/// Every config and numeric register at its default.
pub const DEFAULT_SETUP: &[SetupStep] = &[
    SetupStep::defaults(Command::Cfg2FiltersCycles),
    SetupStep::defaults(Command::CsaGainFactor),
    SetupStep::defaults(Command::VcellOvTh),
    SetupStep::defaults(Command::VcellUvTh),
    SetupStep::defaults(Command::VcellSevereDeltaThrs),
    SetupStep::defaults(Command::VcellBalUvDeltaTh),
    SetupStep::defaults(Command::VbOvTh),
    SetupStep::defaults(Command::VbUvTh),
    SetupStep::defaults(Command::VbSumMaxDiffTh),
    SetupStep::defaults(Command::VntcOtTh),
    SetupStep::defaults(Command::VntcUtTh),
    SetupStep::defaults(Command::VntcSevereOtDeltaTh),
    SetupStep::defaults(Command::OvcThresholds),
    SetupStep::defaults(Command::PersistentOvcThresholds),
    SetupStep::defaults(Command::ScThreshold),
    SetupStep::defaults(Command::ToPrdvBalMsk),
    SetupStep::defaults(Command::ToFuseRstMsk),
    SetupStep::defaults(Command::ToFaultnMsk),
    SetupStep::defaults(Command::CurrMsk),
    SetupStep::defaults(Command::DiagOvOtUt),
    SetupStep::defaults(Command::DiagUv),
    SetupStep::defaults(Command::DiagCurr),
];

/// L9961 configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct L9961Cfg {
    /// I2C address.
    pub addr: u8,
    /// Current sense calibration.
    pub calibration: Calibration,
    /// Conversion settings used when switching conversion on.
    pub conversion: ConversionCfg,
    /// Restore registers from non-volatile memory instead of running the setup sequence.
    pub nvm_restore: bool,
    /// Setup sequence.
    pub setup: &'static [SetupStep],
}

impl L9961Cfg {
    /// Default address, 8 mΩ shunt, longest conversion cycle and all registers at their defaults.
    pub const DEFAULT: Self = Self {
        addr: DEFAULT_ADDR,
        calibration: Calibration::DEFAULT,
        conversion: ConversionCfg::MAX,
        nvm_restore: false,
        setup: DEFAULT_SETUP,
    };
}

impl Default for L9961Cfg {
    fn default() -> Self {
        Self::DEFAULT
    }
}
