//! Board.

use l9961::{Arg, Calibration, Command, ConversionCfg, L9961Cfg, SetupStep, DEFAULT_ADDR};

/// Interval of the measurement task in ms.
pub const MEASURE_INTERVAL_MS: u64 = 1_000;

/// Interval of the coulomb counter task in ms.
pub const COULOMB_INTERVAL_MS: u64 = 10_000;

/// Limits of a 5S lithium-ion pack.
const SETUP: &[SetupStep] = &[
    SetupStep::defaults(Command::Cfg2FiltersCycles),
    SetupStep::defaults(Command::CsaGainFactor),
    SetupStep::new(Command::VcellOvTh, Arg::Value(4.25), Some(Arg::Default)),
    SetupStep::new(Command::VcellUvTh, Arg::Value(2.8), Some(Arg::Default)),
    SetupStep::defaults(Command::VcellSevereDeltaThrs),
    SetupStep::defaults(Command::VcellBalUvDeltaTh),
    SetupStep::new(Command::VbOvTh, Arg::Value(21.25), Some(Arg::Default)),
    SetupStep::new(Command::VbUvTh, Arg::Value(14.0), Some(Arg::Default)),
    SetupStep::defaults(Command::VbSumMaxDiffTh),
    SetupStep::defaults(Command::VntcOtTh),
    SetupStep::defaults(Command::VntcUtTh),
    SetupStep::defaults(Command::VntcSevereOtDeltaTh),
    SetupStep::new(Command::OvcThresholds, Arg::Value(20.0), Some(Arg::Value(25.0))),
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

/// L9961 on I2C 2.
pub const L9961_CFG: L9961Cfg = L9961Cfg {
    addr: DEFAULT_ADDR,
    calibration: Calibration::DEFAULT,
    conversion: ConversionCfg::MAX,
    nvm_restore: false,
    setup: SETUP,
};
