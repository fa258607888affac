mod common;

use common::{bms, Op, Wait};
use l9961::{Arg, Command, ConversionState, Dispatched, Error, DEFAULT_ADDR};

#[test]
fn cell_overvoltage_at_max_packs_full_register() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    i2c.clear();

    let cmd: Command = "VCELL_OV_TH".parse().unwrap();
    let arg1: Arg = "max".parse().unwrap();
    let arg2: Arg = "max".parse().unwrap();
    let sent = bms.send_numerical_command(&mut i2c, cmd, arg1, Some(arg2)).unwrap();

    assert_eq!(sent, Dispatched { command: Command::VcellOvTh, register: 0x06, value: 0x0fff });
    assert_eq!(i2c.writes(), vec![(0x06, 0x0fff)]);
}

#[test]
fn write_is_single_framed_transaction() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    i2c.clear();

    bms.send_identity_command(&mut i2c, Command::SerialNumberMsb, 0xbeef).unwrap();

    assert_eq!(i2c.ops, vec![Op::Write { addr: DEFAULT_ADDR, bytes: vec![0x1b, 0xbe, 0xef] }]);
}

#[test]
fn command_while_converting_halts_conversion_once() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();
    i2c.clear();

    bms.send_numerical_command(&mut i2c, Command::VbOvTh, Arg::Default, Some(Arg::Default)).unwrap();
    assert_eq!(i2c.writes(), vec![(0x02, 0x0000), (0x0a, 0x0feb)]);
    assert_eq!(bms.conversion_state(), Some(ConversionState::Off));

    i2c.clear();
    bms.send_numerical_command(&mut i2c, Command::VbUvTh, Arg::Default, Some(Arg::Default)).unwrap();
    assert_eq!(i2c.writes(), vec![(0x0b, 0x0f70)]);
}

#[test]
fn every_class_halts_conversion_first() {
    let cases: [(Command, u8); 4] = [
        (Command::Cfg2FiltersCycles, 0x04),
        (Command::VcellUvTh, 0x07),
        (Command::DeviceNameLsb, 0x1e),
        (Command::BalEnable, 0x01),
    ];

    for (cmd, register) in cases {
        let (mut bms, mut i2c, _) = bms();
        bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();
        i2c.clear();

        let sent = match cmd.class() {
            l9961::CommandClass::Config => bms.send_config_command(&mut i2c, cmd, Arg::Default),
            l9961::CommandClass::Numeric => bms.send_numerical_command(&mut i2c, cmd, Arg::Max, None),
            l9961::CommandClass::Identity => bms.send_identity_command(&mut i2c, cmd, 0x0042),
            l9961::CommandClass::Realtime => bms.send_realtime_command(&mut i2c, cmd),
        }
        .unwrap();

        let writes = i2c.writes();
        assert_eq!(writes.len(), 2, "{}", cmd.name());
        assert_eq!(writes[0], (0x02, 0x0000), "{}", cmd.name());
        assert_eq!(writes[1], (register, sent.value), "{}", cmd.name());
    }
}

#[test]
fn unknown_state_is_halted_before_first_command() {
    let (mut bms, mut i2c, _) = bms();
    assert_eq!(bms.conversion_state(), None);

    bms.send_realtime_command(&mut i2c, Command::BalEnable).unwrap();
    assert_eq!(i2c.writes(), vec![(0x02, 0x0000), (0x01, 0x001f)]);
}

#[test]
fn conversion_transitions_always_write() {
    let (mut bms, mut i2c, _) = bms();

    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();

    assert_eq!(i2c.writes(), vec![(0x02, 0x0000), (0x02, 0x0000), (0x02, 0x0fff), (0x02, 0x0fff)]);
    assert_eq!(bms.conversion_state(), Some(ConversionState::On));
}

#[test]
fn zero_identity_is_rejected_without_traffic() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();
    i2c.clear();

    assert_eq!(bms.send_identity_command(&mut i2c, Command::ManufacturingDate, 0x0000), Err(Error::ReservedIdentity));
    assert!(i2c.ops.is_empty());
    assert_eq!(bms.conversion_state(), Some(ConversionState::On));
}

#[test]
fn wrong_class_is_rejected_without_traffic() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();
    i2c.clear();

    assert_eq!(bms.send_config_command(&mut i2c, Command::VcellOvTh, Arg::Default), Err(Error::UnknownCommand));
    assert_eq!(bms.send_numerical_command(&mut i2c, Command::Nvm2Dl, Arg::Max, None), Err(Error::UnknownCommand));
    assert_eq!(bms.send_identity_command(&mut i2c, Command::BalEnable, 1), Err(Error::UnknownCommand));
    assert_eq!(bms.send_realtime_command(&mut i2c, Command::DiagUv), Err(Error::UnknownCommand));
    assert!(i2c.ops.is_empty());
    assert_eq!(bms.conversion_state(), Some(ConversionState::On));
}

#[test]
fn unknown_names_are_rejected() {
    assert_eq!("CFG1_FILTERS_CYCLES".parse::<Command>(), Err(Error::UnknownCommand));
    assert_eq!("CONVERSION_MAYBE".parse::<ConversionState>(), Err(Error::UnknownCommand));
    assert_eq!("lots".parse::<Arg>(), Err(Error::InvalidArgument));
}

#[test]
fn failed_conversion_write_makes_state_unknown() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::On).unwrap();

    i2c.nak_writes.insert(0x02);
    assert_eq!(bms.send_numerical_command(&mut i2c, Command::VcellOvTh, Arg::Max, None), Err(Error::I2c));
    assert_eq!(bms.conversion_state(), None);
    assert!(!i2c.writes().iter().any(|&(reg, _)| reg == 0x06));

    i2c.nak_writes.clear();
    i2c.clear();
    bms.send_numerical_command(&mut i2c, Command::VcellOvTh, Arg::Max, None).unwrap();
    assert_eq!(i2c.writes(), vec![(0x02, 0x0000), (0x06, 0x01ff)]);
}

#[test]
fn failed_register_write_is_reported() {
    let (mut bms, mut i2c, _) = bms();
    i2c.nak_writes.insert(0x10);

    assert_eq!(
        bms.send_numerical_command(&mut i2c, Command::OvcThresholds, Arg::Max, Some(Arg::Max)),
        Err(Error::I2c)
    );
    assert_eq!(bms.conversion_state(), Some(ConversionState::Off));
}

#[test]
fn missing_second_argument_selects_minimum() {
    let (mut bms, mut i2c, _) = bms();

    let sent = bms.send_numerical_command(&mut i2c, Command::VcellUvTh, Arg::Max, None).unwrap();
    // 3.0 V / 19.52 mV rounds to 154, count at its minimum of 3.
    assert_eq!(sent.value, 0x039a);

    let sent = bms.send_numerical_command(&mut i2c, Command::CsaGainFactor, Arg::Value(1234.0), Some(Arg::Max)).unwrap();
    assert_eq!(sent.value, 1234);
}

#[test]
fn numeric_arguments_are_clamped() {
    let (mut bms, mut i2c, _) = bms();

    let sent = bms.send_numerical_command(&mut i2c, Command::VcellOvTh, Arg::Value(-3.0), Some(Arg::Value(99.0))).unwrap();
    assert_eq!(sent.value, 0x0f00);

    let sent = bms.send_numerical_command(&mut i2c, Command::VntcOtTh, Arg::Value(1e30), Some(Arg::Value(-1.0))).unwrap();
    assert_eq!(sent.value, 0x0ffe);

    let sent = bms.send_numerical_command(&mut i2c, Command::ScThreshold, Arg::Value(0.0), Some(Arg::Max)).unwrap();
    assert_eq!(sent.value, 0x00f0);
}

#[test]
fn config_defaults_and_raw_values() {
    let (mut bms, mut i2c, _) = bms();

    assert_eq!(bms.send_config_command(&mut i2c, Command::Cfg2FiltersCycles, Arg::Default).unwrap().value, 0x19ff);
    assert_eq!(bms.send_config_command(&mut i2c, Command::ToFuseRstMsk, Arg::Max).unwrap().value, 0x007f);
    assert_eq!(bms.send_config_command(&mut i2c, Command::CurrMsk, Arg::Value(0x0123 as f32)).unwrap().value, 0x0123);
    assert_eq!(bms.send_config_command(&mut i2c, Command::DiagCurr, Arg::Default).unwrap().value, 0x0000);
}

#[test]
fn realtime_payloads() {
    let (mut bms, mut i2c, _) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    i2c.clear();

    for cmd in [
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
    ] {
        bms.send_realtime_command(&mut i2c, cmd).unwrap();
    }

    assert_eq!(
        i2c.writes(),
        vec![
            (0x01, 0x001f),
            (0x01, 0x0000),
            (0x20, 0xaaaa),
            (0x20, 0x5555),
            (0x21, 0x2000),
            (0x22, 0x2000),
            (0x23, 0x1000),
            (0x23, 0x2000),
            (0x24, 0x1000),
            (0x24, 0x2000),
        ]
    );
}

#[test]
fn writes_wait_for_device() {
    let (mut bms, mut i2c, delay) = bms();
    bms.set_conversion_state(&mut i2c, ConversionState::Off).unwrap();
    delay.take();

    bms.send_config_command(&mut i2c, Command::DiagUv, Arg::Default).unwrap();
    assert_eq!(delay.take(), vec![Wait::Ms(10)]);

    bms.send_realtime_command(&mut i2c, Command::Nvm2Ul).unwrap();
    assert_eq!(delay.take(), vec![Wait::Ms(100)]);

    bms.send_realtime_command(&mut i2c, Command::BalDisable).unwrap();
    assert!(delay.take().is_empty());
}
