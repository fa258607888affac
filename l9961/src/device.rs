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

//! L9961 driver.

use core::marker::PhantomData;
use embedded_hal::blocking::{
    delay::{DelayMs, DelayUs},
    i2c,
};
use heapless::Vec;

use crate::{
    codec::{Arg, Calibration},
    command::{Codec, Command, CommandClass, CommandSpec, Dispatched},
    config::L9961Cfg,
    freshness::{Clock, FreshnessTracker},
    interlock::{ConversionState, Interlock},
    measure::{self, CoulombCount, Identity, Measurements},
    register as reg,
    transport::{self, Reading},
    Error, Result, MAX_CELLS,
};

/// L9961 battery management front end.
pub struct L9961<I2C, D> {
    cfg: L9961Cfg,
    interlock: Interlock,
    delay: D,
    initialized: bool,
    measurements: Option<Measurements>,
    _i2c: PhantomData<I2C>,
}

impl<I2C, D> L9961<I2C, D>
where
    I2C: i2c::Write<i2c::SevenBitAddress> + i2c::Read<i2c::SevenBitAddress>,
    D: DelayUs<u32> + DelayMs<u32>,
{
    /// Creates a new driver instance.
    ///
    /// The conversion state is unknown until the first transition.
    pub fn new(cfg: L9961Cfg, delay: D) -> Self {
        info!("L9961 at 0x{:02x} created", cfg.addr);

        Self {
            interlock: Interlock::new(cfg.conversion),
            cfg,
            delay,
            initialized: false,
            measurements: None,
            _i2c: PhantomData,
        }
    }

    /// Configuration.
    pub fn cfg(&self) -> &L9961Cfg {
        &self.cfg
    }

    /// Current sense calibration.
    pub fn calibration(&self) -> &Calibration {
        &self.cfg.calibration
    }

    /// Last known conversion state; `None` if indeterminate.
    pub fn conversion_state(&self) -> Option<ConversionState> {
        self.interlock.state()
    }

    /// Switches periodic conversion on or off.
    ///
    /// The register is written even if the device is already in the requested state.
    pub fn set_conversion_state(&mut self, i2c: &mut I2C, state: ConversionState) -> Result<()> {
        self.interlock.transition(i2c, self.cfg.addr, state)
    }

    /// Whether the last conversion batch is still within its validity window.
    pub fn is_data_valid(&self, tracker: &FreshnessTracker, clock: &impl Clock) -> bool {
        tracker.is_valid(clock.now())
    }

    fn spec_of(cmd: Command, class: CommandClass) -> Result<CommandSpec> {
        let spec = cmd.spec();
        if spec.class != class {
            warn!("{} is not a {:?} command", cmd.name(), class);
            return Err(Error::UnknownCommand);
        }
        Ok(spec)
    }

    fn encode(&self, spec: &CommandSpec, arg1: Arg, arg2: Option<Arg>) -> u16 {
        let cal = &self.cfg.calibration;
        match spec.codec {
            Codec::Fixed(value) => value,
            Codec::Identity => 0,
            Codec::Single(field) => field.field(cal).encode(arg1),
            Codec::Pair(lo, hi) => lo.field(cal).encode(arg1) | hi.field(cal).encode(arg2.unwrap_or(Arg::Min)),
        }
    }

    /// Halts conversion if necessary, writes the register and waits for the device to settle.
    fn dispatch(&mut self, i2c: &mut I2C, command: Command, spec: CommandSpec, value: u16) -> Result<Dispatched> {
        self.interlock.quiesce(i2c, self.cfg.addr)?;
        transport::write_register(i2c, self.cfg.addr, spec.register, value)?;

        if spec.settle_ms > 0 {
            self.delay.delay_ms(spec.settle_ms);
        }

        info!("{} sent: 0x{:02x} <- 0x{:04x}", command.name(), spec.register, value);
        Ok(Dispatched { command, register: spec.register, value })
    }

    /// Writes a configuration register.
    ///
    /// [`Arg::Default`] writes the shipped register value; a number is written as raw register value.
    pub fn send_config_command(&mut self, i2c: &mut I2C, cmd: Command, arg: Arg) -> Result<Dispatched> {
        let spec = Self::spec_of(cmd, CommandClass::Config)?;
        let value = self.encode(&spec, arg, None);
        self.dispatch(i2c, cmd, spec, value)
    }

    /// Writes an identity register.
    ///
    /// The value 0x0000 is reserved and rejected without bus traffic.
    pub fn send_identity_command(&mut self, i2c: &mut I2C, cmd: Command, value: u16) -> Result<Dispatched> {
        let spec = Self::spec_of(cmd, CommandClass::Identity)?;
        if value == 0 {
            warn!("identity value for {} must not be 0x0000", cmd.name());
            return Err(Error::ReservedIdentity);
        }
        self.dispatch(i2c, cmd, spec, value)
    }

    /// Writes a calibrated threshold register.
    ///
    /// Two-field registers take the second field from `arg2`, which defaults to [`Arg::Min`].
    /// Single-field registers ignore `arg2`.
    pub fn send_numerical_command(
        &mut self, i2c: &mut I2C, cmd: Command, arg1: Arg, arg2: Option<Arg>,
    ) -> Result<Dispatched> {
        let spec = Self::spec_of(cmd, CommandClass::Numeric)?;
        let value = self.encode(&spec, arg1, arg2);
        self.dispatch(i2c, cmd, spec, value)
    }

    /// Issues an immediate action command.
    pub fn send_realtime_command(&mut self, i2c: &mut I2C, cmd: Command) -> Result<Dispatched> {
        let spec = Self::spec_of(cmd, CommandClass::Realtime)?;
        let value = self.encode(&spec, Arg::Default, None);
        self.dispatch(i2c, cmd, spec, value)
    }

    fn read(&mut self, i2c: &mut I2C, reg: u8) -> Reading<u16> {
        transport::read_register(i2c, &mut self.delay, self.cfg.addr, reg)
    }

    fn read_u32(&mut self, i2c: &mut I2C, msb: u8, lsb: u8) -> Reading<u32> {
        let hi = self.read(i2c, msb);
        let lo = self.read(i2c, lsb);
        hi.zip(lo, |hi, lo| (u32::from(hi) << 16) | u32::from(lo))
    }

    /// Voltage of cell 1 to 5 in V.
    pub fn read_vcell(&mut self, i2c: &mut I2C, cell: u8) -> Result<Reading<f32>> {
        if cell == 0 || usize::from(cell) > MAX_CELLS {
            return Err(Error::InvalidCell);
        }
        Ok(self.read(i2c, reg::VCELL1_MEAS + cell - 1).map(|raw| measure::VCELL.decode(raw)))
    }

    /// Sum of cell voltages in V.
    pub fn read_vcell_sum(&mut self, i2c: &mut I2C) -> Reading<f32> {
        self.read(i2c, reg::VCELLSUM_MEAS).map(|raw| measure::VCELL_SUM.decode(raw))
    }

    /// Battery voltage in V.
    pub fn read_vb(&mut self, i2c: &mut I2C) -> Reading<f32> {
        self.read(i2c, reg::VB_MEAS).map(|raw| measure::VB.decode(raw))
    }

    /// NTC voltage in V.
    pub fn read_ntc(&mut self, i2c: &mut I2C) -> Reading<f32> {
        self.read(i2c, reg::NTC_GPIO_MEAS).map(|raw| measure::NTC.decode(raw))
    }

    /// Die temperature in °C.
    pub fn read_die_temp(&mut self, i2c: &mut I2C) -> Reading<f32> {
        self.read(i2c, reg::DIE_TEMP_MEAS).map(measure::die_temp)
    }

    /// Current in A.
    pub fn read_current(&mut self, i2c: &mut I2C) -> Reading<f32> {
        let cal = self.cfg.calibration;
        self.read(i2c, reg::CURR_MEAS).map(|raw| measure::current(&cal, raw))
    }

    /// Reads the coulomb counter.
    ///
    /// Conversion is halted during the read and switched on afterwards.
    pub fn read_coulomb_counter(&mut self, i2c: &mut I2C) -> Result<Reading<CoulombCount>> {
        self.interlock.transition(i2c, self.cfg.addr, ConversionState::Off)?;

        let msb = self.read(i2c, reg::CC_ACC_MSB);
        let lsb_cntr = self.read(i2c, reg::CC_ACC_LSB_CNTR);

        self.interlock.transition(i2c, self.cfg.addr, ConversionState::On)?;

        let cal = self.cfg.calibration;
        let cc = msb.zip(lsb_cntr, |msb, lsb_cntr| measure::coulomb_count(&cal, msb, lsb_cntr));
        debug!("coulomb counter: {} ({} samples)", cc.value.coulombs, cc.value.samples);
        Ok(cc)
    }

    /// Manufacturer name.
    pub fn read_manufacturer_name(&mut self, i2c: &mut I2C) -> Reading<u32> {
        self.read_u32(i2c, reg::MANUFACTURER_NAME_MSB_RD, reg::MANUFACTURER_NAME_LSB_RD)
    }

    /// Manufacturing date.
    pub fn read_manufacturing_date(&mut self, i2c: &mut I2C) -> Reading<u16> {
        self.read(i2c, reg::MANUFACTURING_DATE_RD)
    }

    /// First usage date.
    pub fn read_first_usage_date(&mut self, i2c: &mut I2C) -> Reading<u16> {
        self.read(i2c, reg::FIRST_USAGE_DATE_RD)
    }

    /// Serial number.
    pub fn read_serial_number(&mut self, i2c: &mut I2C) -> Reading<u32> {
        self.read_u32(i2c, reg::SERIAL_NUMBER_MSB_RD, reg::SERIAL_NUMBER_LSB_RD)
    }

    /// Device name.
    pub fn read_device_name(&mut self, i2c: &mut I2C) -> Reading<u32> {
        self.read_u32(i2c, reg::DEVICE_NAME_MSB_RD, reg::DEVICE_NAME_LSB_RD)
    }

    /// Reads the complete identity block.
    pub fn read_identity(&mut self, i2c: &mut I2C) -> Reading<Identity> {
        let manufacturer_name = self.read_manufacturer_name(i2c);
        let manufacturing_date = self.read_manufacturing_date(i2c);
        let first_usage_date = self.read_first_usage_date(i2c);
        let serial_number = self.read_serial_number(i2c);
        let device_name = self.read_device_name(i2c);

        let status = manufacturer_name
            .status
            .and(manufacturing_date.status)
            .and(first_usage_date.status)
            .and(serial_number.status)
            .and(device_name.status);

        Reading {
            value: Identity {
                manufacturer_name: manufacturer_name.value,
                manufacturing_date: manufacturing_date.value,
                first_usage_date: first_usage_date.value,
                serial_number: serial_number.value,
                device_name: device_name.value,
            },
            status,
        }
    }

    /// Reads a batch of measurements.
    ///
    /// The batch is fresh if the validity window still holds after the last register was read
    /// and no new conversion completed in between.
    pub fn read_measurements(&mut self, i2c: &mut I2C, tracker: &FreshnessTracker, clock: &impl Clock) -> Measurements {
        let edges = tracker.edges();

        let n = usize::from(self.cfg.conversion.cells).min(MAX_CELLS);
        let mut cells = Vec::new();
        for i in 0..n {
            let cell = self.read(i2c, reg::VCELL1_MEAS + i as u8).map(|raw| measure::VCELL.decode(raw));
            if cells.push(cell).is_err() {
                break;
            }
        }

        let cell_sum = self.read_vcell_sum(i2c);
        let pack = self.read_vb(i2c);
        let ntc = self.read_ntc(i2c);
        let die_temp = self.read_die_temp(i2c);
        let current = self.read_current(i2c);

        let fresh = tracker.is_valid(clock.now()) && tracker.edges() == edges;
        if !fresh {
            warn!("L9961 measurement batch is stale");
        }

        Measurements { cells, cell_sum, pack, ntc, die_temp, current, fresh }
    }

    /// Brings the device into its configured state and starts conversion.
    pub fn configure(&mut self, i2c: &mut I2C) -> Result<()> {
        info!("L9961 configure");

        if self.cfg.nvm_restore {
            debug!("restoring L9961 registers from NVM");
            self.send_realtime_command(i2c, Command::Nvm2Ul)?;
        } else {
            for step in self.cfg.setup {
                debug!("L9961 setup: {}", step.command.name());
                match step.command.class() {
                    CommandClass::Config => self.send_config_command(i2c, step.command, step.arg1)?,
                    CommandClass::Numeric => self.send_numerical_command(i2c, step.command, step.arg1, step.arg2)?,
                    _ => {
                        warn!("{} is not allowed in setup", step.command.name());
                        return Err(Error::UnknownCommand);
                    }
                };
            }
        }

        self.set_conversion_state(i2c, ConversionState::On)?;
        self.initialized = true;

        info!("L9961 initialized");
        Ok(())
    }

    /// Whether the device has been configured.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Last batch read by [`periodic`](Self::periodic).
    pub fn measurements(&self) -> Option<&Measurements> {
        self.measurements.as_ref()
    }

    fn do_periodic(&mut self, i2c: &mut I2C, tracker: &FreshnessTracker, clock: &impl Clock) -> Result<()> {
        if !self.initialized {
            self.configure(i2c)?;
        }

        let measurements = self.read_measurements(i2c, tracker, clock);
        debug!("L9961 measurements: {:?}", &measurements);
        let complete = measurements.is_complete();
        self.measurements = Some(measurements);

        // A failed read may mean the device was power cycled and lost its setup.
        if !complete {
            warn!("L9961 measurement batch is incomplete");
            return Err(Error::I2c);
        }

        Ok(())
    }

    /// Call this periodically (approx. every second) to handle communication with the device.
    pub fn periodic(&mut self, i2c: &mut I2C, tracker: &FreshnessTracker, clock: &impl Clock) {
        if let Err(err) = self.do_periodic(i2c, tracker, clock) {
            warn!("L9961 failed: {:?}", err);
            self.initialized = false;
        }
    }
}
