//! Fake I2C bus, delay and clock.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use embedded_hal::blocking::{
    delay::{DelayMs, DelayUs},
    i2c,
};
use l9961::{Clock, FreshnessTracker, Instant, L9961Cfg, L9961};

/// Bus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write { addr: u8, bytes: Vec<u8> },
    Read { addr: u8, len: usize },
}

/// Bus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nak;

/// Simulated L9961 on an I2C bus.
///
/// Register writes are recorded but not stored, since the readable and writable
/// register banks of the device differ.
#[derive(Default)]
pub struct FakeI2c {
    /// All attempted transactions.
    pub ops: Vec<Op>,
    /// Readable register contents.
    pub regs: HashMap<u8, u16>,
    /// Register writes to these registers are not acknowledged.
    pub nak_writes: HashSet<u8>,
    /// Reads of these registers return no data.
    pub short_reads: HashSet<u8>,
    /// No transaction is acknowledged.
    pub offline: bool,
    pointer: Option<u8>,
}

impl FakeI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register writes `(register, value)` in order.
    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write { bytes, .. } if bytes.len() == 3 => {
                    Some((bytes[0], u16::from_be_bytes([bytes[1], bytes[2]])))
                }
                _ => None,
            })
            .collect()
    }

    /// Registers addressed for reading, in order.
    pub fn reads(&self) -> Vec<u8> {
        let mut reads = Vec::new();
        let mut pointer = None;
        for op in &self.ops {
            match op {
                Op::Write { bytes, .. } if bytes.len() == 1 => pointer = Some(bytes[0]),
                Op::Read { .. } => reads.extend(pointer.take()),
                _ => (),
            }
        }
        reads
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl i2c::Write for FakeI2c {
    type Error = Nak;

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Nak> {
        self.ops.push(Op::Write { addr, bytes: bytes.to_vec() });

        if self.offline || addr != l9961::DEFAULT_ADDR {
            return Err(Nak);
        }
        match bytes {
            [reg] => {
                self.pointer = Some(*reg);
                Ok(())
            }
            [reg, _, _] if self.nak_writes.contains(reg) => Err(Nak),
            [_, _, _] => Ok(()),
            _ => Err(Nak),
        }
    }
}

impl i2c::Read for FakeI2c {
    type Error = Nak;

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Nak> {
        self.ops.push(Op::Read { addr, len: buffer.len() });

        let reg = self.pointer.take().ok_or(Nak)?;
        if self.offline || self.short_reads.contains(&reg) {
            return Err(Nak);
        }
        let value = self.regs.get(&reg).copied().unwrap_or_default();
        buffer.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// Requested wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Us(u32),
    Ms(u32),
}

/// Delay that records requested waits without waiting.
#[derive(Clone, Default)]
pub struct FakeDelay {
    pub waits: Rc<RefCell<Vec<Wait>>>,
}

impl FakeDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Wait> {
        self.waits.borrow_mut().drain(..).collect()
    }
}

impl DelayUs<u32> for FakeDelay {
    fn delay_us(&mut self, us: u32) {
        self.waits.borrow_mut().push(Wait::Us(us));
    }
}

impl DelayMs<u32> for FakeDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.waits.borrow_mut().push(Wait::Ms(ms));
    }
}

/// Manually advanced clock.
#[derive(Default)]
pub struct FakeClock {
    now: Cell<u32>,
}

impl FakeClock {
    pub fn at(us: u32) -> Self {
        Self { now: Cell::new(us) }
    }

    pub fn set(&self, us: u32) {
        self.now.set(us);
    }

    pub fn advance(&self, us: u32) {
        self.now.set(self.now.get().wrapping_add(us));
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.now.get())
    }
}

/// Clock that lets a conversion complete whenever it is queried.
pub struct EdgeOnQuery<'a> {
    pub tracker: &'a FreshnessTracker,
    pub now: u32,
}

impl Clock for EdgeOnQuery<'_> {
    fn now(&self) -> Instant {
        let now = Instant::from_ticks(self.now);
        self.tracker.on_edge(now);
        now
    }
}

pub type Bms = L9961<FakeI2c, FakeDelay>;

/// Driver with default configuration.
pub fn bms() -> (Bms, FakeI2c, FakeDelay) {
    bms_with(L9961Cfg::DEFAULT)
}

/// Driver with given configuration.
pub fn bms_with(cfg: L9961Cfg) -> (Bms, FakeI2c, FakeDelay) {
    let delay = FakeDelay::new();
    (L9961::new(cfg, delay.clone()), FakeI2c::new(), delay)
}
