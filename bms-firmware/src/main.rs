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

//! Battery management firmware.

#![no_std]
#![no_main]

mod board;

use defmt_rtt as _;
use panic_probe as _;

use defmt::unwrap;
use l9961::{Clock, FreshnessTracker, L9961};
use stm32f1xx_hal::{
    gpio::{Alternate, Edge, ExtiPin, Input, OpenDrain, Pin, PullDown},
    i2c,
    i2c::I2c,
    pac::{I2C2, TIM4},
    prelude::*,
};
use systick_monotonic::{fugit::Rate, *};

use crate::app::monotonics;

/// Firmware version.
pub static VERSION: &[u8] = env!("CARGO_PKG_VERSION").as_bytes();

/// I2C 2 master.
type I2c2Master = i2c::BlockingI2c<I2C2, (Pin<'B', 10, Alternate<OpenDrain>>, Pin<'B', 11, Alternate<OpenDrain>>)>;

/// Delay with microsecond resolution.
pub type Delay = stm32f1xx_hal::timer::Delay<TIM4, 1_000_000>;

/// Battery management front end.
pub type Bms = L9961<I2c2Master, Delay>;

/// Conversion ready line of the L9961.
type RdyPin = Pin<'A', 0, Input<PullDown>>;

/// Completed conversions, fed from the RDY interrupt.
static TRACKER: FreshnessTracker = FreshnessTracker::new(board::L9961_CFG.conversion.validity_window());

/// Microsecond clock based on the system timer.
struct MonoClock;

impl Clock for MonoClock {
    fn now(&self) -> l9961::Instant {
        l9961::Instant::from_ticks(monotonics::now().duration_since_epoch().to_micros() as u32)
    }
}

#[rtic::app(device = stm32f1::stm32f103, peripherals = true, dispatchers = [SPI1, SPI2])]
mod app {
    use super::*;

    /// System timer.
    #[monotonic(binds = SysTick, default = true)]
    type MyMono = Systick<10_000>;

    /// Shared resources.
    #[shared]
    struct Shared {
        /// I2C 2 master.
        i2c2: I2c2Master,
        /// L9961 battery management front end.
        bms: Bms,
    }

    /// Exclusive resources.
    #[local]
    struct Local {
        /// Conversion ready line.
        rdy: RdyPin,
    }

    /// Initialization (entry point).
    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local, init::Monotonics) {
        defmt::info!("BMS firmware version {:a}", VERSION);

        // Create HAL objects.
        let rcc = cx.device.RCC.constrain();
        let mut flash = cx.device.FLASH.constrain();
        let mut afio = cx.device.AFIO.constrain();
        let clocks = rcc.cfgr.freeze(&mut flash.acr);
        let mono = Systick::new(cx.core.SYST, clocks.sysclk().to_Hz());
        let delay = cx.device.TIM4.delay_us(&clocks);
        let mut gpioa = cx.device.GPIOA.split();
        let mut gpiob = cx.device.GPIOB.split();

        // Initialize I2C bus 2 master.
        // Required for I2C timeouts to work.
        cx.core.DCB.enable_trace();
        cx.core.DWT.enable_cycle_counter();
        let scl = gpiob.pb10.into_alternate_open_drain(&mut gpiob.crh);
        let sda = gpiob.pb11.into_alternate_open_drain(&mut gpiob.crh);
        let mode = i2c::Mode::Standard { frequency: Rate::<u32, 1, 1>::Hz(100_000) };
        let i2c2 = I2c::i2c2(cx.device.I2C2, (scl, sda), mode, clocks).blocking_default(clocks);

        // Conversion ready interrupt.
        let mut rdy = gpioa.pa0.into_pull_down_input(&mut gpioa.crl);
        rdy.make_interrupt_source(&mut afio);
        rdy.trigger_on_edge(&mut cx.device.EXTI, Edge::Rising);
        rdy.clear_interrupt_pending_bit();
        rdy.enable_interrupt(&mut cx.device.EXTI);

        // Initialize L9961.
        let bms = L9961::new(board::L9961_CFG, delay);
        unwrap!(bms_periodic::spawn_after(100u64.millis()));
        unwrap!(coulomb_counter::spawn_after(board::COULOMB_INTERVAL_MS.millis()));

        defmt::info!("init done");
        (Shared { i2c2, bms }, Local { rdy }, init::Monotonics(mono))
    }

    /// Idle task.
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            // Sleep and wait for interrupt.
            rtic::export::wfi()
        }
    }

    /// L9961 periodic task.
    #[task(shared = [i2c2, bms])]
    fn bms_periodic(cx: bms_periodic::Context) {
        (cx.shared.i2c2, cx.shared.bms).lock(|i2c2, bms| {
            bms.periodic(i2c2, &TRACKER, &MonoClock);

            match bms.measurements() {
                Some(m) if m.is_trusted() => {
                    defmt::info!(
                        "pack {} V, sum {} V, current {} A, die {} °C",
                        m.pack.value,
                        m.cell_sum.value,
                        m.current.value,
                        m.die_temp.value
                    );
                }
                Some(m) => defmt::warn!("untrusted measurements: {:?}", m),
                None => (),
            }
        });

        unwrap!(bms_periodic::spawn_after(board::MEASURE_INTERVAL_MS.millis()));
    }

    /// Reads and logs the coulomb counter.
    #[task(shared = [i2c2, bms])]
    fn coulomb_counter(cx: coulomb_counter::Context) {
        (cx.shared.i2c2, cx.shared.bms).lock(|i2c2, bms| {
            if !bms.initialized() {
                return;
            }

            match bms.read_coulomb_counter(i2c2) {
                Ok(cc) if cc.is_complete() => {
                    defmt::info!("coulomb counter {} A over {} samples", cc.value.coulombs, cc.value.samples)
                }
                Ok(_) => defmt::warn!("coulomb counter read incomplete"),
                Err(err) => defmt::warn!("coulomb counter failed: {:?}", err),
            }
        });

        unwrap!(coulomb_counter::spawn_after(board::COULOMB_INTERVAL_MS.millis()));
    }

    /// Conversion ready edge of the L9961.
    #[task(binds = EXTI0, local = [rdy], priority = 2)]
    fn exti0(cx: exti0::Context) {
        cx.local.rdy.clear_interrupt_pending_bit();
        TRACKER.on_edge(MonoClock.now());
        defmt::trace!("L9961 conversion ready");
    }
}
