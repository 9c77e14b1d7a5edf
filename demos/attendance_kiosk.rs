#![no_std]
#![no_main]

use arduino_hal::default_serial;
use arduino_hal::prelude::*;
use arduino_hal::spi;
use embedded_hal::spi::{Mode, Phase, Polarity};
use panic_halt as _;
use rc522_kiosk::{CardReader, Config, Uid};
use ufmt::uwriteln;

const POLL_INTERVAL_MS: u32 = 100;
// one tap, one check-in
const REPEAT_GUARD_MS: u32 = 2000;

#[arduino_hal::entry]
fn main() -> ! {
    let dp = arduino_hal::Peripherals::take().unwrap();
    let pins = arduino_hal::pins!(dp);

    let serial = default_serial!(dp, pins, 9600);

    let settings = spi::Settings {
        data_order: spi::DataOrder::MostSignificantFirst,
        mode: Mode {
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
        },
        clock: spi::SerialClockRate::OscfOver64,
    };

    let sclk = pins.d13.into_output();
    let mosi = pins.d11.into_output();
    let miso = pins.d12.into_pull_up_input();
    let cs = pins.d10.into_output();
    let (spi, cs_pin) = spi::Spi::new(dp.SPI, sclk, mosi, miso, cs, settings);

    let rst = pins.d9.into_output();

    let mut rfid = CardReader::new(spi, cs_pin, rst, arduino_hal::Delay::new(), Config::new())
        .with_log(serial);

    if let Err(e) = rfid.initialize() {
        uwriteln!(rfid.log_mut(), "Reader init failed: {:?}", e).ok();
        loop {
            arduino_hal::delay_ms(1000);
        }
    }
    uwriteln!(rfid.log_mut(), "Tap a card").ok();

    loop {
        if let Some(uid) = rfid.poll_for_card() {
            let uid = Uid::from(uid);
            let failed = rfid.diagnostics().failed;
            uwriteln!(rfid.log_mut(), "Check-in: {} (failed reads: {})", uid, failed).ok();
            arduino_hal::delay_ms(REPEAT_GUARD_MS);
        }
        arduino_hal::delay_ms(POLL_INTERVAL_MS);
    }
}
