#![no_std]
#![no_main]

use arduino_hal::default_serial;
use arduino_hal::prelude::*;
use arduino_hal::spi;
use embedded_hal::spi::{Mode, Phase, Polarity};
use panic_halt as _;
use rc522_kiosk::{CardReader, Config, InitError, KNOWN_VERSIONS};

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
        clock: spi::SerialClockRate::OscfOver128,
    };

    let sclk = pins.d13.into_output();
    let mosi = pins.d11.into_output();
    let miso = pins.d12.into_pull_up_input();
    let cs = pins.d10.into_output();
    let (spi, cs_pin) = spi::Spi::new(dp.SPI, sclk, mosi, miso, cs, settings);

    let rst = pins.d9.into_output(); // Reset pin

    let mut rfid = CardReader::new(spi, cs_pin, rst, arduino_hal::Delay::new(), Config::new())
        .with_log(serial);

    match rfid.initialize() {
        Ok(()) => {
            ufmt::uwriteln!(rfid.log_mut(), "MFRC522 communication is OK").ok();
        }
        Err(InitError::UnknownVersion(version)) => {
            ufmt::uwriteln!(rfid.log_mut(), "Unexpected version 0x{:02X}, expected one of:", version).ok();
            for known in KNOWN_VERSIONS {
                ufmt::uwriteln!(rfid.log_mut(), "  0x{:02X}", known).ok();
            }
        }
        Err(e) => {
            ufmt::uwriteln!(rfid.log_mut(), "MFRC522 communication error: {:?}", e).ok();
        }
    }

    loop {}
}
