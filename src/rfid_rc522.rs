use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use ufmt::{uWrite, uwriteln};

use crate::card_types::{Card, Uid};
use crate::commands::{picc, AuthKey, Command, RequestMode};
use crate::config::{AntennaGain, Config};
use crate::cs_pin_wrapper::CsPinWrapper;
use crate::diagnostics::{Diagnostics, NoLog};
use crate::errors::{Error, InitError, TransportFault};
use crate::registers::*;

/// VersionReg values of the silicon revisions this driver talks to.
pub const KNOWN_VERSIONS: [u8; 5] = [0x88, 0x90, 0x91, 0x92, 0xB2];

/// ComIrqReg polls before an exchange gives up on the chip.
pub const EXCHANGE_POLL_LIMIT: u16 = 2000;
/// DivIrqReg polls before a CRC calculation gives up.
pub const CRC_POLL_LIMIT: u16 = 0xFF;

// TxLastBits values of BitFramingReg
const SHORT_FRAME: u8 = 0x07;
const FULL_BYTES: u8 = 0x00;

const ATQA_BITS: usize = 16;
const ANTICOLL_BITS: usize = 40;
const SAK_BITS: usize = 24;
const BLOCK_BITS: usize = 18 * 8;
const ACK_BITS: usize = 4;

/// Bytes drained from the FIFO after a Transceive and the exact number of
/// bits the chip received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub data: heapless::Vec<u8, FIFO_DEPTH>,
    pub bits: usize,
}

/// RC522 driver.
///
/// Every call is blocking but bounded by a fixed number of register polls.
/// The reader keeps no tag state between polls, only outcome counters.
pub struct CardReader<SPI, CS, RST, D, W = NoLog> {
    spi: SPI,
    cs: CsPinWrapper<CS>,
    reset: RST,
    delay: D,
    log: W,
    config: Config,
    diagnostics: Diagnostics,
}

impl<SPI, CS, RST, D> CardReader<SPI, CS, RST, D, NoLog> {
    pub fn new(spi: SPI, cs: CS, reset: RST, delay: D, config: Config) -> Self {
        CardReader {
            spi,
            cs: CsPinWrapper::new(cs),
            reset,
            delay,
            log: NoLog,
            config,
            diagnostics: Diagnostics::default(),
        }
    }
}

impl<SPI, CS, RST, D, W> CardReader<SPI, CS, RST, D, W> {
    /// Sends log lines to `log`, typically the board's serial port.
    pub fn with_log<L: uWrite>(self, log: L) -> CardReader<SPI, CS, RST, D, L> {
        CardReader {
            spi: self.spi,
            cs: self.cs,
            reset: self.reset,
            delay: self.delay,
            log,
            config: self.config,
            diagnostics: self.diagnostics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The log sink, for callers that share it with the driver.
    pub fn log_mut(&mut self) -> &mut W {
        &mut self.log
    }

    pub fn release(self) -> (SPI, CS, RST, D) {
        (self.spi, self.cs.release(), self.reset, self.delay)
    }
}

impl<SPI, CS, RST, D, W> CardReader<SPI, CS, RST, D, W>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    RST: OutputPin,
    D: DelayNs,
    W: uWrite,
{
    /// Hard and soft reset, version check, then timer, modulation and
    /// antenna setup. An unknown version means no chip or bad wiring.
    pub fn initialize(&mut self) -> Result<(), InitError> {
        let config = self.config;

        self.cs.set_high()?;
        self.reset.set_low().map_err(TransportFault::pin)?;
        self.delay.delay_ms(config.reset_settle_ms);
        self.reset.set_high().map_err(TransportFault::pin)?;
        self.delay.delay_ms(config.reset_settle_ms);

        self.write_register(Register::Command, Command::SoftReset.code())?;
        self.delay.delay_ms(config.reset_settle_ms);

        let version = self.read_register(Register::Version)?;
        if !KNOWN_VERSIONS.contains(&version) {
            uwriteln!(&mut self.log, "RC522 not found, version 0x{:02X}", version).ok();
            return Err(InitError::UnknownVersion(version));
        }
        uwriteln!(&mut self.log, "RC522 version: 0x{:02X}", version).ok();

        let [reload_high, reload_low] = config.timer_reload.to_be_bytes();
        self.write_register(Register::TMode, config.timer_mode)?;
        self.write_register(Register::TPrescaler, config.timer_prescaler)?;
        self.write_register(Register::TReloadHigh, reload_high)?;
        self.write_register(Register::TReloadLow, reload_low)?;
        self.write_register(Register::TxAsk, config.tx_ask)?;
        self.write_register(Register::Mode, config.mode)?;
        self.write_register(Register::RxMode, 0x00)?;
        self.write_register(Register::TxMode, 0x00)?;

        self.antenna_on()?;
        self.set_antenna_gain(config.antenna_gain)?;
        uwriteln!(
            &mut self.log,
            "Antenna gain set to 0x{:02X}",
            config.antenna_gain.register_value()
        )
        .ok();
        Ok(())
    }

    pub fn version(&mut self) -> Result<u8, TransportFault> {
        self.read_register(Register::Version)
    }

    /// Polls once for a tag. `None` covers both an empty field and a failed
    /// exchange; failures are counted in [`Diagnostics`] and logged.
    pub fn poll_for_card(&mut self) -> Option<[u8; 4]> {
        match self.read_card() {
            Ok(card) => {
                self.diagnostics.record(Ok(()));
                Some(card.uid.bytes())
            }
            Err(Error::NoTag) => {
                self.diagnostics.record(Err(Error::NoTag));
                None
            }
            Err(error) => {
                self.diagnostics.record(Err(error));
                uwriteln!(&mut self.log, "Card read failed: {:?}", error).ok();
                None
            }
        }
    }

    /// REQUEST, anti-collision, SELECT. Any failing step ends the sequence,
    /// there are no retries.
    pub fn read_card(&mut self) -> Result<Card, Error> {
        let atqa = self.request(RequestMode::Idle)?;
        let uid = self.anticollision()?;
        let sak = self.select(&uid)?;
        Ok(Card { uid, atqa, sak })
    }

    /// Sends REQA/WUPA as a 7-bit short frame and returns the ATQA.
    pub fn request(&mut self, mode: RequestMode) -> Result<[u8; 2], Error> {
        self.write_register(Register::BitFraming, SHORT_FRAME)?;
        let response = self.exchange(Command::Transceive, &[mode.code()])?;
        match *response.data.as_slice() {
            [low, high] if response.bits == ATQA_BITS => Ok([low, high]),
            _ => Err(Error::Framing {
                expected: ATQA_BITS,
                received: response.bits,
            }),
        }
    }

    /// Cascade level 1 anti-collision: four identifier bytes plus BCC.
    /// Only the identifier is returned.
    pub fn anticollision(&mut self) -> Result<Uid, Error> {
        self.write_register(Register::BitFraming, FULL_BYTES)?;
        let response =
            self.exchange(Command::Transceive, &[picc::SEL_CL1, picc::NVB_ANTICOLL])?;

        let [b0, b1, b2, b3, bcc] = *response.data.as_slice() else {
            return Err(Error::Framing {
                expected: ANTICOLL_BITS,
                received: response.bits,
            });
        };
        let uid = Uid::new([b0, b1, b2, b3]);
        if uid.bcc() != bcc {
            return Err(Error::Checksum {
                expected: uid.bcc(),
                received: bcc,
            });
        }
        Ok(uid)
    }

    /// Selects `uid` and returns its SAK.
    pub fn select(&mut self, uid: &Uid) -> Result<u8, Error> {
        let [b0, b1, b2, b3] = uid.bytes();
        let mut frame = [picc::SEL_CL1, picc::NVB_SELECT, b0, b1, b2, b3, uid.bcc(), 0, 0];
        self.append_crc(&mut frame)?;

        let response = self.transceive(&frame)?;
        match *response.data.as_slice() {
            [sak, _, _] if response.bits == SAK_BITS => Ok(sak),
            _ => Err(Error::Framing {
                expected: SAK_BITS,
                received: response.bits,
            }),
        }
    }

    /// Puts the selected tag to sleep and drops Crypto1. A halted tag does
    /// not answer, so silence is success.
    pub fn halt(&mut self) -> Result<(), Error> {
        let mut frame = [picc::HALT, 0x00, 0, 0];
        self.append_crc(&mut frame)?;

        let outcome = self.transceive(&frame);
        self.stop_crypto1()?;
        match outcome {
            Ok(_) | Err(Error::NoTag) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// MIFARE Classic authentication of `block` against the selected tag.
    pub fn authenticate(
        &mut self,
        key: AuthKey,
        block: u8,
        key_bytes: &[u8; 6],
        uid: &Uid,
    ) -> Result<(), Error> {
        let mut frame = [0u8; 12];
        frame[0] = key.code();
        frame[1] = block;
        frame[2..8].copy_from_slice(key_bytes);
        frame[8..].copy_from_slice(&uid.bytes());

        self.exchange(Command::Authenticate, &frame)?;
        if self.read_register(Register::Status2)? & MF_CRYPTO1_ON == 0 {
            return Err(Error::AuthFailed);
        }
        Ok(())
    }

    pub fn stop_crypto1(&mut self) -> Result<(), TransportFault> {
        self.clear_bitmask(Register::Status2, MF_CRYPTO1_ON)
    }

    /// Reads one 16-byte block. The tag's CRC_A over the data is verified.
    pub fn read_block(&mut self, block: u8) -> Result<[u8; 16], Error> {
        let mut frame = [picc::READ, block, 0, 0];
        self.append_crc(&mut frame)?;

        let response = self.transceive(&frame)?;
        if response.bits == ACK_BITS {
            return Err(Error::Nak(response.data.first().copied().unwrap_or(0) & 0x0F));
        }
        if response.bits != BLOCK_BITS || response.data.len() != FIFO_DEPTH {
            return Err(Error::Framing {
                expected: BLOCK_BITS,
                received: response.bits,
            });
        }

        // the two CRC_A bytes are still queued behind the drained data
        let crc = [
            self.read_register(Register::FifoData)?,
            self.read_register(Register::FifoData)?,
        ];
        let mut data = [0u8; 16];
        data.copy_from_slice(&response.data);
        if self.calculate_crc(&data)? != crc {
            return Err(Error::Crc);
        }
        Ok(data)
    }

    /// Writes one 16-byte block; the tag acknowledges the command and the
    /// data separately.
    pub fn write_block(&mut self, block: u8, data: &[u8; 16]) -> Result<(), Error> {
        let mut frame = [picc::WRITE, block, 0, 0];
        self.append_crc(&mut frame)?;
        let response = self.transceive(&frame)?;
        expect_ack(&response)?;

        let mut payload = [0u8; 18];
        payload[..16].copy_from_slice(data);
        self.append_crc(&mut payload)?;
        let response = self.transceive(&payload)?;
        expect_ack(&response)
    }

    /// Runs `command` with `payload` loaded into the FIFO and waits, for a
    /// bounded number of polls, for its completion IRQ.
    ///
    /// Error flags win over the chip timer; the timer means no tag answered.
    /// After a Transceive the received bytes (at most the FIFO depth) are
    /// drained and the exact bit count is reported.
    pub fn exchange(&mut self, command: Command, payload: &[u8]) -> Result<Response, Error> {
        let waited = self.start_and_wait(command, payload);
        // StartSend must not leak into the next frame
        let cleared = self.clear_bitmask(Register::BitFraming, START_SEND);
        let irq = waited?;
        cleared?;
        let irq = irq.ok_or(Error::Timeout)?;

        let errors = self.read_register(Register::Error)? & ERROR_MASK;
        if errors != 0 {
            return Err(Error::Protocol(errors));
        }
        if irq & command.irq_enable() & IRQ_TIMER != 0 {
            return Err(Error::NoTag);
        }

        let mut response = Response::default();
        if command == Command::Transceive {
            let level = (self.read_register(Register::FifoLevel)? & 0x7F) as usize;
            let last_bits = (self.read_register(Register::Control)? & RX_LAST_BITS) as usize;
            response.bits = if last_bits != 0 {
                level.saturating_sub(1) * 8 + last_bits
            } else {
                level * 8
            };
            for _ in 0..level.min(FIFO_DEPTH) {
                let byte = self.read_register(Register::FifoData)?;
                // capacity is FIFO_DEPTH
                let _ = response.data.push(byte);
            }
        }
        Ok(response)
    }

    /// CRC_A of `data` from the chip's coprocessor, low byte first.
    pub fn calculate_crc(&mut self, data: &[u8]) -> Result<[u8; 2], Error> {
        self.write_register(Register::Command, Command::Idle.code())?;
        self.write_register(Register::DivIrq, DIV_IRQ_CRC)?;
        self.write_register(Register::FifoLevel, FIFO_FLUSH)?;
        for &byte in data {
            self.write_register(Register::FifoData, byte)?;
        }
        self.write_register(Register::Command, Command::CalculateCrc.code())?;

        let mut done = false;
        for _ in 0..CRC_POLL_LIMIT {
            if self.read_register(Register::DivIrq)? & DIV_IRQ_CRC != 0 {
                done = true;
                break;
            }
        }
        self.write_register(Register::Command, Command::Idle.code())?;
        if !done {
            return Err(Error::Timeout);
        }

        let low = self.read_register(Register::CrcResultLow)?;
        let high = self.read_register(Register::CrcResultHigh)?;
        Ok([low, high])
    }

    pub fn antenna_on(&mut self) -> Result<(), TransportFault> {
        let current = self.read_register(Register::TxControl)?;
        if current & ANTENNA_DRIVERS != ANTENNA_DRIVERS {
            self.write_register(Register::TxControl, current | ANTENNA_DRIVERS)?;
        }
        Ok(())
    }

    pub fn antenna_off(&mut self) -> Result<(), TransportFault> {
        self.clear_bitmask(Register::TxControl, ANTENNA_DRIVERS)
    }

    pub fn set_antenna_gain(&mut self, gain: AntennaGain) -> Result<(), TransportFault> {
        self.write_register(Register::RfCfg, gain.register_value())
    }

    fn start_and_wait(&mut self, command: Command, payload: &[u8]) -> Result<Option<u8>, Error> {
        self.write_register(Register::ComIEn, command.irq_enable() | IRQ_SET1)?;
        self.write_register(Register::ComIrq, IRQ_ALL)?;
        self.write_register(Register::FifoLevel, FIFO_FLUSH)?;
        self.write_register(Register::Command, Command::Idle.code())?;
        for &byte in payload {
            self.write_register(Register::FifoData, byte)?;
        }
        self.write_register(Register::Command, command.code())?;
        if command == Command::Transceive {
            self.set_bitmask(Register::BitFraming, START_SEND)?;
        }

        let wait_irq = command.wait_irq();
        for _ in 0..EXCHANGE_POLL_LIMIT {
            let irq = self.read_register(Register::ComIrq)?;
            if irq & wait_irq != 0 {
                return Ok(Some(irq));
            }
        }
        Ok(None)
    }

    fn transceive(&mut self, frame: &[u8]) -> Result<Response, Error> {
        self.write_register(Register::BitFraming, FULL_BYTES)?;
        self.exchange(Command::Transceive, frame)
    }

    /// Fills the last two bytes of `frame` with the CRC_A of the rest.
    fn append_crc(&mut self, frame: &mut [u8]) -> Result<(), Error> {
        let split = frame.len() - 2;
        let crc = self.calculate_crc(&frame[..split])?;
        frame[split..].copy_from_slice(&crc);
        Ok(())
    }

    fn set_bitmask(&mut self, reg: Register, mask: u8) -> Result<(), TransportFault> {
        let current = self.read_register(reg)?;
        self.write_register(reg, current | mask)
    }

    fn clear_bitmask(&mut self, reg: Register, mask: u8) -> Result<(), TransportFault> {
        let current = self.read_register(reg)?;
        self.write_register(reg, current & !mask)
    }

    fn write_register(&mut self, reg: Register, value: u8) -> Result<(), TransportFault> {
        let buffer = [reg.write_address(), value];
        let spi = &mut self.spi;
        self.cs.frame(|| {
            spi.write(&buffer)?;
            spi.flush()
        })
    }

    fn read_register(&mut self, reg: Register) -> Result<u8, TransportFault> {
        let buffer = [reg.read_address(), 0x00];
        let mut read_buffer = [0u8; 2];
        let spi = &mut self.spi;
        self.cs.frame(|| {
            spi.transfer(&mut read_buffer, &buffer)?;
            spi.flush()
        })?;
        Ok(read_buffer[1])
    }
}

fn expect_ack(response: &Response) -> Result<(), Error> {
    match response.data.first() {
        Some(&code) if response.bits == ACK_BITS && code & 0x0F == picc::ACK => Ok(()),
        Some(&code) if response.bits == ACK_BITS => Err(Error::Nak(code & 0x0F)),
        _ => Err(Error::Framing {
            expected: ACK_BITS,
            received: response.bits,
        }),
    }
}
