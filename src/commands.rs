// src/commands.rs

use crate::registers::IRQ_TIMER;

/// Commands executed by the RC522 itself (written to CommandReg).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Idle = 0x00,
    CalculateCrc = 0x03,
    Transmit = 0x04,
    Receive = 0x08,
    Transceive = 0x0C,
    Authenticate = 0x0E,
    SoftReset = 0x0F,
}

impl Command {
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[cfg(test)]
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code & 0x0F {
            0x00 => Some(Command::Idle),
            0x03 => Some(Command::CalculateCrc),
            0x04 => Some(Command::Transmit),
            0x08 => Some(Command::Receive),
            0x0C => Some(Command::Transceive),
            0x0E => Some(Command::Authenticate),
            0x0F => Some(Command::SoftReset),
            _ => None,
        }
    }

    /// Interrupt sources enabled in ComIEnReg while this command runs.
    pub const fn irq_enable(self) -> u8 {
        match self {
            Command::Authenticate => 0x12, // IdleIEn | ErrIEn
            Command::Transceive => 0x77,
            Command::Receive => 0x23,      // RxIEn | ErrIEn | TimerIEn
            Command::Transmit => 0x43,     // TxIEn | ErrIEn | TimerIEn
            _ => 0x10,
        }
    }

    /// ComIrqReg bits that end the wait loop for this command.
    pub const fn wait_irq(self) -> u8 {
        let done = match self {
            Command::Authenticate => 0x10,      // IdleIRq
            Command::Transceive => 0x30,        // RxIRq | IdleIRq
            Command::Receive => 0x30,
            Command::Transmit => 0x50,          // TxIRq | IdleIRq
            _ => 0x10,
        };
        done | IRQ_TIMER
    }
}

/// Commands sent over the air to the tag.
pub mod picc {
    pub const REQIDL: u8 = 0x26;
    pub const REQALL: u8 = 0x52;
    pub const SEL_CL1: u8 = 0x93;
    /// NVB of a bare anti-collision frame: SEL + NVB, no identifier bits.
    pub const NVB_ANTICOLL: u8 = 0x20;
    /// NVB of a SELECT frame: all 40 identifier + BCC bits known.
    pub const NVB_SELECT: u8 = 0x70;
    pub const HALT: u8 = 0x50;
    pub const AUTH_KEY_A: u8 = 0x60;
    pub const AUTH_KEY_B: u8 = 0x61;
    pub const READ: u8 = 0x30;
    pub const WRITE: u8 = 0xA0;
    /// Low nibble of a MIFARE ACK.
    pub const ACK: u8 = 0x0A;
}

/// Which tags a REQUEST wakes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Tags in IDLE state only.
    Idle,
    /// Tags in IDLE and HALT state.
    All,
}

impl RequestMode {
    pub const fn code(self) -> u8 {
        match self {
            RequestMode::Idle => picc::REQIDL,
            RequestMode::All => picc::REQALL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKey {
    A,
    B,
}

impl AuthKey {
    pub const fn code(self) -> u8 {
        match self {
            AuthKey::A => picc::AUTH_KEY_A,
            AuthKey::B => picc::AUTH_KEY_B,
        }
    }
}
