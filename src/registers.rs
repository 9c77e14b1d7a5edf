// src/registers.rs

/// RC522 register file. Discriminants are the 6-bit addresses from the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    // Command and status
    Command = 0x01,
    ComIEn = 0x02,      // Communication interrupt enable
    DivIEn = 0x03,      // DivIrq interrupt enable
    ComIrq = 0x04,      // Interrupt request bits
    DivIrq = 0x05,      // CRC and internal event request bits
    Error = 0x06,       // Error bits of the last command
    Status1 = 0x07,
    Status2 = 0x08,     // Receiver/transmitter status, MFCrypto1On
    FifoData = 0x09,
    FifoLevel = 0x0A,   // Bytes stored in the FIFO, bit 7 flushes
    WaterLevel = 0x0B,
    Control = 0x0C,     // RxLastBits in bits 2..0
    BitFraming = 0x0D,  // StartSend bit 7, TxLastBits bits 2..0
    Coll = 0x0E,

    // Communication
    Mode = 0x11,
    TxMode = 0x12,
    RxMode = 0x13,
    TxControl = 0x14,   // Antenna driver pins TX1 and TX2
    TxAsk = 0x15,

    // Configuration
    CrcResultHigh = 0x21,
    CrcResultLow = 0x22,
    ModWidth = 0x24,
    RfCfg = 0x26,       // Receiver gain
    TMode = 0x2A,
    TPrescaler = 0x2B,
    TReloadHigh = 0x2C,
    TReloadLow = 0x2D,

    // Test
    Version = 0x37,
}

impl Register {
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// First byte of a register read: address shifted left, MSB set.
    pub const fn read_address(self) -> u8 {
        ((self.address() << 1) & 0x7E) | 0x80
    }

    /// First byte of a register write: address shifted left, MSB clear.
    pub const fn write_address(self) -> u8 {
        (self.address() << 1) & 0x7E
    }

    /// Inverse of the address mapping, used when decoding bus traffic.
    #[cfg(test)]
    pub(crate) fn from_address(address: u8) -> Option<Self> {
        use Register::*;
        let reg = match address {
            0x01 => Command,
            0x02 => ComIEn,
            0x03 => DivIEn,
            0x04 => ComIrq,
            0x05 => DivIrq,
            0x06 => Error,
            0x07 => Status1,
            0x08 => Status2,
            0x09 => FifoData,
            0x0A => FifoLevel,
            0x0B => WaterLevel,
            0x0C => Control,
            0x0D => BitFraming,
            0x0E => Coll,
            0x11 => Mode,
            0x12 => TxMode,
            0x13 => RxMode,
            0x14 => TxControl,
            0x15 => TxAsk,
            0x21 => CrcResultHigh,
            0x22 => CrcResultLow,
            0x24 => ModWidth,
            0x26 => RfCfg,
            0x2A => TMode,
            0x2B => TPrescaler,
            0x2C => TReloadHigh,
            0x2D => TReloadLow,
            0x37 => Version,
            _ => return None,
        };
        Some(reg)
    }
}

// ComIrqReg bits
pub const IRQ_SET1: u8 = 0x80;
pub const IRQ_TIMER: u8 = 0x01;
pub const IRQ_ALL: u8 = 0x7F;

// DivIrqReg bits
pub const DIV_IRQ_CRC: u8 = 0x04;

// ErrorReg: BufferOvfl | CollErr | ParityErr | ProtocolErr
pub const ERROR_MASK: u8 = 0x1B;

// FIFOLevelReg
pub const FIFO_FLUSH: u8 = 0x80;
pub const FIFO_DEPTH: usize = 16;

// BitFramingReg
pub const START_SEND: u8 = 0x80;

// ControlReg
pub const RX_LAST_BITS: u8 = 0x07;

// Status2Reg
pub const MF_CRYPTO1_ON: u8 = 0x08;

// TxControlReg: Tx1RFEn | Tx2RFEn
pub const ANTENNA_DRIVERS: u8 = 0x03;
