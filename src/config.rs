/// Receiver gain, RxGain bits of RFCfgReg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntennaGain {
    Db18,
    Db23,
    Db33,
    Db38,
    Db43,
    Db48,
}

impl AntennaGain {
    pub const MAX: AntennaGain = AntennaGain::Db48;

    /// Value written to RFCfgReg.
    pub const fn register_value(self) -> u8 {
        let rx_gain = match self {
            AntennaGain::Db18 => 0b000,
            AntennaGain::Db23 => 0b001,
            AntennaGain::Db33 => 0b100,
            AntennaGain::Db38 => 0b101,
            AntennaGain::Db43 => 0b110,
            AntennaGain::Db48 => 0b111,
        };
        rx_gain << 4
    }
}

/// Register values programmed by `CardReader::initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Settle time after each edge of the reset pulse and after SoftReset.
    pub reset_settle_ms: u32,
    /// TModeReg: TAuto plus the prescaler high nibble.
    pub timer_mode: u8,
    pub timer_prescaler: u8,
    /// TReloadReg, written high byte first.
    pub timer_reload: u16,
    /// TxASKReg, 0x40 forces 100 % ASK.
    pub tx_ask: u8,
    /// ModeReg, 0x3D presets the CRC coprocessor to 0x6363.
    pub mode: u8,
    pub antenna_gain: AntennaGain,
}

impl Config {
    pub const fn new() -> Self {
        Config {
            reset_settle_ms: 50,
            timer_mode: 0x8D,
            timer_prescaler: 0x3E,
            timer_reload: 30,
            tx_ask: 0x40,
            mode: 0x3D,
            antenna_gain: AntennaGain::MAX,
        }
    }

    pub const fn with_reset_settle_ms(mut self, ms: u32) -> Self {
        self.reset_settle_ms = ms;
        self
    }

    pub const fn with_timer(mut self, mode: u8, prescaler: u8, reload: u16) -> Self {
        self.timer_mode = mode;
        self.timer_prescaler = prescaler;
        self.timer_reload = reload;
        self
    }

    pub const fn with_antenna_gain(mut self, gain: AntennaGain) -> Self {
        self.antenna_gain = gain;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
