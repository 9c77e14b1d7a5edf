use core::fmt::{self, Write};

use heapless::String;
use ufmt::{uDebug, uDisplay, uWrite};

/// 4-byte single size identifier recovered by anti-collision.
///
/// Unique among the tags in the field at the same time, not across all tags
/// ever made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid([u8; 4]);

impl Uid {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Uid(bytes)
    }

    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Block check character: XOR of the four identifier bytes.
    pub fn bcc(&self) -> u8 {
        self.0.iter().fold(0, |acc, b| acc ^ b)
    }

    /// Lowercase hex, e.g. `"a1b2c3d4"`.
    pub fn to_hex(&self) -> String<8> {
        let mut hex = String::new();
        for byte in self.0 {
            // 8 chars always fit
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }
}

impl From<[u8; 4]> for Uid {
    fn from(bytes: [u8; 4]) -> Self {
        Uid(bytes)
    }
}

impl From<Uid> for [u8; 4] {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<[u8]> for Uid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl uDisplay for Uid {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(&self.to_hex())
    }
}

impl uDebug for Uid {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("Uid(")?;
        f.write_str(&self.to_hex())?;
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    MifareMini,
    Mifare1K,
    Mifare4K,
    MifareUltralight,
    MifarePlus,
    Iso14443_4,
    Unknown,
}

impl CardType {
    /// Classifies a tag by its SAK byte (NXP AN10833).
    pub fn from_sak(sak: u8) -> Self {
        match sak & 0x7F {
            0x09 => CardType::MifareMini,
            0x08 => CardType::Mifare1K,
            0x18 => CardType::Mifare4K,
            0x00 => CardType::MifareUltralight,
            0x10 | 0x11 => CardType::MifarePlus,
            0x20 => CardType::Iso14443_4,
            _ => CardType::Unknown,
        }
    }
}

impl uDebug for CardType {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            CardType::MifareMini => f.write_str("MifareMini"),
            CardType::Mifare1K => f.write_str("Mifare1K"),
            CardType::Mifare4K => f.write_str("Mifare4K"),
            CardType::MifareUltralight => f.write_str("MifareUltralight"),
            CardType::MifarePlus => f.write_str("MifarePlus"),
            CardType::Iso14443_4 => f.write_str("Iso14443_4"),
            CardType::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A tag that answered REQUEST, anti-collision and SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub uid: Uid,
    pub atqa: [u8; 2],
    pub sak: u8,
}

impl Card {
    pub fn card_type(&self) -> CardType {
        CardType::from_sak(self.sak)
    }
}
