use embedded_hal::{digital, spi};
use ufmt::{uDebug, uWrite};

/// Outcome class of one exchange with a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoTag,
    Error,
}

/// Failure of the bus or of one of the control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    Spi(spi::ErrorKind),
    Pin(digital::ErrorKind),
}

impl TransportFault {
    pub fn spi<E: spi::Error>(error: E) -> Self {
        TransportFault::Spi(error.kind())
    }

    pub fn pin<E: digital::Error>(error: E) -> Self {
        TransportFault::Pin(error.kind())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bus or a control line failed.
    Transport(TransportFault),
    /// The chip's own timer expired without an answer: nothing in the field.
    NoTag,
    /// The driver's poll bound ran out before the chip raised any IRQ.
    Timeout,
    /// Collision, CRC, parity or buffer overflow. Holds the ErrorReg bits.
    Protocol(u8),
    /// Answer had the wrong length, in bits.
    Framing { expected: usize, received: usize },
    /// Block check character of the identifier did not match.
    Checksum { expected: u8, received: u8 },
    /// CRC_A of a response did not match.
    Crc,
    /// Tag answered with a NAK nibble.
    Nak(u8),
    /// Authenticate finished but Crypto1 is not active.
    AuthFailed,
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Error::NoTag => Status::NoTag,
            _ => Status::Error,
        }
    }
}

impl From<TransportFault> for Error {
    fn from(fault: TransportFault) -> Self {
        Error::Transport(fault)
    }
}

/// Fatal errors of `CardReader::initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    Transport(TransportFault),
    /// VersionReg held a value outside the known silicon revisions.
    /// Usually means no chip or a wiring fault.
    UnknownVersion(u8),
}

impl From<TransportFault> for InitError {
    fn from(fault: TransportFault) -> Self {
        InitError::Transport(fault)
    }
}

impl uDebug for Status {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Status::Ok => f.write_str("Ok"),
            Status::NoTag => f.write_str("NoTag"),
            Status::Error => f.write_str("Error"),
        }
    }
}

impl uDebug for TransportFault {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            TransportFault::Spi(kind) => f.debug_tuple("Spi")?.field(&SpiKind(*kind))?.finish(),
            TransportFault::Pin(_) => f.debug_tuple("Pin")?.field(&PinKind)?.finish(),
        }
    }
}

struct SpiKind(spi::ErrorKind);

impl uDebug for SpiKind {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(match self.0 {
            spi::ErrorKind::Overrun => "Overrun",
            spi::ErrorKind::ModeFault => "ModeFault",
            spi::ErrorKind::FrameFormat => "FrameFormat",
            spi::ErrorKind::ChipSelectFault => "ChipSelectFault",
            _ => "Other",
        })
    }
}

// digital::ErrorKind has no variant besides Other yet
struct PinKind;

impl uDebug for PinKind {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("Other")
    }
}

impl uDebug for Error {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Error::Transport(fault) => f.debug_tuple("Transport")?.field(fault)?.finish(),
            Error::NoTag => f.write_str("NoTag"),
            Error::Timeout => f.write_str("Timeout"),
            Error::Protocol(flags) => f.debug_tuple("Protocol")?.field(flags)?.finish(),
            Error::Framing { expected, received } => f
                .debug_struct("Framing")?
                .field("expected", expected)?
                .field("received", received)?
                .finish(),
            Error::Checksum { expected, received } => f
                .debug_struct("Checksum")?
                .field("expected", expected)?
                .field("received", received)?
                .finish(),
            Error::Crc => f.write_str("Crc"),
            Error::Nak(code) => f.debug_tuple("Nak")?.field(code)?.finish(),
            Error::AuthFailed => f.write_str("AuthFailed"),
        }
    }
}

impl uDebug for InitError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            InitError::Transport(fault) => f.debug_tuple("Transport")?.field(fault)?.finish(),
            InitError::UnknownVersion(version) => {
                f.debug_tuple("UnknownVersion")?.field(version)?.finish()
            }
        }
    }
}
