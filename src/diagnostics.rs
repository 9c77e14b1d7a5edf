use core::convert::Infallible;

use ufmt::uWrite;

use crate::errors::Error;

/// Outcome counters of `CardReader::poll_for_card`.
///
/// `empty` polls are the steady state of an idle reader. `failed` polls mean
/// a tag was in the field but the protocol broke down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub polls: u32,
    pub identified: u32,
    pub empty: u32,
    pub failed: u32,
    pub last_error: Option<Error>,
}

impl Diagnostics {
    pub(crate) fn record(&mut self, outcome: Result<(), Error>) {
        self.polls = self.polls.wrapping_add(1);
        match outcome {
            Ok(()) => self.identified = self.identified.wrapping_add(1),
            Err(Error::NoTag) => self.empty = self.empty.wrapping_add(1),
            Err(error) => {
                self.failed = self.failed.wrapping_add(1);
                self.last_error = Some(error);
            }
        }
    }
}

/// Log sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLog;

impl uWrite for NoLog {
    type Error = Infallible;

    fn write_str(&mut self, _s: &str) -> Result<(), Infallible> {
        Ok(())
    }
}
