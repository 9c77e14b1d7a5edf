// src/cs_pin_wrapper.rs

use embedded_hal::digital::OutputPin;

use crate::errors::TransportFault;

/// Chip-select line of the reader. Every register access is one frame.
pub struct CsPinWrapper<CS> {
    cs: CS,
}

impl<CS> CsPinWrapper<CS> {
    pub fn new(cs: CS) -> Self {
        CsPinWrapper { cs }
    }

    pub fn release(self) -> CS {
        self.cs
    }
}

impl<CS> CsPinWrapper<CS>
where
    CS: OutputPin,
{
    pub fn set_high(&mut self) -> Result<(), TransportFault> {
        self.cs.set_high().map_err(TransportFault::pin)
    }

    pub fn set_low(&mut self) -> Result<(), TransportFault> {
        self.cs.set_low().map_err(TransportFault::pin)
    }

    /// Runs `transfer` with CS low. CS goes high again even when the
    /// transfer fails; the transfer error wins over a pin error.
    pub fn frame<T, E>(
        &mut self,
        transfer: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, TransportFault>
    where
        E: embedded_hal::spi::Error,
    {
        self.set_low()?;
        let result = transfer().map_err(TransportFault::spi);
        let released = self.set_high();
        let value = result?;
        released?;
        Ok(value)
    }
}
