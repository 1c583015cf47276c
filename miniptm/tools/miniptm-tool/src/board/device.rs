use std::io;

use thiserror::Error;

use super::bus::{BusError, BusTransaction};
use super::eeprom::Eeprom;
use super::gpio::Gpios;
use super::i2cdev::LinuxI2c;
use super::mux::MuxController;
use super::paged::{Dpll, LogicalAddress, PageWindow};
use super::sfp::Sfp;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("invalid SFP slot {0}, expected 1-4")]
    InvalidSlot(u8),

    #[error("{length}-byte block at {address} crosses a DPLL page")]
    PageCrossing { address: LogicalAddress, length: usize },

    #[error("invalid 32-bit access at offset 0x{offset:x} of a 0x{size:x}-byte BAR")]
    BarAccess { offset: usize, size: usize },

    #[error("{length} bytes at 0x{start:05x} run past the end of the EEPROM")]
    EepromRange { start: u32, length: usize },

    #[error("invalid size '{0}'")]
    InvalidSize(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// MiniPTM board interface
///
/// Owns the I2C bus together with everything cached about the hardware
/// behind it (mux channel, DPLL page window). Every device on the board is
/// reached by borrowing from here, so there is exactly one path to the bus
/// and one set of caches. Not for sharing between threads without a lock
/// around the whole board.
///
pub struct Board<B>
where B: BusTransaction,
{
    bus: B,
    mux: MuxController,
    window: PageWindow,
}

impl Board<LinuxI2c> {
    pub fn open(bus: u32) -> Result<Self> {
        Ok(Self::new(LinuxI2c::open(bus)?))
    }
}

impl<B> Board<B>
where B: BusTransaction,
{
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            mux: MuxController::new(),
            window: PageWindow::default(),
        }
    }

    /// Forget the cached mux channel and DPLL page, e.g. after a bus error
    /// or after something else has used the bus.
    pub fn invalidate(&mut self) {
        self.mux.invalidate();
        self.window.invalidate();
    }

    pub fn dpll(&mut self) -> Dpll<'_, B> {
        Dpll::new(&mut self.bus, &mut self.mux, &mut self.window)
    }

    pub fn gpios(&mut self) -> Gpios<'_, B> {
        Gpios::new(self.dpll())
    }

    pub fn sfp(&mut self) -> Sfp<'_, B> {
        Sfp::new(&mut self.bus, &mut self.mux)
    }

    pub fn eeprom(&mut self) -> Eeprom<'_, B> {
        Eeprom::new(&mut self.bus)
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[cfg(test)]
    pub(crate) fn window_page(&self) -> Option<u8> {
        self.window.active()
    }
}
