use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::bus::{BusTransaction, DeviceAddress};
use super::device::{Error, Result};

/// I2C address of the DPLL's boot EEPROM. Bit 16 of the memory address is
/// carried in the device address, so the part also answers at 0x55.
pub const EEPROM_ADDRESS: DeviceAddress = 0x54;

pub const EEPROM_SIZE: u32 = 0x20000;

/// Internal write cycle time.
pub const WRITE_DELAY: Duration = Duration::from_millis(5);

/// Memory contents to program, as runs of bytes keyed by start address.
pub type Image = BTreeMap<u32, Vec<u8>>;

fn check_range(start: u32, data: &[u8]) -> Result<()> {
    let end = u64::from(start) + data.len() as u64;
    if end > u64::from(EEPROM_SIZE) {
        return Err(Error::EepromRange { start, length: data.len() });
    }
    Ok(())
}

/// The 128 KiB configuration EEPROM. It sits directly on the bus, not
/// behind the mux.
pub struct Eeprom<'a, B>
where B: BusTransaction,
{
    bus: &'a mut B,
    write_delay: Duration,
}

impl<'a, B> Eeprom<'a, B>
where B: BusTransaction,
{
    pub(crate) fn new(bus: &'a mut B) -> Self {
        Self {
            bus,
            write_delay: WRITE_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_write_delay(mut self, write_delay: Duration) -> Self {
        self.write_delay = write_delay;
        self
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<()> {
        assert!(address < EEPROM_SIZE);
        let device = EEPROM_ADDRESS | ((address >> 16) & 1) as u8;
        let [_, _, address_hi, address_lo] = address.to_be_bytes();

        self.bus.write_block(device, address_hi, &[address_lo, value])?;
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }

        Ok(())
    }

    /// Write `data` one byte at a time starting at `start`. Nothing is
    /// written unless all of `data` fits.
    pub fn write(&mut self, start: u32, data: &[u8]) -> Result<()> {
        check_range(start, data)?;
        debug!("eeprom: {} bytes at 0x{start:05x}", data.len());
        for (address, &value) in (start..).zip(data) {
            self.write_byte(address, value)?;
        }
        Ok(())
    }

    /// Write every run in `image`, in address order.
    pub fn program(&mut self, image: &Image) -> Result<usize> {
        for (&start, data) in image {
            check_range(start, data)?;
        }

        let mut written = 0;
        for (&start, data) in image {
            self.write(start, data)?;
            written += data.len();
        }
        info!("eeprom: programmed {written} bytes in {} runs", image.len());
        Ok(written)
    }
}
