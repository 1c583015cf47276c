use std::io;

use thiserror::Error;

/// 7-bit I2C device address.
pub type DeviceAddress = u8;

#[derive(Debug, Error)]
#[error("i2c transaction with device 0x{address:02x} failed")]
pub struct BusError {
    pub address: DeviceAddress,
    #[source]
    pub source: io::Error,
}

impl BusError {
    pub fn new(address: DeviceAddress, source: io::Error) -> Self {
        Self {
            address,
            source,
        }
    }
}

/// Register-addressed transactions with a device on the board's I2C bus.
///
/// These are the SMBus "byte data" and "I2C block data" shapes: a register
/// byte followed by the data. Block transfers are at most 32 bytes.
///
pub trait BusTransaction {
    fn write_byte(&mut self, address: DeviceAddress, register: u8, value: u8) -> Result<(), BusError>;
    fn write_block(&mut self, address: DeviceAddress, register: u8, values: &[u8]) -> Result<(), BusError>;
    fn read_byte(&mut self, address: DeviceAddress, register: u8) -> Result<u8, BusError>;
    fn read_block(&mut self, address: DeviceAddress, register: u8, buffer: &mut [u8]) -> Result<(), BusError>;
}
