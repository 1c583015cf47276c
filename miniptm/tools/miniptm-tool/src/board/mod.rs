pub mod bar;
pub mod bus;
pub mod device;
pub mod dump;
pub mod eeprom;
pub mod gpio;
pub mod i2cdev;
#[cfg(test)]
mod mock;
pub mod mux;
pub mod paged;
pub mod register;
pub mod sfp;
