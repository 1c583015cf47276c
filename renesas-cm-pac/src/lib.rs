#![no_std]

//! Register map for the GPIO block of the Renesas ClockMatrix (8A3xxxx) DPLL.
//!
//! The part exposes a flat 16-bit register space. How that space is reached
//! (I2C with a page window, SPI, ...) is left to the implementor of
//! [`device::RegisterSpace`].

pub mod device;
pub mod register;
