#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use modular_bitfield_msb::prelude::*;

/// GPIO Control Register (GPIOCR) - GPIO base + 0x10
///
/// Any write to this register commits the GPIO's configuration, so it is
/// written even when the value does not change.
///
/// * OUTPUT_EN: Output Enable
///   0 = GPIO is an input.
///   1 = GPIO drives the level held in GPIOOUT.
/// * FUNCTION: Function Select
///   1 = GPIO is owned by an internal status/alarm function. Takes priority
///   over OUTPUT_EN.
///
#[bitfield(bits=8)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GPIOCR {
    #[skip] __: B5,
    pub OUTPUT_EN: B1,
    #[skip] __: B1,
    pub FUNCTION: B1,
}

/// GPIO Output Register (GPIOOUT) - 0xc160 (GPIO0-7), 0xc161 (GPIO8-15)
///
/// One bit per GPIO, LSB first. The pair behaves as a single 16-bit register:
/// nothing reaches the pins until 0xc161 is written.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GPIOOUT(u8);

impl GPIOOUT {
    pub fn pin(&self, bit: usize) -> bool {
        assert!(bit < 8);
        (self.0 >> bit) & 1 != 0
    }

    pub fn with_pin(self, bit: usize, level: bool) -> Self {
        assert!(bit < 8);
        if level {
            Self(self.0 | (1 << bit))
        } else {
            Self(self.0 & !(1 << bit))
        }
    }
}

impl From<u8> for GPIOOUT {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<GPIOOUT> for u8 {
    fn from(value: GPIOOUT) -> Self {
        value.0
    }
}

/// GPIO Level Register (GPIOLVL) - STATUS + 0x8a (GPIO0-7), STATUS + 0x8b (GPIO8-15)
///
/// Read-only. Reflects the sampled pin level whatever the GPIO's mode.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GPIOLVL(u8);

impl GPIOLVL {
    pub fn pin(&self, bit: usize) -> bool {
        assert!(bit < 8);
        (self.0 >> bit) & 1 != 0
    }
}

impl From<u8> for GPIOLVL {
    fn from(value: u8) -> Self {
        Self(value)
    }
}
