use std::fmt;

use log::warn;
use renesas_cm_pac::device::{ClockMatrix, GpioBank, GPIOS_COUNT};
use renesas_cm_pac::register::GPIOCR;

use super::bus::BusTransaction;
use super::device::Result;
use super::paged::Dpll;

/// Direction a GPIO can be configured for. Function mode is owned by the
/// DPLL's configuration and can only be observed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    Function,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PinMode::Input => "Input",
            PinMode::Output => "Output",
            PinMode::Function => "Function",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinState {
    pub mode: PinMode,
    pub level: bool,
}

/// Function select wins over output enable.
pub fn decode_mode(gpiocr: GPIOCR) -> PinMode {
    if gpiocr.FUNCTION() != 0 {
        PinMode::Function
    } else if gpiocr.OUTPUT_EN() != 0 {
        PinMode::Output
    } else {
        PinMode::Input
    }
}

/// The DPLL's GPIO pins.
///
/// Nothing about pin state is kept here; every call goes to the hardware.
/// Pin numbers outside 0-15 are ignored rather than rejected.
///
pub struct Gpios<'a, B>
where B: BusTransaction,
{
    dpll: Dpll<'a, B>,
}

impl<'a, B> Gpios<'a, B>
where B: BusTransaction,
{
    pub(crate) fn new(dpll: Dpll<'a, B>) -> Self {
        Self {
            dpll,
        }
    }

    pub fn configure(&mut self, pin: usize, direction: Direction, value: bool) -> Result<()> {
        if pin >= GPIOS_COUNT {
            warn!("gpio: no GPIO{pin}, ignoring");
            return Ok(());
        }

        let mut cm = ClockMatrix::new(&mut self.dpll);

        match direction {
            Direction::Input => {
                cm.gpio(pin).gpiocr().write(|m| m)?;
            },
            Direction::Output => {
                cm.gpioout(GpioBank::of(pin)).modify(|m| m
                    .with_pin(GpioBank::bit(pin), value)
                )?;

                // GPIOOUT only reaches the pins once its last byte is written,
                // so rewrite that byte with whatever it now holds.
                let latched = cm.gpioout_commit().read()?;
                cm.gpioout_commit().write(|_| latched)?;

                cm.gpio(pin).gpiocr().write(|m| m
                    .with_OUTPUT_EN(1)
                )?;
            },
        }

        Ok(())
    }

    pub fn read_mode(&mut self, pin: usize) -> Result<Option<PinState>> {
        if pin >= GPIOS_COUNT {
            return Ok(None);
        }

        let mut cm = ClockMatrix::new(&mut self.dpll);
        let gpiocr = cm.gpio(pin).gpiocr().read()?;
        let level = cm.gpiolvl(GpioBank::of(pin)).read()?;

        Ok(Some(PinState {
            mode: decode_mode(gpiocr),
            level: level.pin(GpioBank::bit(pin)),
        }))
    }
}
