use log::debug;

use super::bus::{BusError, BusTransaction, DeviceAddress};

/// I2C address of the board's 8-channel bus switch.
pub const MUX_ADDRESS: DeviceAddress = 0x70;

const MUX_CONTROL: u8 = 0x00;

/// Mux channel values are bitmaps: each set bit connects one downstream
/// segment. Only one segment is ever connected at a time here.
pub const CHANNEL_NONE: u8 = 0x00;
pub const CHANNEL_DPLL: u8 = 0x08;

/// Tracks the channel last written to the mux.
///
/// The mux control register is never read back, so the cached channel is an
/// optimistic belief. Anything else touching the mux silently breaks it;
/// call [`MuxController::invalidate`] when that may have happened.
///
#[derive(Debug, Default)]
pub struct MuxController {
    current: Option<u8>,
}

impl MuxController {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<u8> {
        self.current
    }

    /// Connect `channel`, returning `true` if the mux had to be written.
    pub fn select<B>(&mut self, bus: &mut B, channel: u8) -> Result<bool, BusError>
    where B: BusTransaction + ?Sized,
    {
        if self.current == Some(channel) {
            return Ok(false);
        }

        debug!("mux: channel 0x{channel:02x}");
        bus.write_byte(MUX_ADDRESS, MUX_CONTROL, channel)?;
        self.current = Some(channel);

        Ok(true)
    }

    /// Disconnect every downstream segment.
    pub fn close_all<B>(&mut self, bus: &mut B) -> Result<bool, BusError>
    where B: BusTransaction + ?Sized,
    {
        self.select(bus, CHANNEL_NONE)
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
