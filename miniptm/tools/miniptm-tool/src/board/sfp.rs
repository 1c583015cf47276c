use log::{debug, info, warn};

use super::bus::{BusError, BusTransaction, DeviceAddress};
use super::device::{Error, Result};
use super::mux::MuxController;
use super::register::STATUS_CONTROL;

/// Serial ID and vendor information.
pub const SFP_ADDRESS_A0: DeviceAddress = 0x50;
/// Digital diagnostic monitoring.
pub const SFP_ADDRESS_A2: DeviceAddress = 0x51;

pub const SFP_SLOTS: u8 = 4;

const READ_CHUNK: usize = 32;
const A0_LENGTH: usize = 96;
const A2_LENGTH: usize = 128;

const TEMPERATURE: usize = 96;
const TX_POWER: usize = 102;
const RX_POWER: usize = 104;
const STATUS_CONTROL_OFFSET: u8 = 110;

/// Reported receive power when the module measures no light at all.
pub const RX_POWER_FLOOR_DBM: f64 = -40.0;

/// Mux channel of each SFP cage. The cages are not wired to consecutive
/// mux ports.
pub fn mux_channel(slot: u8) -> Option<u8> {
    match slot {
        1 => Some(0x01),
        2 => Some(0x02),
        3 => Some(0x20),
        4 => Some(0x40),
        _ => None,
    }
}

/// Fixed-width ASCII field, right-padded with spaces or NULs.
pub fn decode_text(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Signed, in 1/256 °C.
pub fn temperature_celsius(raw: [u8; 2]) -> f64 {
    f64::from(i16::from_be_bytes(raw)) / 256.0
}

/// Unsigned, in 0.1 µW.
pub fn power_microwatts(raw: [u8; 2]) -> f64 {
    f64::from(u16::from_be_bytes(raw)) / 10.0
}

pub fn microwatts_to_dbm(microwatts: f64) -> f64 {
    10.0 * (microwatts / 1000.0).log10()
}

/// As [`microwatts_to_dbm`], but no light reads as [`RX_POWER_FLOOR_DBM`].
pub fn rx_power_dbm(microwatts: f64) -> f64 {
    if microwatts == 0.0 {
        RX_POWER_FLOOR_DBM
    } else {
        microwatts_to_dbm(microwatts)
    }
}

/// As [`microwatts_to_dbm`], but a dark transmitter has no dBm value.
pub fn tx_power_dbm(microwatts: f64) -> Option<f64> {
    if microwatts == 0.0 {
        None
    } else {
        Some(microwatts_to_dbm(microwatts))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorInfo {
    pub module_type: u8,
    pub vendor_name: String,
    pub part_number: String,
    pub serial_number: String,
}

impl VendorInfo {
    pub fn from_a0(a0: &[u8]) -> Self {
        assert!(a0.len() >= 84);
        Self {
            module_type: a0[0],
            vendor_name: decode_text(&a0[20..36]),
            part_number: decode_text(&a0[40..56]),
            serial_number: decode_text(&a0[68..84]),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub temperature_c: f64,
    /// `None` when the transmitter reports no power at all.
    pub tx_power_dbm: Option<f64>,
    pub rx_power_dbm: f64,
}

impl Diagnostics {
    pub fn from_a2(a2: &[u8]) -> Self {
        assert!(a2.len() >= 106);
        let word = |offset: usize| [a2[offset], a2[offset + 1]];
        Self {
            temperature_c: temperature_celsius(word(TEMPERATURE)),
            tx_power_dbm: tx_power_dbm(power_microwatts(word(TX_POWER))),
            rx_power_dbm: rx_power_dbm(power_microwatts(word(RX_POWER))),
        }
    }
}

/// One poll of an SFP cage. An empty cage has no vendor information; a
/// module without diagnostics (many copper DACs) has no diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct SfpModule {
    pub slot: u8,
    pub vendor: Option<VendorInfo>,
    pub diagnostics: Option<Diagnostics>,
    pub status: Option<u8>,
}

impl SfpModule {
    fn absent(slot: u8) -> Self {
        Self {
            slot,
            vendor: None,
            diagnostics: None,
            status: None,
        }
    }

    pub fn present(&self) -> bool {
        self.vendor.is_some()
    }

    pub fn status_control(&self) -> Option<STATUS_CONTROL> {
        self.status.map(STATUS_CONTROL::from)
    }
}

/// The four SFP cages, each behind its own mux channel.
pub struct Sfp<'a, B>
where B: BusTransaction,
{
    bus: &'a mut B,
    mux: &'a mut MuxController,
}

impl<'a, B> Sfp<'a, B>
where B: BusTransaction,
{
    pub(crate) fn new(bus: &'a mut B, mux: &'a mut MuxController) -> Self {
        Self {
            bus,
            mux,
        }
    }

    /// Read identity and diagnostics from the module in `slot` (1-4).
    ///
    /// The mux is closed again before returning, whatever happened.
    pub fn poll(&mut self, slot: u8) -> Result<SfpModule> {
        let channel = mux_channel(slot).ok_or(Error::InvalidSlot(slot))?;

        let module = match self.mux.select(self.bus, channel) {
            Ok(_) => Ok(self.read_module(slot)),
            Err(e) => {
                // The mux may or may not have taken the write.
                self.mux.invalidate();
                Err(e)
            },
        };

        let closed = self.mux.close_all(self.bus);
        let module = module?;
        closed?;

        Ok(module)
    }

    fn read_module(&mut self, slot: u8) -> SfpModule {
        let mut a0 = [0u8; A0_LENGTH];
        if let Err(e) = self.read_region(SFP_ADDRESS_A0, &mut a0) {
            info!("sfp{slot}: no module ({e})");
            return SfpModule::absent(slot);
        }
        debug!("sfp{slot}: A0 {a0:02x?}");

        let mut a2 = [0u8; A2_LENGTH];
        let (diagnostics, status) = match self.read_region(SFP_ADDRESS_A2, &mut a2) {
            Ok(()) => {
                debug!("sfp{slot}: A2 {a2:02x?}");
                let status = match self.bus.read_byte(SFP_ADDRESS_A2, STATUS_CONTROL_OFFSET) {
                    Ok(status) => Some(status),
                    Err(e) => {
                        warn!("sfp{slot}: status/control unreadable ({e})");
                        None
                    },
                };
                (Some(Diagnostics::from_a2(&a2)), status)
            },
            Err(e) => {
                warn!("sfp{slot}: no diagnostics ({e})");
                (None, None)
            },
        };

        SfpModule {
            slot,
            vendor: Some(VendorInfo::from_a0(&a0)),
            diagnostics,
            status,
        }
    }

    fn read_region(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> std::result::Result<(), BusError> {
        for (index, chunk) in buffer.chunks_mut(READ_CHUNK).enumerate() {
            self.bus.read_block(address, (index * READ_CHUNK) as u8, chunk)?;
        }
        Ok(())
    }
}
