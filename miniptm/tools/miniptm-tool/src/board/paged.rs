use std::fmt;

use log::trace;
use renesas_cm_pac::device::{RegisterAddress, RegisterSpace, RegisterValue};

use super::bus::{BusTransaction, DeviceAddress};
use super::device::{Error, Result};
use super::mux::{MuxController, CHANNEL_DPLL};

/// I2C address of the ClockMatrix DPLL, behind mux channel `CHANNEL_DPLL`.
pub const DPLL_ADDRESS: DeviceAddress = 0x58;

/// PAGE_ADDR occupies 0xfc..=0xff of every page. Bits 15:8 pick the page that
/// single-byte register addresses land in; bits 31:16 must hold 0x2010.
pub const PAGE_ADDR: u8 = 0xfc;
const PAGE_ADDR_UPPER: [u8; 2] = [0x10, 0x20];

/// An address in the DPLL's 16-bit register space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalAddress(u16);

impl LogicalAddress {
    pub fn new(base: u16, offset: u16) -> Self {
        let address = u32::from(base) + u32::from(offset);
        assert!(address < 0x10000);
        Self(address as u16)
    }

    pub fn page(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn offset(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl From<u16> for LogicalAddress {
    fn from(address: u16) -> Self {
        Self(address)
    }
}

impl From<(u16, u16)> for LogicalAddress {
    fn from((base, offset): (u16, u16)) -> Self {
        Self::new(base, offset)
    }
}

impl From<LogicalAddress> for u16 {
    fn from(address: LogicalAddress) -> Self {
        address.0
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// The page last written to the DPLL's PAGE_ADDR register, if known.
#[derive(Debug, Default)]
pub struct PageWindow {
    active: Option<u8>,
}

impl PageWindow {
    #[cfg(test)]
    pub fn active(&self) -> Option<u8> {
        self.active
    }

    pub fn invalidate(&mut self) {
        self.active = None;
    }
}

/// The DPLL's register space, reached through the mux and the page window.
///
/// PAGE_ADDR is only rewritten when an access lands in a different page than
/// the last one, and is forgotten whenever the mux moves. On a failed
/// transaction the cache keeps what was last written successfully; call
/// [`super::device::Board::invalidate`] before retrying if the part may have
/// missed a page write.
///
pub struct Dpll<'a, B>
where B: BusTransaction,
{
    bus: &'a mut B,
    mux: &'a mut MuxController,
    window: &'a mut PageWindow,
}

impl<'a, B> Dpll<'a, B>
where B: BusTransaction,
{
    pub(crate) fn new(bus: &'a mut B, mux: &'a mut MuxController, window: &'a mut PageWindow) -> Self {
        Self {
            bus,
            mux,
            window,
        }
    }

    pub fn ensure_channel(&mut self) -> Result<()> {
        if self.mux.select(self.bus, CHANNEL_DPLL)? {
            self.window.invalidate();
        }
        Ok(())
    }

    fn check_block(address: LogicalAddress, length: usize) -> Result<()> {
        if usize::from(address.offset()) + length > 0x100 {
            return Err(Error::PageCrossing { address, length });
        }
        Ok(())
    }

    /// Point the page window at `address`, returning the in-page register.
    fn select_page(&mut self, address: LogicalAddress) -> Result<u8> {
        self.ensure_channel()?;

        let page = address.page();
        if self.window.active != Some(page) {
            trace!("dpll: page 0x{page:02x}");
            let [upper_lo, upper_hi] = PAGE_ADDR_UPPER;
            self.bus.write_block(DPLL_ADDRESS, PAGE_ADDR, &[address.offset(), page, upper_lo, upper_hi])?;
            self.window.active = Some(page);
        }

        Ok(address.offset())
    }

    pub fn write_byte<A>(&mut self, address: A, value: u8) -> Result<()>
    where A: Into<LogicalAddress>,
    {
        let address = address.into();
        let register = self.select_page(address)?;
        trace!("dpll: write {address} = 0x{value:02x}");
        self.bus.write_byte(DPLL_ADDRESS, register, value)?;
        Ok(())
    }

    /// Write consecutive registers. The block must not cross a page.
    pub fn write_block<A>(&mut self, address: A, values: &[u8]) -> Result<()>
    where A: Into<LogicalAddress>,
    {
        let address = address.into();
        Self::check_block(address, values.len())?;
        let register = self.select_page(address)?;
        trace!("dpll: write {address} = {values:02x?}");
        self.bus.write_block(DPLL_ADDRESS, register, values)?;
        Ok(())
    }

    pub fn read_byte<A>(&mut self, address: A) -> Result<u8>
    where A: Into<LogicalAddress>,
    {
        let address = address.into();
        let register = self.select_page(address)?;
        let value = self.bus.read_byte(DPLL_ADDRESS, register)?;
        trace!("dpll: read {address} = 0x{value:02x}");
        Ok(value)
    }

    /// Read consecutive registers into `buffer`. The block must not cross a page.
    pub fn read_block<A>(&mut self, address: A, buffer: &mut [u8]) -> Result<()>
    where A: Into<LogicalAddress>,
    {
        let address = address.into();
        Self::check_block(address, buffer.len())?;
        let register = self.select_page(address)?;
        self.bus.read_block(DPLL_ADDRESS, register, buffer)?;
        trace!("dpll: read {address} = {buffer:02x?}");
        Ok(())
    }
}

impl<B> RegisterSpace for Dpll<'_, B>
where B: BusTransaction,
{
    type Error = Error;

    fn register_read(&mut self, address: RegisterAddress) -> Result<RegisterValue> {
        self.read_byte(address)
    }

    fn register_write(&mut self, address: RegisterAddress, value: RegisterValue) -> Result<()> {
        self.write_byte(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::device::Board;
    use crate::board::mock::{SimulatedBoard, Transaction};
    use crate::board::mux::MUX_ADDRESS;

    #[test]
    fn logical_address_forms_agree() {
        assert_eq!(LogicalAddress::from(0xc0c6), LogicalAddress::from((0xc03c, 0x8a)));
        assert_eq!(LogicalAddress::from((0xc8c2, 0x10)).page(), 0xc8);
        assert_eq!(LogicalAddress::from((0xc8c2, 0x10)).offset(), 0xd2);
        assert_eq!(LogicalAddress::from(0x00ff).to_string(), "0x00ff");
    }

    #[test]
    #[should_panic(expected="address < 0x10000")]
    fn logical_address_overflow() {
        let _ = LogicalAddress::new(0xffff, 0x01);
    }

    #[test]
    fn write_byte_sequence() {
        let mut board = Board::new(SimulatedBoard::new());

        board.dpll().write_byte(0xc161, 0x5a).unwrap();

        assert_eq!(board.bus().log, vec![
            Transaction::WriteByte { address: MUX_ADDRESS, register: 0x00, value: CHANNEL_DPLL },
            Transaction::WriteBlock { address: DPLL_ADDRESS, register: PAGE_ADDR, values: vec![0x61, 0xc1, 0x10, 0x20] },
            Transaction::WriteByte { address: DPLL_ADDRESS, register: 0x61, value: 0x5a },
        ]);
        assert_eq!(board.bus().dpll[0xc161], 0x5a);
    }

    #[test]
    fn both_address_forms_resolve_identically() {
        let mut board = Board::new(SimulatedBoard::new());
        board.bus_mut().dpll[0xc0c6] = 0xa5;

        let absolute = board.dpll().read_byte(0xc0c6).unwrap();
        let relative = board.dpll().read_byte((0xc03c, 0x8a)).unwrap();

        assert_eq!(absolute, 0xa5);
        assert_eq!(relative, 0xa5);
        assert_eq!(board.bus().page_writes(), vec![0xc0]);
    }

    #[test]
    fn page_writes_follow_transitions() {
        let mut board = Board::new(SimulatedBoard::new());
        let addresses: [u16; 8] = [0xc160, 0xc161, 0xc8d2, 0xc8e4, 0xc160, 0xc0c6, 0xc0c7, 0xc0c6];

        {
            let mut dpll = board.dpll();
            for address in addresses {
                dpll.read_byte(address).unwrap();
            }
        }

        // c1 -> c8 -> c1 -> c0
        assert_eq!(board.bus().page_writes(), vec![0xc1, 0xc8, 0xc1, 0xc0]);
        assert_eq!(board.bus().mux_writes(), vec![CHANNEL_DPLL]);
    }

    #[test]
    fn block_access_within_page() {
        let mut board = Board::new(SimulatedBoard::new());

        board.dpll().write_block((0xc160, 0), &[0x12, 0x34]).unwrap();

        let mut buffer = [0u8; 2];
        board.dpll().read_block(0xc160, &mut buffer).unwrap();

        assert_eq!(buffer, [0x12, 0x34]);
        assert_eq!(board.bus().page_writes(), vec![0xc1]);
        assert_eq!(board.bus().log.last(), Some(&Transaction::ReadBlock { address: DPLL_ADDRESS, register: 0x60, length: 2 }));
    }

    #[test]
    fn block_crossing_a_page_is_rejected() {
        let mut board = Board::new(SimulatedBoard::new());

        let result = board.dpll().write_block(0xc1ff, &[0x01, 0x02]);
        assert!(matches!(result, Err(Error::PageCrossing { length: 2, .. })));

        let mut buffer = [0u8; 0x11];
        assert!(board.dpll().read_block(0xc0f0, &mut buffer).is_err());

        assert!(board.bus().log.is_empty());
        board.dpll().write_block(0xc1ff, &[0x01]).unwrap();
    }

    #[test]
    fn mux_change_forgets_page() {
        let mut board = Board::new(SimulatedBoard::new());

        board.dpll().read_byte(0xc160).unwrap();
        board.sfp().poll(1).unwrap();
        board.dpll().read_byte(0xc161).unwrap();

        assert_eq!(board.bus().page_writes(), vec![0xc1, 0xc1]);
        assert_eq!(board.bus().mux_writes(), vec![CHANNEL_DPLL, 0x01, 0x00, CHANNEL_DPLL]);
    }

    #[test]
    fn failed_access_keeps_page_cache() {
        let mut board = Board::new(SimulatedBoard::new());
        board.dpll().read_byte(0xc160).unwrap();

        board.bus_mut().fail_once(DPLL_ADDRESS);
        assert!(matches!(board.dpll().write_byte(0xc161, 0x01), Err(Error::Bus(e)) if e.address == DPLL_ADDRESS));
        assert_eq!(board.window_page(), Some(0xc1));

        // The retry trusts the cache: no page write.
        board.bus_mut().clear_log();
        board.dpll().write_byte(0xc161, 0x01).unwrap();
        assert!(board.bus().page_writes().is_empty());

        // Until the caller says otherwise.
        board.invalidate();
        board.bus_mut().clear_log();
        board.dpll().write_byte(0xc161, 0x01).unwrap();
        assert_eq!(board.bus().mux_writes(), vec![CHANNEL_DPLL]);
        assert_eq!(board.bus().page_writes(), vec![0xc1]);
    }

    #[test]
    fn failed_page_write_is_not_cached() {
        let mut board = Board::new(SimulatedBoard::new());
        board.dpll().ensure_channel().unwrap();

        board.bus_mut().fail_once(DPLL_ADDRESS);
        assert!(board.dpll().read_byte(0xc160).is_err());
        assert_eq!(board.window_page(), None);

        board.dpll().read_byte(0xc160).unwrap();
        assert_eq!(board.bus().page_writes(), vec![0xc1, 0xc1]);
    }
}
