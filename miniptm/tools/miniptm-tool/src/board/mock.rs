//! A software model of the MiniPTM I2C topology, for tests.

use std::collections::{BTreeMap, HashMap};
use std::io;

use super::bus::{BusError, BusTransaction, DeviceAddress};
use super::eeprom::EEPROM_ADDRESS;
use super::mux::{CHANNEL_DPLL, MUX_ADDRESS};
use super::paged::{DPLL_ADDRESS, PAGE_ADDR};
use super::sfp::{SFP_ADDRESS_A0, SFP_ADDRESS_A2};

const GPIOOUT_LOW: usize = 0xc160;
const GPIOOUT_HIGH: usize = 0xc161;
const GPIOLVL_LOW: usize = 0xc0c6;
const GPIOLVL_HIGH: usize = 0xc0c7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Transaction {
    WriteByte { address: DeviceAddress, register: u8, value: u8 },
    WriteBlock { address: DeviceAddress, register: u8, values: Vec<u8> },
    ReadByte { address: DeviceAddress, register: u8 },
    ReadBlock { address: DeviceAddress, register: u8, length: usize },
}

/// An SFP module: 256 bytes at A0h, and optionally 256 bytes at A2h.
pub(crate) struct Cage {
    pub a0: Vec<u8>,
    pub a2: Option<Vec<u8>>,
}

impl Cage {
    pub fn new(module_type: u8, vendor: &str, part: &str, serial: &str) -> Self {
        fn field(a0: &mut [u8], offset: usize, text: &str) {
            let padded = format!("{text:<16}");
            a0[offset..offset + 16].copy_from_slice(&padded.as_bytes()[..16]);
        }

        let mut a0 = vec![0u8; 256];
        a0[0] = module_type;
        field(&mut a0, 20, vendor);
        field(&mut a0, 40, part);
        field(&mut a0, 68, serial);

        Self {
            a0,
            a2: None,
        }
    }

    pub fn with_diagnostics(mut self, temperature: i16, tx_power: u16, rx_power: u16, status: u8) -> Self {
        let mut a2 = vec![0u8; 256];
        a2[96..98].copy_from_slice(&temperature.to_be_bytes());
        a2[102..104].copy_from_slice(&tx_power.to_be_bytes());
        a2[104..106].copy_from_slice(&rx_power.to_be_bytes());
        a2[110] = status;
        self.a2 = Some(a2);
        self
    }
}

/// Mux, DPLL and SFP cages behind one simulated bus.
///
/// The DPLL only sees its page window and 256-byte register slices, like the
/// real part. Writing the GPIO output register's commit byte (0xc161) copies
/// both output bytes into the level registers; nothing else does.
///
pub(crate) struct SimulatedBoard {
    pub log: Vec<Transaction>,
    /// DPLL data accesses by full 16-bit address: ('r' | 'w', address, value).
    pub dpll_log: Vec<(char, u16, u8)>,
    pub dpll: Vec<u8>,
    pub eeprom: BTreeMap<u32, u8>,
    mux: u8,
    page: Option<u8>,
    cages: HashMap<u8, Cage>,
    failing: Vec<DeviceAddress>,
    failing_once: Vec<(DeviceAddress, usize)>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            dpll_log: Vec::new(),
            dpll: vec![0; 0x10000],
            eeprom: BTreeMap::new(),
            mux: 0,
            page: None,
            cages: HashMap::new(),
            failing: Vec::new(),
            failing_once: Vec::new(),
        }
    }

    /// Insert a module in the cage reached through mux `channel`.
    pub fn insert(&mut self, channel: u8, cage: Cage) {
        self.cages.insert(channel, cage);
    }

    /// NACK every transaction to `address` from now on.
    pub fn fail(&mut self, address: DeviceAddress) {
        self.failing.push(address);
    }

    /// NACK the next transaction to `address`.
    pub fn fail_once(&mut self, address: DeviceAddress) {
        self.fail_after(address, 0);
    }

    /// Let `skip` transactions to `address` through, then NACK one.
    pub fn fail_after(&mut self, address: DeviceAddress, skip: usize) {
        self.failing_once.push((address, skip));
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.dpll_log.clear();
    }

    pub fn mux(&self) -> u8 {
        self.mux
    }

    pub fn mux_writes(&self) -> Vec<u8> {
        self.log.iter().filter_map(|t| match t {
            Transaction::WriteByte { address: MUX_ADDRESS, value, .. } => Some(*value),
            _ => None,
        }).collect()
    }

    /// Upper address bytes sent to the DPLL page window, in order.
    pub fn page_writes(&self) -> Vec<u8> {
        self.log.iter().filter_map(|t| match t {
            Transaction::WriteBlock { address: DPLL_ADDRESS, register: PAGE_ADDR, values } => Some(values[1]),
            _ => None,
        }).collect()
    }

    fn nack(address: DeviceAddress) -> BusError {
        BusError::new(address, io::Error::from_raw_os_error(libc::ENXIO))
    }

    fn cage(&self) -> Option<&Cage> {
        self.cages.get(&self.mux)
    }

    fn sfp_memory(&self, address: DeviceAddress) -> Option<&[u8]> {
        let cage = self.cage()?;
        match address {
            SFP_ADDRESS_A0 => Some(&cage.a0),
            SFP_ADDRESS_A2 => cage.a2.as_deref(),
            _ => None,
        }
    }

    fn acknowledge(&mut self, transaction: Transaction) -> Result<(), BusError> {
        let address = match &transaction {
            Transaction::WriteByte { address, .. }
            | Transaction::WriteBlock { address, .. }
            | Transaction::ReadByte { address, .. }
            | Transaction::ReadBlock { address, .. } => *address,
        };
        self.log.push(transaction);

        if let Some(index) = self.failing_once.iter().position(|&(a, _)| a == address) {
            let skip = &mut self.failing_once[index].1;
            if *skip > 0 {
                *skip -= 1;
            } else {
                self.failing_once.remove(index);
                return Err(Self::nack(address));
            }
        }

        let present = match address {
            MUX_ADDRESS => true,
            DPLL_ADDRESS => self.mux & CHANNEL_DPLL != 0,
            SFP_ADDRESS_A0 | SFP_ADDRESS_A2 => self.sfp_memory(address).is_some(),
            a if a & !1 == EEPROM_ADDRESS => true,
            _ => false,
        };

        if present && !self.failing.contains(&address) {
            Ok(())
        } else {
            Err(Self::nack(address))
        }
    }

    fn dpll_address(&self, register: u8, index: usize) -> usize {
        let page = self.page.expect("DPLL accessed before its page window was set");
        assert!(register as usize + index < 0x100, "DPLL access crosses a page");
        ((page as usize) << 8) | (register as usize + index)
    }

    fn dpll_write(&mut self, register: u8, index: usize, value: u8) {
        let address = self.dpll_address(register, index);
        self.dpll[address] = value;
        self.dpll_log.push(('w', address as u16, value));

        if address == GPIOOUT_HIGH {
            self.dpll[GPIOLVL_LOW] = self.dpll[GPIOOUT_LOW];
            self.dpll[GPIOLVL_HIGH] = self.dpll[GPIOOUT_HIGH];
        }
    }

    fn dpll_read(&mut self, register: u8, index: usize) -> u8 {
        let address = self.dpll_address(register, index);
        let value = self.dpll[address];
        self.dpll_log.push(('r', address as u16, value));
        value
    }
}

impl BusTransaction for SimulatedBoard {
    fn write_byte(&mut self, address: DeviceAddress, register: u8, value: u8) -> Result<(), BusError> {
        self.acknowledge(Transaction::WriteByte { address, register, value })?;

        match address {
            MUX_ADDRESS => self.mux = value,
            DPLL_ADDRESS => self.dpll_write(register, 0, value),
            _ => panic!("unexpected byte write to 0x{address:02x}"),
        }
        Ok(())
    }

    fn write_block(&mut self, address: DeviceAddress, register: u8, values: &[u8]) -> Result<(), BusError> {
        self.acknowledge(Transaction::WriteBlock { address, register, values: values.to_vec() })?;

        match address {
            DPLL_ADDRESS if register == PAGE_ADDR => {
                assert_eq!(values.len(), 4);
                assert_eq!(&values[2..], &[0x10, 0x20]);
                self.page = Some(values[1]);
            },
            DPLL_ADDRESS => {
                for (index, &value) in values.iter().enumerate() {
                    self.dpll_write(register, index, value);
                }
            },
            a if a & !1 == EEPROM_ADDRESS => {
                assert_eq!(values.len(), 2);
                let memory_address = (u32::from(a & 1) << 16) | (u32::from(register) << 8) | u32::from(values[0]);
                self.eeprom.insert(memory_address, values[1]);
            },
            _ => panic!("unexpected block write to 0x{address:02x}"),
        }
        Ok(())
    }

    fn read_byte(&mut self, address: DeviceAddress, register: u8) -> Result<u8, BusError> {
        self.acknowledge(Transaction::ReadByte { address, register })?;

        match address {
            DPLL_ADDRESS => Ok(self.dpll_read(register, 0)),
            _ => {
                let memory = self.sfp_memory(address).expect("acknowledged SFP read");
                Ok(memory[register as usize])
            },
        }
    }

    fn read_block(&mut self, address: DeviceAddress, register: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.acknowledge(Transaction::ReadBlock { address, register, length: buffer.len() })?;

        match address {
            DPLL_ADDRESS => {
                for (index, value) in buffer.iter_mut().enumerate() {
                    *value = self.dpll_read(register, index);
                }
            },
            _ => {
                let memory = self.sfp_memory(address).expect("acknowledged SFP read");
                let start = register as usize;
                buffer.copy_from_slice(&memory[start..start + buffer.len()]);
            },
        }
        Ok(())
    }
}
