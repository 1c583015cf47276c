#![allow(non_camel_case_types)]

use std::{fs::{self, File, OpenOptions}, io, os::unix::io::AsRawFd, path::Path};

use log::debug;

use super::bus::{BusError, BusTransaction, DeviceAddress};

const SYSFS_I2C_ADAPTERS: &str = "/sys/class/i2c-adapter";

// From <linux/i2c-dev.h> and <linux/i2c.h>.
const I2C_RDWR: libc::c_ulong = 0x0707;
const I2C_M_RD: u16 = 0x0001;

const BLOCK_MAX: usize = 32;

#[repr(C)]
struct i2c_msg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
struct i2c_rdwr_ioctl_data {
    msgs: *mut i2c_msg,
    nmsgs: u32,
}

/// Return the numbers of the I2C buses whose adapter name contains
/// `adapter_name`, lowest first.
///
pub fn find_buses(adapter_name: &str) -> io::Result<Vec<u32>> {
    find_buses_in(Path::new(SYSFS_I2C_ADAPTERS), adapter_name)
}

fn find_buses_in(root: &Path, adapter_name: &str) -> io::Result<Vec<u32>> {
    let mut buses = Vec::new();

    for entry in fs::read_dir(root)?.flatten() {
        let number = entry.file_name()
            .to_str()
            .and_then(|n| n.strip_prefix("i2c-"))
            .and_then(|n| n.parse::<u32>().ok());

        if let Some(number) = number {
            match fs::read_to_string(entry.path().join("name")) {
                Ok(name) if name.trim().contains(adapter_name) => buses.push(number),
                Ok(_) => {},
                Err(e) => debug!("i2c-{number}: unreadable adapter name: {e}"),
            }
        }
    }

    buses.sort_unstable();
    Ok(buses)
}

/// An I2C bus reached through the Linux i2c-dev interface.
///
/// Each transaction is issued as one combined `I2C_RDWR` transfer, so reads
/// use a repeated start between the register byte and the data.
///
pub struct LinuxI2c {
    file: File,
}

impl LinuxI2c {
    pub fn open(bus: u32) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(format!("/dev/i2c-{bus}"))?;

        debug!("i2c-{bus}: opened");

        Ok(Self {
            file,
        })
    }

    fn transfer(&mut self, msgs: &mut [i2c_msg]) -> io::Result<()> {
        let mut data = i2c_rdwr_ioctl_data {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        let result = unsafe {
            libc::ioctl(self.file.as_raw_fd(), I2C_RDWR as _, &mut data as *mut i2c_rdwr_ioctl_data)
        };

        if result < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn write(&mut self, address: DeviceAddress, register: u8, values: &[u8]) -> io::Result<()> {
        if values.len() > BLOCK_MAX {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "block write longer than 32 bytes"));
        }

        let mut buf = [0u8; BLOCK_MAX + 1];
        buf[0] = register;
        buf[1..=values.len()].copy_from_slice(values);

        let mut msgs = [
            i2c_msg { addr: address.into(), flags: 0, len: (values.len() + 1) as u16, buf: buf.as_mut_ptr() },
        ];
        self.transfer(&mut msgs)
    }

    fn read(&mut self, address: DeviceAddress, register: u8, buffer: &mut [u8]) -> io::Result<()> {
        if buffer.len() > BLOCK_MAX {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "block read longer than 32 bytes"));
        }

        let mut reg = [register];
        let mut msgs = [
            i2c_msg { addr: address.into(), flags: 0,        len: 1,                    buf: reg.as_mut_ptr()    },
            i2c_msg { addr: address.into(), flags: I2C_M_RD, len: buffer.len() as u16, buf: buffer.as_mut_ptr() },
        ];
        self.transfer(&mut msgs)
    }
}

impl BusTransaction for LinuxI2c {
    fn write_byte(&mut self, address: DeviceAddress, register: u8, value: u8) -> Result<(), BusError> {
        self.write(address, register, &[value]).map_err(|e| BusError::new(address, e))
    }

    fn write_block(&mut self, address: DeviceAddress, register: u8, values: &[u8]) -> Result<(), BusError> {
        self.write(address, register, values).map_err(|e| BusError::new(address, e))
    }

    fn read_byte(&mut self, address: DeviceAddress, register: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.read(address, register, &mut buf).map_err(|e| BusError::new(address, e))?;
        Ok(buf[0])
    }

    fn read_block(&mut self, address: DeviceAddress, register: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.read(address, register, buffer).map_err(|e| BusError::new(address, e))
    }
}
