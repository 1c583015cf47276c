use std::fs::{File, OpenOptions};
use std::ptr;

use log::debug;
use memmap2::{MmapOptions, MmapRaw};

use super::device::{Error, Result};

/// A PCI memory window, accessed 32 bits at a time.
pub trait Bar {
    fn size(&self) -> usize;
    fn read32(&self, offset: usize) -> Result<u32>;
    fn write32(&mut self, offset: usize, value: u32) -> Result<()>;
}

/// Reject accesses that are misaligned or run past the end of the window.
pub fn check_access(offset: usize, size: usize) -> Result<()> {
    match offset.checked_add(4) {
        Some(end) if end <= size && offset % 4 == 0 => Ok(()),
        _ => Err(Error::BarAccess { offset, size }),
    }
}

/// Parse a BAR size: decimal bytes, or with a `K`, `M` or `G` suffix.
pub fn parse_size(s: &str) -> Result<usize> {
    let invalid = || Error::InvalidSize(s.to_string());

    let (digits, scale) = match s.char_indices().last() {
        Some((i, 'K')) => (&s[..i], 1 << 10),
        Some((i, 'M')) => (&s[..i], 1 << 20),
        Some((i, 'G')) => (&s[..i], 1 << 30),
        Some(_) => (s, 1),
        None => return Err(invalid()),
    };

    let size: usize = digits.parse().map_err(|_| invalid())?;
    size.checked_mul(scale).filter(|&n| n > 0).ok_or_else(invalid)
}

/// A physical memory window mapped from `/dev/mem`.
pub struct MappedBar {
    mmap: MmapRaw,
}

impl MappedBar {
    pub fn open(physical: u64, size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/mem")?;

        let bar = Self::map(&file, physical, size)?;
        debug!("bar: mapped 0x{size:x} bytes at 0x{physical:x}");
        Ok(bar)
    }

    fn map(file: &File, offset: u64, size: usize) -> Result<Self> {
        let mmap = MmapOptions::new()
            .offset(offset)
            .len(size)
            .map_raw(file)?;

        Ok(Self {
            mmap,
        })
    }
}

impl Bar for MappedBar {
    fn size(&self) -> usize {
        self.mmap.len()
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        check_access(offset, self.size())?;
        let value = unsafe { ptr::read_volatile(self.mmap.as_ptr().add(offset).cast::<u32>()) };
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        check_access(offset, self.size())?;
        unsafe { ptr::write_volatile(self.mmap.as_mut_ptr().add(offset).cast::<u32>(), value) };
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////

/// Extended device control: SDP2/SDP3 direction and data.
const CTRL_EXT: usize = 0x18;

const LED_CONFIG: usize = 0xe00;
const LED_ALWAYS_OFF: u32 = 0x1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sdp {
    Sdp2,
    Sdp3,
}

impl Sdp {
    fn direction_bit(&self) -> u32 {
        match self {
            Sdp::Sdp2 => 1 << 10,
            Sdp::Sdp3 => 1 << 11,
        }
    }

    fn data_bit(&self) -> u32 {
        match self {
            Sdp::Sdp2 => 1 << 6,
            Sdp::Sdp3 => 1 << 7,
        }
    }
}

/// The Ethernet controller's software-definable pins that the board wires
/// to its own logic.
pub struct SoftwarePins<T: Bar> {
    bar: T,
}

impl<T: Bar> SoftwarePins<T> {
    pub fn new(bar: T) -> Self {
        Self {
            bar,
        }
    }

    fn modify<F>(&mut self, f: F) -> Result<()>
    where F: FnOnce(u32) -> u32,
    {
        let value = self.bar.read32(CTRL_EXT)?;
        self.bar.write32(CTRL_EXT, f(value))
    }

    pub fn direction_input(&mut self, pin: Sdp) -> Result<()> {
        self.modify(|v| v & !pin.direction_bit())
    }

    pub fn direction_output(&mut self, pin: Sdp, high: bool) -> Result<()> {
        self.modify(|v| {
            let v = v | pin.direction_bit();
            if high { v | pin.data_bit() } else { v & !pin.data_bit() }
        })
    }

    pub fn get(&self, pin: Sdp) -> Result<bool> {
        Ok(self.bar.read32(CTRL_EXT)? & pin.data_bit() != 0)
    }

    /// Force LED0-LED2 off. LED1 doubles as the board reset line.
    pub fn leds_off(&mut self) -> Result<()> {
        self.bar.write32(LED_CONFIG, LED_ALWAYS_OFF | (LED_ALWAYS_OFF << 8) | (LED_ALWAYS_OFF << 16))
    }

    #[cfg(test)]
    pub fn into_inner(self) -> T {
        self.bar
    }
}
