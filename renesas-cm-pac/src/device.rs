use core::marker::PhantomData;

use crate::register::*;

pub type RegisterAddress = u16;
pub type RegisterValue = u8;

/// Byte-wide access to the ClockMatrix register space.
pub trait RegisterSpace {
    type Error;

    fn register_read(&mut self, address: RegisterAddress) -> Result<RegisterValue, Self::Error>;
    fn register_write(&mut self, address: RegisterAddress, value: RegisterValue) -> Result<(), Self::Error>;
}

pub struct Access<'a, D, T>
where D: RegisterSpace,
{
    device: &'a mut D,
    address: RegisterAddress,
    t: PhantomData<T>,
}

impl<'a, D, T> Access<'a, D, T>
where D: RegisterSpace,
{
    fn new(device: &'a mut D, address: RegisterAddress) -> Self {
        Self {
            device,
            address,
            t: PhantomData::default(),
        }
    }

    pub fn address(&self) -> RegisterAddress {
        self.address
    }
}

impl<D, T> Access<'_, D, T>
where D: RegisterSpace,
      T: From<u8>,
{
    pub fn read(&mut self) -> Result<T, D::Error> {
        Ok(T::from(self.device.register_read(self.address)?))
    }
}

impl<D, T> Access<'_, D, T>
where D: RegisterSpace,
      T: From<u8> + Into<u8>,
{
    fn set_typed(&mut self, value: T) -> Result<(), D::Error> {
        self.device.register_write(self.address, value.into())
    }

    /// Write the register, starting from an all-zeroes value.
    pub fn write<F>(&mut self, f: F) -> Result<(), D::Error>
    where
        F: FnOnce(T) -> T,
    {
        let value = T::from(0);
        let new_value = f(value);
        self.set_typed(new_value)
    }

    pub fn modify<F>(&mut self, f: F) -> Result<(), D::Error>
    where
        F: FnOnce(T) -> T,
    {
        let value = self.read()?;
        let new_value = f(value);
        self.set_typed(new_value)
    }
}

///////////////////////////////////////////////////////////////////////
// GPIO

pub const GPIOS_COUNT: usize = 16;

/// Half of the GPIO output/level register pairs a GPIO lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GpioBank {
    /// GPIO0-7
    Low,
    /// GPIO8-15
    High,
}

impl GpioBank {
    pub fn of(index: usize) -> Self {
        assert!(index < GPIOS_COUNT);
        if index < 8 {
            GpioBank::Low
        } else {
            GpioBank::High
        }
    }

    /// Bit position of a GPIO within its bank's registers.
    pub fn bit(index: usize) -> usize {
        assert!(index < GPIOS_COUNT);
        index % 8
    }

    fn offset(&self) -> usize {
        match self {
            GpioBank::Low => 0,
            GpioBank::High => 1,
        }
    }
}

pub struct Gpio<'a, D>
where D: RegisterSpace,
{
    device: &'a mut D,
    index: usize,
}

impl<'a, D> Gpio<'a, D>
where D: RegisterSpace,
{
    fn new(device: &'a mut D, index: usize) -> Self {
        assert!(index < GPIOS_COUNT);

        Self {
            device,
            index,
        }
    }

    fn access<T>(&mut self, offset: usize) -> Access<'_, D, T> {
        Access::new(self.device, Addressing::gpio(self.index, offset))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn gpiocr(&mut self) -> Access<'_, D, GPIOCR> { self.access(0x10) }
}

/// ClockMatrix device interface
///
/// Wraps anything that can reach the part's register space and hands out
/// typed accessors for the registers this crate knows about.
///
pub struct ClockMatrix<'a, D>
where D: RegisterSpace,
{
    device: &'a mut D,
}

impl<'a, D> ClockMatrix<'a, D>
where D: RegisterSpace,
{
    pub fn new(device: &'a mut D) -> Self {
        Self {
            device,
        }
    }

    pub fn gpio(&mut self, index: usize) -> Gpio<'_, D> {
        Gpio::new(self.device, index)
    }

    pub fn gpioout(&mut self, bank: GpioBank) -> Access<'_, D, GPIOOUT> {
        Access::new(self.device, Addressing::gpio_user_control(bank.offset()))
    }

    /// The byte of the output register pair whose write commits both halves.
    pub fn gpioout_commit(&mut self) -> Access<'_, D, GPIOOUT> {
        self.gpioout(GpioBank::High)
    }

    pub fn gpiolvl(&mut self, bank: GpioBank) -> Access<'_, D, GPIOLVL> {
        Access::new(self.device, Addressing::status(0x8a + bank.offset()))
    }
}

/// ClockMatrix register map addressing abstraction
///
struct Addressing {}

impl Addressing {
    /// GPIO module base addresses. The modules are 0x12 bytes long but do
    /// not pack evenly: the map skips ahead at each 0x..00 boundary.
    const GPIO_BASE: [RegisterAddress; GPIOS_COUNT] = [
        0xc8c2, 0xc8d4, 0xc8e6, 0xc900, 0xc912, 0xc924, 0xc936, 0xc948,
        0xc95a, 0xc980, 0xc992, 0xc9a4, 0xc9b6, 0xc9c8, 0xc9da, 0xca00,
    ];

    const GPIO_USER_CONTROL: RegisterAddress = 0xc160;
    const STATUS: RegisterAddress = 0xc03c;

    fn gpio(index: usize, offset: usize) -> RegisterAddress {
        assert!(index < GPIOS_COUNT);
        assert!(offset < 0x12);
        Self::GPIO_BASE[index] + offset as RegisterAddress
    }

    fn gpio_user_control(offset: usize) -> RegisterAddress {
        assert!(offset < 2);
        Self::GPIO_USER_CONTROL + offset as RegisterAddress
    }

    fn status(offset: usize) -> RegisterAddress {
        assert!(offset < 0x100);
        Self::STATUS + offset as RegisterAddress
    }
}
