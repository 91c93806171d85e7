//! I2C bus abstraction consumed by the driver.

use core::ops::{Deref, DerefMut};

/// Addressed transactions on a shared two-wire bus.
///
/// The driver brackets every transaction with [`try_lock`](Self::try_lock) and
/// [`unlock`](Self::unlock).
pub trait BusTransport {
    /// Error type for bus transactions
    type Error;

    /// Try to take exclusive use of the bus. Returns `false` if someone else holds it.
    fn try_lock(&mut self) -> bool;

    /// Give up the lock taken by [`Self::try_lock`].
    fn unlock(&mut self);

    /// Write `bytes` to the device at `address`.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `bytes` - Bytes to write, register address first
    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fill `buffer` from the device's currently selected register.
    fn read_from_into(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `out` then read into `buffer` without releasing the bus (repeated start).
    ///
    /// Used to select a register then fetch its contents.
    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Lend a bus to a device for a while, e.g. to talk to several units in turn.
impl<B: BusTransport + ?Sized> BusTransport for &mut B {
    type Error = B::Error;

    fn try_lock(&mut self) -> bool {
        (**self).try_lock()
    }

    fn unlock(&mut self) {
        (**self).unlock()
    }

    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write_to(address, bytes)
    }

    fn read_from_into(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read_from_into(address, buffer)
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        (**self).write_then_read(address, out, buffer)
    }
}

/// Holds the bus lock; unlocks when dropped, whichever way the holder exits.
pub(crate) struct BusGuard<'a, B: BusTransport> {
    bus: &'a mut B,
}

impl<'a, B: BusTransport> BusGuard<'a, B> {
    /// Returns `None` when the lock is taken.
    pub(crate) fn acquire(bus: &'a mut B) -> Option<Self> {
        if bus.try_lock() {
            Some(Self { bus })
        } else {
            None
        }
    }
}

impl<B: BusTransport> Deref for BusGuard<'_, B> {
    type Target = B;

    fn deref(&self) -> &Self::Target {
        &*self.bus
    }
}

impl<B: BusTransport> DerefMut for BusGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.bus
    }
}

impl<B: BusTransport> Drop for BusGuard<'_, B> {
    fn drop(&mut self) {
        self.bus.unlock();
    }
}

/// [`BusTransport`] over any `embedded-hal` I2C master.
///
/// The peripheral is owned outright, so locking always succeeds. Share one peripheral
/// between drivers with `embedded-hal-bus` and give each driver its own `HalBus`.
pub struct HalBus<I2C> {
    i2c: I2C,
}

impl<I2C> HalBus<I2C> {
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Consume the adapter and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> BusTransport for HalBus<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = I2C::Error;

    fn try_lock(&mut self) -> bool {
        true
    }

    fn unlock(&mut self) {}

    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn read_from_into(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buffer)
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(address, out, buffer)
    }
}
