//! We use this mocking module in unit tests to emulate a Cotek PSU sitting on an I2C bus.

use crate::{bus::BusTransport, register::CotekRegister};

/// One call made on the mock bus, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Lock,
    Unlock,
    Write {
        address: u8,
        bytes: heapless::Vec<u8, 17>,
    },
    Read {
        address: u8,
        len: usize,
    },
    WriteRead {
        address: u8,
        register: u8,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBusError {
    /// Nobody answered at the address used.
    Nack,
    /// Failure injected by the test.
    SimulatedError,
    /// A transaction was attempted without holding the lock.
    NotLocked,
    /// Operation log is full.
    BufferOverflow,
}

/// Our mock type used to emulate a PSU register file.
pub struct MockBus {
    /// Address the emulated PSU answers at
    address: u8,
    registers: [u8; 128],
    /// Register pointer, set by the first byte of every write
    pointer: u8,
    ops: heapless::Vec<BusOp, 128>,
    /// Data transactions performed so far
    transactions: usize,
    /// Fail the data transaction with this number
    fail_at: Option<usize>,
    locked: bool,
    /// Simulate another bus user holding the lock
    locked_elsewhere: bool,
    /// Set the command error bit on every commit
    reject_commits: bool,
}

impl MockBus {
    /// A blank register file answering at `address`.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 128],
            pointer: 0,
            ops: heapless::Vec::new(),
            transactions: 0,
            fail_at: None,
            locked: false,
            locked_elsewhere: false,
            reject_commits: false,
        }
    }

    /// A register file holding the factory data of an AE-800-24.
    pub fn with_identity(address: u8) -> Self {
        let mut bus = Self::new(address);
        bus.set_register(CotekRegister::Manufacturer, b"COTEK,TAIWAN\0\0\0\0");
        bus.set_register(CotekRegister::Model, b"AE-800-24,\0\0\0\0\0\0");
        bus.set_register(CotekRegister::OutputVoltageSnapshot, &2400u16.to_le_bytes());
        bus.set_register(CotekRegister::Revision, b"1.02");
        bus.set_register(CotekRegister::DateOfManufacture, b"01152023");
        bus.set_register(CotekRegister::SerialNumber, b"CTK20230115A0042");
        bus.set_register(CotekRegister::CountryOfManufacture, b"TAIWAN          ");
        bus.set_register(CotekRegister::RatedOutputVoltage, &2400u16.to_le_bytes());
        bus.set_register(CotekRegister::RatedOutputCurrent, &3330u16.to_le_bytes());
        bus.set_register(CotekRegister::MaxOutputVoltage, &2880u16.to_le_bytes());
        bus.set_register(CotekRegister::MaxOutputCurrent, &3330u16.to_le_bytes());
        bus.set_register(CotekRegister::InternalTemperature, &[35]);
        bus
    }

    /// Overwrite the contents of `register`.
    pub fn set_register(&mut self, register: CotekRegister, bytes: &[u8]) {
        assert_eq!(bytes.len(), register.width(), "{register:?}");
        let start = register.address() as usize;
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Current contents of `register`.
    pub fn register(&self, register: CotekRegister) -> &[u8] {
        let start = register.address() as usize;
        &self.registers[start..start + register.width()]
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Bytes of every write, in order.
    pub fn writes(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.ops.iter().filter_map(|op| match op {
            BusOp::Write { bytes, .. } => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// Make the `n`th data transaction from now fail, counting from zero.
    pub fn fail_transaction(&mut self, n: usize) {
        self.fail_at = Some(self.transactions + n);
    }

    pub fn set_locked_elsewhere(&mut self, locked: bool) {
        self.locked_elsewhere = locked;
    }

    pub fn set_reject_commits(&mut self, reject: bool) {
        self.reject_commits = reject;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn record(&mut self, op: BusOp) -> Result<(), MockBusError> {
        self.ops.push(op).map_err(|_| MockBusError::BufferOverflow)
    }

    /// Common checks at the start of every data transaction.
    fn begin(&mut self, address: u8) -> Result<(), MockBusError> {
        if !self.locked {
            return Err(MockBusError::NotLocked);
        }
        let number = self.transactions;
        self.transactions += 1;
        if self.fail_at == Some(number) {
            return Err(MockBusError::SimulatedError);
        }
        if address != self.address {
            return Err(MockBusError::Nack);
        }
        Ok(())
    }

    fn store(&mut self, value: u8) {
        let index = self.pointer as usize % self.registers.len();
        if index == CotekRegister::Control.address() as usize {
            // Command error is read only for the host.
            let error_bit = self.registers[index] & 0x08;
            let mut value = (value & !0x08) | error_bit;
            if value & 0x04 != 0 {
                // Commit: the update flag clears itself and the error flag reports the outcome.
                value &= !0x04;
                value = if self.reject_commits {
                    value | 0x08
                } else {
                    value & !0x08
                };
            }
            self.registers[index] = value;
        } else {
            self.registers[index] = value;
        }
        self.pointer = self.pointer.wrapping_add(1);
    }

    fn load(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.registers[self.pointer as usize % self.registers.len()];
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

impl BusTransport for MockBus {
    type Error = MockBusError;

    fn try_lock(&mut self) -> bool {
        if self.locked || self.locked_elsewhere {
            return false;
        }
        self.locked = true;
        // A full log is reported by the next data transaction.
        let _ = self.ops.push(BusOp::Lock);
        true
    }

    fn unlock(&mut self) {
        self.locked = false;
        let _ = self.ops.push(BusOp::Unlock);
    }

    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.begin(address)?;
        let logged = heapless::Vec::from_slice(bytes).map_err(|_| MockBusError::BufferOverflow)?;
        self.record(BusOp::Write {
            address,
            bytes: logged,
        })?;
        if let Some((&register, data)) = bytes.split_first() {
            self.pointer = register;
            for &value in data {
                self.store(value);
            }
        }
        Ok(())
    }

    fn read_from_into(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.begin(address)?;
        self.record(BusOp::Read {
            address,
            len: buffer.len(),
        })?;
        self.load(buffer);
        Ok(())
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.begin(address)?;
        let register = out.first().copied().unwrap_or(self.pointer);
        self.record(BusOp::WriteRead {
            address,
            register,
            len: buffer.len(),
        })?;
        self.pointer = register;
        self.load(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(address: u8) -> MockBus {
        let mut bus = MockBus::new(address);
        assert!(bus.try_lock());
        bus
    }

    #[test]
    fn test_write_then_read_back() {
        let mut bus = locked(0x50);
        bus.write_to(0x50, &[0x70, 0x74, 0x09]).unwrap();
        let mut buffer = [0u8; 2];
        bus.write_then_read(0x50, &[0x70], &mut buffer).unwrap();
        assert_eq!(buffer, [0x74, 0x09]);
        assert_eq!(bus.register(CotekRegister::VoltageSetpoint), &[0x74, 0x09]);
    }

    #[test]
    fn test_read_continues_from_pointer() {
        let mut bus = locked(0x50);
        bus.write_to(0x50, &[0x24, b'1', b'.', b'0', b'2']).unwrap();
        bus.write_to(0x50, &[0x24]).unwrap();
        let mut buffer = [0u8; 4];
        bus.read_from_into(0x50, &mut buffer).unwrap();
        assert_eq!(&buffer, b"1.02");
    }

    #[test]
    fn test_wrong_address_nacks() {
        let mut bus = locked(0x50);
        assert_eq!(bus.write_to(0x51, &[0x00]), Err(MockBusError::Nack));
    }

    #[test]
    fn test_unlocked_transaction_is_refused() {
        let mut bus = MockBus::new(0x50);
        let mut buffer = [0u8; 1];
        assert_eq!(
            bus.write_then_read(0x50, &[0x68], &mut buffer),
            Err(MockBusError::NotLocked)
        );
    }

    #[test]
    fn test_lock_is_exclusive() {
        let mut bus = MockBus::new(0x50);
        bus.set_locked_elsewhere(true);
        assert!(!bus.try_lock());
        bus.set_locked_elsewhere(false);
        assert!(bus.try_lock());
        assert!(!bus.try_lock());
        bus.unlock();
        assert!(!bus.is_locked());
    }

    #[test]
    fn test_injected_failure() {
        let mut bus = locked(0x50);
        bus.fail_transaction(1);
        assert!(bus.write_to(0x50, &[0x70, 0x00, 0x00]).is_ok());
        assert_eq!(
            bus.write_to(0x50, &[0x72, 0x00, 0x00]),
            Err(MockBusError::SimulatedError)
        );
        assert!(bus.write_to(0x50, &[0x72, 0x00, 0x00]).is_ok());
    }

    #[test]
    fn test_commit_emulation() {
        let mut bus = locked(0x50);
        bus.write_to(0x50, &[0x7C, 0x85]).unwrap();
        // Update flag cleared, error flag clear, power and remote kept.
        assert_eq!(bus.register(CotekRegister::Control), &[0x81]);

        bus.set_reject_commits(true);
        bus.write_to(0x50, &[0x7C, 0x85]).unwrap();
        assert_eq!(bus.register(CotekRegister::Control), &[0x89]);

        // The host cannot clear the error flag by writing it.
        bus.write_to(0x50, &[0x7C, 0x80]).unwrap();
        assert_eq!(bus.register(CotekRegister::Control), &[0x88]);
    }
}
