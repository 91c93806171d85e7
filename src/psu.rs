use crate::{
    bus::{BusGuard, BusTransport},
    codec::{FieldCodec, FieldEncode},
    error::{DecodeError, Error, Result},
    observer::{NoopObserver, Observer},
    property::{self, BitProperty, Property, ReadWrite},
    register::{ControlBit, ControlByte, ControlFlag, CotekRegister, MAX_FIELD_WIDTH, StatusFlag},
    types::{
        ControlState, DeviceIdentity, DeviceIndex, DeviceSetpoint, DeviceTelemetry,
        ManufactureDate, RemoteState, StatusFlags,
    },
};

/// You can create a CotekPsu using any bus which implements [BusTransport].
///
/// Every method goes to the bus; nothing read is cached, since faults and measurements change
/// underneath us. Reads of several fields are separate transactions and are not atomic.
///
/// To drive the output remotely, follow the handshake: [`Self::enable_remote_control`], write
/// setpoints and/or [`Self::set_output_enabled`], then [`Self::commit`]. Finish with
/// [`Self::shutdown`] to hand control back to the front panel.
pub struct CotekPsu<B: BusTransport, O: Observer = NoopObserver> {
    bus: B,
    /// 7-bit address, `0x50 + index`.
    address: u8,
    observer: O,
}

impl<B: BusTransport> CotekPsu<B> {
    /// Create a new CotekPsu for the unit at `index` on `bus`.
    pub fn new(bus: B, index: DeviceIndex) -> Self {
        Self {
            bus,
            address: index.address(),
            observer: NoopObserver,
        }
    }
}

impl<B: BusTransport, O: Observer> CotekPsu<B, O> {
    /// Replace the observer notified of reads and handshake steps.
    pub fn with_observer<P: Observer>(self, observer: P) -> CotekPsu<B, P> {
        CotekPsu {
            bus: self.bus,
            address: self.address,
            observer,
        }
    }

    /// 7-bit bus address of this unit.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Consume the driver and return the bus.
    pub fn release(self) -> B {
        self.bus
    }

    /// Read and decode any property.
    pub fn read<C: FieldCodec, A>(&mut self, property: &Property<C, A>) -> Result<C::Value, B::Error> {
        let codec = property.codec();
        let width = codec.width();
        let mut buffer = [0u8; MAX_FIELD_WIDTH];
        let raw = buffer
            .get_mut(..width)
            .ok_or(DecodeError::WidthMismatch {
                expected: width,
                actual: MAX_FIELD_WIDTH,
            })?;
        self.read_register(property.register(), raw)?;
        Ok(codec.decode(raw)?)
    }

    /// Encode and write a read-write property.
    ///
    /// The value is checked before the bus is touched.
    pub fn write<C: FieldEncode>(
        &mut self,
        property: &Property<C, ReadWrite>,
        value: C::Value,
    ) -> Result<(), B::Error> {
        let frame = property.frame(&value)?;
        self.write_register(frame.as_bytes())
    }

    /// Read a single bit.
    pub fn read_bit<A>(&mut self, property: &BitProperty<A>) -> Result<bool, B::Error> {
        let mut byte = [0u8; 1];
        self.read_register(property.register(), &mut byte)?;
        Ok(property.flag().decode(&byte)?)
    }

    /// Return the manufacturer name, e.g. `COTEK`.
    pub fn read_manufacturer(&mut self) -> Result<heapless::String<16>, B::Error> {
        self.read(&property::MANUFACTURER)
    }

    pub fn read_model(&mut self) -> Result<heapless::String<16>, B::Error> {
        self.read(&property::MODEL)
    }

    pub fn read_revision(&mut self) -> Result<heapless::String<4>, B::Error> {
        self.read(&property::REVISION)
    }

    pub fn read_date_of_manufacture(&mut self) -> Result<ManufactureDate, B::Error> {
        self.read(&property::DATE_OF_MANUFACTURE)
    }

    pub fn read_serial_number(&mut self) -> Result<heapless::String<16>, B::Error> {
        self.read(&property::SERIAL_NUMBER)
    }

    pub fn read_country_of_manufacture(&mut self) -> Result<heapless::String<16>, B::Error> {
        self.read(&property::COUNTRY_OF_MANUFACTURE)
    }

    /// Return the rated output voltage in volts.
    pub fn read_rated_output_voltage(&mut self) -> Result<f32, B::Error> {
        self.read(&property::RATED_OUTPUT_VOLTAGE)
    }

    /// Return the rated output current in amps.
    pub fn read_rated_output_current(&mut self) -> Result<f32, B::Error> {
        self.read(&property::RATED_OUTPUT_CURRENT)
    }

    /// Return the maximum output voltage in volts.
    pub fn read_max_output_voltage(&mut self) -> Result<f32, B::Error> {
        self.read(&property::MAX_OUTPUT_VOLTAGE)
    }

    /// Return the maximum output current in amps.
    pub fn read_max_output_current(&mut self) -> Result<f32, B::Error> {
        self.read(&property::MAX_OUTPUT_CURRENT)
    }

    /// Read all factory data, one transaction per field.
    ///
    /// Fails as a whole if any field fails.
    pub fn read_identity(&mut self) -> Result<DeviceIdentity, B::Error> {
        let identity = DeviceIdentity {
            manufacturer: self.read_manufacturer()?,
            model: self.read_model()?,
            revision: self.read_revision()?,
            date_of_manufacture: self.read_date_of_manufacture()?,
            serial_number: self.read_serial_number()?,
            country_of_manufacture: self.read_country_of_manufacture()?,
            rated_output_voltage: self.read_rated_output_voltage()?,
            rated_output_current: self.read_rated_output_current()?,
            max_output_voltage: self.read_max_output_voltage()?,
            max_output_current: self.read_max_output_current()?,
        };
        self.observer.identity_read(&identity);
        Ok(identity)
    }

    /// Return the internal temperature in degrees celsius.
    pub fn read_internal_temperature(&mut self) -> Result<u8, B::Error> {
        self.read(&property::INTERNAL_TEMPERATURE)
    }

    /// Return the measured output voltage in volts.
    pub fn read_output_voltage(&mut self) -> Result<f32, B::Error> {
        self.read(&property::OUTPUT_VOLTAGE)
    }

    /// Return the measured output current in amps.
    pub fn read_output_current(&mut self) -> Result<f32, B::Error> {
        self.read(&property::OUTPUT_CURRENT)
    }

    /// Return the output voltage snapshot register in volts.
    pub fn read_output_voltage_snapshot(&mut self) -> Result<f32, B::Error> {
        self.read(&property::OUTPUT_VOLTAGE_SNAPSHOT)
    }

    /// Read temperature, voltage and current.
    pub fn read_telemetry(&mut self) -> Result<DeviceTelemetry, B::Error> {
        let telemetry = DeviceTelemetry {
            internal_temperature: self.read_internal_temperature()?,
            output_voltage: self.read_output_voltage()?,
            output_current: self.read_output_current()?,
        };
        self.observer.telemetry_read(&telemetry);
        Ok(telemetry)
    }

    /// Read status byte 0, then status byte 1.
    pub fn read_status(&mut self) -> Result<StatusFlags, B::Error> {
        let status0 = self.read(&property::STATUS_0)?;
        let status1 = self.read(&property::STATUS_1)?;
        let status = StatusFlags::from_bytes(status0, status1);
        self.observer.status_snapshot(&status);
        Ok(status)
    }

    /// Read a single status flag.
    pub fn read_status_flag(&mut self, flag: StatusFlag) -> Result<bool, B::Error> {
        self.read_bit(&flag.property())
    }

    /// Return the voltage setpoint in volts.
    pub fn read_voltage_setpoint(&mut self) -> Result<f32, B::Error> {
        self.read(&property::VOLTAGE_SETPOINT)
    }

    /// Return the current setpoint in amps.
    pub fn read_current_setpoint(&mut self) -> Result<f32, B::Error> {
        self.read(&property::CURRENT_SETPOINT)
    }

    pub fn read_setpoint(&mut self) -> Result<DeviceSetpoint, B::Error> {
        Ok(DeviceSetpoint {
            voltage: self.read_voltage_setpoint()?,
            current: self.read_current_setpoint()?,
        })
    }

    /// Write the voltage setpoint then the current setpoint.
    ///
    /// Both values are range checked before anything is written. The two writes are not
    /// atomic: if the second fails the device keeps the new voltage and the old current.
    pub fn write_setpoint(&mut self, voltage: f32, current: f32) -> Result<(), B::Error> {
        let voltage = property::VOLTAGE_SETPOINT.frame(&voltage)?;
        let current = property::CURRENT_SETPOINT.frame(&current)?;
        self.write_register(voltage.as_bytes())?;
        self.write_register(current.as_bytes())?;
        self.observer.remote_transition(RemoteState::RemoteArmed);
        Ok(())
    }

    /// Read one bit of the control register.
    pub fn read_control(&mut self, flag: ControlFlag) -> Result<bool, B::Error> {
        self.read_bit(&flag.property())
    }

    /// Read the whole control register.
    pub fn read_control_state(&mut self) -> Result<ControlState, B::Error> {
        let raw = self.read(&property::CONTROL)?;
        Ok(ControlState::from(ControlByte::from_bytes([raw])))
    }

    /// Set or clear one control bit.
    ///
    /// The register is byte addressed, so the current byte is fetched and written back with
    /// only `bit` changed, both while holding the bus lock. A pending commit flag or the
    /// device's error flag is never written back.
    pub fn set_control(&mut self, bit: ControlBit, value: bool) -> Result<(), B::Error> {
        let property = bit.property();
        let register = property.register().address();
        let address = self.address;
        {
            let mut bus = BusGuard::acquire(&mut self.bus).ok_or(Error::BusBusy)?;
            let mut current = [0u8; 1];
            bus.write_then_read(address, &[register], &mut current)
                .map_err(Error::Bus)?;
            let base = ControlByte::from_bytes(current)
                .with_command_update(false)
                .with_command_error(false)
                .into_bytes()[0];
            let updated = property.flag().apply(base, value);
            bus.write_to(address, &[register, updated])
                .map_err(Error::Bus)?;
        }
        if let Some(state) = transition(bit, value) {
            self.observer.remote_transition(state);
        }
        Ok(())
    }

    /// Hand output control to the control register.
    pub fn enable_remote_control(&mut self) -> Result<(), B::Error> {
        self.set_control(ControlBit::RemoteControl, true)
    }

    /// Hand output control back to the front panel.
    pub fn disable_remote_control(&mut self) -> Result<(), B::Error> {
        self.set_control(ControlBit::RemoteControl, false)
    }

    /// Request the output on or off. Takes effect on the next [`Self::commit`].
    pub fn set_output_enabled(&mut self, enabled: bool) -> Result<(), B::Error> {
        self.set_control(ControlBit::PowerControl, enabled)
    }

    /// Apply pending setpoint and output changes, then check the device accepted them.
    ///
    /// The device is assumed to apply the commit as soon as the write completes; nothing is
    /// polled. Returns [`Error::CommandRejected`] if the device raised its command error bit.
    pub fn commit(&mut self) -> Result<(), B::Error> {
        self.set_control(ControlBit::CommandUpdate, true)?;
        let rejected = self.read_control(ControlFlag::CommandError)?;
        if rejected {
            self.observer.commit_rejected();
        }
        self.observer.remote_transition(RemoteState::RemoteIdle);
        if rejected {
            Err(Error::CommandRejected)
        } else {
            Ok(())
        }
    }

    /// Write a new setpoint and commit it.
    pub fn apply_setpoint(&mut self, setpoint: DeviceSetpoint) -> Result<(), B::Error> {
        self.write_setpoint(setpoint.voltage, setpoint.current)?;
        self.commit()
    }

    /// Turn the output off, then give control back to the front panel.
    ///
    /// Call this last, e.g. on interrupt or exit.
    pub fn shutdown(&mut self) -> Result<(), B::Error> {
        self.set_control(ControlBit::PowerControl, false)?;
        self.set_control(ControlBit::RemoteControl, false)
    }

    /// Select `register` and fill `buffer` from it.
    fn read_register(&mut self, register: CotekRegister, buffer: &mut [u8]) -> Result<(), B::Error> {
        let address = self.address;
        let mut bus = BusGuard::acquire(&mut self.bus).ok_or(Error::BusBusy)?;
        bus.write_then_read(address, &[register.address()], buffer)
            .map_err(Error::Bus)
    }

    /// Write a frame starting with the register address.
    fn write_register(&mut self, frame: &[u8]) -> Result<(), B::Error> {
        let address = self.address;
        let mut bus = BusGuard::acquire(&mut self.bus).ok_or(Error::BusBusy)?;
        bus.write_to(address, frame).map_err(Error::Bus)
    }
}

/// Handshake state a control write moves the device to.
fn transition(bit: ControlBit, value: bool) -> Option<RemoteState> {
    match (bit, value) {
        (ControlBit::RemoteControl, true) => Some(RemoteState::RemoteIdle),
        (ControlBit::RemoteControl, false) => Some(RemoteState::Local),
        (ControlBit::PowerControl, _) => Some(RemoteState::RemoteArmed),
        (ControlBit::CommandUpdate, true) => Some(RemoteState::RemoteCommitted),
        (ControlBit::CommandUpdate, false) => None,
    }
}
