//! Typed descriptors for every field of the register map.
//!
//! A [`Property`] ties a register to the codec that interprets it and to an access mode.
//! Only `Property<_, ReadWrite>` can be written, so writing a read-only field does not compile:
//!
//! ```compile_fail
//! use cotek_psu::{bus::BusTransport, property, psu::CotekPsu};
//!
//! fn overwrite_rating<B: BusTransport>(psu: &mut CotekPsu<B>) {
//!     let _ = psu.write(&property::RATED_OUTPUT_VOLTAGE, 48.0);
//! }
//! ```

use core::marker::PhantomData;

use crate::{
    codec::{BitFlag, CENTI, DateField, FieldCodec, FieldEncode, FixedString, Trim, UInt8},
    error::RangeError,
    register::{CotekRegister, ControlBit, ControlFlag, MAX_FIELD_WIDTH, StatusFlag},
};

/// Access mode marker: the host may only read this field.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly;

/// Access mode marker: the host may read and write this field.
#[derive(Debug, Clone, Copy)]
pub struct ReadWrite;

/// A register, the codec for its contents and whether the host may write it.
#[derive(Debug, Clone, Copy)]
pub struct Property<C, A = ReadOnly> {
    register: CotekRegister,
    codec: C,
    _access: PhantomData<A>,
}

impl<C: FieldCodec, A> Property<C, A> {
    pub const fn new(register: CotekRegister, codec: C) -> Self {
        Self {
            register,
            codec,
            _access: PhantomData,
        }
    }

    pub const fn register(&self) -> CotekRegister {
        self.register
    }

    pub const fn codec(&self) -> &C {
        &self.codec
    }
}

impl<C: FieldEncode> Property<C, ReadWrite> {
    /// Build the bytes of the bus write that stores `value`: register address, then data.
    pub fn frame(&self, value: &C::Value) -> Result<WriteFrame, RangeError> {
        let width = self.codec.width();
        let mut frame = WriteFrame {
            bytes: [0; MAX_FIELD_WIDTH + 1],
            len: width + 1,
        };
        frame.bytes[0] = self.register.address();
        self.codec.encode(value, &mut frame.bytes[1..=width])?;
        Ok(frame)
    }
}

/// Encoded register write, ready for the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFrame {
    bytes: [u8; MAX_FIELD_WIDTH + 1],
    len: usize,
}

impl WriteFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// A single bit of a byte register.
#[derive(Debug, Clone, Copy)]
pub struct BitProperty<A = ReadOnly> {
    register: CotekRegister,
    flag: BitFlag,
    _access: PhantomData<A>,
}

impl<A> BitProperty<A> {
    pub const fn new(register: CotekRegister, bit: u8) -> Self {
        Self {
            register,
            flag: BitFlag::new(bit),
            _access: PhantomData,
        }
    }

    pub const fn register(&self) -> CotekRegister {
        self.register
    }

    pub const fn flag(&self) -> &BitFlag {
        &self.flag
    }
}

pub type AsciiField<const N: usize> = Property<FixedString<N>>;
pub type ScaledField<A = ReadOnly> = Property<crate::codec::ScaledUInt16, A>;

pub const MANUFACTURER: AsciiField<16> =
    Property::new(CotekRegister::Manufacturer, FixedString::new(Trim::AtSeparator));
pub const MODEL: AsciiField<16> =
    Property::new(CotekRegister::Model, FixedString::new(Trim::AtSeparator));
pub const OUTPUT_VOLTAGE_SNAPSHOT: ScaledField =
    Property::new(CotekRegister::OutputVoltageSnapshot, CENTI);
pub const REVISION: AsciiField<4> =
    Property::new(CotekRegister::Revision, FixedString::new(Trim::Verbatim));
pub const DATE_OF_MANUFACTURE: Property<DateField> =
    Property::new(CotekRegister::DateOfManufacture, DateField);
pub const SERIAL_NUMBER: AsciiField<16> =
    Property::new(CotekRegister::SerialNumber, FixedString::new(Trim::Verbatim));
pub const COUNTRY_OF_MANUFACTURE: AsciiField<16> = Property::new(
    CotekRegister::CountryOfManufacture,
    FixedString::new(Trim::TrailingWhitespace),
);
pub const RATED_OUTPUT_VOLTAGE: ScaledField = Property::new(CotekRegister::RatedOutputVoltage, CENTI);
pub const RATED_OUTPUT_CURRENT: ScaledField = Property::new(CotekRegister::RatedOutputCurrent, CENTI);
pub const MAX_OUTPUT_VOLTAGE: ScaledField = Property::new(CotekRegister::MaxOutputVoltage, CENTI);
pub const MAX_OUTPUT_CURRENT: ScaledField = Property::new(CotekRegister::MaxOutputCurrent, CENTI);
pub const OUTPUT_VOLTAGE: ScaledField = Property::new(CotekRegister::OutputVoltage, CENTI);
pub const OUTPUT_CURRENT: ScaledField = Property::new(CotekRegister::OutputCurrent, CENTI);
pub const INTERNAL_TEMPERATURE: Property<UInt8> =
    Property::new(CotekRegister::InternalTemperature, UInt8);
pub const STATUS_0: Property<UInt8> = Property::new(CotekRegister::Status0, UInt8);
pub const STATUS_1: Property<UInt8> = Property::new(CotekRegister::Status1, UInt8);
pub const VOLTAGE_SETPOINT: ScaledField<ReadWrite> =
    Property::new(CotekRegister::VoltageSetpoint, CENTI);
pub const CURRENT_SETPOINT: ScaledField<ReadWrite> =
    Property::new(CotekRegister::CurrentSetpoint, CENTI);
/// Whole control byte. Individual bits are written through [`ControlBit::property`].
pub const CONTROL: Property<UInt8> = Property::new(CotekRegister::Control, UInt8);

impl StatusFlag {
    pub const fn property(self) -> BitProperty<ReadOnly> {
        BitProperty::new(self.register(), self.bit())
    }
}

impl ControlFlag {
    pub const fn property(self) -> BitProperty<ReadOnly> {
        BitProperty::new(CotekRegister::Control, self.bit())
    }
}

impl ControlBit {
    pub const fn property(self) -> BitProperty<ReadWrite> {
        BitProperty::new(CotekRegister::Control, self.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn assert_width<C: FieldCodec, A>(property: &Property<C, A>) {
        assert_eq!(
            property.codec().width(),
            property.register().width(),
            "{:?}",
            property.register()
        );
    }

    #[test]
    fn codec_widths_match_register_map() {
        assert_width(&MANUFACTURER);
        assert_width(&MODEL);
        assert_width(&OUTPUT_VOLTAGE_SNAPSHOT);
        assert_width(&REVISION);
        assert_width(&DATE_OF_MANUFACTURE);
        assert_width(&SERIAL_NUMBER);
        assert_width(&COUNTRY_OF_MANUFACTURE);
        assert_width(&RATED_OUTPUT_VOLTAGE);
        assert_width(&RATED_OUTPUT_CURRENT);
        assert_width(&MAX_OUTPUT_VOLTAGE);
        assert_width(&MAX_OUTPUT_CURRENT);
        assert_width(&OUTPUT_VOLTAGE);
        assert_width(&OUTPUT_CURRENT);
        assert_width(&INTERNAL_TEMPERATURE);
        assert_width(&STATUS_0);
        assert_width(&STATUS_1);
        assert_width(&VOLTAGE_SETPOINT);
        assert_width(&CURRENT_SETPOINT);
        assert_width(&CONTROL);
    }

    #[test]
    fn setpoint_frame_layout() {
        // 24.20V => 2420 => 0x0974, little endian after the register address.
        let frame = VOLTAGE_SETPOINT.frame(&24.2).unwrap();
        assert_eq!(frame.as_bytes(), &[0x70, 0x74, 0x09]);

        let frame = CURRENT_SETPOINT.frame(&1.0).unwrap();
        assert_eq!(frame.as_bytes(), &[0x72, 0x64, 0x00]);
    }

    #[test]
    fn out_of_range_setpoint_has_no_frame() {
        assert!(VOLTAGE_SETPOINT.frame(&700.0).is_err());
        assert!(CURRENT_SETPOINT.frame(&-1.0).is_err());
    }

    #[test]
    fn bit_properties_point_at_the_right_registers() {
        for flag in StatusFlag::iter() {
            let property = flag.property();
            assert_eq!(property.register(), flag.register());
            assert_eq!(property.flag().bit(), flag.bit());
        }
        for bit in ControlBit::iter() {
            assert_eq!(bit.property().register(), CotekRegister::Control);
        }
        assert_eq!(ControlBit::RemoteControl.property().flag().mask(), 0x80);
        assert_eq!(ControlFlag::CommandError.property().flag().mask(), 0x08);
    }
}
