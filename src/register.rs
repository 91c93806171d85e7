//! This module is used to define the registers on the Cotek PSUs.
//!
//! The device exposes a flat 128 byte register file. Multi-byte values are little endian.

use modular_bitfield::prelude::*;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

/// Widest field in the register map, in bytes.
pub const MAX_FIELD_WIDTH: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum CotekRegister {
    /// __R__ - Manufacturer name, 16 ASCII bytes.
    ///
    /// Padded with commas or NULs; only the text before the first comma is meaningful.
    Manufacturer = 0x00,
    /// __R__ - Model name, 16 ASCII bytes. Same padding as [`Self::Manufacturer`].
    Model = 0x10,
    /// __R__ - Output voltage snapshot. u16 in centivolts.
    OutputVoltageSnapshot = 0x20,
    /// __R__ - Firmware revision, 4 ASCII bytes.
    Revision = 0x24,
    /// __R__ - Date of manufacture, 8 ASCII digits as `MMDDYYYY`.
    DateOfManufacture = 0x28,
    /// __R__ - Serial number, 16 ASCII bytes.
    SerialNumber = 0x30,
    /// __R__ - Country of manufacture, 16 ASCII bytes padded with spaces.
    CountryOfManufacture = 0x40,
    /// __R__ - Rated output voltage. u16 in centivolts.
    RatedOutputVoltage = 0x50,
    /// __R__ - Rated output current. u16 in centiamps.
    RatedOutputCurrent = 0x52,
    /// __R__ - Maximum output voltage. u16 in centivolts.
    MaxOutputVoltage = 0x54,
    /// __R__ - Maximum output current. u16 in centiamps.
    MaxOutputCurrent = 0x56,
    /// __R__ - Measured output voltage. u16 in centivolts.
    OutputVoltage = 0x60,
    /// __R__ - Measured output current. u16 in centiamps.
    OutputCurrent = 0x62,
    /// __R__ - Internal temperature, whole degrees celsius.
    InternalTemperature = 0x68,
    /// __R__ - Status byte 0. See [`StatusByte0`].
    Status0 = 0x6C,
    /// __R__ - Status byte 1. See [`StatusByte1`].
    Status1 = 0x6F,
    /// __R/W__ - Output voltage setpoint. u16 in centivolts.
    VoltageSetpoint = 0x70,
    /// __R/W__ - Output current setpoint. u16 in centiamps.
    CurrentSetpoint = 0x72,
    /// __R/W__ - Control byte. See [`ControlByte`].
    Control = 0x7C,
}

impl CotekRegister {
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Width of the field stored at this register, in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Manufacturer | Self::Model | Self::SerialNumber | Self::CountryOfManufacture => 16,
            Self::DateOfManufacture => 8,
            Self::Revision => 4,
            Self::OutputVoltageSnapshot
            | Self::RatedOutputVoltage
            | Self::RatedOutputCurrent
            | Self::MaxOutputVoltage
            | Self::MaxOutputCurrent
            | Self::OutputVoltage
            | Self::OutputCurrent
            | Self::VoltageSetpoint
            | Self::CurrentSetpoint => 2,
            Self::InternalTemperature | Self::Status0 | Self::Status1 | Self::Control => 1,
        }
    }
}

impl From<CotekRegister> for u8 {
    fn from(value: CotekRegister) -> Self {
        value as u8
    }
}

/// Layout of [`CotekRegister::Status0`]. A set bit means the condition is active.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusByte0 {
    pub ovp_shutdown: bool,
    pub olp_shutdown: bool,
    pub otp_shutdown: bool,
    pub fan_failure: bool,
    pub aux_smps_failure: bool,
    pub high_temperature_alarm: bool,
    pub ac_input_power_down: bool,
    pub ac_input_failure: bool,
}

/// Layout of [`CotekRegister::Status1`].
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusByte1 {
    /// Only reported in local mode.
    pub inhibit_by_signal: bool,
    /// Only reported in remote mode.
    pub inhibit_by_control_register: bool,
    #[skip]
    __: B6,
}

/// Layout of [`CotekRegister::Control`].
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    pub power_control: bool,
    #[skip]
    __: B1,
    pub command_update: bool,
    /// Read only. Set by the device when the last commit was rejected.
    pub command_error: bool,
    #[skip]
    __: B3,
    pub remote_control: bool,
}

/// Every fault/status flag reported across the two status bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount, IntoStaticStr)]
pub enum StatusFlag {
    /// OVP: over-voltage shutdown.
    OverVoltageShutdown,
    /// OLP: overload shutdown.
    OverloadShutdown,
    /// OTP: over-temperature shutdown.
    OverTemperatureShutdown,
    FanFailure,
    /// Auxiliary SMPS failure.
    AuxSupplyFailure,
    HighTemperatureAlarm,
    AcInputPowerDown,
    AcInputFailure,
    /// Inhibited by the VCI, ACI or INHI signal.
    InhibitBySignal,
    /// Inhibited through the power control bit of the control register.
    InhibitByControlRegister,
}

impl StatusFlag {
    pub const fn register(self) -> CotekRegister {
        match self {
            Self::InhibitBySignal | Self::InhibitByControlRegister => CotekRegister::Status1,
            _ => CotekRegister::Status0,
        }
    }

    /// Bit index within [`Self::register`].
    pub const fn bit(self) -> u8 {
        match self {
            Self::OverVoltageShutdown => 0,
            Self::OverloadShutdown => 1,
            Self::OverTemperatureShutdown => 2,
            Self::FanFailure => 3,
            Self::AuxSupplyFailure => 4,
            Self::HighTemperatureAlarm => 5,
            Self::AcInputPowerDown => 6,
            Self::AcInputFailure => 7,
            Self::InhibitBySignal => 0,
            Self::InhibitByControlRegister => 1,
        }
    }

    /// What the device means when this flag is set.
    pub const fn description(self) -> &'static str {
        match self {
            Self::OverVoltageShutdown => "over-voltage shutdown",
            Self::OverloadShutdown => "overload shutdown",
            Self::OverTemperatureShutdown => "internal temperature over 85C, power shut down",
            Self::FanFailure => "fan failure, power shut down",
            Self::AuxSupplyFailure => "auxiliary supply failure, power shut down",
            Self::HighTemperatureAlarm => "internal temperature over 75C",
            Self::AcInputPowerDown => "AC input below 100Vac, output powered down",
            Self::AcInputFailure => "AC input below 85Vac, power off",
            Self::InhibitBySignal => "inhibited by VCI, ACI or INHI signal",
            Self::InhibitByControlRegister => "inhibited by the control register",
        }
    }
}

/// Control bits the host may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum ControlBit {
    /// Output on/off. Only honoured while [`Self::RemoteControl`] is set.
    PowerControl,
    /// One-shot commit of pending setpoint and power control changes.
    CommandUpdate,
    /// When set the device obeys the control register instead of its front panel.
    RemoteControl,
}

/// Control bits the host may read. Superset of [`ControlBit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum ControlFlag {
    PowerControl,
    CommandUpdate,
    CommandError,
    RemoteControl,
}

impl ControlFlag {
    pub const fn bit(self) -> u8 {
        match self {
            Self::PowerControl => 0,
            Self::CommandUpdate => 2,
            Self::CommandError => 3,
            Self::RemoteControl => 7,
        }
    }
}

impl ControlBit {
    pub const fn bit(self) -> u8 {
        ControlFlag::from_bit(self).bit()
    }
}

impl ControlFlag {
    const fn from_bit(bit: ControlBit) -> Self {
        match bit {
            ControlBit::PowerControl => Self::PowerControl,
            ControlBit::CommandUpdate => Self::CommandUpdate,
            ControlBit::RemoteControl => Self::RemoteControl,
        }
    }
}

impl From<ControlBit> for ControlFlag {
    fn from(value: ControlBit) -> Self {
        Self::from_bit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn registers_do_not_overlap() {
        // Registers are declared in address order, so each field must end before the next begins.
        let registers: heapless::Vec<CotekRegister, 32> = CotekRegister::iter().collect();
        for pair in registers.windows(2) {
            let end = pair[0].address() as usize + pair[0].width();
            assert!(
                end <= pair[1].address() as usize,
                "{:?} overlaps {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn register_map_fits_in_128_bytes() {
        for register in CotekRegister::iter() {
            assert!(register.address() as usize + register.width() <= 0x80);
            assert!(register.width() <= MAX_FIELD_WIDTH);
        }
    }

    #[test]
    fn status_byte_0_bit_order() {
        let status = StatusByte0::from_bytes([0b0000_0001]);
        assert!(status.ovp_shutdown());
        assert!(!status.ac_input_failure());

        let status = StatusByte0::from_bytes([0b1000_0000]);
        assert!(status.ac_input_failure());
        assert!(!status.ovp_shutdown());
    }

    #[test]
    fn control_byte_bit_positions() {
        let control = ControlByte::from_bytes([0b1000_1101]);
        assert!(control.power_control());
        assert!(control.command_update());
        assert!(control.command_error());
        assert!(control.remote_control());

        let control = ControlByte::new().with_remote_control(true);
        assert_eq!(control.into_bytes(), [0x80]);
        let control = ControlByte::new().with_command_update(true);
        assert_eq!(control.into_bytes(), [0x04]);
    }

    #[test]
    fn control_bits_match_control_flags() {
        for bit in ControlBit::iter() {
            assert_eq!(bit.bit(), ControlFlag::from(bit).bit());
        }
        assert_eq!(ControlFlag::CommandError.bit(), 3);
    }

    #[test]
    fn status_flags_are_unique() {
        // No two flags may share a bit of the same register.
        let flags: heapless::Vec<StatusFlag, { StatusFlag::COUNT }> = StatusFlag::iter().collect();
        for (i, a) in flags.iter().enumerate() {
            for b in &flags[i + 1..] {
                assert!(a.register() != b.register() || a.bit() != b.bit());
            }
        }
        assert_eq!(StatusFlag::COUNT, 10);
    }
}
