//! This module contains the values read from and written to the PSU.

use core::fmt;

use strum::IntoEnumIterator;

use crate::{
    error::RangeError,
    register::{ControlByte, StatusByte0, StatusByte1, StatusFlag},
};

/// Index of a unit on the bus. Units answer at `0x50 + index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceIndex(u8);

impl DeviceIndex {
    pub const BASE_ADDRESS: u8 = 0x50;
    pub const MAX: u8 = 15;

    /// 7-bit bus address of this unit.
    pub const fn address(self) -> u8 {
        Self::BASE_ADDRESS + self.0
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DeviceIndex {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(RangeError::DeviceIndex(value))
        }
    }
}

/// Calendar date the unit was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManufactureDate {
    year: u16,
    month: u8,
    day: u8,
}

impl ManufactureDate {
    /// Returns `None` unless the three parts form a real calendar date.
    pub const fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        if year == 0 || month == 0 || month > 12 || day == 0 {
            return None;
        }
        if day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    pub const fn year(&self) -> u16 {
        self.year
    }

    pub const fn month(&self) -> u8 {
        self.month
    }

    pub const fn day(&self) -> u8 {
        self.day
    }
}

const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for ManufactureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

/// Factory data of a unit. The hardware never changes these at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub manufacturer: heapless::String<16>,
    pub model: heapless::String<16>,
    pub revision: heapless::String<4>,
    pub date_of_manufacture: ManufactureDate,
    pub serial_number: heapless::String<16>,
    pub country_of_manufacture: heapless::String<16>,
    /// Volts.
    pub rated_output_voltage: f32,
    /// Amps.
    pub rated_output_current: f32,
    /// Volts.
    pub max_output_voltage: f32,
    /// Amps.
    pub max_output_current: f32,
}

impl DeviceIdentity {
    /// Check a setpoint against this unit's maximum output ratings.
    pub fn check_setpoint(&self, setpoint: &DeviceSetpoint) -> Result<(), RangeError> {
        if setpoint.voltage > self.max_output_voltage {
            return Err(RangeError::OutOfRange {
                value: setpoint.voltage,
                max: self.max_output_voltage,
            });
        }
        if setpoint.current > self.max_output_current {
            return Err(RangeError::OutOfRange {
                value: setpoint.current,
                max: self.max_output_current,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} rev {} serial {} made in {} on {}, rated {:.2}V/{:.2}A, max {:.2}V/{:.2}A",
            self.manufacturer,
            self.model,
            self.revision,
            self.serial_number,
            self.country_of_manufacture,
            self.date_of_manufacture,
            self.rated_output_voltage,
            self.rated_output_current,
            self.max_output_voltage,
            self.max_output_current,
        )
    }
}

/// Live measurements. Only valid at the moment they were read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceTelemetry {
    /// Degrees celsius.
    pub internal_temperature: u8,
    /// Volts.
    pub output_voltage: f32,
    /// Amps.
    pub output_current: f32,
}

impl fmt::Display for DeviceTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}C, {:.2}V, {:.2}A",
            self.internal_temperature, self.output_voltage, self.output_current
        )
    }
}

/// Target output voltage and current limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceSetpoint {
    /// Volts.
    pub voltage: f32,
    /// Amps.
    pub current: f32,
}

impl DeviceSetpoint {
    pub const fn new(voltage: f32, current: f32) -> Self {
        Self { voltage, current }
    }
}

/// Both status bytes as they stood when they were read.
///
/// The two bytes come from separate transactions, so a fault may have changed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    status0: StatusByte0,
    status1: StatusByte1,
}

impl StatusFlags {
    pub fn from_bytes(status0: u8, status1: u8) -> Self {
        Self {
            status0: StatusByte0::from_bytes([status0]),
            status1: StatusByte1::from_bytes([status1]),
        }
    }

    /// Raw `[status0, status1]`.
    pub fn into_bytes(self) -> [u8; 2] {
        [self.status0.into_bytes()[0], self.status1.into_bytes()[0]]
    }

    pub fn is_set(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::OverVoltageShutdown => self.status0.ovp_shutdown(),
            StatusFlag::OverloadShutdown => self.status0.olp_shutdown(),
            StatusFlag::OverTemperatureShutdown => self.status0.otp_shutdown(),
            StatusFlag::FanFailure => self.status0.fan_failure(),
            StatusFlag::AuxSupplyFailure => self.status0.aux_smps_failure(),
            StatusFlag::HighTemperatureAlarm => self.status0.high_temperature_alarm(),
            StatusFlag::AcInputPowerDown => self.status0.ac_input_power_down(),
            StatusFlag::AcInputFailure => self.status0.ac_input_failure(),
            StatusFlag::InhibitBySignal => self.status1.inhibit_by_signal(),
            StatusFlag::InhibitByControlRegister => self.status1.inhibit_by_control_register(),
        }
    }

    pub fn ovp_shutdown(&self) -> bool {
        self.status0.ovp_shutdown()
    }

    pub fn olp_shutdown(&self) -> bool {
        self.status0.olp_shutdown()
    }

    pub fn otp_shutdown(&self) -> bool {
        self.status0.otp_shutdown()
    }

    pub fn fan_failure(&self) -> bool {
        self.status0.fan_failure()
    }

    pub fn aux_supply_failure(&self) -> bool {
        self.status0.aux_smps_failure()
    }

    pub fn high_temperature_alarm(&self) -> bool {
        self.status0.high_temperature_alarm()
    }

    pub fn ac_input_power_down(&self) -> bool {
        self.status0.ac_input_power_down()
    }

    pub fn ac_input_failure(&self) -> bool {
        self.status0.ac_input_failure()
    }

    pub fn inhibit_by_signal(&self) -> bool {
        self.status1.inhibit_by_signal()
    }

    pub fn inhibit_by_control_register(&self) -> bool {
        self.status1.inhibit_by_control_register()
    }

    /// Flags currently set, in register order.
    pub fn active(&self) -> impl Iterator<Item = StatusFlag> + '_ {
        StatusFlag::iter().filter(|flag| self.is_set(*flag))
    }

    pub fn any(&self) -> bool {
        self.active().next().is_some()
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.any() {
            return f.write_str("normal");
        }
        for (i, flag) in self.active().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(flag.description())?;
        }
        Ok(())
    }
}

/// Decoded control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    pub power_control: bool,
    pub command_update: bool,
    pub command_error: bool,
    pub remote_control: bool,
}

impl From<ControlByte> for ControlState {
    fn from(value: ControlByte) -> Self {
        Self {
            power_control: value.power_control(),
            command_update: value.command_update(),
            command_error: value.command_error(),
            remote_control: value.remote_control(),
        }
    }
}

/// Steps of the remote control handshake.
///
/// The driver does not track or enforce these; it reports the state each handshake
/// operation moves the device to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::IntoStaticStr)]
pub enum RemoteState {
    /// Front panel and hardware inputs govern the output.
    Local,
    /// Control register governs; nothing pending.
    RemoteIdle,
    /// New setpoints or output state written, waiting for a commit.
    RemoteArmed,
    /// Commit written.
    RemoteCommitted,
}
