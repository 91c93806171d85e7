use std::env;

use cotek_psu::{
    bus::BusTransport,
    error::Error,
    observer::LogObserver,
    psu::CotekPsu,
    register::CotekRegister,
    types::{DeviceIndex, DeviceSetpoint},
};
use inquire::{CustomType, InquireError, Select};
use tracing_subscriber::EnvFilter;

// Adjust for your setup; overridden by the first command line argument.
const DEVICE_INDEX: u8 = 0;

const CONTROL_POWER: u8 = 0x01;
const CONTROL_UPDATE: u8 = 0x04;
const CONTROL_ERROR: u8 = 0x08;

/// A stand-in for a real I2C master with one AE-800-24 attached.
///
/// Swap it for `cotek_psu::bus::HalBus` wrapping your platform's I2C peripheral.
struct SimulatedPsu {
    address: u8,
    registers: [u8; 128],
    pointer: u8,
    locked: bool,
}

#[derive(Debug)]
struct Nack;

impl SimulatedPsu {
    fn new(index: DeviceIndex) -> Self {
        let mut psu = Self {
            address: index.address(),
            registers: [0; 128],
            pointer: 0,
            locked: false,
        };
        psu.preload(CotekRegister::Manufacturer, b"COTEK,TAIWAN\0\0\0\0");
        psu.preload(CotekRegister::Model, b"AE-800-24,\0\0\0\0\0\0");
        psu.preload(CotekRegister::Revision, b"1.02");
        psu.preload(CotekRegister::DateOfManufacture, b"01152023");
        psu.preload(CotekRegister::SerialNumber, b"CTK20230115A0042");
        psu.preload(CotekRegister::CountryOfManufacture, b"TAIWAN          ");
        psu.preload(CotekRegister::RatedOutputVoltage, &2400u16.to_le_bytes());
        psu.preload(CotekRegister::RatedOutputCurrent, &3330u16.to_le_bytes());
        psu.preload(CotekRegister::MaxOutputVoltage, &2880u16.to_le_bytes());
        psu.preload(CotekRegister::MaxOutputCurrent, &3330u16.to_le_bytes());
        psu.preload(CotekRegister::InternalTemperature, &[31]);
        psu
    }

    fn preload(&mut self, register: CotekRegister, bytes: &[u8]) {
        let start = register.address() as usize;
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn word(&self, register: CotekRegister) -> u16 {
        let start = register.address() as usize;
        u16::from_le_bytes([self.registers[start], self.registers[start + 1]])
    }

    /// Apply setpoints and power control the way the unit does on a commit.
    fn commit(&mut self, control: u8) -> u8 {
        let voltage = self.word(CotekRegister::VoltageSetpoint);
        let current = self.word(CotekRegister::CurrentSetpoint);
        let control = control & !CONTROL_UPDATE;
        if voltage > self.word(CotekRegister::MaxOutputVoltage)
            || current > self.word(CotekRegister::MaxOutputCurrent)
        {
            return control | CONTROL_ERROR;
        }
        let (voltage, current) = if control & CONTROL_POWER != 0 {
            // A light resistive load.
            (voltage, current.min(voltage / 24))
        } else {
            (0, 0)
        };
        self.preload(CotekRegister::OutputVoltage, &voltage.to_le_bytes());
        self.preload(CotekRegister::OutputCurrent, &current.to_le_bytes());
        self.preload(CotekRegister::OutputVoltageSnapshot, &voltage.to_le_bytes());
        control & !CONTROL_ERROR
    }

    fn store(&mut self, value: u8) {
        let index = self.pointer as usize % self.registers.len();
        self.registers[index] = if index == CotekRegister::Control.address() as usize {
            let value = (value & !CONTROL_ERROR) | (self.registers[index] & CONTROL_ERROR);
            if value & CONTROL_UPDATE != 0 {
                self.commit(value)
            } else {
                value
            }
        } else {
            value
        };
        self.pointer = self.pointer.wrapping_add(1);
    }

    fn check(&self, address: u8) -> Result<(), Nack> {
        if self.locked && address == self.address {
            Ok(())
        } else {
            Err(Nack)
        }
    }
}

impl BusTransport for SimulatedPsu {
    type Error = Nack;

    fn try_lock(&mut self) -> bool {
        !std::mem::replace(&mut self.locked, true)
    }

    fn unlock(&mut self) {
        self.locked = false;
    }

    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check(address)?;
        if let Some((&register, data)) = bytes.split_first() {
            self.pointer = register;
            for &value in data {
                self.store(value);
            }
        }
        Ok(())
    }

    fn read_from_into(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.check(address)?;
        for byte in buffer.iter_mut() {
            *byte = self.registers[self.pointer as usize % self.registers.len()];
            self.pointer = self.pointer.wrapping_add(1);
        }
        Ok(())
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_to(address, out)?;
        self.read_from_into(address, buffer)
    }
}

const STATUS: &str = "Read status";
const TELEMETRY: &str = "Read telemetry";
const SETPOINT: &str = "Set output voltage and current";
const OUTPUT_ON: &str = "Turn output on";
const OUTPUT_OFF: &str = "Turn output off";
const QUIT: &str = "Quit";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cotek=debug")),
        )
        .init();

    let index = env::args()
        .nth(1)
        .map(|arg| arg.parse::<u8>().expect("Device index must be a number"))
        .unwrap_or(DEVICE_INDEX);
    let index = DeviceIndex::try_from(index).expect("Invalid device index");
    println!("Using device index {} (address 0x{:02X})", index.index(), index.address());

    let bus = SimulatedPsu::new(index);
    let mut psu = CotekPsu::new(bus, index).with_observer(LogObserver);

    let identity = psu.read_identity().expect("Failed to read identity");
    println!("{identity}");

    psu.enable_remote_control()
        .expect("Failed to enable remote control");

    loop {
        let choice = Select::new(
            "What next?",
            vec![STATUS, TELEMETRY, SETPOINT, OUTPUT_ON, OUTPUT_OFF, QUIT],
        )
        .prompt();

        let result = match choice {
            Ok(STATUS) => psu.read_status().map(|status| println!("{status}")),
            Ok(TELEMETRY) => psu.read_telemetry().map(|telemetry| println!("{telemetry}")),
            Ok(SETPOINT) => match prompt_setpoint() {
                Ok(setpoint) => match identity.check_setpoint(&setpoint) {
                    Ok(()) => psu.apply_setpoint(setpoint),
                    Err(e) => Err(Error::Range(e)),
                },
                Err(InquireError::OperationCanceled) => continue,
                Err(_) => break,
            },
            Ok(OUTPUT_ON) => psu
                .set_output_enabled(true)
                .and_then(|()| psu.commit()),
            Ok(OUTPUT_OFF) => psu
                .set_output_enabled(false)
                .and_then(|()| psu.commit()),
            // Quit, Esc and Ctrl-C all end the session.
            _ => break,
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_command_rejected() => println!("The PSU refused that change"),
            Err(e) => println!("Error: {e}"),
        }
    }

    // Always hand the unit back in a safe state.
    psu.shutdown().expect("Failed to shut down");
    println!("Output off, front panel control restored");
}

fn prompt_setpoint() -> Result<DeviceSetpoint, InquireError> {
    let voltage = CustomType::<f32>::new("Output voltage (V):")
        .with_error_message("Please type a number")
        .prompt()?;
    let current = CustomType::<f32>::new("Current limit (A):")
        .with_error_message("Please type a number")
        .prompt()?;
    Ok(DeviceSetpoint::new(voltage, current))
}
