//! This crate provides a register-level driver for Cotek programmable DC power supplies with an
//! I2C (PMBus-style) control port, e.g. the AE-800 and AEK-800 series.
//!
//! It supports `no-std` environments by use of the `no-std` feature flag.
//!
//! Up to 16 units share one bus. Each answers at `0x50` plus its device index, set with the
//! address pins on the unit:
//!
//! ```no_run
//! use cotek_psu::{bus::BusTransport, psu::CotekPsu, types::DeviceIndex};
//!
//! fn report<B: BusTransport>(bus: B) -> cotek_psu::error::Result<(), B::Error> {
//!     let mut psu = CotekPsu::new(bus, DeviceIndex::try_from(0)?);
//!     let identity = psu.read_identity()?;
//!     let status = psu.read_status()?;
//!     let _ = (identity, status);
//!     Ok(())
//! }
//! ```
//!
//! Output control follows the device's handshake: enable remote control, write setpoints
//! and the power control bit, then commit. See [`psu::CotekPsu`].
//!
//! The bus is anything implementing [`bus::BusTransport`]. [`bus::HalBus`] adapts any
//! `embedded-hal` I2C master.

#![cfg_attr(feature = "no-std", no_std)]

pub mod bus;
pub mod codec;
pub mod error;
pub mod observer;
pub mod property;
pub mod psu;
pub mod register;
pub mod types;

#[cfg(test)]
mod mock_bus;
