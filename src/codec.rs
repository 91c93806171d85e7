//! Pure conversions between register bytes and typed values.
//!
//! Nothing in here touches the bus, so every codec can be tested on plain byte arrays.

use crate::{
    error::{DecodeError, RangeError},
    types::ManufactureDate,
};

/// A stateless mapping between a fixed-width byte span and a typed value.
pub trait FieldCodec {
    type Value;

    /// Number of bytes this codec reads and writes.
    fn width(&self) -> usize;

    /// Decode `raw`, which must be exactly [`Self::width`] bytes long.
    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError>;
}

/// Codecs that can also produce bytes to write.
pub trait FieldEncode: FieldCodec {
    /// Encode `value` into `out`, which is exactly [`FieldCodec::width`] bytes long.
    ///
    /// Nothing is written to `out` when the value is rejected.
    ///
    /// # Panics
    /// If `out` is not [`FieldCodec::width`] bytes long. Frames are sized from the register
    /// map, so this is a programming error rather than a device fault.
    fn encode(&self, value: &Self::Value, out: &mut [u8]) -> Result<(), RangeError>;
}

fn check_width(expected: usize, raw: &[u8]) -> Result<(), DecodeError> {
    if raw.len() == expected {
        Ok(())
    } else {
        Err(DecodeError::WidthMismatch {
            expected,
            actual: raw.len(),
        })
    }
}

/// How a [`FixedString`] field is cut down to its meaningful part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// Keep everything before the first comma or NUL.
    AtSeparator,
    /// Drop trailing whitespace and NUL padding.
    TrailingWhitespace,
    /// Keep every byte.
    Verbatim,
}

impl Trim {
    fn apply(self, raw: &[u8]) -> &[u8] {
        match self {
            Trim::AtSeparator => {
                let end = raw
                    .iter()
                    .position(|&b| b == b',' || b == 0)
                    .unwrap_or(raw.len());
                &raw[..end]
            }
            Trim::TrailingWhitespace => {
                let end = raw
                    .iter()
                    .rposition(|&b| !(b.is_ascii_whitespace() || b == 0))
                    .map_or(0, |last| last + 1);
                &raw[..end]
            }
            Trim::Verbatim => raw,
        }
    }
}

/// ASCII text of `N` bytes.
///
/// Decoding never fails on content: bytes outside ASCII are replaced with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedString<const N: usize> {
    trim: Trim,
}

impl<const N: usize> FixedString<N> {
    pub const fn new(trim: Trim) -> Self {
        Self { trim }
    }
}

impl<const N: usize> FieldCodec for FixedString<N> {
    type Value = heapless::String<N>;

    fn width(&self) -> usize {
        N
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        check_width(N, raw)?;
        let mut text = heapless::String::new();
        for &byte in self.trim.apply(raw) {
            let ch = if byte.is_ascii() { byte as char } else { '?' };
            // One byte per char and at most N of them, so this cannot overflow.
            text.push(ch).map_err(|_| DecodeError::WidthMismatch {
                expected: N,
                actual: raw.len(),
            })?;
        }
        Ok(text)
    }
}

/// Eight ASCII digits laid out as `MMDDYYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateField;

impl DateField {
    pub const WIDTH: usize = 8;

    fn digits(raw: &[u8]) -> Result<u16, DecodeError> {
        raw.iter().try_fold(0u16, |acc, &b| {
            if b.is_ascii_digit() {
                Ok(acc * 10 + (b - b'0') as u16)
            } else {
                Err(DecodeError::MalformedDate)
            }
        })
    }
}

impl FieldCodec for DateField {
    type Value = ManufactureDate;

    fn width(&self) -> usize {
        Self::WIDTH
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        check_width(Self::WIDTH, raw)?;
        let month = Self::digits(&raw[0..2])?;
        let day = Self::digits(&raw[2..4])?;
        let year = Self::digits(&raw[4..8])?;
        ManufactureDate::new(year, month as u8, day as u8).ok_or(DecodeError::MalformedDate)
    }
}

/// Single unsigned byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UInt8;

impl FieldCodec for UInt8 {
    type Value = u8;

    fn width(&self) -> usize {
        1
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        check_width(1, raw)?;
        Ok(raw[0])
    }
}

impl FieldEncode for UInt8 {
    fn encode(&self, value: &Self::Value, out: &mut [u8]) -> Result<(), RangeError> {
        debug_assert_eq!(out.len(), 1);
        out[0] = *value;
        Ok(())
    }
}

/// Little endian u16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UInt16Le;

impl FieldCodec for UInt16Le {
    type Value = u16;

    fn width(&self) -> usize {
        2
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        check_width(2, raw)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }
}

impl FieldEncode for UInt16Le {
    fn encode(&self, value: &Self::Value, out: &mut [u8]) -> Result<(), RangeError> {
        debug_assert_eq!(out.len(), 2);
        out.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

/// Little endian u16 holding `value * scale`.
///
/// With a scale of 100 a raw `2420` reads as `24.20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledUInt16 {
    scale: u16,
}

/// Two decimal places, the scaling of every voltage and current register.
pub const CENTI: ScaledUInt16 = ScaledUInt16::new(100);

impl ScaledUInt16 {
    /// `scale` must not be zero.
    pub const fn new(scale: u16) -> Self {
        Self { scale }
    }

    pub const fn scale(&self) -> u16 {
        self.scale
    }

    /// Largest value this field can hold, e.g. `655.35` for a scale of 100.
    pub fn max_value(&self) -> f32 {
        u16::MAX as f32 / self.scale as f32
    }

    /// Convert a raw register value to device units.
    #[inline]
    pub fn raw_to_value(&self, raw: u16) -> f32 {
        raw as f32 / self.scale as f32
    }

    /// Convert device units to a raw register value, rounding to the nearest step.
    pub fn value_to_raw(&self, value: f32) -> Result<u16, RangeError> {
        if value.is_nan() {
            return Err(RangeError::NotANumber);
        }
        let max = self.max_value();
        if value < 0.0 || value > max {
            return Err(RangeError::OutOfRange { value, max });
        }
        // Non-negative here, so truncating after adding a half rounds to nearest.
        let rounded = (value * self.scale as f32 + 0.5) as u32;
        u16::try_from(rounded).map_err(|_| RangeError::OutOfRange { value, max })
    }
}

impl FieldCodec for ScaledUInt16 {
    type Value = f32;

    fn width(&self) -> usize {
        2
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        let raw = UInt16Le.decode(raw)?;
        Ok(self.raw_to_value(raw))
    }
}

impl FieldEncode for ScaledUInt16 {
    fn encode(&self, value: &Self::Value, out: &mut [u8]) -> Result<(), RangeError> {
        let raw = self.value_to_raw(*value)?;
        UInt16Le.encode(&raw, out)
    }
}

/// A single bit of a byte register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitFlag {
    bit: u8,
}

impl BitFlag {
    /// # Panics
    /// If `bit` is not below 8.
    pub const fn new(bit: u8) -> Self {
        assert!(bit < 8, "bit index out of range for a byte register");
        Self { bit }
    }

    pub const fn bit(&self) -> u8 {
        self.bit
    }

    pub const fn mask(&self) -> u8 {
        1 << self.bit
    }

    /// Return `byte` with this bit set to `value`, every other bit untouched.
    pub const fn apply(&self, byte: u8, value: bool) -> u8 {
        if value {
            byte | self.mask()
        } else {
            byte & !self.mask()
        }
    }
}

impl FieldCodec for BitFlag {
    type Value = bool;

    fn width(&self) -> usize {
        1
    }

    fn decode(&self, raw: &[u8]) -> Result<Self::Value, DecodeError> {
        check_width(1, raw)?;
        Ok(raw[0] & self.mask() != 0)
    }
}
