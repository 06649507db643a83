//! The JSON form of a fill value in array metadata.
//!
//! A fill value is stored as a JSON boolean, number, string or byte array, depending on the data type.
//! Floats may also be `"NaN"`, `"Infinity"`, `"-Infinity"` or a `"0x…"` hex string of their big endian bits.
//!
//! [`DataType::fill_value_from_metadata`](crate::array::DataType::fill_value_from_metadata) interprets [`FillValueMetadata`] for a data type,
//! and [`DataType::metadata_fill_value`](crate::array::DataType::metadata_fill_value) creates it.

use derive_more::{Display, From};
use half::{bf16, f16};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fill value as it appears in array metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[serde(untagged)]
pub enum FillValueMetadata {
    /// `true` or `false`.
    Bool(bool),
    /// A non-negative integer.
    UInt(u64),
    /// A negative integer.
    Int(i64),
    /// A float, or a string standing for one.
    Float(FillValueFloat),
    /// The bytes of a raw bits element.
    #[display("{_0:?}")]
    ByteArray(Vec<u8>),
}

/// A float fill value.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display, From)]
#[serde(untagged)]
pub enum FillValueFloat {
    /// A finite number.
    Float(f64),
    /// The big endian bits of the float.
    HexString(HexString),
    /// An infinity or the canonical NaN.
    NonFinite(FillValueNonFinite),
}

/// A named non-finite float.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum FillValueNonFinite {
    /// `"Infinity"`.
    Infinity,
    /// `"-Infinity"`.
    #[serde(rename = "-Infinity")]
    #[display("-Infinity")]
    NegInfinity,
    /// `"NaN"`.
    NaN,
}

/// Bytes written as a `0x` prefixed string of lower case hex digit pairs.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(try_from = "String", into = "String")]
pub struct HexString(Vec<u8>);

/// A string that is not `0x` followed by pairs of hex digits.
#[derive(Debug, Error)]
#[error("{0} is not a hex string")]
pub struct HexStringError(String);

impl HexString {
    /// Returns the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for HexString {
    type Error = HexStringError;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        let digits = match string.strip_prefix("0x") {
            Some(digits)
                if digits.len() % 2 == 0 && digits.bytes().all(|c| c.is_ascii_hexdigit()) =>
            {
                digits
            }
            _ => return Err(HexStringError(string)),
        };
        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<Result<_, _>>()
            .map_err(|_| HexStringError(string.clone()))?;
        Ok(Self(bytes))
    }
}

impl From<HexString> for String {
    fn from(hex: HexString) -> Self {
        hex.to_string()
    }
}

impl core::fmt::Display for HexString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("0x")?;
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

/// A float element type whose fill value can be read from [`FillValueFloat`] metadata.
pub trait FillValueFloatType: bytemuck::Pod {
    /// Positive infinity.
    const INFINITY: Self;
    /// Negative infinity.
    const NEG_INFINITY: Self;
    /// The canonical NaN.
    const NAN: Self;

    /// Convert from a [`f64`], rounding to the nearest representable value.
    fn from_f64(value: f64) -> Self;

    /// Convert to a [`f64`] exactly.
    fn to_f64(self) -> f64;
}

impl FillValueFloatType for f16 {
    const INFINITY: Self = f16::INFINITY;
    const NEG_INFINITY: Self = f16::NEG_INFINITY;
    const NAN: Self = f16::NAN;

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl FillValueFloatType for bf16 {
    const INFINITY: Self = bf16::INFINITY;
    const NEG_INFINITY: Self = bf16::NEG_INFINITY;
    const NAN: Self = bf16::NAN;

    fn from_f64(value: f64) -> Self {
        bf16::from_f64(value)
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl FillValueFloatType for f32 {
    const INFINITY: Self = f32::INFINITY;
    const NEG_INFINITY: Self = f32::NEG_INFINITY;
    const NAN: Self = f32::NAN;

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl FillValueFloatType for f64 {
    const INFINITY: Self = f64::INFINITY;
    const NEG_INFINITY: Self = f64::NEG_INFINITY;
    const NAN: Self = f64::NAN;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}

fn to_be_bytes<T: bytemuck::Pod>(value: T) -> Vec<u8> {
    let mut bytes = bytemuck::bytes_of(&value).to_vec();
    if cfg!(target_endian = "little") {
        bytes.reverse();
    }
    bytes
}

fn from_be_bytes<T: bytemuck::Pod>(bytes: &[u8]) -> Option<T> {
    if bytes.len() != core::mem::size_of::<T>() {
        return None;
    }
    let mut bytes = bytes.to_vec();
    if cfg!(target_endian = "little") {
        bytes.reverse();
    }
    Some(bytemuck::pod_read_unaligned(&bytes))
}

impl FillValueFloat {
    /// Create the metadata of a float fill value.
    ///
    /// Infinities and the canonical NaN become their names. Any other NaN keeps its payload as a hex string.
    #[must_use]
    pub fn from_float<T: FillValueFloatType>(value: T) -> Self {
        let number = value.to_f64();
        if number.is_nan() {
            if bytemuck::bytes_of(&value) == bytemuck::bytes_of(&T::NAN) {
                FillValueNonFinite::NaN.into()
            } else {
                HexString(to_be_bytes(value)).into()
            }
        } else if number == f64::INFINITY {
            FillValueNonFinite::Infinity.into()
        } else if number == f64::NEG_INFINITY {
            FillValueNonFinite::NegInfinity.into()
        } else {
            number.into()
        }
    }

    fn to_float<T: FillValueFloatType>(&self) -> Option<T> {
        match self {
            Self::Float(number) => Some(T::from_f64(*number)),
            Self::HexString(hex) => from_be_bytes(hex.as_bytes()),
            Self::NonFinite(FillValueNonFinite::Infinity) => Some(T::INFINITY),
            Self::NonFinite(FillValueNonFinite::NegInfinity) => Some(T::NEG_INFINITY),
            Self::NonFinite(FillValueNonFinite::NaN) => Some(T::NAN),
        }
    }
}

impl FillValueMetadata {
    /// Returns the boolean, or [`None`] for any other kind of fill value.
    #[must_use]
    pub fn try_as_bool(&self) -> Option<bool> {
        if let Self::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Returns the integer as a `T`, or [`None`] if it is not an integer or does not fit in `T`.
    #[must_use]
    pub fn try_as_int<T: TryFrom<i64> + TryFrom<u64>>(&self) -> Option<T> {
        match *self {
            Self::UInt(value) => T::try_from(value).ok(),
            Self::Int(value) => T::try_from(value).ok(),
            _ => None,
        }
    }

    /// Returns the value as a float `T`. Integers are converted.
    ///
    /// Returns [`None`] for booleans, byte arrays and hex strings of the wrong length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn try_as_float<T: FillValueFloatType>(&self) -> Option<T> {
        match self {
            Self::Float(float) => float.to_float(),
            Self::UInt(value) => Some(T::from_f64(*value as f64)),
            Self::Int(value) => Some(T::from_f64(*value as f64)),
            Self::Bool(_) | Self::ByteArray(_) => None,
        }
    }
}
