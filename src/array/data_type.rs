//! Array data types.
//!
//! A [`DataType`] defines the size and interpretation of each element of an array.
//! Elements are held in native byte order.

use derive_more::From;
use half::{bf16, f16};
use serde::de::Error;
use thiserror::Error;

use crate::metadata::Metadata;

use super::{
    fill_value_metadata::{FillValueFloat, FillValueMetadata},
    FillValue,
};

/// A data type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `bool`, stored as one byte which is 0 or 1.
    Bool,
    /// `int8`.
    Int8,
    /// `int16`.
    Int16,
    /// `int32`.
    Int32,
    /// `int64`.
    Int64,
    /// `uint8`.
    UInt8,
    /// `uint16`.
    UInt16,
    /// `uint32`.
    UInt32,
    /// `uint64`.
    UInt64,
    /// `float16`, IEEE 754 half precision.
    Float16,
    /// `float32`, IEEE 754 single precision.
    Float32,
    /// `float64`, IEEE 754 double precision.
    Float64,
    /// `bfloat16`, with the exponent range of `float32` and a 7 bit mantissa.
    BFloat16,
    /// `r<bits>` opaque elements of the given size in bytes. Named by its size in bits, a positive multiple of 8.
    RawBits(usize),
}

/// The data types with a fixed name.
const NAMED_DATA_TYPES: [(DataType, &str); 13] = [
    (DataType::Bool, "bool"),
    (DataType::Int8, "int8"),
    (DataType::Int16, "int16"),
    (DataType::Int32, "int32"),
    (DataType::Int64, "int64"),
    (DataType::UInt8, "uint8"),
    (DataType::UInt16, "uint16"),
    (DataType::UInt32, "uint32"),
    (DataType::UInt64, "uint64"),
    (DataType::Float16, "float16"),
    (DataType::Float32, "float32"),
    (DataType::Float64, "float64"),
    (DataType::BFloat16, "bfloat16"),
];

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

/// A fill value metadata incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueMetadataError(String, FillValueMetadata);

/// A fill value incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueError(String, FillValue);

impl IncompatibleFillValueError {
    /// Create a new incompatible fill value error.
    #[must_use]
    pub const fn new(data_type_name: String, fill_value: FillValue) -> Self {
        Self(data_type_name, fill_value)
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.metadata().serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let metadata = Metadata::deserialize(d)?;
        Self::from_metadata(&metadata).map_err(D::Error::custom)
    }
}

/// Parse the size in bytes of an `r<bits>` data type name.
fn raw_bits_size(name: &str) -> Option<usize> {
    let bits = name.strip_prefix('r')?.parse::<usize>().ok()?;
    (bits > 0 && bits % 8 == 0).then_some(bits / 8)
}

impl DataType {
    /// Returns the identifier, `r*` for all raw bits data types.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        NAMED_DATA_TYPES
            .iter()
            .find(|(data_type, _)| data_type == self)
            .map_or("r*", |(_, name)| name)
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::RawBits(size) => format!("r{}", size * 8),
            _ => self.identifier().to_string(),
        }
    }

    /// Returns the metadata.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        Metadata::new(&self.name())
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::RawBits(size) => *size,
        }
    }

    /// Create a data type from metadata.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the metadata does not name a supported data type or has a configuration.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, UnsupportedDataTypeError> {
        if !metadata.configuration_is_none_or_empty() {
            return Err(UnsupportedDataTypeError(metadata.to_string()));
        }
        let name = metadata.name();
        NAMED_DATA_TYPES
            .iter()
            .find(|(_, identifier)| *identifier == name)
            .map(|(data_type, _)| data_type.clone())
            .or_else(|| raw_bits_size(name).map(Self::RawBits))
            .ok_or_else(|| UnsupportedDataTypeError(name.to_string()))
    }

    /// Create a fill value from metadata.
    ///
    /// Integers must be representable in the data type. Floats accept numbers, the non-finite names and hex strings of matching size.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueMetadataError`] if the fill value is incompatible with the data type.
    pub fn fill_value_from_metadata(
        &self,
        metadata: &FillValueMetadata,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        let fill_value = match self {
            Self::Bool => metadata.try_as_bool().map(FillValue::from),
            Self::Int8 => metadata.try_as_int::<i8>().map(FillValue::from),
            Self::Int16 => metadata.try_as_int::<i16>().map(FillValue::from),
            Self::Int32 => metadata.try_as_int::<i32>().map(FillValue::from),
            Self::Int64 => metadata.try_as_int::<i64>().map(FillValue::from),
            Self::UInt8 => metadata.try_as_int::<u8>().map(FillValue::from),
            Self::UInt16 => metadata.try_as_int::<u16>().map(FillValue::from),
            Self::UInt32 => metadata.try_as_int::<u32>().map(FillValue::from),
            Self::UInt64 => metadata.try_as_int::<u64>().map(FillValue::from),
            Self::Float16 => metadata.try_as_float::<f16>().map(FillValue::from),
            Self::Float32 => metadata.try_as_float::<f32>().map(FillValue::from),
            Self::Float64 => metadata.try_as_float::<f64>().map(FillValue::from),
            Self::BFloat16 => metadata.try_as_float::<bf16>().map(FillValue::from),
            Self::RawBits(size) => match metadata {
                FillValueMetadata::ByteArray(bytes) if bytes.len() == *size => {
                    Some(FillValue::new(bytes.clone()))
                }
                _ => None,
            },
        };
        fill_value.ok_or_else(|| IncompatibleFillValueMetadataError(self.name(), metadata.clone()))
    }

    /// Create fill value metadata.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if the size of `fill_value` does not match the data type.
    pub fn metadata_fill_value(
        &self,
        fill_value: &FillValue,
    ) -> Result<FillValueMetadata, IncompatibleFillValueError> {
        let bytes = fill_value.as_ne_bytes();
        if bytes.len() != self.size() {
            return Err(IncompatibleFillValueError::new(
                self.name(),
                fill_value.clone(),
            ));
        }
        use FillValueMetadata as FVM;
        Ok(match self {
            Self::Bool => FVM::Bool(bytes[0] != 0),
            Self::Int8 => FVM::Int(read::<i8>(bytes).into()),
            Self::Int16 => FVM::Int(read::<i16>(bytes).into()),
            Self::Int32 => FVM::Int(read::<i32>(bytes).into()),
            Self::Int64 => FVM::Int(read(bytes)),
            Self::UInt8 => FVM::UInt(read::<u8>(bytes).into()),
            Self::UInt16 => FVM::UInt(read::<u16>(bytes).into()),
            Self::UInt32 => FVM::UInt(read::<u32>(bytes).into()),
            Self::UInt64 => FVM::UInt(read(bytes)),
            Self::Float16 => FVM::Float(FillValueFloat::from_float(read::<f16>(bytes))),
            Self::Float32 => FVM::Float(FillValueFloat::from_float(read::<f32>(bytes))),
            Self::Float64 => FVM::Float(FillValueFloat::from_float(read::<f64>(bytes))),
            Self::BFloat16 => FVM::Float(FillValueFloat::from_float(read::<bf16>(bytes))),
            Self::RawBits(_) => FVM::ByteArray(bytes.to_vec()),
        })
    }
}

/// Read a native endian element from `bytes`, which must have the size of `T`.
fn read<T: bytemuck::Pod>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(bytes)
}

impl TryFrom<Metadata> for DataType {
    type Error = UnsupportedDataTypeError;

    fn try_from(metadata: Metadata) -> Result<Self, Self::Error> {
        Self::from_metadata(&metadata)
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse `data_type` and `fill_value`, check both write back unchanged, and return the fill value bytes.
    fn fill_value_bytes(data_type: &str, fill_value: &str) -> Vec<u8> {
        let data_type: DataType = serde_json::from_str(data_type).unwrap();
        let metadata: FillValueMetadata = serde_json::from_str(fill_value).unwrap();
        let fill_value = data_type.fill_value_from_metadata(&metadata).unwrap();
        assert_eq!(fill_value.size(), data_type.size());
        assert_eq!(data_type.metadata_fill_value(&fill_value).unwrap(), metadata);
        fill_value.as_ne_bytes().to_vec()
    }

    #[test]
    fn data_type_names() {
        for (data_type, name) in &NAMED_DATA_TYPES {
            let json = format!(r#""{name}""#);
            assert_eq!(&serde_json::from_str::<DataType>(&json).unwrap(), data_type);
            assert_eq!(serde_json::to_string(data_type).unwrap(), json);
            assert_eq!(data_type.to_string(), *name);
        }
        let raw: DataType = serde_json::from_str(r#""r24""#).unwrap();
        assert_eq!(raw, DataType::RawBits(3));
        assert_eq!(raw.identifier(), "r*");
        assert_eq!(raw.name(), "r24");
        assert_eq!(raw.size(), 3);
    }

    #[test]
    fn data_type_unsupported() {
        let metadata: Metadata = serde_json::from_str(r#""unknown""#).unwrap();
        assert_eq!(
            DataType::from_metadata(&metadata).unwrap_err().to_string(),
            "unsupported data type unknown"
        );
        assert!(DataType::try_from(metadata).is_err());
        for json in [r#""complex64""#, r#""r0""#, r#""r7""#, r#""rx""#] {
            assert!(serde_json::from_str::<DataType>(json).is_err(), "{json}");
        }
        let configured: Metadata =
            serde_json::from_str(r#"{"name": "int8", "configuration": {"x": 1}}"#).unwrap();
        assert!(DataType::from_metadata(&configured).is_err());
    }

    #[test]
    fn data_type_fill_values() {
        let cases: [(&str, &str, Vec<u8>); 14] = [
            (r#""bool""#, "true", vec![1]),
            (r#""bool""#, "false", vec![0]),
            (r#""int8""#, "-7", (-7i8).to_ne_bytes().to_vec()),
            (r#""int64""#, "-7", (-7i64).to_ne_bytes().to_vec()),
            (r#""uint16""#, "7", 7u16.to_ne_bytes().to_vec()),
            (r#""uint64""#, "18446744073709551615", u64::MAX.to_ne_bytes().to_vec()),
            (r#""float32""#, "-7.5", (-7.5f32).to_ne_bytes().to_vec()),
            (r#""float32""#, r#""-Infinity""#, f32::NEG_INFINITY.to_ne_bytes().to_vec()),
            (r#""float32""#, r#""0x7fc00001""#, 0x7fc0_0001u32.to_ne_bytes().to_vec()),
            (r#""float64""#, r#""NaN""#, f64::NAN.to_ne_bytes().to_vec()),
            (r#""float16""#, "-7.5", f16::from_f32(-7.5).to_ne_bytes().to_vec()),
            (r#""float16""#, r#""NaN""#, f16::NAN.to_ne_bytes().to_vec()),
            (r#""bfloat16""#, r#""Infinity""#, bf16::INFINITY.to_ne_bytes().to_vec()),
            (r#""r24""#, "[0,1,2]", vec![0, 1, 2]),
        ];
        for (data_type, fill_value, expected) in cases {
            assert_eq!(
                fill_value_bytes(data_type, fill_value),
                expected,
                "{data_type} {fill_value}"
            );
        }
    }

    #[test]
    fn data_type_incompatible_fill_values() {
        let cases = [
            (DataType::Bool, FillValueMetadata::UInt(1)),
            (DataType::Int8, FillValueMetadata::Int(-129)),
            (DataType::UInt16, FillValueMetadata::Int(-1)),
            (DataType::UInt16, FillValueMetadata::UInt(65536)),
            (DataType::Float32, FillValueMetadata::Bool(false)),
            (DataType::RawBits(3), FillValueMetadata::ByteArray(vec![0, 1])),
        ];
        for (data_type, metadata) in cases {
            assert!(
                data_type.fill_value_from_metadata(&metadata).is_err(),
                "{data_type} {metadata}"
            );
        }
        assert!(DataType::Float32
            .metadata_fill_value(&FillValue::from(0u16))
            .is_err());
    }
}
