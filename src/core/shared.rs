use std::mem;

use serde::{Deserialize, Serialize};

use super::attribute::ComponentDataType;
use super::bit_coder::{ByteReader, ByteWriter, ReaderErr};

pub trait ConfigType {
    fn default()-> Self;
}

/// One scalar value as handed out by a decoder's typed value array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// writes the value at the natural width of `data_type`, little-endian.
    /// A value whose variant differs from `data_type` is converted with an `as` cast.
    pub fn write_as<W>(self, data_type: ComponentDataType, writer: &mut W)
        where W: ByteWriter
    {
        match data_type {
            ComponentDataType::I8 => i8::from_scalar(self).write_to(writer),
            ComponentDataType::U8 => u8::from_scalar(self).write_to(writer),
            ComponentDataType::I16 => i16::from_scalar(self).write_to(writer),
            ComponentDataType::U16 => u16::from_scalar(self).write_to(writer),
            ComponentDataType::I32 => i32::from_scalar(self).write_to(writer),
            ComponentDataType::U32 => u32::from_scalar(self).write_to(writer),
            ComponentDataType::F32 => f32::from_scalar(self).write_to(writer),
            ComponentDataType::F64 => f64::from_scalar(self).write_to(writer),
        }
    }

    /// reads one value of `data_type` from the reader.
    pub fn read_as<R>(data_type: ComponentDataType, reader: &mut R) -> Result<Self, ReaderErr>
        where R: ByteReader
    {
        Ok(match data_type {
            ComponentDataType::I8 => Scalar::I8(i8::read_from(reader)?),
            ComponentDataType::U8 => Scalar::U8(u8::read_from(reader)?),
            ComponentDataType::I16 => Scalar::I16(i16::read_from(reader)?),
            ComponentDataType::U16 => Scalar::U16(u16::read_from(reader)?),
            ComponentDataType::I32 => Scalar::I32(i32::read_from(reader)?),
            ComponentDataType::U32 => Scalar::U32(u32::read_from(reader)?),
            ComponentDataType::F32 => Scalar::F32(f32::read_from(reader)?),
            ComponentDataType::F64 => Scalar::F64(f64::read_from(reader)?),
        })
    }
}

/// A type that can be written to and read from a packed buffer.
pub trait Portable: Sized {
    fn write_to<W>(self, writer: &mut W) where W: ByteWriter;
    fn read_from<R>(reader: &mut R) -> Result<Self, ReaderErr> where R: ByteReader;
}

/// A primitive that a [Scalar] can be converted into.
pub trait DataValue: Copy + Portable {
    fn from_scalar(value: Scalar) -> Self;
}

macro_rules! impl_data_value {
    (int: $($t:ty),*) => {
        $(
            impl DataValue for $t {
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::I8(v) => v as $t,
                        Scalar::U8(v) => v as $t,
                        Scalar::I16(v) => v as $t,
                        Scalar::U16(v) => v as $t,
                        Scalar::I32(v) => v as $t,
                        Scalar::U32(v) => v as $t,
                        Scalar::F32(v) => v as $t,
                        Scalar::F64(v) => v as $t,
                    }
                }
            }

            impl Portable for $t {
                fn write_to<W>(self, writer: &mut W) where W: ByteWriter {
                    for b in self.to_le_bytes().iter() {
                        writer.write_u8(*b);
                    }
                }

                fn read_from<R>(reader: &mut R) -> Result<Self, ReaderErr>
                    where R: ByteReader
                {
                    let mut bytes = [0u8; mem::size_of::<$t>()];
                    for b in bytes.iter_mut() {
                        *b = reader.read_u8()?;
                    }
                    Ok(Self::from_le_bytes(bytes))
                }
            }
        )*
    };

    (float: $(($t:ty, $uint_t:ty)),*) => {
        $(
            impl DataValue for $t {
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::I8(v) => v as $t,
                        Scalar::U8(v) => v as $t,
                        Scalar::I16(v) => v as $t,
                        Scalar::U16(v) => v as $t,
                        Scalar::I32(v) => v as $t,
                        Scalar::U32(v) => v as $t,
                        Scalar::F32(v) => v as $t,
                        Scalar::F64(v) => v as $t,
                    }
                }
            }

            impl Portable for $t {
                fn write_to<W>(self, writer: &mut W) where W: ByteWriter {
                    let bits = self.to_bits();
                    for b in bits.to_le_bytes().iter() {
                        writer.write_u8(*b);
                    }
                }

                fn read_from<R>(reader: &mut R) -> Result<Self, ReaderErr>
                    where R: ByteReader
                {
                    let mut bytes = [0u8; mem::size_of::<$t>()];
                    for b in bytes.iter_mut() {
                        *b = reader.read_u8()?;
                    }
                    Ok(Self::from_bits(<$uint_t>::from_le_bytes(bytes)))
                }
            }
        )*
    };
}

impl_data_value!(int: u8, u16, u32, i8, i16, i32);

impl_data_value!(float:
    (f32, u32),
    (f64, u64)
);
