use crate::codec::{
    bytes_encode_size, ensure_within, read_bytes, read_string, string_encode_size, write_bytes,
    write_string, Bounded, MAX_BINARY_LENGTH, MAX_ID_LENGTH, MAX_TEXT_LENGTH,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

/// Maximum number of bound arguments per query.
pub const MAX_ARGS: usize = 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueryType {
    #[default]
    Read = 0,
    Write = 1,
}

impl Write for QueryType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for QueryType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for QueryType {
    const SIZE: usize = u8::SIZE;
}

/// A single SQL value, either bound into a query or returned in a response row.
///
/// Floats compare by bit pattern, so equality agrees with the encoding.
#[derive(Clone, Debug)]
pub enum Value {
    /// Binary: [0]
    Null,
    /// Binary: [1] [value:i64 BE]
    Integer(i64),
    /// Binary: [2] [value:u8]
    Boolean(bool),
    /// Milliseconds since the UNIX epoch.
    /// Binary: [3] [value:u64 BE]
    Timestamp(u64),
    /// Binary: [4] [bits:u64 BE]
    Float(f64),
    /// Binary: [5] [len:u32 BE] [bytes...]
    Binary(Vec<u8>),
    /// Binary: [6] [len:u32 BE] [utf8...]
    Text(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Bounded for Value {
    fn check_bounds(&self) -> Result<(), crate::Error> {
        match self {
            Self::Binary(v) => ensure_within("binary value", v.len(), MAX_BINARY_LENGTH),
            Self::Text(v) => ensure_within("text value", v.len(), MAX_TEXT_LENGTH),
            _ => Ok(()),
        }
    }
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Null => 0u8.write(writer),
            Self::Integer(v) => {
                1u8.write(writer);
                v.write(writer);
            }
            Self::Boolean(v) => {
                2u8.write(writer);
                v.write(writer);
            }
            Self::Timestamp(v) => {
                3u8.write(writer);
                v.write(writer);
            }
            Self::Float(v) => {
                4u8.write(writer);
                v.to_bits().write(writer);
            }
            Self::Binary(v) => {
                5u8.write(writer);
                write_bytes(v, writer);
            }
            Self::Text(v) => {
                6u8.write(writer);
                write_string(v, writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Null,
            1 => Self::Integer(i64::read(reader)?),
            2 => Self::Boolean(bool::read(reader)?),
            3 => Self::Timestamp(u64::read(reader)?),
            4 => Self::Float(f64::from_bits(u64::read(reader)?)),
            5 => Self::Binary(read_bytes(reader, MAX_BINARY_LENGTH)?),
            6 => Self::Text(read_string(reader, MAX_TEXT_LENGTH)?),
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Null => 0,
                Self::Integer(_) => i64::SIZE,
                Self::Boolean(_) => bool::SIZE,
                Self::Timestamp(_) => u64::SIZE,
                Self::Float(_) => u64::SIZE,
                Self::Binary(v) => bytes_encode_size(v),
                Self::Text(v) => string_encode_size(v),
            }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

impl Write for NamedArg {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.name, writer);
        self.value.write(writer);
    }
}

impl Read for NamedArg {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            name: read_string(reader, MAX_ID_LENGTH)?,
            value: Value::read(reader)?,
        })
    }
}

impl Bounded for NamedArg {
    fn check_bounds(&self) -> Result<(), crate::Error> {
        ensure_within("argument name", self.name.len(), MAX_ID_LENGTH)?;
        self.value.check_bounds()
    }
}

impl EncodeSize for NamedArg {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.name) + self.value.encode_size()
    }
}

/// SQL text plus its bound arguments, as handed over by the execution layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub pattern: String,
    pub args: Vec<NamedArg>,
}

impl Query {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.push(NamedArg {
            name: name.into(),
            value,
        });
        self
    }
}

impl Write for Query {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.pattern, writer);
        self.args.write(writer);
    }
}

impl Read for Query {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            pattern: read_string(reader, MAX_TEXT_LENGTH)?,
            args: Vec::read_range(reader, 0..=MAX_ARGS)?,
        })
    }
}

impl Bounded for Query {
    fn check_bounds(&self) -> Result<(), crate::Error> {
        ensure_within("pattern", self.pattern.len(), MAX_TEXT_LENGTH)?;
        ensure_within("args", self.args.len(), MAX_ARGS)?;
        self.args.iter().try_for_each(Bounded::check_bounds)
    }
}

impl EncodeSize for Query {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.pattern) + self.args.encode_size()
    }
}
