//! AMQP 1.0 Binary Encoding and Decoding
//!
//! This module implements the bit-exact AMQP 1.0 binary format: every
//! value round-trips through `decode(encode(v)) == v`, and the encoder
//! always chooses the shortest legal constructor for a given value.
//!
//! # Overview
//!
//! - **Encoder**: converts an `AmqpValue` to its wire bytes.
//! - **Decoder**: converts wire bytes back into an `AmqpValue`, strictly
//!   rejecting unknown format codes and malformed declared sizes.
//!
//! # Examples
//!
//! ```rust
//! use amqp10_core::codec::{Encoder, Decoder};
//! use amqp10_core::types::AmqpValue;
//!
//! let value = AmqpValue::String("Hello, AMQP!".to_string());
//! let mut encoder = Encoder::new();
//! encoder.encode_value(&value).unwrap();
//! let encoded = encoder.finish();
//!
//! let mut decoder = Decoder::new(encoded);
//! let decoded = decoder.decode_value().unwrap();
//! assert_eq!(value, decoded);
//! ```

use crate::error::{AmqpError, AmqpResult};
use crate::types::{AmqpSymbol, AmqpValue};
use bytes::{Buf, BufMut, BytesMut};

/// AMQP 1.0 format codes relevant to this codec. Not every code in the
/// standard is represented — only the ones `AmqpValue`'s variants need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeCode {
    Described = 0x00,

    Null = 0x40,
    BooleanTrue = 0x41,
    BooleanFalse = 0x42,
    Boolean = 0x56,

    Uint0 = 0x43,
    Ulong0 = 0x44,

    Ubyte = 0x50,
    Byte = 0x51,
    Smalluint = 0x52,
    Smallulong = 0x53,
    Smallint = 0x54,
    Smalllong = 0x55,

    Ushort = 0x60,
    Short = 0x61,

    Uint = 0x70,
    Int = 0x71,
    Float = 0x72,
    Char = 0x73,
    Decimal32 = 0x74,

    Ulong = 0x80,
    Long = 0x81,
    Double = 0x82,
    Timestamp = 0x83,
    Decimal64 = 0x84,

    Decimal128 = 0x94,
    Uuid = 0x98,

    Binary8 = 0xa0,
    String8 = 0xa1,
    Symbol8 = 0xa3,

    Binary32 = 0xb0,
    String32 = 0xb1,
    Symbol32 = 0xb3,

    List0 = 0x45,
    List8 = 0xc0,
    Map8 = 0xc1,

    List32 = 0xd0,
    Map32 = 0xd1,

    Array8 = 0xe0,
    Array32 = 0xf0,
}

/// AMQP 1.0 value encoder.
///
/// Accumulates encoded bytes into an internal buffer; call `finish()`
/// once to drain it.
pub struct Encoder {
    buffer: BytesMut,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            buffer: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Encoder {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Encode a value using its shortest legal wire representation.
    pub fn encode_value(&mut self, value: &AmqpValue) -> AmqpResult<()> {
        match value {
            AmqpValue::Null => self.encode_null(),
            AmqpValue::Bool(b) => self.encode_bool(*b),
            AmqpValue::UByte(n) => self.encode_ubyte(*n),
            AmqpValue::UShort(n) => self.encode_ushort(*n),
            AmqpValue::UInt(n) => self.encode_uint(*n),
            AmqpValue::ULong(n) => self.encode_ulong(*n),
            AmqpValue::Byte(n) => self.encode_byte(*n),
            AmqpValue::Short(n) => self.encode_short(*n),
            AmqpValue::Int(n) => self.encode_int(*n),
            AmqpValue::Long(n) => self.encode_long(*n),
            AmqpValue::Float(f) => self.encode_float(*f),
            AmqpValue::Double(f) => self.encode_double(*f),
            AmqpValue::Char(c) => self.encode_char(*c),
            AmqpValue::Timestamp(t) => self.encode_timestamp(*t),
            AmqpValue::Uuid(u) => self.encode_uuid(*u),
            AmqpValue::Binary(data) => self.encode_binary(data),
            AmqpValue::String(s) => self.encode_string(s),
            AmqpValue::Symbol(s) => self.encode_symbol(s),
            AmqpValue::List(list) => self.encode_list(list),
            AmqpValue::Map(map) => self.encode_map(map),
            AmqpValue::Array(array) => self.encode_array(array),
            AmqpValue::Described(descriptor, inner) => self.encode_described(descriptor, inner),
        }
    }

    pub fn encode_null(&mut self) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Null as u8);
        Ok(())
    }

    pub fn encode_bool(&mut self, value: bool) -> AmqpResult<()> {
        self.buffer.put_u8(if value {
            TypeCode::BooleanTrue as u8
        } else {
            TypeCode::BooleanFalse as u8
        });
        Ok(())
    }

    pub fn encode_ubyte(&mut self, value: u8) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Ubyte as u8);
        self.buffer.put_u8(value);
        Ok(())
    }

    pub fn encode_ushort(&mut self, value: u16) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Ushort as u8);
        self.buffer.put_u16(value);
        Ok(())
    }

    /// `0x43` for zero, `0x52` smalluint for 1..=255, else `0x70` wide.
    pub fn encode_uint(&mut self, value: u32) -> AmqpResult<()> {
        if value == 0 {
            self.buffer.put_u8(TypeCode::Uint0 as u8);
        } else if let Ok(small) = u8::try_from(value) {
            self.buffer.put_u8(TypeCode::Smalluint as u8);
            self.buffer.put_u8(small);
        } else {
            self.buffer.put_u8(TypeCode::Uint as u8);
            self.buffer.put_u32(value);
        }
        Ok(())
    }

    /// `0x44` for zero, `0x53` smallulong for 1..=255, else `0x80` wide.
    pub fn encode_ulong(&mut self, value: u64) -> AmqpResult<()> {
        if value == 0 {
            self.buffer.put_u8(TypeCode::Ulong0 as u8);
        } else if let Ok(small) = u8::try_from(value) {
            self.buffer.put_u8(TypeCode::Smallulong as u8);
            self.buffer.put_u8(small);
        } else {
            self.buffer.put_u8(TypeCode::Ulong as u8);
            self.buffer.put_u64(value);
        }
        Ok(())
    }

    pub fn encode_byte(&mut self, value: i8) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Byte as u8);
        self.buffer.put_i8(value);
        Ok(())
    }

    pub fn encode_short(&mut self, value: i16) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Short as u8);
        self.buffer.put_i16(value);
        Ok(())
    }

    /// `0x54` smallint when the value fits in a signed byte, else `0x71` wide.
    pub fn encode_int(&mut self, value: i32) -> AmqpResult<()> {
        if let Ok(small) = i8::try_from(value) {
            self.buffer.put_u8(TypeCode::Smallint as u8);
            self.buffer.put_i8(small);
        } else {
            self.buffer.put_u8(TypeCode::Int as u8);
            self.buffer.put_i32(value);
        }
        Ok(())
    }

    /// `0x55` smalllong when the value fits in a signed byte, else `0x81` wide.
    pub fn encode_long(&mut self, value: i64) -> AmqpResult<()> {
        if let Ok(small) = i8::try_from(value) {
            self.buffer.put_u8(TypeCode::Smalllong as u8);
            self.buffer.put_i8(small);
        } else {
            self.buffer.put_u8(TypeCode::Long as u8);
            self.buffer.put_i64(value);
        }
        Ok(())
    }

    pub fn encode_float(&mut self, value: f32) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Float as u8);
        self.buffer.put_f32(value);
        Ok(())
    }

    pub fn encode_double(&mut self, value: f64) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Double as u8);
        self.buffer.put_f64(value);
        Ok(())
    }

    pub fn encode_char(&mut self, value: char) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Char as u8);
        self.buffer.put_u32(value as u32);
        Ok(())
    }

    pub fn encode_timestamp(&mut self, value: i64) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Timestamp as u8);
        self.buffer.put_i64(value);
        Ok(())
    }

    pub fn encode_uuid(&mut self, value: uuid::Uuid) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Uuid as u8);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn encode_binary(&mut self, data: &[u8]) -> AmqpResult<()> {
        if data.len() <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::Binary8 as u8);
            self.buffer.put_u8(data.len() as u8);
        } else {
            self.buffer.put_u8(TypeCode::Binary32 as u8);
            self.buffer.put_u32(data.len() as u32);
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn encode_string(&mut self, value: &str) -> AmqpResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::String8 as u8);
            self.buffer.put_u8(bytes.len() as u8);
        } else {
            self.buffer.put_u8(TypeCode::String32 as u8);
            self.buffer.put_u32(bytes.len() as u32);
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn encode_symbol(&mut self, symbol: &AmqpSymbol) -> AmqpResult<()> {
        let bytes = symbol.as_bytes();
        if bytes.len() <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::Symbol8 as u8);
            self.buffer.put_u8(bytes.len() as u8);
        } else {
            self.buffer.put_u8(TypeCode::Symbol32 as u8);
            self.buffer.put_u32(bytes.len() as u32);
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn encode_list(&mut self, list: &[AmqpValue]) -> AmqpResult<()> {
        if list.is_empty() {
            self.buffer.put_u8(TypeCode::List0 as u8);
            return Ok(());
        }

        let mut body = Encoder::new();
        for item in list {
            body.encode_value(item)?;
        }
        let body = body.finish();

        // size is the byte count of count + elements.
        if list.len() <= u8::MAX as usize && body.len() + 1 <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::List8 as u8);
            self.buffer.put_u8((body.len() + 1) as u8);
            self.buffer.put_u8(list.len() as u8);
        } else {
            self.buffer.put_u8(TypeCode::List32 as u8);
            self.buffer.put_u32((body.len() + 4) as u32);
            self.buffer.put_u32(list.len() as u32);
        }
        self.buffer.extend_from_slice(&body);
        Ok(())
    }

    fn encode_map(&mut self, map: &[(AmqpValue, AmqpValue)]) -> AmqpResult<()> {
        let mut body = Encoder::new();
        for (key, value) in map {
            body.encode_value(key)?;
            body.encode_value(value)?;
        }
        let body = body.finish();
        let count = map.len() * 2;

        if count <= u8::MAX as usize && body.len() + 1 <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::Map8 as u8);
            self.buffer.put_u8((body.len() + 1) as u8);
            self.buffer.put_u8(count as u8);
        } else {
            self.buffer.put_u8(TypeCode::Map32 as u8);
            self.buffer.put_u32((body.len() + 4) as u32);
            self.buffer.put_u32(count as u32);
        }
        self.buffer.extend_from_slice(&body);
        Ok(())
    }

    /// Encode an array, writing one element constructor followed by
    /// back-to-back element payloads with no per-element constructor
    /// byte. Every element must share the same wire sub-form, not just
    /// the same logical tag: a plain per-element `encode_value` would
    /// let the shortest-form optimization pick a different code for,
    /// say, `UInt(0)` (`Uint0`) than `UInt(5)` (`Smalluint`), corrupting
    /// the shared constructor. `array_code` picks the one form wide
    /// enough for every element up front; `encode_array_payload` then
    /// writes each element's payload in exactly that form.
    fn encode_array(&mut self, array: &[AmqpValue]) -> AmqpResult<()> {
        let mut body = BytesMut::new();
        if let Some(first) = array.first() {
            for item in array {
                if item.tag() != first.tag() {
                    return Err(AmqpError::type_mismatch(format!(
                        "array holds {} elements, got {}",
                        first.tag(),
                        item.tag()
                    )));
                }
            }
            let code = array_code(array)?;
            body.put_u8(code as u8);
            for item in array {
                encode_array_element(&mut body, code, item)?;
            }
        }
        let body = body.freeze();

        if array.len() <= u8::MAX as usize && body.len() + 1 <= u8::MAX as usize {
            self.buffer.put_u8(TypeCode::Array8 as u8);
            self.buffer.put_u8((body.len() + 1) as u8);
            self.buffer.put_u8(array.len() as u8);
        } else {
            self.buffer.put_u8(TypeCode::Array32 as u8);
            self.buffer.put_u32((body.len() + 4) as u32);
            self.buffer.put_u32(array.len() as u32);
        }
        self.buffer.extend_from_slice(&body);
        Ok(())
    }

    fn encode_described(&mut self, descriptor: &AmqpValue, value: &AmqpValue) -> AmqpResult<()> {
        self.buffer.put_u8(TypeCode::Described as u8);
        self.encode_value(descriptor)?;
        self.encode_value(value)?;
        Ok(())
    }

    /// Drain the encoder, returning everything encoded so far.
    pub fn finish(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

/// Pick the one wire sub-form wide enough to carry every element of a
/// same-tagged array. Fixed-width tags have exactly one code; variable-
/// width and shortcut-eligible tags need a scan to find the widest form
/// actually required.
fn array_code(items: &[AmqpValue]) -> AmqpResult<TypeCode> {
    let tag = items[0].tag();
    Ok(match tag {
        "null" => TypeCode::Null,
        // BooleanTrue/BooleanFalse have no payload and can't vary per
        // element; arrays always use the explicit-payload Boolean form.
        "bool" => TypeCode::Boolean,
        "ubyte" => TypeCode::Ubyte,
        "ushort" => TypeCode::Ushort,
        "uint" => {
            if items.iter().all(|v| matches!(v, AmqpValue::UInt(0))) {
                TypeCode::Uint0
            } else if items
                .iter()
                .all(|v| matches!(v, AmqpValue::UInt(n) if u8::try_from(*n).is_ok()))
            {
                TypeCode::Smalluint
            } else {
                TypeCode::Uint
            }
        }
        "ulong" => {
            if items.iter().all(|v| matches!(v, AmqpValue::ULong(0))) {
                TypeCode::Ulong0
            } else if items
                .iter()
                .all(|v| matches!(v, AmqpValue::ULong(n) if u8::try_from(*n).is_ok()))
            {
                TypeCode::Smallulong
            } else {
                TypeCode::Ulong
            }
        }
        "byte" => TypeCode::Byte,
        "short" => TypeCode::Short,
        "int" => {
            if items
                .iter()
                .all(|v| matches!(v, AmqpValue::Int(n) if i8::try_from(*n).is_ok()))
            {
                TypeCode::Smallint
            } else {
                TypeCode::Int
            }
        }
        "long" => {
            if items
                .iter()
                .all(|v| matches!(v, AmqpValue::Long(n) if i8::try_from(*n).is_ok()))
            {
                TypeCode::Smalllong
            } else {
                TypeCode::Long
            }
        }
        "float" => TypeCode::Float,
        "double" => TypeCode::Double,
        "char" => TypeCode::Char,
        "timestamp" => TypeCode::Timestamp,
        "uuid" => TypeCode::Uuid,
        "binary" => {
            if items
                .iter()
                .all(|v| v.as_binary().is_some_and(|b| b.len() <= u8::MAX as usize))
            {
                TypeCode::Binary8
            } else {
                TypeCode::Binary32
            }
        }
        "string" => {
            if items
                .iter()
                .all(|v| v.as_string().is_some_and(|s| s.len() <= u8::MAX as usize))
            {
                TypeCode::String8
            } else {
                TypeCode::String32
            }
        }
        "symbol" => {
            if items
                .iter()
                .all(|v| v.as_symbol().is_some_and(|s| s.as_bytes().len() <= u8::MAX as usize))
            {
                TypeCode::Symbol8
            } else {
                TypeCode::Symbol32
            }
        }
        // Compound sub-elements always use the wide form: the 8-bit
        // form's count/size fields would need a second pre-encoding
        // pass to verify every element fits, which isn't worth it for
        // the compound-in-array case this crate actually constructs.
        "list" => TypeCode::List32,
        "map" => TypeCode::Map32,
        other => {
            return Err(AmqpError::type_mismatch(format!(
                "{other} cannot appear in an array (no array-capable wire form)"
            )))
        }
    })
}

/// Write one element's payload (no format-code byte) in exactly `code`'s
/// form, for `encode_array`'s shared-constructor body.
fn encode_array_element(body: &mut BytesMut, code: TypeCode, item: &AmqpValue) -> AmqpResult<()> {
    match (code, item) {
        (TypeCode::Null, AmqpValue::Null) => {}
        (TypeCode::Boolean, AmqpValue::Bool(b)) => body.put_u8(if *b { 1 } else { 0 }),
        (TypeCode::Ubyte, AmqpValue::UByte(n)) => body.put_u8(*n),
        (TypeCode::Ushort, AmqpValue::UShort(n)) => body.put_u16(*n),
        (TypeCode::Uint0, AmqpValue::UInt(_)) => {}
        (TypeCode::Smalluint, AmqpValue::UInt(n)) => body.put_u8(*n as u8),
        (TypeCode::Uint, AmqpValue::UInt(n)) => body.put_u32(*n),
        (TypeCode::Ulong0, AmqpValue::ULong(_)) => {}
        (TypeCode::Smallulong, AmqpValue::ULong(n)) => body.put_u8(*n as u8),
        (TypeCode::Ulong, AmqpValue::ULong(n)) => body.put_u64(*n),
        (TypeCode::Byte, AmqpValue::Byte(n)) => body.put_i8(*n),
        (TypeCode::Short, AmqpValue::Short(n)) => body.put_i16(*n),
        (TypeCode::Smallint, AmqpValue::Int(n)) => body.put_i8(*n as i8),
        (TypeCode::Int, AmqpValue::Int(n)) => body.put_i32(*n),
        (TypeCode::Smalllong, AmqpValue::Long(n)) => body.put_i8(*n as i8),
        (TypeCode::Long, AmqpValue::Long(n)) => body.put_i64(*n),
        (TypeCode::Float, AmqpValue::Float(f)) => body.put_f32(*f),
        (TypeCode::Double, AmqpValue::Double(f)) => body.put_f64(*f),
        (TypeCode::Char, AmqpValue::Char(c)) => body.put_u32(*c as u32),
        (TypeCode::Timestamp, AmqpValue::Timestamp(t)) => body.put_i64(*t),
        (TypeCode::Uuid, AmqpValue::Uuid(u)) => body.extend_from_slice(u.as_bytes()),
        (TypeCode::Binary8, AmqpValue::Binary(b)) => {
            body.put_u8(b.len() as u8);
            body.extend_from_slice(b);
        }
        (TypeCode::Binary32, AmqpValue::Binary(b)) => {
            body.put_u32(b.len() as u32);
            body.extend_from_slice(b);
        }
        (TypeCode::String8, AmqpValue::String(s)) => {
            body.put_u8(s.len() as u8);
            body.extend_from_slice(s.as_bytes());
        }
        (TypeCode::String32, AmqpValue::String(s)) => {
            body.put_u32(s.len() as u32);
            body.extend_from_slice(s.as_bytes());
        }
        (TypeCode::Symbol8, AmqpValue::Symbol(s)) => {
            body.put_u8(s.as_bytes().len() as u8);
            body.extend_from_slice(s.as_bytes());
        }
        (TypeCode::Symbol32, AmqpValue::Symbol(s)) => {
            body.put_u32(s.as_bytes().len() as u32);
            body.extend_from_slice(s.as_bytes());
        }
        (TypeCode::List32, AmqpValue::List(items)) => {
            let mut inner = Encoder::new();
            for item in items {
                inner.encode_value(item)?;
            }
            let inner = inner.finish();
            body.put_u32((inner.len() + 4) as u32);
            body.put_u32(items.len() as u32);
            body.extend_from_slice(&inner);
        }
        (TypeCode::Map32, AmqpValue::Map(entries)) => {
            let mut inner = Encoder::new();
            for (k, v) in entries {
                inner.encode_value(k)?;
                inner.encode_value(v)?;
            }
            let inner = inner.finish();
            body.put_u32((inner.len() + 4) as u32);
            body.put_u32((entries.len() * 2) as u32);
            body.extend_from_slice(&inner);
        }
        (code, item) => {
            return Err(AmqpError::type_mismatch(format!(
                "array element {} does not match forced array code {:?}",
                item.tag(),
                code
            )))
        }
    }
    Ok(())
}

/// AMQP 1.0 value decoder. Strict: any declared size that exceeds the
/// remaining buffer, invalid UTF-8, or unrecognized format code is an
/// error rather than a best-effort recovery.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new(data: Vec<u8>) -> Self {
        Decoder {
            buffer: BytesMut::from(data.as_slice()),
        }
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    fn require(&self, n: usize, what: &str) -> AmqpResult<()> {
        if self.buffer.remaining() < n {
            return Err(AmqpError::malformed(format!(
                "insufficient data for {what}: need {n}, have {}",
                self.buffer.remaining()
            )));
        }
        Ok(())
    }

    pub fn decode_value(&mut self) -> AmqpResult<AmqpValue> {
        self.require(1, "format code")?;
        let code = self.buffer.get_u8();
        self.decode_by_code(code)
    }

    fn decode_by_code(&mut self, code: u8) -> AmqpResult<AmqpValue> {
        match code {
            x if x == TypeCode::Described as u8 => {
                let descriptor = self.decode_value()?;
                let value = self.decode_value()?;
                Ok(AmqpValue::described(descriptor, value))
            }
            x if x == TypeCode::Null as u8 => Ok(AmqpValue::Null),
            x if x == TypeCode::BooleanTrue as u8 => Ok(AmqpValue::Bool(true)),
            x if x == TypeCode::BooleanFalse as u8 => Ok(AmqpValue::Bool(false)),
            x if x == TypeCode::Boolean as u8 => {
                self.require(1, "boolean")?;
                Ok(AmqpValue::Bool(self.buffer.get_u8() != 0))
            }
            x if x == TypeCode::Uint0 as u8 => Ok(AmqpValue::UInt(0)),
            x if x == TypeCode::Ulong0 as u8 => Ok(AmqpValue::ULong(0)),
            x if x == TypeCode::Ubyte as u8 => {
                self.require(1, "ubyte")?;
                Ok(AmqpValue::UByte(self.buffer.get_u8()))
            }
            x if x == TypeCode::Smalluint as u8 => {
                self.require(1, "smalluint")?;
                Ok(AmqpValue::UInt(self.buffer.get_u8() as u32))
            }
            x if x == TypeCode::Smallulong as u8 => {
                self.require(1, "smallulong")?;
                Ok(AmqpValue::ULong(self.buffer.get_u8() as u64))
            }
            x if x == TypeCode::Smallint as u8 => {
                self.require(1, "smallint")?;
                Ok(AmqpValue::Int(self.buffer.get_i8() as i32))
            }
            x if x == TypeCode::Smalllong as u8 => {
                self.require(1, "smalllong")?;
                Ok(AmqpValue::Long(self.buffer.get_i8() as i64))
            }
            x if x == TypeCode::Ushort as u8 => {
                self.require(2, "ushort")?;
                Ok(AmqpValue::UShort(self.buffer.get_u16()))
            }
            x if x == TypeCode::Uint as u8 => {
                self.require(4, "uint")?;
                Ok(AmqpValue::UInt(self.buffer.get_u32()))
            }
            x if x == TypeCode::Ulong as u8 => {
                self.require(8, "ulong")?;
                Ok(AmqpValue::ULong(self.buffer.get_u64()))
            }
            x if x == TypeCode::Byte as u8 => {
                self.require(1, "byte")?;
                Ok(AmqpValue::Byte(self.buffer.get_i8()))
            }
            x if x == TypeCode::Short as u8 => {
                self.require(2, "short")?;
                Ok(AmqpValue::Short(self.buffer.get_i16()))
            }
            x if x == TypeCode::Int as u8 => {
                self.require(4, "int")?;
                Ok(AmqpValue::Int(self.buffer.get_i32()))
            }
            x if x == TypeCode::Long as u8 => {
                self.require(8, "long")?;
                Ok(AmqpValue::Long(self.buffer.get_i64()))
            }
            x if x == TypeCode::Float as u8 => {
                self.require(4, "float")?;
                Ok(AmqpValue::Float(self.buffer.get_f32()))
            }
            x if x == TypeCode::Double as u8 => {
                self.require(8, "double")?;
                Ok(AmqpValue::Double(self.buffer.get_f64()))
            }
            x if x == TypeCode::Char as u8 => {
                self.require(4, "char")?;
                let scalar = self.buffer.get_u32();
                char::from_u32(scalar)
                    .map(AmqpValue::Char)
                    .ok_or_else(|| AmqpError::malformed(format!("{scalar:#x} is not a Unicode scalar value")))
            }
            x if x == TypeCode::Timestamp as u8 => {
                self.require(8, "timestamp")?;
                Ok(AmqpValue::Timestamp(self.buffer.get_i64()))
            }
            x if x == TypeCode::Uuid as u8 => {
                self.require(16, "uuid")?;
                let bytes = self.buffer.copy_to_bytes(16);
                let mut arr = [0u8; 16];
                arr.copy_from_slice(&bytes);
                Ok(AmqpValue::Uuid(uuid::Uuid::from_bytes(arr)))
            }
            x if x == TypeCode::Binary8 as u8 => {
                self.require(1, "binary8 length")?;
                let len = self.buffer.get_u8() as usize;
                self.require(len, "binary8 payload")?;
                Ok(AmqpValue::Binary(self.buffer.copy_to_bytes(len).to_vec()))
            }
            x if x == TypeCode::Binary32 as u8 => {
                self.require(4, "binary32 length")?;
                let len = self.buffer.get_u32() as usize;
                self.require(len, "binary32 payload")?;
                Ok(AmqpValue::Binary(self.buffer.copy_to_bytes(len).to_vec()))
            }
            x if x == TypeCode::String8 as u8 => {
                self.require(1, "string8 length")?;
                let len = self.buffer.get_u8() as usize;
                self.require(len, "string8 payload")?;
                let data = self.buffer.copy_to_bytes(len);
                String::from_utf8(data.to_vec())
                    .map(AmqpValue::String)
                    .map_err(|e| AmqpError::malformed(format!("invalid UTF-8 string: {e}")))
            }
            x if x == TypeCode::String32 as u8 => {
                self.require(4, "string32 length")?;
                let len = self.buffer.get_u32() as usize;
                self.require(len, "string32 payload")?;
                let data = self.buffer.copy_to_bytes(len);
                String::from_utf8(data.to_vec())
                    .map(AmqpValue::String)
                    .map_err(|e| AmqpError::malformed(format!("invalid UTF-8 string: {e}")))
            }
            x if x == TypeCode::Symbol8 as u8 => {
                self.require(1, "symbol8 length")?;
                let len = self.buffer.get_u8() as usize;
                self.require(len, "symbol8 payload")?;
                let data = self.buffer.copy_to_bytes(len);
                String::from_utf8(data.to_vec())
                    .map(|s| AmqpValue::Symbol(AmqpSymbol::from(s)))
                    .map_err(|e| AmqpError::malformed(format!("invalid UTF-8 symbol: {e}")))
            }
            x if x == TypeCode::Symbol32 as u8 => {
                self.require(4, "symbol32 length")?;
                let len = self.buffer.get_u32() as usize;
                self.require(len, "symbol32 payload")?;
                let data = self.buffer.copy_to_bytes(len);
                String::from_utf8(data.to_vec())
                    .map(|s| AmqpValue::Symbol(AmqpSymbol::from(s)))
                    .map_err(|e| AmqpError::malformed(format!("invalid UTF-8 symbol: {e}")))
            }
            x if x == TypeCode::List0 as u8 => Ok(AmqpValue::List(vec![])),
            x if x == TypeCode::List8 as u8 => {
                self.require(2, "list8 header")?;
                let size = self.buffer.get_u8() as usize;
                let count = self.buffer.get_u8() as usize;
                self.decode_list_elements(size.saturating_sub(1), count)
            }
            x if x == TypeCode::List32 as u8 => {
                self.require(8, "list32 header")?;
                let size = self.buffer.get_u32() as usize;
                let count = self.buffer.get_u32() as usize;
                self.decode_list_elements(size.saturating_sub(4), count)
            }
            x if x == TypeCode::Map8 as u8 => {
                self.require(2, "map8 header")?;
                let size = self.buffer.get_u8() as usize;
                let count = self.buffer.get_u8() as usize;
                self.decode_map_entries(size.saturating_sub(1), count)
            }
            x if x == TypeCode::Map32 as u8 => {
                self.require(8, "map32 header")?;
                let size = self.buffer.get_u32() as usize;
                let count = self.buffer.get_u32() as usize;
                self.decode_map_entries(size.saturating_sub(4), count)
            }
            x if x == TypeCode::Array8 as u8 => {
                self.require(2, "array8 header")?;
                let size = self.buffer.get_u8() as usize;
                let count = self.buffer.get_u8() as usize;
                self.decode_array_elements(size.saturating_sub(1), count)
            }
            x if x == TypeCode::Array32 as u8 => {
                self.require(8, "array32 header")?;
                let size = self.buffer.get_u32() as usize;
                let count = self.buffer.get_u32() as usize;
                self.decode_array_elements(size.saturating_sub(4), count)
            }
            other => Err(AmqpError::UnknownFormatCode(other)),
        }
    }

    fn decode_list_elements(&mut self, declared_size: usize, count: usize) -> AmqpResult<AmqpValue> {
        self.require(declared_size, "list payload")?;
        let start_remaining = self.buffer.remaining();
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.decode_value()?);
        }
        let consumed = start_remaining - self.buffer.remaining();
        if consumed != declared_size {
            return Err(AmqpError::malformed(format!(
                "list declared size {declared_size} but elements consumed {consumed}"
            )));
        }
        Ok(AmqpValue::List(items))
    }

    fn decode_map_entries(&mut self, declared_size: usize, count: usize) -> AmqpResult<AmqpValue> {
        if count % 2 != 0 {
            return Err(AmqpError::malformed(format!(
                "map entry count {count} is odd"
            )));
        }
        self.require(declared_size, "map payload")?;
        let start_remaining = self.buffer.remaining();
        let mut entries = Vec::with_capacity(count / 2);
        for _ in 0..count / 2 {
            let key = self.decode_value()?;
            let value = self.decode_value()?;
            entries.push((key, value));
        }
        let consumed = start_remaining - self.buffer.remaining();
        if consumed != declared_size {
            return Err(AmqpError::malformed(format!(
                "map declared size {declared_size} but entries consumed {consumed}"
            )));
        }
        Ok(AmqpValue::Map(entries))
    }

    fn decode_array_elements(&mut self, declared_size: usize, count: usize) -> AmqpResult<AmqpValue> {
        self.require(declared_size, "array payload")?;
        let start_remaining = self.buffer.remaining();
        let mut items = Vec::with_capacity(count);
        if count > 0 {
            self.require(1, "array element constructor")?;
            let code = self.buffer.get_u8();
            for _ in 0..count {
                items.push(self.decode_by_code(code)?);
            }
        }
        let consumed = start_remaining - self.buffer.remaining();
        if consumed != declared_size {
            return Err(AmqpError::malformed(format!(
                "array declared size {declared_size} but elements consumed {consumed}"
            )));
        }
        Ok(AmqpValue::Array(items))
    }

    /// Decode a value expected to be a symbol, used for e.g. map keys
    /// that callers know are symbols ahead of time.
    pub fn decode_symbol(&mut self) -> AmqpResult<AmqpSymbol> {
        match self.decode_value()? {
            AmqpValue::Symbol(s) => Ok(s),
            other => Err(AmqpError::type_mismatch(format!(
                "expected symbol, got {}",
                other.tag()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &AmqpValue) -> AmqpValue {
        let mut encoder = Encoder::new();
        encoder.encode_value(value).unwrap();
        let encoded = encoder.finish();
        let mut decoder = Decoder::new(encoded);
        decoder.decode_value().unwrap()
    }

    #[test]
    fn golden_null_true_ulong() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Null).unwrap();
        assert_eq!(e.finish(), vec![0x40]);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Bool(true)).unwrap();
        assert_eq!(e.finish(), vec![0x41]);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::ULong(0)).unwrap();
        assert_eq!(e.finish(), vec![0x44]);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::ULong(255)).unwrap();
        assert_eq!(e.finish(), vec![0x53, 0xFF]);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::ULong(256)).unwrap();
        assert_eq!(e.finish(), vec![0x80, 0, 0, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn golden_string() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::String("Test".to_string())).unwrap();
        assert_eq!(e.finish(), vec![0xA1, 0x04, 0x54, 0x65, 0x73, 0x74]);
    }

    #[test]
    fn golden_binary() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Binary(b"Test".to_vec())).unwrap();
        assert_eq!(e.finish(), vec![0xA0, 0x04, 0x54, 0x65, 0x73, 0x74]);
    }

    #[test]
    fn golden_list() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::List(vec![AmqpValue::Bool(true), AmqpValue::UByte(125)]))
            .unwrap();
        assert_eq!(e.finish(), vec![0xC0, 0x04, 0x02, 0x41, 0x50, 0x7D]);
    }

    #[test]
    fn golden_uuid() {
        let uuid = uuid::Uuid::parse_str("37f9db00-fbb7-11e7-85ee-ecb1d755839a").unwrap();
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Uuid(uuid)).unwrap();
        assert_eq!(
            e.finish(),
            vec![
                0x98, 0x37, 0xF9, 0xDB, 0x00, 0xFB, 0xB7, 0x11, 0xE7, 0x85, 0xEE, 0xEC, 0xB1,
                0xD7, 0x55, 0x83, 0x9A
            ]
        );
    }

    #[test]
    fn smallint_and_smalllong_shortest_form() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Int(5)).unwrap();
        assert_eq!(e.finish(), vec![0x54, 0x05]);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Int(1000)).unwrap();
        let out = e.finish();
        assert_eq!(out[0], TypeCode::Int as u8);
        assert_eq!(out.len(), 5);

        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::Long(-1)).unwrap();
        assert_eq!(e.finish(), vec![0x55, 0xFF]);
    }

    #[test]
    fn uint_zero_uses_uint0() {
        let mut e = Encoder::new();
        e.encode_value(&AmqpValue::UInt(0)).unwrap();
        assert_eq!(e.finish(), vec![0x43]);
    }

    #[test]
    fn described_round_trips() {
        let value = AmqpValue::described(AmqpValue::ULong(0x73), AmqpValue::List(vec![AmqpValue::Int(1)]));
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn map_odd_count_is_malformed() {
        // Hand-build a map8 with an odd declared count.
        let mut bytes = vec![0xC1u8];
        bytes.push(3); // size (bogus, just needs to be consistent-ish)
        bytes.push(1); // count: odd
        bytes.push(0x40); // one null entry (key only, no value)
        let mut decoder = Decoder::new(bytes);
        let err = decoder.decode_value().unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn unknown_format_code_is_rejected() {
        let mut decoder = Decoder::new(vec![0xFF]);
        let err = decoder.decode_value().unwrap_err();
        assert!(matches!(err, AmqpError::UnknownFormatCode(0xFF)));
    }

    #[test]
    fn declared_size_exceeding_buffer_is_malformed() {
        let bytes = vec![0xA1, 0xFF]; // string8 claims 255 bytes, has none
        let mut decoder = Decoder::new(bytes);
        let err = decoder.decode_value().unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn invalid_utf8_string_is_malformed() {
        let bytes = vec![0xA1, 0x01, 0xFF];
        let mut decoder = Decoder::new(bytes);
        let err = decoder.decode_value().unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn array_enforces_tag_uniformity_on_encode() {
        let mut e = Encoder::new();
        let err = e
            .encode_value(&AmqpValue::Array(vec![AmqpValue::Int(1), AmqpValue::String("x".into())]))
            .unwrap_err();
        assert!(matches!(err, AmqpError::TypeMismatch(_)));
    }

    #[test]
    fn array_with_mixed_width_ints_round_trips() {
        // Int(5) alone would pick Smallint; Int(100000) needs the wide
        // form. The shared array constructor must widen to fit both.
        let value = AmqpValue::Array(vec![AmqpValue::Int(5), AmqpValue::Int(100_000)]);
        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
    }

    #[test]
    fn array_of_bools_round_trips_distinct_values() {
        // BooleanTrue/BooleanFalse are zero-payload codes and can't
        // vary per element under one shared constructor; the array
        // encoder must fall back to the explicit-payload Boolean form.
        let value = AmqpValue::Array(vec![AmqpValue::Bool(true), AmqpValue::Bool(false), AmqpValue::Bool(true)]);
        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
    }

    #[test]
    fn array_of_strings_with_mixed_lengths_round_trips() {
        let long = "x".repeat(300);
        let value = AmqpValue::Array(vec![AmqpValue::String("short".into()), AmqpValue::String(long)]);
        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trip_every_primitive() {
        let values = vec![
            AmqpValue::Null,
            AmqpValue::Bool(true),
            AmqpValue::Bool(false),
            AmqpValue::UByte(42),
            AmqpValue::UShort(12345),
            AmqpValue::UInt(123456789),
            AmqpValue::UInt(0),
            AmqpValue::ULong(1234567890123456789),
            AmqpValue::ULong(0),
            AmqpValue::Byte(-42),
            AmqpValue::Short(-12345),
            AmqpValue::Int(-123456789),
            AmqpValue::Int(5),
            AmqpValue::Long(-1234567890123456789),
            AmqpValue::Float(3.14159),
            AmqpValue::Double(3.14159265359),
            AmqpValue::Char('A'),
            AmqpValue::Timestamp(1234567890),
            AmqpValue::Uuid(uuid::Uuid::new_v4()),
            AmqpValue::Binary(vec![1, 2, 3, 4, 5]),
            AmqpValue::String("Hello, AMQP!".to_string()),
            AmqpValue::Symbol(AmqpSymbol::from("test-symbol")),
            AmqpValue::List(vec![AmqpValue::Int(1), AmqpValue::String("a".into())]),
            AmqpValue::Map(vec![(
                AmqpValue::Symbol(AmqpSymbol::from("k")),
                AmqpValue::Int(1),
            )]),
            AmqpValue::Array(vec![AmqpValue::Int(1), AmqpValue::Int(2)]),
        ];

        for value in values {
            assert_eq!(round_trip(&value), value);
        }
    }

    /// Golden scenario: a described message-annotations payload
    /// (descriptor ULong 0x72) wrapping a 2-entry symbol-keyed map.
    #[test]
    fn message_annotations_golden_round_trip() {
        let mut annotations = Vec::new();
        annotations.push((
            AmqpValue::Symbol(AmqpSymbol::from("x-opt-scheduled-enqueue-time")),
            AmqpValue::Timestamp(1540803917541),
        ));
        annotations.push((
            AmqpValue::Symbol(AmqpSymbol::from("x-opt-partition-key")),
            AmqpValue::String("e3a98c25-4574-4dbf-a5bf-2e5cd7f19882".to_string()),
        ));
        let value = AmqpValue::described(AmqpValue::ULong(0x72), AmqpValue::Map(annotations));

        let mut encoder = Encoder::new();
        encoder.encode_value(&value).unwrap();
        let encoded = encoder.finish();
        assert_eq!(encoded[0], TypeCode::Described as u8);
        assert_eq!(encoded[1], TypeCode::Smallulong as u8);
        assert_eq!(encoded[2], 0x72);

        let mut decoder = Decoder::new(encoded);
        let decoded = decoder.decode_value().unwrap();
        assert_eq!(decoded, value);
    }
}
