//! AMQP 1.0 Value Model
//!
//! This module provides the core type system for AMQP 1.0: a tagged
//! variant covering every primitive and composite value the wire format
//! can carry, plus the collection operations (`List`, `Map`, `Array`) and
//! the `Described` wrapper used by composite types like performatives and
//! message sections.
//!
//! # Overview
//!
//! `AmqpValue` is immutable after construction except for the collection
//! mutation operations (`list_set`, `map_insert`, `array_append`), which
//! operate in place on an owned value. Equality is structural and
//! recursive and respects the type tag: `AmqpValue::Int(5)` is never
//! equal to `AmqpValue::Long(5)`, and `AmqpValue::Symbol` is never equal
//! to `AmqpValue::String` even when the underlying bytes match.
//!
//! ```rust
//! use amqp10_core::types::AmqpValue;
//!
//! let a = AmqpValue::Int(5);
//! let b = AmqpValue::Long(5);
//! assert_ne!(a, b);
//! ```

use crate::error::{AmqpError, AmqpResult};
use serde::{Deserialize, Serialize};

/// An ASCII identifier, compared as bytes rather than as Unicode text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmqpSymbol(pub String);

impl AmqpSymbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for AmqpSymbol {
    fn from(s: String) -> Self {
        AmqpSymbol(s)
    }
}

impl From<&str> for AmqpSymbol {
    fn from(s: &str) -> Self {
        AmqpSymbol(s.to_string())
    }
}

impl std::fmt::Display for AmqpSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The AMQP 1.0 polymorphic value.
///
/// `List`, `Map`, `Array`, and `Described` are composite and own their
/// children by value; equality and cloning walk the structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AmqpValue {
    Null,
    Bool(bool),
    UByte(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    /// Signed 64-bit milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid(uuid::Uuid),
    Binary(Vec<u8>),
    String(String),
    Symbol(AmqpSymbol),
    List(Vec<AmqpValue>),
    /// Ordered key/value pairs; insertion order is preserved and key
    /// lookup is by deep structural equality, not hashing.
    Map(Vec<(AmqpValue, AmqpValue)>),
    /// Elements that all share one type tag.
    Array(Vec<AmqpValue>),
    /// A descriptor paired with a value, introduced on the wire by `0x00`.
    Described(Box<AmqpValue>, Box<AmqpValue>),
}

impl AmqpValue {
    /// The format-code family this value belongs to, used by `Array` to
    /// enforce that every element shares one tag.
    pub fn tag(&self) -> &'static str {
        match self {
            AmqpValue::Null => "null",
            AmqpValue::Bool(_) => "bool",
            AmqpValue::UByte(_) => "ubyte",
            AmqpValue::UShort(_) => "ushort",
            AmqpValue::UInt(_) => "uint",
            AmqpValue::ULong(_) => "ulong",
            AmqpValue::Byte(_) => "byte",
            AmqpValue::Short(_) => "short",
            AmqpValue::Int(_) => "int",
            AmqpValue::Long(_) => "long",
            AmqpValue::Float(_) => "float",
            AmqpValue::Double(_) => "double",
            AmqpValue::Char(_) => "char",
            AmqpValue::Timestamp(_) => "timestamp",
            AmqpValue::Uuid(_) => "uuid",
            AmqpValue::Binary(_) => "binary",
            AmqpValue::String(_) => "string",
            AmqpValue::Symbol(_) => "symbol",
            AmqpValue::List(_) => "list",
            AmqpValue::Map(_) => "map",
            AmqpValue::Array(_) => "array",
            AmqpValue::Described(_, _) => "described",
        }
    }

    /// Wrap `value` behind `descriptor`, the constructor for every
    /// composite section and performative.
    pub fn described(descriptor: AmqpValue, value: AmqpValue) -> Self {
        AmqpValue::Described(Box::new(descriptor), Box::new(value))
    }

    /// Range-checked `ubyte` constructor, for callers building a value
    /// from an untyped host integer.
    pub fn try_ubyte(value: i64) -> AmqpResult<Self> {
        u8::try_from(value)
            .map(AmqpValue::UByte)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in ubyte")))
    }

    pub fn try_ushort(value: i64) -> AmqpResult<Self> {
        u16::try_from(value)
            .map(AmqpValue::UShort)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in ushort")))
    }

    pub fn try_uint(value: i64) -> AmqpResult<Self> {
        u32::try_from(value)
            .map(AmqpValue::UInt)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in uint")))
    }

    pub fn try_ulong(value: i128) -> AmqpResult<Self> {
        u64::try_from(value)
            .map(AmqpValue::ULong)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in ulong")))
    }

    pub fn try_byte(value: i64) -> AmqpResult<Self> {
        i8::try_from(value)
            .map(AmqpValue::Byte)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in byte")))
    }

    pub fn try_short(value: i64) -> AmqpResult<Self> {
        i16::try_from(value)
            .map(AmqpValue::Short)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in short")))
    }

    pub fn try_int(value: i64) -> AmqpResult<Self> {
        i32::try_from(value)
            .map(AmqpValue::Int)
            .map_err(|_| AmqpError::range(format!("{value} does not fit in int")))
    }

    pub fn try_char(scalar: u32) -> AmqpResult<Self> {
        char::from_u32(scalar)
            .map(AmqpValue::Char)
            .ok_or_else(|| AmqpError::range(format!("{scalar:#x} is not a Unicode scalar value")))
    }

    /// Read this value back as a byte string, for `Binary`.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            AmqpValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Read this value back as text, for `String`.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AmqpValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read this value back as a symbol's bytes.
    pub fn as_symbol(&self) -> Option<&AmqpSymbol> {
        match self {
            AmqpValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Read this value back as a UUID.
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            AmqpValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AmqpValue]> {
        match self {
            AmqpValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(AmqpValue, AmqpValue)]> {
        match self {
            AmqpValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AmqpValue]> {
        match self {
            AmqpValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_described(&self) -> Option<(&AmqpValue, &AmqpValue)> {
        match self {
            AmqpValue::Described(d, v) => Some((d, v)),
            _ => None,
        }
    }

    // -- List operations --------------------------------------------------

    /// Grow a `List` to `len` elements, filling new slots with `Null`.
    /// No-op if already at least `len` long.
    pub fn list_resize(&mut self, len: usize) -> AmqpResult<()> {
        match self {
            AmqpValue::List(items) => {
                if items.len() < len {
                    items.resize(len, AmqpValue::Null);
                }
                Ok(())
            }
            other => Err(AmqpError::type_mismatch(format!(
                "list_resize called on {}",
                other.tag()
            ))),
        }
    }

    /// Positional set. `IndexOutOfRange` if `i >= size`.
    pub fn list_set(&mut self, i: usize, value: AmqpValue) -> AmqpResult<()> {
        match self {
            AmqpValue::List(items) => {
                if i >= items.len() {
                    return Err(AmqpError::index_out_of_range(format!(
                        "index {i} out of range for list of length {}",
                        items.len()
                    )));
                }
                items[i] = value;
                Ok(())
            }
            other => Err(AmqpError::type_mismatch(format!(
                "list_set called on {}",
                other.tag()
            ))),
        }
    }

    /// Positional get.
    pub fn list_get(&self, i: usize) -> AmqpResult<&AmqpValue> {
        match self {
            AmqpValue::List(items) => items.get(i).ok_or_else(|| {
                AmqpError::index_out_of_range(format!(
                    "index {i} out of range for list of length {}",
                    items.len()
                ))
            }),
            other => Err(AmqpError::type_mismatch(format!(
                "list_get called on {}",
                other.tag()
            ))),
        }
    }

    // -- Map operations ----------------------------------------------------

    /// Insert, or overwrite in place if `key` is already present
    /// (structural equality), preserving the original position.
    pub fn map_insert(&mut self, key: AmqpValue, value: AmqpValue) -> AmqpResult<()> {
        match self {
            AmqpValue::Map(entries) => {
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    entries.push((key, value));
                }
                Ok(())
            }
            other => Err(AmqpError::type_mismatch(format!(
                "map_insert called on {}",
                other.tag()
            ))),
        }
    }

    /// Lookup by deep structural equality (same tag and equal payload).
    pub fn map_get(&self, key: &AmqpValue) -> AmqpResult<&AmqpValue> {
        match self {
            AmqpValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| AmqpError::key_not_found(format!("{key:?}"))),
            other => Err(AmqpError::type_mismatch(format!(
                "map_get called on {}",
                other.tag()
            ))),
        }
    }

    /// Ordinal access into the map in insertion order.
    pub fn map_nth(&self, i: usize) -> AmqpResult<(&AmqpValue, &AmqpValue)> {
        match self {
            AmqpValue::Map(entries) => entries.get(i).map(|(k, v)| (k, v)).ok_or_else(|| {
                AmqpError::index_out_of_range(format!(
                    "index {i} out of range for map of length {}",
                    entries.len()
                ))
            }),
            other => Err(AmqpError::type_mismatch(format!(
                "map_nth called on {}",
                other.tag()
            ))),
        }
    }

    // -- Array operations ----------------------------------------------------

    /// Append `value`, enforcing that every element of the array shares
    /// one type tag.
    pub fn array_append(&mut self, value: AmqpValue) -> AmqpResult<()> {
        match self {
            AmqpValue::Array(items) => {
                if let Some(first) = items.first() {
                    if first.tag() != value.tag() {
                        return Err(AmqpError::type_mismatch(format!(
                            "array holds {} elements, got {}",
                            first.tag(),
                            value.tag()
                        )));
                    }
                }
                items.push(value);
                Ok(())
            }
            other => Err(AmqpError::type_mismatch(format!(
                "array_append called on {}",
                other.tag()
            ))),
        }
    }
}

/// Convenience alias: a bare `Vec<AmqpValue>` used wherever an ordered
/// sequence is called for, e.g. `amqp-sequence` body sections.
pub type AmqpList = Vec<AmqpValue>;

/// Convenience alias: ordered key/value pairs, matching `AmqpValue::Map`'s
/// internal representation. Kept distinct from `AmqpValue` so sections
/// like `message-annotations` can be typed without wrapping/unwrapping a
/// `Map` variant at every call site.
pub type AmqpMap = Vec<(AmqpValue, AmqpValue)>;

pub fn map_get<'a>(map: &'a AmqpMap, key: &AmqpValue) -> Option<&'a AmqpValue> {
    map.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn map_insert(map: &mut AmqpMap, key: AmqpValue, value: AmqpValue) {
    if let Some(slot) = map.iter_mut().find(|(k, _)| *k == key) {
        slot.1 = value;
    } else {
        map.push((key, value));
    }
}

/// Sender settle mode, as carried in `attach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderSettleMode {
    Unsettled = 0,
    Settled = 1,
    Mixed = 2,
}

/// Receiver settle mode, as carried in `attach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiverSettleMode {
    First = 0,
    Second = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_participates_in_equality() {
        assert_ne!(AmqpValue::Int(5), AmqpValue::Long(5));
        assert_ne!(
            AmqpValue::Symbol(AmqpSymbol::from("x")),
            AmqpValue::String("x".to_string())
        );
    }

    #[test]
    fn list_resize_fills_with_null() {
        let mut list = AmqpValue::List(vec![AmqpValue::Bool(true)]);
        list.list_resize(3).unwrap();
        assert_eq!(
            list,
            AmqpValue::List(vec![AmqpValue::Bool(true), AmqpValue::Null, AmqpValue::Null])
        );
    }

    #[test]
    fn list_set_out_of_range() {
        let mut list = AmqpValue::List(vec![AmqpValue::Null]);
        let err = list.list_set(5, AmqpValue::Bool(true)).unwrap_err();
        assert!(matches!(err, AmqpError::IndexOutOfRange(_)));
    }

    #[test]
    fn map_insert_overwrites_existing_key_in_place() {
        let mut map = AmqpValue::Map(vec![]);
        map.map_insert(AmqpValue::Symbol(AmqpSymbol::from("k")), AmqpValue::Int(1))
            .unwrap();
        map.map_insert(AmqpValue::Symbol(AmqpSymbol::from("k")), AmqpValue::Int(2))
            .unwrap();
        assert_eq!(map.as_map().unwrap().len(), 1);
        assert_eq!(
            *map.map_get(&AmqpValue::Symbol(AmqpSymbol::from("k"))).unwrap(),
            AmqpValue::Int(2)
        );
    }

    #[test]
    fn map_get_missing_key() {
        let map = AmqpValue::Map(vec![]);
        let err = map
            .map_get(&AmqpValue::Symbol(AmqpSymbol::from("missing")))
            .unwrap_err();
        assert!(matches!(err, AmqpError::KeyNotFound(_)));
    }

    #[test]
    fn array_append_enforces_tag_uniformity() {
        let mut array = AmqpValue::Array(vec![AmqpValue::Int(1)]);
        array.array_append(AmqpValue::Int(2)).unwrap();
        let err = array.array_append(AmqpValue::String("x".into())).unwrap_err();
        assert!(matches!(err, AmqpError::TypeMismatch(_)));
    }

    #[test]
    fn try_ubyte_range_checks() {
        assert!(AmqpValue::try_ubyte(255).is_ok());
        assert!(AmqpValue::try_ubyte(256).is_err());
        assert!(AmqpValue::try_ubyte(-1).is_err());
    }

    #[test]
    fn try_byte_range_checks() {
        assert!(AmqpValue::try_byte(-128).is_ok());
        assert!(AmqpValue::try_byte(127).is_ok());
        assert!(AmqpValue::try_byte(128).is_err());
        assert!(AmqpValue::try_byte(-129).is_err());
    }

    #[test]
    fn described_round_trips_descriptor_and_value() {
        let value = AmqpValue::described(AmqpValue::ULong(0x73), AmqpValue::List(vec![]));
        let (descriptor, inner) = value.as_described().unwrap();
        assert_eq!(*descriptor, AmqpValue::ULong(0x73));
        assert_eq!(*inner, AmqpValue::List(vec![]));
    }
}
