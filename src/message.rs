//! AMQP 1.0 Message System
//!
//! Messages are composed of optional described sections, assembled and
//! read back in the wire order: `header`, `delivery-annotations`,
//! `message-annotations`, `properties`, `application-properties`, body
//! (one of `data`/`sequence`/`value`, the first two possibly repeated),
//! `footer`. Absent sections are skipped on encode rather than written
//! as a null placeholder.
//!
//! # Examples
//!
//! ```rust
//! use amqp10_core::message::Message;
//!
//! let message = Message::text("Hello, World!");
//! assert_eq!(message.body_as_text(), Some("Hello, World!"));
//!
//! let encoded = message.encode().unwrap();
//! let decoded = amqp10_core::message::Message::decode(&encoded).unwrap();
//! assert_eq!(message, decoded);
//! ```

use crate::codec::{Decoder, Encoder};
use crate::error::{AmqpError, AmqpResult};
use crate::types::{AmqpList, AmqpMap, AmqpSymbol, AmqpValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DESCRIPTOR_HEADER: u64 = 0x70;
pub const DESCRIPTOR_DELIVERY_ANNOTATIONS: u64 = 0x71;
pub const DESCRIPTOR_MESSAGE_ANNOTATIONS: u64 = 0x72;
pub const DESCRIPTOR_PROPERTIES: u64 = 0x73;
pub const DESCRIPTOR_APPLICATION_PROPERTIES: u64 = 0x74;
pub const DESCRIPTOR_DATA: u64 = 0x75;
pub const DESCRIPTOR_SEQUENCE: u64 = 0x76;
pub const DESCRIPTOR_VALUE: u64 = 0x77;
pub const DESCRIPTOR_FOOTER: u64 = 0x78;

/// The standard, non-batched message format.
pub const MESSAGE_FORMAT_STANDARD: u32 = 0;
/// AMQP-batch-1.0: a `data` section whose blobs are each a pre-encoded
/// `amqp-value` envelope of one inner payload.
pub const MESSAGE_FORMAT_BATCH: u32 = 0x80013700;

/// AMQP 1.0 message: an owning record of its optional sections plus the
/// active body shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_format: u32,
    pub header: Option<Header>,
    pub delivery_annotations: Option<AmqpMap>,
    pub message_annotations: Option<AmqpMap>,
    pub properties: Option<Properties>,
    pub application_properties: Option<AmqpMap>,
    pub body: Option<Body>,
    pub footer: Option<AmqpMap>,
}

/// Five positional, trailing-null-truncatable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub durable: Option<bool>,
    pub priority: Option<u8>,
    pub ttl: Option<u32>,
    pub first_acquirer: Option<bool>,
    pub delivery_count: Option<u32>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_value(&self) -> AmqpValue {
        let fields = [
            self.durable.map(AmqpValue::Bool),
            self.priority.map(AmqpValue::UByte),
            self.ttl.map(AmqpValue::UInt),
            self.first_acquirer.map(AmqpValue::Bool),
            self.delivery_count.map(AmqpValue::UInt),
        ];
        AmqpValue::List(truncate_trailing_nulls(&fields))
    }

    fn from_value(value: &AmqpValue) -> AmqpResult<Self> {
        let list = as_padded_list(value, 5)?;
        Ok(Header {
            durable: as_bool(&list[0]),
            priority: as_ubyte(&list[1]),
            ttl: as_uint(&list[2]),
            first_acquirer: as_bool(&list[3]),
            delivery_count: as_uint(&list[4]),
        })
    }
}

/// 13 positional, trailing-null-truncatable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub message_id: Option<AmqpValue>,
    pub user_id: Option<Vec<u8>>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub reply_to: Option<String>,
    pub correlation_id: Option<AmqpValue>,
    pub content_type: Option<AmqpSymbol>,
    pub content_encoding: Option<AmqpSymbol>,
    pub absolute_expiry_time: Option<i64>,
    pub creation_time: Option<i64>,
    pub group_id: Option<String>,
    pub group_sequence: Option<u32>,
    pub reply_to_group_id: Option<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_value(&self) -> AmqpValue {
        let fields = [
            self.message_id.clone(),
            self.user_id.clone().map(AmqpValue::Binary),
            self.to.clone().map(AmqpValue::String),
            self.subject.clone().map(AmqpValue::String),
            self.reply_to.clone().map(AmqpValue::String),
            self.correlation_id.clone(),
            self.content_type.clone().map(AmqpValue::Symbol),
            self.content_encoding.clone().map(AmqpValue::Symbol),
            self.absolute_expiry_time.map(AmqpValue::Timestamp),
            self.creation_time.map(AmqpValue::Timestamp),
            self.group_id.clone().map(AmqpValue::String),
            self.group_sequence.map(AmqpValue::UInt),
            self.reply_to_group_id.clone().map(AmqpValue::String),
        ];
        AmqpValue::List(truncate_trailing_nulls(&fields))
    }

    fn from_value(value: &AmqpValue) -> AmqpResult<Self> {
        let list = as_padded_list(value, 13)?;
        Ok(Properties {
            message_id: as_non_null(&list[0]),
            user_id: as_binary(&list[1]),
            to: as_string(&list[2]),
            subject: as_string(&list[3]),
            reply_to: as_string(&list[4]),
            correlation_id: as_non_null(&list[5]),
            content_type: as_symbol(&list[6]),
            content_encoding: as_symbol(&list[7]),
            absolute_expiry_time: as_timestamp(&list[8]),
            creation_time: as_timestamp(&list[9]),
            group_id: as_string(&list[10]),
            group_sequence: as_uint(&list[11]),
            reply_to_group_id: as_string(&list[12]),
        })
    }
}

/// The active body shape. Exactly one variant is populated per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    /// One or more opaque binary blobs, each its own `data` section.
    Data(Vec<Vec<u8>>),
    /// One or more `amqp-sequence` described lists.
    Sequence(Vec<AmqpList>),
    /// A single `amqp-value` described value.
    Value(AmqpValue),
}

/// A message using the batch format (`message_format = 0x80013700`): a
/// `Data` body whose blobs are each a pre-encoded `amqp-value` envelope
/// of one inner payload, built from a lazy sequence so the whole batch
/// never needs to be materialized in memory at once.
pub struct BatchMessage {
    pub message: Message,
}

impl BatchMessage {
    /// Pull from `payloads` until exhausted, encoding each as an
    /// `amqp-value` envelope and appending it as one `Data` blob.
    pub fn build(payloads: impl Iterator<Item = AmqpValue>) -> AmqpResult<Self> {
        let mut blobs = Vec::new();
        for payload in payloads {
            let envelope = AmqpValue::described(AmqpValue::ULong(DESCRIPTOR_VALUE), payload);
            let mut encoder = Encoder::new();
            encoder.encode_value(&envelope)?;
            blobs.push(encoder.finish());
        }
        Ok(BatchMessage {
            message: Message {
                message_format: MESSAGE_FORMAT_BATCH,
                header: None,
                delivery_annotations: None,
                message_annotations: None,
                properties: None,
                application_properties: None,
                body: Some(Body::Data(blobs)),
                footer: None,
            },
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    pub fn new() -> Self {
        MessageBuilder {
            message: Message::new(),
        }
    }

    pub fn header(mut self, header: Header) -> Self {
        self.message.header = Some(header);
        self
    }

    pub fn delivery_annotations(mut self, annotations: AmqpMap) -> Self {
        self.message.delivery_annotations = Some(annotations);
        self
    }

    pub fn message_annotations(mut self, annotations: AmqpMap) -> Self {
        self.message.message_annotations = Some(annotations);
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.message.properties = Some(properties);
        self
    }

    pub fn application_properties(mut self, properties: AmqpMap) -> Self {
        self.message.application_properties = Some(properties);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.message.body = Some(body);
        self
    }

    pub fn footer(mut self, footer: AmqpMap) -> Self {
        self.message.footer = Some(footer);
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::new()
    }
}

impl Message {
    pub fn new() -> Self {
        Message {
            message_format: MESSAGE_FORMAT_STANDARD,
            header: None,
            delivery_annotations: None,
            message_annotations: None,
            properties: None,
            application_properties: None,
            body: None,
            footer: None,
        }
    }

    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    pub fn text(text: impl Into<String>) -> Self {
        MessageBuilder::new()
            .body(Body::Value(AmqpValue::String(text.into())))
            .build()
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        MessageBuilder::new().body(Body::Data(vec![data.into()])).build()
    }

    pub fn body_as_text(&self) -> Option<&str> {
        match &self.body {
            Some(Body::Value(AmqpValue::String(s))) => Some(s),
            _ => None,
        }
    }

    pub fn body_as_binary(&self) -> Option<Vec<u8>> {
        match &self.body {
            Some(Body::Data(blobs)) => Some(blobs.concat()),
            _ => None,
        }
    }

    pub fn message_id_as_string(&self) -> Option<String> {
        match self.properties.as_ref().and_then(|p| p.message_id.as_ref()) {
            Some(AmqpValue::String(s)) => Some(s.clone()),
            Some(AmqpValue::Uuid(uuid)) => Some(uuid.to_string()),
            _ => None,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.properties_mut().message_id = Some(AmqpValue::String(id.into()));
        self
    }

    pub fn with_uuid_message_id(mut self, id: Uuid) -> Self {
        self.properties_mut().message_id = Some(AmqpValue::Uuid(id));
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.properties_mut().subject = Some(subject.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<AmqpSymbol>) -> Self {
        self.properties_mut().content_type = Some(content_type.into());
        self
    }

    fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Properties::new)
    }

    /// Encode all populated sections, in wire order, skipping absent
    /// ones.
    pub fn encode(&self) -> AmqpResult<Vec<u8>> {
        let mut encoder = Encoder::new();

        if let Some(header) = &self.header {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_HEADER),
                header.to_value(),
            ))?;
        }
        if let Some(annotations) = &self.delivery_annotations {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_DELIVERY_ANNOTATIONS),
                AmqpValue::Map(annotations.clone()),
            ))?;
        }
        if let Some(annotations) = &self.message_annotations {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_MESSAGE_ANNOTATIONS),
                AmqpValue::Map(annotations.clone()),
            ))?;
        }
        if let Some(properties) = &self.properties {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_PROPERTIES),
                properties.to_value(),
            ))?;
        }
        if let Some(application_properties) = &self.application_properties {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_APPLICATION_PROPERTIES),
                AmqpValue::Map(application_properties.clone()),
            ))?;
        }
        match &self.body {
            Some(Body::Data(blobs)) => {
                for blob in blobs {
                    encoder.encode_value(&AmqpValue::described(
                        AmqpValue::ULong(DESCRIPTOR_DATA),
                        AmqpValue::Binary(blob.clone()),
                    ))?;
                }
            }
            Some(Body::Sequence(sequences)) => {
                for sequence in sequences {
                    encoder.encode_value(&AmqpValue::described(
                        AmqpValue::ULong(DESCRIPTOR_SEQUENCE),
                        AmqpValue::List(sequence.clone()),
                    ))?;
                }
            }
            Some(Body::Value(value)) => {
                encoder.encode_value(&AmqpValue::described(
                    AmqpValue::ULong(DESCRIPTOR_VALUE),
                    value.clone(),
                ))?;
            }
            None => {}
        }
        if let Some(footer) = &self.footer {
            encoder.encode_value(&AmqpValue::described(
                AmqpValue::ULong(DESCRIPTOR_FOOTER),
                AmqpValue::Map(footer.clone()),
            ))?;
        }

        Ok(encoder.finish())
    }

    /// Decode a message's sections in whatever order they arrive on the
    /// wire, storing each into its named slot. A second occurrence of a
    /// singleton section (header, properties, footer, annotations) is
    /// `MalformedFrame`; `data`/`sequence` accumulate instead.
    pub fn decode(bytes: &[u8]) -> AmqpResult<Message> {
        let mut decoder = Decoder::new(bytes.to_vec());
        let mut message = Message::new();
        let mut data_blobs = Vec::new();
        let mut sequences = Vec::new();
        let mut value_seen = false;

        while decoder.has_remaining() {
            let section = decoder.decode_value()?;
            let (descriptor, payload) = section.as_described().ok_or_else(|| {
                AmqpError::malformed("message section is not a described type")
            })?;
            let tag = match descriptor {
                AmqpValue::ULong(n) => *n,
                AmqpValue::UInt(n) => *n as u64,
                other => {
                    return Err(AmqpError::malformed(format!(
                        "message section descriptor is not a ulong: {other:?}"
                    )))
                }
            };

            match tag {
                DESCRIPTOR_HEADER => {
                    if message.header.is_some() {
                        return Err(AmqpError::malformed("duplicate header section"));
                    }
                    message.header = Some(Header::from_value(payload)?);
                }
                DESCRIPTOR_DELIVERY_ANNOTATIONS => {
                    if message.delivery_annotations.is_some() {
                        return Err(AmqpError::malformed("duplicate delivery-annotations section"));
                    }
                    message.delivery_annotations = Some(as_map(payload)?);
                }
                DESCRIPTOR_MESSAGE_ANNOTATIONS => {
                    if message.message_annotations.is_some() {
                        return Err(AmqpError::malformed("duplicate message-annotations section"));
                    }
                    message.message_annotations = Some(as_map(payload)?);
                }
                DESCRIPTOR_PROPERTIES => {
                    if message.properties.is_some() {
                        return Err(AmqpError::malformed("duplicate properties section"));
                    }
                    message.properties = Some(Properties::from_value(payload)?);
                }
                DESCRIPTOR_APPLICATION_PROPERTIES => {
                    if message.application_properties.is_some() {
                        return Err(AmqpError::malformed("duplicate application-properties section"));
                    }
                    message.application_properties = Some(as_map(payload)?);
                }
                DESCRIPTOR_DATA => {
                    if value_seen || !sequences.is_empty() {
                        return Err(AmqpError::malformed("mixed body section shapes"));
                    }
                    data_blobs.push(
                        payload
                            .as_binary()
                            .ok_or_else(|| AmqpError::malformed("data section is not binary"))?
                            .to_vec(),
                    );
                }
                DESCRIPTOR_SEQUENCE => {
                    if value_seen || !data_blobs.is_empty() {
                        return Err(AmqpError::malformed("mixed body section shapes"));
                    }
                    sequences.push(
                        payload
                            .as_list()
                            .ok_or_else(|| AmqpError::malformed("sequence section is not a list"))?
                            .to_vec(),
                    );
                }
                DESCRIPTOR_VALUE => {
                    if value_seen || !data_blobs.is_empty() || !sequences.is_empty() {
                        return Err(AmqpError::malformed("duplicate or mixed body section"));
                    }
                    value_seen = true;
                    message.body = Some(Body::Value(payload.clone()));
                }
                DESCRIPTOR_FOOTER => {
                    if message.footer.is_some() {
                        return Err(AmqpError::malformed("duplicate footer section"));
                    }
                    message.footer = Some(as_map(payload)?);
                }
                other => {
                    return Err(AmqpError::malformed(format!(
                        "unrecognized message section descriptor: 0x{other:x}"
                    )))
                }
            }
        }

        if !data_blobs.is_empty() {
            message.body = Some(Body::Data(data_blobs));
        } else if !sequences.is_empty() {
            message.body = Some(Body::Sequence(sequences));
        }

        Ok(message)
    }
}

fn as_map(value: &AmqpValue) -> AmqpResult<AmqpMap> {
    value
        .as_map()
        .map(|m| m.to_vec())
        .ok_or_else(|| AmqpError::malformed("section is not a map"))
}

fn truncate_trailing_nulls(fields: &[Option<AmqpValue>]) -> Vec<AmqpValue> {
    let last_set = fields.iter().rposition(Option::is_some);
    match last_set {
        Some(i) => fields[..=i]
            .iter()
            .map(|f| f.clone().unwrap_or(AmqpValue::Null))
            .collect(),
        None => vec![],
    }
}

fn as_padded_list(value: &AmqpValue, len: usize) -> AmqpResult<Vec<AmqpValue>> {
    let list = value
        .as_list()
        .ok_or_else(|| AmqpError::malformed("section is not a list"))?;
    let mut padded = list.to_vec();
    padded.resize(len, AmqpValue::Null);
    Ok(padded)
}

fn as_non_null(value: &AmqpValue) -> Option<AmqpValue> {
    match value {
        AmqpValue::Null => None,
        other => Some(other.clone()),
    }
}

fn as_bool(value: &AmqpValue) -> Option<bool> {
    match value {
        AmqpValue::Bool(b) => Some(*b),
        _ => None,
    }
}

fn as_ubyte(value: &AmqpValue) -> Option<u8> {
    match value {
        AmqpValue::UByte(n) => Some(*n),
        _ => None,
    }
}

fn as_uint(value: &AmqpValue) -> Option<u32> {
    match value {
        AmqpValue::UInt(n) => Some(*n),
        _ => None,
    }
}

fn as_timestamp(value: &AmqpValue) -> Option<i64> {
    match value {
        AmqpValue::Timestamp(t) => Some(*t),
        _ => None,
    }
}

fn as_string(value: &AmqpValue) -> Option<String> {
    match value {
        AmqpValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_symbol(value: &AmqpValue) -> Option<AmqpSymbol> {
    match value {
        AmqpValue::Symbol(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_binary(value: &AmqpValue) -> Option<Vec<u8>> {
    match value {
        AmqpValue::Binary(b) => Some(b.clone()),
        _ => None,
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::text(text)
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::binary(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_round_trips() {
        let message = Message::text("Hello, World!").with_subject("greeting");
        let encoded = message.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn binary_message_round_trips() {
        let message = Message::binary(b"payload".to_vec());
        let encoded = message.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded.body_as_binary().unwrap(), b"payload".to_vec());
    }

    #[test]
    fn multiple_data_blobs_accumulate_in_order() {
        let message = Message::builder()
            .body(Body::Data(vec![b"a".to_vec(), b"b".to_vec()]))
            .build();
        let encoded = message.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded.body, Some(Body::Data(vec![b"a".to_vec(), b"b".to_vec()])));
    }

    #[test]
    fn header_truncates_trailing_nulls_but_decode_pads_them_back() {
        let header = Header {
            durable: Some(true),
            priority: None,
            ttl: None,
            first_acquirer: None,
            delivery_count: None,
        };
        let value = header.to_value();
        assert_eq!(value.as_list().unwrap().len(), 1);

        let decoded = Header::from_value(&value).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn duplicate_section_is_malformed() {
        let mut encoder = Encoder::new();
        let header_section = AmqpValue::described(
            AmqpValue::ULong(DESCRIPTOR_HEADER),
            AmqpValue::List(vec![AmqpValue::Bool(true)]),
        );
        encoder.encode_value(&header_section).unwrap();
        encoder.encode_value(&header_section).unwrap();
        let bytes = encoder.finish();

        let err = Message::decode(&bytes).unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn batch_message_uses_batch_format_and_wraps_each_payload() {
        let payloads = vec![AmqpValue::Int(1), AmqpValue::Int(2)].into_iter();
        let batch = BatchMessage::build(payloads).unwrap();
        assert_eq!(batch.message.message_format, MESSAGE_FORMAT_BATCH);
        match &batch.message.body {
            Some(Body::Data(blobs)) => assert_eq!(blobs.len(), 2),
            _ => panic!("expected Data body"),
        }
    }

    #[test]
    fn properties_round_trip_with_all_fields() {
        let properties = Properties {
            message_id: Some(AmqpValue::String("id-1".into())),
            user_id: Some(vec![1, 2, 3]),
            to: Some("queue/a".into()),
            subject: Some("subj".into()),
            reply_to: Some("queue/b".into()),
            correlation_id: Some(AmqpValue::String("corr-1".into())),
            content_type: Some(AmqpSymbol::from("text/plain")),
            content_encoding: Some(AmqpSymbol::from("utf-8")),
            absolute_expiry_time: Some(123),
            creation_time: Some(456),
            group_id: Some("group".into()),
            group_sequence: Some(1),
            reply_to_group_id: Some("group-reply".into()),
        };
        let value = properties.to_value();
        let decoded = Properties::from_value(&value).unwrap();
        assert_eq!(decoded, properties);
    }
}
