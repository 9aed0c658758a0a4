//! AMQP 1.0 Performatives
//!
//! Typed, owned records for the connection/session/link control frames
//! and the SASL negotiation frames. This module gives `FrameCodec`
//! something concrete to dispatch a frame body to; it does not implement
//! connection/session/link *semantics* (what a caller does upon receipt)
//! — those state machines are out of scope for this crate. Each record
//! is a plain struct of optional fields mirroring the AMQP 1.0 described-
//! list layout, encoded and decoded through the same `Encoder`/`Decoder`
//! as any other described list.

use crate::error::{AmqpError, AmqpResult};
use crate::types::{AmqpMap, AmqpSymbol, AmqpValue};

pub const DESCRIPTOR_OPEN: u64 = 0x10;
pub const DESCRIPTOR_BEGIN: u64 = 0x11;
pub const DESCRIPTOR_ATTACH: u64 = 0x12;
pub const DESCRIPTOR_FLOW: u64 = 0x13;
pub const DESCRIPTOR_TRANSFER: u64 = 0x14;
pub const DESCRIPTOR_DISPOSITION: u64 = 0x15;
pub const DESCRIPTOR_DETACH: u64 = 0x16;
pub const DESCRIPTOR_END: u64 = 0x17;
pub const DESCRIPTOR_CLOSE: u64 = 0x18;

pub const DESCRIPTOR_SASL_MECHANISMS: u64 = 0x40;
pub const DESCRIPTOR_SASL_INIT: u64 = 0x41;
pub const DESCRIPTOR_SASL_CHALLENGE: u64 = 0x42;
pub const DESCRIPTOR_SASL_RESPONSE: u64 = 0x43;
pub const DESCRIPTOR_SASL_OUTCOME: u64 = 0x44;

/// Every performative this crate recognizes, tagged by its wire
/// descriptor. `FrameCodec` dispatches to this enum; an unrecognized
/// descriptor is `UnknownPerformative`, not a variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum Performative {
    Open(Open),
    Begin(Begin),
    Attach(Attach),
    Flow(Flow),
    Transfer(Transfer),
    Disposition(Disposition),
    Detach(Detach),
    End(End),
    Close(Close),
    SaslMechanisms(SaslMechanisms),
    SaslInit(SaslInit),
    SaslChallenge(SaslChallenge),
    SaslResponse(SaslResponse),
    SaslOutcome(SaslOutcome),
}

impl Performative {
    pub fn encode(&self) -> AmqpValue {
        match self {
            Performative::Open(p) => described(DESCRIPTOR_OPEN, p.to_value()),
            Performative::Begin(p) => described(DESCRIPTOR_BEGIN, p.to_value()),
            Performative::Attach(p) => described(DESCRIPTOR_ATTACH, p.to_value()),
            Performative::Flow(p) => described(DESCRIPTOR_FLOW, p.to_value()),
            Performative::Transfer(p) => described(DESCRIPTOR_TRANSFER, p.to_value()),
            Performative::Disposition(p) => described(DESCRIPTOR_DISPOSITION, p.to_value()),
            Performative::Detach(p) => described(DESCRIPTOR_DETACH, p.to_value()),
            Performative::End(p) => described(DESCRIPTOR_END, p.to_value()),
            Performative::Close(p) => described(DESCRIPTOR_CLOSE, p.to_value()),
            Performative::SaslMechanisms(p) => described(DESCRIPTOR_SASL_MECHANISMS, p.to_value()),
            Performative::SaslInit(p) => described(DESCRIPTOR_SASL_INIT, p.to_value()),
            Performative::SaslChallenge(p) => described(DESCRIPTOR_SASL_CHALLENGE, p.to_value()),
            Performative::SaslResponse(p) => described(DESCRIPTOR_SASL_RESPONSE, p.to_value()),
            Performative::SaslOutcome(p) => described(DESCRIPTOR_SASL_OUTCOME, p.to_value()),
        }
    }

    /// Dispatch on `value`'s descriptor. `UnknownPerformative` if the
    /// descriptor is not one of the ones listed above; the caller
    /// decides whether that should close the connection.
    pub fn decode(value: &AmqpValue) -> AmqpResult<Self> {
        let (descriptor, body) = value
            .as_described()
            .ok_or_else(|| AmqpError::malformed("performative frame body is not a described type"))?;
        let tag = match descriptor {
            AmqpValue::ULong(n) => *n,
            AmqpValue::UInt(n) => *n as u64,
            other => {
                return Err(AmqpError::malformed(format!(
                    "performative descriptor is not a ulong: {other:?}"
                )))
            }
        };
        let fields = body
            .as_list()
            .ok_or_else(|| AmqpError::malformed("performative body is not a list"))?;

        Ok(match tag {
            DESCRIPTOR_OPEN => Performative::Open(Open::from_fields(fields)?),
            DESCRIPTOR_BEGIN => Performative::Begin(Begin::from_fields(fields)?),
            DESCRIPTOR_ATTACH => Performative::Attach(Attach::from_fields(fields)?),
            DESCRIPTOR_FLOW => Performative::Flow(Flow::from_fields(fields)?),
            DESCRIPTOR_TRANSFER => Performative::Transfer(Transfer::from_fields(fields)?),
            DESCRIPTOR_DISPOSITION => Performative::Disposition(Disposition::from_fields(fields)?),
            DESCRIPTOR_DETACH => Performative::Detach(Detach::from_fields(fields)?),
            DESCRIPTOR_END => Performative::End(End::from_fields(fields)?),
            DESCRIPTOR_CLOSE => Performative::Close(Close::from_fields(fields)?),
            DESCRIPTOR_SASL_MECHANISMS => {
                Performative::SaslMechanisms(SaslMechanisms::from_fields(fields)?)
            }
            DESCRIPTOR_SASL_INIT => Performative::SaslInit(SaslInit::from_fields(fields)?),
            DESCRIPTOR_SASL_CHALLENGE => Performative::SaslChallenge(SaslChallenge::from_fields(fields)?),
            DESCRIPTOR_SASL_RESPONSE => Performative::SaslResponse(SaslResponse::from_fields(fields)?),
            DESCRIPTOR_SASL_OUTCOME => Performative::SaslOutcome(SaslOutcome::from_fields(fields)?),
            other => return Err(AmqpError::UnknownPerformative(other)),
        })
    }
}

fn described(descriptor: u64, value: AmqpValue) -> AmqpValue {
    AmqpValue::described(AmqpValue::ULong(descriptor), value)
}

fn list_of(fields: Vec<Option<AmqpValue>>) -> AmqpValue {
    let last_set = fields.iter().rposition(Option::is_some);
    match last_set {
        Some(i) => AmqpValue::List(
            fields[..=i]
                .iter()
                .map(|f| f.clone().unwrap_or(AmqpValue::Null))
                .collect(),
        ),
        None => AmqpValue::List(vec![]),
    }
}

fn field(fields: &[AmqpValue], i: usize) -> AmqpValue {
    fields.get(i).cloned().unwrap_or(AmqpValue::Null)
}

fn opt_str(value: &AmqpValue) -> Option<String> {
    match value {
        AmqpValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn opt_symbol(value: &AmqpValue) -> Option<AmqpSymbol> {
    match value {
        AmqpValue::Symbol(s) => Some(s.clone()),
        _ => None,
    }
}

fn opt_u16(value: &AmqpValue) -> Option<u16> {
    match value {
        AmqpValue::UShort(n) => Some(*n),
        AmqpValue::UInt(n) => u16::try_from(*n).ok(),
        _ => None,
    }
}

fn opt_u32(value: &AmqpValue) -> Option<u32> {
    match value {
        AmqpValue::UInt(n) => Some(*n),
        _ => None,
    }
}

fn opt_u64(value: &AmqpValue) -> Option<u64> {
    match value {
        AmqpValue::ULong(n) => Some(*n),
        _ => None,
    }
}

fn opt_bool(value: &AmqpValue) -> Option<bool> {
    match value {
        AmqpValue::Bool(b) => Some(*b),
        _ => None,
    }
}

fn opt_symbol_array(value: &AmqpValue) -> Option<Vec<AmqpSymbol>> {
    match value {
        AmqpValue::Array(items) | AmqpValue::List(items) => Some(
            items
                .iter()
                .filter_map(|v| match v {
                    AmqpValue::Symbol(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn symbol_array(symbols: &Option<Vec<AmqpSymbol>>) -> Option<AmqpValue> {
    symbols.as_ref().map(|list| {
        AmqpValue::Array(list.iter().cloned().map(AmqpValue::Symbol).collect())
    })
}

/// `open` (descriptor `0x10`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Open {
    pub container_id: String,
    pub hostname: Option<String>,
    pub max_frame_size: Option<u32>,
    pub channel_max: Option<u16>,
    pub idle_time_out: Option<u32>,
    pub outgoing_locales: Option<Vec<AmqpSymbol>>,
    pub incoming_locales: Option<Vec<AmqpSymbol>>,
    pub offered_capabilities: Option<Vec<AmqpSymbol>>,
    pub desired_capabilities: Option<Vec<AmqpSymbol>>,
    pub properties: Option<AmqpMap>,
}

impl Open {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::String(self.container_id.clone())),
            self.hostname.clone().map(AmqpValue::String),
            self.max_frame_size.map(AmqpValue::UInt),
            self.channel_max.map(AmqpValue::UShort),
            self.idle_time_out.map(AmqpValue::UInt),
            symbol_array(&self.outgoing_locales),
            symbol_array(&self.incoming_locales),
            symbol_array(&self.offered_capabilities),
            symbol_array(&self.desired_capabilities),
            self.properties.clone().map(AmqpValue::Map),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Open {
            container_id: opt_str(&field(fields, 0)).unwrap_or_default(),
            hostname: opt_str(&field(fields, 1)),
            max_frame_size: opt_u32(&field(fields, 2)),
            channel_max: opt_u16(&field(fields, 3)),
            idle_time_out: opt_u32(&field(fields, 4)),
            outgoing_locales: opt_symbol_array(&field(fields, 5)),
            incoming_locales: opt_symbol_array(&field(fields, 6)),
            offered_capabilities: opt_symbol_array(&field(fields, 7)),
            desired_capabilities: opt_symbol_array(&field(fields, 8)),
            properties: field(fields, 9).as_map().map(|m| m.to_vec()),
        })
    }
}

/// `begin` (descriptor `0x11`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Begin {
    pub remote_channel: Option<u16>,
    pub next_outgoing_id: u32,
    pub incoming_window: u32,
    pub outgoing_window: u32,
    pub handle_max: Option<u32>,
    pub offered_capabilities: Option<Vec<AmqpSymbol>>,
    pub desired_capabilities: Option<Vec<AmqpSymbol>>,
    pub properties: Option<AmqpMap>,
}

impl Begin {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            self.remote_channel.map(AmqpValue::UShort),
            Some(AmqpValue::UInt(self.next_outgoing_id)),
            Some(AmqpValue::UInt(self.incoming_window)),
            Some(AmqpValue::UInt(self.outgoing_window)),
            self.handle_max.map(AmqpValue::UInt),
            symbol_array(&self.offered_capabilities),
            symbol_array(&self.desired_capabilities),
            self.properties.clone().map(AmqpValue::Map),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Begin {
            remote_channel: opt_u16(&field(fields, 0)),
            next_outgoing_id: opt_u32(&field(fields, 1)).unwrap_or(0),
            incoming_window: opt_u32(&field(fields, 2)).unwrap_or(0),
            outgoing_window: opt_u32(&field(fields, 3)).unwrap_or(0),
            handle_max: opt_u32(&field(fields, 4)),
            offered_capabilities: opt_symbol_array(&field(fields, 5)),
            desired_capabilities: opt_symbol_array(&field(fields, 6)),
            properties: field(fields, 7).as_map().map(|m| m.to_vec()),
        })
    }
}

/// `attach` (descriptor `0x12`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attach {
    pub name: String,
    pub handle: u32,
    pub role: bool,
    pub snd_settle_mode: Option<u8>,
    pub rcv_settle_mode: Option<u8>,
    pub source: Option<AmqpValue>,
    pub target: Option<AmqpValue>,
    pub unsettled: Option<AmqpMap>,
    pub incomplete_unsettled: Option<bool>,
    pub initial_delivery_count: Option<u32>,
    pub max_message_size: Option<u64>,
    pub offered_capabilities: Option<Vec<AmqpSymbol>>,
    pub desired_capabilities: Option<Vec<AmqpSymbol>>,
    pub properties: Option<AmqpMap>,
}

impl Attach {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::String(self.name.clone())),
            Some(AmqpValue::UInt(self.handle)),
            Some(AmqpValue::Bool(self.role)),
            self.snd_settle_mode.map(AmqpValue::UByte),
            self.rcv_settle_mode.map(AmqpValue::UByte),
            self.source.clone(),
            self.target.clone(),
            self.unsettled.clone().map(AmqpValue::Map),
            self.incomplete_unsettled.map(AmqpValue::Bool),
            self.initial_delivery_count.map(AmqpValue::UInt),
            self.max_message_size.map(AmqpValue::ULong),
            symbol_array(&self.offered_capabilities),
            symbol_array(&self.desired_capabilities),
            self.properties.clone().map(AmqpValue::Map),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Attach {
            name: opt_str(&field(fields, 0)).unwrap_or_default(),
            handle: opt_u32(&field(fields, 1)).unwrap_or(0),
            role: opt_bool(&field(fields, 2)).unwrap_or(false),
            snd_settle_mode: match field(fields, 3) {
                AmqpValue::UByte(n) => Some(n),
                _ => None,
            },
            rcv_settle_mode: match field(fields, 4) {
                AmqpValue::UByte(n) => Some(n),
                _ => None,
            },
            source: as_non_null(&field(fields, 5)),
            target: as_non_null(&field(fields, 6)),
            unsettled: field(fields, 7).as_map().map(|m| m.to_vec()),
            incomplete_unsettled: opt_bool(&field(fields, 8)),
            initial_delivery_count: opt_u32(&field(fields, 9)),
            max_message_size: opt_u64(&field(fields, 10)),
            offered_capabilities: opt_symbol_array(&field(fields, 11)),
            desired_capabilities: opt_symbol_array(&field(fields, 12)),
            properties: field(fields, 13).as_map().map(|m| m.to_vec()),
        })
    }
}

/// `flow` (descriptor `0x13`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flow {
    pub next_incoming_id: Option<u32>,
    pub incoming_window: u32,
    pub next_outgoing_id: u32,
    pub outgoing_window: u32,
    pub handle: Option<u32>,
    pub delivery_count: Option<u32>,
    pub link_credit: Option<u32>,
    pub available: Option<u32>,
    pub drain: Option<bool>,
    pub echo: Option<bool>,
    pub properties: Option<AmqpMap>,
}

impl Flow {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            self.next_incoming_id.map(AmqpValue::UInt),
            Some(AmqpValue::UInt(self.incoming_window)),
            Some(AmqpValue::UInt(self.next_outgoing_id)),
            Some(AmqpValue::UInt(self.outgoing_window)),
            self.handle.map(AmqpValue::UInt),
            self.delivery_count.map(AmqpValue::UInt),
            self.link_credit.map(AmqpValue::UInt),
            self.available.map(AmqpValue::UInt),
            self.drain.map(AmqpValue::Bool),
            self.echo.map(AmqpValue::Bool),
            self.properties.clone().map(AmqpValue::Map),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Flow {
            next_incoming_id: opt_u32(&field(fields, 0)),
            incoming_window: opt_u32(&field(fields, 1)).unwrap_or(0),
            next_outgoing_id: opt_u32(&field(fields, 2)).unwrap_or(0),
            outgoing_window: opt_u32(&field(fields, 3)).unwrap_or(0),
            handle: opt_u32(&field(fields, 4)),
            delivery_count: opt_u32(&field(fields, 5)),
            link_credit: opt_u32(&field(fields, 6)),
            available: opt_u32(&field(fields, 7)),
            drain: opt_bool(&field(fields, 8)),
            echo: opt_bool(&field(fields, 9)),
            properties: field(fields, 10).as_map().map(|m| m.to_vec()),
        })
    }
}

/// `transfer` (descriptor `0x14`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transfer {
    pub handle: u32,
    pub delivery_id: Option<u32>,
    pub delivery_tag: Option<Vec<u8>>,
    pub message_format: Option<u32>,
    pub settled: Option<bool>,
    pub more: Option<bool>,
    pub rcv_settle_mode: Option<u8>,
    pub state: Option<AmqpValue>,
    pub resume: Option<bool>,
    pub aborted: Option<bool>,
    pub batchable: Option<bool>,
}

impl Transfer {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::UInt(self.handle)),
            self.delivery_id.map(AmqpValue::UInt),
            self.delivery_tag.clone().map(AmqpValue::Binary),
            self.message_format.map(AmqpValue::UInt),
            self.settled.map(AmqpValue::Bool),
            self.more.map(AmqpValue::Bool),
            self.rcv_settle_mode.map(AmqpValue::UByte),
            self.state.clone(),
            self.resume.map(AmqpValue::Bool),
            self.aborted.map(AmqpValue::Bool),
            self.batchable.map(AmqpValue::Bool),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Transfer {
            handle: opt_u32(&field(fields, 0)).unwrap_or(0),
            delivery_id: opt_u32(&field(fields, 1)),
            delivery_tag: field(fields, 2).as_binary().map(|b| b.to_vec()),
            message_format: opt_u32(&field(fields, 3)),
            settled: opt_bool(&field(fields, 4)),
            more: opt_bool(&field(fields, 5)),
            rcv_settle_mode: match field(fields, 6) {
                AmqpValue::UByte(n) => Some(n),
                _ => None,
            },
            state: as_non_null(&field(fields, 7)),
            resume: opt_bool(&field(fields, 8)),
            aborted: opt_bool(&field(fields, 9)),
            batchable: opt_bool(&field(fields, 10)),
        })
    }
}

/// `disposition` (descriptor `0x15`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Disposition {
    pub role: bool,
    pub first: u32,
    pub last: Option<u32>,
    pub settled: Option<bool>,
    pub state: Option<AmqpValue>,
    pub batchable: Option<bool>,
}

impl Disposition {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::Bool(self.role)),
            Some(AmqpValue::UInt(self.first)),
            self.last.map(AmqpValue::UInt),
            self.settled.map(AmqpValue::Bool),
            self.state.clone(),
            self.batchable.map(AmqpValue::Bool),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Disposition {
            role: opt_bool(&field(fields, 0)).unwrap_or(false),
            first: opt_u32(&field(fields, 1)).unwrap_or(0),
            last: opt_u32(&field(fields, 2)),
            settled: opt_bool(&field(fields, 3)),
            state: as_non_null(&field(fields, 4)),
            batchable: opt_bool(&field(fields, 5)),
        })
    }
}

/// `detach` (descriptor `0x16`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detach {
    pub handle: u32,
    pub closed: Option<bool>,
    pub error: Option<AmqpErrorInfo>,
}

impl Detach {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::UInt(self.handle)),
            self.closed.map(AmqpValue::Bool),
            self.error.as_ref().map(AmqpErrorInfo::to_value),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Detach {
            handle: opt_u32(&field(fields, 0)).unwrap_or(0),
            closed: opt_bool(&field(fields, 1)),
            error: AmqpErrorInfo::from_value(&field(fields, 2)),
        })
    }
}

/// `end` (descriptor `0x17`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct End {
    pub error: Option<AmqpErrorInfo>,
}

impl End {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![self.error.as_ref().map(AmqpErrorInfo::to_value)])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(End {
            error: AmqpErrorInfo::from_value(&field(fields, 0)),
        })
    }
}

/// `close` (descriptor `0x18`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Close {
    pub error: Option<AmqpErrorInfo>,
}

impl Close {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![self.error.as_ref().map(AmqpErrorInfo::to_value)])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(Close {
            error: AmqpErrorInfo::from_value(&field(fields, 0)),
        })
    }
}

/// `amqp-error` (descriptor `0x1d`), embedded in `detach`/`end`/`close`.
#[derive(Debug, Clone, PartialEq)]
pub struct AmqpErrorInfo {
    pub condition: AmqpSymbol,
    pub description: Option<String>,
    pub info: Option<AmqpMap>,
}

const DESCRIPTOR_ERROR: u64 = 0x1d;

impl AmqpErrorInfo {
    fn to_value(&self) -> AmqpValue {
        described(
            DESCRIPTOR_ERROR,
            list_of(vec![
                Some(AmqpValue::Symbol(self.condition.clone())),
                self.description.clone().map(AmqpValue::String),
                self.info.clone().map(AmqpValue::Map),
            ]),
        )
    }

    fn from_value(value: &AmqpValue) -> Option<Self> {
        let (_, body) = value.as_described()?;
        let fields = body.as_list()?;
        Some(AmqpErrorInfo {
            condition: opt_symbol(&field(fields, 0))?,
            description: opt_str(&field(fields, 1)),
            info: field(fields, 2).as_map().map(|m| m.to_vec()),
        })
    }
}

fn as_non_null(value: &AmqpValue) -> Option<AmqpValue> {
    match value {
        AmqpValue::Null => None,
        other => Some(other.clone()),
    }
}

/// `sasl-mechanisms` (descriptor `0x40`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaslMechanisms {
    pub sasl_server_mechanisms: Vec<AmqpSymbol>,
}

impl SaslMechanisms {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![Some(AmqpValue::Array(
            self.sasl_server_mechanisms
                .iter()
                .cloned()
                .map(AmqpValue::Symbol)
                .collect(),
        ))])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(SaslMechanisms {
            sasl_server_mechanisms: opt_symbol_array(&field(fields, 0)).unwrap_or_default(),
        })
    }
}

/// `sasl-init` (descriptor `0x41`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaslInit {
    pub mechanism: AmqpSymbol,
    pub initial_response: Option<Vec<u8>>,
    pub hostname: Option<String>,
}

impl SaslInit {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::Symbol(self.mechanism.clone())),
            self.initial_response.clone().map(AmqpValue::Binary),
            self.hostname.clone().map(AmqpValue::String),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(SaslInit {
            mechanism: opt_symbol(&field(fields, 0)).unwrap_or_else(|| AmqpSymbol::from("")),
            initial_response: field(fields, 1).as_binary().map(|b| b.to_vec()),
            hostname: opt_str(&field(fields, 2)),
        })
    }
}

/// `sasl-challenge` (descriptor `0x42`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaslChallenge {
    pub challenge: Vec<u8>,
}

impl SaslChallenge {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![Some(AmqpValue::Binary(self.challenge.clone()))])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(SaslChallenge {
            challenge: field(fields, 0).as_binary().map(|b| b.to_vec()).unwrap_or_default(),
        })
    }
}

/// `sasl-response` (descriptor `0x43`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaslResponse {
    pub response: Vec<u8>,
}

impl SaslResponse {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![Some(AmqpValue::Binary(self.response.clone()))])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(SaslResponse {
            response: field(fields, 0).as_binary().map(|b| b.to_vec()).unwrap_or_default(),
        })
    }
}

/// `sasl-outcome` (descriptor `0x44`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaslOutcome {
    pub code: u8,
    pub additional_data: Option<Vec<u8>>,
}

impl SaslOutcome {
    fn to_value(&self) -> AmqpValue {
        list_of(vec![
            Some(AmqpValue::UByte(self.code)),
            self.additional_data.clone().map(AmqpValue::Binary),
        ])
    }

    fn from_fields(fields: &[AmqpValue]) -> AmqpResult<Self> {
        Ok(SaslOutcome {
            code: match field(fields, 0) {
                AmqpValue::UByte(n) => n,
                _ => 0,
            },
            additional_data: field(fields, 1).as_binary().map(|b| b.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trips() {
        let open = Open {
            container_id: "my-app".to_string(),
            hostname: Some("broker.example.com".to_string()),
            max_frame_size: Some(65536),
            channel_max: Some(1000),
            ..Default::default()
        };
        let performative = Performative::Open(open.clone());
        let decoded = Performative::decode(&performative.encode()).unwrap();
        assert_eq!(decoded, Performative::Open(open));
    }

    #[test]
    fn close_with_error_round_trips() {
        let close = Close {
            error: Some(AmqpErrorInfo {
                condition: AmqpSymbol::from("amqp:internal-error"),
                description: Some("boom".to_string()),
                info: None,
            }),
        };
        let performative = Performative::Close(close.clone());
        let decoded = Performative::decode(&performative.encode()).unwrap();
        assert_eq!(decoded, Performative::Close(close));
    }

    #[test]
    fn unknown_descriptor_is_unknown_performative() {
        let bogus = AmqpValue::described(AmqpValue::ULong(0x99), AmqpValue::List(vec![]));
        let err = Performative::decode(&bogus).unwrap_err();
        assert!(matches!(err, AmqpError::UnknownPerformative(0x99)));
    }

    #[test]
    fn sasl_init_round_trips() {
        let init = SaslInit {
            mechanism: AmqpSymbol::from("PLAIN"),
            initial_response: Some(vec![0, 1, 2]),
            hostname: None,
        };
        let performative = Performative::SaslInit(init.clone());
        let decoded = Performative::decode(&performative.encode()).unwrap();
        assert_eq!(decoded, Performative::SaslInit(init));
    }
}
