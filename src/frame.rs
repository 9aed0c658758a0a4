//! AMQP 1.0 Frame Codec
//!
//! Frames around protocol headers and performative bodies: the 8-byte
//! frame header (`size`, `doff`, `type`, `channel`), the extended-header
//! region `doff` points past, and the one-time protocol-negotiation
//! header exchanged before any framed traffic starts.

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{Decoder, Encoder};
use crate::error::{AmqpError, AmqpResult};
use crate::performative::Performative;
use crate::types::AmqpValue;

/// `type` field of a frame header: AMQP performatives vs. SASL frames.
pub const FRAME_TYPE_AMQP: u8 = 0x00;
pub const FRAME_TYPE_SASL: u8 = 0x01;

pub const AMQP_PROTOCOL_HEADER: &[u8; 8] = b"AMQP\x00\x01\x00\x00";
pub const TLS_PROTOCOL_HEADER: &[u8; 8] = b"AMQP\x02\x01\x00\x00";
pub const SASL_PROTOCOL_HEADER: &[u8; 8] = b"AMQP\x03\x01\x00\x00";

/// Minimum legal `doff`: the 8-byte fixed header occupies the first
/// 4-byte word pair, so `doff` must be at least 2 (per spec open
/// question, resolved as: reject anything less as malformed rather
/// than silently treating it as zero extended-header bytes).
const MIN_DATA_OFFSET: u8 = 2;

/// A decoded AMQP frame: header fields plus an undecoded body. The
/// caller decides whether the body holds a performative, a SASL frame,
/// or (for empty frames, used as heartbeats) nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub frame_type: u8,
    pub channel: u16,
    /// Bytes between the fixed header and `size`, preserved verbatim
    /// since this crate does not interpret extended-header content.
    pub extended_header: Vec<u8>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(frame_type: u8, channel: u16, body: Vec<u8>) -> Self {
        Frame {
            frame_type,
            channel,
            extended_header: Vec::new(),
            body,
        }
    }

    pub fn empty(channel: u16) -> Self {
        Frame::new(FRAME_TYPE_AMQP, channel, Vec::new())
    }

    /// Encode a performative as a complete `FRAME_TYPE_AMQP` frame.
    pub fn for_performative(channel: u16, performative: &Performative) -> AmqpResult<Self> {
        let mut encoder = Encoder::new();
        encoder.encode_value(&performative.encode())?;
        Ok(Frame::new(FRAME_TYPE_AMQP, channel, encoder.finish()))
    }

    pub fn performative(&self) -> AmqpResult<Option<Performative>> {
        if self.body.is_empty() {
            return Ok(None);
        }
        let mut decoder = Decoder::new(self.body.clone());
        let value: AmqpValue = decoder.decode_value()?;
        Performative::decode(&value).map(Some)
    }

    /// Serialize the full frame, including the 8-byte fixed header and
    /// `size` field, ready to write to a transport.
    pub fn encode(&self) -> Vec<u8> {
        let doff = MIN_DATA_OFFSET + (self.extended_header.len() as u8).div_ceil(4);
        let header_bytes = (doff as usize) * 4;
        let size = header_bytes + self.body.len();

        let mut buf = BytesMut::with_capacity(size);
        buf.put_u32(size as u32);
        buf.put_u8(doff);
        buf.put_u8(self.frame_type);
        buf.put_u16(self.channel);
        buf.put_slice(&self.extended_header);
        let padding = header_bytes - 8 - self.extended_header.len();
        buf.put_bytes(0, padding);
        buf.put_slice(&self.body);
        buf.to_vec()
    }

    /// Decode a single frame from `data`, which must hold at least
    /// `size` bytes (the caller is expected to have already read the
    /// 4-byte size prefix to know how much to buffer; see
    /// `decode_with_size_prefix` for the common case of decoding
    /// straight off a byte stream).
    pub fn decode(data: &[u8]) -> AmqpResult<Self> {
        if data.len() < 8 {
            return Err(AmqpError::malformed("frame shorter than the fixed 8-byte header"));
        }
        let mut buf = data;
        let size = buf.get_u32() as usize;
        let doff = buf.get_u8();
        let frame_type = buf.get_u8();
        let channel = buf.get_u16();

        if (doff as usize) < MIN_DATA_OFFSET as usize {
            return Err(AmqpError::malformed(format!(
                "data offset {doff} is smaller than the minimum of {MIN_DATA_OFFSET}"
            )));
        }
        if size != data.len() {
            return Err(AmqpError::malformed(format!(
                "frame declared size {size} does not match the {} bytes supplied",
                data.len()
            )));
        }

        let header_bytes = (doff as usize) * 4;
        if header_bytes > size {
            return Err(AmqpError::malformed(format!(
                "data offset {doff} implies a {header_bytes}-byte header larger than the {size}-byte frame"
            )));
        }
        let extended_header = data[8..header_bytes].to_vec();
        let body = data[header_bytes..size].to_vec();

        Ok(Frame {
            frame_type,
            channel,
            extended_header,
            body,
        })
    }
}

/// One of the three fixed 8-byte protocol negotiation headers exchanged
/// before any framed traffic, or an AMQP frame. These headers are not
/// length-prefixed, so a reader must special-case the `AMQP` magic
/// before falling back to frame decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolId {
    Amqp,
    Tls,
    Sasl,
}

impl ProtocolId {
    pub fn header_bytes(self) -> &'static [u8; 8] {
        match self {
            ProtocolId::Amqp => AMQP_PROTOCOL_HEADER,
            ProtocolId::Tls => TLS_PROTOCOL_HEADER,
            ProtocolId::Sasl => SASL_PROTOCOL_HEADER,
        }
    }

    /// Parse exactly 8 bytes of protocol header. `ProtocolMismatch` for
    /// anything that isn't one of the three AMQP-family headers this
    /// crate negotiates.
    pub fn parse(bytes: &[u8]) -> AmqpResult<Self> {
        if bytes.len() != 8 || &bytes[0..4] != b"AMQP" {
            return Err(AmqpError::ProtocolMismatch(format!(
                "not an AMQP protocol header: {bytes:02x?}"
            )));
        }
        match bytes[4] {
            0 => Ok(ProtocolId::Amqp),
            2 => Ok(ProtocolId::Tls),
            3 => Ok(ProtocolId::Sasl),
            other => Err(AmqpError::ProtocolMismatch(format!(
                "unrecognized protocol id byte: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performative::Open;

    #[test]
    fn empty_frame_round_trips() {
        let frame = Frame::empty(0);
        let bytes = frame.encode();
        assert_eq!(bytes, vec![0, 0, 0, 8, 2, 0, 0, 0]);
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn doff_below_minimum_is_malformed() {
        let bytes: Vec<u8> = vec![0, 0, 0, 9, 1, 0, 0, 0, 0xff];
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn size_mismatch_is_malformed() {
        let bytes: Vec<u8> = vec![0, 0, 0, 100, 2, 0, 0, 0];
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, AmqpError::MalformedFrame(_)));
    }

    #[test]
    fn performative_frame_round_trips() {
        let open = Performative::Open(Open {
            container_id: "client".to_string(),
            ..Default::default()
        });
        let frame = Frame::for_performative(0, &open).unwrap();
        let bytes = frame.encode();
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.performative().unwrap(), Some(open));
    }

    #[test]
    fn protocol_header_bytes_match_spec() {
        assert_eq!(ProtocolId::Amqp.header_bytes(), b"AMQP\x00\x01\x00\x00");
        assert_eq!(ProtocolId::Tls.header_bytes(), b"AMQP\x02\x01\x00\x00");
        assert_eq!(ProtocolId::Sasl.header_bytes(), b"AMQP\x03\x01\x00\x00");
        assert_eq!(ProtocolId::parse(AMQP_PROTOCOL_HEADER).unwrap(), ProtocolId::Amqp);
    }

    #[test]
    fn non_amqp_header_is_protocol_mismatch() {
        let err = ProtocolId::parse(b"HTTP/1.0").unwrap_err();
        assert!(matches!(err, AmqpError::ProtocolMismatch(_)));
    }
}
