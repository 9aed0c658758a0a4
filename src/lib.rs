//! AMQP 1.0 value model, binary codec, message model, and blocking
//! transport.
//!
//! This crate implements the AMQP 1.0 binary encoding bit-for-bit
//! (`codec`), the message section model built on top of it
//! (`message`), the connection/session/link control performatives and
//! their framing (`performative`, `frame`), and a blocking TCP/TLS
//! transport that speaks the framed wire protocol (`transport`). It
//! does not implement connection/session/link *state machines* — no
//! flow control, no automatic SASL negotiation loop, no link credit
//! tracking. Callers compose the performatives and frames themselves.
//!
//! # Quick start
//!
//! ```rust
//! use amqp10_core::prelude::*;
//!
//! let message = Message::text("Hello, AMQP!").with_subject("greeting");
//! let encoded = message.encode().unwrap();
//! let decoded = Message::decode(&encoded).unwrap();
//! assert_eq!(message, decoded);
//! ```
//!
//! # Core Concepts
//!
//! ## Values
//!
//! ```rust
//! use amqp10_core::types::AmqpValue;
//!
//! let values = vec![
//!     AmqpValue::String("Hello".to_string()),
//!     AmqpValue::Int(42),
//!     AmqpValue::Bool(true),
//!     AmqpValue::Double(3.14159),
//!     AmqpValue::Uuid(uuid::Uuid::new_v4()),
//!     AmqpValue::Binary(vec![1, 2, 3, 4]),
//! ];
//! assert_eq!(values.len(), 6);
//! ```
//!
//! ## Encoding/decoding
//!
//! ```rust
//! use amqp10_core::codec::{Encoder, Decoder};
//! use amqp10_core::types::AmqpValue;
//!
//! let value = AmqpValue::String("Hello, AMQP!".to_string());
//!
//! let mut encoder = Encoder::new();
//! encoder.encode_value(&value).unwrap();
//! let encoded = encoder.finish();
//!
//! let mut decoder = Decoder::new(encoded);
//! let decoded = decoder.decode_value().unwrap();
//! assert_eq!(value, decoded);
//! ```
//!
//! ## Performatives and frames
//!
//! ```rust
//! use amqp10_core::performative::{Open, Performative};
//! use amqp10_core::frame::Frame;
//!
//! let open = Performative::Open(Open {
//!     container_id: "my-app".to_string(),
//!     ..Default::default()
//! });
//! let frame = Frame::for_performative(0, &open).unwrap();
//! let bytes = frame.encode();
//! let decoded = Frame::decode(&bytes).unwrap();
//! assert_eq!(decoded.performative().unwrap(), Some(open));
//! ```
//!
//! # Architecture
//!
//! - **`types`**: the `AmqpValue` value model and its collection ops.
//! - **`codec`**: binary encoding and decoding.
//! - **`message`**: message sections, properties, header, batch format.
//! - **`performative`**: typed connection/session/link/SASL frame bodies.
//! - **`frame`**: frame header, protocol negotiation headers.
//! - **`transport`**: blocking TCP/TLS transport and framed I/O.
//! - **`error`**: the error taxonomy shared across all of the above.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod performative;
pub mod transport;
pub mod types;

pub use codec::{Decoder, Encoder};
pub use error::{AmqpError, AmqpResult};
pub use frame::{Frame, ProtocolId};
pub use message::{BatchMessage, Body, Header, Message, MessageBuilder, Properties};
pub use performative::Performative;
pub use transport::{SocketSettings, TlsOptions, Transport, TransportOptions};
pub use types::{AmqpList, AmqpMap, AmqpSymbol, AmqpValue, ReceiverSettleMode, SenderSettleMode};

/// Re-export of the crate's most commonly used items.
pub mod prelude {
    pub use crate::{
        AmqpError, AmqpList, AmqpMap, AmqpResult, AmqpSymbol, AmqpValue, BatchMessage, Body,
        Decoder, Encoder, Frame, Header, Message, MessageBuilder, Performative, Properties,
        ProtocolId, ReceiverSettleMode, SenderSettleMode, SocketSettings, TlsOptions, Transport,
        TransportOptions,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amqp_value_variants_construct() {
        let values = [
            AmqpValue::String("test".to_string()),
            AmqpValue::Int(42),
            AmqpValue::Bool(true),
            AmqpValue::Double(3.14),
            AmqpValue::Uuid(uuid::Uuid::new_v4()),
        ];
        assert!(matches!(values[0], AmqpValue::String(_)));
        assert!(matches!(values[1], AmqpValue::Int(_)));
        assert!(matches!(values[2], AmqpValue::Bool(_)));
        assert!(matches!(values[3], AmqpValue::Double(_)));
        assert!(matches!(values[4], AmqpValue::Uuid(_)));
    }

    #[test]
    fn amqp_symbol_from_str() {
        let symbol = AmqpSymbol::from("test-symbol");
        assert_eq!(symbol.as_str(), "test-symbol");
    }

    #[test]
    fn message_round_trips_through_the_wire_format() {
        let message = Message::text("Hello, World!");
        assert_eq!(message.body_as_text(), Some("Hello, World!"));
        let encoded = message.encode().unwrap();
        assert_eq!(Message::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn message_with_properties_builder_chain() {
        let message = Message::builder()
            .build()
            .with_message_id("test-msg-001")
            .with_subject("Test Subject");

        assert_eq!(message.message_id_as_string(), Some("test-msg-001".to_string()));
        assert_eq!(
            message.properties.as_ref().and_then(|p| p.subject.as_ref()),
            Some(&"Test Subject".to_string())
        );
    }

    #[test]
    fn frame_for_performative_round_trips() {
        use performative::{Open, Performative};

        let open = Performative::Open(Open {
            container_id: "test-container".to_string(),
            ..Default::default()
        });
        let frame = Frame::for_performative(0, &open).unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.performative().unwrap(), Some(open));
    }
}
