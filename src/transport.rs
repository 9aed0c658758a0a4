//! AMQP 1.0 Blocking Transport
//!
//! A blocking, synchronous transport over `std::net::TcpStream`, with
//! optional TLS via `native-tls` and socket tuning via `socket2`. This
//! module owns connection establishment, protocol-header negotiation,
//! and framed read/write; it does not interpret performative semantics
//! (that's `performative`/`frame`).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace, warn};
use native_tls::{TlsConnector, TlsStream};
use socket2::{SockRef, TcpKeepalive};

use crate::error::{AmqpError, AmqpResult};
use crate::frame::{Frame, ProtocolId, FRAME_TYPE_AMQP, FRAME_TYPE_SASL};

/// TCP-level socket tuning. Three layers apply in increasing priority:
/// library defaults (`SocketSettings::default`), an application-supplied
/// override (`TransportOptions::socket`), and any value the OS itself
/// clamps a setting to (silently accepted; this crate doesn't re-read
/// the value back to verify it stuck).
#[derive(Debug, Clone, Copy)]
pub struct SocketSettings {
    pub nodelay: bool,
    pub keepalive_idle: Option<Duration>,
    pub keepalive_interval: Option<Duration>,
    pub keepalive_retries: Option<u32>,
    pub user_timeout: Option<Duration>,
}

impl Default for SocketSettings {
    fn default() -> Self {
        SocketSettings {
            nodelay: true,
            keepalive_idle: Some(Duration::from_secs(60)),
            keepalive_interval: Some(Duration::from_secs(10)),
            keepalive_retries: Some(6),
            user_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// TLS configuration for `amqps`/SASL-over-TLS connections.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Extra CA certificates (PEM) to trust in addition to the system
    /// trust store. An empty list means "system trust store only".
    pub extra_root_certificates: Vec<Vec<u8>>,
    /// Overrides the hostname used for SNI and certificate verification;
    /// defaults to the connection's `hostname`.
    pub server_name: Option<String>,
    pub danger_accept_invalid_certs: bool,
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub hostname: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub socket: SocketSettings,
    pub tls: Option<TlsOptions>,
}

impl TransportOptions {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        TransportOptions {
            hostname: hostname.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(60)),
            write_timeout: Some(Duration::from_secs(60)),
            socket: SocketSettings::default(),
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    fn tcp(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            Stream::Tls(s) => s.get_ref(),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// A connected, negotiated AMQP 1.0 transport. Owns one TCP (or TLS)
/// stream and a retained read buffer, since a partial frame read (e.g.
/// interrupted by a timeout) must not be discarded: the next `read_frame`
/// call picks up where the last one left off.
pub struct Transport {
    stream: Stream,
    read_buffer: Vec<u8>,
    closed: bool,
}

impl Transport {
    /// Resolve `options.hostname`/`port`, connect, negotiate TLS if
    /// configured, and exchange the AMQP protocol header. Resolution
    /// order is IPv4 addresses before IPv6 — most brokers still answer
    /// IPv4 first, and preferring it avoids a slow fallback on networks
    /// where IPv6 is present but unreachable.
    pub fn connect(options: &TransportOptions) -> AmqpResult<Self> {
        let stream = connect_tcp(options)?;
        tune_socket(&stream, &options.socket)?;
        // Set before the TLS handshake (if any) so a hung handshake is
        // bounded by the same timeout as ordinary reads/writes, and so
        // the TLS stream inherits timed-out reads/writes once wrapped.
        stream.set_read_timeout(options.read_timeout)?;
        stream.set_write_timeout(options.write_timeout)?;

        let mut transport = if let Some(tls) = &options.tls {
            let server_name = tls.server_name.as_deref().unwrap_or(&options.hostname);
            debug!("negotiating TLS with {server_name}");
            let tls_stream = wrap_tls(stream, tls, server_name)?;
            Transport {
                stream: Stream::Tls(Box::new(tls_stream)),
                read_buffer: Vec::new(),
                closed: false,
            }
        } else {
            Transport {
                stream: Stream::Plain(stream),
                read_buffer: Vec::new(),
                closed: false,
            }
        };

        transport.negotiate(ProtocolId::Amqp)?;
        Ok(transport)
    }

    /// Send this transport's protocol header and read back the peer's.
    /// `ProtocolMismatch` if the peer doesn't echo the same protocol id.
    pub fn negotiate(&mut self, proto: ProtocolId) -> AmqpResult<()> {
        self.stream.write_all(proto.header_bytes())?;
        self.stream.flush()?;

        self.fill_buffer(8)?;
        let peer_header: Vec<u8> = self.read_buffer.drain(..8).collect();
        let peer_proto = ProtocolId::parse(&peer_header)?;
        if peer_proto != proto {
            return Err(AmqpError::ProtocolMismatch(format!(
                "requested {proto:?}, peer responded with {peer_proto:?}"
            )));
        }
        Ok(())
    }

    /// Write one frame, fully framed (size, doff, type, channel, body).
    pub fn write_frame(&mut self, frame: &Frame) -> AmqpResult<()> {
        if self.closed {
            return Err(AmqpError::ConnectionClosed);
        }
        let bytes = frame.encode();
        trace!("writing frame: {} bytes on channel {}", bytes.len(), frame.channel);
        self.write_all_checked(&bytes)
    }

    /// Read one complete frame. Blocks until `size` bytes are available
    /// or the configured read timeout elapses (`Timeout`, not
    /// `ConnectionClosed` — the connection stays usable and the next
    /// call resumes from the partial data already buffered).
    ///
    /// Retention happens at frame granularity: bytes pulled off the wire
    /// are appended to `read_buffer` and never removed from it until a
    /// full frame (including the 4-byte size prefix) is available. A
    /// timeout partway through the payload therefore doesn't lose the
    /// size prefix that was already parsed — the next call re-reads it
    /// from the same accumulation instead of treating leftover payload
    /// bytes as a fresh size prefix.
    pub fn read_frame(&mut self) -> AmqpResult<Frame> {
        if self.closed {
            return Err(AmqpError::ConnectionClosed);
        }
        self.fill_buffer(4)?;
        let size = u32::from_be_bytes(self.read_buffer[..4].try_into().unwrap()) as usize;
        if size < 8 {
            return Err(AmqpError::malformed(format!(
                "frame declared size {size} is smaller than the 8-byte fixed header"
            )));
        }

        self.fill_buffer(size)?;
        let full: Vec<u8> = self.read_buffer.drain(..size).collect();
        Frame::decode(&full)
    }

    /// Read a frame and assert its `frame_type`. `UnexpectedFrame` if it
    /// doesn't match, e.g. an AMQP performative arriving mid SASL
    /// handshake.
    pub fn read_frame_of_type(&mut self, expected: u8) -> AmqpResult<Frame> {
        let frame = self.read_frame()?;
        if frame.frame_type != expected {
            return Err(AmqpError::UnexpectedFrame {
                expected: Some(expected),
                actual: frame.frame_type,
            });
        }
        Ok(frame)
    }

    pub fn write_amqp_frame(&mut self, channel: u16, body: Vec<u8>) -> AmqpResult<()> {
        self.write_frame(&Frame::new(FRAME_TYPE_AMQP, channel, body))
    }

    pub fn write_sasl_frame(&mut self, body: Vec<u8>) -> AmqpResult<()> {
        self.write_frame(&Frame::new(FRAME_TYPE_SASL, 0, body))
    }

    /// Idempotent: closing an already-closed transport is a no-op, not
    /// an error, since both halves of a clean shutdown and a failed
    /// read can each observe and try to close the same transport.
    pub fn close(&mut self) -> AmqpResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.tcp().shutdown(std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(AmqpError::Io(e)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn peer_addr(&self) -> AmqpResult<SocketAddr> {
        Ok(self.stream.tcp().peer_addr()?)
    }

    /// Ensure `read_buffer` holds at least `min_len` bytes, reading more
    /// off the wire as needed. Bytes are only ever appended here, never
    /// consumed — callers drain `read_buffer` themselves once enough is
    /// available. A timeout mid-fill leaves everything read so far in
    /// `read_buffer`, so the next call resumes the same accumulation
    /// instead of losing already-read bytes or misreading them as the
    /// start of a new logical read.
    fn fill_buffer(&mut self, min_len: usize) -> AmqpResult<()> {
        let mut chunk = [0u8; 4096];
        while self.read_buffer.len() < min_len {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Err(AmqpError::ConnectionClosed);
                }
                Ok(n) => self.read_buffer.extend_from_slice(&chunk[..n]),
                Err(e) if is_timeout_like(&e) => {
                    return Err(AmqpError::timeout("read timed out"));
                }
                Err(e) => {
                    self.closed = true;
                    return Err(AmqpError::Io(e));
                }
            }
        }
        Ok(())
    }

    fn write_all_checked(&mut self, bytes: &[u8]) -> AmqpResult<()> {
        match self.stream.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) if is_timeout_like(&e) => Err(AmqpError::timeout("write timed out")),
            Err(e) => {
                self.closed = true;
                Err(AmqpError::Io(e))
            }
        }
    }
}

/// `WouldBlock`/`TimedOut` mean a blocking read/write exceeded its
/// configured timeout. Some TLS stacks instead surface this as a plain
/// `Other`-kind error whose message contains "timed out"; treat that
/// the same way rather than tearing down the connection over it.
fn is_timeout_like(err: &std::io::Error) -> bool {
    matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
        || err.to_string().to_lowercase().contains("timed out")
}

/// Resolve `hostname:port` and try each address in turn, IPv4 first.
/// `ToSocketAddrs` doesn't guarantee an address-family order, so we sort
/// before connecting rather than relying on resolver behavior.
fn connect_tcp(options: &TransportOptions) -> AmqpResult<TcpStream> {
    let addrs: Vec<SocketAddr> = (options.hostname.as_str(), options.port)
        .to_socket_addrs()?
        .collect();
    if addrs.is_empty() {
        return Err(AmqpError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no addresses resolved for {}:{}", options.hostname, options.port),
        )));
    }

    let mut ordered = addrs;
    ordered.sort_by_key(|a| !a.is_ipv4());

    let mut last_err = None;
    for addr in &ordered {
        match TcpStream::connect_timeout(addr, options.connect_timeout) {
            Ok(stream) => {
                debug!("connected to {addr}");
                return Ok(stream);
            }
            Err(e) => {
                warn!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(AmqpError::Io(last_err.expect("ordered is non-empty")))
}

fn tune_socket(stream: &TcpStream, settings: &SocketSettings) -> AmqpResult<()> {
    stream.set_nodelay(settings.nodelay)?;

    let sock = SockRef::from(stream);
    if settings.keepalive_idle.is_some() || settings.keepalive_interval.is_some() {
        let mut keepalive = TcpKeepalive::new();
        if let Some(idle) = settings.keepalive_idle {
            keepalive = keepalive.with_time(idle);
        }
        #[cfg(not(target_os = "windows"))]
        if let Some(interval) = settings.keepalive_interval {
            keepalive = keepalive.with_interval(interval);
        }
        #[cfg(not(any(target_os = "windows", target_os = "openbsd")))]
        if let Some(retries) = settings.keepalive_retries {
            keepalive = keepalive.with_retries(retries);
        }
        sock.set_tcp_keepalive(&keepalive)
            .map_err(AmqpError::Io)?;
    }

    #[cfg(target_os = "linux")]
    if let Some(timeout) = settings.user_timeout {
        sock.set_tcp_user_timeout(Some(timeout)).map_err(AmqpError::Io)?;
    }

    Ok(())
}

fn wrap_tls(stream: TcpStream, tls: &TlsOptions, server_name: &str) -> AmqpResult<TlsStream<TcpStream>> {
    let mut builder = TlsConnector::builder();
    builder.danger_accept_invalid_certs(tls.danger_accept_invalid_certs);
    for pem in &tls.extra_root_certificates {
        let cert = native_tls::Certificate::from_pem(pem)?;
        builder.add_root_certificate(cert);
    }
    let connector = builder.build()?;
    connector
        .connect(server_name, stream)
        .map_err(|e| AmqpError::Tls(match e {
            native_tls::HandshakeError::Failure(err) => err,
            native_tls::HandshakeError::WouldBlock(_) => {
                return AmqpError::timeout("TLS handshake would block on a blocking socket");
            }
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn loopback_pair() -> (Transport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut header = [0u8; 8];
            server.read_exact(&mut header).unwrap();
            server.write_all(crate::frame::AMQP_PROTOCOL_HEADER).unwrap();
            server
        });

        let options = TransportOptions::new(addr.ip().to_string(), addr.port());
        let transport = Transport::connect(&options).unwrap();
        let server = handle.join().unwrap();
        (transport, server)
    }

    #[test]
    fn negotiates_amqp_protocol_header() {
        let (transport, _server) = loopback_pair();
        assert!(!transport.is_closed());
    }

    #[test]
    fn close_is_idempotent() {
        let (mut transport, _server) = loopback_pair();
        transport.close().unwrap();
        transport.close().unwrap();
        assert!(transport.is_closed());
    }

    #[test]
    fn round_trips_an_empty_frame() {
        let (mut transport, mut server) = loopback_pair();

        let frame = Frame::empty(3);
        let encoded = frame.clone().encode();
        let expected = encoded.clone();
        let reader = thread::spawn(move || {
            let mut buf = vec![0u8; expected.len()];
            server.read_exact(&mut buf).unwrap();
            buf
        });
        transport.write_frame(&frame).unwrap();
        let received = reader.join().unwrap();
        assert_eq!(received, encoded);
    }

    #[test]
    fn read_frame_reports_timeout_without_closing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut header = [0u8; 8];
            server.read_exact(&mut header).unwrap();
            server.write_all(crate::frame::AMQP_PROTOCOL_HEADER).unwrap();
            server
        });

        let mut options = TransportOptions::new(addr.ip().to_string(), addr.port());
        options.read_timeout = Some(Duration::from_millis(50));
        let mut transport = Transport::connect(&options).unwrap();
        let _server = handle.join().unwrap();

        let err = transport.read_frame().unwrap_err();
        assert!(matches!(err, AmqpError::Timeout(_)));
        assert!(!transport.is_closed());
    }

    /// Regresses the size/payload boundary bug: a timeout after the size
    /// prefix is read but before the full payload arrives must not let a
    /// later, unrelated size read re-interpret stray payload bytes as a
    /// new frame's size.
    #[test]
    fn read_frame_resumes_across_a_timeout_mid_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut header = [0u8; 8];
            server.read_exact(&mut header).unwrap();
            server.write_all(crate::frame::AMQP_PROTOCOL_HEADER).unwrap();
            server
        });

        let mut options = TransportOptions::new(addr.ip().to_string(), addr.port());
        options.read_timeout = Some(Duration::from_millis(80));
        let mut transport = Transport::connect(&options).unwrap();
        let mut server = handle.join().unwrap();

        let open = crate::performative::Performative::Open(crate::performative::Open {
            container_id: "boundary-test".to_string(),
            ..Default::default()
        });
        let frame = Frame::for_performative(7, &open).unwrap();
        let encoded = frame.clone().encode();
        assert!(encoded.len() > 8, "test needs a frame with a nonzero body");

        // Write the full size prefix plus a few payload bytes, then stall
        // past the read timeout before sending the rest of the payload.
        let split = 6;
        server.write_all(&encoded[..split]).unwrap();
        let err = transport.read_frame().unwrap_err();
        assert!(matches!(err, AmqpError::Timeout(_)));
        assert!(!transport.is_closed());

        server.write_all(&encoded[split..]).unwrap();
        let received = transport.read_frame().unwrap();
        assert_eq!(received.channel, frame.channel);
        assert_eq!(received.body, frame.body);
    }
}
