/// UDP relay link
/// Connectionless and fire-and-forget: one JSON message per datagram, no
/// acknowledgments, no retries.
use std::io::ErrorKind;
use std::net::UdpSocket;

use log::{info, warn};
use roadpulse::sink::{EventSink, PublishError};
use roadpulse::WireMessage;

/// Largest datagram accepted from the relay (a full history batch fits)
const MAX_DATAGRAM: usize = 65_507;

pub struct UdpSink {
    socket: UdpSocket,
    server_addr: String,
    publish_positions: bool,
    sent: u64,
    recv_buf: Vec<u8>,
}

impl UdpSink {
    /// Bind locally and aim at the relay
    ///
    /// The socket is non-blocking so inbound polling never stalls the
    /// detection loop.
    pub fn connect(bind: &str, server_addr: &str) -> std::io::Result<Self> {
        info!("Initializing UDP socket for {}", server_addr);

        let socket = UdpSocket::bind(bind)?;
        socket.connect(server_addr)?;
        socket.set_nonblocking(true)?;

        info!("UDP socket ready on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            server_addr: server_addr.to_string(),
            publish_positions: true,
            sent: 0,
            recv_buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn with_publish_positions(mut self, enabled: bool) -> Self {
        self.publish_positions = enabled;
        self
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Datagrams sent successfully
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Drain every datagram waiting on the socket
    ///
    /// Undecodable datagrams are logged and dropped.
    pub fn poll_inbound(&mut self) -> Vec<WireMessage> {
        let mut messages = Vec::new();
        loop {
            match self.socket.recv(&mut self.recv_buf) {
                Ok(len) => match WireMessage::decode(&self.recv_buf[..len]) {
                    Ok(message) => messages.push(message),
                    Err(e) => warn!("Dropping relay datagram ({} bytes): {}", len, e),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                // ICMP port unreachable surfaces here when the relay is down
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => break,
                Err(e) => {
                    warn!("UDP receive failed: {}", e);
                    break;
                }
            }
        }
        messages
    }
}

impl EventSink for UdpSink {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        if !self.publish_positions && matches!(message, WireMessage::Position { .. }) {
            return Ok(());
        }
        let bytes = message.to_bytes()?;
        self.socket
            .send(&bytes)
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        self.sent += 1;
        Ok(())
    }
}
