//! YSF reflector protocol driver
//!
//! One UDP peer speaking the YSF reflector protocol: `YSFP` polls as
//! keepalives, `YSFU` to unlink, `YSFD` for data frames. The same driver
//! serves native reflectors, the repeater link, and the Parrot/YSF2* sibling
//! daemons, which differ only by logical name and mode mask.

use std::net::{SocketAddr, UdpSocket};

use ysfgw_core::frame::{self, YSF_CALLSIGN_LENGTH, YSF_FRAME_LENGTH};
use ysfgw_core::Timer;

use crate::{DgidNetwork, NetworkError};

const POLL_INTERVAL_MS: u32 = 5_000;
const BUFFER_LENGTH: usize = 200;

const POLL_LENGTH: usize = 4 + YSF_CALLSIGN_LENGTH;

pub struct YsfNetwork {
    label: String,
    bind_address: String,
    local_port: u16,
    dest: SocketAddr,
    callsign: [u8; YSF_CALLSIGN_LENGTH],
    options: Option<String>,
    socket: Option<UdpSocket>,
    poll: [u8; POLL_LENGTH],
    unlink_msg: [u8; POLL_LENGTH],
    poll_timer: Timer,
    linked: bool,
    debug: bool,
}

impl YsfNetwork {
    pub fn new(
        bind_address: &str,
        local_port: u16,
        name: &str,
        dest: SocketAddr,
        callsign: &str,
        options: Option<String>,
        debug: bool,
    ) -> Self {
        let callsign = frame::pad_callsign(callsign);

        let mut poll = [0u8; POLL_LENGTH];
        poll[..4].copy_from_slice(frame::TAG_POLL);
        poll[4..].copy_from_slice(&callsign);

        let mut unlink_msg = [0u8; POLL_LENGTH];
        unlink_msg[..4].copy_from_slice(frame::TAG_UNLINK);
        unlink_msg[4..].copy_from_slice(&callsign);

        let mut poll_timer = Timer::new();
        poll_timer.set_timeout(POLL_INTERVAL_MS);

        Self {
            label: name.to_string(),
            bind_address: bind_address.to_string(),
            local_port,
            dest,
            callsign,
            options,
            socket: None,
            poll,
            unlink_msg,
            poll_timer,
            linked: false,
            debug,
        }
    }

    /// Local address of the bound socket, for callers binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn send(&self, data: &[u8]) {
        if let Some(socket) = &self.socket {
            if let Err(e) = socket.send_to(data, self.dest) {
                tracing::error!("{}: UDP send failed: {}", self.label, e);
            }
        }
    }

    fn send_options(&self) {
        let Some(options) = &self.options else { return };
        let mut message = Vec::with_capacity(4 + YSF_CALLSIGN_LENGTH + options.len());
        message.extend_from_slice(b"YSFO");
        message.extend_from_slice(&self.callsign);
        message.extend_from_slice(options.as_bytes());
        self.send(&message);
    }
}

impl DgidNetwork for YsfNetwork {
    fn open(&mut self) -> Result<(), NetworkError> {
        let addr = format!("{}:{}", self.bind_address, self.local_port);
        let socket = UdpSocket::bind(&addr)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

        tracing::debug!("{}: opened UDP port {}", self.label, addr);
        self.socket = Some(socket);
        Ok(())
    }

    fn link(&mut self) {
        let poll = self.poll;
        self.send(&poll);
        self.send_options();
        self.poll_timer.start();
        self.linked = true;
    }

    fn unlink(&mut self) {
        let unlink_msg = self.unlink_msg;
        self.send(&unlink_msg);
        self.poll_timer.stop();
        self.linked = false;
    }

    fn read(&mut self, _dgid: u8, buffer: &mut [u8]) -> usize {
        let Some(socket) = &self.socket else { return 0 };

        let mut datagram = [0u8; BUFFER_LENGTH];
        loop {
            match socket.recv_from(&mut datagram) {
                Ok((len, src)) => {
                    if src != self.dest {
                        tracing::trace!("{}: datagram from unexpected peer {}", self.label, src);
                        continue;
                    }
                    if len >= 4 && &datagram[..4] == frame::TAG_POLL {
                        // answer the peer's keepalive
                        let poll = self.poll;
                        self.send(&poll);
                        continue;
                    }
                    if len >= 4 && &datagram[..4] == frame::TAG_DATA {
                        let n = len.min(buffer.len());
                        buffer[..n].copy_from_slice(&datagram[..n]);
                        if self.debug {
                            tracing::debug!("{}: received {} data bytes", self.label, n);
                        }
                        return n;
                    }
                    // YSFU acknowledgements and YSFS status are ignored
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return 0,
                Err(e) => {
                    tracing::error!("{}: UDP receive error: {}", self.label, e);
                    return 0;
                }
            }
        }
    }

    fn write(&mut self, _dgid: u8, buffer: &[u8]) {
        if buffer.len() < YSF_FRAME_LENGTH {
            return;
        }
        self.send(&buffer[..YSF_FRAME_LENGTH]);
        if self.debug {
            tracing::debug!("{}: sent data frame", self.label);
        }
    }

    fn clock(&mut self, ms: u32) {
        self.poll_timer.clock(ms);
        if self.linked && self.poll_timer.has_expired() {
            let poll = self.poll;
            self.send(&poll);
            self.poll_timer.start();
        }
    }

    fn get_desc(&self, _dgid: u8) -> String {
        self.label.clone()
    }

    fn close(&mut self) {
        self.socket = None;
        self.poll_timer.stop();
        self.linked = false;
        tracing::debug!("{}: closed", self.label);
    }
}
