//! FCS network driver
//!
//! UDP client of the FCS reflector network. FCS rooms are named like
//! `FCS00162`; the server host derives from the first six characters. The
//! wire carries bare 130-byte frames (120-byte air payload plus the source
//! callsign), so frames are unwrapped on the way out and wrapped back into
//! YSF network framing on the way in.

use std::net::{SocketAddr, UdpSocket};

use ysfgw_core::fich::{Fich, FrameIndicator};
use ysfgw_core::frame::{self, YSF_CALLSIGN_LENGTH, YSF_FRAME_LENGTH};
use ysfgw_core::Timer;

use crate::{lookup, DgidNetwork, NetworkError};

const FCS_PORT: u16 = 62500;
const POLL_INTERVAL_MS: u32 = 800;
const BUFFER_LENGTH: usize = 200;

const FCS_FRAME_LENGTH: usize = frame::PAYLOAD_LENGTH + YSF_CALLSIGN_LENGTH;
const POLL_LENGTH: usize = 25;
const UNLINK_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FcsState {
    Unlinked,
    Linking,
    Linked,
}

pub struct FcsNetwork {
    name: String,
    local_port: u16,
    callsign: [u8; YSF_CALLSIGN_LENGTH],
    rx_frequency: u32,
    tx_frequency: u32,
    locator: String,
    id: u32,
    options: Option<String>,
    socket: Option<UdpSocket>,
    dest: Option<SocketAddr>,
    poll: [u8; POLL_LENGTH],
    state: FcsState,
    poll_timer: Timer,
    seq: u8,
    debug: bool,
}

impl FcsNetwork {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        local_port: u16,
        callsign: &str,
        rx_frequency: u32,
        tx_frequency: u32,
        locator: &str,
        id: u32,
        options: Option<String>,
        debug: bool,
    ) -> Self {
        let callsign = frame::pad_callsign(callsign);

        let mut poll = [b' '; POLL_LENGTH];
        poll[..4].copy_from_slice(b"PING");
        poll[4..14].copy_from_slice(&callsign);
        for (dst, src) in poll[14..20].iter_mut().zip(locator.bytes()) {
            *dst = src;
        }
        poll[20..25].copy_from_slice(format!("{:05}", id % 100_000).as_bytes());

        let mut poll_timer = Timer::new();
        poll_timer.set_timeout(POLL_INTERVAL_MS);

        Self {
            name: name.to_string(),
            local_port,
            callsign,
            rx_frequency,
            tx_frequency,
            locator: locator.to_string(),
            id,
            options,
            socket: None,
            dest: None,
            poll,
            state: FcsState::Unlinked,
            poll_timer,
            seq: 0,
            debug,
        }
    }

    /// Server host for an FCS room name, e.g. `FCS00162` -> `fcs001.xreflector.net`.
    fn server_host(name: &str) -> Option<String> {
        if name.len() < 6 {
            return None;
        }
        Some(format!("{}.xreflector.net", name[..6].to_lowercase()))
    }

    fn send(&self, data: &[u8]) {
        let (Some(socket), Some(dest)) = (&self.socket, self.dest) else { return };
        if let Err(e) = socket.send_to(data, dest) {
            tracing::error!("{}: UDP send failed: {}", self.name, e);
        }
    }

    /// Station info packet sent once per link attempt.
    fn info_packet(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(43);
        message.extend_from_slice(b"INFO");
        message.extend_from_slice(&self.callsign);
        message.extend_from_slice(format!("{:09}", self.rx_frequency % 1_000_000_000).as_bytes());
        message.extend_from_slice(format!("{:09}", self.tx_frequency % 1_000_000_000).as_bytes());
        let mut grid = [b' '; 6];
        for (dst, src) in grid.iter_mut().zip(self.locator.bytes()) {
            *dst = src;
        }
        message.extend_from_slice(&grid);
        message.extend_from_slice(format!("{:05}", self.id % 100_000).as_bytes());
        if let Some(options) = &self.options {
            message.extend_from_slice(options.as_bytes());
        }
        message
    }

    /// Strip the YSF network header down to the 130-byte FCS frame.
    fn to_fcs_frame(buffer: &[u8]) -> Option<[u8; FCS_FRAME_LENGTH]> {
        if buffer.len() < YSF_FRAME_LENGTH {
            return None;
        }
        let mut out = [0u8; FCS_FRAME_LENGTH];
        out[..frame::PAYLOAD_LENGTH]
            .copy_from_slice(&buffer[frame::PAYLOAD_OFFSET..frame::PAYLOAD_OFFSET + frame::PAYLOAD_LENGTH]);
        out[frame::PAYLOAD_LENGTH..].copy_from_slice(
            &buffer[frame::SOURCE_CALLSIGN_OFFSET..frame::SOURCE_CALLSIGN_OFFSET + YSF_CALLSIGN_LENGTH],
        );
        Some(out)
    }
}

/// Wrap a 130-byte server frame back into YSF network framing.
fn wrap_network_frame(
    gateway_callsign: &[u8; YSF_CALLSIGN_LENGTH],
    seq: &mut u8,
    payload: &[u8],
) -> [u8; YSF_FRAME_LENGTH] {
    let mut out = [0u8; YSF_FRAME_LENGTH];
    out[..4].copy_from_slice(frame::TAG_DATA);
    out[frame::GATEWAY_CALLSIGN_OFFSET..frame::GATEWAY_CALLSIGN_OFFSET + YSF_CALLSIGN_LENGTH]
        .copy_from_slice(gateway_callsign);
    out[frame::SOURCE_CALLSIGN_OFFSET..frame::SOURCE_CALLSIGN_OFFSET + YSF_CALLSIGN_LENGTH]
        .copy_from_slice(&payload[frame::PAYLOAD_LENGTH..FCS_FRAME_LENGTH]);
    out[frame::DEST_CALLSIGN_OFFSET..frame::DEST_CALLSIGN_OFFSET + YSF_CALLSIGN_LENGTH]
        .copy_from_slice(&frame::pad_callsign("ALL"));
    out[frame::PAYLOAD_OFFSET..frame::PAYLOAD_OFFSET + frame::PAYLOAD_LENGTH]
        .copy_from_slice(&payload[..frame::PAYLOAD_LENGTH]);

    let terminator = Fich::decode(&payload[..frame::FICH_LENGTH])
        .map(|fich| fich.fi() == FrameIndicator::Terminator)
        .unwrap_or(false);

    out[frame::FRAME_INFO_OFFSET] = (*seq & 0x7f) << 1;
    if terminator {
        out[frame::FRAME_INFO_OFFSET] |= 0x01;
        *seq = 0;
    } else {
        *seq = seq.wrapping_add(1);
    }

    out
}

impl DgidNetwork for FcsNetwork {
    fn open(&mut self) -> Result<(), NetworkError> {
        let host = Self::server_host(&self.name).ok_or_else(|| {
            NetworkError::AddressUnresolvable(format!("bad FCS room name: {}", self.name))
        })?;
        self.dest = Some(lookup(&host, FCS_PORT)?);

        let addr = format!("0.0.0.0:{}", self.local_port);
        let socket = UdpSocket::bind(&addr)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

        tracing::debug!("{}: opened UDP port {}, server {}", self.name, addr, host);
        self.socket = Some(socket);
        Ok(())
    }

    fn link(&mut self) {
        self.state = FcsState::Linking;
        let poll = self.poll;
        self.send(&poll);
        self.send(&self.info_packet());
        self.poll_timer.start();
    }

    fn unlink(&mut self) {
        let mut message = [0u8; UNLINK_LENGTH];
        message[..5].copy_from_slice(b"CLOSE");
        message[5..].copy_from_slice(&self.callsign);
        self.send(&message);
        self.state = FcsState::Unlinked;
        self.poll_timer.stop();
    }

    fn read(&mut self, _dgid: u8, buffer: &mut [u8]) -> usize {
        let Some(socket) = &self.socket else { return 0 };

        let mut datagram = [0u8; BUFFER_LENGTH];
        loop {
            match socket.recv_from(&mut datagram) {
                Ok((len, src)) => {
                    if Some(src) != self.dest {
                        continue;
                    }
                    if self.state == FcsState::Linking {
                        tracing::info!("{}: linked", self.name);
                        self.state = FcsState::Linked;
                    }
                    if len != FCS_FRAME_LENGTH {
                        // keepalive acknowledgements and status blobs
                        continue;
                    }
                    let network_frame =
                        wrap_network_frame(&self.callsign, &mut self.seq, &datagram[..FCS_FRAME_LENGTH]);
                    let n = network_frame.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&network_frame[..n]);
                    if self.debug {
                        tracing::debug!("{}: received data frame", self.name);
                    }
                    return n;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return 0,
                Err(e) => {
                    tracing::error!("{}: UDP receive error: {}", self.name, e);
                    return 0;
                }
            }
        }
    }

    fn write(&mut self, _dgid: u8, buffer: &[u8]) {
        if self.state == FcsState::Unlinked {
            return;
        }
        let Some(fcs_frame) = Self::to_fcs_frame(buffer) else { return };
        self.send(&fcs_frame);
        if self.debug {
            tracing::debug!("{}: sent data frame", self.name);
        }
    }

    fn clock(&mut self, ms: u32) {
        self.poll_timer.clock(ms);
        if self.state != FcsState::Unlinked && self.poll_timer.has_expired() {
            let poll = self.poll;
            self.send(&poll);
            self.poll_timer.start();
        }
    }

    fn get_desc(&self, _dgid: u8) -> String {
        self.name.clone()
    }

    fn close(&mut self) {
        self.socket = None;
        self.state = FcsState::Unlinked;
        self.poll_timer.stop();
        tracing::debug!("{}: closed", self.name);
    }
}
