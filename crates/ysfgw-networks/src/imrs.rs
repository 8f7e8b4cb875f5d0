//! IMRS driver
//!
//! One shared backend multiplexing many DG-ID slots on a single socket.
//! Each slot carries its own fan-out list of destination peers; inbound
//! datagrams are assigned to the slot whose destination list contains the
//! source address. The engine owns the unique handle, slot entries alias
//! it, and it is closed exactly once at shutdown.

use std::collections::{HashMap, VecDeque};
use std::net::{SocketAddr, UdpSocket};

use ysfgw_core::frame;

use crate::{DgidNetwork, NetworkError};

pub const IMRS_PORT: u16 = 21110;

const BUFFER_LENGTH: usize = 200;

/// One fan-out peer of an IMRS slot.
#[derive(Debug, Clone)]
pub struct ImrsDestination {
    pub dgid: u8,
    pub addr: SocketAddr,
}

#[derive(Debug)]
struct ImrsEntry {
    name: String,
    destinations: Vec<ImrsDestination>,
    queue: VecDeque<Vec<u8>>,
    debug: bool,
}

pub struct ImrsNetwork {
    local_port: u16,
    socket: Option<UdpSocket>,
    entries: HashMap<u8, ImrsEntry>,
}

impl ImrsNetwork {
    pub fn new() -> Self {
        Self::with_local_port(IMRS_PORT)
    }

    pub fn with_local_port(local_port: u16) -> Self {
        Self {
            local_port,
            socket: None,
            entries: HashMap::new(),
        }
    }

    /// Register a DG-ID slot with its fan-out peers.
    pub fn add_dgid(&mut self, dgid: u8, name: &str, destinations: Vec<ImrsDestination>, debug: bool) {
        self.entries.insert(
            dgid,
            ImrsEntry {
                name: name.to_string(),
                destinations,
                queue: VecDeque::new(),
                debug,
            },
        );
    }

    /// Local address of the bound socket, for callers binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Pull everything off the socket into the per-slot queues.
    fn drain_socket(&mut self) {
        let Some(socket) = &self.socket else { return };

        let mut datagram = [0u8; BUFFER_LENGTH];
        loop {
            match socket.recv_from(&mut datagram) {
                Ok((len, src)) => {
                    if len < 4 || &datagram[..4] != frame::TAG_DATA {
                        continue;
                    }
                    let entry = self
                        .entries
                        .values_mut()
                        .find(|e| e.destinations.iter().any(|d| d.addr == src));
                    match entry {
                        Some(entry) => {
                            if entry.debug {
                                tracing::debug!("IMRS: {} bytes for {} from {}", len, entry.name, src);
                            }
                            entry.queue.push_back(datagram[..len].to_vec());
                        }
                        None => tracing::trace!("IMRS: datagram from unknown peer {}", src),
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::error!("IMRS: UDP receive error: {}", e);
                    break;
                }
            }
        }
    }
}

impl Default for ImrsNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl DgidNetwork for ImrsNetwork {
    fn open(&mut self) -> Result<(), NetworkError> {
        let addr = format!("0.0.0.0:{}", self.local_port);
        let socket = UdpSocket::bind(&addr)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

        tracing::debug!("IMRS: opened UDP port {}", addr);
        self.socket = Some(socket);
        Ok(())
    }

    // The IMRS protocol is stateless, there is no handshake to repeat.
    fn link(&mut self) {}

    fn unlink(&mut self) {}

    fn read(&mut self, dgid: u8, buffer: &mut [u8]) -> usize {
        self.drain_socket();

        let Some(entry) = self.entries.get_mut(&dgid) else { return 0 };
        let Some(datagram) = entry.queue.pop_front() else { return 0 };

        let n = datagram.len().min(buffer.len());
        buffer[..n].copy_from_slice(&datagram[..n]);
        n
    }

    fn write(&mut self, dgid: u8, buffer: &[u8]) {
        let Some(socket) = &self.socket else { return };
        let Some(entry) = self.entries.get(&dgid) else { return };

        for dest in &entry.destinations {
            if let Err(e) = socket.send_to(buffer, dest.addr) {
                tracing::error!("IMRS: UDP send to {} failed: {}", dest.addr, e);
            }
        }
        if entry.debug {
            tracing::debug!("IMRS: sent {} bytes to {} peers of {}", buffer.len(), entry.destinations.len(), entry.name);
        }
    }

    fn clock(&mut self, _ms: u32) {}

    fn get_desc(&self, dgid: u8) -> String {
        self.entries
            .get(&dgid)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn close(&mut self) {
        self.socket = None;
        tracing::debug!("IMRS: closed");
    }
}
