//! Remote-network drivers for the DG-ID gateway

use core::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use as_any::AsAny;

pub mod aprs;
pub mod fcs;
pub mod imrs;
pub mod ysf;

pub use aprs::AprsWriter;
pub use fcs::FcsNetwork;
pub use imrs::{ImrsDestination, ImrsNetwork};
pub use ysf::YsfNetwork;

/// Errors surfaced by the network drivers.
#[derive(Debug)]
pub enum NetworkError {
    AddressUnresolvable(String),
    BindFailed(String),
    ConnectFailed(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::AddressUnresolvable(s) => write!(f, "address unresolvable: {}", s),
            NetworkError::BindFailed(s) => write!(f, "bind failed: {}", s),
            NetworkError::ConnectFailed(s) => write!(f, "connect failed: {}", s),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Contract every remote-network driver satisfies
/// Used by the routing engine for the repeater link and every DG-ID slot
///
/// `read` returns 0 when no frame is ready. `clock` drives keepalives and
/// driver timers and never blocks beyond a non-blocking UDP send. `link` and
/// `unlink` are idempotent; the engine issues them three times in a row to
/// ride out single UDP losses on the handshake.
pub trait DgidNetwork: AsAny {
    fn open(&mut self) -> Result<(), NetworkError>;
    fn link(&mut self);
    fn unlink(&mut self);
    fn read(&mut self, dgid: u8, buffer: &mut [u8]) -> usize;
    fn write(&mut self, dgid: u8, buffer: &[u8]);
    fn clock(&mut self, ms: u32);
    fn get_desc(&self, dgid: u8) -> String;
    fn close(&mut self);
}

/// Resolve a host/port pair to a single socket address.
pub fn lookup(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    format!("{}:{}", host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::AddressUnresolvable(format!("{}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| {
            NetworkError::AddressUnresolvable(format!("no addresses found for {}:{}", host, port))
        })
}
