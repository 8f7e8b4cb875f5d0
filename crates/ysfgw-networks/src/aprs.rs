//! APRS-IS position reporter
//!
//! Plain TCP client of an APRS-IS server: logs in with the standard
//! passcode, beacons the configured static position on a slow cadence, and
//! carries the accumulator the routing engine feeds with the source
//! callsign of the transmission in progress.

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use ysfgw_core::{Timer, GATEWAY_VERSION};

use crate::{lookup, NetworkError};

const BEACON_INTERVAL_MS: u32 = 20 * 60 * 1000;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AprsWriter {
    callsign: String,
    suffix: String,
    server: String,
    port: u16,
    description: String,
    tx_frequency: u32,
    rx_frequency: u32,
    latitude: f32,
    longitude: f32,
    height: i32,
    stream: Option<TcpStream>,
    beacon_timer: Timer,
    current_source: Option<String>,
    debug: bool,
}

impl AprsWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        callsign: &str,
        suffix: &str,
        server: &str,
        port: u16,
        description: &str,
        tx_frequency: u32,
        rx_frequency: u32,
        debug: bool,
    ) -> Self {
        let mut beacon_timer = Timer::new();
        beacon_timer.set_timeout(BEACON_INTERVAL_MS);

        Self {
            callsign: callsign.trim().to_string(),
            suffix: suffix.trim().to_string(),
            server: server.to_string(),
            port,
            description: description.to_string(),
            tx_frequency,
            rx_frequency,
            latitude: 0.0,
            longitude: 0.0,
            height: 0,
            stream: None,
            beacon_timer,
            current_source: None,
            debug,
        }
    }

    pub fn set_static_location(&mut self, latitude: f32, longitude: f32, height: i32) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.height = height;
    }

    fn address(&self) -> String {
        if self.suffix.is_empty() {
            self.callsign.clone()
        } else {
            format!("{}-{}", self.callsign, self.suffix)
        }
    }

    pub fn open(&mut self) -> Result<(), NetworkError> {
        let addr = lookup(&self.server, self.port)?;
        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| NetworkError::ConnectFailed(format!("{}: {}", addr, e)))?;

        let login = format!(
            "user {} pass {} vers dgidgateway {}\r\n",
            self.address(),
            passcode(&self.callsign),
            GATEWAY_VERSION
        );
        stream
            .write_all(login.as_bytes())
            .map_err(|e| NetworkError::ConnectFailed(format!("{}: {}", addr, e)))?;
        stream
            .set_nonblocking(true)
            .map_err(|e| NetworkError::ConnectFailed(format!("{}: {}", addr, e)))?;

        tracing::info!("APRS: connected to {}:{}", self.server, self.port);
        self.stream = Some(stream);
        self.beacon_timer.start();
        self.send_beacon();
        Ok(())
    }

    pub fn clock(&mut self, ms: u32) {
        self.beacon_timer.clock(ms);
        if self.beacon_timer.is_running() && self.beacon_timer.has_expired() {
            if self.stream.is_none() {
                // dropped connection, try again on the beacon cadence
                if let Err(e) = self.open() {
                    tracing::warn!("APRS: reconnect failed: {}", e);
                }
            } else {
                self.send_beacon();
            }
            self.beacon_timer.start();
        }
    }

    fn send_beacon(&mut self) {
        let mut comment = format!(
            "{:.5}MHz {:+.4}MHz",
            self.tx_frequency as f64 / 1_000_000.0,
            (self.rx_frequency as f64 - self.tx_frequency as f64) / 1_000_000.0
        );
        if self.height != 0 {
            comment.push_str(&format!(" /A={:06}", (self.height as f32 * 3.2808) as i32));
        }
        if !self.description.is_empty() {
            comment.push(' ');
            comment.push_str(&self.description);
        }

        let report = position_report(&self.address(), self.latitude, self.longitude, &comment);
        let Some(stream) = &mut self.stream else { return };
        if let Err(e) = stream.write_all(report.as_bytes()) {
            tracing::warn!("APRS: send failed, dropping connection: {}", e);
            self.stream = None;
            return;
        }
        if self.debug {
            tracing::debug!("APRS: sent {}", report.trim_end());
        }
    }

    /// Record the source callsign of the transmission in progress.
    pub fn data(&mut self, source: &[u8]) {
        let callsign = String::from_utf8_lossy(source).trim_end().to_string();
        if !callsign.is_empty() {
            self.current_source = Some(callsign);
        }
    }

    /// Clear the accumulator at the end of a transmission.
    pub fn reset(&mut self) {
        if let Some(source) = self.current_source.take() {
            tracing::trace!("APRS: end of transmission from {}", source);
        }
    }

    pub fn close(&mut self) {
        self.stream = None;
        self.beacon_timer.stop();
        tracing::debug!("APRS: closed");
    }
}

/// APRS-IS passcode for a callsign, as defined by the APRS-IS login scheme.
pub fn passcode(callsign: &str) -> u16 {
    let call = callsign.split('-').next().unwrap_or("").to_uppercase();

    let mut hash: u16 = 0x73e2;
    for (i, byte) in call.bytes().enumerate() {
        if i % 2 == 0 {
            hash ^= (byte as u16) << 8;
        } else {
            hash ^= byte as u16;
        }
    }
    hash & 0x7fff
}

/// APRS position report line for a fixed station.
fn position_report(address: &str, latitude: f32, longitude: f32, description: &str) -> String {
    format!(
        "{}>APDG04,TCPIP*:!{}/{}&{}\r\n",
        address,
        aprs_latitude(latitude),
        aprs_longitude(longitude),
        description
    )
}

/// Latitude in APRS DDMM.mm[NS] notation.
fn aprs_latitude(latitude: f32) -> String {
    let hemisphere = if latitude < 0.0 { 'S' } else { 'N' };
    let value = latitude.abs();
    let degrees = value.floor();
    let minutes = (value - degrees) * 60.0;
    format!("{:02}{:05.2}{}", degrees as u32, minutes, hemisphere)
}

/// Longitude in APRS DDDMM.mm[EW] notation.
fn aprs_longitude(longitude: f32) -> String {
    let hemisphere = if longitude < 0.0 { 'W' } else { 'E' };
    let value = longitude.abs();
    let degrees = value.floor();
    let minutes = (value - degrees) * 60.0;
    format!("{:03}{:05.2}{}", degrees as u32, minutes, hemisphere)
}
