//! The DG-ID routing engine
//!
//! A single cooperative loop: drain the repeater socket, drain every bound
//! backend, deliver the elapsed wall-clock to every component, age the
//! active conversation. Nothing blocks except the pacing sleep at the
//! bottom of the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ysfgw_core::fich::Fich;
use ysfgw_core::frame;
use ysfgw_core::{StopWatch, Timer};
use ysfgw_networks::{AprsWriter, DgidNetwork};

use crate::table::{BackendHandle, BackendKind, BackendRegistry, DgidTable, DGID_SLOTS};

const BUFFER_LENGTH: usize = 200;
const MIN_LOOP_MS: u32 = 5;

pub struct DgidGateway {
    repeater: Box<dyn DgidNetwork>,
    registry: BackendRegistry,
    table: DgidTable,
    current_dgid: u8,
    inactivity: Timer,
    aprs: Option<AprsWriter>,
}

impl DgidGateway {
    pub fn new(
        repeater: Box<dyn DgidNetwork>,
        registry: BackendRegistry,
        table: DgidTable,
        aprs: Option<AprsWriter>,
    ) -> Self {
        Self {
            repeater,
            registry,
            table,
            current_dgid: 0,
            inactivity: Timer::new(),
            aprs,
        }
    }

    pub fn current_dgid(&self) -> u8 {
        self.current_dgid
    }

    /// Link every static binding so the peer is connected before any RF
    /// traffic arrives.
    pub fn start(&mut self) {
        let statics: Vec<BackendHandle> = self
            .table
            .iter()
            .filter(|(_, binding)| binding.is_static)
            .map(|(_, binding)| binding.backend)
            .collect();
        for handle in statics {
            let backend = self.registry.get_mut(handle);
            backend.link();
            backend.link();
            backend.link();
        }
    }

    /// One pass over the repeater socket.
    pub fn receive_repeater(&mut self) {
        let mut buffer = [0u8; BUFFER_LENGTH];
        let len = self.repeater.read(0, &mut buffer);
        if len == 0 || !frame::is_data(&buffer[..len]) || len < frame::YSF_FRAME_LENGTH {
            return;
        }

        let region_end = frame::FICH_OFFSET + frame::FICH_LENGTH;
        if let Some(fich) = Fich::decode(&buffer[frame::FICH_OFFSET..region_end]) {
            let dgid = fich.dgid();
            // A switch is only performed towards a bound slot; DG-ID 0 never
            // clears, only the inactivity timer does.
            if dgid != 0 && dgid != self.current_dgid && self.table.get(dgid).is_some() {
                self.switch_from_rf(dgid);
            }

            if let Some(writer) = &mut self.aprs {
                let source = frame::SOURCE_CALLSIGN_OFFSET;
                writer.data(&buffer[source..source + frame::YSF_CALLSIGN_LENGTH]);
            }

            if self.current_dgid != 0 {
                if let Some(binding) = self.table.get(self.current_dgid) {
                    let allowed = binding.modes.allows(fich.dt());
                    let handle = binding.backend;
                    let rf_hang_ms = binding.rf_hang_ms;

                    // Only the wanted modes go through to the network
                    if allowed {
                        let mut fich = fich;
                        fich.set_dgid(0);
                        fich.encode(&mut buffer[frame::FICH_OFFSET..region_end]);

                        self.registry
                            .get_mut(handle)
                            .write(self.current_dgid, &buffer[..frame::YSF_FRAME_LENGTH]);

                        self.inactivity.set_timeout(rf_hang_ms);
                        self.inactivity.start();
                    }
                }
            }
        }

        if frame::is_end_of_transmission(&buffer) {
            if let Some(writer) = &mut self.aprs {
                writer.reset();
            }
        }
    }

    /// Unlink the old slot, link the new one, three of each to ride out
    /// UDP loss. The caller has checked that the target slot is bound.
    fn switch_from_rf(&mut self, dgid: u8) {
        if let Some(binding) = self.table.get(self.current_dgid) {
            if !binding.is_static {
                let backend = self.registry.get_mut(binding.backend);
                backend.unlink();
                backend.unlink();
                backend.unlink();
            }
        }

        let Some(binding) = self.table.get(dgid) else { return };
        if !binding.is_static {
            let backend = self.registry.get_mut(binding.backend);
            backend.link();
            backend.link();
            backend.link();
        }

        let desc = self.registry.get_mut(binding.backend).get_desc(dgid);
        tracing::debug!("DG-ID set to {} ({}) via RF", dgid, desc);
        self.current_dgid = dgid;
    }

    /// One pass over every bound slot.
    pub fn receive_networks(&mut self) {
        let mut buffer = [0u8; BUFFER_LENGTH];
        for dgid in 1..DGID_SLOTS as u8 {
            let Some(binding) = self.table.get(dgid) else { continue };
            let handle = binding.backend;
            let net_hang_ms = binding.net_hang_ms;

            let len = self.registry.get_mut(handle).read(dgid, &mut buffer);
            if len == 0 {
                continue;
            }
            // Half-duplex: frames from inactive slots are dropped
            if dgid != self.current_dgid && self.current_dgid != 0 {
                continue;
            }
            if !frame::is_data(&buffer[..len]) || len < frame::YSF_FRAME_LENGTH {
                continue;
            }

            let region_end = frame::FICH_OFFSET + frame::FICH_LENGTH;
            let Some(mut fich) = Fich::decode(&buffer[frame::FICH_OFFSET..region_end]) else {
                continue;
            };
            fich.set_dgid(dgid);
            fich.encode(&mut buffer[frame::FICH_OFFSET..region_end]);

            self.repeater.write(0, &buffer[..frame::YSF_FRAME_LENGTH]);

            self.inactivity.set_timeout(net_hang_ms);
            self.inactivity.start();

            if self.current_dgid == 0 {
                let desc = self.registry.get_mut(handle).get_desc(dgid);
                tracing::debug!("DG-ID set to {} ({}) via Network", dgid, desc);
                self.current_dgid = dgid;
            }
        }
    }

    /// Deliver the elapsed wall-clock to every component, then age the
    /// active conversation.
    pub fn clock(&mut self, ms: u32) {
        self.repeater.clock(ms);

        // Each backend exactly once: the registry owns every driver exactly
        // once, however many slots alias it.
        for backend in self.registry.iter_mut() {
            backend.clock(ms);
        }

        if let Some(writer) = &mut self.aprs {
            writer.clock(ms);
        }

        self.inactivity.clock(ms);
        if self.inactivity.is_running() && self.inactivity.has_expired() {
            if let Some(binding) = self.table.get(self.current_dgid) {
                if !binding.is_static {
                    let backend = self.registry.get_mut(binding.backend);
                    backend.unlink();
                    backend.unlink();
                    backend.unlink();
                }
            }
            tracing::debug!("DG-ID set to 0 (None) via timeout");
            self.current_dgid = 0;
            self.inactivity.stop();
        }
    }

    /// Run until the flag clears, then tear down in order.
    pub fn run(&mut self, running: &AtomicBool) {
        self.start();
        tracing::info!("starting DGIdGateway-{}", ysfgw_core::GATEWAY_VERSION);

        let mut stopwatch = StopWatch::start();
        while running.load(Ordering::SeqCst) {
            self.receive_repeater();
            self.receive_networks();

            let ms = stopwatch.restart();
            self.clock(ms);

            if ms < MIN_LOOP_MS {
                std::thread::sleep(Duration::from_millis(MIN_LOOP_MS as u64));
            }
        }

        self.shutdown();
    }

    /// Ordered teardown: per-slot backends first, then the shared IMRS
    /// exactly once, then the repeater link.
    pub fn shutdown(&mut self) {
        let mut closed: Vec<BackendHandle> = Vec::new();
        let mut imrs: Option<BackendHandle> = None;

        for dgid in 1..DGID_SLOTS as u8 {
            let Some(binding) = self.table.get(dgid) else { continue };
            if binding.kind == BackendKind::Imrs {
                imrs = Some(binding.backend);
                continue;
            }
            if closed.contains(&binding.backend) {
                continue;
            }
            closed.push(binding.backend);

            let backend = self.registry.get_mut(binding.backend);
            backend.unlink();
            backend.unlink();
            backend.unlink();
            backend.close();
        }

        if let Some(handle) = imrs {
            self.registry.get_mut(handle).close();
        }

        self.repeater.close();

        if let Some(writer) = &mut self.aprs {
            writer.close();
        }

        self.current_dgid = 0;
    }

    /// The repeater driver, for inspection.
    pub fn repeater_mut(&mut self) -> &mut dyn DgidNetwork {
        self.repeater.as_mut()
    }

    /// The backend bound to a slot, for inspection.
    pub fn backend_mut(&mut self, dgid: u8) -> Option<&mut dyn DgidNetwork> {
        let handle = self.table.get(dgid)?.backend;
        Some(self.registry.get_mut(handle))
    }
}
