//! Shared test doubles for the routing engine tests

use std::collections::VecDeque;

use as_any::AsAny;

use ysfgw_core::fich::{DataType, Fich, FrameIndicator};
use ysfgw_core::frame;
use ysfgw_core::ModeMask;
use ysfgw_engine::{BackendKind, BackendRegistry, DgidBinding, DgidGateway, DgidTable};
use ysfgw_networks::{DgidNetwork, NetworkError};

/// Everything a [`MockNetwork`] records, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetCall {
    Link,
    Unlink,
    Write,
    Close,
}

/// Scripted in-memory backend: frames pushed to `rx` are handed to the
/// engine on `read`; everything the engine does is recorded for inspection.
pub struct MockNetwork {
    pub label: String,
    pub calls: Vec<NetCall>,
    pub rx: VecDeque<(u8, Vec<u8>)>,
    pub written: Vec<(u8, Vec<u8>)>,
    pub clocked: Vec<u32>,
}

impl MockNetwork {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            calls: Vec::new(),
            rx: VecDeque::new(),
            written: Vec::new(),
            clocked: Vec::new(),
        }
    }

    pub fn push_rx(&mut self, dgid: u8, frame_bytes: Vec<u8>) {
        self.rx.push_back((dgid, frame_bytes));
    }

    pub fn links(&self) -> usize {
        self.calls.iter().filter(|c| **c == NetCall::Link).count()
    }

    pub fn unlinks(&self) -> usize {
        self.calls.iter().filter(|c| **c == NetCall::Unlink).count()
    }

    pub fn closes(&self) -> usize {
        self.calls.iter().filter(|c| **c == NetCall::Close).count()
    }
}

impl DgidNetwork for MockNetwork {
    fn open(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    fn link(&mut self) {
        self.calls.push(NetCall::Link);
    }

    fn unlink(&mut self) {
        self.calls.push(NetCall::Unlink);
    }

    fn read(&mut self, dgid: u8, buffer: &mut [u8]) -> usize {
        match self.rx.front() {
            Some((d, _)) if *d == dgid => {
                let (_, frame_bytes) = self.rx.pop_front().unwrap();
                buffer[..frame_bytes.len()].copy_from_slice(&frame_bytes);
                frame_bytes.len()
            }
            _ => 0,
        }
    }

    fn write(&mut self, dgid: u8, buffer: &[u8]) {
        self.calls.push(NetCall::Write);
        self.written.push((dgid, buffer.to_vec()));
    }

    fn clock(&mut self, ms: u32) {
        self.clocked.push(ms);
    }

    fn get_desc(&self, _dgid: u8) -> String {
        self.label.clone()
    }

    fn close(&mut self) {
        self.calls.push(NetCall::Close);
    }
}

/// Build a 155-byte YSFD network frame carrying the given FICH settings.
pub fn build_frame(dgid: u8, dt: DataType, end_of_tx: bool) -> Vec<u8> {
    let mut out = vec![0u8; frame::YSF_FRAME_LENGTH];
    out[..4].copy_from_slice(frame::TAG_DATA);
    out[frame::GATEWAY_CALLSIGN_OFFSET..frame::GATEWAY_CALLSIGN_OFFSET + 10]
        .copy_from_slice(&frame::pad_callsign("GATEWAY"));
    out[frame::SOURCE_CALLSIGN_OFFSET..frame::SOURCE_CALLSIGN_OFFSET + 10]
        .copy_from_slice(&frame::pad_callsign("N0CALL"));
    out[frame::DEST_CALLSIGN_OFFSET..frame::DEST_CALLSIGN_OFFSET + 10]
        .copy_from_slice(&frame::pad_callsign("ALL"));
    if end_of_tx {
        out[frame::FRAME_INFO_OFFSET] |= 0x01;
    }

    let mut fich = Fich::new();
    fich.set_fi(FrameIndicator::Communications);
    fich.set_dt(dt);
    fich.set_dgid(dgid);
    fich.encode(&mut out[frame::FICH_OFFSET..frame::FICH_OFFSET + frame::FICH_LENGTH]);

    out
}

/// Decode the FICH of a forwarded frame.
pub fn fich_of(frame_bytes: &[u8]) -> Fich {
    Fich::decode(&frame_bytes[frame::FICH_OFFSET..frame::FICH_OFFSET + frame::FICH_LENGTH])
        .expect("forwarded frame carries a valid FICH")
}

/// Slot description for [`GatewayBuilder`].
pub struct SlotSpec {
    pub dgid: u8,
    pub kind: BackendKind,
    pub is_static: bool,
    pub rf_hang_ms: u32,
    pub net_hang_ms: u32,
    pub modes: ModeMask,
}

impl SlotSpec {
    pub fn new(dgid: u8, kind: BackendKind) -> Self {
        Self {
            dgid,
            kind,
            is_static: false,
            rf_hang_ms: 2000,
            net_hang_ms: 1000,
            modes: kind.default_modes(),
        }
    }

    pub fn is_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn rf_hang_ms(mut self, ms: u32) -> Self {
        self.rf_hang_ms = ms;
        self
    }

    pub fn net_hang_ms(mut self, ms: u32) -> Self {
        self.net_hang_ms = ms;
        self
    }
}

/// Assembles a gateway over mock drivers.
pub struct GatewayBuilder {
    registry: BackendRegistry,
    table: DgidTable,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            registry: BackendRegistry::new(),
            table: DgidTable::new(),
        }
    }

    /// One slot backed by its own mock driver.
    pub fn slot(mut self, spec: SlotSpec) -> Self {
        let handle = self
            .registry
            .add(Box::new(MockNetwork::new(&format!("Mock {}", spec.dgid))));
        self.table.insert(
            spec.dgid,
            DgidBinding {
                backend: handle,
                kind: spec.kind,
                is_static: spec.is_static,
                rf_hang_ms: spec.rf_hang_ms,
                net_hang_ms: spec.net_hang_ms,
                modes: spec.modes,
            },
        );
        self
    }

    /// Several slots aliasing one shared mock driver.
    pub fn shared_slots(mut self, specs: Vec<SlotSpec>, label: &str) -> Self {
        let handle = self.registry.add(Box::new(MockNetwork::new(label)));
        for spec in specs {
            self.table.insert(
                spec.dgid,
                DgidBinding {
                    backend: handle,
                    kind: spec.kind,
                    is_static: spec.is_static,
                    rf_hang_ms: spec.rf_hang_ms,
                    net_hang_ms: spec.net_hang_ms,
                    modes: spec.modes,
                },
            );
        }
        self
    }

    pub fn build(self) -> DgidGateway {
        DgidGateway::new(
            Box::new(MockNetwork::new("Repeater")),
            self.registry,
            self.table,
            None,
        )
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The mock behind a slot.
pub fn backend(gateway: &mut DgidGateway, dgid: u8) -> &mut MockNetwork {
    gateway
        .backend_mut(dgid)
        .expect("slot is bound")
        .as_any_mut()
        .downcast_mut::<MockNetwork>()
        .expect("mock backend")
}

/// The mock behind the repeater link.
pub fn repeater(gateway: &mut DgidGateway) -> &mut MockNetwork {
    gateway
        .repeater_mut()
        .as_any_mut()
        .downcast_mut::<MockNetwork>()
        .expect("mock repeater")
}

/// Queue an RF frame on the repeater link.
pub fn rf_frame(gateway: &mut DgidGateway, dgid: u8, dt: DataType) {
    let frame_bytes = build_frame(dgid, dt, false);
    repeater(gateway).push_rx(0, frame_bytes);
}
