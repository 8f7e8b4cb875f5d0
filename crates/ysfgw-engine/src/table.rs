//! Backend registry and DG-ID slot table

use ysfgw_config::DgidType;
use ysfgw_core::ModeMask;
use ysfgw_networks::DgidNetwork;

pub const DGID_SLOTS: usize = 100;

/// Identity of a backend in the registry.
///
/// Slots hold these instead of owning the driver, so several slots can alias
/// one backend and teardown can dedupe by comparing handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle(usize);

/// Owns every backend driver exactly once.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn DgidNetwork>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, backend: Box<dyn DgidNetwork>) -> BackendHandle {
        self.backends.push(backend);
        BackendHandle(self.backends.len() - 1)
    }

    pub fn get_mut(&mut self, handle: BackendHandle) -> &mut dyn DgidNetwork {
        self.backends[handle.0].as_mut()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn DgidNetwork>> {
        self.backends.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// What kind of remote sits behind a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ysf,
    Fcs,
    Imrs,
    Parrot,
    Ysf2Dmr,
    Ysf2Nxdn,
    Ysf2P25,
}

impl BackendKind {
    /// Data types the backend can carry.
    pub fn default_modes(self) -> ModeMask {
        match self {
            BackendKind::Ysf | BackendKind::Fcs | BackendKind::Imrs | BackendKind::Parrot => {
                ModeMask::ALL
            }
            BackendKind::Ysf2Dmr | BackendKind::Ysf2Nxdn => ModeMask::VD_ONLY,
            BackendKind::Ysf2P25 => ModeMask::VOICE_FR_ONLY,
        }
    }
}

impl From<DgidType> for BackendKind {
    fn from(kind: DgidType) -> Self {
        match kind {
            DgidType::Ysf => BackendKind::Ysf,
            DgidType::Fcs => BackendKind::Fcs,
            DgidType::Imrs => BackendKind::Imrs,
            DgidType::Parrot => BackendKind::Parrot,
            DgidType::Ysf2Dmr => BackendKind::Ysf2Dmr,
            DgidType::Ysf2Nxdn => BackendKind::Ysf2Nxdn,
            DgidType::Ysf2P25 => BackendKind::Ysf2P25,
        }
    }
}

/// Per-slot routing policy.
#[derive(Debug, Clone)]
pub struct DgidBinding {
    pub backend: BackendHandle,
    pub kind: BackendKind,
    pub is_static: bool,
    pub rf_hang_ms: u32,
    pub net_hang_ms: u32,
    pub modes: ModeMask,
}

/// Fixed directory of DG-ID 1..99 to binding. Index 0 is reserved.
pub struct DgidTable {
    slots: [Option<DgidBinding>; DGID_SLOTS],
}

impl DgidTable {
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| None) }
    }

    pub fn insert(&mut self, dgid: u8, binding: DgidBinding) {
        self.slots[dgid as usize] = Some(binding);
    }

    pub fn clear(&mut self, dgid: u8) {
        self.slots[dgid as usize] = None;
    }

    pub fn get(&self, dgid: u8) -> Option<&DgidBinding> {
        self.slots.get(dgid as usize).and_then(|slot| slot.as_ref())
    }

    /// Bound slots in DG-ID order, index 0 excluded.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &DgidBinding)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(dgid, slot)| slot.as_ref().map(|binding| (dgid as u8, binding)))
    }
}

impl Default for DgidTable {
    fn default() -> Self {
        Self::new()
    }
}
