//! DG-ID routing and link-control engine
//!
//! Multiplexes the single repeater link onto up to 99 logically-independent
//! remote networks, one per DG-ID, switching the active conversation
//! frame-by-frame.

pub mod directory;
pub mod gateway;
pub mod table;

pub use directory::Directory;
pub use gateway::DgidGateway;
pub use table::{BackendHandle, BackendKind, BackendRegistry, DgidBinding, DgidTable, DGID_SLOTS};
