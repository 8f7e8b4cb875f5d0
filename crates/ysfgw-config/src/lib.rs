//! Configuration for the DG-ID gateway

pub mod gateway_config;
pub mod hosts;
pub mod toml_config;

pub use gateway_config::{
    CfgAprs, CfgDgid, CfgGeneral, CfgImrsDestination, CfgNetwork, DgidType, GatewayConfig,
};
pub use hosts::{YsfReflector, YsfReflectors};
