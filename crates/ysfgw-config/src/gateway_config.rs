use serde::Deserialize;

/// Backend type bound to a DG-ID slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DgidType {
    #[serde(rename = "YSF")]
    Ysf,
    #[serde(rename = "FCS")]
    Fcs,
    #[serde(rename = "IMRS")]
    Imrs,
    #[serde(rename = "Parrot")]
    Parrot,
    #[serde(rename = "YSF2DMR")]
    Ysf2Dmr,
    #[serde(rename = "YSF2NXDN")]
    Ysf2Nxdn,
    #[serde(rename = "YSF2P25")]
    Ysf2P25,
}

/// Station identity and position.
#[derive(Debug, Clone)]
pub struct CfgGeneral {
    pub callsign: String,
    pub suffix: String,
    pub id: u32,
    pub rx_frequency: u32,
    pub tx_frequency: u32,
    pub latitude: f32,
    pub longitude: f32,
    pub height: i32,
}

/// Repeater link and local bind parameters.
#[derive(Debug, Clone)]
pub struct CfgNetwork {
    pub local_address: String,
    pub local_port: u16,
    pub rpt_address: String,
    pub rpt_port: u16,
    pub ysf_hosts: Option<String>,
    pub debug: bool,
}

/// One fan-out peer of an IMRS-bound slot.
#[derive(Debug, Clone)]
pub struct CfgImrsDestination {
    pub dgid: u8,
    pub address: String,
}

/// One DG-ID slot definition.
#[derive(Debug, Clone)]
pub struct CfgDgid {
    pub dgid: u8,
    pub kind: DgidType,
    pub name: String,
    pub local_port: u16,
    pub is_static: bool,
    pub rf_hang_time_secs: u32,
    pub net_hang_time_secs: u32,
    pub debug: bool,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub options: Option<String>,
    pub destinations: Vec<CfgImrsDestination>,
}

/// APRS-IS reporting parameters.
#[derive(Debug, Clone)]
pub struct CfgAprs {
    pub address: String,
    pub port: u16,
    pub suffix: String,
    pub description: String,
}

/// The complete parsed gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub debug_log: Option<String>,
    pub general: CfgGeneral,
    pub network: CfgNetwork,
    pub dgids: Vec<CfgDgid>,
    pub aprs: Option<CfgAprs>,
}
