use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::gateway_config::{
    CfgAprs, CfgDgid, CfgGeneral, CfgImrsDestination, CfgNetwork, DgidType, GatewayConfig,
};

/// Build `GatewayConfig` from a TOML configuration string
pub fn from_toml_str(toml_str: &str) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "1.0";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if !root.general.extra.is_empty() {
        return Err(format!("Unrecognized fields in general: {:?}", sorted_keys(&root.general.extra)).into());
    }
    if !root.network.extra.is_empty() {
        return Err(format!("Unrecognized fields in network: {:?}", sorted_keys(&root.network.extra)).into());
    }
    if let Some(ref aprs) = root.aprs {
        if !aprs.extra.is_empty() {
            return Err(format!("Unrecognized fields in aprs: {:?}", sorted_keys(&aprs.extra)).into());
        }
    }

    let mut dgids = Vec::new();
    for entry in &root.dgid {
        if !entry.extra.is_empty() {
            return Err(format!(
                "Unrecognized fields in dgid {}: {:?}",
                entry.dgid,
                sorted_keys(&entry.extra)
            )
            .into());
        }
        if entry.dgid == 0 || entry.dgid > 99 {
            return Err(format!("DG-ID {} out of range, expect 1..99", entry.dgid).into());
        }
        if dgids.iter().any(|d: &CfgDgid| d.dgid == entry.dgid) {
            return Err(format!("DG-ID {} defined more than once", entry.dgid).into());
        }

        match entry.kind {
            DgidType::Parrot | DgidType::Ysf2Dmr | DgidType::Ysf2Nxdn | DgidType::Ysf2P25 => {
                if entry.address.is_none() || entry.port.is_none() {
                    return Err(format!(
                        "DG-ID {}: address and port are required for this type",
                        entry.dgid
                    )
                    .into());
                }
            }
            DgidType::Imrs => {
                if entry.destination.is_empty() {
                    return Err(format!(
                        "DG-ID {}: at least one destination is required for IMRS",
                        entry.dgid
                    )
                    .into());
                }
            }
            DgidType::Ysf | DgidType::Fcs => {}
        }

        let mut destinations = Vec::new();
        for dest in &entry.destination {
            if !dest.extra.is_empty() {
                return Err(format!(
                    "Unrecognized fields in dgid {} destination: {:?}",
                    entry.dgid,
                    sorted_keys(&dest.extra)
                )
                .into());
            }
            destinations.push(CfgImrsDestination {
                dgid: dest.dgid,
                address: dest.address.clone(),
            });
        }

        dgids.push(CfgDgid {
            dgid: entry.dgid,
            kind: entry.kind,
            name: entry.name.clone(),
            local_port: entry.local_port,
            is_static: entry.is_static,
            rf_hang_time_secs: entry.rf_hang_time,
            net_hang_time_secs: entry.net_hang_time,
            debug: entry.debug,
            address: entry.address.clone(),
            port: entry.port,
            options: entry.options.clone(),
            destinations,
        });
    }

    Ok(GatewayConfig {
        debug_log: root.debug_log,
        general: CfgGeneral {
            callsign: root.general.callsign,
            suffix: root.general.suffix.unwrap_or_default(),
            id: root.general.id,
            rx_frequency: root.general.rx_frequency,
            tx_frequency: root.general.tx_frequency,
            latitude: root.general.latitude.unwrap_or(0.0),
            longitude: root.general.longitude.unwrap_or(0.0),
            height: root.general.height.unwrap_or(0),
        },
        network: CfgNetwork {
            local_address: root.network.local_address.unwrap_or_else(|| "0.0.0.0".to_string()),
            local_port: root.network.local_port,
            rpt_address: root.network.rpt_address,
            rpt_port: root.network.rpt_port,
            ysf_hosts: root.network.ysf_hosts,
            debug: root.network.debug,
        },
        dgids,
        aprs: root.aprs.map(|aprs| CfgAprs {
            address: aprs.address,
            port: aprs.port,
            suffix: aprs.suffix.unwrap_or_else(|| "Y".to_string()),
            description: aprs.description.unwrap_or_default(),
        }),
    })
}

/// Build `GatewayConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `GatewayConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    from_reader(r)
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

fn default_hang_time() -> u32 {
    60
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    general: GeneralDto,
    network: NetworkDto,

    #[serde(default)]
    dgid: Vec<DgidDto>,

    #[serde(default)]
    aprs: Option<AprsDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct GeneralDto {
    callsign: String,
    suffix: Option<String>,
    id: u32,
    rx_frequency: u32,
    tx_frequency: u32,
    latitude: Option<f32>,
    longitude: Option<f32>,
    height: Option<i32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct NetworkDto {
    local_address: Option<String>,
    local_port: u16,
    rpt_address: String,
    rpt_port: u16,
    ysf_hosts: Option<String>,

    #[serde(default)]
    debug: bool,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct DgidDto {
    dgid: u8,

    #[serde(rename = "type")]
    kind: DgidType,

    #[serde(default)]
    name: String,

    #[serde(default)]
    local_port: u16,

    #[serde(rename = "static", default)]
    is_static: bool,

    #[serde(default = "default_hang_time")]
    rf_hang_time: u32,

    #[serde(default = "default_hang_time")]
    net_hang_time: u32,

    #[serde(default)]
    debug: bool,

    address: Option<String>,
    port: Option<u16>,
    options: Option<String>,

    #[serde(default)]
    destination: Vec<DestinationDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct DestinationDto {
    dgid: u8,
    address: String,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct AprsDto {
    address: String,
    port: u16,
    suffix: Option<String>,
    description: Option<String>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
