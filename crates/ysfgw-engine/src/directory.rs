//! Builds the backend registry and DG-ID slot table from configuration
//!
//! Resolution or open failures clear the affected slot and the gateway
//! carries on; only the repeater link is load-bearing at startup.

use ysfgw_config::{CfgDgid, DgidType, GatewayConfig, YsfReflectors};
use ysfgw_core::locator;
use ysfgw_networks::{lookup, DgidNetwork, FcsNetwork, ImrsDestination, ImrsNetwork, YsfNetwork};

use crate::table::{BackendHandle, BackendKind, BackendRegistry, DgidBinding, DgidTable};

pub struct Directory {
    pub registry: BackendRegistry,
    pub table: DgidTable,
    pub imrs: Option<BackendHandle>,
}

pub fn build(config: &GatewayConfig, reflectors: &YsfReflectors) -> Directory {
    let mut registry = BackendRegistry::new();
    let mut table = DgidTable::new();

    // The shared IMRS backend is created once and aliased by every IMRS
    // slot. If it fails to open, all IMRS slots stay clear.
    let imrs_entries: Vec<&CfgDgid> =
        config.dgids.iter().filter(|entry| entry.kind == DgidType::Imrs).collect();
    let mut imrs_handle = None;
    if !imrs_entries.is_empty() {
        let mut imrs = ImrsNetwork::new();
        for entry in &imrs_entries {
            let mut destinations = Vec::new();
            for dest in &entry.destinations {
                match lookup(&dest.address, ysfgw_networks::imrs::IMRS_PORT) {
                    Ok(addr) => destinations.push(ImrsDestination { dgid: dest.dgid, addr }),
                    Err(e) => {
                        tracing::warn!("unable to resolve the address for {}: {}", dest.address, e)
                    }
                }
            }
            imrs.add_dgid(entry.dgid, &entry.name, destinations, entry.debug);
        }

        match imrs.open() {
            Ok(()) => {
                let handle = registry.add(Box::new(imrs));
                for entry in &imrs_entries {
                    // IMRS slots are kept linked for the process lifetime
                    table.insert(
                        entry.dgid,
                        DgidBinding {
                            backend: handle,
                            kind: BackendKind::Imrs,
                            is_static: true,
                            rf_hang_ms: entry.rf_hang_time_secs * 1000,
                            net_hang_ms: entry.net_hang_time_secs * 1000,
                            modes: BackendKind::Imrs.default_modes(),
                        },
                    );
                }
                imrs_handle = Some(handle);
            }
            Err(e) => {
                tracing::warn!(
                    "unable to open the IMRS network, dropping {} IMRS slots: {}",
                    imrs_entries.len(),
                    e
                );
            }
        }
    }

    let grid = locator::locator(config.general.latitude, config.general.longitude);

    for entry in config.dgids.iter().filter(|entry| entry.kind != DgidType::Imrs) {
        let dgid = entry.dgid;

        let (kind, mut network): (BackendKind, Box<dyn DgidNetwork>) = match entry.kind {
            DgidType::Ysf => {
                let Some(reflector) = reflectors.find_by_name(&entry.name) else {
                    tracing::warn!("DG-ID {}: unknown YSF reflector {}", dgid, entry.name);
                    continue;
                };
                let dest = match lookup(&reflector.address, reflector.port) {
                    Ok(addr) => addr,
                    Err(e) => {
                        tracing::warn!("DG-ID {}: {}", dgid, e);
                        continue;
                    }
                };
                let network = YsfNetwork::new(
                    "0.0.0.0",
                    entry.local_port,
                    &reflector.name,
                    dest,
                    &config.general.callsign,
                    entry.options.clone(),
                    entry.debug,
                );
                (BackendKind::Ysf, Box::new(network))
            }
            DgidType::Fcs => {
                let network = FcsNetwork::new(
                    &entry.name,
                    entry.local_port,
                    &config.general.callsign,
                    config.general.rx_frequency,
                    config.general.tx_frequency,
                    &grid,
                    config.general.id,
                    entry.options.clone(),
                    entry.debug,
                );
                (BackendKind::Fcs, Box::new(network))
            }
            DgidType::Parrot | DgidType::Ysf2Dmr | DgidType::Ysf2Nxdn | DgidType::Ysf2P25 => {
                let (Some(address), Some(port)) = (&entry.address, entry.port) else {
                    tracing::warn!("DG-ID {}: missing address or port", dgid);
                    continue;
                };
                let dest = match lookup(address, port) {
                    Ok(addr) => addr,
                    Err(e) => {
                        tracing::warn!("DG-ID {}: {}", dgid, e);
                        continue;
                    }
                };
                let kind = BackendKind::from(entry.kind);
                let label = match kind {
                    BackendKind::Parrot => "PARROT",
                    BackendKind::Ysf2Dmr => "YSF2DMR",
                    BackendKind::Ysf2Nxdn => "YSF2NXDN",
                    _ => "YSF2P25",
                };
                let network = YsfNetwork::new(
                    "0.0.0.0",
                    entry.local_port,
                    label,
                    dest,
                    &config.general.callsign,
                    entry.options.clone(),
                    entry.debug,
                );
                (kind, Box::new(network))
            }
            DgidType::Imrs => unreachable!("filtered above"),
        };

        if let Err(e) = network.open() {
            tracing::warn!("DG-ID {}: unable to open the network: {}", dgid, e);
            continue;
        }

        let handle = registry.add(network);
        table.insert(
            dgid,
            DgidBinding {
                backend: handle,
                kind,
                is_static: entry.is_static,
                rf_hang_ms: entry.rf_hang_time_secs * 1000,
                net_hang_ms: entry.net_hang_time_secs * 1000,
                modes: kind.default_modes(),
            },
        );
    }

    Directory { registry, table, imrs: imrs_handle }
}
