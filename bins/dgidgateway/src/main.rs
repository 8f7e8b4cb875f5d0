use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;

use ysfgw_config::{toml_config, GatewayConfig, YsfReflectors};
use ysfgw_core::{debug, GATEWAY_VERSION};
use ysfgw_engine::{directory, DgidGateway};
use ysfgw_networks::{lookup, AprsWriter, DgidNetwork, YsfNetwork};

#[cfg(unix)]
const DEFAULT_CONFIG_FILE: &str = "/etc/dgidgateway.toml";
#[cfg(not(unix))]
const DEFAULT_CONFIG_FILE: &str = "dgidgateway.toml";

#[derive(Parser, Debug)]
#[command(
    name = "dgidgateway",
    version = GATEWAY_VERSION,
    disable_version_flag = true,
    about = "YSF DG-ID gateway",
    long_about = "Routes a local System Fusion repeater onto up to 99 remote networks, one per DG-ID"
)]
struct Args {
    /// TOML config with station, repeater and DG-ID parameters
    config: Option<String>,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    if std::env::args().any(|arg| arg == "-v" || arg == "--version") {
        println!("dgidgateway version {}", GATEWAY_VERSION);
        return 0;
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayVersion | ErrorKind::DisplayHelp) => {
            print!("{}", e);
            return 0;
        }
        Err(_) => {
            eprintln!("Usage: dgidgateway [-v|--version] [config-path]");
            return 1;
        }
    };

    let config_path = args.config.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = match toml_config::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dgidgateway: cannot read {}: {}", config_path, e);
            return 1;
        }
    };

    let _log_guard = debug::setup_logging_default(config.debug_log.clone());

    // The repeater link is the only load-bearing socket at startup
    let rpt_addr = match lookup(&config.network.rpt_address, config.network.rpt_port) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("unable to resolve the repeater address: {}", e);
            return 1;
        }
    };
    let mut repeater = YsfNetwork::new(
        &config.network.local_address,
        config.network.local_port,
        "MMDVM",
        rpt_addr,
        &config.general.callsign,
        None,
        config.network.debug,
    );
    if let Err(e) = repeater.open() {
        tracing::error!("cannot open the repeater network port: {}", e);
        return 1;
    }

    let reflectors = match &config.network.ysf_hosts {
        Some(path) => match YsfReflectors::load(path) {
            Ok(reflectors) => reflectors,
            Err(e) => {
                tracing::warn!("unable to read the YSF hosts file {}: {}", path, e);
                YsfReflectors::default()
            }
        },
        None => YsfReflectors::default(),
    };

    let directory = directory::build(&config, &reflectors);
    let aprs = build_aprs(&config);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        tracing::error!("failed to set the shutdown handler: {}", e);
        return 1;
    }

    let mut gateway = DgidGateway::new(Box::new(repeater), directory.registry, directory.table, aprs);
    gateway.run(&running);

    0
}

fn build_aprs(config: &GatewayConfig) -> Option<AprsWriter> {
    let aprs = config.aprs.as_ref()?;

    let mut writer = AprsWriter::new(
        &config.general.callsign,
        &aprs.suffix,
        &aprs.address,
        aprs.port,
        &aprs.description,
        config.general.tx_frequency,
        config.general.rx_frequency,
        config.network.debug,
    );
    writer.set_static_location(
        config.general.latitude,
        config.general.longitude,
        config.general.height,
    );

    match writer.open() {
        Ok(()) => Some(writer),
        Err(e) => {
            tracing::warn!("unable to open the APRS connection: {}", e);
            None
        }
    }
}
