//! Take one reading of every configured sensor and print it as a JSON object.
//!
//! Usage: `sense-solar [--probe] [CONFIG.json]`
//!
//! Meant to be run periodically by cron or a systemd timer. Sensors that do
//! not answer are left out of the report; the program only fails when the
//! configuration or the bus itself is unusable.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use sense_solar::config::Config;
use sense_solar::scan::Report;
use sense_solar::tracing::{self, prelude::*};
use sense_solar::transport::LinuxI2c;
use sense_solar::wifi;

struct Args {
    probe: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        probe: false,
        config: None,
    };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--probe" => args.probe = true,
            flag if flag.starts_with('-') => bail!("unknown option {}", flag),
            path if args.config.is_none() => args.config = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {}", extra),
        }
    }
    Ok(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing::init_journald_or_stderr();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };

    let bus = LinuxI2c::open(&config.bus)
        .with_context(|| format!("failed to open {}", config.bus.display()))?;
    let mut sensors = config.build_sensors(&bus);
    let scanner = config.scan.scanner();

    if args.probe {
        let results = scanner.probe_all(&mut sensors).await;
        for result in &results {
            info!(
                "{} at 0x{:02X}: {}",
                result.name,
                result.address,
                if result.present { "present" } else { "absent" }
            );
        }
        println!("{}", serde_json::to_string(&results)?);
        return Ok(());
    }

    let mut report: Report = scanner.scan(&mut sensors).await;

    if config.wifi.enabled {
        if let Some(rssi) = wifi::signal_level(&config.wifi.command).await {
            report.insert_integer(wifi::RSSI_METRIC, rssi);
        }
    }

    debug!("Report has {} metrics", report.len());
    println!("{}", report.to_json()?);
    Ok(())
}
