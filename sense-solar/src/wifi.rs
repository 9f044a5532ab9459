//! Wi-Fi signal level of the host, read from `iwconfig`-style output.

use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;

use crate::tracing::prelude::*;

/// Report key for the signal level.
pub const RSSI_METRIC: &str = "wifi_rssi";

fn signal_level_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Signal level=(-\d+) dBm").expect("signal level pattern is valid")
    })
}

/// Extract the signal level (dBm) from wireless tool output.
///
/// Only negative dBm levels are accepted; interfaces without an association
/// (or tools reporting a quality fraction instead) give `None`.
pub fn parse_signal_level(text: &str) -> Option<i64> {
    signal_level_re()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Run `command` and parse its standard output.
///
/// Any failure (missing tool, non-zero exit, no level in the output) gives
/// `None`; the report simply goes without the metric.
pub async fn signal_level(command: &[String]) -> Option<i64> {
    let (program, args) = command.split_first()?;

    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) => {
            debug!("Failed to run {}: {}", program, e);
            return None;
        }
    };
    if !output.status.success() {
        debug!("{} exited with {}", program, output.status);
        return None;
    }

    let level = parse_signal_level(&String::from_utf8_lossy(&output.stdout));
    if level.is_none() {
        debug!("No signal level in {} output", program);
    }
    level
}
