//! Configuration module for environment variable parsing.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::model::Pacing;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding identities.json, templates.json and campaigns.json
    pub data_dir: PathBuf,

    /// Pause between scheduler scans of the campaign collection
    pub scan_interval: Duration,

    /// Pause between connection supervisor rounds
    pub supervisor_interval: Duration,

    /// HTTP request timeout for gateway calls
    pub request_timeout: Duration,

    /// Pacing used by campaigns that do not set their own
    pub default_pacing: Pacing,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let (min_delay_ms, max_delay_ms) = parse_range("DEFAULT_PACING_MS", (2000, 4000));

        Config {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),

            scan_interval: Duration::from_millis(parse_u64("SCAN_INTERVAL_MS", 3000)),

            supervisor_interval: Duration::from_millis(parse_u64("SUPERVISOR_INTERVAL_MS", 20_000)),

            request_timeout: Duration::from_millis(parse_u64("REQUEST_TIMEOUT_MS", 15_000)),

            default_pacing: Pacing {
                min_delay_ms,
                max_delay_ms,
            },
        }
    }
}

fn parse_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid integer, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a comma-separated range like "2000,4000" into a tuple.
fn parse_range(name: &str, default: (u64, u64)) -> (u64, u64) {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        warn!(env_var = name, value = %raw, "Invalid range format, using default");
        return default;
    }

    match (parts[0].trim().parse::<u64>(), parts[1].trim().parse::<u64>()) {
        (Ok(min), Ok(max)) if min <= max => (min, max),
        _ => {
            warn!(env_var = name, value = %raw, "Invalid range values, using default");
            default
        }
    }
}
