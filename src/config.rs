//! Configuration utilities (ports, store location, game timings)

use std::time::Duration;
use std::{env, net::{Ipv4Addr, SocketAddr}};

/// Socket address to bind the server to.
///
/// Reads the `PORT` env var or defaults to 8080, binds to 0.0.0.0.
pub fn server_addr() -> SocketAddr {
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080);
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Redis connection string from `REDIS_URL`, if configured.
///
/// When unset the server keeps its state in process memory.
pub fn redis_url() -> Option<String> {
    env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

/// Rules and timings shared by every room.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub max_players: usize,
    pub min_players: usize,
    /// How long a heartbeat keeps a player alive.
    pub heartbeat_ttl: Duration,
    /// Minimum spacing between opportunistic sweeps.
    pub sweep_interval: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: 4,
            min_players: 2,
            heartbeat_ttl: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl GameSettings {
    /// Defaults, with timings overridable through `HEARTBEAT_TTL_SECS` and
    /// `SWEEP_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            heartbeat_ttl: secs_var("HEARTBEAT_TTL_SECS", defaults.heartbeat_ttl.as_secs()),
            sweep_interval: secs_var("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs()),
            ..defaults
        }
    }
}
