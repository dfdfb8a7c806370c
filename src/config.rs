//! Server configuration
//!
//! Defaults match a local development server; `from_env` lets a deployment
//! override the listen address and heartbeat interval.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default interval between heartbeat sweeps
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Channel buffer size for hub commands
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Per-connection outbound frame buffer
pub const OUTBOUND_BUFFER_SIZE: usize = 32;

const ENV_BIND_ADDR: &str = "WS_BIND_ADDR";
const ENV_HEARTBEAT_SECS: &str = "WS_HEARTBEAT_SECS";

/// Options passed to `App::new`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Time between heartbeat sweeps
    pub heartbeat_interval: Duration,
    /// Capacity of the hub command channel
    pub command_buffer: usize,
    /// Capacity of each connection's outbound frame channel
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            command_buffer: COMMAND_BUFFER_SIZE,
            outbound_buffer: OUTBOUND_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Build a config from `WS_BIND_ADDR` and `WS_HEARTBEAT_SECS`, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Ok(addr) = env::var(ENV_BIND_ADDR) {
            config.bind_addr = addr.parse()?;
        }

        if let Ok(secs) = env::var(ENV_HEARTBEAT_SECS) {
            let secs: u64 = secs
                .parse()
                .map_err(|_| AppError::InvalidConfig(format!("{}={}", ENV_HEARTBEAT_SECS, secs)))?;
            config = config.with_heartbeat_interval(Duration::from_secs(secs))?;
        }

        Ok(config)
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Listen on the given port, keeping the configured host
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the heartbeat interval; a zero interval is rejected
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Result<Self, AppError> {
        if interval.is_zero() {
            return Err(AppError::InvalidConfig(
                "heartbeat interval must be non-zero".to_string(),
            ));
        }
        self.heartbeat_interval = interval;
        Ok(self)
    }

    pub fn with_outbound_buffer(mut self, size: usize) -> Self {
        self.outbound_buffer = size.max(1);
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }
}
