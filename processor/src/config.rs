use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PROCESSOR_NAME: &str = "Processor";
pub const DEFAULT_FAILURE_RATE: f64 = 0.1;

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort(raw) => write!(f, "invalid PORT value: {:?}", raw),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process-wide settings, resolved once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    pub port: u16,
    pub processor_name: String,
    pub failure_rate: f64,
    pub bind_addr: IpAddr,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            processor_name: DEFAULT_PROCESSOR_NAME.to_string(),
            failure_rate: DEFAULT_FAILURE_RATE,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };

        let processor_name = lookup("PROCESSOR_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.processor_name);

        let failure_rate = match lookup("FAILURE_RATE") {
            Some(raw) => parse_failure_rate(&raw),
            None => defaults.failure_rate,
        };

        Ok(Self {
            port,
            processor_name,
            failure_rate,
            bind_addr: defaults.bind_addr,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_failure_rate(raw: &str) -> f64 {
    let rate = match raw.trim().parse::<f64>() {
        Ok(rate) if !rate.is_nan() => rate,
        _ => {
            tracing::warn!(
                value = raw,
                default = DEFAULT_FAILURE_RATE,
                "FAILURE_RATE is not a number, using default"
            );
            return DEFAULT_FAILURE_RATE;
        }
    };

    if !(0.0..=1.0).contains(&rate) {
        let clamped = rate.clamp(0.0, 1.0);
        tracing::warn!(value = rate, clamped, "FAILURE_RATE out of range, clamping");
        return clamped;
    }

    rate
}
