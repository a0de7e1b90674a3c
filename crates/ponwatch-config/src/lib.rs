//! Static configuration for ponwatch.
//!
//! One TOML file layered over built-in defaults and overridden by
//! `PONWATCH_`-prefixed environment variables (`__` separates sections,
//! e.g. `PONWATCH_SWEEP__BOARD_MAX=1`). [`Config::into_runtime`] validates
//! the result and translates it into the types `ponwatch-core` consumes.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ponwatch_core::{
    AcquisitionSettings, BaseOids, OidResolver, OidSuffixes, PortCoordinate, RedisSettings,
    ScanRange, SweepSettings,
};
use ponwatch_snmp::SnmpTarget;

pub const ENV_PREFIX: &str = "PONWATCH_";
pub const DEFAULT_CONFIG_FILE: &str = "ponwatch.toml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("duplicate OID profile for board {board} pon {pon}")]
    DuplicatePort { board: u32, pon: u32 },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub snmp: SnmpSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub olt: OltSection,
    #[serde(default)]
    pub sweep: SweepSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// Device agent. The community string is plaintext here and wrapped in a
/// secret as soon as the runtime view is built.
#[derive(Deserialize, Serialize)]
pub struct SnmpSection {
    pub host: String,
    pub port: u16,
    pub community: String,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for SnmpSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 161,
            community: "public".into(),
            timeout_secs: 3,
            retries: 1,
        }
    }
}

impl std::fmt::Debug for SnmpSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnmpSection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("community", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("retries", &self.retries)
            .finish()
    }
}

#[derive(Deserialize, Serialize)]
pub struct CacheSection {
    /// Use Redis. When false, or when Redis is unreachable at startup, the
    /// in-process store is used.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub ttl_secs: u64,
    pub connect_timeout_secs: u64,
    pub response_timeout_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 6379,
            password: None,
            db: 0,
            ttl_secs: 300,
            connect_timeout_secs: 3,
            response_timeout_secs: 3,
        }
    }
}

impl std::fmt::Debug for CacheSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSection")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("db", &self.db)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OltSection {
    /// Base prefix for identity, status, serial and timestamp objects.
    pub base_oid_1: String,
    /// Base prefix for type, transmit power and IP objects.
    pub base_oid_2: String,
    /// Added to `now - last_online` when deriving uptime.
    pub clock_offset_secs: i64,
    pub slots_per_port: u32,
    #[serde(default)]
    pub ports: Vec<PortEntry>,
}

impl Default for OltSection {
    fn default() -> Self {
        Self {
            base_oid_1: ".1.3.6.1.4.1.3902.1082".into(),
            base_oid_2: ".1.3.6.1.4.1.3902.1012".into(),
            clock_offset_secs: ponwatch_core::config::DEFAULT_CLOCK_OFFSET_SECS,
            slots_per_port: ponwatch_core::model::SLOTS_PER_PORT,
            ports: Vec::new(),
        }
    }
}

/// One `[[olt.ports]]` table: a coordinate and its thirteen field suffixes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortEntry {
    pub board: u32,
    pub pon: u32,
    #[serde(flatten)]
    pub oids: OidSuffixes,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SweepSection {
    pub enabled: bool,
    pub board_min: u32,
    pub board_max: u32,
    pub pon_min: u32,
    pub pon_max: u32,
    pub interval_secs: u64,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            enabled: true,
            board_min: 1,
            board_max: 2,
            pon_min: 1,
            pon_max: 16,
            interval_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSection {
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then `path`, then the environment. A missing file is not an
/// error; validation decides whether what remains is usable.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    tracing::debug!(path = %path.display(), ports = config.olt.ports.len(), "configuration loaded");
    Ok(config)
}

// ── Validation & translation ────────────────────────────────────────

/// Everything the binary needs to wire the service together.
#[derive(Debug)]
pub struct Runtime {
    pub snmp: SnmpTarget,
    pub cache_enabled: bool,
    pub redis: RedisSettings,
    pub resolver: OidResolver,
    pub acquisition: AcquisitionSettings,
    pub sweep_enabled: bool,
    pub sweep: SweepSettings,
    pub listen: SocketAddr,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snmp.host.trim().is_empty() {
            return Err(invalid("snmp.host", "must not be empty"));
        }
        if self.snmp.timeout_secs == 0 {
            return Err(invalid("snmp.timeout_secs", "must be at least 1"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be at least 1"));
        }
        if self.olt.base_oid_1.trim().is_empty() || self.olt.base_oid_2.trim().is_empty() {
            return Err(invalid("olt.base_oid", "both base OIDs are required"));
        }
        if self.olt.slots_per_port == 0 {
            return Err(invalid("olt.slots_per_port", "must be at least 1"));
        }
        if self.olt.ports.is_empty() {
            return Err(invalid("olt.ports", "at least one [[olt.ports]] entry is required"));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.olt.ports {
            if entry.board == 0 || entry.pon == 0 {
                return Err(invalid(
                    "olt.ports",
                    format!("board {} pon {}: coordinates start at 1", entry.board, entry.pon),
                ));
            }
            if !seen.insert((entry.board, entry.pon)) {
                return Err(ConfigError::DuplicatePort {
                    board: entry.board,
                    pon: entry.pon,
                });
            }
        }

        let sweep = &self.sweep;
        check_range("sweep.board", sweep.board_min, sweep.board_max)?;
        check_range("sweep.pon", sweep.pon_min, sweep.pon_max)?;
        if sweep.interval_secs == 0 {
            return Err(invalid("sweep.interval_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Validate and build the runtime view.
    pub fn into_runtime(self) -> Result<Runtime, ConfigError> {
        self.validate()?;

        let Self {
            snmp,
            cache,
            olt,
            sweep,
            server,
        } = self;

        let mut resolver = OidResolver::new(BaseOids {
            primary: olt.base_oid_1,
            secondary: olt.base_oid_2,
        });
        for entry in olt.ports {
            resolver.insert(PortCoordinate::new(entry.board, entry.pon), entry.oids);
        }

        Ok(Runtime {
            snmp: SnmpTarget {
                host: snmp.host,
                port: snmp.port,
                community: SecretString::from(snmp.community),
                timeout: Duration::from_secs(snmp.timeout_secs),
                retries: snmp.retries,
            },
            cache_enabled: cache.enabled,
            redis: RedisSettings {
                host: cache.host,
                port: cache.port,
                password: cache.password.map(SecretString::from),
                db: cache.db,
                connect_timeout: Duration::from_secs(cache.connect_timeout_secs),
                response_timeout: Duration::from_secs(cache.response_timeout_secs),
            },
            resolver,
            acquisition: AcquisitionSettings {
                cache_ttl: Duration::from_secs(cache.ttl_secs),
                clock_offset: TimeDelta::seconds(olt.clock_offset_secs),
                slots_per_port: olt.slots_per_port,
            },
            sweep_enabled: sweep.enabled,
            sweep: SweepSettings {
                range: ScanRange {
                    boards: sweep.board_min..=sweep.board_max,
                    pons: sweep.pon_min..=sweep.pon_max,
                },
                interval: Duration::from_secs(sweep.interval_secs),
            },
            listen: server.listen,
        })
    }
}

fn check_range(field: &str, min: u32, max: u32) -> Result<(), ConfigError> {
    if min == 0 {
        return Err(invalid(field, "ranges start at 1"));
    }
    if min > max {
        return Err(invalid(field, format!("min {min} is greater than max {max}")));
    }
    Ok(())
}
