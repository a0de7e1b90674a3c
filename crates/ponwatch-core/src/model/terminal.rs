// ── ONU domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DeviceTimestamp, TerminalIdentity, TimeSpan};

/// Reachability as reported by the OLT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    Online,
    Offline,
}

impl TerminalStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    /// Gauge value: 1 online, 0 otherwise.
    pub fn as_gauge(self) -> f64 {
        if self.is_online() { 1.0 } else { 0.0 }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
        })
    }
}

/// GPON registration phase of an ONU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseState {
    Logging,
    Los,
    SyncMib,
    /// Fully ranged and passing traffic.
    Ready,
    DyingGasp,
    AuthFailed,
    Offline,
    Unknown,
}

impl PhaseState {
    /// Map the vendor's phase code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Logging,
            2 => Self::Los,
            3 => Self::SyncMib,
            4 => Self::Ready,
            5 => Self::DyingGasp,
            6 => Self::AuthFailed,
            7 => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logging => "logging",
            Self::Los => "los",
            Self::SyncMib => "syncMib",
            Self::Ready => "ready",
            Self::DyingGasp => "dyingGasp",
            Self::AuthFailed => "authFailed",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a port listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSummary {
    #[serde(flatten)]
    pub identity: TerminalIdentity,
    pub name: Option<String>,
    pub onu_type: Option<String>,
    pub serial_number: Option<String>,
    /// Receive power in dBm; absent when unreadable or implausible.
    pub rx_power_dbm: Option<f64>,
    pub status: Option<TerminalStatus>,
}

impl TerminalSummary {
    /// A summary with only the identity filled in.
    pub fn bare(identity: TerminalIdentity) -> Self {
        Self {
            identity,
            name: None,
            onu_type: None,
            serial_number: None,
            rx_power_dbm: None,
            status: None,
        }
    }
}

/// Everything known about one ONU.
///
/// `uptime` and `last_down_duration` are derived from the two timestamps,
/// never read from the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalDetail {
    #[serde(flatten)]
    pub summary: TerminalSummary,
    pub tx_power_dbm: Option<f64>,
    pub ip_address: Option<String>,
    pub description: Option<String>,
    pub last_online: Option<DeviceTimestamp>,
    pub last_offline: Option<DeviceTimestamp>,
    pub uptime: Option<TimeSpan>,
    pub last_down_duration: Option<TimeSpan>,
    pub offline_reason: Option<String>,
    /// Fibre distance to the OLT in metres.
    pub optical_distance_m: Option<i64>,
    pub phase_state: Option<PhaseState>,
}

impl TerminalDetail {
    pub fn new(summary: TerminalSummary) -> Self {
        Self {
            summary,
            tx_power_dbm: None,
            ip_address: None,
            description: None,
            last_online: None,
            last_offline: None,
            uptime: None,
            last_down_duration: None,
            offline_reason: None,
            optical_distance_m: None,
            phase_state: None,
        }
    }

    pub fn identity(&self) -> TerminalIdentity {
        self.summary.identity
    }

    /// Whether optical power readings are meaningful for this ONU.
    pub fn is_operational(&self) -> bool {
        self.phase_state.is_some_and(PhaseState::is_ready)
            || self.summary.status.is_some_and(TerminalStatus::is_online)
    }
}

/// An ONU id paired with its serial number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSerial {
    #[serde(flatten)]
    pub identity: TerminalIdentity,
    pub serial_number: Option<String>,
}
