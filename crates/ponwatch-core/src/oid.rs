// ── OID profile resolution ──
//
// Maps a (board, pon) coordinate to the OIDs addressing every ONU field on
// that port. One data-driven table replaces per-port configuration blocks;
// lookups are pure and never fall back to a neighbouring port.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::PortCoordinate;

/// Which vendor base prefix a field hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseCategory {
    /// Identity, status, serial, and timestamp tables.
    Primary,
    /// Type, transmit power, and management IP tables.
    Secondary,
}

/// Every per-ONU field the poller reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    IdName,
    OnuType,
    SerialNumber,
    RxPower,
    TxPower,
    Status,
    PhaseState,
    IpAddress,
    Description,
    LastOnline,
    LastOffline,
    OfflineReason,
    OpticalDistance,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::IdName,
        Field::OnuType,
        Field::SerialNumber,
        Field::RxPower,
        Field::TxPower,
        Field::Status,
        Field::PhaseState,
        Field::IpAddress,
        Field::Description,
        Field::LastOnline,
        Field::LastOffline,
        Field::OfflineReason,
        Field::OpticalDistance,
    ];

    pub fn base(self) -> BaseCategory {
        match self {
            Self::OnuType | Self::TxPower | Self::IpAddress => BaseCategory::Secondary,
            _ => BaseCategory::Primary,
        }
    }

    /// Power and IP tables index one more level below the ONU id.
    fn instance_suffix(self) -> Option<&'static str> {
        match self {
            Self::RxPower | Self::TxPower | Self::IpAddress => Some("1"),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::IdName => "onu_id_name",
            Self::OnuType => "onu_type",
            Self::SerialNumber => "onu_serial_number",
            Self::RxPower => "onu_rx_power",
            Self::TxPower => "onu_tx_power",
            Self::Status => "onu_status_id",
            Self::PhaseState => "onu_phase_state",
            Self::IpAddress => "onu_ip_address",
            Self::Description => "onu_description",
            Self::LastOnline => "onu_last_online_time",
            Self::LastOffline => "onu_last_offline_time",
            Self::OfflineReason => "onu_last_offline_reason",
            Self::OpticalDistance => "onu_gpon_optical_distance",
        }
    }
}

/// Field OID suffixes for one port, appended to a base prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidSuffixes {
    pub onu_id_name: String,
    pub onu_type: String,
    pub onu_serial_number: String,
    pub onu_rx_power: String,
    pub onu_tx_power: String,
    pub onu_status_id: String,
    pub onu_phase_state: String,
    pub onu_ip_address: String,
    pub onu_description: String,
    pub onu_last_online_time: String,
    pub onu_last_offline_time: String,
    pub onu_last_offline_reason: String,
    pub onu_gpon_optical_distance: String,
}

impl OidSuffixes {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::IdName => &self.onu_id_name,
            Field::OnuType => &self.onu_type,
            Field::SerialNumber => &self.onu_serial_number,
            Field::RxPower => &self.onu_rx_power,
            Field::TxPower => &self.onu_tx_power,
            Field::Status => &self.onu_status_id,
            Field::PhaseState => &self.onu_phase_state,
            Field::IpAddress => &self.onu_ip_address,
            Field::Description => &self.onu_description,
            Field::LastOnline => &self.onu_last_online_time,
            Field::LastOffline => &self.onu_last_offline_time,
            Field::OfflineReason => &self.onu_last_offline_reason,
            Field::OpticalDistance => &self.onu_gpon_optical_distance,
        }
    }
}

/// The vendor base prefixes shared by every port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseOids {
    pub primary: String,
    pub secondary: String,
}

/// Fully addressed OIDs for one port. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidProfile {
    coordinate: PortCoordinate,
    primary: String,
    secondary: String,
    suffixes: OidSuffixes,
}

impl OidProfile {
    pub fn coordinate(&self) -> PortCoordinate {
        self.coordinate
    }

    /// Table root for `field` across every ONU on the port.
    pub fn subtree(&self, field: Field) -> String {
        let base = match field.base() {
            BaseCategory::Primary => &self.primary,
            BaseCategory::Secondary => &self.secondary,
        };
        join(&[base, self.suffixes.get(field)])
    }

    /// The single object holding `field` for `onu_id`.
    pub fn object(&self, field: Field, onu_id: u32) -> String {
        let root = self.subtree(field);
        let id = onu_id.to_string();
        match field.instance_suffix() {
            Some(instance) => join(&[&root, &id, instance]),
            None => join(&[&root, &id]),
        }
    }
}

/// Join dotted OID fragments, tolerating stray leading/trailing dots.
fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim().trim_matches('.'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Lookup table from port coordinate to its OID profile.
#[derive(Debug, Clone)]
pub struct OidResolver {
    bases: BaseOids,
    profiles: BTreeMap<PortCoordinate, OidProfile>,
}

impl OidResolver {
    pub fn new(bases: BaseOids) -> Self {
        Self {
            bases,
            profiles: BTreeMap::new(),
        }
    }

    /// Register a port. Returns the profile it replaced, if any.
    pub fn insert(&mut self, coordinate: PortCoordinate, suffixes: OidSuffixes) -> Option<OidProfile> {
        let profile = OidProfile {
            coordinate,
            primary: self.bases.primary.clone(),
            secondary: self.bases.secondary.clone(),
            suffixes,
        };
        self.profiles.insert(coordinate, profile)
    }

    /// Resolve a coordinate. Unknown coordinates are an error, never an
    /// empty profile.
    pub fn resolve(&self, coordinate: PortCoordinate) -> Result<&OidProfile, CoreError> {
        self.profiles
            .get(&coordinate)
            .ok_or(CoreError::InvalidCoordinate {
                board: coordinate.board,
                pon: coordinate.pon,
            })
    }

    pub fn contains(&self, coordinate: PortCoordinate) -> bool {
        self.profiles.contains_key(&coordinate)
    }

    /// Every configured coordinate, ascending by board then pon.
    pub fn coordinates(&self) -> impl Iterator<Item = PortCoordinate> + '_ {
        self.profiles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
