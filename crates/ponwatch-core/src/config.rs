// ── Runtime configuration ──
//
// These types describe how the acquisition service and sweep behave.
// They never touch disk; `ponwatch-config` builds them from the loaded
// configuration file and hands them in.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::TimeDelta;

use crate::model::{PortCoordinate, SLOTS_PER_PORT};

/// Port listings and free-slot lists live this long in the cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// The OLT clock runs this far behind the poller.
pub const DEFAULT_CLOCK_OFFSET_SECS: i64 = 7 * 3600;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning for `AcquisitionService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionSettings {
    pub cache_ttl: Duration,
    /// Added to `now - last_online` when deriving uptime.
    pub clock_offset: TimeDelta,
    /// Slot count per port used for free-slot reconciliation.
    pub slots_per_port: u32,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            clock_offset: TimeDelta::seconds(DEFAULT_CLOCK_OFFSET_SECS),
            slots_per_port: SLOTS_PER_PORT,
        }
    }
}

/// Boards x PON ports a sweep visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub boards: RangeInclusive<u32>,
    pub pons: RangeInclusive<u32>,
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            boards: 1..=2,
            pons: 1..=16,
        }
    }
}

impl ScanRange {
    /// Every coordinate in the range, board-major.
    pub fn coordinates(&self) -> impl Iterator<Item = PortCoordinate> + '_ {
        self.boards
            .clone()
            .flat_map(move |board| self.pons.clone().map(move |pon| PortCoordinate::new(board, pon)))
    }
}

/// Tuning for `SweepScheduler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSettings {
    pub range: ScanRange,
    /// Pause between the end of one pass and the start of the next.
    pub interval: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            range: ScanRange::default(),
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
