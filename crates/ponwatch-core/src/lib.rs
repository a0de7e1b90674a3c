//! Inventory acquisition, caching, and sweep metrics for a GPON OLT.
//!
//! - **[`AcquisitionService`]**: answers ONU queries (port listings, single
//!   ONU detail, free slots, serial listings, pages) by combining the
//!   [`OidResolver`], a [`CacheStore`], per-key [`Coalescer`]s, and a
//!   [`DeviceClient`].
//!
//! - **[`SweepScheduler`]**: long-lived task that walks the configured
//!   board/pon range on a fixed interval and publishes each completed pass
//!   to [`TerminalMetrics`] as a single snapshot.
//!
//! - **Decoders** ([`decode`]): pure conversions from raw SNMP values into
//!   the canonical domain model ([`model`]).

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod decode;
pub mod device;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod model;
pub mod oid;
pub mod service;
pub mod sweep;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheBackend, CacheError, CacheStore, MemoryCache, RedisCache, RedisSettings};
pub use coalesce::Coalescer;
pub use config::{AcquisitionSettings, ScanRange, SweepSettings};
pub use device::{DeviceClient, InMemoryDevice};
pub use error::{CoreError, DecodeError};
pub use metrics::TerminalMetrics;
pub use oid::{BaseOids, Field, OidProfile, OidResolver, OidSuffixes};
pub use service::{AcquisitionService, Clock};
pub use sweep::{SweepScheduler, SweepSnapshot};

pub use model::{
    DeviceTimestamp, FreeSlot, PageRequest, PhaseState, PortCoordinate, TerminalDetail,
    TerminalIdentity, TerminalPage, TerminalSerial, TerminalStatus, TerminalSummary, TimeSpan,
};
