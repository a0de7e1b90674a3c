// ── Acquisition service ──
//
// Answers every ONU query by combining the resolver, the cache, the
// coalescer, and the device. Structural failures (unknown port, failed
// identity walk) abort the call; per-field failures leave that field empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use ponwatch_snmp::{Pdu, RawValue, WalkControl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::cache::{self, CacheError, CacheStore};
use crate::coalesce::Coalescer;
use crate::config::AcquisitionSettings;
use crate::decode;
use crate::device::DeviceClient;
use crate::error::{CoreError, DecodeError};
use crate::inventory;
use crate::model::{
    FreeSlot, PageRequest, PortCoordinate, TerminalDetail, TerminalIdentity, TerminalPage,
    TerminalSerial, TerminalSummary,
};
use crate::oid::{Field, OidProfile, OidResolver};

/// Source of "now" for uptime derivation, in the poller's UTC clock.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

type Decoder<T> = fn(&RawValue) -> Result<T, DecodeError>;

pub struct AcquisitionService<D, C> {
    device: D,
    cache: C,
    resolver: OidResolver,
    settings: AcquisitionSettings,
    clock: Clock,

    listings: Coalescer<Vec<TerminalSummary>>,
    details: Coalescer<TerminalDetail>,
    slots: Coalescer<Vec<FreeSlot>>,
    serials: Coalescer<Vec<TerminalSerial>>,
    pages: Coalescer<TerminalPage>,
    fetches: Coalescer<Pdu>,
}

impl<D: DeviceClient, C: CacheStore> AcquisitionService<D, C> {
    pub fn new(device: D, cache: C, resolver: OidResolver, settings: AcquisitionSettings) -> Self {
        Self {
            device,
            cache,
            resolver,
            settings,
            clock: Arc::new(|| Utc::now().naive_utc()),
            listings: Coalescer::new(),
            details: Coalescer::new(),
            slots: Coalescer::new(),
            serials: Coalescer::new(),
            pages: Coalescer::new(),
            fetches: Coalescer::new(),
        }
    }

    /// Replace the wall clock used for uptime.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn resolver(&self) -> &OidResolver {
        &self.resolver
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Every ONU on a port with its summary fields, ascending by id.
    /// Served from cache when a fresh entry exists.
    pub async fn list_port(&self, port: PortCoordinate) -> Result<Vec<TerminalSummary>, CoreError> {
        let profile = self.resolver.resolve(port)?;
        let key = cache::port_listing_key(port);
        let flight = format!("list_port:{}:{}", port.board, port.pon);

        self.listings
            .run(&flight, || async move {
                if let Some(cached) = self.cached::<Vec<TerminalSummary>>(&key).await {
                    return Ok(cached);
                }

                let found = self.discover(port, &profile.subtree(Field::IdName)).await?;
                let mut terminals = Vec::with_capacity(found.len());
                for (onu_id, pdu) in found {
                    let name = decoded(&pdu, Field::IdName, decode::display_string);
                    terminals.push(self.summary(profile, port.terminal(onu_id), name).await);
                }
                info!(board = port.board, pon = port.pon, count = terminals.len(), "port listed from device");

                if let Err(e) = self.store(&key, &terminals).await {
                    warn!(key = %key, error = %e, "failed to cache port listing");
                }
                Ok(terminals)
            })
            .await
    }

    /// Full detail for one ONU, always read from the device.
    pub async fn get_terminal(&self, identity: TerminalIdentity) -> Result<TerminalDetail, CoreError> {
        let port = identity.port();
        let profile = self.resolver.resolve(port)?;
        let flight = format!("terminal:{}:{}:{}", port.board, port.pon, identity.onu_id);

        self.details
            .run(&flight, || async move {
                let root = profile.object(Field::IdName, identity.onu_id);
                let mut found = self.discover(port, &root).await?;
                let pdu = found
                    .remove(&identity.onu_id)
                    .ok_or(CoreError::TerminalNotFound {
                        board: port.board,
                        pon: port.pon,
                        onu_id: identity.onu_id,
                    })?;

                let name = decoded(&pdu, Field::IdName, decode::display_string);
                let (summary, status) = self.summary_with_status(profile, identity, name).await;
                Ok(self.detail(profile, summary, status).await)
            })
            .await
    }

    /// Unprovisioned slots on a port, ascending. Served from cache when a
    /// fresh entry exists.
    pub async fn free_slots(&self, port: PortCoordinate) -> Result<Vec<FreeSlot>, CoreError> {
        let profile = self.resolver.resolve(port)?;
        let key = cache::free_slots_key(port);
        let flight = format!("free_slots:{}:{}", port.board, port.pon);

        self.slots
            .run(&flight, || async move {
                if let Some(cached) = self.cached::<Vec<FreeSlot>>(&key).await {
                    return Ok(cached);
                }
                let slots = self.compute_free_slots(port, profile).await?;
                if let Err(e) = self.store(&key, &slots).await {
                    warn!(key = %key, error = %e, "failed to cache free slots");
                }
                Ok(slots)
            })
            .await
    }

    /// Recompute free slots from the device and overwrite the cache entry.
    /// A failed write is reported, since the write is the point of the call.
    pub async fn refresh_free_slots(&self, port: PortCoordinate) -> Result<Vec<FreeSlot>, CoreError> {
        let profile = self.resolver.resolve(port)?;
        let key = cache::free_slots_key(port);
        let flight = format!("refresh_free_slots:{}:{}", port.board, port.pon);

        self.slots
            .run(&flight, || async move {
                let slots = self.compute_free_slots(port, profile).await?;
                self.store(&key, &slots).await?;
                debug!(key = %key, free = slots.len(), "free slots refreshed");
                Ok(slots)
            })
            .await
    }

    /// ONU ids with serial numbers, ascending. Never cached.
    pub async fn list_ids_with_serial(
        &self,
        port: PortCoordinate,
    ) -> Result<Vec<TerminalSerial>, CoreError> {
        let profile = self.resolver.resolve(port)?;
        let flight = format!("serials:{}:{}", port.board, port.pon);

        self.serials
            .run(&flight, || async move {
                let found = self.discover(port, &profile.subtree(Field::IdName)).await?;
                let mut serials = Vec::with_capacity(found.len());
                for onu_id in found.into_keys() {
                    let serial_number = self
                        .field(profile, Field::SerialNumber, onu_id, decode::serial_number)
                        .await;
                    serials.push(TerminalSerial {
                        identity: port.terminal(onu_id),
                        serial_number,
                    });
                }
                Ok(serials)
            })
            .await
    }

    /// One page of a port listing plus the port's total ONU count. Only the
    /// requested page is enriched. Never cached.
    pub async fn list_port_paged(
        &self,
        port: PortCoordinate,
        page: PageRequest,
    ) -> Result<TerminalPage, CoreError> {
        let profile = self.resolver.resolve(port)?;
        let flight = format!("page:{}:{}:{}:{}", port.board, port.pon, page.index, page.size);

        self.pages
            .run(&flight, || async move {
                let found = self.discover(port, &profile.subtree(Field::IdName)).await?;
                let total = found.len();
                let window = page.window(total);

                let mut terminals = Vec::with_capacity(window.len());
                for (onu_id, pdu) in found.into_iter().skip(window.start).take(window.len()) {
                    let name = decoded(&pdu, Field::IdName, decode::display_string);
                    terminals.push(self.summary(profile, port.terminal(onu_id), name).await);
                }
                Ok(TerminalPage {
                    terminals,
                    total,
                    page,
                })
            })
            .await
    }

    // ── Acquisition steps ────────────────────────────────────────────

    /// Walk `root` and key every returned object by its trailing ONU id.
    /// Several objects for the same id collapse into one entry.
    async fn discover(&self, port: PortCoordinate, root: &str) -> Result<BTreeMap<u32, Pdu>, CoreError> {
        let mut found = BTreeMap::new();
        let walked = self
            .device
            .walk(root, &mut |pdu: Pdu| {
                match decode::terminal_id_from_oid(&pdu.oid) {
                    Ok(onu_id) => {
                        found.insert(onu_id, pdu);
                    }
                    Err(e) => warn!(oid = %pdu.oid, error = %e, "walk returned an object without an ONU id"),
                }
                WalkControl::Continue
            })
            .await;

        match walked {
            Ok(visited) => {
                debug!(board = port.board, pon = port.pon, root, visited, onus = found.len(), "identity walk complete");
                Ok(found)
            }
            Err(e) => {
                error!(board = port.board, pon = port.pon, root, error = %e, "identity walk failed");
                Err(e)
            }
        }
    }

    async fn compute_free_slots(
        &self,
        port: PortCoordinate,
        profile: &OidProfile,
    ) -> Result<Vec<FreeSlot>, CoreError> {
        let found = self.discover(port, &profile.subtree(Field::IdName)).await?;
        Ok(inventory::free_slots(
            port,
            found.into_keys(),
            self.settings.slots_per_port,
        ))
    }

    async fn summary(
        &self,
        profile: &OidProfile,
        identity: TerminalIdentity,
        name: Option<String>,
    ) -> TerminalSummary {
        self.summary_with_status(profile, identity, name).await.0
    }

    /// A summary plus the raw status object it was decoded from.
    async fn summary_with_status(
        &self,
        profile: &OidProfile,
        identity: TerminalIdentity,
        name: Option<String>,
    ) -> (TerminalSummary, Option<Pdu>) {
        let id = identity.onu_id;
        let status_pdu = self.fetch(profile, Field::Status, id).await;
        let summary = TerminalSummary {
            identity,
            name,
            onu_type: self.field(profile, Field::OnuType, id, decode::display_string).await,
            serial_number: self.field(profile, Field::SerialNumber, id, decode::serial_number).await,
            rx_power_dbm: self.field(profile, Field::RxPower, id, decode::optical_power).await,
            status: status_pdu
                .as_ref()
                .and_then(|pdu| decoded(pdu, Field::Status, decode::status)),
        };
        (summary, status_pdu)
    }

    async fn detail(
        &self,
        profile: &OidProfile,
        summary: TerminalSummary,
        status: Option<Pdu>,
    ) -> TerminalDetail {
        let id = summary.identity.onu_id;
        let mut detail = TerminalDetail::new(summary);

        detail.tx_power_dbm = self.field(profile, Field::TxPower, id, decode::optical_power).await;
        detail.ip_address = self.field(profile, Field::IpAddress, id, decode::display_string).await;
        detail.description = self.field(profile, Field::Description, id, decode::display_string).await;
        detail.last_online = self.field(profile, Field::LastOnline, id, decode::device_timestamp).await;
        detail.last_offline = self.field(profile, Field::LastOffline, id, decode::device_timestamp).await;
        detail.offline_reason = self.field(profile, Field::OfflineReason, id, decode::offline_reason).await;
        detail.optical_distance_m = self
            .field(profile, Field::OpticalDistance, id, decode::optical_distance)
            .await;

        // Status and phase state usually name the same object.
        let shared = profile.object(Field::PhaseState, id) == profile.object(Field::Status, id);
        let phase_pdu = match status {
            Some(pdu) if shared => Some(pdu),
            _ => self.fetch(profile, Field::PhaseState, id).await,
        };
        detail.phase_state = phase_pdu
            .as_ref()
            .and_then(|pdu| decoded(pdu, Field::PhaseState, decode::phase_state));

        if let Some(online) = detail.last_online {
            detail.uptime = Some(decode::uptime(online, (self.clock)(), self.settings.clock_offset));
            if let Some(offline) = detail.last_offline {
                detail.last_down_duration = decode::last_down_duration(online, offline);
            }
        }
        detail
    }

    /// Fetch and decode one ONU field. Any failure leaves the field empty.
    async fn field<T>(&self, profile: &OidProfile, field: Field, onu_id: u32, decoder: Decoder<T>) -> Option<T> {
        let pdu = self.fetch(profile, field, onu_id).await?;
        decoded(&pdu, field, decoder)
    }

    async fn fetch(&self, profile: &OidProfile, field: Field, onu_id: u32) -> Option<Pdu> {
        let oid = profile.object(field, onu_id);
        match self.fetches.run(&oid, || self.device.fetch(&oid)).await {
            Ok(pdu) => Some(pdu),
            Err(e) => {
                warn!(field = field.name(), onu_id, oid = %oid, error = %e, "field fetch failed");
                None
            }
        }
    }

    // ── Cache access ─────────────────────────────────────────────────

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match cache::get_json(&self.cache, key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, reading from device");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        cache::set_json(&self.cache, key, self.settings.cache_ttl, value).await
    }
}

/// Apply `decoder`, logging and discarding a failure.
fn decoded<T>(pdu: &Pdu, field: Field, decoder: Decoder<T>) -> Option<T> {
    match decoder(&pdu.value) {
        Ok(value) => Some(value),
        Err(e @ (DecodeError::Empty | DecodeError::OutOfRange(_))) => {
            debug!(field = field.name(), oid = %pdu.oid, error = %e, "field left empty");
            None
        }
        Err(e) => {
            warn!(field = field.name(), oid = %pdu.oid, error = %e, "field failed to decode");
            None
        }
    }
}
