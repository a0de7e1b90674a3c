#![allow(clippy::unwrap_used)]

// Acquisition service and sweep behaviour against an in-memory OLT.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use ponwatch_core::{
    AcquisitionService, AcquisitionSettings, BaseOids, CoreError, Field, InMemoryDevice,
    MemoryCache, OidResolver, OidSuffixes, PageRequest, PhaseState, PortCoordinate, ScanRange,
    SweepScheduler, SweepSettings, TerminalMetrics, TerminalStatus,
};
use ponwatch_snmp::RawValue;

// ── Fixtures ────────────────────────────────────────────────────────

const PORT: PortCoordinate = PortCoordinate::new(1, 1);
const IFINDEX: u32 = 285_278_465;

type Service = AcquisitionService<InMemoryDevice, MemoryCache>;

fn suffixes(ifindex: u32) -> OidSuffixes {
    OidSuffixes {
        onu_id_name: format!(".500.10.2.3.3.1.2.{ifindex}"),
        onu_type: format!(".3.50.11.2.1.17.{ifindex}"),
        onu_serial_number: format!(".500.10.2.3.3.1.18.{ifindex}"),
        onu_rx_power: format!(".500.20.2.2.2.1.10.{ifindex}"),
        onu_tx_power: format!(".3.50.12.1.1.14.{ifindex}"),
        onu_status_id: format!(".500.10.2.3.8.1.4.{ifindex}"),
        onu_phase_state: format!(".500.10.2.3.8.1.14.{ifindex}"),
        onu_ip_address: format!(".3.50.16.1.1.10.{ifindex}"),
        onu_description: format!(".500.10.2.3.3.1.3.{ifindex}"),
        onu_last_online_time: format!(".500.10.2.3.8.1.5.{ifindex}"),
        onu_last_offline_time: format!(".500.10.2.3.8.1.6.{ifindex}"),
        onu_last_offline_reason: format!(".500.10.2.3.8.1.7.{ifindex}"),
        onu_gpon_optical_distance: format!(".500.10.2.3.10.1.2.{ifindex}"),
    }
}

fn resolver() -> OidResolver {
    let mut resolver = OidResolver::new(BaseOids {
        primary: ".1.3.6.1.4.1.3902.1082".into(),
        secondary: ".1.3.6.1.4.1.3902.1012".into(),
    });
    resolver.insert(PORT, suffixes(IFINDEX));
    resolver.insert(PortCoordinate::new(1, 2), suffixes(IFINDEX + 1));
    resolver
}

fn oid(field: Field, onu_id: u32) -> String {
    resolver().resolve(PORT).unwrap().object(field, onu_id)
}

fn listing_root() -> String {
    resolver().resolve(PORT).unwrap().subtree(Field::IdName)
}

fn text(s: &str) -> RawValue {
    RawValue::OctetString(s.as_bytes().to_vec())
}

/// A healthy, online ONU with every field populated.
fn provision(device: &InMemoryDevice, onu_id: u32) {
    device.insert(&oid(Field::IdName, onu_id), text(&format!("onu-{onu_id}")));
    device.insert(&oid(Field::OnuType, onu_id), text("F660"));
    device.insert(&oid(Field::SerialNumber, onu_id), text(&format!("1,ZTEGC{onu_id:07}")));
    device.insert(&oid(Field::RxPower, onu_id), RawValue::Integer(5750));
    device.insert(&oid(Field::TxPower, onu_id), RawValue::Integer(16050));
    device.insert(&oid(Field::Status, onu_id), RawValue::Integer(4));
    device.insert(&oid(Field::PhaseState, onu_id), RawValue::Integer(4));
    device.insert(&oid(Field::IpAddress, onu_id), text("10.20.0.5"));
    device.insert(&oid(Field::Description, onu_id), text("customer"));
    device.insert(&oid(Field::LastOnline, onu_id), RawValue::Text("2026-10-19 08:00:00".into()));
    device.insert(&oid(Field::LastOffline, onu_id), RawValue::Text("2026-10-19 06:00:00".into()));
    device.insert(&oid(Field::OfflineReason, onu_id), RawValue::Integer(2));
    device.insert(&oid(Field::OpticalDistance, onu_id), RawValue::Integer(1234));
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(5, 0, 0)
        .unwrap()
}

fn service_with(device: InMemoryDevice) -> Service {
    AcquisitionService::new(device, MemoryCache::new(), resolver(), AcquisitionSettings::default())
        .with_clock(Arc::new(now))
}

fn service(onu_ids: impl IntoIterator<Item = u32>) -> Service {
    let device = InMemoryDevice::new();
    for onu_id in onu_ids {
        provision(&device, onu_id);
    }
    service_with(device)
}

// ── Listing, coalescing, caching ────────────────────────────────────

#[tokio::test]
async fn list_port_returns_decoded_summaries_in_id_order() {
    let service = service([10, 3, 7]);
    let terminals = service.list_port(PORT).await.unwrap();

    let ids: Vec<u32> = terminals.iter().map(|t| t.identity.onu_id).collect();
    assert_eq!(ids, vec![3, 7, 10]);

    let first = &terminals[0];
    assert_eq!(first.name.as_deref(), Some("onu-3"));
    assert_eq!(first.onu_type.as_deref(), Some("F660"));
    assert_eq!(first.serial_number.as_deref(), Some("ZTEGC0000003"));
    assert_eq!(first.rx_power_dbm, Some(-18.5));
    assert_eq!(first.status, Some(TerminalStatus::Online));
}

#[tokio::test(start_paused = true)]
async fn concurrent_listings_share_one_walk() {
    let device = InMemoryDevice::new().with_latency(Duration::from_millis(50));
    provision(&device, 1);
    provision(&device, 2);
    let service = service_with(device);

    let results = join_all((0..8).map(|_| service.list_port(PORT))).await;

    let root = listing_root();
    assert_eq!(service.device().walks_of(&root), 1);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.len(), 2);
    for result in &results {
        assert_eq!(result.as_ref().unwrap(), first);
    }
}

#[tokio::test(start_paused = true)]
async fn listing_is_cached_for_the_ttl() {
    let service = service([1, 2]);
    let root = listing_root();

    service.list_port(PORT).await.unwrap();
    assert_eq!(service.device().walks_of(&root), 1);

    tokio::time::advance(Duration::from_secs(299)).await;
    service.list_port(PORT).await.unwrap();
    assert_eq!(service.device().walks_of(&root), 1, "entry still fresh");

    tokio::time::advance(Duration::from_secs(2)).await;
    service.list_port(PORT).await.unwrap();
    assert_eq!(service.device().walks_of(&root), 2, "entry expired");
}

#[tokio::test]
async fn unreadable_cache_falls_through_to_the_device() {
    let service = service([1]);
    service.cache().set_reads_fail(true);

    let terminals = service.list_port(PORT).await.unwrap();
    assert_eq!(terminals.len(), 1);
    service.list_port(PORT).await.unwrap();
    assert_eq!(service.device().walks_of(&listing_root()), 2);
}

#[tokio::test]
async fn unwritable_cache_does_not_fail_a_listing() {
    let service = service([1]);
    service.cache().set_writes_fail(true);
    assert_eq!(service.list_port(PORT).await.unwrap().len(), 1);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn empty_port_lists_nothing() {
    let service = service([]);
    assert!(service.list_port(PORT).await.unwrap().is_empty());
    assert_eq!(service.free_slots(PORT).await.unwrap().len(), 128);
}

#[tokio::test]
async fn unknown_port_is_rejected_before_touching_the_device() {
    let service = service([1]);
    let err = service.list_port(PortCoordinate::new(9, 9)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidCoordinate { board: 9, pon: 9 }));
    assert_eq!(service.device().walk_count(), 0);
}

#[tokio::test]
async fn failed_identity_walk_is_a_protocol_error() {
    let service = service([1]);
    service.device().fail(&listing_root(), "request timed out");

    let err = service.list_port(PORT).await.unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn failing_field_leaves_only_that_field_empty() {
    let service = service([1]);
    service.device().fail(&oid(Field::OnuType, 1), "no response");

    let terminals = service.list_port(PORT).await.unwrap();
    assert_eq!(terminals[0].onu_type, None);
    assert_eq!(terminals[0].serial_number.as_deref(), Some("ZTEGC0000001"));
}

// ── Detail ──────────────────────────────────────────────────────────

#[tokio::test]
async fn detail_derives_uptime_and_last_down_duration() {
    let service = service([5]);
    let detail = service.get_terminal(PORT.terminal(5)).await.unwrap();

    assert_eq!(detail.uptime.unwrap().0, TimeDelta::hours(4));
    assert_eq!(detail.uptime.unwrap().to_string(), "0 days 4 hours 0 minutes 0 seconds");
    assert_eq!(detail.last_down_duration.unwrap().0, TimeDelta::hours(2));
    assert_eq!(detail.tx_power_dbm, Some(2.1));
    assert_eq!(detail.ip_address.as_deref(), Some("10.20.0.5"));
    assert_eq!(detail.offline_reason.as_deref(), Some("LOS"));
    assert_eq!(detail.optical_distance_m, Some(1234));
    assert_eq!(detail.phase_state, Some(PhaseState::Ready));
}

#[tokio::test]
async fn unparsable_last_online_leaves_uptime_absent() {
    let service = service([5]);
    service
        .device()
        .insert(&oid(Field::LastOnline, 5), RawValue::Text("not a time".into()));

    let detail = service.get_terminal(PORT.terminal(5)).await.unwrap();
    assert_eq!(detail.last_online, None);
    assert_eq!(detail.uptime, None);
    assert_eq!(detail.last_down_duration, None);
    assert!(detail.last_offline.is_some());
}

#[tokio::test]
async fn offline_after_online_has_no_last_down_duration() {
    let service = service([5]);
    service
        .device()
        .insert(&oid(Field::LastOffline, 5), RawValue::Text("2026-10-19 09:00:00".into()));

    let detail = service.get_terminal(PORT.terminal(5)).await.unwrap();
    assert!(detail.uptime.is_some());
    assert_eq!(detail.last_down_duration, None);
}

#[tokio::test]
async fn implausible_power_reading_is_dropped() {
    let service = service([5]);
    // 65000 * 0.002 - 30 = 100 dBm
    service.device().insert(&oid(Field::RxPower, 5), RawValue::Integer(65_000));

    let detail = service.get_terminal(PORT.terminal(5)).await.unwrap();
    assert_eq!(detail.summary.rx_power_dbm, None);
    assert_eq!(detail.tx_power_dbm, Some(2.1));
}

#[tokio::test]
async fn shared_status_and_phase_object_is_read_once() {
    let mut shared = suffixes(IFINDEX);
    shared.onu_phase_state = shared.onu_status_id.clone();
    let mut resolver = resolver();
    resolver.insert(PORT, shared);

    let device = InMemoryDevice::new();
    provision(&device, 5);
    let service = AcquisitionService::new(device, MemoryCache::new(), resolver, AcquisitionSettings::default())
        .with_clock(Arc::new(now));

    let detail = service.get_terminal(PORT.terminal(5)).await.unwrap();
    assert_eq!(detail.summary.status, Some(TerminalStatus::Online));
    assert_eq!(detail.phase_state, Some(PhaseState::Ready));
    // four summary fields and seven detail fields; phase state reuses status
    assert_eq!(service.device().fetch_count(), 11);
}

#[tokio::test]
async fn distinct_phase_object_is_read_separately() {
    let service = service([5]);
    service.get_terminal(PORT.terminal(5)).await.unwrap();
    assert_eq!(service.device().fetch_count(), 12);
}

#[tokio::test]
async fn unknown_onu_is_not_found() {
    let service = service([1]);
    let err = service.get_terminal(PORT.terminal(10)).await.unwrap_err();
    assert!(matches!(err, CoreError::TerminalNotFound { onu_id: 10, .. }));
}

// ── Free slots, serials, pages ──────────────────────────────────────

#[tokio::test]
async fn free_slots_skip_provisioned_ids() {
    let service = service([3, 7, 10]);
    let free = service.free_slots(PORT).await.unwrap();
    assert_eq!(free.len(), 125);
    assert!(free.iter().all(|slot| ![3, 7, 10].contains(&slot.onu_id)));
}

#[tokio::test]
async fn refresh_overwrites_cached_free_slots() {
    let service = service([1]);
    assert_eq!(service.free_slots(PORT).await.unwrap().len(), 127);

    provision(service.device(), 2);
    assert_eq!(service.free_slots(PORT).await.unwrap().len(), 127, "cached");
    assert_eq!(service.refresh_free_slots(PORT).await.unwrap().len(), 126);
    assert_eq!(service.free_slots(PORT).await.unwrap().len(), 126);
}

#[tokio::test]
async fn refresh_reports_a_failed_cache_write() {
    let service = service([1]);
    service.cache().set_writes_fail(true);

    let err = service.refresh_free_slots(PORT).await.unwrap_err();
    assert!(matches!(err, CoreError::CacheWriteFailed { .. }), "{err}");
    assert_eq!(service.free_slots(PORT).await.unwrap().len(), 127);
}

#[tokio::test]
async fn serial_listing_is_never_cached() {
    let service = service([2, 1]);
    let serials = service.list_ids_with_serial(PORT).await.unwrap();
    let pairs: Vec<(u32, Option<&str>)> = serials
        .iter()
        .map(|s| (s.identity.onu_id, s.serial_number.as_deref()))
        .collect();
    assert_eq!(pairs, vec![(1, Some("ZTEGC0000001")), (2, Some("ZTEGC0000002"))]);

    service.list_ids_with_serial(PORT).await.unwrap();
    assert_eq!(service.device().walks_of(&listing_root()), 2);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn pages_slice_the_port_and_report_its_total() {
    let service = service(1..=25);

    let second = service.list_port_paged(PORT, PageRequest::clamped(2, 10)).await.unwrap();
    assert_eq!(second.total, 25);
    let ids: Vec<u32> = second.terminals.iter().map(|t| t.identity.onu_id).collect();
    assert_eq!(ids, (11..=20).collect::<Vec<_>>());

    let third = service.list_port_paged(PORT, PageRequest::clamped(3, 10)).await.unwrap();
    assert_eq!(third.terminals.len(), 5);
    assert_eq!(third.terminals[0].identity.onu_id, 21);

    let beyond = service.list_port_paged(PORT, PageRequest::clamped(4, 10)).await.unwrap();
    assert!(beyond.terminals.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn page_only_enriches_the_requested_slice() {
    let service = service(1..=25);
    let fetches_before = service.device().fetch_count();
    service.list_port_paged(PORT, PageRequest::clamped(1, 5)).await.unwrap();
    // type, serial, rx power, status per ONU
    assert_eq!(service.device().fetch_count() - fetches_before, 5 * 4);
}

// ── Sweep ───────────────────────────────────────────────────────────

fn sweep_settings() -> SweepSettings {
    SweepSettings {
        range: ScanRange {
            boards: 1..=1,
            pons: 1..=3,
        },
        interval: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn sweep_publishes_every_discovered_onu() {
    let service = Arc::new(service([1, 2]));
    let metrics = Arc::new(TerminalMetrics::new().unwrap());
    let scheduler = SweepScheduler::new(Arc::clone(&service), Arc::clone(&metrics), sweep_settings());

    let snapshot = scheduler.run_cycle().await;

    assert_eq!(snapshot.terminals.len(), 2);
    // pon 3 has no OID profile
    assert_eq!(snapshot.failed_ports, 1);
    assert_eq!(scheduler.last_snapshot().terminals.len(), 2);

    let text = metrics.render().unwrap();
    assert!(text.contains(r#"ponwatch_onu_rx_power_dbm{board="1",onu_id="2",pon="1"} -18.5"#));
    assert!(text.contains(r#"ponwatch_onu_uptime_seconds{board="1",onu_id="1",pon="1"} 14400"#));
    assert!(text.contains("ponwatch_sweep_terminals 2"));
}

#[tokio::test]
async fn sweep_drops_series_of_onus_that_disappear() {
    let service = Arc::new(service([1, 2]));
    let metrics = Arc::new(TerminalMetrics::new().unwrap());
    let scheduler = SweepScheduler::new(Arc::clone(&service), Arc::clone(&metrics), sweep_settings());
    scheduler.run_cycle().await;

    service.device().remove_subtree(&oid(Field::IdName, 2));
    let snapshot = scheduler.run_cycle().await;

    // The cached listing still names ONU 2, but its detail now fails.
    assert_eq!(snapshot.failed_terminals, 1);
    let text = metrics.render().unwrap();
    assert!(text.contains(r#"onu_id="1""#));
    assert!(!text.contains(r#"onu_id="2""#));
}

#[tokio::test]
async fn sweep_keeps_implausible_power_out_of_the_gauges() {
    let service = Arc::new(service([1, 2]));
    service.device().insert(&oid(Field::RxPower, 2), RawValue::Integer(65_000));
    let metrics = Arc::new(TerminalMetrics::new().unwrap());
    let scheduler = SweepScheduler::new(Arc::clone(&service), Arc::clone(&metrics), sweep_settings());

    let snapshot = scheduler.run_cycle().await;
    assert_eq!(snapshot.terminals.len(), 2);

    let text = metrics.render().unwrap();
    assert!(text.contains(r#"ponwatch_onu_rx_power_dbm{board="1",onu_id="1",pon="1"} -18.5"#));
    assert!(!text.contains(r#"ponwatch_onu_rx_power_dbm{board="1",onu_id="2",pon="1"}"#));
    assert!(text.contains(r#"ponwatch_onu_tx_power_dbm{board="1",onu_id="2",pon="1"} 2.1"#));
}

#[tokio::test(start_paused = true)]
async fn pass_in_progress_finishes_after_cancel() {
    let device = InMemoryDevice::new().with_latency(Duration::from_millis(50));
    provision(&device, 1);
    provision(&device, 2);
    let service = Arc::new(service_with(device));
    let metrics = Arc::new(TerminalMetrics::new().unwrap());
    let scheduler = Arc::new(SweepScheduler::new(service, Arc::clone(&metrics), sweep_settings()));
    let cancel = CancellationToken::new();

    let handle = Arc::clone(&scheduler).spawn(cancel.clone());
    // The first device call is still pending.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(scheduler.last_snapshot().terminals.is_empty());
    cancel.cancel();
    handle.await.unwrap();

    let snapshot = scheduler.last_snapshot();
    assert_eq!(snapshot.terminals.len(), 2);
    assert_eq!(snapshot.failed_terminals, 0);
    assert!(metrics.render().unwrap().contains("ponwatch_sweep_terminals 2"));
}

#[tokio::test(start_paused = true)]
async fn sweep_loop_stops_when_cancelled() {
    let service = Arc::new(service([1]));
    let metrics = Arc::new(TerminalMetrics::new().unwrap());
    let scheduler = Arc::new(SweepScheduler::new(service, metrics, sweep_settings()));
    let cancel = CancellationToken::new();

    let handle = Arc::clone(&scheduler).spawn(cancel.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(scheduler.last_snapshot().terminals.len(), 1);
}
