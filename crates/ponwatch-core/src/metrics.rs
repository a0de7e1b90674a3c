// ── Per-ONU metrics ──
//
// An explicitly owned Prometheus registry. `publish` replaces every ONU
// series with one sweep's snapshot under a lock that `render` also takes,
// so a scrape sees either the previous cycle or the new one, never a mix.

use std::sync::{Mutex, PoisonError};

use prometheus::{Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::CoreError;
use crate::model::{PhaseState, TerminalDetail, TerminalStatus};
use crate::sweep::SweepSnapshot;

const NAMESPACE: &str = "ponwatch";
const TERMINAL_LABELS: &[&str] = &["board", "pon", "onu_id"];
const INFO_LABELS: &[&str] = &[
    "board",
    "pon",
    "onu_id",
    "name",
    "serial_number",
    "onu_type",
    "description",
    "ip_address",
    "offline_reason",
    "phase_state",
];

pub struct TerminalMetrics {
    registry: Registry,
    publish_lock: Mutex<()>,

    info: GaugeVec,
    status: GaugeVec,
    rx_power: GaugeVec,
    tx_power: GaugeVec,
    uptime: GaugeVec,
    last_down: GaugeVec,
    last_online: GaugeVec,
    last_offline: GaugeVec,
    distance: GaugeVec,

    sweep_duration: Gauge,
    sweep_terminals: Gauge,
}

impl TerminalMetrics {
    pub fn new() -> Result<Self, CoreError> {
        let registry = Registry::new();

        let terminal_vec = |name: &str, help: &str| -> Result<GaugeVec, CoreError> {
            let gauge = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), TERMINAL_LABELS)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let info = GaugeVec::new(
            Opts::new("onu_info", "ONU presence with descriptive labels (always 1)").namespace(NAMESPACE),
            INFO_LABELS,
        )?;
        registry.register(Box::new(info.clone()))?;

        let status = terminal_vec("onu_status", "ONU online status (1 online, 0 offline)")?;
        let rx_power = terminal_vec("onu_rx_power_dbm", "ONU receive optical power in dBm")?;
        let tx_power = terminal_vec("onu_tx_power_dbm", "ONU transmit optical power in dBm")?;
        let uptime = terminal_vec("onu_uptime_seconds", "Seconds since the ONU last came online")?;
        let last_down = terminal_vec(
            "onu_last_down_duration_seconds",
            "Length of the ONU's last outage in seconds",
        )?;
        let last_online = terminal_vec(
            "onu_last_online_timestamp_seconds",
            "Device time the ONU last came online, as Unix seconds",
        )?;
        let last_offline = terminal_vec(
            "onu_last_offline_timestamp_seconds",
            "Device time the ONU last went offline, as Unix seconds",
        )?;
        let distance = terminal_vec(
            "onu_gpon_optical_distance_meters",
            "Fibre distance between OLT and ONU in metres",
        )?;

        let sweep_duration = Gauge::with_opts(
            Opts::new("sweep_last_duration_seconds", "Wall time of the last completed sweep")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(sweep_duration.clone()))?;
        let sweep_terminals = Gauge::with_opts(
            Opts::new("sweep_terminals", "ONUs published by the last completed sweep")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(sweep_terminals.clone()))?;

        Ok(Self {
            registry,
            publish_lock: Mutex::new(()),
            info,
            status,
            rx_power,
            tx_power,
            uptime,
            last_down,
            last_online,
            last_offline,
            distance,
            sweep_duration,
            sweep_terminals,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Replace every ONU series with `snapshot`.
    pub fn publish(&self, snapshot: &SweepSnapshot) {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);

        for vec in self.all_vecs() {
            vec.reset();
        }

        for detail in &snapshot.terminals {
            self.record(detail);
        }
        self.sweep_duration.set(snapshot.duration.as_secs_f64());
        self.sweep_terminals.set(f64::from(u32::try_from(snapshot.terminals.len()).unwrap_or(u32::MAX)));
    }

    /// The registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, CoreError> {
        let families = {
            let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.registry.gather()
        };
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }

    fn all_vecs(&self) -> [&GaugeVec; 9] {
        [
            &self.status,
            &self.rx_power,
            &self.tx_power,
            &self.uptime,
            &self.last_down,
            &self.last_online,
            &self.last_offline,
            &self.distance,
            &self.info,
        ]
    }

    fn record(&self, detail: &TerminalDetail) {
        let identity = detail.identity();
        let board = identity.board.to_string();
        let pon = identity.pon.to_string();
        let onu_id = identity.onu_id.to_string();
        let labels = [board.as_str(), pon.as_str(), onu_id.as_str()];

        let summary = &detail.summary;
        let phase = detail.phase_state.map(PhaseState::as_str).unwrap_or_default();
        self.info
            .with_label_values(&[
                board.as_str(),
                pon.as_str(),
                onu_id.as_str(),
                summary.name.as_deref().unwrap_or_default(),
                summary.serial_number.as_deref().unwrap_or_default(),
                summary.onu_type.as_deref().unwrap_or_default(),
                detail.description.as_deref().unwrap_or_default(),
                detail.ip_address.as_deref().unwrap_or_default(),
                detail.offline_reason.as_deref().unwrap_or_default(),
                phase,
            ])
            .set(1.0);

        self.status
            .with_label_values(&labels)
            .set(summary.status.map_or(0.0, TerminalStatus::as_gauge));

        if detail.is_operational() {
            if let Some(rx) = summary.rx_power_dbm {
                self.rx_power.with_label_values(&labels).set(rx);
            }
            if let Some(tx) = detail.tx_power_dbm {
                self.tx_power.with_label_values(&labels).set(tx);
            }
        }

        if let Some(uptime) = detail.uptime {
            self.uptime.with_label_values(&labels).set(gauge_value(uptime.as_secs()));
        }
        if let Some(down) = detail.last_down_duration {
            self.last_down.with_label_values(&labels).set(gauge_value(down.as_secs()));
        }
        if let Some(online) = detail.last_online {
            self.last_online
                .with_label_values(&labels)
                .set(gauge_value(online.epoch_seconds()));
        }
        if let Some(offline) = detail.last_offline {
            self.last_offline
                .with_label_values(&labels)
                .set(gauge_value(offline.epoch_seconds()));
        }
        if let Some(metres) = detail.optical_distance_m {
            self.distance.with_label_values(&labels).set(gauge_value(metres));
        }
    }
}

/// Gauge value for an integer quantity. Magnitudes here stay far below
/// 2^53, so the conversion is exact.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn gauge_value(value: i64) -> f64 {
    value as f64
}
