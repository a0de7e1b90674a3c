// ── Periodic sweep ──
//
// One long-lived task walks the configured board/pon range, details every
// discovered ONU, and publishes the whole pass to the metrics registry at
// once. Cancellation is observed only between passes.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::config::SweepSettings;
use crate::device::DeviceClient;
use crate::metrics::TerminalMetrics;
use crate::model::TerminalDetail;
use crate::service::AcquisitionService;

/// Everything one sweep pass collected.
#[derive(Debug, Clone, Default)]
pub struct SweepSnapshot {
    pub terminals: Vec<TerminalDetail>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
    /// Ports whose listing failed and were skipped.
    pub failed_ports: usize,
    /// ONUs whose detail failed and were skipped.
    pub failed_terminals: usize,
}

pub struct SweepScheduler<D, C> {
    service: Arc<AcquisitionService<D, C>>,
    metrics: Arc<TerminalMetrics>,
    settings: SweepSettings,
    last: ArcSwap<SweepSnapshot>,
}

impl<D: DeviceClient, C: CacheStore> SweepScheduler<D, C> {
    pub fn new(
        service: Arc<AcquisitionService<D, C>>,
        metrics: Arc<TerminalMetrics>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            service,
            metrics,
            settings,
            last: ArcSwap::from_pointee(SweepSnapshot::default()),
        }
    }

    /// The most recently completed pass (empty before the first one).
    pub fn last_snapshot(&self) -> Arc<SweepSnapshot> {
        self.last.load_full()
    }

    /// One full pass. Failures on a port or ONU are logged and that unit is
    /// skipped; the pass always completes and is always published.
    pub async fn run_cycle(&self) -> Arc<SweepSnapshot> {
        let started = tokio::time::Instant::now();
        info!(
            boards = ?self.settings.range.boards,
            pons = ?self.settings.range.pons,
            "sweep started"
        );

        let mut snapshot = SweepSnapshot::default();
        for port in self.settings.range.coordinates() {
            let terminals = match self.service.list_port(port).await {
                Ok(terminals) => terminals,
                Err(e) => {
                    warn!(board = port.board, pon = port.pon, error = %e, "skipping port");
                    snapshot.failed_ports += 1;
                    continue;
                }
            };

            for summary in terminals {
                let identity = summary.identity;
                match self.service.get_terminal(identity).await {
                    Ok(detail) => snapshot.terminals.push(detail),
                    Err(e) => {
                        warn!(
                            board = identity.board,
                            pon = identity.pon,
                            onu_id = identity.onu_id,
                            error = %e,
                            "skipping ONU"
                        );
                        snapshot.failed_terminals += 1;
                    }
                }
            }
        }

        snapshot.duration = started.elapsed();
        snapshot.completed_at = Utc::now();
        self.metrics.publish(&snapshot);

        info!(
            terminals = snapshot.terminals.len(),
            failed_ports = snapshot.failed_ports,
            failed_terminals = snapshot.failed_terminals,
            elapsed_ms = snapshot.duration.as_millis(),
            "sweep finished"
        );
        let snapshot = Arc::new(snapshot);
        self.last.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Sweep, sleep, repeat until `cancel` fires. A pass in progress when
    /// cancellation arrives runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_cycle().await;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }
        info!("sweep stopped");
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
