// ── In-memory device ──
//
// A canned OID tree with call accounting, artificial latency and failure
// injection. Latency runs on the tokio clock so paused-time tests stay
// deterministic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use ponwatch_snmp::{Pdu, RawValue, WalkControl, normalize_oid};
use tracing::trace;

use super::DeviceClient;
use crate::error::CoreError;

#[derive(Debug, Default)]
pub struct InMemoryDevice {
    objects: RwLock<BTreeMap<String, RawValue>>,
    latency: Duration,
    /// OID prefix -> failure message.
    failures: DashMap<String, String>,
    fetches: AtomicUsize,
    walks: AtomicUsize,
    walks_by_root: DashMap<String, usize>,
}

impl InMemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, oid: &str, value: RawValue) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_oid(oid).to_owned(), value);
    }

    /// Drop every object at or below `prefix`.
    pub fn remove_subtree(&self, prefix: &str) {
        let prefix = normalize_oid(prefix);
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|oid, _| !is_under(oid, prefix));
    }

    /// Make every call touching `prefix` fail with `message`.
    pub fn fail(&self, prefix: &str, message: impl Into<String>) {
        self.failures
            .insert(normalize_oid(prefix).to_owned(), message.into());
    }

    pub fn heal(&self, prefix: &str) {
        self.failures.remove(normalize_oid(prefix));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn walk_count(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }

    /// Walks issued with exactly this root.
    pub fn walks_of(&self, root: &str) -> usize {
        self.walks_by_root
            .get(normalize_oid(root))
            .map_or(0, |count| *count)
    }

    fn injected_failure(&self, oid: &str) -> Option<CoreError> {
        self.failures.iter().find_map(|entry| {
            (is_under(oid, entry.key()) || is_under(entry.key(), oid)).then(|| CoreError::Protocol {
                oid: Some(oid.to_owned()),
                message: entry.value().clone(),
            })
        })
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// `oid` equals `root` or lies in its subtree.
fn is_under(oid: &str, root: &str) -> bool {
    oid == root
        || oid
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl DeviceClient for InMemoryDevice {
    async fn fetch(&self, oid: &str) -> Result<Pdu, CoreError> {
        let oid = normalize_oid(oid);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if let Some(err) = self.injected_failure(oid) {
            return Err(err);
        }

        let value = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(oid)
            .cloned();
        trace!(oid, found = value.is_some(), "in-memory fetch");
        value
            .map(|value| Pdu::new(oid, value))
            .ok_or_else(|| CoreError::Protocol {
                oid: Some(oid.to_owned()),
                message: "no such object".into(),
            })
    }

    async fn walk(
        &self,
        oid: &str,
        visit: &mut (dyn FnMut(Pdu) -> WalkControl + Send),
    ) -> Result<usize, CoreError> {
        let root = normalize_oid(oid);
        self.walks.fetch_add(1, Ordering::SeqCst);
        *self.walks_by_root.entry(root.to_owned()).or_insert(0) += 1;
        self.simulate_latency().await;
        if let Some(err) = self.injected_failure(root) {
            return Err(err);
        }

        let matches: Vec<Pdu> = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(oid, _)| is_under(oid, root))
            .map(|(oid, value)| Pdu::new(oid, value.clone()))
            .collect();

        let mut visited = 0;
        for pdu in matches {
            visited += 1;
            if visit(pdu) == WalkControl::Abort {
                break;
            }
        }
        trace!(oid = root, visited, "in-memory walk");
        Ok(visited)
    }
}
