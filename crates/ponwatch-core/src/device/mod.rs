// ── Device access seam ──
//
// The acquisition service talks to the OLT only through `DeviceClient`.
// `SnmpClient` is the production implementation; `InMemoryDevice` serves
// canned OID trees for tests and local runs.

mod memory;
mod snmp;

use std::future::Future;

use ponwatch_snmp::{Pdu, WalkControl};

use crate::error::CoreError;

pub use memory::InMemoryDevice;

/// Single-object fetch and subtree walk against one device.
///
/// Implementations own their connection policy; callers assume nothing
/// about latency or reuse.
pub trait DeviceClient: Send + Sync + 'static {
    /// Fetch one object. A missing object is an error.
    fn fetch(&self, oid: &str) -> impl Future<Output = Result<Pdu, CoreError>> + Send;

    /// Visit every object under `oid` until exhausted or `visit` aborts.
    /// A walk rooted at a leaf visits that leaf. Returns the number of
    /// objects visited.
    fn walk(
        &self,
        oid: &str,
        visit: &mut (dyn FnMut(Pdu) -> WalkControl + Send),
    ) -> impl Future<Output = Result<usize, CoreError>> + Send;
}
