// SNMP client with per-call session lifecycle
//
// Each public method opens a session through `SnmpTarget`, performs one
// operation, and lets the session drop on every exit path (success,
// error-status, timeout). This bounds the number of sessions the OLT sees
// to the number of calls in flight.

use std::time::Instant;

use async_snmp::Oid;
use futures_util::StreamExt;
use tracing::debug;

use crate::error::Error;
use crate::transport::SnmpTarget;
use crate::value::{Pdu, WalkControl, normalize_oid};

/// Management-protocol client for a single OLT.
///
/// Cheap to clone; holds only connection parameters.
#[derive(Debug, Clone)]
pub struct SnmpClient {
    target: SnmpTarget,
}

impl SnmpClient {
    pub fn new(target: SnmpTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &SnmpTarget {
        &self.target
    }

    /// Fetch a single object.
    ///
    /// An agent reply of noSuchObject / noSuchInstance is reported as
    /// [`Error::NoSuchObject`] rather than a value.
    pub async fn get(&self, oid: &str) -> Result<Pdu, Error> {
        let oid = normalize_oid(oid);
        let parsed = parse_oid(oid)?;
        let started = Instant::now();

        let session = self.target.open_session().await?;
        let vb = session
            .get(&parsed)
            .await
            .map_err(|source| Error::Request {
                operation: "get",
                oid: oid.to_owned(),
                source: *source,
            })?;
        drop(session);

        let pdu = Pdu::from(vb);
        debug!(
            oid,
            elapsed_ms = started.elapsed().as_millis(),
            "snmp get complete"
        );
        if pdu.value.is_missing() {
            return Err(Error::NoSuchObject {
                oid: oid.to_owned(),
            });
        }
        Ok(pdu)
    }

    /// Walk every object under `oid`, handing each to `visit`.
    ///
    /// Walking an OID that names a single instance yields that instance:
    /// when the subtree is empty the root itself is fetched. Returns the
    /// number of PDUs visited.
    pub async fn walk<F>(&self, oid: &str, mut visit: F) -> Result<usize, Error>
    where
        F: FnMut(Pdu) -> WalkControl + Send,
    {
        let oid = normalize_oid(oid);
        let root = parse_oid(oid)?;
        let started = Instant::now();
        let request_error = |operation, source| Error::Request {
            operation,
            oid: oid.to_owned(),
            source,
        };

        let session = self.target.open_session().await?;
        let mut visited = 0usize;
        {
            let walk = session
                .walk(root.clone())
                .map_err(|source| request_error("walk", *source))?;
            tokio::pin!(walk);

            while let Some(item) = StreamExt::next(&mut walk).await {
                let vb = item.map_err(|source| request_error("walk", *source))?;
                let pdu = Pdu::from(vb);
                if pdu.value.is_missing() {
                    continue;
                }
                visited += 1;
                if visit(pdu) == WalkControl::Abort {
                    break;
                }
            }
        }

        if visited == 0 {
            let vb = session
                .get(&root)
                .await
                .map_err(|source| request_error("get", *source))?;
            visited = visit_leaf(Pdu::from(vb), &mut visit);
        }
        drop(session);

        debug!(
            oid,
            visited,
            elapsed_ms = started.elapsed().as_millis(),
            "snmp walk complete"
        );
        Ok(visited)
    }
}

/// Hand the object a leaf fallback fetched to `visit`. A lone object has no
/// successor, so `Abort` and `Continue` both end the walk here.
fn visit_leaf<F>(pdu: Pdu, visit: &mut F) -> usize
where
    F: FnMut(Pdu) -> WalkControl,
{
    if pdu.value.is_missing() {
        return 0;
    }
    match visit(pdu) {
        WalkControl::Continue | WalkControl::Abort => 1,
    }
}

fn parse_oid(oid: &str) -> Result<Oid, Error> {
    Oid::parse(oid).map_err(|e| Error::InvalidOid {
        oid: oid.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::value::RawValue;

    #[test]
    fn parse_oid_rejects_garbage() {
        let err = parse_oid("1.3.six.1").unwrap_err();
        assert!(matches!(err, Error::InvalidOid { .. }));
        assert_eq!(err.oid(), Some("1.3.six.1"));
    }

    #[test]
    fn leaf_fallback_visits_present_objects_once() {
        let mut seen = Vec::new();
        let mut visitor = |pdu: Pdu| {
            seen.push(pdu.oid);
            WalkControl::Abort
        };
        let present = Pdu::new("1.3.6.1.4.1.3902.5", RawValue::Integer(4));
        assert_eq!(visit_leaf(present, &mut visitor), 1);
        let absent = Pdu::new("1.3.6.1.4.1.3902.6", RawValue::Missing);
        assert_eq!(visit_leaf(absent, &mut visitor), 0);
        assert_eq!(seen, vec!["1.3.6.1.4.1.3902.5".to_owned()]);
    }
}
