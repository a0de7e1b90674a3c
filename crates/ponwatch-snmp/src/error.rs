use thiserror::Error;

/// Top-level error type for the `ponwatch-snmp` crate.
///
/// Covers every failure mode of a single device call: building the
/// session, addressing an object, and the request itself.
/// `ponwatch-core` folds all of these into one protocol-error variant.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// Could not open a session to the agent (bad address, socket failure).
    #[error("cannot open SNMP session to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: async_snmp::Error,
    },

    // ── Addressing ──────────────────────────────────────────────────
    /// The dotted OID string could not be parsed.
    #[error("invalid OID '{oid}': {reason}")]
    InvalidOid { oid: String, reason: String },

    /// The agent answered, but the object does not exist.
    #[error("no such object: {oid}")]
    NoSuchObject { oid: String },

    // ── Request ─────────────────────────────────────────────────────
    /// Get/walk failed after the configured retries (timeout, error-status, decode).
    #[error("SNMP {operation} on {oid} failed: {source}")]
    Request {
        operation: &'static str,
        oid: String,
        #[source]
        source: async_snmp::Error,
    },
}

impl Error {
    /// The OID the failed call addressed, when there was one.
    pub fn oid(&self) -> Option<&str> {
        match self {
            Self::Connect { .. } => None,
            Self::InvalidOid { oid, .. }
            | Self::NoSuchObject { oid }
            | Self::Request { oid, .. } => Some(oid),
        }
    }

    /// Returns `true` if the agent was reachable and simply lacks the object.
    pub fn is_missing_object(&self) -> bool {
        matches!(self, Self::NoSuchObject { .. })
    }
}
