// ── Core error types ──
//
// Errors surfaced by ponwatch-core. Callers never see raw SNMP or Redis
// failures: the `From` impls below fold transport-layer errors into the
// domain taxonomy.

use thiserror::Error;

use crate::cache::CacheError;

/// Unified error type for the core crate.
///
/// `Clone` so that one coalesced failure can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Addressing ───────────────────────────────────────────────────
    #[error("Invalid coordinate: board {board} pon {pon} has no OID profile")]
    InvalidCoordinate { board: u32, pon: u32 },

    #[error("ONU {onu_id} not found on board {board} pon {pon}")]
    TerminalNotFound { board: u32, pon: u32, onu_id: u32 },

    // ── Device errors ────────────────────────────────────────────────
    #[error("SNMP request failed{}: {message}", for_oid(.oid.as_deref()))]
    Protocol {
        oid: Option<String>,
        message: String,
    },

    // ── Cache errors ─────────────────────────────────────────────────
    #[error("Cache unavailable: {message}")]
    CacheUnavailable { message: String },

    #[error("Cache write failed for {key}: {message}")]
    CacheWriteFailed { key: String, message: String },

    // ── Metrics ──────────────────────────────────────────────────────
    #[error("Metrics registry error: {message}")]
    Metrics { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures that originate at the device rather than in
    /// addressing or local state.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

/// A raw value could not be turned into the requested domain field.
///
/// Always absorbed at the field level: the field is left absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected}, got {got}")]
    WrongType {
        expected: &'static str,
        got: &'static str,
    },

    #[error("value is empty")]
    Empty,

    #[error("malformed value: {0}")]
    Malformed(String),

    #[error("reading {0} is outside the plausible range")]
    OutOfRange(String),
}

fn for_oid(oid: Option<&str>) -> String {
    oid.map(|o| format!(" for {o}")).unwrap_or_default()
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ponwatch_snmp::Error> for CoreError {
    fn from(err: ponwatch_snmp::Error) -> Self {
        CoreError::Protocol {
            oid: err.oid().map(str::to_owned),
            message: err.to_string(),
        }
    }
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable { message } => CoreError::CacheUnavailable { message },
            CacheError::WriteFailed { key, message } => CoreError::CacheWriteFailed { key, message },
            CacheError::Codec { key, message } => {
                CoreError::Internal(format!("cache payload for {key} is not valid: {message}"))
            }
        }
    }
}

impl From<prometheus::Error> for CoreError {
    fn from(err: prometheus::Error) -> Self {
        CoreError::Metrics {
            message: err.to_string(),
        }
    }
}
