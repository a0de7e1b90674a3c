// ── Raw protocol values ──
//
// A transport-neutral view of what the agent returned. Decoders in
// `ponwatch-core` only ever see these types, never `async_snmp` ones.

use async_snmp::{Value, VarBind};
use serde::{Deserialize, Serialize};

/// A single value as returned by the agent, before any domain decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    Integer(i64),
    Unsigned(u64),
    OctetString(Vec<u8>),
    /// Any non-numeric, non-string syntax, carried as the agent library's
    /// textual rendering. Numeric syntaxes never land here.
    Text(String),
    /// noSuchObject / noSuchInstance / endOfMibView.
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::OctetString(_) | Self::Missing => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::OctetString(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Integer(v) => Self::Integer(i64::from(v)),
            Value::OctetString(bytes) => Self::OctetString(bytes.to_vec()),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
                Self::Unsigned(u64::from(v))
            }
            Value::Counter64(v) => Self::Unsigned(v),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => Self::Missing,
            other => Self::Text(other.to_string()),
        }
    }
}

/// One object name / value pair from a get or walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pdu {
    /// Dotted OID without a leading dot.
    pub oid: String,
    pub value: RawValue,
}

impl Pdu {
    pub fn new(oid: impl AsRef<str>, value: RawValue) -> Self {
        Self {
            oid: normalize_oid(oid.as_ref()).to_owned(),
            value,
        }
    }
}

impl From<VarBind> for Pdu {
    fn from(vb: VarBind) -> Self {
        Self::new(vb.oid.to_string(), RawValue::from(vb.value))
    }
}

/// Returned by a walk visitor to keep going or stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Abort,
}

/// Strip the optional leading dot from a dotted OID.
///
/// Configuration files conventionally write `.1.3.6...`; the agent library
/// renders `1.3.6...`. Both forms address the same object.
pub fn normalize_oid(oid: &str) -> &str {
    oid.trim().trim_start_matches('.')
}
