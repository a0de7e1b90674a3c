// ponwatch-snmp: per-call SNMPv2c access to an OLT management agent.
//
// Every operation opens its own session, performs exactly one get or walk,
// and drops the session before returning. Nothing here is pooled.

pub mod client;
pub mod error;
pub mod transport;
pub mod value;

pub use client::SnmpClient;
pub use error::Error;
pub use transport::SnmpTarget;
pub use value::{Pdu, RawValue, WalkControl, normalize_oid};
