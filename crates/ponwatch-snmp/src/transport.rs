// Session parameters for reaching the OLT agent.
//
// One `SnmpTarget` is built at startup and shared; each device call asks it
// for a fresh session via `open_session()` and drops that session on return.

use std::fmt;
use std::time::Duration;

use async_snmp::{Auth, Backoff, Client, Retry, UdpClient};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Where and how to reach the management agent.
#[derive(Clone)]
pub struct SnmpTarget {
    pub host: String,
    pub port: u16,
    pub community: SecretString,
    /// Per-request timeout, applied to each retry.
    pub timeout: Duration,
    /// Additional attempts after the first timeout.
    pub retries: u32,
}

impl Default for SnmpTarget {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            community: SecretString::from("public".to_string()),
            timeout: Duration::from_secs(3),
            retries: 1,
        }
    }
}

impl fmt::Debug for SnmpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnmpTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("community", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

impl SnmpTarget {
    pub fn new(host: impl Into<String>, port: u16, community: SecretString) -> Self {
        Self {
            host: host.into(),
            port,
            community,
            ..Self::default()
        }
    }

    /// `host:port` as handed to the socket layer.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Open a new v2c session. The returned client owns its socket; dropping
    /// it releases the session.
    pub async fn open_session(&self) -> Result<UdpClient, Error> {
        let address = self.address();
        Client::builder(address.clone(), Auth::v2c(self.community.expose_secret()))
            .timeout(self.timeout)
            .retry(Retry {
                max_attempts: self.retries,
                backoff: Backoff::None,
            })
            .connect()
            .await
            .map_err(|source| Error::Connect {
                target: address,
                source: *source,
            })
    }
}
