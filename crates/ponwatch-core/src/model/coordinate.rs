// ── Board / PON addressing ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed number of ONU slots on one GPON port.
pub const SLOTS_PER_PORT: u32 = 128;

/// One PON port on one line card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortCoordinate {
    pub board: u32,
    pub pon: u32,
}

impl PortCoordinate {
    pub const fn new(board: u32, pon: u32) -> Self {
        Self { board, pon }
    }

    pub const fn terminal(self, onu_id: u32) -> TerminalIdentity {
        TerminalIdentity {
            board: self.board,
            pon: self.pon,
            onu_id,
        }
    }
}

impl fmt::Display for PortCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board {} pon {}", self.board, self.pon)
    }
}

/// Natural key of an ONU: `(board, pon, onu_id)`, with `onu_id` in
/// `1..=SLOTS_PER_PORT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerminalIdentity {
    pub board: u32,
    pub pon: u32,
    pub onu_id: u32,
}

impl TerminalIdentity {
    pub const fn port(self) -> PortCoordinate {
        PortCoordinate::new(self.board, self.pon)
    }
}

impl fmt::Display for TerminalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.board, self.pon, self.onu_id)
    }
}

/// An unprovisioned slot: an identity the device did not report.
pub type FreeSlot = TerminalIdentity;
