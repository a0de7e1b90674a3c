// ── Domain model ──
//
// Canonical types produced by the acquisition service. Everything here is
// created fresh per request or per sweep cycle; only port listings and
// free-slot lists outlive a call, and only inside the cache.

mod coordinate;
mod page;
mod terminal;
mod time;

pub use coordinate::{FreeSlot, PortCoordinate, SLOTS_PER_PORT, TerminalIdentity};
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, TerminalPage};
pub use terminal::{PhaseState, TerminalDetail, TerminalSerial, TerminalStatus, TerminalSummary};
pub use time::{DeviceTimestamp, TimeSpan};
