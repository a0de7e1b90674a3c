// ── Pagination ──

use serde::{Deserialize, Serialize};

use super::TerminalSummary;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// A 1-based page request, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            index: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a request from untrusted input. An index below 1 becomes 1,
    /// a size below 1 becomes the default, and sizes above the maximum are
    /// capped.
    pub fn clamped(index: i64, size: i64) -> Self {
        let index = usize::try_from(index).ok().filter(|i| *i >= 1).unwrap_or(1);
        let size = match usize::try_from(size) {
            Ok(0) | Err(_) => DEFAULT_PAGE_SIZE,
            Ok(s) => s.min(MAX_PAGE_SIZE),
        };
        Self { index, size }
    }

    /// Zero-based offset of the first element on this page.
    pub fn offset(&self) -> usize {
        self.index.saturating_sub(1).saturating_mul(self.size)
    }

    /// The half-open range this page covers in a list of `total` elements.
    pub fn window(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.offset().min(total);
        let end = start.saturating_add(self.size).min(total);
        start..end
    }
}

/// One page of a port listing together with the size of the whole port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalPage {
    pub terminals: Vec<TerminalSummary>,
    pub total: usize,
    pub page: PageRequest,
}
