//! Link identifiers tying split transactions back together.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every link produced by the effective-date splitter.
pub const LINK_PREFIX: &str = "edate";

/// Monotonic source of link identifiers.
///
/// One sequence is owned by whoever owns the plugin (normally the
/// [`NativePluginRegistry`](crate::NativePluginRegistry)) and lives as long
/// as it does, so repeated runs over several ledger files in one process
/// never hand out the same link twice. The counter only moves forward.
#[derive(Debug)]
pub struct LinkSequence {
    next: AtomicU64,
}

impl LinkSequence {
    /// A sequence starting at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A sequence whose first id is `first`.
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Take the next link, e.g. `edate-20140201-7`.
    ///
    /// The date only makes the link readable in reports; uniqueness comes
    /// from the counter.
    pub fn next_link(&self, date: NaiveDate) -> String {
        format!(
            "{LINK_PREFIX}-{}-{}",
            date.format("%Y%m%d"),
            self.next_id()
        )
    }
}

impl Default for LinkSequence {
    fn default() -> Self {
        Self::new()
    }
}
