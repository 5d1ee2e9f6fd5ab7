//! Voting window (start/end as Unix seconds).

use serde::{Deserialize, Serialize};

/// `Default` is the unset window `(0, 0)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    pub start: u64,
    pub end: u64,
}

impl VotingWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The ledger reports `(0, 0)` until `setDates` has been called.
    pub fn is_unset(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Whether voting is open at `now` (start inclusive, end exclusive).
    pub fn is_open(&self, now: u64) -> bool {
        self.start <= now && now < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_half_open_interval() {
        let w = VotingWindow::new(100, 200);
        assert!(!w.is_open(99));
        assert!(w.is_open(100));
        assert!(w.is_open(199));
        assert!(!w.is_open(200));
    }

    #[test]
    fn zero_window_is_unset() {
        assert!(VotingWindow::new(0, 0).is_unset());
        assert!(!VotingWindow::new(0, 1).is_unset());
    }
}
