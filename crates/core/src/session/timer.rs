use serde::{Deserialize, Serialize};

/// Generation token of a question countdown.
///
/// Every entry into an active question mints a fresh token. Ticks carrying any other token are
/// dropped, so a countdown that outlives its question can never fire a second timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Token of a content fetch started by entering `Loading`. Results carrying a stale ticket are
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadTicket(u64);

#[derive(Debug, Default)]
pub(crate) struct TokenMint {
    next: u64,
}

impl TokenMint {
    pub(crate) fn timer(&mut self) -> TimerId {
        self.next += 1;
        TimerId(self.next)
    }

    pub(crate) fn ticket(&mut self) -> LoadTicket {
        self.next += 1;
        LoadTicket(self.next)
    }
}

/// Seconds left on the running question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    id: TimerId,
    remaining: u32,
}

impl Countdown {
    pub(crate) fn start(id: TimerId, seconds: u32) -> Self {
        Self {
            id,
            remaining: seconds,
        }
    }

    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// One second elapsed. Returns true when the countdown just reached zero.
    pub(crate) fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_never_repeat() {
        let mut mint = TokenMint::default();
        let a = mint.timer();
        let b = mint.timer();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn countdown_reports_zero_once_reached() {
        let mut mint = TokenMint::default();
        let mut c = Countdown::start(mint.timer(), 2);
        assert!(!c.tick());
        assert_eq!(c.remaining(), 1);
        assert!(c.tick());
        assert_eq!(c.remaining(), 0);
    }
}
