//! Generation counter: guards async continuations against stale results.
//!
//! Each request captures the current generation when issued. When its
//! result arrives, it is applied only if no newer request (or explicit
//! invalidation) has happened since.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: u64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the ticket for a new request.
    pub fn issue(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    /// Advance without issuing, making every outstanding ticket stale.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, ticket: Generation) -> bool {
        ticket.0 == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_ticket_is_current() {
        let mut counter = GenerationCounter::new();
        let first = counter.issue();
        assert!(counter.is_current(first));
        let second = counter.issue();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn invalidate_stales_outstanding_ticket() {
        let mut counter = GenerationCounter::new();
        let ticket = counter.issue();
        counter.invalidate();
        assert!(!counter.is_current(ticket));
    }

    #[test]
    fn fresh_counter_has_no_current_ticket() {
        let counter = GenerationCounter::new();
        assert!(!counter.is_current(Generation(1)));
    }
}
