//! Sliding outcome window.
//!
//! Fixed-capacity ring buffer of the most recent call outcomes. Keeps a
//! running failure count so the failure rate is O(1) to read.
//!
//! Not synchronized on its own; the owning breaker's lock guards it.

/// Classification of one completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Ring buffer of recent outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeWindow {
    buf: Vec<Outcome>,
    /// Next write position.
    pos: usize,
    /// Outcomes held, capped at capacity.
    count: usize,
    /// Failures currently held.
    failures: usize,
}

impl OutcomeWindow {
    /// Create a window holding up to `capacity` outcomes (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: vec![Outcome::Success; capacity],
            pos: 0,
            count: 0,
            failures: 0,
        }
    }

    /// Append an outcome, overwriting the oldest one once full.
    pub fn record(&mut self, outcome: Outcome) {
        if self.count == self.buf.len() {
            if self.buf[self.pos] == Outcome::Failure {
                self.failures -= 1;
            }
        } else {
            self.count += 1;
        }

        self.buf[self.pos] = outcome;
        if outcome == Outcome::Failure {
            self.failures += 1;
        }

        self.pos = (self.pos + 1) % self.buf.len();
    }

    /// Fraction of held outcomes that failed, `0.0` when empty.
    pub fn failure_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.failures as f64 / self.count as f64
    }

    /// Number of outcomes currently held.
    pub fn total(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Drop every held outcome. Capacity is unchanged.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.count = 0;
        self.failures = 0;
    }
}
