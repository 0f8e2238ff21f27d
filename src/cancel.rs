//! Cooperative cancellation.
//!
//! Long operations poll an [`Interrupt`] at a few fixed checkpoints. A poll
//! that reports [`Priority::Highest`] makes the operation unwind and return
//! [`Outcome::Cancelled`].

/// Priority of the most urgent pending event, as reported by an [`Interrupt`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    /// Nothing pending; keep going.
    #[default]
    None,
    /// Abandon the current operation.
    Highest,
}

/// A zero-argument poll that reports pending events.
pub trait Interrupt {
    fn poll(&mut self) -> Priority;
}

impl<F: FnMut() -> Priority> Interrupt for F {
    fn poll(&mut self) -> Priority {
        self()
    }
}

/// An interrupt that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Interrupt for Never {
    fn poll(&mut self) -> Priority {
        Priority::None
    }
}

/// Result of an operation that may be cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns `true` if the operation was abandoned.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the value of a completed operation.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Done(v) => Outcome::Done(f(v)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Polls `interrupt` and returns `true` if the caller must abandon its work.
pub(crate) fn should_stop(interrupt: &mut dyn Interrupt) -> bool {
    interrupt.poll() == Priority::Highest
}

/// Interrupt used by tests: fires on the `n`-th poll (1-based) and counts polls.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FireOnPoll {
    pub fire_at: usize,
    pub polls: usize,
}

#[cfg(test)]
impl FireOnPoll {
    pub fn new(fire_at: usize) -> Self {
        Self { fire_at, polls: 0 }
    }
}

#[cfg(test)]
impl Interrupt for FireOnPoll {
    fn poll(&mut self) -> Priority {
        self.polls += 1;
        if self.polls == self.fire_at {
            Priority::Highest
        } else {
            Priority::None
        }
    }
}
