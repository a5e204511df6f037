use chrono::{DateTime, Duration, Utc};

/// Source of "now" for every progress, quiz and achievement timestamp.
///
/// Services hold a `Clock` by value; tests pin it with [`Clock::fixed`] and
/// move it forward with [`Clock::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// A pinned instant.
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Seconds since the epoch at which test sessions start (2023-11-14T22:13:20Z).
///
/// Visits, quiz scores and badge unlocks recorded under [`fixed_clock`] all
/// carry this instant until the clock is advanced.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// The instant a learner session begins in tests; compare recorded
/// `last_visited_at`, `completed_at` and `unlocked_at` values against it.
///
/// # Panics
///
/// Panics if [`FIXED_TEST_TIMESTAMP`] is out of chrono's range.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("session start timestamp should be valid")
}

/// Clock for services under test: starts at [`fixed_now`] and only moves on
/// [`Clock::advance`], so time-spent and unlock ordering are reproducible.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
