//! SRS (Spaced Repetition System) library for puzzle reviews
//!
//! This crate provides the pure scheduling core: given the current review state of a
//! (learner, puzzle) pair and a self-reported recall quality, it computes the next
//! state. It performs no I/O and never reads the clock; callers pass `now` explicitly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest allowed recall quality
pub const MIN_QUALITY: i32 = 0;
/// Highest allowed recall quality
pub const MAX_QUALITY: i32 = 5;
/// Qualities below this value count as a lapse
pub const PASSING_QUALITY: i32 = 3;
/// Default interval cap, about a century; a mastered puzzle is not asked again
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

/// Errors of the scheduling core
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrsError {
    /// Quality outside `0..=5`
    #[error("invalid quality {0}: must be between 0 and 5")]
    InvalidQuality(i32),
}

/// A validated recall quality in `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Quality(u8);

impl Quality {
    /// Validate a raw quality rating.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn new(value: i32) -> Result<Self, SrsError> {
        if (MIN_QUALITY..=MAX_QUALITY).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SrsError::InvalidQuality(value))
        }
    }

    /// The raw rating
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether the rating counts as a failed recall
    pub const fn is_lapse(self) -> bool {
        (self.0 as i32) < PASSING_QUALITY
    }

    /// Forgot / difficult / easy bucket of the rating
    pub const fn grade(self) -> RecallGrade {
        match self.0 {
            0..=2 => RecallGrade::Forgotten,
            3 => RecallGrade::Difficult,
            _ => RecallGrade::Easy,
        }
    }
}

impl TryFrom<i32> for Quality {
    type Error = SrsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Coarse bucket of a quality rating, as shown to learners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallGrade {
    /// 0-2
    Forgotten,
    /// 3
    Difficult,
    /// 4-5
    Easy,
}

/// Product-tunable constants of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Easiness of a freshly seeded item
    pub initial_easiness: f64,
    /// Floor for the easiness factor
    pub min_easiness: f64,
    /// Interval after the first successful recall
    pub first_interval_days: i32,
    /// Interval after the second consecutive successful recall
    pub second_interval_days: i32,
    /// Interval after a lapse
    pub lapse_interval_days: i32,
    /// Upper bound for any interval
    pub max_interval_days: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness: 2.5,
            min_easiness: 1.3,
            first_interval_days: 1,
            second_interval_days: 6,
            lapse_interval_days: 1,
            max_interval_days: MAX_INTERVAL_DAYS,
        }
    }
}

/// Scheduling state of one (learner, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Interval growth multiplier
    pub easiness_factor: f64,
    /// Days until the next review
    pub interval_days: i32,
    /// Consecutive successful recalls since the last lapse
    pub repetitions: i32,
    /// When the item becomes due
    pub next_review_date: DateTime<Utc>,
    /// When the last review was applied
    pub last_reviewed_at: DateTime<Utc>,
}

/// Where an item stands relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DueStatus {
    /// Not due yet
    Upcoming {
        /// Days until due, rounded up
        days: i64,
    },
    /// Due, less than a full day past the due date
    Due,
    /// Due for at least one whole day
    Overdue {
        /// Whole days past the due date
        days: i64,
    },
}

impl ReviewState {
    /// Seed state created when a puzzle is first completed.
    pub fn seed(now: DateTime<Utc>) -> Self {
        Self::seed_with(&SchedulerConfig::default(), now)
    }

    /// Seed state with custom constants.
    pub fn seed_with(config: &SchedulerConfig, now: DateTime<Utc>) -> Self {
        let interval_days = clamp_interval(config, config.first_interval_days);
        Self {
            easiness_factor: config.initial_easiness,
            interval_days,
            repetitions: 0,
            next_review_date: due_after(now, interval_days),
            last_reviewed_at: now,
        }
    }

    /// Apply one review with the default scheduler constants.
    pub fn advance(&self, quality: Quality, now: DateTime<Utc>) -> Self {
        self.advance_with(&SchedulerConfig::default(), quality, now)
    }

    /// Apply one review.
    ///
    /// # Algorithm
    ///
    /// * Easiness: `ef' = max(ef + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), min)`
    /// * Lapse (q < 3): repetitions reset to 0, interval to the lapse interval
    /// * Success: repetitions + 1, then interval 1, 6, or `round(interval * ef')`
    /// * Intervals stay within `1..=max_interval_days`
    pub fn advance_with(&self, config: &SchedulerConfig, quality: Quality, now: DateTime<Utc>) -> Self {
        let easiness_factor = next_easiness(self.easiness_factor, quality, config.min_easiness);

        let (repetitions, interval_days) = if quality.is_lapse() {
            (0, config.lapse_interval_days)
        } else {
            let repetitions = self.repetitions + 1;
            let interval = match repetitions {
                1 => config.first_interval_days,
                2 => config.second_interval_days,
                // `as` saturates on overflow
                _ => (f64::from(self.interval_days) * easiness_factor).round() as i32,
            };
            (repetitions, interval)
        };
        let interval_days = clamp_interval(config, interval_days);

        Self {
            easiness_factor,
            interval_days,
            repetitions,
            next_review_date: due_after(now, interval_days),
            last_reviewed_at: now,
        }
    }

    /// Whether the item is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Due-ness of the item at `now`, for display.
    pub fn due_status(&self, now: DateTime<Utc>) -> DueStatus {
        if self.next_review_date > now {
            let remaining = self.next_review_date - now;
            let mut days = remaining.num_days();
            if remaining > Duration::days(days) {
                days += 1;
            }
            return DueStatus::Upcoming { days };
        }

        match (now - self.next_review_date).num_days() {
            0 => DueStatus::Due,
            days => DueStatus::Overdue { days },
        }
    }
}

fn clamp_interval(config: &SchedulerConfig, interval_days: i32) -> i32 {
    interval_days.clamp(1, config.max_interval_days.max(1))
}

/// `now` plus `interval_days`, saturating at the end of the representable range
fn due_after(now: DateTime<Utc>, interval_days: i32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Compute the easiness factor after a review, floored at `min_easiness`.
pub fn next_easiness(easiness_factor: f64, quality: Quality, min_easiness: f64) -> f64 {
    let miss = f64::from(MAX_QUALITY - i32::from(quality.value()));
    (easiness_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(min_easiness)
}

/// Validate `quality` and advance `state`.
///
/// The caller must not persist anything when this returns an error.
pub fn advance(state: &ReviewState, quality: i32, now: DateTime<Utc>) -> Result<ReviewState, SrsError> {
    let quality = Quality::new(quality)?;
    Ok(state.advance(quality, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn state(easiness_factor: f64, interval_days: i32, repetitions: i32) -> ReviewState {
        ReviewState {
            easiness_factor,
            interval_days,
            repetitions,
            next_review_date: at(1),
            last_reviewed_at: at(1),
        }
    }

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(0).is_ok());
        assert!(Quality::new(5).is_ok());
        assert_eq!(Quality::new(-1), Err(SrsError::InvalidQuality(-1)));
        assert_eq!(Quality::new(6), Err(SrsError::InvalidQuality(6)));
        assert_eq!(Quality::try_from(3).unwrap().value(), 3);
    }

    #[test]
    fn test_quality_grades() {
        assert_eq!(Quality::new(0).unwrap().grade(), RecallGrade::Forgotten);
        assert_eq!(Quality::new(2).unwrap().grade(), RecallGrade::Forgotten);
        assert_eq!(Quality::new(3).unwrap().grade(), RecallGrade::Difficult);
        assert_eq!(Quality::new(4).unwrap().grade(), RecallGrade::Easy);
        assert!(Quality::new(2).unwrap().is_lapse());
        assert!(!Quality::new(3).unwrap().is_lapse());
    }

    #[test]
    fn test_seed() {
        let seed = ReviewState::seed(at(1));
        assert_eq!(seed.repetitions, 0);
        assert_eq!(seed.interval_days, 1);
        assert!((seed.easiness_factor - 2.5).abs() < 1e-9);
        assert_eq!(seed.next_review_date, at(2));
        assert_eq!(seed.last_reviewed_at, at(1));
    }

    #[test]
    fn test_first_success_is_one_day() {
        for q in 3..=5 {
            let next = advance(&state(2.5, 1, 0), q, at(2)).unwrap();
            assert_eq!(next.repetitions, 1);
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.next_review_date, at(3));
        }
    }

    #[test]
    fn test_second_success_is_six_days() {
        for q in 3..=5 {
            let next = advance(&state(2.5, 1, 1), q, at(2)).unwrap();
            assert_eq!(next.repetitions, 2);
            assert_eq!(next.interval_days, 6);
            assert_eq!(next.next_review_date, at(8));
        }
    }

    #[test]
    fn test_lapse_resets_regardless_of_prior_state() {
        for q in 0..=2 {
            for (interval, reps) in [(1, 0), (6, 2), (120, 9)] {
                let next = advance(&state(2.8, interval, reps), q, at(2)).unwrap();
                assert_eq!(next.repetitions, 0);
                assert_eq!(next.interval_days, 1);
                assert!(next.easiness_factor < 2.8);
            }
        }
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let current = state(2.5, 1, 0);
        assert_eq!(advance(&current, 7, at(2)), Err(SrsError::InvalidQuality(7)));
        assert_eq!(advance(&current, -3, at(2)), Err(SrsError::InvalidQuality(-3)));
    }

    #[test]
    fn test_easiness_never_below_floor() {
        let mut current = state(2.5, 10, 4);
        for q in [0, 1, 0, 2, 3, 0, 0, 1, 0, 0, 0, 2, 5, 0] {
            current = advance(&current, q, at(2)).unwrap();
            assert!(current.easiness_factor >= 1.3);
        }
        assert!((current.easiness_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_concrete_scenario() {
        let start = state(2.5, 1, 0);

        let first = advance(&start, 5, at(2)).unwrap();
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.interval_days, 1);
        assert!((first.easiness_factor - 2.6).abs() < 1e-9);

        let second = advance(&first, 5, at(3)).unwrap();
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval_days, 6);
        assert!((second.easiness_factor - 2.7).abs() < 1e-9);

        let lapse = advance(&second, 2, at(9)).unwrap();
        assert_eq!(lapse.repetitions, 0);
        assert_eq!(lapse.interval_days, 1);
        // 2.7 + (0.1 - 3 * (0.08 + 3 * 0.02)) = 2.38
        assert!((lapse.easiness_factor - 2.38).abs() < 1e-9);
    }

    #[test]
    fn test_three_perfect_reviews_from_seed() {
        let seed = ReviewState::seed(at(1));
        let first = advance(&seed, 5, at(2)).unwrap();
        let second = advance(&first, 5, at(3)).unwrap();
        let third = advance(&second, 5, at(9)).unwrap();

        assert_eq!(first.interval_days, 1);
        assert_eq!(second.interval_days, 6);
        assert_eq!(
            third.interval_days,
            (6.0 * third.easiness_factor).round() as i32
        );
        // 6 * 2.8 = 16.8
        assert_eq!(third.interval_days, 17);
    }

    #[test]
    fn test_difficult_recall_keeps_growing_slowly() {
        // q = 3 lowers easiness by 0.14 but still counts as a success
        let next = advance(&state(2.5, 6, 2), 3, at(2)).unwrap();
        assert_eq!(next.repetitions, 3);
        assert!((next.easiness_factor - 2.36).abs() < 1e-9);
        assert_eq!(next.interval_days, 14);
    }

    #[test]
    fn test_custom_lapse_interval() {
        let config = SchedulerConfig {
            lapse_interval_days: 2,
            ..SchedulerConfig::default()
        };
        let next = state(2.5, 30, 5).advance_with(&config, Quality::new(1).unwrap(), at(2));
        assert_eq!(next.interval_days, 2);
        assert_eq!(next.next_review_date, at(4));
    }

    #[test]
    fn test_long_success_streak_stays_bounded() {
        let mut current = ReviewState::seed(at(1));
        let mut previous_interval = 0;
        let mut now = at(2);

        for _ in 0..100 {
            current = advance(&current, 5, now).unwrap();
            assert!(current.interval_days >= previous_interval);
            assert!((1..=MAX_INTERVAL_DAYS).contains(&current.interval_days));
            assert_eq!(
                current.next_review_date,
                now + Duration::days(i64::from(current.interval_days))
            );
            previous_interval = current.interval_days;
            // Reviewed early, a minute later
            now += Duration::minutes(1);
        }

        assert_eq!(current.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(current.repetitions, 100);
    }

    #[test]
    fn test_any_quality_sequence_keeps_interval_in_range() {
        let config = SchedulerConfig {
            max_interval_days: 365,
            ..SchedulerConfig::default()
        };
        let mut current = ReviewState::seed_with(&config, at(1));

        for step in 0..500 {
            // Deterministic mix, mostly successes
            let q = [5, 4, 5, 3, 5, 5, 1, 5, 4, 5, 5][step % 11];
            current = current.advance_with(&config, Quality::new(q).unwrap(), at(2));
            assert!((1..=365).contains(&current.interval_days));
            assert!(current.easiness_factor >= config.min_easiness);
        }
    }

    #[test]
    fn test_interval_saturates_near_max_date() {
        let current = state(2.5, MAX_INTERVAL_DAYS, 10);
        let next = current.advance_with(
            &SchedulerConfig::default(),
            Quality::new(5).unwrap(),
            DateTime::<Utc>::MAX_UTC - Duration::days(1),
        );
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(next.next_review_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_due_status() {
        let item = ReviewState {
            next_review_date: at(10),
            ..state(2.5, 1, 0)
        };

        assert_eq!(item.due_status(at(8)), DueStatus::Upcoming { days: 2 });
        assert_eq!(
            item.due_status(at(9) + Duration::hours(1)),
            DueStatus::Upcoming { days: 1 }
        );
        assert_eq!(item.due_status(at(10)), DueStatus::Due);
        assert_eq!(item.due_status(at(10) + Duration::hours(23)), DueStatus::Due);
        assert_eq!(item.due_status(at(13)), DueStatus::Overdue { days: 3 });

        assert!(!item.is_due(at(9)));
        assert!(item.is_due(at(10)));
    }
}
