//! Read-only review summary for a learner's dashboard.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use nq_db::models::{ReviewEvent, ReviewItem};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewStats {
    /// Records with `next_review_date <= now`
    pub due_count: i64,
    /// All records of the learner
    pub total_tracked: i64,
    /// Records last reviewed within the current day
    pub reviews_today: i64,
    /// Mean quality submitted within the current day, 0 when there were none
    pub avg_quality: f64,
}

/// End of the day starting at `day_start`.
pub fn day_end(day_start: DateTime<Utc>) -> DateTime<Utc> {
    day_start + Duration::days(1)
}

/// Start of the current calendar day for a learner at the given UTC offset.
///
/// Returns `None` for offsets chrono cannot represent (beyond ±24h).
pub fn day_start_for_offset(now: DateTime<Utc>, utc_offset_minutes: i32) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    let local_midnight = now.with_timezone(&offset).date_naive().and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|start| start.with_timezone(&Utc))
}

/// Fold a learner's records and review events into summary counters.
pub fn aggregate(
    items: &[ReviewItem],
    events: &[ReviewEvent],
    now: DateTime<Utc>,
    day_start: DateTime<Utc>,
) -> ReviewStats {
    let day_end = day_end(day_start);
    let today = |at: DateTime<Utc>| at >= day_start && at < day_end;

    let due_count = items.iter().filter(|item| item.state().is_due(now)).count();
    let reviews_today = items
        .iter()
        .filter(|item| today(item.last_reviewed_at))
        .count();

    let (quality_sum, quality_count) = events
        .iter()
        .filter(|event| today(event.reviewed_at))
        .fold((0i64, 0i64), |(sum, count), event| {
            (sum + i64::from(event.quality), count + 1)
        });

    let avg_quality = if quality_count == 0 {
        0.0
    } else {
        quality_sum as f64 / quality_count as f64
    };

    ReviewStats {
        due_count: due_count as i64,
        total_tracked: items.len() as i64,
        reviews_today: reviews_today as i64,
        avg_quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn item(next_review_date: DateTime<Utc>, last_reviewed_at: DateTime<Utc>) -> ReviewItem {
        ReviewItem {
            next_review_date,
            last_reviewed_at,
            ..ReviewItem::seed(Uuid::nil(), Uuid::new_v4(), last_reviewed_at)
        }
    }

    fn event(quality: i16, reviewed_at: DateTime<Utc>) -> ReviewEvent {
        ReviewEvent {
            id: Uuid::new_v4(),
            learner_id: Uuid::nil(),
            item_id: Uuid::new_v4(),
            quality,
            time_spent_seconds: 20,
            submission_id: None,
            reviewed_at,
        }
    }

    #[test]
    fn test_empty_learner() {
        let stats = aggregate(&[], &[], at(10, 12), at(10, 0));
        assert_eq!(
            stats,
            ReviewStats {
                due_count: 0,
                total_tracked: 0,
                reviews_today: 0,
                avg_quality: 0.0,
            }
        );
    }

    #[test]
    fn test_no_reviews_today_gives_zero_average() {
        let items = vec![item(at(9, 8), at(8, 8))];
        let events = vec![event(5, at(8, 8))];

        let stats = aggregate(&items, &events, at(10, 12), at(10, 0));
        assert_eq!(stats.avg_quality, 0.0);
        assert!(!stats.avg_quality.is_nan());
        assert_eq!(stats.reviews_today, 0);
        assert_eq!(stats.due_count, 1);
        assert_eq!(stats.total_tracked, 1);
    }

    #[test]
    fn test_counts_and_average() {
        let now = at(10, 12);
        let items = vec![
            // due, reviewed yesterday
            item(at(10, 6), at(9, 6)),
            // not due, reviewed this morning
            item(at(11, 9), at(10, 9)),
            // not due, reviewed this morning
            item(at(16, 10), at(10, 10)),
        ];
        let events = vec![
            event(5, at(9, 6)),
            event(4, at(10, 9)),
            event(1, at(10, 10)),
            event(3, at(10, 11)),
        ];

        let stats = aggregate(&items, &events, now, at(10, 0));
        assert_eq!(stats.due_count, 1);
        assert_eq!(stats.total_tracked, 3);
        assert_eq!(stats.reviews_today, 2);
        assert!((stats.avg_quality - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let now = at(10, 12);
        let stats = aggregate(&[item(now, at(9, 12))], &[], now, at(10, 0));
        assert_eq!(stats.due_count, 1);
    }

    #[test]
    fn test_day_start_for_offset() {
        // 02:00 UTC is still the previous evening in New York (UTC-5)
        let now = at(10, 2);
        assert_eq!(day_start_for_offset(now, 0), Some(at(10, 0)));
        assert_eq!(day_start_for_offset(now, -300), Some(at(9, 5)));
        // 02:00 UTC is 11:00 in Tokyo (UTC+9), its day started 15:00 UTC the day before
        assert_eq!(day_start_for_offset(now, 540), Some(at(9, 15)));
        assert_eq!(day_start_for_offset(now, 24 * 60 + 1), None);
    }
}
