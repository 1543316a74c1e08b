//! Deterministic synthetic sentiment for demos and tests.
//!
//! Real sentiment is sparse relative to the bar frequency, so the
//! generator emits points 3 to 5 hours apart rather than one per bar.
//! The same seed always produces the same series.

use crate::domain::SentimentPoint;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate sparse sentiment points over `[start, end]`.
///
/// Spacing is uniform in [3, 5] hours, scores uniform in [-1, 1].
pub fn generate_sparse_sentiment(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    seed: u64,
) -> Vec<SentimentPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let mut current = start;

    while current <= end {
        let score = rng.gen_range(-1.0..=1.0);
        points.push(SentimentPoint::new(current, score));
        let gap_minutes = rng.gen_range(180.0..=300.0);
        current += Duration::minutes(gap_minutes as i64);
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn same_seed_same_series() {
        let (start, end) = window();
        let a = generate_sparse_sentiment(start, end, 42);
        let b = generate_sparse_sentiment(start, end, 42);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn different_seeds_differ() {
        let (start, end) = window();
        let a = generate_sparse_sentiment(start, end, 1);
        let b = generate_sparse_sentiment(start, end, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn spacing_between_three_and_five_hours() {
        let (start, end) = window();
        let points = generate_sparse_sentiment(start, end, 7);
        for w in points.windows(2) {
            let gap = w[1].timestamp - w[0].timestamp;
            assert!(gap >= Duration::hours(3));
            assert!(gap <= Duration::hours(5));
        }
    }

    #[test]
    fn scores_in_unit_interval() {
        let (start, end) = window();
        for p in generate_sparse_sentiment(start, end, 9) {
            assert!((-1.0..=1.0).contains(&p.score));
        }
    }
}
