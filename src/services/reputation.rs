//! Reputation scoring for a station, derived from its accumulated reviews
//! and price reports.
//!
//! The aggregation is pure: given the same rows it always produces the same
//! output, and it never touches the database or the network. Every divisor
//! is guarded, so no input set can produce a NaN.
//!
//! New stations start trusted. A station with no signals at all scores a
//! flat 5.0 stars / 100% trust, and an unreported pump check counts as a
//! pass. Absence of a negative signal is treated as a positive one; only an
//! explicit failed check drags the score down.

use serde::Serialize;

use crate::models::{PriceReport, Review};

/// Score assumed for a signal where the driver did not run the pump check
const OPTIMISTIC_SCORE: f64 = 5.0;

/// Pool entries at or above this count toward the accuracy ratio
const ACCURATE_THRESHOLD: f64 = 4.0;

const VERIFIED_BONUS: i64 = 300;
const ENGAGEMENT_POINTS_PER_RESPONSE: i64 = 50;
const ENGAGEMENT_POINTS_CAP: i64 = 200;
const ACTIVITY_POINTS_PER_EVENT: i64 = 10;
const ACTIVITY_POINTS_CAP: i64 = 200;

/// A single meter-accuracy observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracySignal {
    /// Review sub-rating, 1-5
    Graded(i32),
    /// Report pump check passed (meter_accuracy == 100)
    Verified,
    /// Report pump check failed (any other recorded value)
    Failed,
    /// No check was submitted
    Unreported,
}

impl AccuracySignal {
    pub fn from_review(sub_rating: Option<i32>) -> Self {
        match sub_rating {
            Some(v) => AccuracySignal::Graded(v),
            None => AccuracySignal::Unreported,
        }
    }

    pub fn from_report(meter_accuracy: Option<i32>) -> Self {
        match meter_accuracy {
            None => AccuracySignal::Unreported,
            Some(100) => AccuracySignal::Verified,
            Some(_) => AccuracySignal::Failed,
        }
    }

    /// Maps a signal to its pool score. `Unreported` maps to the optimistic
    /// default: a driver who did not check the pump is not evidence against
    /// the station.
    pub fn score(self) -> f64 {
        match self {
            AccuracySignal::Graded(v) => v as f64,
            AccuracySignal::Verified => 5.0,
            AccuracySignal::Failed => 1.0,
            AccuracySignal::Unreported => OPTIMISTIC_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Milestones {
    /// Trust percentage at or above 90
    pub trusted: bool,
    /// At least 10 combined reviews and reports
    pub established: bool,
    /// Responded to at least 90% of reviews (vacuously true with none)
    pub responsive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reputation {
    pub accuracy_ratio: f64,
    pub trust_points: i64,
    pub star_rating: f64,
    pub trust_percentage: i64,
    pub review_count: i64,
    pub report_count: i64,
    pub response_rate: f64,
    pub milestones: Milestones,
}

/// Derives the composite reputation for a station.
///
/// `verification_count` is the number of passed pump checks across the
/// station's history; together with the report count it feeds the activity
/// points.
pub fn aggregate(
    reviews: &[Review],
    reports: &[PriceReport],
    verified: bool,
    verification_count: i64,
) -> Reputation {
    let review_count = reviews.len() as i64;
    let report_count = reports.len() as i64;

    // Meter-accuracy pool
    let pool: Vec<f64> = reviews
        .iter()
        .map(|r| AccuracySignal::from_review(r.meter_accuracy).score())
        .chain(
            reports
                .iter()
                .map(|r| AccuracySignal::from_report(r.meter_accuracy).score()),
        )
        .collect();

    let accuracy_ratio = if pool.is_empty() {
        1.0
    } else {
        let accurate = pool.iter().filter(|s| **s >= ACCURATE_THRESHOLD).count();
        accurate as f64 / pool.len() as f64
    };

    let responded_reviews = reviews
        .iter()
        .filter(|r| r.manager_response.is_some())
        .count() as i64;

    let engagement_points =
        (responded_reviews * ENGAGEMENT_POINTS_PER_RESPONSE).min(ENGAGEMENT_POINTS_CAP);
    let activity_points =
        ((report_count + verification_count) * ACTIVITY_POINTS_PER_EVENT).min(ACTIVITY_POINTS_CAP);

    let trust_points = if verified { VERIFIED_BONUS } else { 0 }
        + (accuracy_ratio * 300.0).round() as i64
        + engagement_points
        + activity_points;

    let star_rating = if review_count == 0 && report_count == 0 {
        // New stations start trusted, even unverified ones
        5.0
    } else {
        let avg_rating = if review_count == 0 {
            OPTIMISTIC_SCORE
        } else {
            reviews.iter().map(|r| r.rating as f64).sum::<f64>() / review_count as f64
        };
        let verified_term = if verified { 5.0 } else { 0.0 };

        accuracy_ratio * 5.0 * 0.4 + avg_rating * 0.4 + verified_term * 0.2
    };

    let trust_percentage = (star_rating / 5.0 * 100.0).round() as i64;

    let response_rate = if review_count == 0 {
        1.0
    } else {
        responded_reviews as f64 / review_count as f64
    };

    let milestones = Milestones {
        trusted: trust_percentage >= 90,
        established: review_count + report_count >= 10,
        responsive: response_rate >= 0.9,
    };

    Reputation {
        accuracy_ratio,
        trust_points,
        star_rating,
        trust_percentage,
        review_count,
        report_count,
        response_rate,
        milestones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn review(rating: i32, meter_accuracy: Option<i32>, responded: bool) -> Review {
        Review {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            user_ref: "driver".to_string(),
            rating,
            meter_accuracy,
            comment: None,
            manager_response: responded.then(|| "thanks".to_string()),
            created_at: Utc::now(),
        }
    }

    fn report(meter_accuracy: Option<i32>) -> PriceReport {
        PriceReport {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            user_ref: "driver".to_string(),
            fuel_type: "pms".to_string(),
            reported_price: 650.0,
            available: true,
            meter_accuracy,
            notes: None,
            manager_response: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_station_starts_fully_trusted() {
        let rep = aggregate(&[], &[], false, 0);

        assert_eq!(rep.star_rating, 5.0);
        assert_eq!(rep.trust_percentage, 100);
        assert_eq!(rep.accuracy_ratio, 1.0);
        assert!(rep.milestones.trusted);
        assert!(rep.milestones.responsive);
        assert!(!rep.milestones.established);
    }

    #[test]
    fn verified_station_with_clean_signals_scores_96() {
        // Two reviews (4 and 5 stars, no sub-rating) and one passed pump
        // check: pool is [5, 5, 5], ratio 1.0, stars
        // 1.0*5*0.4 + 4.5*0.4 + 5*0.2 = 4.8
        let reviews = vec![review(4, None, false), review(5, None, false)];
        let reports = vec![report(Some(100))];

        let rep = aggregate(&reviews, &reports, true, 1);

        assert_eq!(rep.accuracy_ratio, 1.0);
        assert!((rep.star_rating - 4.8).abs() < 1e-9);
        assert_eq!(rep.trust_percentage, 96);
        // 300 verified + 300 accuracy + 0 engagement + 20 activity
        assert_eq!(rep.trust_points, 620);
    }

    #[test]
    fn failed_pump_checks_drag_the_ratio_down() {
        let reports = vec![report(Some(100)), report(Some(40)), report(None)];

        let rep = aggregate(&[], &reports, false, 1);

        // Pool [5, 1, 5]: two of three at or above 4
        assert!((rep.accuracy_ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn review_without_sub_rating_joins_the_pool_optimistically() {
        // A review that skipped the pump check still contributes the
        // optimistic 5, it is not excluded from the pool
        let reviews = vec![review(4, None, false)];
        let reports = vec![report(Some(40))];

        let rep = aggregate(&reviews, &reports, false, 0);

        // Pool [5, 1], not [1]
        assert!((rep.accuracy_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn review_sub_ratings_carry_their_value() {
        let reviews = vec![review(5, Some(2), false), review(5, Some(5), false)];

        let rep = aggregate(&reviews, &[], false, 0);

        // Pool [2, 5]: only one at or above 4
        assert!((rep.accuracy_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn station_with_reports_but_no_reviews_has_a_valid_rating() {
        let reports = vec![report(Some(20))];

        let rep = aggregate(&[], &reports, false, 0);

        assert!(rep.star_rating.is_finite());
        // Pool [1], ratio 0: stars 0 + 5*0.4 + 0 = 2.0
        assert!((rep.star_rating - 2.0).abs() < 1e-9);
        assert_eq!(rep.trust_percentage, 40);
    }

    #[test]
    fn engagement_and_activity_points_are_capped() {
        let reviews: Vec<Review> = (0..10).map(|_| review(5, None, true)).collect();
        let reports: Vec<PriceReport> = (0..30).map(|_| report(Some(100))).collect();

        let rep = aggregate(&reviews, &reports, true, 30);

        // 300 + 300 + capped 200 + capped 200
        assert_eq!(rep.trust_points, 1000);
    }

    #[test]
    fn trust_points_stay_within_bounds() {
        let cases = vec![
            aggregate(&[], &[], false, 0),
            aggregate(&[], &[], true, 0),
            aggregate(&[review(1, Some(1), false)], &[report(Some(0))], false, 0),
            aggregate(
                &(0..50).map(|_| review(5, Some(5), true)).collect::<Vec<_>>(),
                &(0..50).map(|_| report(Some(100))).collect::<Vec<_>>(),
                true,
                100,
            ),
        ];

        for rep in cases {
            assert!((0..=1000).contains(&rep.trust_points));
            assert!((0.0..=1.0).contains(&rep.accuracy_ratio));
        }
    }

    #[test]
    fn response_rate_is_vacuously_perfect_without_reviews() {
        let rep = aggregate(&[], &[report(None)], false, 0);

        assert_eq!(rep.response_rate, 1.0);
        assert!(rep.milestones.responsive);
    }

    #[test]
    fn responsive_milestone_requires_ninety_percent() {
        let mut reviews: Vec<Review> = (0..9).map(|_| review(4, None, true)).collect();
        reviews.push(review(4, None, false));
        let rep = aggregate(&reviews, &[], false, 0);
        assert!(rep.milestones.responsive);

        reviews.push(review(4, None, false));
        let rep = aggregate(&reviews, &[], false, 0);
        assert!(!rep.milestones.responsive);
    }

    #[test]
    fn established_milestone_counts_reviews_and_reports() {
        let reviews: Vec<Review> = (0..4).map(|_| review(4, None, false)).collect();
        let reports: Vec<PriceReport> = (0..6).map(|_| report(None)).collect();

        let rep = aggregate(&reviews, &reports, false, 0);

        assert!(rep.milestones.established);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let reviews = vec![review(3, Some(4), true), review(5, None, false)];
        let reports = vec![report(Some(100)), report(Some(10))];

        let a = aggregate(&reviews, &reports, true, 2);
        let b = aggregate(&reviews, &reports, true, 2);

        assert_eq!(a.trust_points, b.trust_points);
        assert_eq!(a.star_rating, b.star_rating);
        assert_eq!(a.trust_percentage, b.trust_percentage);
    }
}
