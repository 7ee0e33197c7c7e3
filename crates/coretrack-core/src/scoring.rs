//! Composite importance score.
//!
//! The score is a fixed linear combination of traffic and search metrics plus
//! two bonus terms:
//!
//! | Term        | Contribution                                                   |
//! |-------------|----------------------------------------------------------------|
//! | pageviews   | `pageviews × w.pageviews`                                      |
//! | sessions    | `sessions × w.sessions`                                        |
//! | clicks      | `clicks × w.clicks`                                            |
//! | impressions | `impressions × w.impressions`                                  |
//! | position    | `(cutoff − position) × w.position_bonus` when `position ≤ cutoff` |
//! | recency     | `w.recency × (horizon − days) / horizon` when `days < horizon` |
//!
//! An `Unknown` metric contributes zero to its term, the lowest value that
//! term can take. Out-of-domain inputs (positions below 1, negative ages,
//! non-finite floats) are clamped rather than rejected.

use crate::metric::Metric;
use crate::policy::ScoringWeights;
use crate::types::ArticleRecord;

#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores one article. Pure: the same record always yields the same
    /// score, rounded to two decimals.
    #[must_use]
    pub fn score(&self, article: &ArticleRecord) -> f64 {
        let w = &self.weights;

        let total = count_term(article.pageviews, w.pageviews)
            + count_term(article.sessions, w.sessions)
            + count_term(article.clicks, w.clicks)
            + count_term(article.impressions, w.impressions)
            + self.position_term(article.position)
            + self.recency_term(article.days_since_update);

        if !total.is_finite() || total <= 0.0 {
            return 0.0;
        }
        (total * 100.0).round() / 100.0
    }

    fn position_term(&self, position: Metric<f64>) -> f64 {
        let Metric::Known(position) = position else {
            return 0.0;
        };
        if !position.is_finite() {
            return 0.0;
        }
        let position = position.max(1.0);
        let cutoff = self.weights.position_bonus_cutoff;
        if position > cutoff {
            return 0.0;
        }
        (cutoff - position) * self.weights.position_bonus
    }

    fn recency_term(&self, days_since_update: Metric<i64>) -> f64 {
        let Metric::Known(days) = days_since_update else {
            return 0.0;
        };
        let horizon = i64::from(self.weights.recency_horizon_days);
        let days = days.max(0);
        if days >= horizon {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = (horizon - days) as f64 / horizon as f64;
        self.weights.recency * fraction
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_term(value: Metric<u64>, weight: f64) -> f64 {
    match value {
        Metric::Known(v) => v as f64 * weight,
        Metric::Unknown => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(path: &str) -> ArticleRecord {
        ArticleRecord::new(path)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn all_unknown_scores_zero() {
        let scorer = Scorer::default();
        assert!(approx(scorer.score(&article("/empty")), 0.0));
    }

    #[test]
    fn default_weights_match_reference_formula() {
        let scorer = Scorer::default();
        let mut a = article("/a");
        a.pageviews = Metric::Known(1000);
        a.sessions = Metric::Known(500);
        a.clicks = Metric::Known(200);
        a.impressions = Metric::Known(10_000);
        a.position = Metric::Known(3.0);

        // 400 + 100 + 60 + 100 + (10 - 3) * 10
        assert!(approx(scorer.score(&a), 730.0));
    }

    #[test]
    fn position_beyond_cutoff_earns_no_bonus() {
        let scorer = Scorer::default();
        let mut a = article("/a");
        a.position = Metric::Known(10.0);
        assert!(approx(scorer.score(&a), 0.0));
        a.position = Metric::Known(42.0);
        assert!(approx(scorer.score(&a), 0.0));
    }

    #[test]
    fn unknown_position_contributes_less_than_any_known_position() {
        let scorer = Scorer::default();
        let mut known = article("/a");
        known.position = Metric::Known(9.5);
        let unknown = article("/b");
        assert!(scorer.score(&known) > scorer.score(&unknown));
    }

    #[test]
    fn out_of_domain_inputs_are_clamped() {
        let scorer = Scorer::default();
        let mut a = article("/a");
        a.position = Metric::Known(-4.0);
        // Clamped to position 1.
        assert!(approx(scorer.score(&a), 90.0));

        a.position = Metric::Known(f64::NAN);
        assert!(approx(scorer.score(&a), 0.0));
    }

    #[test]
    fn recency_term_decays_linearly() {
        let scorer = Scorer::new(ScoringWeights {
            recency: 100.0,
            recency_horizon_days: 100,
            ..ScoringWeights::default()
        });
        let mut a = article("/a");
        a.days_since_update = Metric::Known(25);
        assert!(approx(scorer.score(&a), 75.0));

        a.days_since_update = Metric::Known(-3);
        assert!(approx(scorer.score(&a), 100.0));

        a.days_since_update = Metric::Known(400);
        assert!(approx(scorer.score(&a), 0.0));
    }

    #[test]
    fn score_is_rounded_to_two_decimals() {
        let scorer = Scorer::default();
        let mut a = article("/a");
        a.impressions = Metric::Known(1);
        assert!(approx(scorer.score(&a), 0.01));
        a.impressions = Metric::Known(3);
        a.sessions = Metric::Known(1);
        assert!(approx(scorer.score(&a), 0.23));
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = Scorer::default();
        let mut a = article("/a");
        a.pageviews = Metric::Known(123);
        a.position = Metric::Known(4.2);
        let first = scorer.score(&a);
        for _ in 0..10 {
            assert_eq!(scorer.score(&a).to_bits(), first.to_bits());
        }
    }
}
