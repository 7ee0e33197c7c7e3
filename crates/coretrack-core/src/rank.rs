//! Leaderboard ordering.

use std::cmp::Ordering;

use crate::scoring::Scorer;
use crate::types::{ArticleRecord, ScoredArticle};

/// Scores, sorts and truncates articles into a leaderboard of at most `top_n`.
///
/// Order is composite score descending, then page path ascending, so equal
/// scores never share a rank and repeated runs over the same input produce
/// the same order. Ranks are exactly `1..=len`.
#[must_use]
pub fn rank_articles<I>(articles: I, scorer: &Scorer, top_n: usize) -> Vec<ScoredArticle>
where
    I: IntoIterator<Item = ArticleRecord>,
{
    let mut scored: Vec<(ArticleRecord, f64)> = articles
        .into_iter()
        .map(|article| {
            let score = scorer.score(&article);
            (article, score)
        })
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| leaderboard_order(a, *a_score, b, *b_score));
    scored.truncate(top_n);

    scored
        .into_iter()
        .zip(1_u32..)
        .map(|((article, composite_score), rank_position)| ScoredArticle {
            article,
            composite_score,
            rank_position,
        })
        .collect()
}

fn leaderboard_order(a: &ArticleRecord, a_score: f64, b: &ArticleRecord, b_score: f64) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| a.page_path.cmp(&b.page_path))
}
