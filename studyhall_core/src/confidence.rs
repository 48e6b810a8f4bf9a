//! Confidence scoring for retrieved answers.
//!
//! A pure function of the best retrieval score, the number of
//! candidates, and the backend's score convention. The band thresholds
//! and multipliers are tuned behavior contracts; do not simplify them.

use crate::ScoreConvention;

/// Compute the confidence for a set of retrieval results.
///
/// For similarity-convention scores (0-1), a three-band piecewise
/// rescale sharpens the separation between good and poor matches:
/// - `>= 0.7` maps `0.7..=1.0` onto `0.7..=0.85`
/// - `0.5..0.7` maps onto `0.5..0.58`
/// - `< 0.5` is scaled down by `0.7`
///
/// Search-rank scores (0-10) are normalized by `score / 10`.
///
/// Multiple qualifying results indicate the query is well covered, so
/// the normalized value is boosted by 1.15 at three or more results and
/// 1.08 at two. The final value is clamped to `[0.0, 1.0]` and rounded
/// to two decimal places.
#[must_use]
pub fn score_confidence(
    max_score: f64,
    result_count: usize,
    convention: ScoreConvention,
) -> f64 {
    if result_count == 0 {
        return 0.0;
    }

    let mut normalized = match convention {
        ScoreConvention::Similarity => {
            if max_score >= 0.7 {
                0.7 + (max_score - 0.7) * 0.5
            } else if max_score >= 0.5 {
                0.5 + (max_score - 0.5) * 0.4
            } else {
                max_score * 0.7
            }
        }
        ScoreConvention::SearchRank => (max_score / 10.0).min(1.0),
    };

    if result_count >= 3 {
        normalized = (normalized * 1.15).min(1.0);
    } else if result_count >= 2 {
        normalized = (normalized * 1.08).min(1.0);
    }

    round2(normalized.clamp(0.0, 1.0))
}

/// Round to exactly two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
