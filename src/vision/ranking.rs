//! Top-N label ranking over raw classifier scores

use std::cmp::Ordering;

use crate::error::ScribeError;

/// One ranked label with the score it was ranked by
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Label text from the vocabulary
    pub label: String,
    /// Raw classifier score
    pub score: f32,
    /// Position in the vocabulary / score vector
    pub index: usize,
}

/// Return the `n` most confident labels, highest score first.
///
/// Equal scores are ordered by vocabulary index (lower first), and NaN
/// scores rank below every number. `scores` is never reordered.
pub fn rank<S: AsRef<str>>(scores: &[f32], vocabulary: &[S], n: usize) -> Result<Vec<String>, ScribeError> {
    Ok(rank_predictions(scores, vocabulary, n)?
        .into_iter()
        .map(|p| p.label)
        .collect())
}

/// Like [`rank`] but keeps scores and indices alongside the labels
pub fn rank_predictions<S: AsRef<str>>(
    scores: &[f32],
    vocabulary: &[S],
    n: usize,
) -> Result<Vec<Prediction>, ScribeError> {
    if scores.len() != vocabulary.len() {
        return Err(ScribeError::InvalidInput(format!(
            "score vector has {} entries but vocabulary has {}",
            scores.len(),
            vocabulary.len()
        )));
    }
    if n == 0 || n > scores.len() {
        return Err(ScribeError::InvalidInput(format!(
            "n must be within 1..={}, got {}",
            scores.len(),
            n
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    let by_confidence = |&a: &usize, &b: &usize| compare(scores[a], scores[b]).then(a.cmp(&b));

    // Partial selection first, then order only the winners
    if n < order.len() {
        order.select_nth_unstable_by(n - 1, by_confidence);
        order.truncate(n);
    }
    order.sort_unstable_by(by_confidence);

    Ok(order
        .into_iter()
        .map(|index| Prediction {
            label: vocabulary[index].as_ref().to_string(),
            score: scores[index],
            index,
        })
        .collect())
}

/// Descending order with NaN last. `-0.0` and `0.0` compare equal.
fn compare(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let key = |v: f32| if v == 0.0 { 0.0 } else { v };
            key(b).total_cmp(&key(a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: [&str; 5] = ["가", "나", "다", "라", "마"];

    #[test]
    fn test_rank_scenario() {
        let scores = [0.1, 0.9, 0.05, 0.3, 0.05];
        let ranked = rank(&scores, &VOCAB, 3).unwrap();
        assert_eq!(ranked, vec!["나", "라", "가"]);
    }

    #[test]
    fn test_rank_returns_exactly_n_descending() {
        let scores = [0.2, 0.7, 0.01, 0.05, 0.04];
        for n in 1..=5 {
            let ranked = rank_predictions(&scores, &VOCAB, n).unwrap();
            assert_eq!(ranked.len(), n);
            for pair in ranked.windows(2) {
                assert!(pair[0].score > pair[1].score);
            }
        }
    }

    #[test]
    fn test_ties_keep_every_entry() {
        let scores = [0.05, 0.9, 0.05, 0.3, 0.05];
        let ranked = rank(&scores, &VOCAB, 5).unwrap();
        assert_eq!(ranked, vec!["나", "라", "가", "다", "마"]);

        let all_equal = [0.2; 5];
        let ranked = rank(&all_equal, &VOCAB, 4).unwrap();
        assert_eq!(ranked, vec!["가", "나", "다", "라"]);
    }

    #[test]
    fn test_tie_at_cutoff_prefers_lower_index() {
        let scores = [0.1, 0.5, 0.3, 0.3, 0.3];
        let ranked = rank(&scores, &VOCAB, 3).unwrap();
        assert_eq!(ranked, vec!["나", "다", "라"]);
    }

    #[test]
    fn test_scores_are_not_mutated() {
        let scores = vec![0.1, 0.9, 0.05, 0.3, 0.05];
        let copy = scores.clone();
        rank(&scores, &VOCAB, 5).unwrap();
        assert_eq!(scores, copy);
    }

    #[test]
    fn test_nan_ranks_last() {
        let scores = [f32::NAN, 0.1, -3.0, 0.2, f32::NAN];
        let ranked = rank(&scores, &VOCAB, 5).unwrap();
        assert_eq!(ranked, vec!["라", "나", "다", "가", "마"]);
    }

    #[test]
    fn test_signed_zero_tie_prefers_lower_index() {
        let ranked = rank(&[-0.0, 0.0, -1.0], &["가", "나", "다"], 2).unwrap();
        assert_eq!(ranked, vec!["가", "나"]);

        let ranked = rank(&[0.0, -0.0, -1.0], &["가", "나", "다"], 3).unwrap();
        assert_eq!(ranked, vec!["가", "나", "다"]);
    }

    #[test]
    fn test_nan_ranks_below_negative_infinity() {
        let scores = [f32::NAN, f32::NEG_INFINITY, 0.5];
        let ranked = rank(&scores, &["가", "나", "다"], 3).unwrap();
        assert_eq!(ranked, vec!["다", "나", "가"]);
    }

    #[test]
    fn test_length_mismatch_is_invalid_input() {
        let scores = [0.1, 0.2, 0.3];
        assert!(matches!(rank(&scores, &VOCAB, 1), Err(ScribeError::InvalidInput(_))));
    }

    #[test]
    fn test_out_of_range_n_is_invalid_input() {
        let scores = [0.1, 0.9, 0.05, 0.3, 0.05];
        assert!(matches!(rank(&scores, &VOCAB, 0), Err(ScribeError::InvalidInput(_))));
        assert!(matches!(rank(&scores, &VOCAB, 6), Err(ScribeError::InvalidInput(_))));
    }

    #[test]
    fn test_predictions_carry_index_and_score() {
        let scores = [0.1, 0.9, 0.05, 0.3, 0.05];
        let top = rank_predictions(&scores, &VOCAB, 1).unwrap();
        assert_eq!(top[0].index, 1);
        assert_eq!(top[0].label, "나");
        assert!((top[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_large_vocabulary_selection() {
        let vocabulary: Vec<String> = (0..2350).map(|i| format!("L{}", i)).collect();
        let scores: Vec<f32> = (0..2350).map(|i| ((i * 7919) % 2350) as f32).collect();
        let ranked = rank_predictions(&scores, &vocabulary, 5).unwrap();

        let mut expected: Vec<f32> = scores.clone();
        expected.sort_by(|a, b| b.total_cmp(a));
        let got: Vec<f32> = ranked.iter().map(|p| p.score).collect();
        assert_eq!(got, expected[..5].to_vec());
    }
}
