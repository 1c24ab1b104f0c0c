//! Resolve a user-typed status name against a space's configured statuses.
//!
//! Matching runs in tiers and the first tier with a hit wins:
//! 1. exact, case-insensitive
//! 2. the available name contains the typed text (shortest name wins)
//! 3. fuzzy: typed characters appear in order in the name, ranked by edit distance

use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusMatchError {
    #[error("no matching status found for {target:?}\n\nAvailable statuses: {}", available.join(", "))]
    NoMatch {
        target: String,
        available: Vec<String>,
    },
}

/// Find the status in `available` that best matches `target`.
pub fn match_status(target: &str, available: &[String]) -> Result<String, StatusMatchError> {
    let target_lower = target.to_lowercase();

    if let Some(exact) = available.iter().find(|s| s.to_lowercase() == target_lower) {
        return Ok(exact.clone());
    }

    // min_by_key keeps the first of equally short candidates
    let contained = available
        .iter()
        .filter(|s| s.to_lowercase().contains(&target_lower))
        .min_by_key(|s| s.chars().count());
    if let Some(best) = contained {
        return Ok(best.clone());
    }

    let fuzzy = available
        .iter()
        .filter_map(|s| fuzzy_rank(target, s).map(|rank| (rank, s)))
        .min_by_key(|(rank, _)| *rank);
    if let Some((_, best)) = fuzzy {
        return Ok(best.clone());
    }

    Err(StatusMatchError::NoMatch {
        target: target.to_string(),
        available: available.to_vec(),
    })
}

/// Approximate-match rank of `source` against `target`.
///
/// Both strings are normalized and case-folded. Returns `None` unless every
/// character of `source` occurs in `target` in order; otherwise the
/// Levenshtein distance between the two, where lower is better.
pub fn fuzzy_rank(source: &str, target: &str) -> Option<usize> {
    let source = fold(source);
    let target = fold(target);

    if !is_subsequence(&source, &target) {
        return None;
    }

    Some(levenshtein(&source, &target))
}

/// Decompose, drop combining marks and lowercase, so `é` and `e\u{301}`
/// both fold to `e`.
fn fold(text: &str) -> Vec<char> {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_subsequence(needle: &[char], haystack: &[char]) -> bool {
    let mut remaining = haystack.iter();
    needle.iter().all(|n| remaining.any(|h| h == n))
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
