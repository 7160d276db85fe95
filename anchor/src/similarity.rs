//! Positional similarity between equal-length strings.
//!
//! Similarity is the fraction of code points that are equal at the same
//! offset. It tolerates substitutions only: an inserted or deleted character
//! shifts every later position and usually drops the score to near zero.

#[cfg(test)]
#[path = "similarity_test.rs"]
mod similarity_test;

/// Fraction of positions at which `a` and `b` hold the same code point.
///
/// Returns `0.0` when the code-point lengths differ and `1.0` for two equal
/// strings, including two empty ones.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() != b.len() {
        return 0.0;
    }
    if a.is_empty() {
        return 1.0;
    }
    let matches = a.iter().zip(&b).filter(|(x, y)| x == y).count();
    ratio(matches, a.len())
}

/// Score a window against `needle`, giving up once the score can no longer
/// exceed `floor`.
///
/// Returns `None` when the window was abandoned or lengths differ. A returned
/// score is identical to what [`similarity`] computes for the same pair.
pub(crate) fn window_score(needle: &[char], window: &[char], floor: f64) -> Option<f64> {
    if needle.len() != window.len() || needle.is_empty() {
        return None;
    }
    let n = needle.len();
    let mut mismatches = 0usize;
    for (x, y) in needle.iter().zip(window) {
        if x != y {
            mismatches += 1;
            if ratio(n - mismatches, n) <= floor {
                return None;
            }
        }
    }
    let score = ratio(n - mismatches, n);
    (score > floor).then_some(score)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(matches: usize, total: usize) -> f64 {
    matches as f64 / total as f64
}
