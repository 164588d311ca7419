//! Information-theoretic measures over discrete probability distributions.
//!
//! All measures use the natural logarithm, so values are in nats.

/// Shannon entropy `H(p) = -Σ p·ln p` of a discrete distribution.
///
/// Zero-probability entries contribute nothing.
///
/// ```
/// use interestingness_stats::divergence::entropy;
///
/// assert_eq!(entropy(&[1.0, 0.0]), 0.0);
/// assert!((entropy(&[0.5, 0.5]) - 2f64.ln()).abs() < 1e-12);
/// ```
#[must_use]
pub fn entropy(dist: &[f64]) -> f64 {
    -dist
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// Generalized Jensen-Shannon divergence between equally weighted
/// distributions: the entropy of their mixture minus their mean entropy.
///
/// The result lies in `[0, ln n]` for `n` distributions; it is zero when all
/// distributions agree.
///
/// Returns `None` if there are no distributions or their supports differ in
/// size.
///
/// ```
/// use interestingness_stats::divergence::jensen_shannon;
///
/// let disjoint = [vec![1.0, 0.0], vec![0.0, 1.0]];
/// let jsd = jensen_shannon(&disjoint).unwrap();
/// assert!((jsd - 2f64.ln()).abs() < 1e-12);
///
/// assert_eq!(jensen_shannon::<Vec<f64>>(&[]), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn jensen_shannon<D>(dists: &[D]) -> Option<f64>
where
    D: AsRef<[f64]>,
{
    let first = dists.first()?.as_ref();
    let support = first.len();
    if dists.iter().any(|d| d.as_ref().len() != support) {
        return None;
    }

    let n = dists.len() as f64;
    let mut mixture = vec![0.0; support];
    for dist in dists {
        for (m, p) in mixture.iter_mut().zip(dist.as_ref()) {
            *m += p / n;
        }
    }
    let mean_entropy = dists.iter().map(|d| entropy(d.as_ref())).sum::<f64>() / n;

    // rounding can push identical distributions slightly below zero
    Some((entropy(&mixture) - mean_entropy).max(0.0))
}
