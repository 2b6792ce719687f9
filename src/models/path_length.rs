//! Path-length normalisation for isolation trees

/// The n-th harmonic number, H(n) = 1 + 1/2 + ... + 1/n
pub fn harmonic(n: usize) -> f64 {
    (1..=n).map(|i| 1.0 / i as f64).sum()
}

/// Average path length of an unsuccessful search in a binary search tree
/// holding `n` points: c(n) = 2H(n-1) - 2(n-1)/n.
///
/// Used both as the depth correction for leaves that still hold several
/// points and as the normaliser for the anomaly score.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let m = (n - 1) as f64;
    2.0 * harmonic(n - 1) - 2.0 * m / n as f64
}

/// Normalised anomaly score s = 2^(-E[h] / c(sample_size)).
///
/// Scores near 1 are strong anomalies, around 0.5 and below are normal.
pub fn anomaly_score(mean_path_length: f64, sample_size: usize) -> f64 {
    let c = average_path_length(sample_size);
    if c <= 0.0 {
        return 0.5;
    }
    2f64.powf(-mean_path_length / c)
}
