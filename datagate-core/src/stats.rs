//! Two-sample hypothesis tests used for drift detection.
//!
//! - [`ks_2samp`]: Kolmogorov–Smirnov test on two numeric samples. Small
//!   samples get the exact p-value; large ones the asymptotic Kolmogorov
//!   distribution.
//! - [`chi2_contingency`]: chi-square test of independence on a 2×k table of
//!   category counts, with Yates' continuity correction when dof = 1.
//!
//! Inputs must be finite. Callers filter nulls beforehand.

const MAX_ITERATIONS: usize = 200;
const EPSILON: f64 = 1e-14;
const FP_MIN: f64 = 1e-300;

/// Largest `n1 * n2` for which [`ks_2samp`] computes the exact p-value.
pub const KS_EXACT_MAX_PRODUCT: usize = 10_000;

/// Outcome of a Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Largest absolute distance between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
}

/// Outcome of a chi-square contingency test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov test. Returns `None` if either sample is empty.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Option<KsResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    debug_assert!(
        a.iter().chain(b).all(|x| x.is_finite()),
        "ks_2samp expects finite samples"
    );

    // total_cmp only orders NaN consistently; the samples are NaN-free.
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;

    // Walk both sorted samples, stepping past ties together so equal values
    // never open a spurious gap between the CDFs.
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] == x {
            i += 1;
        }
        while j < n2 && b[j] == x {
            j += 1;
        }
        let cdf1 = i as f64 / n1 as f64;
        let cdf2 = j as f64 / n2 as f64;
        d = d.max((cdf1 - cdf2).abs());
    }

    let p_value = if n1 * n2 <= KS_EXACT_MAX_PRODUCT {
        ks_exact_survival(n1, n2, d)
    } else {
        let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
        kolmogorov_survival((en + 0.12 + 0.11 / en) * d)
    };
    Some(KsResult {
        statistic: d,
        p_value,
    })
}

/// Exact two-sided `P(D >= d)` for sample sizes `n1` and `n2`.
///
/// Every ordering of the pooled sample is a monotone lattice path from
/// `(0, 0)` to `(n1, n2)`, all equally likely. Point `(i, j)` has CDF gap
/// `|i/n1 - j/n2|`; the p-value is the share of paths that touch a point
/// whose gap reaches `d`. Paths are counted in `f64`, which holds every
/// count exactly while it stays below 2^53.
pub fn ks_exact_survival(n1: usize, n2: usize, d: f64) -> f64 {
    let (m, n) = (n1 as i64, n2 as i64);
    // d is a multiple of 1 / (n1 * n2), so the scaled bound is an integer.
    let bound = (d * (m * n) as f64).round() as i64;
    let outside = |i: i64, j: i64| (i * n - j * m).abs() >= bound;

    // Row-by-row: total[j] counts all paths to (i, j), touched[j] those that
    // have already reached the boundary.
    let mut total = vec![1.0f64; n2 + 1];
    let mut touched = vec![0.0f64; n2 + 1];
    for j in 0..=n {
        if outside(0, j) {
            touched[j as usize] = total[j as usize];
        }
    }
    for i in 1..=m {
        if outside(i, 0) {
            touched[0] = total[0];
        }
        for j in 1..=n2 {
            total[j] += total[j - 1];
            touched[j] += touched[j - 1];
            if outside(i, j as i64) {
                touched[j] = total[j];
            }
        }
    }
    (touched[n2] / total[n2]).clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution,
/// `Q(λ) = 2 Σ_{j≥1} (-1)^{j-1} exp(-2 j² λ²)`.
///
/// Returns 1.0 when the series fails to converge, which only happens for λ
/// near zero where the true value is 1.
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous: f64 = 0.0;

    for j in 1..=100 {
        let j = j as f64;
        let term = sign * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous = term.abs();
    }
    1.0
}

/// Chi-square test of independence on a 2×k table.
///
/// `first[i]` and `second[i]` are the counts of category `i` in each group.
/// Returns `None` if the slices differ in length, or if a group or category
/// has no observations (an expected frequency would be zero).
pub fn chi2_contingency(first: &[f64], second: &[f64]) -> Option<ChiSquareResult> {
    if first.len() != second.len() || first.is_empty() {
        return None;
    }

    let totals = [first.iter().sum::<f64>(), second.iter().sum::<f64>()];
    let grand = totals[0] + totals[1];
    if totals.iter().any(|t| *t <= 0.0) {
        return None;
    }

    let k = first.len();
    let dof = k - 1;
    if dof == 0 {
        // A single shared category: the groups cannot differ.
        return Some(ChiSquareResult {
            statistic: 0.0,
            dof,
            p_value: 1.0,
        });
    }

    let mut statistic = 0.0;
    for (f, s) in first.iter().zip(second) {
        let row_total = f + s;
        if row_total <= 0.0 {
            return None;
        }
        for (observed, total) in [(*f, totals[0]), (*s, totals[1])] {
            let expected = row_total * total / grand;
            let mut diff = (observed - expected).abs();
            if dof == 1 {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }

    Some(ChiSquareResult {
        statistic,
        dof,
        p_value: chi2_survival(statistic, dof as f64),
    })
}

/// Upper tail of the chi-square distribution with `dof` degrees of freedom.
pub fn chi2_survival(x: f64, dof: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(dof / 2.0, x / 2.0)
}

/// Regularized upper incomplete gamma function `Q(a, x)`.
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let q = if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    };
    q.clamp(0.0, 1.0)
}

/// `P(a, x)` by its series expansion; converges quickly for `x < a + 1`.
fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut del = 1.0 / a;
    let mut sum = del;
    for _ in 0..MAX_ITERATIONS {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPSILON {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// `Q(a, x)` by Lentz's continued fraction; converges quickly for `x ≥ a + 1`.
fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FP_MIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITERATIONS {
        let i = i as f64;
        let an = -i * (i - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FP_MIN {
            d = FP_MIN;
        }
        c = b + an / c;
        if c.abs() < FP_MIN {
            c = FP_MIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Natural log of the gamma function (Lanczos approximation), `x > 0`.
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    for c in COEFFICIENTS {
        y += 1.0;
        series += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_ln_gamma_known_values() {
        // Γ(1) = 1, Γ(5) = 24, Γ(0.5) = √π
        assert!(close(ln_gamma(1.0), 0.0, 1e-9));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-9));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-9));
    }

    #[test]
    fn test_chi2_survival_known_values() {
        // Critical value for α = 0.05 at one degree of freedom.
        assert!(close(chi2_survival(3.841_458_820_694_124, 1.0), 0.05, 1e-6));
        // With two degrees of freedom the tail is exp(-x/2).
        assert!(close(chi2_survival(4.0, 2.0), (-2.0f64).exp(), 1e-10));
        assert!(close(chi2_survival(30.0, 2.0), (-15.0f64).exp(), 1e-12));
        assert_eq!(chi2_survival(0.0, 3.0), 1.0);
    }

    #[test]
    fn test_kolmogorov_survival() {
        assert_eq!(kolmogorov_survival(0.0), 1.0);
        // λ ≈ 1.358 is the 5% critical value.
        assert!(close(kolmogorov_survival(1.358), 0.05, 1e-3));
        assert!(kolmogorov_survival(3.0) < 1e-6);
    }

    #[test]
    fn test_ks_identical_samples() {
        let a: Vec<f64> = (0..50).map(|i| i as f64 * 0.3).collect();
        let result = ks_2samp(&a, &a).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..100).map(|i| 1000.0 + i as f64).collect();
        let result = ks_2samp(&a, &b).unwrap();
        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_ks_ties_across_samples() {
        let a = [1.0, 1.0, 2.0, 2.0];
        let b = [1.0, 2.0];
        let result = ks_2samp(&a, &b).unwrap();
        assert_eq!(result.statistic, 0.0);
    }

    #[test]
    fn test_ks_small_samples_use_exact_distribution() {
        let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let b: Vec<f64> = (6..16).map(|i| i as f64).collect();
        let result = ks_2samp(&a, &b).unwrap();

        assert!(close(result.statistic, 0.6, 1e-12));
        // 2 * C(20, 4) / C(20, 10)
        assert!(close(result.p_value, 2.0 * 4845.0 / 184_756.0, 1e-12));
        // The asymptotic series would put this below 0.05.
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_ks_exact_survival_properties() {
        assert_eq!(ks_exact_survival(5, 5, 0.0), 1.0);
        assert!(close(
            ks_exact_survival(8, 12, 0.5),
            ks_exact_survival(12, 8, 0.5),
            1e-12
        ));
        // Only the two extreme orderings separate the samples completely.
        let p = ks_exact_survival(100, 100, 1.0);
        assert!(p > 0.0 && p < 1e-50);
    }

    #[test]
    fn test_ks_large_samples_use_asymptotic_distribution() {
        let a: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let b: Vec<f64> = (30..230).map(|i| i as f64).collect();
        let result = ks_2samp(&a, &b).unwrap();

        let en = (200.0 * 200.0 / 400.0f64).sqrt();
        let expected = kolmogorov_survival((en + 0.12 + 0.11 / en) * result.statistic);
        assert_eq!(result.p_value, expected);
    }

    #[test]
    fn test_ks_empty_sample() {
        assert!(ks_2samp(&[], &[1.0]).is_none());
    }

    #[test]
    fn test_chi2_shifted_frequencies() {
        // {a: 50, b: 50} vs {a: 95, b: 5}
        let result = chi2_contingency(&[50.0, 50.0], &[95.0, 5.0]).unwrap();
        assert_eq!(result.dof, 1);
        // Yates-corrected statistic: |O - E| = 22.5 shrinks to 22.
        let expected = 2.0 * 22.0 * 22.0 / 72.5 + 2.0 * 22.0 * 22.0 / 27.5;
        assert!(close(result.statistic, expected, 1e-9));
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_chi2_identical_frequencies() {
        let result = chi2_contingency(&[10.0, 20.0, 30.0], &[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(result.dof, 2);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_chi2_single_category() {
        let result = chi2_contingency(&[7.0], &[3.0]).unwrap();
        assert_eq!(result.dof, 0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_chi2_rejects_empty_group() {
        assert!(chi2_contingency(&[0.0, 0.0], &[1.0, 2.0]).is_none());
        assert!(chi2_contingency(&[1.0], &[1.0, 2.0]).is_none());
    }
}
