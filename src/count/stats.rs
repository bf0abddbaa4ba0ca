//! Call quality and strand bias scores.

use statrs::distribution::{Discrete, Hypergeometric};
use statrs::function::beta::ln_beta;
use statrs::function::factorial::ln_binomial;

/// Relative tolerance when comparing table probabilities in Fisher's test.
const FISHER_REL_TOLERANCE: f64 = 1e-7;

/// Natural log of `P(X >= k)` for `X ~ BetaBinomial(n, alpha, beta)`.
pub fn ln_beta_binomial_tail(n: u32, k: u32, alpha: f64, beta: f64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    if k > n {
        return f64::NEG_INFINITY;
    }
    let ln_norm = ln_beta(alpha, beta);
    let terms = (k..=n)
        .map(|i| {
            ln_binomial(n as u64, i as u64) + ln_beta(i as f64 + alpha, (n - i) as f64 + beta)
                - ln_norm
        })
        .collect::<Vec<_>>();
    let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let sum = terms.iter().map(|t| (t - max).exp()).sum::<f64>();
    (max + sum.ln()).min(0.0)
}

/// `P(X >= k)` for `X ~ BetaBinomial(n, alpha, beta)`.
pub fn beta_binomial_tail(n: u32, k: u32, alpha: f64, beta: f64) -> f64 {
    ln_beta_binomial_tail(n, k, alpha, beta).exp()
}

/// Phred-scaled probability that `alt_count` of `depth` supporting reads
/// arose by chance.
pub fn phred_quality(alt_count: u32, depth: u32, alpha: f64, beta: f64) -> f64 {
    let ln_p = ln_beta_binomial_tail(depth, alt_count, alpha, beta);
    if ln_p == 0.0 {
        0.0
    } else {
        -10.0 * ln_p / std::f64::consts::LN_10
    }
}

/// Two-tailed p-value of Fisher's exact test on the table
/// `[[ref_fwd, ref_rev], [alt_fwd, alt_rev]]`.
pub fn fisher_two_tailed(ref_fwd: u32, ref_rev: u32, alt_fwd: u32, alt_rev: u32) -> f64 {
    let (a, b, c, d) = (
        ref_fwd as u64,
        ref_rev as u64,
        alt_fwd as u64,
        alt_rev as u64,
    );
    let n = a + b + c + d;
    let row1 = a + b;
    let col1 = a + c;
    if row1 == 0 || col1 == 0 || row1 == n || col1 == n {
        return 1.0;
    }
    let dist = match Hypergeometric::new(n, row1, col1) {
        Ok(dist) => dist,
        Err(_) => return 1.0,
    };

    let p_observed = dist.pmf(a);
    let threshold = p_observed * (1.0 + FISHER_REL_TOLERANCE);
    let min_a = (row1 + col1).saturating_sub(n);
    let max_a = row1.min(col1);

    let mut p_value = 0.0;
    let mut any_less_extreme = false;
    for k in min_a..=max_a {
        let p = dist.pmf(k);
        if p <= threshold {
            p_value += p;
        } else {
            any_less_extreme = true;
        }
    }

    if any_less_extreme {
        p_value.min(1.0)
    } else {
        1.0
    }
}

/// Phred-scaled strand bias; identical strand ratios give exactly 0.
pub fn strand_bias_score(ref_fwd: u32, ref_rev: u32, alt_fwd: u32, alt_rev: u32) -> f64 {
    (-10.0 * fisher_two_tailed(ref_fwd, ref_rev, alt_fwd, alt_rev).log10()).abs()
}
