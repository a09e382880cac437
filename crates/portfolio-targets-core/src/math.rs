//! Small dense linear-algebra and statistics helpers over `Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Portfolio variance: w' * Sigma * w.
pub fn portfolio_variance(w: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    let sigma_w = mat_vec_multiply(sigma, w);
    vec_dot(w, &sigma_w)
}

/// Portfolio standard deviation: sqrt(w' * Sigma * w).
pub fn portfolio_std(w: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    sqrt_decimal(portfolio_variance(w, sigma))
}

/// Upper bound on the largest eigenvalue (Gershgorin: max absolute row sum).
pub fn gershgorin_bound(sigma: &[Vec<Decimal>]) -> Decimal {
    sigma
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<Decimal>())
        .fold(Decimal::ZERO, Decimal::max)
}

/// Square root via Newton's method.
pub fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if val == Decimal::ONE {
        return Decimal::ONE;
    }
    let two = dec!(2);
    let mut guess = if val > Decimal::ONE { val / two } else { val.max(dec!(0.0000001)) };
    for _ in 0..60 {
        if guess.is_zero() {
            return Decimal::ZERO;
        }
        let next = (guess + val / guess) / two;
        if (next - guess).abs() < dec!(0.0000000000000001) {
            return next;
        }
        guess = next;
    }
    guess
}

/// Sample covariance (n - 1 denominator) of equally long series.
///
/// Series are truncated to the shortest length, keeping the most recent
/// observations.
#[allow(clippy::needless_range_loop)]
pub fn sample_covariance(series: &[&[Decimal]]) -> Vec<Vec<Decimal>> {
    let n = series.len();
    let len = series.iter().map(|s| s.len()).min().unwrap_or(0);
    let mut cov = vec![vec![Decimal::ZERO; n]; n];
    if len < 2 {
        return cov;
    }

    let tails: Vec<&[Decimal]> = series.iter().map(|s| &s[s.len() - len..]).collect();
    let count = Decimal::from(len as i64);
    let means: Vec<Decimal> = tails
        .iter()
        .map(|s| s.iter().copied().sum::<Decimal>() / count)
        .collect();
    let denom = Decimal::from(len as i64 - 1);

    for i in 0..n {
        for j in i..n {
            let c: Decimal = tails[i]
                .iter()
                .zip(tails[j].iter())
                .map(|(a, b)| (*a - means[i]) * (*b - means[j]))
                .sum::<Decimal>()
                / denom;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// Correlation matrix from a covariance matrix. Zero-variance rows get 0
/// off-diagonal correlation.
#[allow(clippy::needless_range_loop)]
pub fn correlation_from_covariance(cov: &[Vec<Decimal>]) -> Vec<Vec<Decimal>> {
    let n = cov.len();
    let vols: Vec<Decimal> = (0..n).map(|i| sqrt_decimal(cov[i][i])).collect();
    let mut corr = vec![vec![Decimal::ZERO; n]; n];
    for i in 0..n {
        for j in 0..n {
            corr[i][j] = if i == j {
                Decimal::ONE
            } else if vols[i].is_zero() || vols[j].is_zero() {
                Decimal::ZERO
            } else {
                (cov[i][j] / (vols[i] * vols[j])).clamp(-Decimal::ONE, Decimal::ONE)
            };
        }
    }
    corr
}
