use rust_decimal::Decimal;
use tracing::debug;

use crate::error::SolverError;
use crate::math::{correlation_from_covariance, portfolio_variance, sqrt_decimal};
use crate::solver::ClusteringSolver;
use crate::types::Weight;

/// Hierarchical Risk Parity (Lopez de Prado, 2016).
///
/// 1. Single-linkage clustering on correlation distance `sqrt(0.5 * (1 - rho))`
/// 2. Quasi-diagonal ordering: leaves of the dendrogram, left to right
/// 3. Recursive bisection, splitting weight by inverse cluster variance
#[derive(Debug, Clone, Default)]
pub struct HierarchicalRiskParity;

impl ClusteringSolver for HierarchicalRiskParity {
    fn solve(
        &self,
        symbols: &[String],
        covariance: &[Vec<Decimal>],
    ) -> Result<Vec<Weight>, SolverError> {
        let n = symbols.len();
        if n < 2 {
            return Err(SolverError::InsufficientData(
                "need at least 2 assets for HRP".into(),
            ));
        }
        if covariance.len() != n || covariance.iter().any(|row| row.len() != n) {
            return Err(SolverError::DimensionMismatch(format!(
                "covariance is {}x? for {} symbols",
                covariance.len(),
                n
            )));
        }
        if let Some(i) = (0..n).find(|&i| covariance[i][i] <= Decimal::ZERO) {
            return Err(SolverError::Numerical(format!(
                "non-positive variance for {}",
                symbols[i]
            )));
        }

        let order = quasi_diagonal_order(covariance);
        let weights = recursive_bisection(covariance, &order);
        debug!(assets = n, "HRP allocation computed");
        Ok(weights)
    }
}

/// Leaf order of the single-linkage dendrogram.
///
/// Each merge places the cluster created earlier (lower id, leaves first) on
/// the left.
fn quasi_diagonal_order(covariance: &[Vec<Decimal>]) -> Vec<usize> {
    let n = covariance.len();
    let corr = correlation_from_covariance(covariance);
    let half = Decimal::new(5, 1);
    let dist: Vec<Vec<Decimal>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        Decimal::ZERO
                    } else {
                        sqrt_decimal(half * (Decimal::ONE - corr[i][j]))
                    }
                })
                .collect()
        })
        .collect();

    // (id, leaves)
    let mut clusters: Vec<(usize, Vec<usize>)> = (0..n).map(|i| (i, vec![i])).collect();
    let mut next_id = n;

    while clusters.len() > 1 {
        let mut best: Option<(Decimal, usize, usize)> = None;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let d = clusters[a]
                    .1
                    .iter()
                    .flat_map(|&i| clusters[b].1.iter().map(move |&j| (i, j)))
                    .map(|(i, j)| dist[i][j])
                    .fold(Decimal::MAX, Decimal::min);
                if best.map_or(true, |(bd, _, _)| d < bd) {
                    best = Some((d, a, b));
                }
            }
        }
        let Some((_, a, b)) = best else { break };

        let right = clusters.remove(b);
        let left = clusters.remove(a);
        let (first, second) = if left.0 < right.0 { (left, right) } else { (right, left) };
        let mut leaves = first.1;
        leaves.extend(second.1);
        clusters.push((next_id, leaves));
        next_id += 1;
    }

    clusters.pop().map(|(_, leaves)| leaves).unwrap_or_default()
}

fn recursive_bisection(covariance: &[Vec<Decimal>], order: &[usize]) -> Vec<Weight> {
    let mut weights = vec![Decimal::ONE; covariance.len()];
    let mut pending: Vec<Vec<usize>> = vec![order.to_vec()];

    while let Some(cluster) = pending.pop() {
        if cluster.len() < 2 {
            continue;
        }
        let (left, right) = cluster.split_at(cluster.len() / 2);
        let var_left = cluster_variance(covariance, left);
        let var_right = cluster_variance(covariance, right);
        let total = var_left + var_right;
        let alpha = if total > Decimal::ZERO {
            Decimal::ONE - var_left / total
        } else {
            Decimal::new(5, 1)
        };
        for &i in left {
            weights[i] *= alpha;
        }
        for &i in right {
            weights[i] *= Decimal::ONE - alpha;
        }
        pending.push(left.to_vec());
        pending.push(right.to_vec());
    }
    weights
}

/// Variance of the inverse-variance portfolio over `members`.
fn cluster_variance(covariance: &[Vec<Decimal>], members: &[usize]) -> Decimal {
    let sub: Vec<Vec<Decimal>> = members
        .iter()
        .map(|&i| members.iter().map(|&j| covariance[i][j]).collect())
        .collect();
    let inv: Vec<Decimal> = members
        .iter()
        .map(|&i| Decimal::ONE / covariance[i][i])
        .collect();
    let inv_sum: Decimal = inv.iter().copied().sum();
    let w: Vec<Decimal> = inv.iter().map(|x| *x / inv_sum).collect();
    portfolio_variance(&w, &sub)
}
