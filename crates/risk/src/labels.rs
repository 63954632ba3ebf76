//! Risk labeling of k-means clusters.
//!
//! Clusters are ordered by a composite of three ascending ranks over their
//! mean features: volatility first, then mean daily return, then the
//! return/volatility ratio. The top cluster is `Aggressive`, the bottom one
//! `Conservative`, everything in between `Moderate`.

use serde::Serialize;

use stockcast_core::types::RiskLabel;

use crate::features::{FeatureRow, DAILY_RETURN_MEAN, DAILY_RETURN_STD};

const VOLATILITY_WEIGHT: f64 = 1e9;
const RETURN_WEIGHT: f64 = 1e8;
const SHARPE_WEIGHT: f64 = 1e7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    pub mean_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub risk_score: f64,
    pub label: RiskLabel,
}

/// Ascending 1-based ranks; ties share their average rank and NaN stays NaN.
pub fn average_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![f64::NAN; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Label every cluster that received at least one row, in ascending cluster id.
///
/// `assignments[i]` is the cluster of `rows[i]`.
pub fn label_clusters(rows: &[FeatureRow], assignments: &[usize]) -> Vec<ClusterProfile> {
    let n_slots = assignments.iter().max().map_or(0, |m| m + 1);
    let mut sums = vec![(0usize, 0.0f64, 0.0f64); n_slots];
    for (row, &cluster) in rows.iter().zip(assignments) {
        let slot = &mut sums[cluster];
        slot.0 += 1;
        slot.1 += row.values[DAILY_RETURN_MEAN];
        slot.2 += row.values[DAILY_RETURN_STD];
    }

    let mut profiles: Vec<ClusterProfile> = sums
        .into_iter()
        .enumerate()
        .filter(|(_, (size, _, _))| *size > 0)
        .map(|(cluster, (size, ret, vol))| {
            let mean_return = ret / size as f64;
            let volatility = vol / size as f64;
            ClusterProfile {
                cluster,
                size,
                mean_return,
                volatility,
                sharpe: mean_return / volatility,
                risk_score: f64::NAN,
                label: RiskLabel::Moderate,
            }
        })
        .collect();

    let column = |f: fn(&ClusterProfile) -> f64| -> Vec<f64> {
        average_rank(&profiles.iter().map(f).collect::<Vec<_>>())
    };
    let vol_rank = column(|p| p.volatility);
    let ret_rank = column(|p| p.mean_return);
    let sharpe_rank = column(|p| p.sharpe);

    for (i, p) in profiles.iter_mut().enumerate() {
        p.risk_score =
            vol_rank[i] * VOLATILITY_WEIGHT + ret_rank[i] * RETURN_WEIGHT + sharpe_rank[i] * SHARPE_WEIGHT;
    }

    let defined = || profiles.iter().map(|p| p.risk_score).filter(|s| !s.is_nan());
    let max_score = defined().fold(f64::NEG_INFINITY, f64::max);
    let min_score = defined().fold(f64::INFINITY, f64::min);

    for p in profiles.iter_mut() {
        p.label = if p.risk_score == max_score {
            RiskLabel::Aggressive
        } else if p.risk_score == min_score {
            RiskLabel::Conservative
        } else {
            RiskLabel::Moderate
        };
    }
    profiles
}
