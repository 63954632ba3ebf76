//! K-means clustering (Lloyd iterations, k-means++ seeding) and silhouette score.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stockcast_core::error::{Result, StockcastError};

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub n_clusters: usize,
    /// Independent restarts; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold, relative to the mean feature variance.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// A fitted k-means partition.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub centroids: Array2<f64>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub n_iter: usize,
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

impl KMeans {
    pub fn fit(data: &Array2<f64>, config: &KMeansConfig) -> Result<Self> {
        let n = data.nrows();
        let k = config.n_clusters;
        if k == 0 || k > n {
            return Err(StockcastError::InvalidRequest(format!(
                "cannot form {} clusters from {} samples",
                k, n
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(StockcastError::DataError("k-means input contains non-finite values".into()));
        }

        let variances = data.var_axis(Axis(0), 0.0);
        let tol = config.tolerance * variances.mean().unwrap_or(0.0);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut best: Option<KMeans> = None;
        for _ in 0..config.n_init.max(1) {
            let init = Self::init_plus_plus(data, k, &mut rng);
            let run = Self::lloyd(data, init, config.max_iter.max(1), tol);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        let best = best.ok_or_else(|| StockcastError::ModelError("k-means produced no run".into()))?;
        tracing::debug!(k, inertia = best.inertia, n_iter = best.n_iter, "K-means fitted");
        Ok(best)
    }

    fn nearest(centroids: &Array2<f64>, row: ArrayView1<f64>) -> (usize, f64) {
        centroids
            .rows()
            .into_iter()
            .enumerate()
            .map(|(j, c)| (j, sq_dist(row, c)))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
    }

    fn init_plus_plus(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::zeros((k, data.ncols()));
        let first = rng.gen_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        let mut closest: Array1<f64> = data
            .rows()
            .into_iter()
            .map(|r| sq_dist(r, centroids.row(0)))
            .collect();

        for c in 1..k {
            let total: f64 = closest.sum();
            let pick = if total <= 0.0 {
                rng.gen_range(0..n)
            } else {
                let mut target = rng.gen::<f64>() * total;
                let mut idx = n - 1;
                for (i, d) in closest.iter().enumerate() {
                    if target < *d {
                        idx = i;
                        break;
                    }
                    target -= d;
                }
                idx
            };
            centroids.row_mut(c).assign(&data.row(pick));
            for (i, r) in data.rows().into_iter().enumerate() {
                let d = sq_dist(r, centroids.row(c));
                if d < closest[i] {
                    closest[i] = d;
                }
            }
        }
        centroids
    }

    fn lloyd(data: &Array2<f64>, mut centroids: Array2<f64>, max_iter: usize, tol: f64) -> KMeans {
        let (n, k) = (data.nrows(), centroids.nrows());
        let mut labels = vec![0usize; n];
        let mut n_iter = 0;

        for iter in 0..max_iter {
            n_iter = iter + 1;
            for (i, row) in data.rows().into_iter().enumerate() {
                labels[i] = Self::nearest(&centroids, row).0;
            }

            let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
            let mut counts = vec![0usize; k];
            for (i, row) in data.rows().into_iter().enumerate() {
                sums.row_mut(labels[i]).zip_mut_with(&row, |a, &b| *a += b);
                counts[labels[i]] += 1;
            }

            for j in 0..k {
                if counts[j] > 0 {
                    sums.row_mut(j).mapv_inplace(|v| v / counts[j] as f64);
                } else {
                    // Empty cluster: move it onto the point farthest from its centroid.
                    let far = (0..n)
                        .map(|i| (i, sq_dist(data.row(i), centroids.row(labels[i]))))
                        .fold((0, f64::NEG_INFINITY), |b, c| if c.1 > b.1 { c } else { b })
                        .0;
                    sums.row_mut(j).assign(&data.row(far));
                    labels[far] = j;
                }
            }

            let shift: f64 = centroids
                .rows()
                .into_iter()
                .zip(sums.rows())
                .map(|(a, b)| sq_dist(a, b))
                .sum();
            centroids = sums;
            if shift <= tol {
                break;
            }
        }

        for (i, row) in data.rows().into_iter().enumerate() {
            labels[i] = Self::nearest(&centroids, row).0;
        }
        let inertia = data
            .rows()
            .into_iter()
            .zip(labels.iter())
            .map(|(row, &l)| sq_dist(row, centroids.row(l)))
            .sum();

        KMeans { centroids, labels, inertia, n_iter }
    }
}

/// Mean silhouette coefficient of a partition.
///
/// `None` when it is undefined: fewer than two clusters, or as many clusters as samples.
pub fn silhouette_score(data: &Array2<f64>, labels: &[usize]) -> Option<f64> {
    let n = data.nrows();
    if n != labels.len() || n == 0 {
        return None;
    }
    let n_labels = labels.iter().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; n_labels];
    for &l in labels {
        sizes[l] += 1;
    }
    let present = sizes.iter().filter(|&&s| s > 0).count();
    if present < 2 || present >= n {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        let mut dist_sum = vec![0.0; n_labels];
        for j in 0..n {
            if i != j {
                dist_sum[labels[j]] += sq_dist(data.row(i), data.row(j)).sqrt();
            }
        }
        let own = labels[i];
        if sizes[own] <= 1 {
            continue; // silhouette of a singleton is 0
        }
        let a = dist_sum[own] / (sizes[own] - 1) as f64;
        let b = (0..n_labels)
            .filter(|&l| l != own && sizes[l] > 0)
            .map(|l| dist_sum[l] / sizes[l] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.0, 0.2],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.8, 10.2],
            [-10.0, 10.0],
            [-10.2, 9.9],
            [-9.9, 10.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let data = three_blobs();
        let km = KMeans::fit(&data, &KMeansConfig::default()).unwrap();
        assert_eq!(km.centroids.nrows(), 3);
        for group in km.labels.chunks(3) {
            assert!(group.iter().all(|l| *l == group[0]));
        }
        assert_ne!(km.labels[0], km.labels[3]);
        assert_ne!(km.labels[3], km.labels[6]);
        assert_ne!(km.labels[0], km.labels[6]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = three_blobs();
        let a = KMeans::fit(&data, &KMeansConfig::default()).unwrap();
        let b = KMeans::fit(&data, &KMeansConfig::default()).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_abs_diff_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_too_many_clusters() {
        let data = array![[1.0], [2.0]];
        let config = KMeansConfig { n_clusters: 3, ..KMeansConfig::default() };
        assert!(KMeans::fit(&data, &config).is_err());
    }

    #[test]
    fn test_identical_points() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let config = KMeansConfig { n_clusters: 2, ..KMeansConfig::default() };
        let km = KMeans::fit(&data, &config).unwrap();
        assert_eq!(km.labels.len(), 3);
        assert_abs_diff_eq!(km.inertia, 0.0);
    }

    #[test]
    fn test_silhouette() {
        let data = three_blobs();
        let km = KMeans::fit(&data, &KMeansConfig::default()).unwrap();
        let s = silhouette_score(&data, &km.labels).unwrap();
        assert!(s > 0.9, "well separated blobs, got {}", s);

        assert!(silhouette_score(&data, &[0; 9]).is_none());
        let singletons: Vec<usize> = (0..9).collect();
        assert!(silhouette_score(&data, &singletons).is_none());
    }
}
