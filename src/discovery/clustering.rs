//! Density clustering of user feature vectors
//!
//! [`Clusterer`] is the seam between the segmenter's labelling rules and the
//! clustering algorithm. [`Dbscan`] is the reference implementation: a point
//! is core when at least `min_points` points (itself included) lie within
//! `eps`; clusters are numbered in scan order and a border point joins the
//! first cluster that reaches it.

use crate::config::ClusteringConfig;
use crate::stats::{mean, population_std};

/// Label of points that belong to no dense region
pub const NOISE: i64 = -1;

/// Assigns a cluster label to every point
pub trait Clusterer {
    /// One label per input row; [`NOISE`] for outliers
    fn fit_predict(&self, points: &[Vec<f64>]) -> Vec<i64>;
}

/// Brute-force DBSCAN with Euclidean distance
#[derive(Debug, Clone, PartialEq)]
pub struct Dbscan {
    eps: f64,
    min_points: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_points: usize) -> Self {
        Self { eps, min_points }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(config.eps, config.min_points)
    }

    fn neighbors(&self, points: &[Vec<f64>], idx: usize) -> Vec<usize> {
        let eps_sq = self.eps * self.eps;
        points
            .iter()
            .enumerate()
            .filter(|(_, other)| squared_distance(&points[idx], other) <= eps_sq)
            .map(|(j, _)| j)
            .collect()
    }
}

impl Clusterer for Dbscan {
    fn fit_predict(&self, points: &[Vec<f64>]) -> Vec<i64> {
        let core: Vec<bool> = (0..points.len())
            .map(|i| self.neighbors(points, i).len() >= self.min_points)
            .collect();

        let mut labels = vec![NOISE; points.len()];
        let mut next_cluster: i64 = 0;

        for seed in 0..points.len() {
            if labels[seed] != NOISE || !core[seed] {
                continue;
            }
            labels[seed] = next_cluster;
            let mut frontier = vec![seed];
            while let Some(p) = frontier.pop() {
                for q in self.neighbors(points, p) {
                    if labels[q] == NOISE {
                        labels[q] = next_cluster;
                        if core[q] {
                            frontier.push(q);
                        }
                    }
                }
            }
            next_cluster += 1;
        }

        labels
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Scale every column to zero mean and unit (population) variance
///
/// Constant columns are centred but not scaled.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, Vec::len);
    let columns: Vec<(f64, f64)> = (0..width)
        .map(|c| {
            let column: Vec<f64> = rows.iter().map(|r| r[c]).collect();
            let mu = mean(&column).unwrap_or(0.0);
            let sigma = population_std(&column).unwrap_or(0.0);
            (mu, if sigma > 0.0 { sigma } else { 1.0 })
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&columns)
                .map(|(value, (mu, sigma))| (value - mu) / sigma)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(x: f64, y: f64, n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| vec![x + (i % 3) as f64 * 0.1, y + (i / 3) as f64 * 0.1])
            .collect()
    }

    #[test]
    fn test_two_blobs_and_noise() {
        let mut points = grid(0.0, 0.0, 9);
        points.extend(grid(10.0, 10.0, 9));
        points.push(vec![50.0, 50.0]);

        let labels = Dbscan::new(0.5, 4).fit_predict(&points);

        assert!(labels[..9].iter().all(|&l| l == 0));
        assert!(labels[9..18].iter().all(|&l| l == 1));
        assert_eq!(labels[18], NOISE);
    }

    #[test]
    fn test_min_points_counts_self() {
        let points = vec![vec![0.0], vec![0.3]];
        assert_eq!(Dbscan::new(0.5, 2).fit_predict(&points), vec![0, 0]);
        assert_eq!(Dbscan::new(0.5, 3).fit_predict(&points), vec![NOISE, NOISE]);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // 0.0..0.2 are core with min_points 3; 0.6 is reachable but not core
        let points = vec![vec![0.0], vec![0.1], vec![0.2], vec![0.6]];
        let labels = Dbscan::new(0.45, 3).fit_predict(&points);
        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(Dbscan::new(0.5, 5).fit_predict(&[]).is_empty());
        assert!(standardize(&[]).is_empty());
    }

    #[test]
    fn test_standardize() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaled = standardize(&rows);
        assert_eq!(scaled, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }
}
