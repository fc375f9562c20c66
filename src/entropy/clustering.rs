//! Histogram clustering via Jensen-Shannon divergence.
//!
//! Many coding contexts often want near-identical distributions; clustering
//! lets the encoder ship one serialized `ANSDistribution` per cluster
//! instead of per context, trading a little coding efficiency for a much
//! smaller header.

use crate::error::{JxlError, Result};

/// A group of original context indices sharing one merged histogram.
#[derive(Debug, Clone)]
pub struct Cluster {
  pub members: Vec<usize>,
  pub histogram: Vec<u64>,
}

pub fn normalize(counts: &[u64]) -> Vec<f64> {
  let total: u64 = counts.iter().sum();
  if total == 0 {
    return vec![0.0; counts.len()];
  }
  counts.iter().map(|&c| c as f64 / total as f64).collect()
}

fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
  p.iter()
    .zip(q)
    .filter(|&(&pi, _)| pi > 0.0)
    .map(|(&pi, &qi)| if qi > 0.0 { pi * (pi / qi).log2() } else { 0.0 })
    .sum()
}

/// Symmetric, bounded divergence between two probability distributions.
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64]) -> f64 {
  let m: Vec<f64> = p.iter().zip(q).map(|(&a, &b)| (a + b) / 2.0).collect();
  0.5 * kl_divergence(p, &m) + 0.5 * kl_divergence(q, &m)
}

/// Greedily merge the closest pair of histograms, by Jensen-Shannon
/// divergence of their normalised forms, until either `max_clusters` remain
/// or the smallest remaining pairwise divergence exceeds `threshold`.
pub fn cluster_histograms(
  histograms: &[Vec<u64>],
  max_clusters: usize,
  threshold: f64,
) -> Result<Vec<Cluster>> {
  if histograms.is_empty() {
    return Ok(Vec::new());
  }
  let alphabet_size = histograms[0].len();
  for h in histograms {
    if h.len() != alphabet_size {
      return Err(JxlError::BlockCountMismatch { expected: alphabet_size, actual: h.len() });
    }
  }

  let mut clusters: Vec<Cluster> = histograms
    .iter()
    .enumerate()
    .map(|(i, h)| Cluster { members: vec![i], histogram: h.clone() })
    .collect();

  let target = max_clusters.max(1);
  loop {
    if clusters.len() <= target {
      break;
    }

    let mut best: Option<(f64, usize, usize)> = None;
    for i in 0..clusters.len() {
      let pi = normalize(&clusters[i].histogram);
      for j in (i + 1)..clusters.len() {
        let pj = normalize(&clusters[j].histogram);
        let d = jensen_shannon_divergence(&pi, &pj);
        if best.map_or(true, |(best_d, _, _)| d < best_d) {
          best = Some((d, i, j));
        }
      }
    }

    let (d, i, j) = best.expect("clusters.len() > 1 guarantees at least one pair");
    if d > threshold {
      break;
    }

    let merged = clusters.remove(j);
    clusters[i].members.extend(merged.members);
    for (a, b) in clusters[i].histogram.iter_mut().zip(merged.histogram.iter()) {
      *a += b;
    }
  }

  Ok(clusters)
}
