// src/patterns/isolation_forest.rs — Seeded isolation forest
//
// Trees live in flat arenas indexed by usize. Scores follow the usual
// s(x) = 2^(-E[h(x)] / c(ψ)) normalisation: values near 1 isolate quickly
// (outliers), values well below 0.5 sit inside dense regions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct ITree {
    nodes: Vec<Node>,
}

impl ITree {
    fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<ITree>,
    sample_size: usize,
}

/// Expected path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

struct TreeBuilder<'a> {
    data: &'a [Vec<f64>],
    nodes: Vec<Node>,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rng: &mut StdRng, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if depth >= self.max_depth || rows.len() <= 1 {
            return id;
        }

        let dims = self.data[rows[0]].len();
        let splittable: Vec<(usize, f64, f64)> = (0..dims)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &r| {
                    let v = self.data[r][f];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();
        if splittable.is_empty() {
            return id;
        }

        let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| self.data[r][feature] < threshold);

        let left = self.build(rng, left_rows, depth + 1);
        let right = self.build(rng, right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }
}

impl IsolationForest {
    /// Fit `n_trees` trees on subsamples of at most `sample_size` rows.
    /// Rows must share one dimensionality; an empty input yields an empty forest.
    pub fn fit(data: &[Vec<f64>], n_trees: usize, sample_size: usize, seed: u64) -> Self {
        let psi = sample_size.min(data.len()).max(1);
        if data.is_empty() {
            return Self {
                trees: Vec::new(),
                sample_size: psi,
            };
        }

        let max_depth = (psi as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_trees.max(1))
            .map(|_| {
                let rows = rand::seq::index::sample(&mut rng, data.len(), psi).into_vec();
                let mut builder = TreeBuilder {
                    data,
                    nodes: Vec::new(),
                    max_depth,
                };
                builder.build(&mut rng, rows, 0);
                ITree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Self {
            trees,
            sample_size: psi,
        }
    }

    /// Anomaly score in (0, 1]; higher means easier to isolate.
    pub fn score(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len() as f64;
        let c = average_path_length(self.sample_size);
        if c == 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / c)
    }

    pub fn score_all(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|x| self.score(x)).collect()
    }

    /// Inlier mask: the `1 - contamination` share of rows with the lowest
    /// scores. Ties at the cut-off stay inliers.
    pub fn inliers(&self, data: &[Vec<f64>], contamination: f64) -> Vec<bool> {
        let scores = self.score_all(data);
        if scores.is_empty() {
            return Vec::new();
        }
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let keep = (scores.len() as f64 * (1.0 - contamination.clamp(0.0, 1.0))).ceil() as usize;
        let cut = sorted[keep.clamp(1, scores.len()) - 1];
        scores.into_iter().map(|s| s <= cut).collect()
    }
}
