//! Isolation forest ensemble.
//!
//! Anomalies are "few and different": random axis-aligned splits separate
//! them from the rest of the data in fewer steps than points sitting in dense
//! regions. Each tree is grown on a random sub-sample; a point's anomaly
//! score is derived from its mean depth across the ensemble.
//!
//! Every random choice comes from a per-tree `StdRng` whose seed is drawn
//! from one master generator, so a tree's shape depends only on the master
//! seed and its position in the ensemble.

use crate::config::DetectionConfig;
use crate::feature_builder::FeatureMatrix;
use crate::models::path_length::{anomaly_score, average_path_length};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
enum Node {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
        /// c(size), the expected extra depth to isolate the points left here
        correction: f64,
    },
}

impl Node {
    fn leaf(size: usize) -> Self {
        Node::Leaf {
            size,
            correction: average_path_length(size),
        }
    }
}

/// One random partition tree
#[derive(Debug, Clone)]
pub struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    /// Grow a tree over the rows of `matrix` named by `sample`
    pub fn grow(matrix: &FeatureMatrix, sample: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_node(matrix, sample, 0, height_limit, rng),
        }
    }

    /// Depth at which `point` lands in a leaf, plus that leaf's correction
    pub fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold { left } else { right };
                    depth += 1;
                }
                Node::Leaf { correction, .. } => return depth as f64 + correction,
            }
        }
    }

    /// Number of points stored across all leaves
    pub fn sample_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            match node {
                Node::Internal { left, right, .. } => count(left) + count(right),
                Node::Leaf { size, .. } => *size,
            }
        }
        count(&self.root)
    }

    pub fn is_single_leaf(&self) -> bool {
        matches!(self.root, Node::Leaf { .. })
    }
}

fn grow_node(
    matrix: &FeatureMatrix,
    points: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if points.len() <= 1 || depth >= height_limit {
        return Node::leaf(points.len());
    }

    // Only dimensions that still vary inside this node can split it.
    let splittable: Vec<(usize, f64, f64)> = (0..matrix.width())
        .filter_map(|feature| {
            let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let v = matrix.row(i)[feature];
                (lo.min(v), hi.max(v))
            });
            (min < max).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::leaf(points.len());
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);

    // threshold lies in [min, max), so both sides are non-empty
    let (left, right): (Vec<usize>, Vec<usize>) = points
        .into_iter()
        .partition(|&i| matrix.row(i)[feature] <= threshold);

    Node::Internal {
        feature,
        threshold,
        left: Box::new(grow_node(matrix, left, depth + 1, height_limit, rng)),
        right: Box::new(grow_node(matrix, right, depth + 1, height_limit, rng)),
    }
}

/// Ensemble of isolation trees trained on one feature matrix
#[derive(Debug, Clone)]
pub struct OutlierForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl OutlierForest {
    /// Train a fresh forest.
    ///
    /// The matrix must have at least one row; callers screen out degenerate
    /// matrices before fitting.
    pub fn fit(matrix: &FeatureMatrix, config: &DetectionConfig) -> Self {
        let sample_size = config.subsample_size.min(matrix.len());
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let mut master = StdRng::seed_from_u64(config.seed);
        let tree_seeds: Vec<u64> = (0..config.tree_count).map(|_| master.gen()).collect();

        let trees = tree_seeds
            .into_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample = index::sample(&mut rng, matrix.len(), sample_size).into_vec();
                IsolationTree::grow(matrix, sample, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Mean path length of `point` across the ensemble
    pub fn mean_path_length(&self, point: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalised anomaly score of `point`
    pub fn score(&self, point: &[f64]) -> f64 {
        anomaly_score(self.mean_path_length(point), self.sample_size)
    }

    /// Scores for every row of `matrix`, in row order
    pub fn score_all(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        matrix.rows().iter().map(|row| self.score(row)).collect()
    }
}
