//! Unsupervised outlier scoring

pub mod isolation_forest;
pub mod outlier;
pub mod path_length;

pub use isolation_forest::{IsolationTree, OutlierForest};
pub use outlier::{OutlierModel, OutlierScores};
