pub mod algorithm;
pub mod assigner;
pub mod calibrator;
pub mod curve;
pub mod weights;

pub use algorithm::ScoringAlgorithm;
pub use assigner::TierAssigner;
pub use calibrator::BoundaryCalibrator;
pub use curve::MetricScorer;
pub use weights::{MetricWeight, PotentialWeights};
