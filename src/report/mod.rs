pub mod distribution;
pub mod movement;

pub use distribution::{TierDistribution, TierStats};
pub use movement::{compare_periods, MovementKind, MovementReport, TierMovement};
