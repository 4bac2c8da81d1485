pub mod error;
pub mod metrics;
pub mod period;
pub mod score;
pub mod tier;

pub use error::*;
pub use metrics::*;
pub use period::*;
pub use score::*;
pub use tier::*;
