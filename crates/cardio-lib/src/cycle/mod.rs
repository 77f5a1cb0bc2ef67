pub mod model;
pub mod pulse;
pub mod range;

pub use model::CycleModel;
pub use pulse::{PulseParams, PulseSupport, PulseWave};
pub use range::WaveRanges;
