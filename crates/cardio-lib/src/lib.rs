pub mod analysis;
pub mod config;
pub mod cycle;
pub mod error;
pub mod filters;
pub mod grid;
pub mod io;
pub mod plot;
pub mod sequence;
pub mod signal;

pub use analysis::*;
pub use cycle::*;
pub use error::{CardioError, Result};
pub use grid::SampleGrid;
pub use sequence::CycleSequence;
pub use signal::*;
