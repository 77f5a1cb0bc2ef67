pub mod dominant;
pub mod phase;

pub use dominant::{select_dominant_cycle, DistanceMatrix, DominantCycle};
pub use phase::{derivative, pseudophase_embedding, PhaseAnalyzer, SignalKind};
