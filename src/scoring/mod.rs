pub mod decay;
pub mod pipeline;
pub mod weighted;

pub use decay::TimeDecay;
pub use pipeline::{ScoreComputer, ScoreSheet};
pub use weighted::{validate_schemes, SchemeSpec, SchemeWeights};
