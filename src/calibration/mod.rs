pub mod compare;
pub mod search;
pub mod stats;

pub use compare::{ComparisonReport, SchemeComparator, SchemeCorrelation};
pub use search::{SearchResult, SearchVectors, WeightGrid, WeightSearchEngine};
