pub mod calibration;
pub mod config;
pub mod dataset;
pub mod error;
pub mod scoring;
pub mod synthetic;
pub mod target;

use crate::calibration::{ComparisonReport, SchemeComparator, SearchResult, WeightSearchEngine};
use crate::config::AnalysisConfig;
use crate::dataset::{compute_rates, preprocess, rate_columns, RatedPost, RawTable};
use crate::scoring::{ScoreComputer, ScoreSheet, TimeDecay};
use crate::target::{TargetDefiner, TargetDefinition, TargetPolicy};

pub use error::{Error, Result};

/// A cleaned export with its rates and scheme scores.
#[derive(Debug, Clone)]
pub struct ScoredDataset {
    pub table: RawTable,
    pub posts: Vec<RatedPost>,
    pub sheet: ScoreSheet,
}

impl ScoredDataset {
    /// The input columns followed by every derived column.
    pub fn output_table(&self) -> Result<RawTable> {
        let mut columns = rate_columns(&self.posts);
        columns.extend(self.sheet.columns());
        self.table.with_columns(&columns)
    }
}

pub fn score_dataset(table: RawTable, config: &AnalysisConfig) -> Result<ScoredDataset> {
    let posts = compute_rates(preprocess(&table)?);
    let computer = ScoreComputer::new(
        config.schemes.clone(),
        TimeDecay::new(config.decay.rate_per_hour),
    )?;
    let sheet = computer.compute(&posts);
    Ok(ScoredDataset {
        table,
        posts,
        sheet,
    })
}

pub fn search_weights(
    posts: &[RatedPost],
    config: &AnalysisConfig,
    policy: TargetPolicy,
) -> Result<(TargetDefinition, SearchResult)> {
    let target = TargetDefiner::new(&config.target).define_for_posts(posts, policy)?;
    let result = WeightSearchEngine::new(&config.search).search(posts, &target)?;
    Ok((target, result))
}

pub fn compare_schemes(scored: &RawTable, config: &AnalysisConfig) -> Result<ComparisonReport> {
    SchemeComparator::new(config.comparison.clone(), &config.target).compare_table(scored)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}

pub fn format_optional(value: Option<f64>, digits: usize) -> String {
    value
        .map(|value| format_float(value, digits))
        .unwrap_or_else(|| "NaN".to_string())
}
