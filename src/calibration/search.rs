use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::stats::pearson;
use crate::config::SearchConfig;
use crate::dataset::RatedPost;
use crate::error::{Error, Result};
use crate::scoring::{SchemeSpec, SchemeWeights};
use crate::target::TargetDefinition;

/// Inclusive integer range shared by the comment and share weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightGrid {
    pub start: u32,
    pub stop: u32,
    pub step: u32,
}

impl Default for WeightGrid {
    fn default() -> Self {
        Self {
            start: 0,
            stop: 200,
            step: 5,
        }
    }
}

impl WeightGrid {
    pub fn new(start: u32, stop: u32, step: u32) -> Self {
        Self { start, stop, step }
    }

    pub fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(Error::Config("weight grid step must be positive".to_string()));
        }
        if self.start > self.stop {
            return Err(Error::Config(format!(
                "weight grid start {} is past stop {}",
                self.start, self.stop
            )));
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<u32> {
        if self.step == 0 || self.start > self.stop {
            return Vec::new();
        }
        (self.start..=self.stop).step_by(self.step as usize).collect()
    }

    /// `(comments, shares)` pairs in search order: comments ascending, then
    /// shares ascending. `(0, 0)` is never a candidate.
    pub fn candidates(&self) -> Vec<(u32, u32)> {
        let values = self.values();
        values
            .iter()
            .flat_map(|comments| values.iter().map(move |shares| (*comments, *shares)))
            .filter(|pair| *pair != (0, 0))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub correlation: f64,
    pub weights: SchemeWeights,
    pub evaluated: usize,
    pub skipped: usize,
    pub target: String,
    pub threshold: f64,
}

impl SearchResult {
    pub fn to_scheme(&self, name: impl Into<String>) -> SchemeSpec {
        SchemeSpec::new(
            name,
            self.weights.likes,
            self.weights.comments,
            self.weights.shares,
        )
    }
}

/// Read-only inputs of the search, restricted to the target population.
#[derive(Debug, Clone)]
pub struct SearchVectors {
    likes: Vec<f64>,
    comments: Vec<f64>,
    shares: Vec<f64>,
    labels: Vec<f64>,
}

impl SearchVectors {
    pub fn new(posts: &[RatedPost], target: &TargetDefinition) -> Self {
        let population: Vec<&RatedPost> =
            target.population().iter().map(|row| &posts[*row]).collect();
        Self {
            likes: population.iter().map(|p| p.post.likes_total).collect(),
            comments: population.iter().map(|p| p.post.comments).collect(),
            shares: population.iter().map(|p| p.post.shares).collect(),
            labels: target.label_values(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WeightSearchEngine {
    grid: WeightGrid,
    likes_weight: f64,
    parallel: bool,
}

impl WeightSearchEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            grid: config.grid,
            likes_weight: config.likes_weight,
            parallel: config.parallel,
        }
    }

    pub fn with_grid(grid: WeightGrid) -> Self {
        Self {
            grid,
            likes_weight: 1.0,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn grid(&self) -> &WeightGrid {
        &self.grid
    }

    /// Point-biserial correlation of one candidate, `None` if undefined.
    pub fn evaluate(&self, vectors: &SearchVectors, comments: u32, shares: u32) -> Option<f64> {
        let weights = SchemeWeights::new(self.likes_weight, comments as f64, shares as f64);
        let scores: Vec<f64> = vectors
            .likes
            .iter()
            .zip(vectors.comments.iter())
            .zip(vectors.shares.iter())
            .map(|((l, c), s)| weights.apply(*l, *c, *s))
            .collect();
        pearson(&scores, &vectors.labels)
    }

    pub fn search(&self, posts: &[RatedPost], target: &TargetDefinition) -> Result<SearchResult> {
        self.grid.validate()?;
        let vectors = SearchVectors::new(posts, target);
        let candidates = self.grid.candidates();

        tracing::info!(
            candidates = candidates.len(),
            rows = vectors.len(),
            parallel = self.parallel,
            "starting weight grid search"
        );

        let evaluated: Vec<((u32, u32), Option<f64>)> = if self.parallel {
            candidates
                .par_iter()
                .map(|&(c, s)| ((c, s), self.evaluate(&vectors, c, s)))
                .collect()
        } else {
            candidates
                .iter()
                .map(|&(c, s)| ((c, s), self.evaluate(&vectors, c, s)))
                .collect()
        };

        let skipped = evaluated.iter().filter(|(_, corr)| corr.is_none()).count();
        let ((comments, shares), correlation) =
            pick_best(evaluated.iter().copied()).ok_or(Error::NoDefinedCorrelation)?;

        tracing::debug!(skipped, "grid candidates without a defined correlation");

        Ok(SearchResult {
            correlation,
            weights: SchemeWeights::new(self.likes_weight, comments as f64, shares as f64),
            evaluated: candidates.len(),
            skipped,
            target: target.metric.column().to_string(),
            threshold: target.threshold,
        })
    }
}

/// The first strictly greatest defined correlation in iteration order.
fn pick_best<I>(results: I) -> Option<((u32, u32), f64)>
where
    I: IntoIterator<Item = ((u32, u32), Option<f64>)>,
{
    let mut best: Option<((u32, u32), f64)> = None;
    for (pair, corr) in results {
        let Some(corr) = corr else { continue };
        match best {
            Some((_, best_corr)) if corr <= best_corr => {}
            _ => best = Some((pair, corr)),
        }
    }
    best
}
