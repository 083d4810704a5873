//! Binary "high performing" label definition.
//!
//! A run picks its target metric once, computes the top-quantile threshold
//! over the metric's evaluation population and labels every row in that
//! population. The outcome is an immutable [`TargetDefinition`] that later
//! stages borrow.

use serde::{Deserialize, Serialize};

use crate::config::TargetConfig;
use crate::dataset::RatedPost;
use crate::error::{Error, Result};
use crate::calibration::stats::quantile;

/// How the target metric is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// `ER_followers` unless too few rows have a rate.
    Auto,
    /// Raw engagements over every row.
    Engagements,
}

impl TargetPolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "auto" | "er" | "er_followers" => Some(TargetPolicy::Auto),
            "engagements" | "raw" => Some(TargetPolicy::Engagements),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMetric {
    /// Rows without a follower rate are outside the population.
    ErFollowers,
    /// Coverage was too low for rates; every row takes part.
    EngagementsFallback,
    /// Engagements requested explicitly; every row takes part.
    Engagements,
}

impl TargetMetric {
    pub fn column(self) -> &'static str {
        match self {
            TargetMetric::ErFollowers => "ER_followers",
            TargetMetric::EngagementsFallback | TargetMetric::Engagements => "engagements",
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, TargetMetric::EngagementsFallback)
    }

    /// The row's metric value, or `None` when the row is outside the population.
    pub fn value(self, row: &TargetRow) -> Option<f64> {
        match self {
            TargetMetric::ErFollowers => row.er_followers,
            TargetMetric::EngagementsFallback | TargetMetric::Engagements => Some(row.engagements),
        }
    }
}

/// The two columns target selection looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRow {
    pub engagements: f64,
    pub er_followers: Option<f64>,
}

impl From<&RatedPost> for TargetRow {
    fn from(post: &RatedPost) -> Self {
        Self {
            engagements: post.engagements,
            er_followers: post.er_followers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    pub metric: TargetMetric,
    pub threshold: f64,
    pub quantile: f64,
    pub valid_rate_count: usize,
    pub total: usize,
    rows: Vec<usize>,
    values: Vec<f64>,
    labels: Vec<bool>,
}

impl TargetDefinition {
    /// Table row indices of the evaluation population, ascending.
    pub fn population(&self) -> &[usize] {
        &self.rows
    }

    pub fn metric_values(&self) -> &[f64] {
        &self.values
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn label_values(&self) -> Vec<f64> {
        self.labels
            .iter()
            .map(|label| if *label { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn label_for(&self, row: usize) -> Option<bool> {
        self.rows
            .binary_search(&row)
            .ok()
            .map(|position| self.labels[position])
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|label| **label).count()
    }

    /// Picks the population rows out of a full-length column.
    pub fn select<T: Copy>(&self, column: &[T]) -> Vec<T> {
        self.rows.iter().map(|row| column[*row]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct TargetDefiner {
    quantile: f64,
    min_coverage: f64,
}

impl TargetDefiner {
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            quantile: config.quantile,
            min_coverage: config.min_coverage,
        }
    }

    pub fn select_metric(&self, rows: &[TargetRow], policy: TargetPolicy) -> TargetMetric {
        match policy {
            TargetPolicy::Engagements => TargetMetric::Engagements,
            TargetPolicy::Auto => {
                let valid = valid_rate_count(rows);
                if (valid as f64) < self.min_coverage * rows.len() as f64 {
                    TargetMetric::EngagementsFallback
                } else {
                    TargetMetric::ErFollowers
                }
            }
        }
    }

    pub fn define(&self, rows: &[TargetRow], policy: TargetPolicy) -> Result<TargetDefinition> {
        let metric = self.select_metric(rows, policy);
        let valid = valid_rate_count(rows);

        if metric.is_fallback() {
            tracing::warn!(
                valid,
                total = rows.len(),
                "too few valid ER_followers; falling back to raw engagements for target definition"
            );
        }

        let (population, values): (Vec<usize>, Vec<f64>) = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| metric.value(row).map(|value| (index, value)))
            .unzip();

        let threshold = quantile(&values, self.quantile).ok_or(Error::EmptyPopulation {
            metric: metric.column(),
        })?;
        let labels = values.iter().map(|value| *value >= threshold).collect();

        let definition = TargetDefinition {
            metric,
            threshold,
            quantile: self.quantile,
            valid_rate_count: valid,
            total: rows.len(),
            rows: population,
            values,
            labels,
        };

        tracing::info!(
            metric = metric.column(),
            threshold = definition.threshold,
            population = definition.population().len(),
            positives = definition.positives(),
            "target defined"
        );

        Ok(definition)
    }

    pub fn define_for_posts(
        &self,
        posts: &[RatedPost],
        policy: TargetPolicy,
    ) -> Result<TargetDefinition> {
        let rows: Vec<TargetRow> = posts.iter().map(TargetRow::from).collect();
        self.define(&rows, policy)
    }
}

fn valid_rate_count(rows: &[TargetRow]) -> usize {
    rows.iter().filter(|row| row.er_followers.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definer() -> TargetDefiner {
        TargetDefiner::new(&TargetConfig::default())
    }

    fn rows_with_coverage(total: usize, with_rate: usize) -> Vec<TargetRow> {
        (0..total)
            .map(|index| TargetRow {
                engagements: index as f64,
                er_followers: (index < with_rate).then(|| index as f64 / 1000.0),
            })
            .collect()
    }

    #[test]
    fn falls_back_just_below_ten_percent_coverage() {
        let rows = rows_with_coverage(1000, 99);
        let definition = definer().define(&rows, TargetPolicy::Auto).unwrap();
        assert_eq!(definition.metric, TargetMetric::EngagementsFallback);
        assert_eq!(definition.population().len(), 1000);
        assert_eq!(definition.valid_rate_count, 99);
    }

    #[test]
    fn keeps_rates_just_above_ten_percent_coverage() {
        let rows = rows_with_coverage(1000, 101);
        let definition = definer().define(&rows, TargetPolicy::Auto).unwrap();
        assert_eq!(definition.metric, TargetMetric::ErFollowers);
        assert_eq!(definition.population().len(), 101);
        assert_eq!(definition.label_for(500), None);
        assert!(definition.label_for(100).is_some());
    }

    #[test]
    fn exactly_ten_percent_is_enough() {
        let rows = rows_with_coverage(1000, 100);
        let metric = definer().select_metric(&rows, TargetPolicy::Auto);
        assert_eq!(metric, TargetMetric::ErFollowers);
    }

    #[test]
    fn engagements_policy_ignores_coverage() {
        let rows = rows_with_coverage(10, 10);
        let definition = definer().define(&rows, TargetPolicy::Engagements).unwrap();
        assert_eq!(definition.metric, TargetMetric::Engagements);
        assert_eq!(definition.metric.column(), "engagements");
    }

    #[test]
    fn threshold_is_idempotent_and_labels_monotone() {
        let rows = rows_with_coverage(50, 50);
        let first = definer().define(&rows, TargetPolicy::Auto).unwrap();
        let second = definer().define(&rows, TargetPolicy::Auto).unwrap();
        assert_eq!(first.threshold, second.threshold);
        assert_eq!(first.labels(), second.labels());

        let min_positive = first
            .metric_values()
            .iter()
            .zip(first.labels())
            .filter(|(_, label)| **label)
            .map(|(value, _)| *value)
            .fold(f64::INFINITY, f64::min);
        for (value, label) in first.metric_values().iter().zip(first.labels()) {
            if *value > min_positive {
                assert!(*label);
            }
        }
        assert_eq!(first.positives(), 10);
    }

    #[test]
    fn empty_population_is_an_error() {
        let rows = rows_with_coverage(0, 0);
        let err = definer().define(&rows, TargetPolicy::Auto).unwrap_err();
        assert!(matches!(err, Error::EmptyPopulation { .. }));
    }

    #[test]
    fn select_follows_population_order() {
        let rows = rows_with_coverage(100, 20);
        let definition = definer().define(&rows, TargetPolicy::Auto).unwrap();
        let column: Vec<usize> = (0..100).collect();
        assert_eq!(definition.select(&column), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn policy_parses_aliases() {
        assert_eq!(TargetPolicy::from_str("ER"), Some(TargetPolicy::Auto));
        assert_eq!(TargetPolicy::from_str("engagements"), Some(TargetPolicy::Engagements));
        assert_eq!(TargetPolicy::from_str("impressions"), None);
    }
}
