use std::cmp::Ordering;

use serde::Serialize;

use crate::calibration::stats::pearson_complete;
use crate::config::{ComparisonConfig, TargetConfig};
use crate::dataset::{coerce_count, Column, RawTable};
use crate::error::{Error, Result};
use crate::target::{TargetDefiner, TargetDefinition, TargetMetric, TargetPolicy, TargetRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeCorrelation {
    pub scheme: String,
    pub corr_continuous: Option<f64>,
    pub corr_top20_binary: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub metric: TargetMetric,
    pub threshold: f64,
    pub sample_size: usize,
    /// Sorted by binary correlation, best first.
    pub rankings: Vec<SchemeCorrelation>,
    baseline: String,
    legacy: String,
}

impl ComparisonReport {
    pub fn get(&self, scheme: &str) -> Option<&SchemeCorrelation> {
        self.rankings.iter().find(|row| row.scheme == scheme)
    }

    pub fn best(&self) -> Option<&SchemeCorrelation> {
        self.rankings.first()
    }

    pub fn baseline(&self) -> Option<&SchemeCorrelation> {
        self.get(&self.baseline)
    }

    pub fn legacy(&self) -> Option<&SchemeCorrelation> {
        self.get(&self.legacy)
    }

    pub fn to_table(&self) -> RawTable {
        let headers = vec![
            "Scheme".to_string(),
            "Corr_Continuous".to_string(),
            "Corr_Top20_Binary".to_string(),
        ];
        let rows = self
            .rankings
            .iter()
            .map(|row| {
                vec![
                    row.scheme.clone(),
                    format_corr(row.corr_continuous),
                    format_corr(row.corr_top20_binary),
                ]
            })
            .collect();
        RawTable::new(headers, rows)
    }
}

fn format_corr(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SchemeComparator {
    config: ComparisonConfig,
    definer: TargetDefiner,
}

impl SchemeComparator {
    pub fn new(config: ComparisonConfig, target: &TargetConfig) -> Self {
        Self {
            config,
            definer: TargetDefiner::new(target),
        }
    }

    /// Scheme columns in table order, minus the excluded prefixes.
    pub fn scheme_columns<'a>(&self, headers: &'a [String]) -> Vec<&'a str> {
        headers
            .iter()
            .map(String::as_str)
            .filter(|name| name.starts_with(&self.config.scheme_prefix))
            .filter(|name| {
                let excluded = self
                    .config
                    .exclude_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()));
                if excluded {
                    tracing::debug!(column = *name, "scheme column excluded by prefix");
                }
                !excluded
            })
            .collect()
    }

    /// Defines the target from the table's `engagements` and `ER_followers`
    /// columns and ranks every scheme column found in it.
    pub fn compare_table(&self, table: &RawTable) -> Result<ComparisonReport> {
        let engagements = table
            .column("engagements")
            .ok_or_else(|| Error::MissingColumn {
                column: "engagements".to_string(),
            })?;
        let er_followers = table.numeric_column("ER_followers")?;
        let rows: Vec<TargetRow> = engagements
            .iter()
            .zip(er_followers.iter())
            .map(|(engagements, er_followers)| TargetRow {
                engagements: coerce_count(engagements),
                er_followers: *er_followers,
            })
            .collect();

        let target = self.definer.define(&rows, TargetPolicy::Auto)?;

        let columns = self
            .scheme_columns(table.headers())
            .into_iter()
            .map(|name| {
                table
                    .numeric_column(name)
                    .map(|values| Column::new(name, values))
            })
            .collect::<Result<Vec<_>>>()?;

        self.compare(&target, &columns)
    }

    pub fn compare(&self, target: &TargetDefinition, columns: &[Column]) -> Result<ComparisonReport> {
        for required in [&self.config.baseline, &self.config.legacy] {
            if !columns.iter().any(|column| &column.name == required) {
                return Err(Error::MissingColumn {
                    column: required.clone(),
                });
            }
        }

        let continuous: Vec<Option<f64>> = target.metric_values().iter().copied().map(Some).collect();
        let binary: Vec<Option<f64>> = target.label_values().into_iter().map(Some).collect();

        let mut rankings = Vec::with_capacity(columns.len());
        for column in columns {
            if column.values.len() != target.total {
                return Err(Error::Config(format!(
                    "scheme column '{}' has {} values for {} rows",
                    column.name,
                    column.values.len(),
                    target.total
                )));
            }
            let scores = target.select(&column.values);
            rankings.push(SchemeCorrelation {
                scheme: column.name.clone(),
                corr_continuous: pearson_complete(&scores, &continuous),
                corr_top20_binary: pearson_complete(&scores, &binary),
            });
        }

        rankings.sort_by(|a, b| descending_defined_first(a.corr_top20_binary, b.corr_top20_binary));

        Ok(ComparisonReport {
            metric: target.metric,
            threshold: target.threshold,
            sample_size: target.population().len(),
            rankings,
            baseline: self.config.baseline.clone(),
            legacy: self.config.legacy.clone(),
        })
    }
}

fn descending_defined_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparator() -> SchemeComparator {
        SchemeComparator::new(ComparisonConfig::default(), &TargetConfig::default())
    }

    #[test]
    fn prefix_filter_drops_excluded_stems() {
        let headers: Vec<String> = [
            "likes",
            "Scheme_A",
            "Scheme_C",
            "Scheme_C_v2",
            "decayed_Scheme_A",
            "Scheme_Baseline",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            comparator().scheme_columns(&headers),
            vec!["Scheme_A", "Scheme_C", "Scheme_Baseline"]
        );
    }

    #[test]
    fn undefined_correlations_sort_last_and_ties_keep_order() {
        let mut values = vec![
            (0, None),
            (1, Some(0.3)),
            (2, Some(0.5)),
            (3, Some(0.3)),
        ];
        values.sort_by(|a, b| descending_defined_first(a.1, b.1));
        let order: Vec<usize> = values.iter().map(|v| v.0).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn missing_required_scheme_fails_fast() {
        let table = RawTable::from_reader(
            "engagements,ER_followers,Scheme_A,Scheme_C\n\
             1,0.1,1,0.1\n2,0.2,2,0.2\n3,0.3,3,0.3\n"
                .as_bytes(),
        )
        .unwrap();
        let err = comparator().compare_table(&table).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column } if column == "Scheme_Baseline"));
    }

    #[test]
    fn missing_target_column_fails() {
        let table = RawTable::from_reader("ER_followers,Scheme_Baseline,Scheme_C\n0.1,1,1\n".as_bytes())
            .unwrap();
        let err = comparator().compare_table(&table).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column } if column == "engagements"));
    }
}
