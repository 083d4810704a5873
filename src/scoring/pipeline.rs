use chrono::{DateTime, Utc};

use crate::dataset::{Column, RatedPost};
use crate::error::Result;
use crate::scoring::{validate_schemes, SchemeSpec, TimeDecay};

/// All score columns produced for one batch.
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    pub reference: Option<DateTime<Utc>>,
    pub hours_since_publish: Vec<Option<f64>>,
    pub decay_factor: Vec<Option<f64>>,
    pub schemes: Vec<Column>,
    pub decayed: Vec<Column>,
}

impl ScoreSheet {
    pub fn scheme(&self, name: &str) -> Option<&Column> {
        self.schemes
            .iter()
            .chain(self.decayed.iter())
            .find(|column| column.name == name)
    }

    /// Output order: hours, scheme scores, decay factor, decayed scores.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::with_capacity(self.schemes.len() + self.decayed.len() + 2);
        columns.push(Column::new(
            "hours_since_publish",
            self.hours_since_publish.clone(),
        ));
        columns.extend(self.schemes.iter().cloned());
        columns.push(Column::new("decay_factor", self.decay_factor.clone()));
        columns.extend(self.decayed.iter().cloned());
        columns
    }
}

#[derive(Debug, Clone)]
pub struct ScoreComputer {
    schemes: Vec<SchemeSpec>,
    decay: TimeDecay,
}

impl ScoreComputer {
    pub fn new(schemes: Vec<SchemeSpec>, decay: TimeDecay) -> Result<Self> {
        validate_schemes(&schemes)?;
        Ok(Self { schemes, decay })
    }

    pub fn schemes(&self) -> &[SchemeSpec] {
        &self.schemes
    }

    pub fn compute(&self, posts: &[RatedPost]) -> ScoreSheet {
        let reference = TimeDecay::reference(posts.iter().map(|p| &p.post.post_date));

        let hours_since_publish: Vec<Option<f64>> = posts
            .iter()
            .map(|p| {
                let reference = reference?;
                let date = p.post.post_date?;
                Some(TimeDecay::hours_since(reference, date))
            })
            .collect();
        let decay_factor: Vec<Option<f64>> = hours_since_publish
            .iter()
            .map(|hours| hours.map(|hours| self.decay.factor(hours)))
            .collect();

        let mut schemes = Vec::with_capacity(self.schemes.len());
        let mut decayed = Vec::new();
        for scheme in &self.schemes {
            let scores: Vec<Option<f64>> = posts.iter().map(|p| scheme.score(&p.post)).collect();
            if scheme.decayed {
                let values = scores
                    .iter()
                    .zip(decay_factor.iter())
                    .map(|(score, factor)| Some((*score)? * (*factor)?))
                    .collect();
                decayed.push(Column::new(scheme.decayed_name(), values));
            }
            schemes.push(Column::new(scheme.name.clone(), scores));
        }

        tracing::info!(
            schemes = schemes.len(),
            decayed = decayed.len(),
            rows = posts.len(),
            "computed scheme scores"
        );

        ScoreSheet {
            reference,
            hours_since_publish,
            decay_factor,
            schemes,
            decayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{compute_rates, PostRecord};
    use chrono::{Duration, TimeZone};

    fn posts() -> Vec<RatedPost> {
        let newest = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        compute_rates(vec![
            PostRecord {
                likes_total: 4.0,
                comments: 1.0,
                shares: 1.0,
                followers: Some(10.0),
                post_date: Some(newest - Duration::hours(10)),
            },
            PostRecord {
                likes_total: 2.0,
                comments: 0.0,
                shares: 0.0,
                followers: None,
                post_date: Some(newest),
            },
        ])
    }

    #[test]
    fn decayed_columns_follow_flagged_schemes() {
        let computer = ScoreComputer::new(
            vec![
                SchemeSpec::new("Scheme_X", 1.0, 2.0, 3.0).decayed(),
                SchemeSpec::new("Scheme_N", 1.0, 1.0, 1.0).normalized(),
            ],
            TimeDecay::new(0.1),
        )
        .unwrap();
        let sheet = computer.compute(&posts());

        assert_eq!(sheet.hours_since_publish, vec![Some(10.0), Some(0.0)]);
        assert!((sheet.decay_factor[0].unwrap() - 0.5).abs() < 1e-9);

        let decayed = sheet.scheme("decayed_Scheme_X").unwrap();
        assert!((decayed.values[0].unwrap() - 4.5).abs() < 1e-9);
        assert!((decayed.values[1].unwrap() - 2.0).abs() < 1e-9);

        let normalized = sheet.scheme("Scheme_N").unwrap();
        assert!((normalized.values[0].unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(normalized.values[1], None);
        assert!(sheet.scheme("decayed_Scheme_N").is_none());
    }

    #[test]
    fn column_order_puts_decay_between_raw_and_decayed() {
        let computer = ScoreComputer::new(SchemeSpec::catalogue(), TimeDecay::new(0.1)).unwrap();
        let names: Vec<String> = computer
            .compute(&posts())
            .columns()
            .into_iter()
            .map(|column| column.name)
            .collect();
        assert_eq!(names[0], "hours_since_publish");
        assert_eq!(names[7], "decay_factor");
        assert_eq!(
            &names[8..],
            &["decayed_Scheme_A", "decayed_Scheme_B", "decayed_Scheme_C"]
        );
    }

    #[test]
    fn duplicate_scheme_names_are_rejected() {
        let schemes = vec![
            SchemeSpec::new("Scheme_A", 1.0, 1.0, 1.0),
            SchemeSpec::new("Scheme_A", 1.0, 2.0, 1.0),
        ];
        assert!(ScoreComputer::new(schemes, TimeDecay::new(0.1)).is_err());
    }
}
