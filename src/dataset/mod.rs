pub mod preprocess;
pub mod rates;
pub mod table;

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::Result;

pub use preprocess::{coerce_count, coerce_optional, parse_post_date, preprocess};
pub use rates::{compute_rates, per_follower, rate_columns, RatedPost};
pub use table::{Column, RawTable};

/// One social post after counter coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub likes_total: f64,
    pub comments: f64,
    pub shares: f64,
    pub followers: Option<f64>,
    pub post_date: Option<DateTime<Utc>>,
}

impl PostRecord {
    pub fn engagements(&self) -> f64 {
        self.likes_total + self.comments + self.shares
    }
}

/// Reads a cleaned export and runs preprocessing plus rate calculation.
pub fn load_rated_posts(path: &Path) -> Result<(RawTable, Vec<RatedPost>)> {
    let table = RawTable::from_path(path)?;
    let posts = compute_rates(preprocess(&table)?);
    Ok((table, posts))
}
