use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::dataset::RawTable;

const HEADERS: [&str; 7] = [
    "post_id",
    "author",
    "likes",
    "comments",
    "shares",
    "followers",
    "post_date",
];

#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub rows: usize,
    pub seed: u64,
    /// Share of rows whose follower count is left blank.
    pub missing_followers: f64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            rows: 500,
            seed: 42,
            missing_followers: 0.05,
        }
    }
}

/// A reproducible export shaped like the cleaned post table.
pub fn generate_synthetic_posts(options: &SyntheticOptions) -> RawTable {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let newest = base_timestamp();

    let rows = (0..options.rows)
        .map(|idx| {
            let author = rng.gen_range(0..25u32);
            let followers = 200.0 + 20_000.0 * rng.gen::<f64>().powi(3);
            let reach = followers * rng.gen_range(0.005..0.08);

            let likes = reach.round();
            let comments = (likes * rng.gen_range(0.0..0.15)).round();
            let shares = (likes * rng.gen_range(0.0..0.05)).round();
            let posted_at = newest - Duration::minutes((idx as i64) * 180 + rng.gen_range(0..120));

            let followers_cell = if rng.gen::<f64>() < options.missing_followers {
                String::new()
            } else {
                format!("{}", followers.round())
            };

            vec![
                format!("synthetic_{}", idx),
                format!("author_{}", author),
                format!("{}", likes),
                format!("{}", comments),
                format!("{}", shares),
                followers_cell,
                posted_at.to_rfc3339(),
            ]
        })
        .collect();

    RawTable::new(HEADERS.iter().map(|h| h.to_string()).collect(), rows)
}

fn base_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}
