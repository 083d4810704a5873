use chrono::{DateTime, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hyperbolic recency discount relative to the newest post of a batch.
#[derive(Debug, Clone, Copy)]
pub struct TimeDecay {
    rate_per_hour: f64,
}

impl TimeDecay {
    pub fn new(rate_per_hour: f64) -> Self {
        Self { rate_per_hour }
    }

    pub fn rate_per_hour(&self) -> f64 {
        self.rate_per_hour
    }

    /// `1 / (1 + k * hours)`; exactly 1 at zero hours.
    pub fn factor(&self, hours_since_publish: f64) -> f64 {
        1.0 / (1.0 + self.rate_per_hour * hours_since_publish)
    }

    pub fn reference<'a, I>(dates: I) -> Option<DateTime<Utc>>
    where
        I: IntoIterator<Item = &'a Option<DateTime<Utc>>>,
    {
        dates.into_iter().filter_map(|date| *date).max()
    }

    pub fn hours_since(reference: DateTime<Utc>, post_date: DateTime<Utc>) -> f64 {
        (reference - post_date).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }
}
