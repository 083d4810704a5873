use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::dataset::{PostRecord, RawTable};
use crate::error::{Error, Result};

const LIKES_COLUMNS: [&str; 2] = ["likes_total", "likes"];
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Coerces the raw counters of every row into a [`PostRecord`].
///
/// Reaction counts fall back to zero when a cell is blank or unparseable.
/// Followers stay `None` in that case because they are a denominator.
pub fn preprocess(table: &RawTable) -> Result<Vec<PostRecord>> {
    let likes = LIKES_COLUMNS
        .iter()
        .find_map(|name| table.column_index(name))
        .ok_or_else(|| Error::MissingColumn {
            column: "likes".to_string(),
        })?;
    let comments = table.require_column("comments")?;
    let shares = table.require_column("shares")?;
    let followers = table.require_column("followers")?;
    let post_date = table.require_column("post_date")?;

    let mut unparsed_dates = 0usize;
    let records = (0..table.len())
        .map(|row| {
            let date = parse_post_date(table.cell(row, post_date));
            if date.is_none() {
                unparsed_dates += 1;
            }
            PostRecord {
                likes_total: coerce_count(table.cell(row, likes)),
                comments: coerce_count(table.cell(row, comments)),
                shares: coerce_count(table.cell(row, shares)),
                followers: coerce_optional(table.cell(row, followers)),
                post_date: date,
            }
        })
        .collect::<Vec<_>>();

    if unparsed_dates > 0 {
        tracing::warn!(
            rows = unparsed_dates,
            "post_date missing or unparseable; decay will be undefined for these rows"
        );
    }
    tracing::debug!(rows = records.len(), "preprocessed post records");

    Ok(records)
}

pub fn coerce_count(raw: &str) -> f64 {
    coerce_optional(raw).unwrap_or(0.0)
}

pub fn coerce_optional(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Accepts RFC 3339, RFC 2822, the common `date time` layouts with or
/// without an offset, and bare dates (midnight UTC).
pub fn parse_post_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn counts_default_to_zero_and_followers_stay_missing() {
        let raw = table(
            "likes,comments,shares,followers,post_date\n\
             10,abc,,n/a,2024-01-01T10:00:00Z\n\
             4,2,1,0,2024-01-02\n",
        );
        let posts = preprocess(&raw).unwrap();

        assert_eq!(posts[0].likes_total, 10.0);
        assert_eq!(posts[0].comments, 0.0);
        assert_eq!(posts[0].shares, 0.0);
        assert_eq!(posts[0].followers, None);
        assert_eq!(posts[1].followers, Some(0.0));
    }

    #[test]
    fn prefers_likes_total_when_present() {
        let raw = table(
            "likes,likes_total,comments,shares,followers,post_date\n\
             1,9,0,0,100,2024-01-01\n",
        );
        let posts = preprocess(&raw).unwrap();
        assert_eq!(posts[0].likes_total, 9.0);
    }

    #[test]
    fn missing_counter_column_is_an_error() {
        let raw = table("likes,shares,followers,post_date\n1,2,3,2024-01-01\n");
        let err = preprocess(&raw).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column } if column == "comments"));
    }

    #[test]
    fn non_finite_values_are_not_numbers() {
        assert_eq!(coerce_optional("NaN"), None);
        assert_eq!(coerce_optional("inf"), None);
        assert_eq!(coerce_optional(" 12.5 "), Some(12.5));
        assert_eq!(coerce_count(""), 0.0);
    }

    #[test]
    fn parses_mixed_date_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_post_date("2024-03-05T14:30:00Z"), Some(expected));
        assert_eq!(parse_post_date("2024-03-05T14:30:00.000Z"), Some(expected));
        assert_eq!(parse_post_date("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_post_date("2024-03-05 14:30:00+00:00"), Some(expected));
        assert_eq!(parse_post_date("2024-03-05T16:30:00+02:00"), Some(expected));
        assert_eq!(parse_post_date("2024-03-05 14:30"), Some(expected));

        let midnight = parse_post_date("2024-03-05").unwrap();
        assert_eq!(midnight.hour(), 0);
        assert_eq!(parse_post_date("yesterday"), None);
        assert_eq!(parse_post_date(""), None);
    }
}
