use crate::dataset::{Column, PostRecord};

/// A post with its engagement totals and follower-normalized rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedPost {
    pub post: PostRecord,
    pub engagements: f64,
    pub er_followers: Option<f64>,
    /// Mirrors `er_followers` until the exports carry impressions.
    pub er_impressions: Option<f64>,
}

pub fn compute_rates(posts: Vec<PostRecord>) -> Vec<RatedPost> {
    posts
        .into_iter()
        .map(|post| {
            let engagements = post.engagements();
            let er_followers = per_follower(engagements, post.followers);
            RatedPost {
                post,
                engagements,
                er_followers,
                er_impressions: er_followers,
            }
        })
        .collect()
}

/// `value / followers`, or `None` when followers is missing or zero.
pub fn per_follower(value: f64, followers: Option<f64>) -> Option<f64> {
    followers
        .filter(|followers| *followers != 0.0)
        .map(|followers| value / followers)
        .filter(|rate| rate.is_finite())
}

pub fn rate_columns(posts: &[RatedPost]) -> Vec<Column> {
    vec![
        Column::dense("likes_total", posts.iter().map(|p| p.post.likes_total).collect()),
        Column::dense("engagements", posts.iter().map(|p| p.engagements).collect()),
        Column::new("ER_followers", posts.iter().map(|p| p.er_followers).collect()),
        Column::new("ER_impressions", posts.iter().map(|p| p.er_impressions).collect()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(likes: f64, comments: f64, shares: f64, followers: Option<f64>) -> PostRecord {
        PostRecord {
            likes_total: likes,
            comments,
            shares,
            followers,
            post_date: None,
        }
    }

    #[test]
    fn engagements_sum_the_raw_counts() {
        let rated = compute_rates(vec![post(10.0, 3.0, 2.0, Some(100.0))]);
        assert_eq!(rated[0].engagements, 15.0);
        assert!((rated[0].er_followers.unwrap() - 0.15).abs() < 1e-12);
        assert_eq!(rated[0].er_impressions, rated[0].er_followers);
    }

    #[test]
    fn rate_is_missing_without_followers() {
        let rated = compute_rates(vec![
            post(10.0, 0.0, 0.0, None),
            post(10.0, 0.0, 0.0, Some(0.0)),
        ]);
        assert!(rated.iter().all(|p| p.er_followers.is_none()));
        assert!(rated.iter().all(|p| p.er_impressions.is_none()));
    }

    #[test]
    fn rate_columns_cover_every_row() {
        let rated = compute_rates(vec![post(1.0, 1.0, 1.0, Some(3.0)), post(0.0, 0.0, 0.0, None)]);
        let columns = rate_columns(&rated);
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["likes_total", "engagements", "ER_followers", "ER_impressions"]);
        assert!(columns.iter().all(|c| c.values.len() == 2));
        assert_eq!(columns[2].values[1], None);
    }
}
