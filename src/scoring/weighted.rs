use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::dataset::{per_follower, PostRecord};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchemeWeights {
    pub likes: f64,
    pub comments: f64,
    pub shares: f64,
}

impl SchemeWeights {
    pub fn new(likes: f64, comments: f64, shares: f64) -> Self {
        Self {
            likes,
            comments,
            shares,
        }
    }

    pub fn apply(&self, likes: f64, comments: f64, shares: f64) -> f64 {
        self.likes * likes + self.comments * comments + self.shares * shares
    }

    pub fn is_finite(&self) -> bool {
        self.likes.is_finite() && self.comments.is_finite() && self.shares.is_finite()
    }
}

/// A named linear engagement formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSpec {
    pub name: String,
    /// Divide the weighted sum by followers.
    #[serde(default)]
    pub normalized: bool,
    /// Also emit a `decayed_<name>` column.
    #[serde(default)]
    pub decayed: bool,
    pub weights: SchemeWeights,
}

impl SchemeSpec {
    pub fn new(name: impl Into<String>, likes: f64, comments: f64, shares: f64) -> Self {
        Self {
            name: name.into(),
            normalized: false,
            decayed: false,
            weights: SchemeWeights::new(likes, comments, shares),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn decayed(mut self) -> Self {
        self.decayed = true;
        self
    }

    /// The schemes scored on every run unless the config says otherwise.
    pub fn catalogue() -> Vec<SchemeSpec> {
        vec![
            SchemeSpec::new("Scheme_A", 1.0, 3.0, 5.0).decayed(),
            SchemeSpec::new("Scheme_B", 1.0, 5.0, 3.0).decayed(),
            SchemeSpec::new("Scheme_C", 1.0, 3.0, 7.0).normalized().decayed(),
            SchemeSpec::new("Scheme_Baseline", 1.0, 1.0, 1.0),
            SchemeSpec::new("Scheme_Optimized", 1.0, 15.0, 0.0),
            SchemeSpec::new("Scheme_Discussion", 1.0, 15.0, 5.0),
        ]
    }

    pub fn score(&self, post: &PostRecord) -> Option<f64> {
        let weighted = self
            .weights
            .apply(post.likes_total, post.comments, post.shares);
        if self.normalized {
            per_follower(weighted, post.followers)
        } else {
            Some(weighted)
        }
    }

    pub fn decayed_name(&self) -> String {
        format!("decayed_{}", self.name)
    }

    pub fn formula(&self) -> String {
        let base = format!(
            "{} * Likes + {} * Comments + {} * Shares",
            self.weights.likes, self.weights.comments, self.weights.shares
        );
        if self.normalized {
            format!("({}) / Followers", base)
        } else {
            base
        }
    }
}

pub fn validate_schemes(schemes: &[SchemeSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for scheme in schemes {
        if scheme.name.trim().is_empty() {
            return Err(Error::Config("scheme name must not be empty".to_string()));
        }
        if !seen.insert(scheme.name.as_str()) {
            return Err(Error::Config(format!("duplicate scheme name: {}", scheme.name)));
        }
        if !scheme.weights.is_finite() {
            return Err(Error::Config(format!(
                "scheme {} has non-finite weights",
                scheme.name
            )));
        }
    }
    Ok(())
}
