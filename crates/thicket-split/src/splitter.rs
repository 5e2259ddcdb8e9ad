//! Decoded routing rules and the partitions they produce.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::SplitError;
use crate::feature::Feature;
use crate::matrix::FeatureMatrix;

/// Where a case goes at a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Route {
    Left,
    Right,
    Missing,
}

/// The routing parameters of a [`Splitter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitRule {
    /// Values `<= threshold` go left.
    Numeric { threshold: f64 },
    /// Listed categories go left; every other present category goes right.
    Categorical { left: BTreeSet<String> },
}

/// A self-contained split rule over one named column.
///
/// Decoding copies the routing parameters out of the column, so a
/// `Splitter` stays valid when the column is later shuffled, imputed, or
/// dropped. Missing values always route to [`Route::Missing`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Splitter {
    /// Name of the column the rule reads.
    pub feature: String,
    /// How present values are routed.
    pub rule: SplitRule,
}

impl Splitter {
    /// A threshold rule on a numeric column.
    #[must_use]
    pub fn numeric(feature: impl Into<String>, threshold: f64) -> Self {
        Self {
            feature: feature.into(),
            rule: SplitRule::Numeric { threshold },
        }
    }

    /// A category-membership rule on a categorical column.
    #[must_use]
    pub fn categorical<I, S>(feature: impl Into<String>, left: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature: feature.into(),
            rule: SplitRule::Categorical {
                left: left.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Route a raw numeric value. A categorical rule sends every value to
    /// the missing branch.
    #[must_use]
    pub fn route_num(&self, value: Option<f64>) -> Route {
        match (&self.rule, value) {
            (SplitRule::Numeric { threshold }, Some(v)) if v <= *threshold => Route::Left,
            (SplitRule::Numeric { .. }, Some(_)) => Route::Right,
            _ => Route::Missing,
        }
    }

    /// Route a raw category. A numeric rule sends every value to the
    /// missing branch.
    #[must_use]
    pub fn route_cat(&self, value: Option<&str>) -> Route {
        match (&self.rule, value) {
            (SplitRule::Categorical { left }, Some(v)) if left.contains(v) => Route::Left,
            (SplitRule::Categorical { .. }, Some(_)) => Route::Right,
            _ => Route::Missing,
        }
    }

    /// Route case `i` of `feature`.
    #[must_use]
    pub fn route(&self, feature: &Feature, i: usize) -> Route {
        match feature {
            Feature::Numeric(f) => self.route_num(f.get(i)),
            Feature::Categorical(f) => self.route_cat(f.get(i)),
        }
    }

    /// Return `true` if case `i` of `feature` goes left.
    #[must_use]
    pub fn goes_left(&self, feature: &Feature, i: usize) -> bool {
        self.route(feature, i) == Route::Left
    }

    /// Partition `cases` by routing each through `feature`.
    #[must_use]
    pub fn split(&self, feature: &Feature, cases: &[usize]) -> Partition {
        let mut partition = Partition::with_capacity(cases.len());
        for &c in cases {
            partition.push(self.route(feature, c), c);
        }
        partition
    }

    /// Partition `cases` using the column of `matrix` this rule names.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::UnknownFeature`] if the matrix has no such column.
    pub fn split_matrix(
        &self,
        matrix: &FeatureMatrix,
        cases: &[usize],
    ) -> Result<Partition, SplitError> {
        let feature = matrix.feature(&self.feature)?;
        Ok(self.split(feature, cases))
    }
}

impl fmt::Display for Splitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            SplitRule::Numeric { threshold } => write!(f, "{} <= {threshold}", self.feature),
            SplitRule::Categorical { left } => {
                let cats: Vec<&str> = left.iter().map(String::as_str).collect();
                write!(f, "{} in {{{}}}", self.feature, cats.join(", "))
            }
        }
    }
}

/// Cases routed to each branch of a split, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub missing: Vec<usize>,
}

impl Partition {
    /// Create an empty partition with room for `n` cases on each branch.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            left: Vec::with_capacity(n),
            right: Vec::with_capacity(n),
            missing: Vec::with_capacity(n),
        }
    }

    /// Append case `c` to the branch named by `route`.
    pub fn push(&mut self, route: Route, c: usize) {
        match route {
            Route::Left => self.left.push(c),
            Route::Right => self.right.push(c),
            Route::Missing => self.missing.push(c),
        }
    }

    /// Total number of cases across all branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len() + self.missing.len()
    }

    /// Return `true` if no case was routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
