//! Search configuration and the fixed cutoffs that select search strategies.

use crate::error::SplitError;

/// Categorical columns with at most this many present categories are
/// searched by enumerating every bipartition.
pub const MAX_EXHAUSTIVE_CATS: usize = 5;

/// Upper bound on present categories for the greedy iterative search in
/// exhaustive mode.
pub const MAX_NON_RANDOM_EXHAUSTIVE: usize = 10;

/// Sampling budget for categorical columns past the greedy tier.
///
/// Randomized search samples bipartitions for every column above
/// [`MAX_EXHAUSTIVE_CATS`], and exhaustive search does so above
/// [`MAX_NON_RANDOM_EXHAUSTIVE`]. Both paths sample, so no strategy changes
/// at this cardinality. The value is used instead as the number of random
/// bipartitions exhaustive mode draws for such columns. Randomized mode
/// draws `random_candidates` instead.
pub const MAX_NON_BIG_CATS: usize = 30;

/// Floor a split's impurity decrease must strictly exceed to be accepted,
/// both within a column and across candidate columns.
pub const MIN_IMP: f64 = 0.0;

/// Numeric columns whose span over a case set is below this are constant.
pub const CONSTANT_CUTOFF: f64 = 1e-7;

/// Suffix appended to the name of a permuted contrast column.
pub const CONTRAST_SUFFIX: &str = ":SHUFFLED";

/// How candidate partitions are enumerated for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SplitMethod {
    /// Scan every threshold between distinct numeric values; enumerate or
    /// greedily grow category subsets.
    #[default]
    Exhaustive,
    /// Extremely randomized: score only randomly drawn thresholds or
    /// category bipartitions.
    Randomized,
}

/// How cases with a missing predictor value are treated while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum MissingPolicy {
    /// Missing cases are left out of the scored partition.
    #[default]
    Exclude,
    /// Missing cases form a third branch whose impurity is weighted into
    /// the split score.
    ThreeWay,
}

/// Configuration for a best-split search.
///
/// Construct via [`SplitConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default      |
/// |---------------------|--------------|
/// | `split_method`      | `Exhaustive` |
/// | `missing_policy`    | `Exclude`    |
/// | `random_candidates` | 1            |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    pub(crate) min_leaf_size: usize,
    pub(crate) split_method: SplitMethod,
    pub(crate) missing_policy: MissingPolicy,
    pub(crate) random_candidates: usize,
}

impl SplitConfig {
    /// Create a config requiring at least `min_leaf_size` cases on each side
    /// of every split.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidLeafSize`] if `min_leaf_size` is zero.
    pub fn new(min_leaf_size: usize) -> Result<Self, SplitError> {
        if min_leaf_size == 0 {
            return Err(SplitError::InvalidLeafSize { min_leaf_size });
        }
        Ok(Self {
            min_leaf_size,
            split_method: SplitMethod::Exhaustive,
            missing_policy: MissingPolicy::Exclude,
            random_candidates: 1,
        })
    }

    /// Set the split-finding strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set how missing predictor values are scored.
    #[must_use]
    pub fn with_missing_policy(mut self, missing_policy: MissingPolicy) -> Self {
        self.missing_policy = missing_policy;
        self
    }

    /// Set how many thresholds or bipartitions a randomized search draws per
    /// column.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidRandomCandidates`] if `random_candidates` is zero.
    pub fn with_random_candidates(mut self, random_candidates: usize) -> Result<Self, SplitError> {
        if random_candidates == 0 {
            return Err(SplitError::InvalidRandomCandidates { random_candidates });
        }
        self.random_candidates = random_candidates;
        Ok(self)
    }

    /// Return the minimum number of cases per side.
    #[must_use]
    pub fn min_leaf_size(&self) -> usize {
        self.min_leaf_size
    }

    /// Return the split-finding strategy.
    #[must_use]
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Return the missing-value scoring policy.
    #[must_use]
    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing_policy
    }

    /// Return the number of randomized candidates per column.
    #[must_use]
    pub fn random_candidates(&self) -> usize {
        self.random_candidates
    }

    pub(crate) fn is_randomized(&self) -> bool {
        self.split_method == SplitMethod::Randomized
    }

    pub(crate) fn three_way(&self) -> bool {
        self.missing_policy == MissingPolicy::ThreeWay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_leaf_size_rejected() {
        let err = SplitConfig::new(0).unwrap_err();
        assert!(matches!(err, SplitError::InvalidLeafSize { min_leaf_size: 0 }));
    }

    #[test]
    fn defaults() {
        let cfg = SplitConfig::new(3).unwrap();
        assert_eq!(cfg.min_leaf_size(), 3);
        assert_eq!(cfg.split_method(), SplitMethod::Exhaustive);
        assert_eq!(cfg.missing_policy(), MissingPolicy::Exclude);
        assert_eq!(cfg.random_candidates(), 1);
        assert!(!cfg.is_randomized());
        assert!(!cfg.three_way());
    }

    #[test]
    fn zero_random_candidates_rejected() {
        let err = SplitConfig::new(1)
            .unwrap()
            .with_random_candidates(0)
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidRandomCandidates { .. }));
    }

    #[test]
    fn builder_chain() {
        let cfg = SplitConfig::new(2)
            .unwrap()
            .with_split_method(SplitMethod::Randomized)
            .with_missing_policy(MissingPolicy::ThreeWay)
            .with_random_candidates(4)
            .unwrap();
        assert!(cfg.is_randomized());
        assert!(cfg.three_way());
        assert_eq!(cfg.random_candidates(), 4);
    }
}
