//! Best-split search for random-forest tree growing.
//!
//! Holds mixed numeric and categorical columns in a [`FeatureMatrix`],
//! scores candidate partitions against a [`Target`] (Gini or entropy for
//! classification, variance for regression, case-weighted Gini for
//! boosting), and returns the winning rule as a self-contained
//! [`Splitter`]. Search is exhaustive or extremely randomized, can route
//! missing values to a third branch, and reuses caller-owned
//! [`BestSplitAllocs`] scratch buffers across calls. Shuffled contrast
//! columns can be injected for importance-significance testing.

mod allocs;
mod categorical;
mod config;
mod criterion;
mod encoder;
mod error;
mod feature;
mod matrix;
mod numeric;
mod splitter;
mod subset;
mod target;

pub use allocs::{BestSplitAllocs, SideStats, SplitCounts};
pub use categorical::{CatFeature, MISSING_TOKENS, is_missing_token};
pub use config::{
    CONSTANT_CUTOFF, CONTRAST_SUFFIX, MAX_EXHAUSTIVE_CATS, MAX_NON_BIG_CATS,
    MAX_NON_RANDOM_EXHAUSTIVE, MIN_IMP, MissingPolicy, SplitConfig, SplitMethod,
};
pub use criterion::SplitCriterion;
pub use encoder::CatMap;
pub use error::SplitError;
pub use feature::{CodedSplit, Feature, SplitCandidate};
pub use matrix::{FeatureMatrix, SplitOutcome};
pub use numeric::NumFeature;
pub use splitter::{Partition, Route, SplitRule, Splitter};
pub use target::{AdaBoostTarget, BoostingTarget, EntropyTarget, Prediction, Target};
