//! The column-kind-agnostic [`Feature`] and per-column search results.

use rand::Rng;

use crate::allocs::BestSplitAllocs;
use crate::categorical::{CatFeature, is_missing_token};
use crate::config::{CONTRAST_SUFFIX, MIN_IMP, SplitConfig};
use crate::error::SplitError;
use crate::numeric::{NumFeature, parse_value};
use crate::splitter::{Partition, Splitter};
use crate::target::Target;

/// A column-specific split encoding produced by a column's search.
///
/// Category codes are only meaningful to the column that produced them;
/// [`Feature::decode_split`] turns the encoding into a [`Splitter`].
#[derive(Debug, Clone, PartialEq)]
pub enum CodedSplit {
    /// Numeric values `<=` the threshold go left.
    Threshold(f64),
    /// Category codes that go left.
    Categories(Vec<usize>),
}

/// Outcome of searching one column.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCandidate {
    /// Best split found, if any beat the floor.
    pub split: Option<CodedSplit>,
    /// Impurity decrease of `split`; [`MIN_IMP`] when there is none.
    pub impurity_decrease: f64,
    /// The column holds a single distinct value over the case set.
    pub constant: bool,
}

impl SplitCandidate {
    pub(crate) fn none() -> Self {
        Self {
            split: None,
            impurity_decrease: MIN_IMP,
            constant: false,
        }
    }

    pub(crate) fn constant() -> Self {
        Self {
            constant: true,
            ..Self::none()
        }
    }
}

/// One predictor or response column of a [`FeatureMatrix`](crate::FeatureMatrix).
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// Real-valued column, named with an `N:` prefix.
    Numeric(NumFeature),
    /// Column of category labels, named with any other prefix.
    Categorical(CatFeature),
}

impl From<NumFeature> for Feature {
    fn from(f: NumFeature) -> Self {
        Feature::Numeric(f)
    }
}

impl From<CatFeature> for Feature {
    fn from(f: CatFeature) -> Self {
        Feature::Categorical(f)
    }
}

impl Feature {
    /// Create an empty column of the kind named by its prefix: `N:` is
    /// numeric, anything else categorical.
    #[must_use]
    pub fn with_name(name: &str, capacity: usize) -> Self {
        if name.starts_with("N:") {
            NumFeature::with_capacity(name, capacity).into()
        } else {
            CatFeature::with_capacity(name, capacity).into()
        }
    }

    /// Column name, including its type prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Feature::Numeric(f) => &f.name,
            Feature::Categorical(f) => &f.name,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Feature::Numeric(f) => f.name = name,
            Feature::Categorical(f) => f.name = name,
        }
    }

    /// Number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Feature::Numeric(f) => f.len(),
            Feature::Categorical(f) => f.len(),
        }
    }

    /// True when the column holds no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for [`Feature::Numeric`].
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Feature::Numeric(_))
    }

    /// Number of categories; `0` for numeric columns.
    #[must_use]
    pub fn n_cats(&self) -> usize {
        match self {
            Feature::Numeric(_) => 0,
            Feature::Categorical(f) => f.n_cats(),
        }
    }

    /// Whether case `i` has no value.
    #[must_use]
    pub fn is_missing(&self, i: usize) -> bool {
        match self {
            Feature::Numeric(f) => f.is_missing(i),
            Feature::Categorical(f) => f.is_missing(i),
        }
    }

    /// Whether any case has no value.
    #[must_use]
    pub fn has_missing(&self) -> bool {
        match self {
            Feature::Numeric(f) => f.has_missing(),
            Feature::Categorical(f) => f.has_missing(),
        }
    }

    /// Mark case `i` missing.
    pub fn put_missing(&mut self, i: usize) {
        match self {
            Feature::Numeric(f) => f.put_missing(i),
            Feature::Categorical(f) => f.put_missing(i),
        }
    }

    /// Text form of case `i`; `None` when missing.
    #[must_use]
    pub fn get_str(&self, i: usize) -> Option<String> {
        match self {
            Feature::Numeric(f) => f.get(i).map(|v| v.to_string()),
            Feature::Categorical(f) => f.get(i).map(str::to_string),
        }
    }

    /// Store case `i` from text, using the same missing rules as
    /// [`Feature::append`].
    pub fn put_str(&mut self, i: usize, v: &str) {
        match self {
            Feature::Numeric(f) => match parse_value(v) {
                Some(value) => f.put(i, value),
                None => f.put_missing(i),
            },
            Feature::Categorical(f) => {
                if is_missing_token(v) {
                    f.put_missing(i);
                } else {
                    f.put(i, v);
                }
            }
        }
    }

    /// Append one case from text. Unparseable numbers and categorical
    /// missing tokens become missing.
    pub fn append(&mut self, v: &str) {
        match self {
            Feature::Numeric(f) => f.append(v),
            Feature::Categorical(f) => f.append(v),
        }
    }

    /// The numeric column, or `None` for a categorical one.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&NumFeature> {
        match self {
            Feature::Numeric(f) => Some(f),
            Feature::Categorical(_) => None,
        }
    }

    /// The categorical column, or `None` for a numeric one.
    #[must_use]
    pub fn as_categorical(&self) -> Option<&CatFeature> {
        match self {
            Feature::Numeric(_) => None,
            Feature::Categorical(f) => Some(f),
        }
    }

    /// View this column as a response: numeric columns regress on
    /// variance, categorical columns classify on Gini impurity.
    #[must_use]
    pub fn as_target(&self) -> &dyn Target {
        match self {
            Feature::Numeric(f) => f as &dyn Target,
            Feature::Categorical(f) => f,
        }
    }

    /// Find this column's best split of `cases` against `target`.
    pub fn best_split(
        &self,
        target: &dyn Target,
        cases: &[usize],
        parent_imp: f64,
        config: &SplitConfig,
        allocs: &mut BestSplitAllocs,
        rng: &mut impl Rng,
    ) -> SplitCandidate {
        match self {
            Feature::Numeric(f) => f.best_split(target, cases, parent_imp, config, allocs, rng),
            Feature::Categorical(f) => f.best_split(target, cases, parent_imp, config, allocs, rng),
        }
    }

    /// Decode a split produced by this column into a standalone rule.
    ///
    /// Returns `None` if `coded` was produced by a column of the other kind.
    #[must_use]
    pub fn decode_split(&self, coded: &CodedSplit) -> Option<Splitter> {
        match (self, coded) {
            (Feature::Numeric(f), CodedSplit::Threshold(t)) => Some(Splitter::numeric(&f.name, *t)),
            (Feature::Categorical(f), CodedSplit::Categories(codes)) => Some(Splitter::categorical(
                &f.name,
                codes.iter().filter_map(|&c| f.num_to_cat(c)),
            )),
            _ => None,
        }
    }

    /// Partition `cases` under a split this column produced. A mismatched
    /// encoding routes every case to the missing branch.
    #[must_use]
    pub fn split(&self, coded: &CodedSplit, cases: &[usize]) -> Partition {
        match (self, coded) {
            (Feature::Numeric(f), CodedSplit::Threshold(t)) => f.split(*t, cases),
            (Feature::Categorical(f), CodedSplit::Categories(codes)) => f.split(codes, cases),
            _ => Partition {
                missing: cases.to_vec(),
                ..Partition::default()
            },
        }
    }

    /// Reorder `cases` in place into left, missing, right runs and return
    /// `(left_end, right_start)`: left cases occupy `..left_end` and right
    /// cases `right_start..`.
    pub fn split_points(&self, coded: &CodedSplit, cases: &mut [usize]) -> (usize, usize) {
        let partition = self.split(coded, cases);
        let left_end = partition.left.len();
        let right_start = left_end + partition.missing.len();
        for (slot, c) in cases.iter_mut().zip(
            partition
                .left
                .into_iter()
                .chain(partition.missing)
                .chain(partition.right),
        ) {
            *slot = c;
        }
        (left_end, right_start)
    }

    /// A copy with every value permuted and `:SHUFFLED` appended to the name.
    #[must_use]
    pub fn shuffled_copy(&self, rng: &mut impl Rng) -> Feature {
        let mut fake = self.clone();
        fake.set_name(format!("{}{CONTRAST_SUFFIX}", self.name()));
        fake.shuffle(rng);
        fake
    }

    /// Overwrite `dst`'s values, missing flags and (for categorical
    /// columns) encoder with this column's, keeping `dst`'s name.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::LengthMismatch`] if the lengths differ, or
    /// [`SplitError::NotNumeric`] / [`SplitError::NotCategorical`] if the
    /// kinds differ.
    pub fn copy_into(&self, dst: &mut Feature) -> Result<(), SplitError> {
        if dst.len() != self.len() {
            return Err(SplitError::LengthMismatch {
                name: dst.name().to_string(),
                expected: self.len(),
                got: dst.len(),
            });
        }
        match (self, dst) {
            (Feature::Numeric(src), Feature::Numeric(dst)) => {
                dst.values.copy_from_slice(&src.values);
                dst.missing.copy_from_slice(&src.missing);
                Ok(())
            }
            (Feature::Categorical(src), Feature::Categorical(dst)) => {
                dst.codes.copy_from_slice(&src.codes);
                dst.missing.copy_from_slice(&src.missing);
                dst.map.clone_from(&src.map);
                Ok(())
            }
            (Feature::Numeric(_), dst) => Err(SplitError::NotNumeric {
                name: dst.name().to_string(),
            }),
            (Feature::Categorical(_), dst) => Err(SplitError::NotCategorical {
                name: dst.name().to_string(),
            }),
        }
    }

    /// Permute all values in place; missing flags move with their values.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        match self {
            Feature::Numeric(f) => f.shuffle(rng),
            Feature::Categorical(f) => f.shuffle(rng),
        }
    }

    /// Permute values among `cases` only, leaving every other case as is.
    pub fn shuffle_cases(&mut self, cases: &[usize], rng: &mut impl Rng) {
        match self {
            Feature::Numeric(f) => f.shuffle_cases(cases, rng),
            Feature::Categorical(f) => f.shuffle_cases(cases, rng),
        }
    }

    /// Fill missing values with the column mean (numeric) or mode
    /// (categorical).
    pub fn impute_missing(&mut self) {
        match self {
            Feature::Numeric(f) => f.impute_missing(),
            Feature::Categorical(f) => f.impute_missing(),
        }
    }
}
