//! Column-oriented datasets and best-splitter search across columns.

use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::allocs::BestSplitAllocs;
use crate::config::{MIN_IMP, SplitConfig};
use crate::error::SplitError;
use crate::feature::{CodedSplit, Feature};
use crate::splitter::Splitter;
use crate::target::Target;

/// Result of a best-splitter search across candidate columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitOutcome {
    /// The winning rule, or `None` if no candidate beat [`MIN_IMP`].
    pub splitter: Option<Splitter>,
    /// Impurity decrease of the winning rule; [`MIN_IMP`] when there is none.
    pub impurity_decrease: f64,
    /// Position of the winning column.
    pub feature: Option<usize>,
    /// Candidate positions found constant over the case set. A tree builder
    /// can drop these from the candidates of descendant nodes.
    pub constant: Vec<usize>,
}

/// An ordered set of equal-length columns with a name index and case labels.
///
/// `index_of(name)` always equals the column's position in
/// [`FeatureMatrix::features`]; columns are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    data: Vec<Feature>,
    map: HashMap<String, usize>,
    case_labels: Vec<String>,
}

impl FeatureMatrix {
    /// Create a matrix with no columns over the given cases.
    #[must_use]
    pub fn new(case_labels: Vec<String>) -> Self {
        Self {
            data: Vec::new(),
            map: HashMap::new(),
            case_labels,
        }
    }

    /// Append a column and return its position.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::LengthMismatch`] if the column does not have one
    /// value per case, or [`SplitError::DuplicateFeatureName`] if its name
    /// is taken.
    pub fn push(&mut self, feature: impl Into<Feature>) -> Result<usize, SplitError> {
        let feature = feature.into();
        if feature.len() != self.n_cases() {
            return Err(SplitError::LengthMismatch {
                name: feature.name().to_string(),
                expected: self.n_cases(),
                got: feature.len(),
            });
        }
        if let Some(&position) = self.map.get(feature.name()) {
            return Err(SplitError::DuplicateFeatureName {
                name: feature.name().to_string(),
                position,
            });
        }
        Ok(self.insert(feature))
    }

    fn insert(&mut self, feature: Feature) -> usize {
        let position = self.data.len();
        self.map.insert(feature.name().to_string(), position);
        self.data.push(feature);
        position
    }

    /// Number of cases (rows).
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.case_labels.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn case_labels(&self) -> &[String] {
        &self.case_labels
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.data
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Feature> {
        self.data.get(position)
    }

    /// Position of the column called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.map.get(name).copied()
    }

    /// Look up a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::UnknownFeature`] if no column has that name.
    pub fn feature(&self, name: &str) -> Result<&Feature, SplitError> {
        self.index_of(name)
            .map(|i| &self.data[i])
            .ok_or_else(|| SplitError::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// View the column called `name` as a response variable.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::UnknownFeature`] if no column has that name.
    pub fn target(&self, name: &str) -> Result<&dyn Target, SplitError> {
        self.feature(name).map(Feature::as_target)
    }

    /// Largest category count over all columns.
    #[must_use]
    pub fn max_cats(&self) -> usize {
        self.data.iter().map(Feature::n_cats).max().unwrap_or(0)
    }

    /// Scratch allocations sized for searches over this matrix.
    #[must_use]
    pub fn new_allocs(&self) -> BestSplitAllocs {
        BestSplitAllocs::new(self.n_cases(), self.max_cats())
    }

    /// Find the best rule for splitting `cases` among the columns at
    /// `candidates`.
    ///
    /// Parent impurity is computed once from `target`. A column with missing
    /// cases left out by [`MissingPolicy::Exclude`](crate::MissingPolicy)
    /// rescores it over its present cases. A column wins only
    /// with a decrease strictly above both [`MIN_IMP`] and every earlier
    /// candidate's, so ties go to the first candidate listed.
    #[instrument(
        skip_all,
        fields(n_cases = cases.len(), n_candidates = candidates.len(), target = target.name())
    )]
    pub fn best_splitter(
        &self,
        target: &dyn Target,
        cases: &[usize],
        candidates: &[usize],
        config: &SplitConfig,
        allocs: &mut BestSplitAllocs,
        rng: &mut impl Rng,
    ) -> SplitOutcome {
        let parent_imp = target.impurity(cases, allocs.counts_mut());

        let mut best: Option<(usize, CodedSplit)> = None;
        let mut impurity_decrease = MIN_IMP;
        let mut constant = Vec::new();

        for &i in candidates {
            let candidate = self.data[i].best_split(target, cases, parent_imp, config, allocs, rng);
            trace!(
                feature = self.data[i].name(),
                decrease = candidate.impurity_decrease,
                constant = candidate.constant,
                "candidate evaluated"
            );
            if candidate.constant {
                constant.push(i);
            }
            if let Some(split) = candidate.split {
                if candidate.impurity_decrease > MIN_IMP
                    && candidate.impurity_decrease > impurity_decrease
                {
                    impurity_decrease = candidate.impurity_decrease;
                    best = Some((i, split));
                }
            }
        }

        let (splitter, feature) = match best {
            Some((i, split)) => (self.data[i].decode_split(&split), Some(i)),
            None => (None, None),
        };
        debug!(
            parent_imp,
            winner = feature.map(|i| self.data[i].name()),
            impurity_decrease,
            n_constant = constant.len(),
            "best splitter selected"
        );
        SplitOutcome {
            splitter,
            impurity_decrease,
            feature,
            constant,
        }
    }

    /// Append `n` contrast columns, each a shuffled copy of a column drawn
    /// uniformly with replacement from the columns present before the call.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::EmptyMatrix`] if `n > 0` and there are no
    /// columns to copy.
    pub fn add_contrasts(&mut self, n: usize, rng: &mut impl Rng) -> Result<(), SplitError> {
        let n_real = self.data.len();
        if n == 0 {
            return Ok(());
        }
        if n_real == 0 {
            return Err(SplitError::EmptyMatrix);
        }
        for _ in 0..n {
            let fake = self.data[rng.gen_range(0..n_real)].shuffled_copy(rng);
            self.push_contrast(fake);
        }
        debug!(added = n, n_features = self.data.len(), "contrast columns added");
        Ok(())
    }

    /// Append one shuffled copy of every column, in column order.
    pub fn contrast_all(&mut self, rng: &mut impl Rng) {
        let n_real = self.data.len();
        for i in 0..n_real {
            let fake = self.data[i].shuffled_copy(rng);
            self.push_contrast(fake);
        }
        debug!(added = n_real, n_features = self.data.len(), "contrast columns added");
    }

    /// Register a contrast column, numbering its name if a column of that
    /// name already exists.
    fn push_contrast(&mut self, mut fake: Feature) {
        if self.map.contains_key(fake.name()) {
            let base = fake.name().to_string();
            let mut k = 2;
            while self.map.contains_key(&format!("{base}:{k}")) {
                k += 1;
            }
            fake.set_name(format!("{base}:{k}"));
        }
        self.insert(fake);
    }

    /// Fill missing values in every column with its mean or mode.
    pub fn impute_missing(&mut self) {
        let mut imputed = 0;
        for f in &mut self.data {
            if f.has_missing() {
                f.impute_missing();
                imputed += 1;
            }
        }
        debug!(imputed, n_features = self.data.len(), "missing values imputed");
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::categorical::CatFeature;
    use crate::numeric::NumFeature;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("case{i}")).collect()
    }

    fn cat(name: &str, values: &[&str]) -> CatFeature {
        CatFeature::from_strs(name, &values.iter().map(|v| Some(*v)).collect::<Vec<_>>())
    }

    /// Target `C:y` at 0; `N:noise` at 1; `N:signal` at 2; `C:color` at 3.
    fn matrix() -> FeatureMatrix {
        let mut fm = FeatureMatrix::new(labels(6));
        fm.push(cat("C:y", &["A", "A", "A", "B", "B", "B"])).unwrap();
        fm.push(NumFeature::from_values("N:noise", vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]))
            .unwrap();
        fm.push(NumFeature::from_values("N:signal", vec![1.0, 2.0, 3.0, 7.0, 8.0, 9.0]))
            .unwrap();
        fm.push(cat("C:color", &["r", "g", "r", "g", "r", "g"])).unwrap();
        fm
    }

    #[test]
    fn push_validates_length_and_name() {
        let mut fm = matrix();
        let err = fm
            .push(NumFeature::from_values("N:short", vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, SplitError::LengthMismatch { expected: 6, got: 1, .. }));
        let err = fm
            .push(NumFeature::from_values("N:signal", vec![0.0; 6]))
            .unwrap_err();
        assert!(matches!(err, SplitError::DuplicateFeatureName { position: 2, .. }));
        assert_eq!(fm.n_features(), 4);
    }

    #[test]
    fn index_matches_positions() {
        let fm = matrix();
        for (i, f) in fm.features().iter().enumerate() {
            assert_eq!(fm.index_of(f.name()), Some(i));
        }
        assert!(matches!(
            fm.feature("N:nope"),
            Err(SplitError::UnknownFeature { .. })
        ));
        assert_eq!(fm.max_cats(), 2);
    }

    #[test]
    fn best_splitter_prefers_separating_column() {
        let fm = matrix();
        let target = fm.target("C:y").unwrap();
        let cases: Vec<usize> = (0..6).collect();
        let cfg = SplitConfig::new(1).unwrap();
        let mut allocs = fm.new_allocs();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let out = fm.best_splitter(target, &cases, &[1, 2, 3], &cfg, &mut allocs, &mut rng);
        assert_eq!(out.feature, Some(2));
        assert!((out.impurity_decrease - 0.5).abs() < 1e-12);
        assert_eq!(out.splitter, Some(Splitter::numeric("N:signal", 5.0)));

        let p = out
            .splitter
            .unwrap()
            .split_matrix(&fm, &cases)
            .unwrap();
        assert_eq!(p.left, vec![0, 1, 2]);
        assert_eq!(p.right, vec![3, 4, 5]);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let mut fm = matrix();
        fm.push(NumFeature::from_values("N:signal2", vec![1.0, 2.0, 3.0, 7.0, 8.0, 9.0]))
            .unwrap();
        let target = fm.target("C:y").unwrap();
        let cases: Vec<usize> = (0..6).collect();
        let cfg = SplitConfig::new(1).unwrap();
        let mut allocs = fm.new_allocs();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = fm.best_splitter(target, &cases, &[4, 2], &cfg, &mut allocs, &mut rng);
        assert_eq!(out.feature, Some(4));
        let out = fm.best_splitter(target, &cases, &[2, 4], &cfg, &mut allocs, &mut rng);
        assert_eq!(out.feature, Some(2));
    }

    #[test]
    fn no_improving_split_returns_none() {
        let mut fm = FeatureMatrix::new(labels(4));
        fm.push(cat("C:y", &["A", "B", "A", "B"])).unwrap();
        fm.push(NumFeature::from_values("N:flat", vec![5.0; 4])).unwrap();
        fm.push(cat("C:same", &["x", "x", "y", "y"])).unwrap();
        let target = fm.target("C:y").unwrap();
        let cfg = SplitConfig::new(1).unwrap();
        let mut allocs = fm.new_allocs();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = fm.best_splitter(target, &[0, 1, 2, 3], &[1, 2], &cfg, &mut allocs, &mut rng);
        assert!(out.splitter.is_none());
        assert_eq!(out.feature, None);
        assert_eq!(out.impurity_decrease, MIN_IMP);
        assert_eq!(out.constant, vec![1]);
    }

    #[test]
    fn regression_target_from_matrix() {
        let mut fm = FeatureMatrix::new(labels(4));
        fm.push(NumFeature::from_values("N:y", vec![1.0, 1.0, 5.0, 5.0])).unwrap();
        fm.push(cat("C:g", &["lo", "lo", "hi", "hi"])).unwrap();
        let target = fm.target("N:y").unwrap();
        let cfg = SplitConfig::new(1).unwrap();
        let mut allocs = fm.new_allocs();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = fm.best_splitter(target, &[0, 1, 2, 3], &[1], &cfg, &mut allocs, &mut rng);
        assert!((out.impurity_decrease - 4.0).abs() < 1e-12);
        assert_eq!(out.splitter, Some(Splitter::categorical("C:g", ["lo"])));
    }

    #[test]
    fn add_contrasts_appends_and_registers() {
        let mut fm = matrix();
        let before: Vec<Feature> = fm.features().to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        fm.add_contrasts(10, &mut rng).unwrap();

        assert_eq!(fm.n_features(), 14);
        assert_eq!(&fm.features()[..4], before.as_slice());
        for (i, f) in fm.features().iter().enumerate() {
            assert_eq!(fm.index_of(f.name()), Some(i));
            assert_eq!(f.len(), 6);
        }
        assert!(fm.features()[4..].iter().all(|f| f.name().contains(":SHUFFLED")));
    }

    #[test]
    fn add_contrasts_on_empty_matrix() {
        let mut fm = FeatureMatrix::new(labels(3));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(fm.add_contrasts(0, &mut rng).is_ok());
        assert!(matches!(
            fm.add_contrasts(2, &mut rng),
            Err(SplitError::EmptyMatrix)
        ));
    }

    #[test]
    fn contrast_all_doubles_columns_in_order() {
        let mut fm = matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        fm.contrast_all(&mut rng);
        assert_eq!(fm.n_features(), 8);
        for i in 0..4 {
            let real = &fm.features()[i];
            let fake = &fm.features()[i + 4];
            assert_eq!(fake.name(), format!("{}:SHUFFLED", real.name()));
            let mut a: Vec<_> = (0..6).map(|c| real.get_str(c)).collect();
            let mut b: Vec<_> = (0..6).map(|c| fake.get_str(c)).collect();
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn repeated_contrasts_get_unique_names() {
        let mut fm = matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        fm.contrast_all(&mut rng);
        fm.contrast_all(&mut rng);
        assert_eq!(fm.n_features(), 16);
        assert_eq!(fm.index_of("N:signal:SHUFFLED:2"), Some(10));
        assert_eq!(fm.index_of("N:signal:SHUFFLED:SHUFFLED"), Some(14));
    }

    #[test]
    fn impute_fills_every_column() {
        let mut fm = FeatureMatrix::new(labels(3));
        fm.push(NumFeature::from_options("N:x", &[Some(1.0), None, Some(3.0)]))
            .unwrap();
        fm.push(CatFeature::from_strs("C:c", &[None, Some("a"), Some("a")]))
            .unwrap();
        fm.impute_missing();
        assert!(fm.features().iter().all(|f| !f.has_missing()));
        assert_eq!(fm.get(0).unwrap().get_str(1).as_deref(), Some("2"));
        assert_eq!(fm.get(1).unwrap().get_str(0).as_deref(), Some("a"));
    }
}
