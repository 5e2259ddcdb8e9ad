/// Criterion for measuring the impurity of a class distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its (possibly weighted) class counts.
    ///
    /// Returns `0.0` when `total` is not positive (empty node).
    ///
    /// For `Gini`: `1 - Σ(p_i²)` where `p_i = count_i / total`.
    /// For `Entropy`: `-Σ(p_i · ln(p_i))` summed only over classes where `p_i > 0`.
    #[must_use]
    pub fn impurity(&self, class_counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0.0)
                    .map(|&c| {
                        let p = c / total;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SplitCriterion;

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[10.0, 0.0, 0.0], 10.0);
        assert!(imp.abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5.0, 5.0], 10.0);
        assert!((imp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_three_class_uniform() {
        let imp = SplitCriterion::Gini.impurity(&[100.0, 100.0, 100.0], 300.0);
        assert!((imp - (1.0 - 3.0 * (1.0 / 3.0_f64).powi(2))).abs() < 1e-10);
    }

    #[test]
    fn gini_weighted_counts() {
        let imp = SplitCriterion::Gini.impurity(&[0.25, 0.75], 1.0);
        assert!((imp - 0.375).abs() < 1e-12);
    }

    #[test]
    fn entropy_pure() {
        let imp = SplitCriterion::Entropy.impurity(&[10.0, 0.0, 0.0], 10.0);
        assert!(imp.abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5.0, 5.0], 10.0);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn empty_node_is_pure() {
        assert_eq!(SplitCriterion::Gini.impurity(&[0.0, 0.0], 0.0), 0.0);
        assert_eq!(SplitCriterion::Entropy.impurity(&[], 0.0), 0.0);
    }
}
