// src/aggregate.rs

//! Collapses encoded contributions into one entry per semantic feature.

use crate::core::{ContributionMap, ExplainError, Result};
use crate::names::FeatureNameReconciler;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct ContributionAggregator<'a> {
    reconciler: &'a FeatureNameReconciler,
    index_by_name: HashMap<&'a str, usize>,
}

impl<'a> ContributionAggregator<'a> {
    pub fn new(reconciler: &'a FeatureNameReconciler) -> Self {
        let index_by_name = reconciler
            .encoded()
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.as_str(), idx))
            .collect();
        ContributionAggregator {
            reconciler,
            index_by_name,
        }
    }

    /// Sums encoded contributions per owning feature.
    ///
    /// The output follows semantic declaration order and every semantic
    /// feature appears, even with zero contribution. Sums run in encoded
    /// order, so the result does not depend on the order of `encoded`.
    pub fn aggregate(&self, encoded: &ContributionMap) -> Result<ContributionMap> {
        self.reconciler.check_len("encoded contributions", encoded.len())?;

        let mut by_index: Vec<Option<f64>> = vec![None; self.reconciler.len()];
        for (name, value) in encoded.iter() {
            match self.index_by_name.get(name) {
                Some(&idx) if by_index[idx].is_none() => by_index[idx] = Some(value),
                _ => {
                    // Distinct recognised names; duplicates do not count twice.
                    let recognised = encoded
                        .names()
                        .filter(|n| self.index_by_name.contains_key(n))
                        .collect::<HashSet<_>>()
                        .len();
                    return Err(ExplainError::SchemaMismatch {
                        component: "encoded contribution names",
                        expected: self.reconciler.len(),
                        actual: recognised,
                    });
                }
            }
        }

        let mut totals = vec![0.0_f64; self.reconciler.semantic_features().len()];
        for (feature, value) in self.reconciler.encoded().iter().zip(by_index) {
            totals[feature.owner] += value.unwrap_or(0.0);
        }

        Ok(self
            .reconciler
            .semantic_features()
            .iter()
            .cloned()
            .zip(totals)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FeatureSpec;
    use approx::assert_abs_diff_eq;

    fn reconciler() -> FeatureNameReconciler {
        FeatureNameReconciler::from_features(&[
            FeatureSpec::numeric("Avg_Speed_Knots"),
            FeatureSpec::categorical("Ship_Type", ["Bulker", "Container", "Tanker"]),
            FeatureSpec::numeric("Wave_Height_m"),
            FeatureSpec::categorical("Current_Direction", ["Beam", "Following", "Head"]),
        ])
    }

    fn encoded() -> ContributionMap {
        vec![
            ("Avg_Speed_Knots", 12.5),
            ("Ship_Type=Bulker", -1.25),
            ("Ship_Type=Container", 0.5),
            ("Ship_Type=Tanker", -0.25),
            ("Wave_Height_m", 3.0),
            ("Current_Direction=Beam", 0.0),
            ("Current_Direction=Following", -0.75),
            ("Current_Direction=Head", 0.125),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn sums_one_hot_groups_into_their_parent() {
        let reconciler = reconciler();
        let aggregated = ContributionAggregator::new(&reconciler)
            .aggregate(&encoded())
            .unwrap();
        assert_eq!(
            aggregated.names().collect::<Vec<_>>(),
            vec!["Avg_Speed_Knots", "Ship_Type", "Wave_Height_m", "Current_Direction"]
        );
        assert_eq!(aggregated.get("Ship_Type"), Some(-1.0));
        assert_eq!(aggregated.get("Current_Direction"), Some(-0.625));
        assert_abs_diff_eq!(aggregated.total(), encoded().total(), epsilon = 1e-12);
    }

    #[test]
    fn input_order_does_not_change_output() {
        let reconciler = reconciler();
        let aggregator = ContributionAggregator::new(&reconciler);
        let reversed: ContributionMap = encoded()
            .iter()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        assert_eq!(
            aggregator.aggregate(&encoded()).unwrap(),
            aggregator.aggregate(&reversed).unwrap()
        );
    }

    #[test]
    fn unknown_encoded_name_is_a_schema_mismatch() {
        let reconciler = reconciler();
        let mut renamed: ContributionMap = encoded()
            .iter()
            .filter(|(n, _)| *n != "Ship_Type=Tanker")
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        renamed.push("Ship_Type=Ferry", 0.1);
        let err = ContributionAggregator::new(&reconciler)
            .aggregate(&renamed)
            .unwrap_err();
        assert!(matches!(
            err,
            ExplainError::SchemaMismatch { expected: 8, actual: 7, .. }
        ));
    }

    #[test]
    fn duplicated_name_reports_the_missing_dimension() {
        let reconciler = reconciler();
        let mut duplicated: ContributionMap = encoded()
            .iter()
            .filter(|(n, _)| *n != "Current_Direction=Head")
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        duplicated.push("Ship_Type=Bulker", 0.5);
        let err = ContributionAggregator::new(&reconciler)
            .aggregate(&duplicated)
            .unwrap_err();
        assert!(matches!(
            err,
            ExplainError::SchemaMismatch { expected: 8, actual: 7, .. }
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let reconciler = reconciler();
        let short: ContributionMap = vec![("Avg_Speed_Knots", 1.0)].into_iter().collect();
        assert!(ContributionAggregator::new(&reconciler).aggregate(&short).is_err());
    }
}
