use optima::services::{translate, validate_str};
use proptest::prelude::*;
use std::path::Path;

const HEADER: &str = r#"
output_dir: out
optimizer:
  command: ["engine"]
controls:
  - name: rate
    initial_guess: 0.5
    min: 0.0
    max: 1.0
realizations: [0, 1, 2, 3]
"#;

/// Build a config with one objective per `(weight, normalization)` pair.
fn config_yaml(objectives: &[(Option<f64>, Option<f64>)], cvar: Option<&str>) -> String {
    let mut yaml = String::from(HEADER);
    yaml.push_str("objective_functions:\n");
    for (i, (weight, normalization)) in objectives.iter().enumerate() {
        yaml.push_str(&format!("  - name: obj{i}\n"));
        if let Some(w) = weight {
            yaml.push_str(&format!("    weight: {w}\n"));
        }
        if let Some(n) = normalization {
            yaml.push_str(&format!("    normalization: {n}\n"));
        }
    }
    if let Some(cvar) = cvar {
        yaml.push_str(&format!("cvar: {cvar}\n"));
    }
    yaml
}

fn check(yaml: &str) -> Result<optima::OptimizationConfig, optima::ValidationErrors> {
    validate_str(yaml, Path::new("/case/config.yml"))
}

fn positive_weight() -> impl Strategy<Value = f64> {
    0.001f64..1000.0
}

proptest! {
    /// Property: weights given for some but not all objectives are rejected
    #[test]
    fn prop_partial_weights_rejected(
        weights in prop::collection::vec(prop::option::of(positive_weight()), 2..6)
    ) {
        let given = weights.iter().filter(|w| w.is_some()).count();
        prop_assume!(given != 0 && given != weights.len());

        let objectives: Vec<_> = weights.into_iter().map(|w| (w, None)).collect();
        let errors = check(&config_yaml(&objectives, None)).unwrap_err();
        prop_assert!(errors.contains("either for all of the objectives or for none"));
    }

    /// Property: a weight is accepted exactly when it is positive
    #[test]
    fn prop_weight_sign_decides(weight in -100.0f64..100.0) {
        let result = check(&config_yaml(&[(Some(weight), None)], None));
        if weight > 0.0 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.unwrap_err().contains("weight must be greater than 0"));
        }
    }

    /// Property: any nonzero normalization is accepted, including negative
    #[test]
    fn prop_nonzero_normalization_accepted(
        normalization in prop_oneof![-1.0e6f64..-1.0e-6, 1.0e-6f64..1.0e6]
    ) {
        let config = check(&config_yaml(&[(None, Some(normalization))], None)).unwrap();
        prop_assert_eq!(translate(&config).objective_functions.scales, vec![normalization]);
    }

    /// Property: CVaR needs exactly one of its two fields
    #[test]
    fn prop_cvar_exclusive(count in prop::option::of(1u32..=4), percentile in prop::option::of(0.0f64..=1.0)) {
        let cvar = match (count, percentile) {
            (Some(c), Some(p)) => format!("{{number_of_realizations: {c}, percentile: {p}}}"),
            (Some(c), None) => format!("{{number_of_realizations: {c}}}"),
            (None, Some(p)) => format!("{{percentile: {p}}}"),
            (None, None) => "{}".to_string(),
        };
        let result = check(&config_yaml(&[(None, None)], Some(&cvar)));

        if count.is_some() != percentile.is_some() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.unwrap_err().contains("specify only one of the following"));
        }
    }

    /// Property: translation is deterministic and weights sum to one
    #[test]
    fn prop_translation_idempotent(weights in prop::collection::vec(positive_weight(), 1..6)) {
        let objectives: Vec<_> = weights.iter().map(|w| (Some(*w), None)).collect();
        let config = check(&config_yaml(&objectives, None)).unwrap();

        let first = translate(&config);
        let second = translate(&config);
        prop_assert_eq!(&first, &second);

        let total: f64 = first.objective_functions.weights.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        for (normalized, declared) in first.objective_functions.weights.iter().zip(&weights) {
            let expected = declared / weights.iter().sum::<f64>();
            prop_assert!((normalized - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn test_zero_normalization_rejected() {
    let errors = check(&config_yaml(&[(None, Some(0.0))], None)).unwrap_err();
    assert!(errors.contains("normalization value cannot be zero"));
}

#[test]
fn test_all_violations_are_reported_together() {
    let yaml = config_yaml(
        &[(Some(-1.0), Some(0.0)), (None, None)],
        Some("{number_of_realizations: 2, percentile: 0.5}"),
    );
    let errors = check(&yaml).unwrap_err();

    assert!(errors.contains("either for all of the objectives or for none"));
    assert!(errors.contains("weight must be greater than 0"));
    assert!(errors.contains("normalization value cannot be zero"));
    assert!(errors.contains("specify only one of the following"));
}

#[test]
fn test_weights_one_point_three_three_and_three_point_one() {
    let config = check(&config_yaml(&[(Some(1.33), None), (Some(3.1), None)], None)).unwrap();
    let weights = translate(&config).objective_functions.weights;

    assert!((weights[0] - 1.33 / 4.43).abs() < 1e-12);
    assert!((weights[1] - 3.1 / 4.43).abs() < 1e-12);
}
