//! Two weighted objectives, from configuration file to the engine request
//! a job process receives.

mod common;

use std::sync::Arc;

use common::{fast_settings, temp_dir, write_config, Ending, InProcessJobs, ScriptedEngine};
use optima::application::SessionOutcome;
use optima::domain::cancellation::CancellationToken;
use optima::domain::models::JobStatus;
use optima::domain::ports::NullReporter;
use optima::infrastructure::config::load_job_config;
use optima::services::{translate, ConfigValidator};

const MULTIOBJ_CONFIG: &str = r#"
output_dir: everest_output
optimizer:
  command: ["fake-optimizer", "--verbose"]
  algorithm: optpp_q_newton
  max_batch_num: 3
controls:
  - name: point_x
    initial_guess: 0.25
    min: -1.0
    max: 1.0
  - name: point_y
    initial_guess: 0.25
    min: -1.0
    max: 1.0
objective_functions:
  - name: distance_p
    weight: 1.0
    normalization: 1
  - name: distance_q
    weight: 3
realizations: [0]
forward_model:
  - "copy_file in.json out.json"
"#;

#[test]
fn test_multiobjective_translation() {
    let dir = temp_dir();
    let path = write_config(dir.path(), MULTIOBJ_CONFIG);

    let config = load_job_config(&ConfigValidator::new(), &path).unwrap();
    let engine = translate(&config);

    assert_eq!(engine.objective_functions.names, vec!["distance_p", "distance_q"]);
    assert_eq!(engine.objective_functions.weights, vec![0.25, 0.75]);
    assert_eq!(engine.objective_functions.scales[0], 1.0);
    assert_eq!(engine.variables.names, vec!["point_x", "point_y"]);
    assert_eq!(engine.max_batch_num, Some(3));
}

#[tokio::test]
async fn test_multiobjective_run_hands_normalized_request_to_engine() {
    let dir = temp_dir();
    let path = write_config(dir.path(), MULTIOBJ_CONFIG);
    let config = load_job_config(&ConfigValidator::new(), &path).unwrap();

    let engine = Arc::new(ScriptedEngine::new(Ending::Complete(None)));
    let jobs = InProcessJobs::new(engine.clone());
    let controller = jobs.controller(fast_settings());

    let outcome = controller
        .run(&config, false, false, &NullReporter, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, SessionOutcome::Finished(ref r) if r.status == JobStatus::Completed));

    let requests = engine.requests();
    let request = &requests[0];
    assert_eq!(request.command, vec!["fake-optimizer", "--verbose"]);
    assert_eq!(request.optimizer.objective_functions.weights, vec![0.25, 0.75]);
    assert_eq!(request.simulation.forward_model.len(), 1);
    assert_eq!(request.simulation.forward_model[0].name, "copy_file");
    assert_eq!(request.simulation.forward_model[0].args, vec!["in.json", "out.json"]);
    assert!(request
        .simulation
        .runpath
        .starts_with(dir.path().join("everest_output")));
}
