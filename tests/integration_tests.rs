//! Integration tests for the rlinear library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use approx::assert_relative_eq;
use rlinear::api::{quick, LinearClassifier};
use rlinear::{
    cross_validation, train, LinearError, Model, Parameter, Predictor, Problem, SolverType,
    SparseVector, Trainer,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn sv(pairs: &[(usize, f64)]) -> SparseVector {
    SparseVector::from_pairs(pairs)
}

/// Three classes, 20 sparse features, labels cycling through 1, i32::MAX, 2
fn three_class_problem(rows: usize) -> Problem {
    let labels = [1, i32::MAX, 2];
    let mut x = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);
    for i in 0..rows {
        let k = i % 3;
        let jitter = ((i * 7919) % 101) as f64 / 101.0;
        let mut pairs = vec![(k + 1, 1.0 + jitter)];
        // shared noise features
        pairs.push((4 + i % 17, 0.1 + 0.5 * jitter));
        pairs.sort_by_key(|&(j, _)| j);
        pairs.dedup_by_key(|p| p.0);
        x.push(sv(&pairs));
        y.push(labels[k]);
    }
    Problem::new(x, y).unwrap()
}

/// Test complete workflow: data loading -> training -> evaluation
#[test]
fn test_complete_workflow_libsvm() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");

    // Classic linearly separable dataset
    writeln!(temp_file, "+1 1:2.0 2:1.0").expect("Failed to write");
    writeln!(temp_file, "+1 1:1.8 2:1.1").expect("Failed to write");
    writeln!(temp_file, "+1 1:2.2 2:0.9").expect("Failed to write");
    writeln!(temp_file, "-1 1:-2.0 2:-1.0").expect("Failed to write");
    writeln!(temp_file, "-1 1:-1.8 2:-1.1").expect("Failed to write");
    writeln!(temp_file, "-1 1:-2.2 2:-0.9").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");

    for solver in SolverType::ALL {
        let model = LinearClassifier::new()
            .with_solver(solver)
            .with_bias(1.0)
            .train_from_file(temp_file.path())
            .expect("Training should succeed");

        let accuracy = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(accuracy, 1.0, "{solver} misclassifies separable data");

        let problem = Problem::from_libsvm_file(temp_file.path(), 1.0).unwrap();
        let metrics = model.evaluate_detailed(&problem);
        assert_eq!(metrics.accuracy(), 1.0);
        assert_eq!(metrics.precision(1), 1.0);
        assert_eq!(metrics.recall(-1), 1.0);
    }
}

#[test]
fn test_multiclass_training_all_solvers() {
    let problem = three_class_problem(60).with_bias(1.0);
    for solver in SolverType::ALL {
        let model = train(&problem, &Parameter::with_solver(solver)).unwrap();
        assert_eq!(model.labels(), &[1, i32::MAX, 2]);
        assert_eq!(model.nr_weight_columns(), 3);
        assert!(
            model.accuracy(&problem) > 0.9,
            "{solver} accuracy {}",
            model.accuracy(&problem)
        );
    }
}

#[test]
fn test_instance_weight_matches_duplication() {
    let base = vec![
        sv(&[(1, 1.0), (2, 0.5)]),
        sv(&[(1, -1.0), (2, 0.2)]),
        sv(&[(1, 0.3), (2, -0.8)]),
        sv(&[(1, -0.4), (2, -0.1)]),
    ];
    let labels = vec![1, -1, 1, -1];

    let weighted = Problem::new(base.clone(), labels.clone())
        .unwrap()
        .with_weights(vec![2.0, 1.0, 1.0, 1.0])
        .unwrap();

    let mut dup_x = base;
    dup_x.push(sv(&[(1, 1.0), (2, 0.5)]));
    let mut dup_y = labels;
    dup_y.push(1);
    let duplicated = Problem::new(dup_x, dup_y).unwrap();

    for solver in SolverType::ALL {
        let param = Parameter::new(solver, 1.0, 1e-8);
        let a = train(&weighted, &param).unwrap();
        let b = train(&duplicated, &param).unwrap();
        for (wa, wb) in a.feature_weights().iter().zip(b.feature_weights()) {
            assert_relative_eq!(*wa, *wb, epsilon = 1e-5);
        }
    }
}

/// Four instances over four features, separable without a bias term
fn small_separable_problem() -> Problem {
    let x = vec![
        sv(&[(1, 1.0), (2, 1.0)]),
        sv(&[(3, 1.0)]),
        sv(&[(3, 1.0)]),
        sv(&[(1, 2.0), (2, 1.0), (4, 1.0)]),
    ];
    Problem::new(x, vec![0, 1, 1, 0]).unwrap()
}

#[test]
fn test_separable_data_every_solver_and_cost() {
    let problem = small_separable_problem();
    assert!(!problem.has_bias());

    for solver in SolverType::ALL {
        let mut c = 0.1;
        while c <= 100.0 {
            // too little cost leaves the L1-regularized models at zero
            let skip = (solver == SolverType::L1rL2LossSvc && c < 0.2)
                || (solver == SolverType::L1rLr && c < 0.7);
            if !skip {
                let param = Parameter::new(solver, c, solver.default_eps());
                let model = train(&problem, &param).unwrap();

                let expected_weights = if solver == SolverType::McsvmCs { 8 } else { 4 };
                assert_eq!(model.feature_weights().len(), expected_weights);
                assert_eq!(model.labels(), &[0, 1]);

                let predicted: Vec<i32> =
                    problem.x.iter().map(|x| model.predict_label(x)).collect();
                assert_eq!(predicted, problem.y, "{solver} with C = {c}");
            }
            c *= 1.2;
        }
    }
}

#[test]
fn test_instance_weights_decide_overlapping_points() {
    // each point appears under both labels; the heavier copy must win
    let x = vec![
        sv(&[(1, 1.0)]),
        sv(&[(1, 1.0)]),
        sv(&[(2, 1.0)]),
        sv(&[(2, 1.0)]),
    ];
    let problem = Problem::new(x, vec![0, 1, 0, 1])
        .unwrap()
        .with_weights(vec![2.0, 1.0, 1.0, 2.0])
        .unwrap();

    // L1-regularized LR stays at zero weights for C = 1 here
    for solver in SolverType::ALL
        .into_iter()
        .filter(|&s| s != SolverType::L1rLr)
    {
        let param = Parameter::new(solver, 1.0, solver.default_eps());
        let model = train(&problem, &param).unwrap();
        let predicted: Vec<i32> = problem.x.iter().map(|x| model.predict_label(x)).collect();
        assert_eq!(predicted, vec![0, 0, 1, 1], "{solver}");
    }
}

#[test]
fn test_class_weight_shifts_decision() {
    // mirror-symmetric overlapping data: unweighted bias is zero
    let x: Vec<SparseVector> = [1.0, 2.0, -0.5, -1.0, -2.0, 0.5]
        .iter()
        .map(|&v| sv(&[(1, v)]))
        .collect();
    let problem = Problem::new(x, vec![1, 1, 1, -1, -1, -1])
        .unwrap()
        .with_bias(1.0);
    let origin = SparseVector::empty();

    for solver in [
        SolverType::L2rLr,
        SolverType::L2rL2LossSvcDual,
        SolverType::L2rL1LossSvcDual,
        SolverType::L2rL2LossSvc,
    ] {
        let plain = Parameter::new(solver, 1.0, 1e-4);
        let heavy = plain.clone().with_class_weight(1, 10.0);
        let d_plain = train(&problem, &plain).unwrap().decision_values(&origin)[0];
        let d_heavy = train(&problem, &heavy).unwrap().decision_values(&origin)[0];
        assert!(
            d_heavy > d_plain,
            "{solver}: weighting the first class should raise its score ({d_heavy} <= {d_plain})"
        );
    }
}

#[test]
fn test_cross_validation_predicts_known_labels() {
    let problem = three_class_problem(45);
    for solver in SolverType::ALL {
        let target = cross_validation(&problem, &Parameter::with_solver(solver), 5).unwrap();
        assert_eq!(target.len(), problem.len());
        assert!(target.iter().all(|t| [1, i32::MAX, 2].contains(t)));
    }
}

#[test]
fn test_unsorted_features_error_message() {
    let x = vec![sv(&[(1, 1.0)]), SparseVector::new(vec![3, 2], vec![1.0, 1.0])];
    let problem = Problem::new(x, vec![1, -1]).unwrap();
    let err = train(&problem, &Parameter::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("feature nodes"));
    assert!(message.contains("sorted"));
    assert!(message.contains("ascending order"));

    assert!(matches!(
        cross_validation(&problem, &Parameter::default(), 2),
        Err(LinearError::UnsortedFeatures { instance: 1, .. })
    ));
}

#[test]
fn test_model_text_round_trip_every_solver() {
    let problem = three_class_problem(300).with_bias(2.0);
    for solver in SolverType::ALL {
        let model = Trainer::with_seed(1)
            .train(&problem, &Parameter::with_solver(solver))
            .unwrap();

        let file = NamedTempFile::new().expect("Failed to create temp file");
        model.save(file.path()).expect("Save should succeed");
        let loaded = Model::load(file.path()).expect("Load should succeed");

        assert_eq!(loaded.solver_type(), solver);
        assert_eq!(loaded.labels(), &[1, i32::MAX, 2]);
        assert_eq!(loaded.nr_feature(), model.nr_feature());
        assert_eq!(loaded.bias(), 2.0);
        assert_eq!(loaded.feature_weights().len(), model.feature_weights().len());
        for (a, b) in loaded.feature_weights().iter().zip(model.feature_weights()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-5);
        }

        // saving the loaded model reproduces the file
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(loaded.to_text(), text);
    }
}

#[test]
fn test_json_export_round_trip() {
    let problem = three_class_problem(30);
    let model = train(&problem, &Parameter::with_solver(SolverType::L2rLr)).unwrap();

    let file = NamedTempFile::new().expect("Failed to create temp file");
    model.save_json(file.path()).unwrap();
    assert_eq!(Model::load_json(file.path()).unwrap(), model);
}

#[test]
fn test_probability_estimates() {
    let problem = three_class_problem(30);
    let model = train(&problem, &Parameter::with_solver(SolverType::L2rLr)).unwrap();
    for x in &problem.x {
        let (label, prob) = model.predict_probability(x).unwrap();
        assert_relative_eq!(prob.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_eq!(label, model.predict_label(x));
    }

    let svm = train(&problem, &Parameter::default()).unwrap();
    assert!(svm.predict_probability(&problem.x[0]).is_err());
}

#[test]
fn test_quick_helpers() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(temp_file, "2 1:1.0").expect("Failed to write");
    writeln!(temp_file, "3 2:1.0").expect("Failed to write");
    writeln!(temp_file, "2 1:0.8").expect("Failed to write");
    writeln!(temp_file, "3 2:0.8").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");

    let model = quick::train_libsvm(temp_file.path()).expect("Training should succeed");
    assert_eq!(model.inner().labels(), &[2, 3]);
    assert_eq!(model.predict(&sv(&[(1, 2.0)])).label, 2);
}

#[test]
fn test_single_class_problem() {
    let problem = Problem::new(vec![sv(&[(1, 1.0)]), sv(&[(1, 2.0)])], vec![9, 9]).unwrap();
    let model = LinearClassifier::new()
        .with_solver(SolverType::L1rLr)
        .train(&problem)
        .unwrap();
    assert_eq!(model.predict(&sv(&[(1, -5.0)])).label, 9);
}
