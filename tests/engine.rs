use apsim::{
    Bounds, Bucket, CancelToken, Engine, ModelKind, Progress, SimError, SimulationConfig,
    Thresholds, grid::grid_len, run_simulation,
};
use std::sync::mpsc;

fn config(model: ModelKind) -> SimulationConfig {
    SimulationConfig {
        model,
        data: (1..=10).map(f64::from).collect(),
        decision_limits: vec![5.0],
        decimal_places: 1,
        thresholds: Thresholds {
            min: 90.0,
            des: 95.0,
            opt: 99.0,
        },
        cv_i: Some(5.0),
        sample_size: None,
        bounds: Bounds {
            max_mu: Some(10.0),
            step_size_mu: Some(1.0),
            max_imprecision: Some(10.0),
            max_bias: Some(5.0),
            step_size_imp_bias: Some(2.5),
        },
        trials: 10,
        seed: Some(42),
    }
}

const MODELS: [ModelKind; 4] = [
    ModelKind::MuAnalytical,
    ModelKind::MuResampling,
    ModelKind::ImpBiasAnalytical,
    ModelKind::ImpBiasResampling,
];

#[test]
fn zero_error_reproduces_classification() {
    let mut cfg = config(ModelKind::MuAnalytical);
    cfg.bounds = Bounds::default();
    let result = run_simulation(cfg, Progress::new()).expect("failed to run simulation");

    let zero = &result.points[0];
    assert_eq!(zero.mu, 0.0);
    assert_eq!(zero.bias, 0.0);
    assert_eq!(zero.agreement, 1.0);
    assert_eq!(zero.sensitivity, 1.0);
    assert_eq!(zero.specificity, 1.0);
    assert_eq!(zero.agreement_cat, Bucket::Optimal);
    assert_eq!(zero.sublevel_agreement, vec![1.0]);
    assert_eq!(result.names, vec!["5.0"]);
}

#[test]
fn zero_imprecision_and_bias_reproduces_classification() {
    let mut cfg = config(ModelKind::ImpBiasAnalytical);
    cfg.data = vec![-3.0, 0.5, 2.0, 2.0, 4.9, 5.0, 5.1, 7.5, 8.0, 100.0];
    cfg.decision_limits = vec![2.0, 5.0, 8.0];

    let result = run_simulation(cfg, Progress::new()).expect("failed to run simulation");
    let zero = result
        .points
        .iter()
        .find(|point| point.mu == 0.0 && point.bias == 0.0)
        .expect("grid should contain the origin");
    assert_eq!(zero.agreement, 1.0);
    assert_eq!(zero.sublevel_sensitivity, vec![1.0; 3]);
    assert_eq!(zero.sublevel_specificity, vec![1.0; 3]);
}

#[test]
fn metrics_are_fractions_with_one_sublevel_per_limit() {
    for model in MODELS {
        let mut cfg = config(model);
        cfg.decision_limits = vec![2.5, 5.0, 7.5];

        let result = run_simulation(cfg, Progress::new()).expect("failed to run simulation");
        assert_eq!(result.names.len(), 3);
        for point in &result.points {
            assert_eq!(point.sublevel_agreement.len(), 3);
            assert_eq!(point.sublevel_sensitivity.len(), 3);
            assert_eq!(point.sublevel_specificity.len(), 3);

            let metrics = [point.agreement, point.sensitivity, point.specificity]
                .into_iter()
                .chain(point.sublevel_agreement.iter().copied())
                .chain(point.sublevel_sensitivity.iter().copied())
                .chain(point.sublevel_specificity.iter().copied());
            for metric in metrics {
                assert!((0.0..=1.0).contains(&metric), "{model:?}: {metric}");
            }
            assert_eq!(point.comparisons, 10 * 10);
        }
    }
}

#[test]
fn grid_size_matches_prediction() {
    for model in MODELS {
        let cfg = config(model);
        let expected = grid_len(&cfg).unwrap();
        let result = run_simulation(cfg, Progress::new()).expect("failed to run simulation");
        assert_eq!(result.points.len(), expected);
    }

    let engine = Engine::new(config(ModelKind::MuResampling)).unwrap();
    assert_eq!(engine.grid().len(), 11);

    let engine = Engine::new(config(ModelKind::ImpBiasAnalytical)).unwrap();
    assert_eq!(engine.grid().len(), 5 * 5);
}

#[test]
fn same_seed_same_result() {
    for model in MODELS {
        let first = run_simulation(config(model), Progress::new()).unwrap();
        let second = run_simulation(config(model), Progress::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.seed, 42);
    }
}

#[test]
fn unseeded_runs_report_their_seed() {
    let mut cfg = config(ModelKind::ImpBiasResampling);
    cfg.seed = None;
    let first = run_simulation(cfg.clone(), Progress::new()).unwrap();

    cfg.seed = Some(first.seed);
    let replay = run_simulation(cfg, Progress::new()).unwrap();
    assert_eq!(first, replay);
}

#[test]
fn sample_is_shared_by_every_grid_point() {
    let mut cfg = config(ModelKind::MuAnalytical);
    cfg.sample_size = Some(5);

    let engine = Engine::new(cfg.clone()).unwrap();
    assert_eq!(engine.data().len(), 5);
    assert!(engine.data().iter().all(|val| cfg.data.contains(val)));
    assert!(engine.data().windows(2).all(|pair| pair[0] < pair[1]));

    let result = engine.run(Progress::new()).unwrap();
    assert!(result.points.iter().all(|point| point.comparisons == 5 * 10));

    let again = Engine::new(cfg).unwrap();
    assert_eq!(again.data(), engine.data());
}

#[test]
fn large_errors_break_agreement_near_the_limit() {
    let mut cfg = config(ModelKind::MuAnalytical);
    cfg.data = (0..=10).map(|i| 4.5 + 0.1 * f64::from(i)).collect();
    cfg.bounds = Bounds::default();

    let result = run_simulation(cfg, Progress::new()).unwrap();
    let first = result.points.first().unwrap();
    let last = result.points.last().unwrap();
    assert_eq!(first.agreement, 1.0);
    assert!(last.agreement < 1.0);
    assert_eq!(last.agreement_cat, Bucket::BelowMin);
}

#[test]
fn biological_variation_perturbs_without_analytical_error() {
    let mut cfg = config(ModelKind::MuResampling);
    cfg.data = (0..=10).map(|i| 4.5 + 0.1 * f64::from(i)).collect();
    cfg.cv_i = Some(20.0);

    let result = run_simulation(cfg, Progress::new()).unwrap();
    assert!(result.points[0].agreement < 1.0);
}

#[test]
fn progress_increases_to_100() {
    let cfg = config(ModelKind::ImpBiasAnalytical);
    let n_points = grid_len(&cfg).unwrap();

    let (tx, rx) = mpsc::channel();
    run_simulation(cfg, Progress::with_sink(tx)).unwrap();

    // The run owns the sink, so the channel is closed once it returns.
    let sent: Vec<f64> = rx.iter().collect();
    assert_eq!(sent.len(), n_points);
    assert!(sent.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(sent.iter().all(|pct| (0.0..=100.0).contains(pct)));
    assert_eq!(sent.last(), Some(&100.0));
}

#[test]
fn runs_sharing_a_channel_each_report_once() {
    let mut cfg = config(ModelKind::MuAnalytical);
    cfg.bounds.max_mu = Some(2.0);
    assert_eq!(grid_len(&cfg).unwrap(), 3);

    let (tx, rx) = mpsc::channel();
    run_simulation(cfg.clone(), Progress::with_sink(tx.clone())).unwrap();
    let first: Vec<f64> = rx.try_iter().collect();
    run_simulation(cfg, Progress::with_sink(tx)).unwrap();
    let second: Vec<f64> = rx.iter().collect();

    for sent in [&first, &second] {
        assert_eq!(sent.len(), 3);
        assert!(sent.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(sent.last(), Some(&100.0));
    }
}

#[test]
fn oversized_grid_is_a_runtime_failure() {
    let mut cfg = config(ModelKind::MuResampling);
    cfg.bounds.step_size_mu = Some(1e-300);
    cfg.validate().unwrap();
    let result = run_simulation(cfg, Progress::new());
    assert!(matches!(result, Err(SimError::Runtime(_))));

    let mut cfg = config(ModelKind::ImpBiasResampling);
    cfg.bounds.step_size_imp_bias = Some(1e-300);
    cfg.validate().unwrap();
    let (tx, rx) = mpsc::channel();
    let result = run_simulation(cfg, Progress::with_sink(tx));
    assert!(matches!(result, Err(SimError::Runtime(_))));
    assert_eq!(rx.iter().count(), 0);

    let mut cfg = config(ModelKind::ImpBiasAnalytical);
    cfg.bounds.step_size_imp_bias = Some(1e-3);
    assert!(matches!(Engine::new(cfg), Err(SimError::Runtime(_))));
}

#[test]
fn cancelled_run_has_no_result() {
    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel();
    let progress = Progress::with_sink(tx).with_cancel(cancel.clone());
    cancel.cancel();

    let result = run_simulation(config(ModelKind::MuAnalytical), progress);
    assert!(matches!(result, Err(SimError::Cancelled)));
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn invalid_config_fails_before_computation() {
    let mut cfg = config(ModelKind::MuResampling);
    cfg.cv_i = None;

    let (tx, rx) = mpsc::channel();
    let result = run_simulation(cfg, Progress::with_sink(tx));
    assert!(matches!(result, Err(SimError::Config(_))));
    assert_eq!(rx.iter().count(), 0);

    let mut cfg = config(ModelKind::MuAnalytical);
    cfg.decision_limits = vec![7.0, 3.0];
    assert!(matches!(Engine::new(cfg), Err(SimError::Config(_))));
}
