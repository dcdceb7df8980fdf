use crate::classify::DecisionLimits;
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::grid::{GridPoint, build_grid};
use crate::model::{Kernel, Perturbation};
use crate::progress::Progress;
use crate::report::{SimulationPoint, SimulationResult};
use crate::stats::Tally;
use rand::prelude::*;
use rand::seq::index;
use rand_chacha::ChaCha12Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// ChaCha stream reserved for drawing the subsample.
///
/// Data point `i` uses stream `i`, so this never collides.
const SAMPLE_STREAM: u64 = u64::MAX;

/// Simulation engine.
///
/// Holds the validated configuration, the (sub)sampled dataset and the
/// parameter grid of a single run. The engine keeps no state between runs.
pub struct Engine {
    cfg: SimulationConfig,
    limits: DecisionLimits,
    perturbation: Perturbation,
    data: Vec<f64>,
    grid: Vec<GridPoint>,
    seed: u64,
}

impl Engine {
    /// Validate `cfg` and prepare the grid and dataset of a run.
    ///
    /// # Errors
    /// Returns [`SimError::Config`] for an invalid configuration and
    /// [`SimError::Runtime`] if the grid or trial volume is too large or no
    /// seed can be drawn.
    pub fn new(cfg: SimulationConfig) -> SimResult<Self> {
        cfg.validate()?;

        if !cfg.model.is_resampling() && cfg.cv_i.is_some() {
            log::warn!("ignoring biological variation with an analytical model");
        }

        let grid = build_grid(&cfg)?;

        let seed = match cfg.seed {
            Some(seed) => seed,
            None => {
                let mut os_rng = ChaCha12Rng::try_from_os_rng()
                    .map_err(|error| SimError::Runtime(format!("failed to seed rng: {error}")))?;
                // Kept within the integer range of the config file.
                os_rng.next_u64() >> 1
            }
        };

        let data = select_sample(&cfg.data, cfg.sample_size, seed);

        let volume = (grid.len() as u64)
            .checked_mul(data.len() as u64)
            .and_then(|volume| volume.checked_mul(cfg.trials as u64));
        if volume.is_none() {
            return Err(SimError::Runtime("trial volume overflows".to_string()));
        }

        let limits = DecisionLimits::new(&cfg.decision_limits);
        let perturbation = Perturbation::from_config(&cfg);

        log::debug!("{cfg:#?}");

        Ok(Self {
            cfg,
            limits,
            perturbation,
            data,
            grid,
            seed,
        })
    }

    pub fn cfg(&self) -> &SimulationConfig {
        &self.cfg
    }

    /// Grid points in evaluation order.
    pub fn grid(&self) -> &[GridPoint] {
        &self.grid
    }

    /// Data points evaluated at every grid point.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run the sweep over every grid point.
    ///
    /// Grid points are visited in order and `progress` advances after each.
    /// The reporter, and with it its sink, is dropped when the run ends.
    ///
    /// # Errors
    /// Returns [`SimError::Cancelled`] if cancellation was requested. No
    /// partial result is produced.
    pub fn run(&self, mut progress: Progress) -> SimResult<SimulationResult> {
        log::info!(
            "simulating {} over {} grid points, {} data points, {} trials (seed {})",
            self.cfg.model.description(),
            self.grid.len(),
            self.data.len(),
            self.cfg.trials,
            self.seed
        );

        progress.start(self.grid.len());

        let mut points = Vec::with_capacity(self.grid.len());
        for &point in &self.grid {
            if progress.is_cancelled() {
                log::warn!("cancelled after {} grid points", progress.completed());
                return Err(SimError::Cancelled);
            }

            let tally = self.simulate_point(point);
            points.push(SimulationPoint::from_tally(
                point,
                &tally,
                &self.cfg.thresholds,
            ));

            progress.advance();
        }

        log::info!("completed simulation");

        Ok(SimulationResult {
            points,
            names: self.limits.names(self.cfg.decimal_places),
            seed: self.seed,
        })
    }

    fn simulate_point(&self, point: GridPoint) -> Tally {
        let kernel = self.perturbation.kernel(point);
        let n_limits = self.limits.len();

        #[cfg(feature = "parallel")]
        let tally = self
            .data
            .par_iter()
            .enumerate()
            .fold(
                || Tally::new(n_limits),
                |tally, (i_val, &val)| self.simulate_value(tally, &kernel, i_val, val),
            )
            .reduce(|| Tally::new(n_limits), Tally::merge);

        #[cfg(not(feature = "parallel"))]
        let tally = self
            .data
            .iter()
            .enumerate()
            .fold(Tally::new(n_limits), |tally, (i_val, &val)| {
                self.simulate_value(tally, &kernel, i_val, val)
            });

        tally
    }

    fn simulate_value(&self, mut tally: Tally, kernel: &Kernel, i_val: usize, val: f64) -> Tally {
        // Every grid point replays the same deviates for a given data point.
        let mut rng = ChaCha12Rng::seed_from_u64(self.seed);
        rng.set_stream(i_val as u64);

        for _ in 0..self.cfg.trials {
            let simulated = kernel.sample(val, &mut rng);
            tally.add(&self.limits, val, simulated);
        }
        tally
    }
}

/// Draw `sample_size` distinct data points, kept in dataset order.
fn select_sample(data: &[f64], sample_size: Option<usize>, seed: u64) -> Vec<f64> {
    match sample_size {
        Some(sample_size) if sample_size < data.len() => {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            rng.set_stream(SAMPLE_STREAM);
            let mut i_vals = index::sample(&mut rng, data.len(), sample_size).into_vec();
            i_vals.sort_unstable();
            i_vals.into_iter().map(|i_val| data[i_val]).collect()
        }
        Some(_) => {
            log::warn!("sample size covers the whole dataset, using every data point");
            data.to_vec()
        }
        None => data.to_vec(),
    }
}

/// Run a complete simulation.
///
/// This is the single entry point of the core: validation, grid
/// construction, the Monte Carlo sweep and aggregation.
///
/// # Errors
/// See [`Engine::new`] and [`Engine::run`].
pub fn run_simulation(cfg: SimulationConfig, progress: Progress) -> SimResult<SimulationResult> {
    Engine::new(cfg)?.run(progress)
}
