use crate::data::load_column;
use crate::error::{SimError, SimResult};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Hard cap on the measurement-uncertainty / imprecision axis (percent).
pub const MU_CAP: f64 = 33.3;
/// Hard cap on the bias axis (percent).
pub const BIAS_CAP: f64 = 100.0;

/// Default end of the measurement-uncertainty axis (percent).
pub const DEFAULT_MAX_MU: f64 = 33.1;
/// Default step of the measurement-uncertainty axis (percent).
pub const DEFAULT_STEP_SIZE_MU: f64 = 0.1;
/// Default end of the imprecision axis (percent).
pub const DEFAULT_MAX_IMPRECISION: f64 = 33.3;
/// Default end of the bias axis, applied symmetrically (percent).
pub const DEFAULT_MAX_BIAS: f64 = 35.0;
/// Default step shared by the imprecision and bias axes (percent).
pub const DEFAULT_STEP_SIZE_IMP_BIAS: f64 = 1.0;

/// Maximum number of clinical decision limits.
pub const MAX_DECISION_LIMITS: usize = 7;

/// Default number of simulated results per data point and grid point.
pub const DEFAULT_TRIALS: usize = 10;
/// Maximum number of simulated results per data point and grid point.
pub const MAX_TRIALS: usize = 10_000;

/// Error model evaluated by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Measurement uncertainty, single analytical rerun.
    MuAnalytical,
    /// Measurement uncertainty, resampling with biological variation.
    MuResampling,
    /// Imprecision and bias, single analytical rerun.
    ImpBiasAnalytical,
    /// Imprecision and bias, resampling with biological variation.
    ImpBiasResampling,
}

impl ModelKind {
    /// Whether the model convolves the analytical noise with biological variation.
    pub fn is_resampling(self) -> bool {
        matches!(self, Self::MuResampling | Self::ImpBiasResampling)
    }

    /// Whether the grid has a bias axis.
    pub fn has_bias(self) -> bool {
        matches!(self, Self::ImpBiasAnalytical | Self::ImpBiasResampling)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::MuAnalytical => "measurement uncertainty, analytical rerun",
            Self::MuResampling => "measurement uncertainty, resampling",
            Self::ImpBiasAnalytical => "imprecision and bias, analytical rerun",
            Self::ImpBiasResampling => "imprecision and bias, resampling",
        }
    }
}

/// Agreement thresholds, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum acceptable agreement.
    pub min: f64,
    /// Desirable agreement.
    pub des: f64,
    /// Optimal agreement.
    pub opt: f64,
}

/// Optional overrides of the grid boundaries, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub max_mu: Option<f64>,
    pub step_size_mu: Option<f64>,
    pub max_imprecision: Option<f64>,
    pub max_bias: Option<f64>,
    pub step_size_imp_bias: Option<f64>,
}

impl Bounds {
    pub fn max_mu(&self) -> f64 {
        self.max_mu.unwrap_or(DEFAULT_MAX_MU)
    }

    pub fn step_size_mu(&self) -> f64 {
        self.step_size_mu.unwrap_or(DEFAULT_STEP_SIZE_MU)
    }

    pub fn max_imprecision(&self) -> f64 {
        self.max_imprecision.unwrap_or(DEFAULT_MAX_IMPRECISION)
    }

    pub fn max_bias(&self) -> f64 {
        self.max_bias.unwrap_or(DEFAULT_MAX_BIAS)
    }

    pub fn step_size_imp_bias(&self) -> f64 {
        self.step_size_imp_bias.unwrap_or(DEFAULT_STEP_SIZE_IMP_BIAS)
    }
}

/// Simulation configuration parameters.
///
/// Immutable input of a single run. Magnitudes (`cv_i` and every [`Bounds`]
/// field) are expressed in percent. See [`SimulationConfig::validate`] for the
/// accepted ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Error model variant.
    pub model: ModelKind,
    /// Measurand values.
    #[serde(default)]
    pub data: Vec<f64>,
    /// Clinical decision limits, strictly ascending.
    pub decision_limits: Vec<f64>,
    /// Precision of the decision-limit labels.
    #[serde(default)]
    pub decimal_places: u32,
    /// Agreement thresholds.
    pub thresholds: Thresholds,
    /// Within-subject biological variation (percent), used by resampling models.
    #[serde(default)]
    pub cv_i: Option<f64>,
    /// Number of data points drawn from the dataset.
    #[serde(default)]
    pub sample_size: Option<usize>,
    /// Grid boundary overrides.
    #[serde(default)]
    pub bounds: Bounds,
    /// Monte Carlo trials per data point and grid point.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Seed of the random source; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

/// Location of a dataset column on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// CSV file, relative to the configuration file's directory.
    pub file: String,
    /// Header of the column holding the measurand values.
    pub column: String,
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    sim: SimulationConfig,
    dataset: Option<DataSource>,
}

impl SimulationConfig {
    /// Load a [`SimulationConfig`] from a TOML file.
    ///
    /// The dataset is either inlined as `data` or read from the
    /// `[dataset]` table. Performs validation before returning.
    ///
    /// # Errors
    /// Returns an error if the file or the dataset cannot be read or
    /// deserialized, or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let ConfigFile { mut sim, dataset } =
            toml::from_str(&contents).context("failed to deserialize config")?;

        if let Some(source) = dataset {
            if !sim.data.is_empty() {
                bail!("dataset must be given either inline or as a file, not both");
            }
            let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
            let data_file = base_dir.join(&source.file);
            sim.data = load_column(&data_file, &source.column)
                .with_context(|| format!("failed to load column {:?}", source.column))?;
        }

        sim.validate().context("failed to validate config")?;

        Ok(sim)
    }

    /// Check every parameter, in order, before any computation starts.
    ///
    /// # Errors
    /// Returns [`SimError::Config`] describing the first rejected parameter.
    pub fn validate(&self) -> SimResult<()> {
        self.check()
            .map_err(|error| SimError::Config(format!("{error:#}")))
    }

    fn check(&self) -> Result<()> {
        if self.data.is_empty() {
            bail!("dataset must not be empty");
        }
        check_finite(&self.data).context("invalid dataset")?;

        check_num(self.decision_limits.len(), 1..=MAX_DECISION_LIMITS)
            .context("invalid number of decision limits")?;
        check_finite(&self.decision_limits).context("invalid decision limits")?;
        check_ascending(&self.decision_limits).context("invalid decision limits")?;

        check_num(self.thresholds.min, 0.0..=100.0).context("invalid minimum threshold")?;
        check_num(self.thresholds.des, 0.0..=100.0).context("invalid desirable threshold")?;
        check_num(self.thresholds.opt, 0.0..=100.0).context("invalid optimal threshold")?;
        let Thresholds { min, des, opt } = self.thresholds;
        if !(min <= des && des <= opt) {
            bail!("thresholds must satisfy min <= des <= opt, but are {min}, {des}, {opt}");
        }

        if let Some(sample_size) = self.sample_size {
            check_num(sample_size, 1..=self.data.len()).context("invalid sample size")?;
        }

        if self.model.is_resampling() {
            let cv_i = self
                .cv_i
                .context("biological variation is required by resampling models")?;
            check_positive(cv_i).context("invalid biological variation")?;
        }

        check_num(self.trials, 1..=MAX_TRIALS).context("invalid number of trials")?;

        self.check_bounds().context("invalid grid bounds")?;

        Ok(())
    }

    fn check_bounds(&self) -> Result<()> {
        let bounds = &self.bounds;
        if let Some(max_mu) = bounds.max_mu {
            check_positive(max_mu).context("invalid maximum measurement uncertainty")?;
            check_num(max_mu, ..=MU_CAP).context("invalid maximum measurement uncertainty")?;
        }
        if let Some(max_imprecision) = bounds.max_imprecision {
            check_positive(max_imprecision).context("invalid maximum imprecision")?;
            check_num(max_imprecision, ..=MU_CAP).context("invalid maximum imprecision")?;
        }
        if let Some(max_bias) = bounds.max_bias {
            check_positive(max_bias).context("invalid maximum bias")?;
            check_num(max_bias, ..=BIAS_CAP).context("invalid maximum bias")?;
        }
        if let Some(step) = bounds.step_size_mu {
            check_positive(step).context("invalid measurement uncertainty step size")?;
        }
        if let Some(step) = bounds.step_size_imp_bias {
            check_positive(step).context("invalid imprecision and bias step size")?;
        }
        Ok(())
    }

    /// Biological variation as a fraction, when the model uses it.
    pub fn cv_i_fraction(&self) -> Option<f64> {
        if self.model.is_resampling() {
            self.cv_i.map(|cv_i| cv_i / 100.0)
        } else {
            None
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_positive(num: f64) -> Result<()> {
    if !(num > 0.0 && num.is_finite()) {
        bail!("number must be positive and finite, but is {num:?}");
    }
    Ok(())
}

fn check_finite(vec: &[f64]) -> Result<()> {
    if let Some(i_ele) = vec.iter().position(|ele| !ele.is_finite()) {
        bail!("element {i_ele} must be finite, but is {:?}", vec[i_ele]);
    }
    Ok(())
}

fn check_ascending(vec: &[f64]) -> Result<()> {
    if let Some(i_ele) = vec.windows(2).position(|pair| pair[0] >= pair[1]) {
        bail!(
            "values must be strictly ascending, but {:?} is followed by {:?}",
            vec[i_ele],
            vec[i_ele + 1]
        );
    }
    Ok(())
}
