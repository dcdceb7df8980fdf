use crate::analysis::aps_report;
use crate::config::SimulationConfig;
use crate::data::write_points_csv;
use crate::engine::Engine;
use crate::progress::Progress;
use crate::report::SimulationResult;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

/// Simulation directory: a `config.toml` plus one `run-NNNN` directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: SimulationConfig,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = SimulationConfig::from_file(sim_dir.join("config.toml"))
            .context("failed to construct cfg")?;
        log::info!(
            "loaded config: {}, {} data points, decision limits {:?}",
            cfg.model.description(),
            cfg.data.len(),
            cfg.decision_limits
        );

        Ok(Self { sim_dir, cfg })
    }

    pub fn cfg(&self) -> &SimulationConfig {
        &self.cfg
    }

    /// Run a new simulation and save its results in a new run directory.
    pub fn run_simulation(&self) -> Result<PathBuf> {
        let engine = Engine::new(self.cfg.clone()).context("failed to construct engine")?;

        let (tx, rx) = mpsc::channel::<f64>();
        let listener = thread::spawn(move || {
            let mut last_logged = -1.0;
            for pct in rx {
                if pct.floor() > last_logged {
                    last_logged = pct.floor();
                    log::info!("completed {pct:06.2}%");
                }
            }
        });

        let result = engine.run(Progress::with_sink(tx));
        if listener.join().is_err() {
            log::warn!("progress listener panicked");
        }
        let result = result.context("failed to run simulation")?;

        // Only finished runs get a directory.
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;
        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        if let Err(error) = self.save_run(run_idx, &result) {
            fs::remove_dir_all(&run_dir).ok();
            return Err(error);
        }

        Ok(run_dir)
    }

    fn save_run(&self, run_idx: usize, result: &SimulationResult) -> Result<()> {
        self.save_results(result, self.results_file(run_idx))
            .context("failed to save results")?;

        let points_file = self.points_file(run_idx);
        write_points_csv(&points_file, result)
            .with_context(|| format!("failed to write {points_file:?}"))?;
        log::info!("saved {points_file:?}");

        Ok(())
    }

    /// Look up the performance specifications of every run.
    pub fn run_analysis(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let result = self
                .load_results(self.results_file(run_idx))
                .context("failed to load results")?;

            let report = aps_report(&result, self.cfg.model, &self.cfg.thresholds);
            for limit in &report.limits {
                log::info!("run {run_idx:04}: {limit:?}");
            }

            let analysis_file = self.analysis_file(run_idx);
            let contents = toml::to_string_pretty(&report).context("failed to serialize report")?;
            fs::write(&analysis_file, contents)
                .with_context(|| format!("failed to write {analysis_file:?}"))?;
            log::info!("saved {analysis_file:?}");
        }

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_runs(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn save_results<P: AsRef<Path>>(&self, result: &SimulationResult, file: P) -> Result<()> {
        let file = file.as_ref();
        let handle = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(handle);
        encode::write(&mut writer, result).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("saved {file:?}");
        Ok(())
    }

    fn load_results<P: AsRef<Path>>(&self, file: P) -> Result<SimulationResult> {
        let file = file.as_ref();
        let handle = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(handle);
        let result = decode::from_read(&mut reader).context("failed to deserialize results")?;
        Ok(result)
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }

    fn points_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("points.csv")
    }

    fn analysis_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("analysis.toml")
    }
}
