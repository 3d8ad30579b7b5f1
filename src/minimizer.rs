//! # Minimizer Driver
//!
//! [`Minimizer`] owns an [`Objective`], a [`MinimizerEngine`] and the
//! [`MinimizerFcn`] adapter between them, and runs fit operations with a
//! fixed protocol:
//!
//! 1. synchronize the engine settings with the objective's parameters,
//! 2. select the engine algorithm,
//! 3. switch the objective's error log to collect mode and clear it,
//! 4. run the engine operation,
//! 5. restore print mode, copy the result back into the parameters,
//! 6. record the status under the operation's label.
//!
//! ```rust
//! use minopt_rs::engine::SimplexEngine;
//! use minopt_rs::models::PolynomialChi2;
//! use minopt_rs::{Minimizer, Objective};
//!
//! let x = vec![0.0, 1.0, 2.0, 3.0];
//! let y = vec![1.0, 3.0, 5.0, 7.0];
//! let model = PolynomialChi2::new(x, y, vec![0.1; 4], 1).unwrap();
//!
//! let mut minimizer = Minimizer::new(model, SimplexEngine::new());
//! assert_eq!(minimizer.migrad(), 0);
//!
//! let slope = minimizer.objective().parameters().get("c1").unwrap().value();
//! assert!((slope - 2.0).abs() < 1e-2);
//! ```

use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::engine::{FcnFunction, MinimizerEngine, MinimizerOptions};
use crate::error::{MinOptError, Result};
use crate::fcn::{EvalStrategy, FcnBinding, FcnConfig, MinimizerFcn, SyncReport};
use crate::objective::{ConstOptChange, EvalErrorMode, Objective};
use crate::parameters::Parameter;

/// Operations run per floating parameter before giving up
const CALLS_PER_DIM: usize = 500;

/// Persistent record of a fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub name: String,

    /// Status of the last operation
    pub status: i32,

    /// Every operation run, with its status
    pub status_history: Vec<(String, i32)>,

    pub min_fcn: f64,

    pub edm: f64,

    /// Evaluations that raised errors
    pub num_invalid_evaluations: usize,

    /// Floating parameters as they entered the fit
    pub initial_floating: Vec<(String, f64)>,

    /// Floating parameters after the fit, with errors
    pub final_floating: Vec<Parameter>,

    pub constants: Vec<Parameter>,

    pub covariance: Option<Array2<f64>>,
}

impl FitSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Fit driver tying an objective to a minimizer engine
pub struct Minimizer<O: Objective, E: MinimizerEngine> {
    objective: O,
    engine: E,
    fcn: MinimizerFcn,
    minimizer_type: String,
    status: i32,
    status_history: Vec<(String, i32)>,
    opt_const: bool,
    verbose: bool,
    profile: bool,
    print_level: i32,
}

impl<O: Objective, E: MinimizerEngine> Minimizer<O, E> {
    /// Create a driver using cached evaluation
    pub fn new(objective: O, engine: E) -> Self {
        Self::with_strategy(objective, engine, EvalStrategy::Cached)
    }

    /// Create a driver with an explicit evaluation strategy
    pub fn with_strategy(objective: O, engine: E, strategy: EvalStrategy) -> Self {
        Self::with_config(objective, engine, strategy, FcnConfig::default())
    }

    /// Create a driver with an explicit evaluation strategy and error policy
    ///
    /// Iteration and call limits are set to 500 per floating parameter, the
    /// tolerance to its default and the error level to the objective's. The
    /// engine settings are synchronized once before returning.
    pub fn with_config(
        objective: O,
        engine: E,
        strategy: EvalStrategy,
        config: FcnConfig,
    ) -> Self {
        let verbose = config.verbose;
        let fcn = MinimizerFcn::new(objective.parameters(), strategy, config);
        let minimizer_type = engine.config().minimizer_type.clone();
        let n_dim = fcn.n_dim();

        let mut minimizer = Self {
            objective,
            engine,
            fcn,
            minimizer_type,
            status: 0,
            status_history: Vec::new(),
            opt_const: false,
            verbose,
            profile: false,
            print_level: 1,
        };

        let minimizer_type = minimizer.minimizer_type.clone();
        minimizer
            .engine
            .config_mut()
            .set_minimizer(&minimizer_type, None);
        minimizer.set_max_iterations(CALLS_PER_DIM * n_dim);
        minimizer.set_max_function_calls(CALLS_PER_DIM * n_dim);
        minimizer.set_eps(MinimizerOptions::DEFAULT_TOLERANCE);
        minimizer.set_print_level(-1);
        let error_level = minimizer.objective.default_error_level();
        minimizer.set_error_level(error_level);

        if let Err(e) = minimizer.synchronize() {
            warn!("initial synchronization failed: {}", e);
        }

        if minimizer.objective.is_silent() {
            minimizer.set_print_level(-1);
        } else {
            minimizer.set_print_level(1);
        }
        minimizer
    }

    /// Bring the engine settings in line with the objective's parameters
    pub fn synchronize(&mut self) -> Result<SyncReport> {
        let report = self.fcn.synchronize(
            self.engine.config().params_settings(),
            &mut self.objective,
            self.opt_const,
            self.verbose,
        );
        self.engine
            .config_mut()
            .params_settings_mut()
            .apply(&report.changes)?;
        Ok(report)
    }

    /// Minimize with the variable-metric algorithm
    pub fn migrad(&mut self) -> i32 {
        let minimizer_type = self.minimizer_type.clone();
        self.execute("MIGRAD", &minimizer_type, Some("migrad"), |engine, fcn| {
            engine.fit_fcn(fcn)
        })
    }

    /// Minimize, then look for a better minimum nearby
    pub fn improve(&mut self) -> i32 {
        let minimizer_type = self.minimizer_type.clone();
        self.execute(
            "IMPROVE",
            &minimizer_type,
            Some("migradimproved"),
            |engine, fcn| engine.fit_fcn(fcn),
        )
    }

    /// Compute parabolic errors at the current parameter values
    ///
    /// Requires a previous minimization; returns -1 otherwise.
    pub fn hesse(&mut self) -> i32 {
        if !self.engine.has_minimizer() {
            warn!("hesse: run a minimization before Hesse");
            self.status = -1;
            return self.status;
        }
        let minimizer_type = self.minimizer_type.clone();
        self.execute("HESSE", &minimizer_type, None, |engine, fcn| {
            engine.calculate_hess_errors(fcn)
        })
    }

    /// Compute asymmetric errors for all floating parameters
    ///
    /// Requires a previous minimization; returns -1 otherwise.
    pub fn minos(&mut self) -> i32 {
        if !self.engine.has_minimizer() {
            warn!("minos: run a minimization before Minos");
            self.status = -1;
            return self.status;
        }
        self.engine.config_mut().set_minos_errors(Vec::new());
        let minimizer_type = self.minimizer_type.clone();
        self.execute("MINOS", &minimizer_type, None, |engine, fcn| {
            engine.calculate_minos_errors(fcn)
        })
    }

    /// Compute asymmetric errors for the named parameters only
    ///
    /// Names that are not floating parameters are skipped. If none remain, no
    /// errors are computed and the status is left unchanged, but the result
    /// is still copied back and recorded.
    pub fn minos_subset(&mut self, names: &[&str]) -> i32 {
        if !self.engine.has_minimizer() {
            warn!("minos: run a minimization before Minos");
            self.status = -1;
            return self.status;
        }
        if names.is_empty() {
            return self.status;
        }

        if let Err(e) = self.synchronize() {
            warn!("MINOS: synchronization failed: {}", e);
            return self.record("MINOS", -1);
        }
        let timer = self.start_operation();

        let params = self.objective.parameters();
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|name| {
                let index = self.fcn.float_index(name)?;
                let par = params.get(name)?;
                (!par.is_constant()).then_some(index)
            })
            .collect();

        let mut status = self.status;
        if !indices.is_empty() {
            let minimizer_type = self.minimizer_type.clone();
            let config = self.engine.config_mut();
            config.set_minos_errors(indices);
            config.set_minimizer(&minimizer_type, None);

            let ret = {
                let mut binding = FcnBinding::new(&mut self.fcn, &mut self.objective);
                self.engine.calculate_minos_errors(&mut binding)
            };
            status = self.status_of(ret);
        }

        self.finish_operation("MINOS", status, timer)
    }

    /// Minimize with an explicitly chosen engine family and algorithm
    pub fn minimize(&mut self, minimizer_type: &str, algorithm: Option<&str>) -> i32 {
        self.execute("MINIMIZE", minimizer_type, algorithm, |engine, fcn| {
            engine.fit_fcn(fcn)
        })
    }

    /// Estimated distance to the minimum of the last operation
    pub fn edm(&self) -> Result<f64> {
        self.engine
            .result()
            .map(|r| r.edm)
            .ok_or_else(|| MinOptError::NoFitPerformed("edm".to_string()))
    }

    fn execute<F>(
        &mut self,
        label: &str,
        minimizer_type: &str,
        algorithm: Option<&str>,
        op: F,
    ) -> i32
    where
        F: FnOnce(&mut E, &mut dyn FcnFunction) -> bool,
    {
        if let Err(e) = self.synchronize() {
            warn!("{}: synchronization failed: {}", label, e);
            return self.record(label, -1);
        }
        self.engine
            .config_mut()
            .set_minimizer(minimizer_type, algorithm);

        let timer = self.start_operation();
        let ret = {
            let mut binding = FcnBinding::new(&mut self.fcn, &mut self.objective);
            op(&mut self.engine, &mut binding)
        };
        let status = self.status_of(ret);
        self.finish_operation(label, status, timer)
    }

    fn start_operation(&mut self) -> Option<Instant> {
        let errors = self.objective.eval_errors_mut();
        errors.set_mode(EvalErrorMode::CollectErrors);
        errors.clear();
        self.profile.then(Instant::now)
    }

    fn status_of(&self, ret: bool) -> i32 {
        match (ret, self.engine.result()) {
            (true, Some(result)) => result.status,
            _ => -1,
        }
    }

    fn finish_operation(&mut self, label: &str, status: i32, timer: Option<Instant>) -> i32 {
        self.objective
            .eval_errors_mut()
            .set_mode(EvalErrorMode::PrintErrors);
        if let Some(start) = timer {
            info!("{}: elapsed time {:.3?}", label, start.elapsed());
        }
        if let Some(result) = self.engine.result() {
            self.fcn.back_prop(&mut self.objective, result);
        }
        if let Err(e) = self.fcn.flush_log() {
            warn!("failed to flush evaluation log: {}", e);
        }
        self.record(label, status)
    }

    fn record(&mut self, label: &str, status: i32) -> i32 {
        self.status = status;
        self.status_history.push((label.to_string(), status));
        status
    }

    /// Status of the last operation
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Labels and statuses of all operations run so far
    pub fn status_history(&self) -> &[(String, i32)] {
        &self.status_history
    }

    /// Engine family used by the named operations
    pub fn minimizer_type(&self) -> &str {
        &self.minimizer_type
    }

    pub fn set_minimizer_type(&mut self, minimizer_type: &str) {
        self.minimizer_type = minimizer_type.to_string();
    }

    pub fn set_strategy(&mut self, strategy: i32) {
        self.engine.config_mut().options.strategy = strategy;
    }

    pub fn set_eps(&mut self, eps: f64) {
        self.engine.config_mut().options.tolerance = eps;
    }

    pub fn set_max_iterations(&mut self, n: usize) {
        self.engine.config_mut().options.max_iterations = n;
    }

    pub fn set_max_function_calls(&mut self, n: usize) {
        self.engine.config_mut().options.max_function_calls = n;
    }

    /// Objective change defining one standard deviation
    pub fn set_error_level(&mut self, level: f64) {
        self.engine.config_mut().options.error_def = level;
    }

    /// Set the engine verbosity, returning the previous level
    ///
    /// Levels are offset by one internally: -1 is silent.
    pub fn set_print_level(&mut self, level: i32) -> i32 {
        let previous = self.print_level;
        self.print_level = level + 1;
        self.engine.config_mut().options.print_level = self.print_level;
        previous
    }

    /// Switch constant-term optimization in the objective on or off
    pub fn optimize_const(&mut self, flag: bool) {
        if self.opt_const == flag {
            info!("constant-term optimization already {}", if flag { "on" } else { "off" });
            return;
        }
        let change = if flag {
            ConstOptChange::Activate
        } else {
            ConstOptChange::Deactivate
        };
        let previous = self
            .objective
            .eval_errors_mut()
            .set_mode(EvalErrorMode::CollectErrors);
        self.objective.const_optimize(change);
        self.objective.eval_errors_mut().set_mode(previous);
        self.opt_const = flag;
    }

    /// Return the largest valid value seen for invalid evaluations
    pub fn set_eval_error_wall(&mut self, flag: bool) {
        self.fcn.config_mut().error_wall = flag;
    }

    /// Report at most `n` collected errors per invalid evaluation; negative
    /// values turn reporting off
    pub fn set_print_eval_errors(&mut self, n: i32) {
        let config = self.fcn.config_mut();
        config.report_errors = n >= 0;
        config.max_reported_errors = n.max(0) as usize;
    }

    pub fn set_verbose(&mut self, flag: bool) {
        self.verbose = flag;
        self.fcn.config_mut().verbose = flag;
    }

    /// Log the wall-clock time of each operation
    pub fn set_profile(&mut self, flag: bool) {
        self.profile = flag;
    }

    /// Log every evaluation to a file, or stop logging with `None`
    pub fn set_log_file<P: AsRef<Path>>(&mut self, path: Option<P>) -> Result<()> {
        self.fcn.set_log_file(path)
    }

    pub fn num_invalid_evaluations(&self) -> usize {
        self.fcn.num_invalid_evaluations()
    }

    /// Total number of objective evaluations
    pub fn eval_count(&self) -> usize {
        self.fcn.eval_count()
    }

    /// Reset the evaluation and invalid-evaluation counters
    pub fn zero_eval_count(&mut self) {
        self.fcn.reset_counters();
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn objective_mut(&mut self) -> &mut O {
        &mut self.objective
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn fcn(&self) -> &MinimizerFcn {
        &self.fcn
    }

    pub fn fcn_mut(&mut self) -> &mut MinimizerFcn {
        &mut self.fcn
    }

    /// Give back the objective and engine
    pub fn into_parts(self) -> (O, E) {
        (self.objective, self.engine)
    }

    /// Snapshot of the fit for persistence
    pub fn save(&self, name: &str) -> Result<FitSummary> {
        let result = self
            .engine
            .result()
            .ok_or_else(|| MinOptError::NoFitPerformed("save".to_string()))?;
        let params = self.objective.parameters();

        Ok(FitSummary {
            name: name.to_string(),
            status: self.status,
            status_history: self.status_history.clone(),
            min_fcn: result.min_fcn,
            edm: result.edm,
            num_invalid_evaluations: self.fcn.num_invalid_evaluations(),
            initial_floating: self.fcn.initial_float_values(),
            final_floating: self
                .fcn
                .float_names()
                .iter()
                .filter_map(|n| params.get(n).cloned())
                .collect(),
            constants: self
                .fcn
                .const_names()
                .iter()
                .filter_map(|n| params.get(n).cloned())
                .collect(),
            covariance: result.covariance.clone(),
        })
    }
}
