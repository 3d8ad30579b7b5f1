//! # Minimizer Function Adapter
//!
//! [`MinimizerFcn`] sits between an [`Objective`] with named parameters and a
//! [`MinimizerEngine`](crate::engine::MinimizerEngine) that only sees a
//! coordinate vector. It keeps
//!
//! - the list of floating parameters, whose order defines the coordinates,
//! - the list of constant parameters, watched for release or value changes,
//! - an evaluation cache of parameter positions and last written values,
//! - the running maximum and invalid-evaluation counter of the error wall,
//! - an optional per-evaluation log sink.
//!
//! Synchronization lives in [`sync`], evaluation and back-propagation of fit
//! results in [`eval`].

pub mod eval;
pub mod sync;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::objective::Objective;
use crate::parameters::{Parameter, Parameters};

pub use eval::FcnBinding;
pub use sync::{default_step_size, SyncReport};

/// Initial value of the running maximum
pub const MAX_FCN_START: f64 = -1e30;

/// How coordinates are written into the objective's parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvalStrategy {
    /// Look each floating parameter up by name and compare with its value
    Generic,

    /// Use cached positions and last written values
    #[default]
    Cached,
}

/// Evaluation behavior of a [`MinimizerFcn`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcnConfig {
    /// Report invalid evaluations through the log. Default: true
    pub report_errors: bool,

    /// Maximum number of collected errors shown per report. Default: 10
    pub max_reported_errors: usize,

    /// Replace invalid evaluations by the largest valid value seen. Default: true
    pub error_wall: bool,

    /// Log parameter changes and objective values. Default: false
    pub verbose: bool,
}

impl Default for FcnConfig {
    fn default() -> Self {
        Self {
            report_errors: true,
            max_reported_errors: 10,
            error_wall: true,
            verbose: false,
        }
    }
}

impl FcnConfig {
    pub fn with_report_errors(mut self, report_errors: bool) -> Self {
        self.report_errors = report_errors;
        self
    }

    pub fn with_max_reported_errors(mut self, max_reported_errors: usize) -> Self {
        self.max_reported_errors = max_reported_errors;
        self
    }

    pub fn with_error_wall(mut self, error_wall: bool) -> Self {
        self.error_wall = error_wall;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Name and value of a parameter at a point in time
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParamSnapshot {
    pub(crate) name: String,
    pub(crate) value: f64,
}

impl ParamSnapshot {
    pub(crate) fn of(par: &Parameter) -> Self {
        Self {
            name: par.name().to_string(),
            value: par.value(),
        }
    }
}

/// Positions and last written values of the floating parameters
#[derive(Debug, Clone, Default)]
pub(crate) struct EvaluationCache {
    pub(crate) positions: Vec<Option<usize>>,
    pub(crate) values: Vec<f64>,
}

/// Adapter presenting an objective to a minimizer engine
pub struct MinimizerFcn {
    strategy: EvalStrategy,
    config: FcnConfig,
    pub(crate) float_params: Vec<String>,
    pub(crate) const_params: Vec<String>,
    pub(crate) init_float: Vec<ParamSnapshot>,
    pub(crate) init_const: Vec<ParamSnapshot>,
    pub(crate) cache: EvaluationCache,
    pub(crate) max_fcn: f64,
    pub(crate) num_bad_evaluations: usize,
    pub(crate) eval_count: usize,
    pub(crate) log_sink: Option<Box<dyn Write>>,
}

impl MinimizerFcn {
    /// Split `params` into floating and constant lists and build the cache
    pub fn new(params: &Parameters, strategy: EvalStrategy, config: FcnConfig) -> Self {
        let float_params: Vec<String> = params
            .floating()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let const_params: Vec<String> = params
            .constants()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let init_float = params
            .floating()
            .into_iter()
            .map(ParamSnapshot::of)
            .collect();
        let init_const = params
            .constants()
            .into_iter()
            .map(ParamSnapshot::of)
            .collect();

        let mut fcn = Self {
            strategy,
            config,
            float_params,
            const_params,
            init_float,
            init_const,
            cache: EvaluationCache::default(),
            max_fcn: MAX_FCN_START,
            num_bad_evaluations: 0,
            eval_count: 0,
            log_sink: None,
        };
        fcn.rebuild_cache(params);
        fcn
    }

    /// Adapter over `objective`'s parameters with the default configuration
    pub fn for_objective<O: Objective + ?Sized>(objective: &O) -> Self {
        Self::new(
            objective.parameters(),
            EvalStrategy::default(),
            FcnConfig::default(),
        )
    }

    /// Number of coordinates, the length of the floating list
    pub fn n_dim(&self) -> usize {
        self.float_params.len()
    }

    pub fn strategy(&self) -> EvalStrategy {
        self.strategy
    }

    pub fn config(&self) -> &FcnConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FcnConfig {
        &mut self.config
    }

    /// Names of the floating parameters, in coordinate order
    pub fn float_names(&self) -> &[String] {
        &self.float_params
    }

    /// Names of the constant parameters
    pub fn const_names(&self) -> &[String] {
        &self.const_params
    }

    /// Coordinate of a floating parameter
    pub fn float_index(&self, name: &str) -> Option<usize> {
        self.float_params.iter().position(|n| n == name)
    }

    /// Values the floating parameters had when they entered the floating list
    pub fn initial_float_values(&self) -> Vec<(String, f64)> {
        self.init_float
            .iter()
            .map(|s| (s.name.clone(), s.value))
            .collect()
    }

    /// Last values written through the cache, in coordinate order
    pub fn cached_values(&self) -> &[f64] {
        &self.cache.values
    }

    /// Largest valid objective value seen
    pub fn max_fcn(&self) -> f64 {
        self.max_fcn
    }

    /// Forget the running maximum
    pub fn reset_running_maximum(&mut self) {
        self.max_fcn = MAX_FCN_START;
    }

    /// Number of evaluations that raised errors
    pub fn num_invalid_evaluations(&self) -> usize {
        self.num_bad_evaluations
    }

    /// Total number of evaluations
    pub fn eval_count(&self) -> usize {
        self.eval_count
    }

    /// Reset the evaluation and invalid-evaluation counters
    pub fn reset_counters(&mut self) {
        self.eval_count = 0;
        self.num_bad_evaluations = 0;
    }

    /// Log every evaluation to `sink`, replacing any previous sink
    pub fn set_log_sink(&mut self, sink: Option<Box<dyn Write>>) {
        if let Some(mut previous) = self.log_sink.take() {
            let _ = previous.flush();
        }
        self.log_sink = sink;
    }

    /// Log every evaluation to a file, or stop logging with `None`
    pub fn set_log_file<P: AsRef<Path>>(&mut self, path: Option<P>) -> Result<()> {
        match path {
            Some(path) => {
                let file = File::create(path.as_ref())?;
                info!("logging objective evaluations to {}", path.as_ref().display());
                self.set_log_sink(Some(Box::new(BufWriter::new(file))));
            }
            None => self.set_log_sink(None),
        }
        Ok(())
    }

    /// Whether evaluations are being logged
    pub fn is_logging(&self) -> bool {
        self.log_sink.is_some()
    }

    /// Flush the log sink, if any
    pub fn flush_log(&mut self) -> Result<()> {
        if let Some(sink) = self.log_sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl Drop for MinimizerFcn {
    fn drop(&mut self) {
        if let Some(sink) = self.log_sink.as_mut() {
            let _ = sink.flush();
        }
    }
}
