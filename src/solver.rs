//! The solver bridge (§6.4, §9): the LP text produced by [`crate::lp`] is
//! handed to an external MILP solver as an opaque, potentially
//! long-running call, and interpreted back into a status plus a
//! variable-value map. Callers may abandon an in-flight solve;
//! nothing here holds state beyond the call itself (§5).

use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct SolverResult {
    pub status: Option<SolverStatus>,
    pub variable_values: HashMap<String, f64>,
}

impl SolverResult {
    pub fn optimal(variable_values: HashMap<String, f64>) -> Self {
        Self { status: Some(SolverStatus::Optimal), variable_values }
    }

    pub fn status(&self) -> SolverStatus {
        self.status.unwrap_or(SolverStatus::Other)
    }
}

#[derive(Debug, Error)]
pub enum SolverBridgeError {
    #[error("failed to stage LP text for the solver: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver produced an unparseable result line: `{0}`")]
    BadOutput(String),
}

/// Presents LP text to a solver and interprets its result. Implementations
/// may be in-process or out-of-process; this core treats the call as a
/// single opaque, possibly long-running step.
pub trait SolverBridge {
    fn solve(&self, lp_text: &str) -> Result<SolverResult, SolverBridgeError>;
}

/// Shells out to an external solver binary, feeding it CPLEX LP text via a
/// temp file and reading its solution back from stdout.
///
/// Expected stdout protocol (one status line, then one `name value` pair
/// per line):
/// ```text
/// status: optimal|infeasible|unbounded|other
/// Concrete_recipe 32
/// ```
pub struct ExternalCliSolver {
    binary: PathBuf,
}

impl ExternalCliSolver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

impl SolverBridge for ExternalCliSolver {
    fn solve(&self, lp_text: &str) -> Result<SolverResult, SolverBridgeError> {
        let mut file = tempfile::Builder::new().suffix(".lp").tempfile()?;
        file.write_all(lp_text.as_bytes())?;
        file.flush()?;

        log::debug!("invoking external solver {:?} on {:?}", self.binary, file.path());
        let output = Command::new(&self.binary).arg(file.path()).output()?;
        parse_solver_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_solver_output(stdout: &str) -> Result<SolverResult, SolverBridgeError> {
    let mut lines = stdout.lines();
    let status_line = lines.next().unwrap_or("").trim();
    let status = match status_line.strip_prefix("status:").map(str::trim) {
        Some("optimal") => SolverStatus::Optimal,
        Some("infeasible") => SolverStatus::Infeasible,
        Some("unbounded") => SolverStatus::Unbounded,
        Some(_) => SolverStatus::Other,
        None => return Err(SolverBridgeError::BadOutput(status_line.to_string())),
    };

    let mut variable_values = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| SolverBridgeError::BadOutput(line.to_string()))?;
        let value: f64 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SolverBridgeError::BadOutput(line.to_string()))?;
        variable_values.insert(name.to_string(), value);
    }

    Ok(SolverResult { status: Some(status), variable_values })
}
