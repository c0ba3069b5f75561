//! Backend that delegates to an external solver program.
//!
//! Each composed model is written to a scratch file (prefixed `_tmp_`, next
//! to the model when a directory is given) and the program is invoked with
//! the file path as its last argument. It must print a
//! [`RecordedSolutions`](crate::recorded::RecordedSolutions) document on
//! stdout and exit with status 0; anything on stderr with a non-zero status
//! is reported as a compile error.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::bridge::{SolutionHandle, SolverBridge};
use crate::error::SolverError;
use crate::recorded::RecordedSolutions;

const SCRATCH_PREFIX: &str = "_tmp_";
const SCRATCH_SUFFIX: &str = ".als";

/// A composed model on disk, removed when dropped.
#[derive(Debug)]
pub struct ScratchModel {
    file: NamedTempFile,
}

impl ScratchModel {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Runs `program [args..] <scratch file>` per query.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    program: PathBuf,
    args: Vec<String>,
    scratch_dir: Option<PathBuf>,
}

impl ProcessSolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            scratch_dir: None,
        }
    }

    /// Arguments passed before the scratch file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Write scratch files into `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

impl SolverBridge for ProcessSolver {
    type Compiled = ScratchModel;

    fn compile(&mut self, model_text: &str) -> Result<ScratchModel, SolverError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX).suffix(SCRATCH_SUFFIX);
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(model_text.as_bytes())?;
        file.flush()?;
        debug!(path = %file.path().display(), "wrote scratch model");
        Ok(ScratchModel { file })
    }

    fn solve(&mut self, model: &ScratchModel) -> Result<SolutionHandle, SolverError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(model.path())
            .output()
            .map_err(|e| {
                SolverError::Solve(format!("failed to run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = ?output.status.code(), "solver program failed");
            return Err(SolverError::Compile(stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let solutions = RecordedSolutions::from_json(&stdout)
            .map_err(|e| SolverError::Solve(format!("unreadable solver output: {e}")))?;
        debug!(instances = solutions.instances.len(), "solver program answered");
        Ok(solutions.into_handle())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const ANSWER: &str = r#"{
        "state_sig": "State",
        "fields": [{ "name": "light" }],
        "instances": [{ "state_count": 1, "tuples": { "light": ["State$0->Red$0"] } }]
    }"#;

    #[test]
    fn scratch_file_lives_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = ProcessSolver::new("true").with_scratch_dir(dir.path());
        let model = solver.compile("sig State {}").unwrap();
        assert_eq!(model.path().parent(), Some(dir.path()));
        let name = model.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("_tmp_"));
        assert_eq!(std::fs::read_to_string(model.path()).unwrap(), "sig State {}");
    }

    #[test]
    fn reads_solutions_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let answer = dir.path().join("answer.json");
        std::fs::write(&answer, ANSWER).unwrap();

        let script = format!("cat {}", answer.display());
        let mut solver = ProcessSolver::new("sh").with_args(["-c", script.as_str(), "trellis"]);
        let solution = solver.run("sig State {}").unwrap();
        assert!(solution.satisfiable());
        assert_eq!(solution.evaluate_field("light").unwrap(), ["State$0->Red$0"]);
    }

    #[test]
    fn failure_status_is_a_compile_error() {
        let mut solver =
            ProcessSolver::new("sh").with_args(["-c", "echo 'syntax error' >&2; exit 1", "trellis"]);
        match solver.run("sig State {}") {
            Err(SolverError::Compile(msg)) => assert_eq!(msg, "syntax error"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_output_is_a_solve_error() {
        let mut solver = ProcessSolver::new("sh").with_args(["-c", "echo nope", "trellis"]);
        assert!(matches!(solver.run("x"), Err(SolverError::Solve(_))));
    }

    #[test]
    fn missing_program_is_a_solve_error() {
        let mut solver = ProcessSolver::new("/nonexistent/trellis-solver");
        assert!(matches!(solver.run("x"), Err(SolverError::Solve(_))));
    }
}
