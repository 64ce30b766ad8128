//! Lint-and-fix pass over the watch set.
//!
//! The engine itself is a collaborator behind the `Linter` trait. The default
//! `CommandLinter` runs any command that prints ESLint-compatible JSON.
//! Rewriting fixed files is a side effect of every pass; the orchestrator
//! anticipates the resulting change notification.

use crate::error::{Error, Result};
use crate::models::{FileReport, LintOutcome};
use crate::output;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Lint/fix collaborator.
pub trait Linter {
    /// Lint `paths` with fixes enabled and return per-file results.
    fn run_with_fixes(&mut self, paths: &[String]) -> Result<Vec<FileReport>>;

    /// Persist fixed contents. Must be idempotent.
    fn apply_fixes(&mut self, reports: &[FileReport]) -> Result<()>;
}

/// Runs an external lint command and parses its JSON report from stdout.
///
/// Exit status 0 (clean) and 1 (problems found) are normal passes; anything
/// else means the tool itself broke.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandLinter {
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::Config("lint command is empty".into()));
        }
        Ok(Self { command, cwd })
    }

    fn display(&self) -> String {
        self.command.join(" ")
    }
}

impl Linter for CommandLinter {
    fn run_with_fixes(&mut self, paths: &[String]) -> Result<Vec<FileReport>> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Config("lint command is empty".into()))?;
        debug!(command = %self.display(), ?paths, "running linter");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .args(paths)
            .current_dir(&self.cwd)
            .stdin(Stdio::null());
        // Keep terminal SIGINT away from the linter; shutdown happens between passes.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let out = cmd
            .output()
            .map_err(|e| Error::Lint(format!("failed to run `{}`: {}", self.display(), e)))?;

        match out.status.code() {
            Some(0) | Some(1) => {}
            _ => {
                return Err(Error::Lint(format!(
                    "`{}` exited with {}: {}",
                    self.display(),
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )))
            }
        }

        serde_json::from_slice(&out.stdout).map_err(|e| {
            Error::Lint(format!(
                "`{}` did not print a JSON report: {}",
                self.display(),
                e
            ))
        })
    }

    fn apply_fixes(&mut self, reports: &[FileReport]) -> Result<()> {
        let wrote = write_fixes(reports, &self.cwd)?;
        if wrote > 0 {
            info!(files = wrote, "wrote lint fixes");
        }
        Ok(())
    }
}

/// Write each report's fixed `output` to its file when the content differs.
///
/// Returns how many files were rewritten. Relative paths resolve against `root`.
pub fn write_fixes(reports: &[FileReport], root: &Path) -> Result<usize> {
    let written: Vec<bool> = reports
        .par_iter()
        .filter_map(|r| r.output.as_ref().map(|o| (root.join(&r.file_path), o)))
        .map(|(path, fixed)| -> Result<bool> {
            match fs::read_to_string(&path) {
                Ok(current) if current == *fixed => Ok(false),
                _ => {
                    fs::write(&path, fixed)?;
                    Ok(true)
                }
            }
        })
        .collect::<Result<Vec<bool>>>()?;
    Ok(written.into_iter().filter(|w| *w).count())
}

/// Runs the collaborator, prints the report and classifies the pass.
pub struct LintRunner<L: Linter> {
    linter: L,
    output: String,
    root: PathBuf,
}

impl<L: Linter> LintRunner<L> {
    pub fn new(linter: L, output: &str, root: PathBuf) -> Self {
        Self {
            linter,
            output: output.to_string(),
            root,
        }
    }

    /// Lint `paths`, apply fixes and report. Collaborator failures propagate.
    pub fn run(&mut self, paths: &[String]) -> Result<LintOutcome> {
        let reports = self.run_reports(paths)?;
        let outcome = LintOutcome::from_reports(&reports);
        debug!(?outcome, files = reports.len(), "lint pass finished");
        Ok(outcome)
    }

    /// Like `run` but hands back the raw per-file reports.
    pub fn run_reports(&mut self, paths: &[String]) -> Result<Vec<FileReport>> {
        let reports = self.linter.run_with_fixes(paths)?;
        self.linter.apply_fixes(&reports)?;
        output::print_report(&reports, &self.output, &self.root);
        Ok(reports)
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn linter(&self) -> &L {
        &self.linter
    }
}
