//! Shared data models for lint reports and the classified outcome.
//!
//! `FileReport` mirrors the ESLint JSON formatter shape so any linter that can
//! emit that format plugs into the runner unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// A single diagnostic reported for a file.
pub struct Message {
    #[serde(default)]
    pub rule_id: Option<String>,
    /// 1 = warning, 2 = error
    #[serde(default)]
    pub severity: u8,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub fatal: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Per-file lint result produced by the fix engine.
pub struct FileReport {
    pub file_path: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    /// Rewritten file contents; present only when fixes were applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl FileReport {
    pub fn has_fatal(&self) -> bool {
        self.messages.iter().any(|m| m.fatal)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Classification of one lint pass. `has_fixes` and `has_errors` are
/// independent; `has_fatal` takes precedence for the stop decision.
pub struct LintOutcome {
    pub has_fixes: bool,
    pub has_errors: bool,
    pub has_fatal: bool,
}

impl LintOutcome {
    /// Reduce per-file reports into an outcome.
    pub fn from_reports(reports: &[FileReport]) -> Self {
        LintOutcome {
            has_fixes: reports.iter().any(|r| r.output.is_some()),
            has_errors: reports.iter().any(|r| r.error_count > 0),
            has_fatal: reports.iter().any(FileReport::has_fatal),
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.has_fatal && !self.has_errors
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated report summary used by printers.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub fatal: usize,
    pub fixed: usize,
    pub files: usize,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut s = Summary {
            files: reports.len(),
            ..Summary::default()
        };
        for r in reports {
            s.errors += r.error_count;
            s.warnings += r.warning_count;
            s.fatal += r.messages.iter().filter(|m| m.fatal).count();
            if r.output.is_some() {
                s.fixed += 1;
            }
        }
        s
    }
}
