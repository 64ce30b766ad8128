//! Output rendering for lint reports and operator status lines.
//!
//! Supports `human` (default) and `json` report outputs. Status lines are
//! always line-oriented text meant for a person watching the terminal.

use crate::models::{FileReport, Summary};
use crate::utils::{colors_enabled, rel_to};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && colors_enabled()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Operator-facing pipeline states worth announcing.
pub enum Status {
    Starting,
    Restarting,
    BlockedFatal,
    BlockedErrors,
    ShuttingDown,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Status::Starting => "▶ starting server",
            Status::Restarting => "↻ restarting server",
            Status::BlockedFatal => {
                "✖ fatal lint errors: server stopped, fix them to start it again"
            }
            Status::BlockedErrors => "✖ lint errors: fix them to keep running the server",
            Status::ShuttingDown => "■ shutting down dev server",
        }
    }
}

/// Render a status line, coloured when `color` is set.
pub fn render_status(status: Status, color: bool) -> String {
    let text = status.text();
    if !color {
        return text.to_string();
    }
    match status {
        Status::Starting | Status::Restarting => text.green().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}

/// Print a status line; plain text when `output` is `json` or colours are off.
pub fn print_status(status: Status, output: &str) {
    println!("{}", render_status(status, use_colors(output)));
}

/// Print the lint report in the requested format.
pub fn print_report(reports: &[FileReport], output: &str, root: &Path) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_report_json(reports, root)).unwrap_or_default()
        ),
        _ => {
            for line in render_human(reports, root, use_colors(output)) {
                println!("{}", line);
            }
        }
    }
}

/// Render the human report (pure) so it can be tested without a terminal.
pub fn render_human(reports: &[FileReport], root: &Path, color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for r in reports {
        let file = rel_to(root, Path::new(&r.file_path));
        if r.output.is_some() {
            if color {
                lines.push(format!("{} {}", "✏️  fixed:".green().bold(), file.bold()));
            } else {
                lines.push(format!("✏️  fixed: {}", file));
            }
        }
        for m in &r.messages {
            let (icon, sev) = match (m.fatal, m.severity) {
                (true, _) => ("✖", "⟦fatal⟧"),
                (false, 2) => ("✖", "⟦error⟧"),
                _ => ("▲", "⟦warn⟧"),
            };
            let loc = match (m.line, m.column) {
                (Some(l), Some(c)) => format!("{}:{}:{}", file, l, c),
                (Some(l), None) => format!("{}:{}", file, l),
                _ => file.clone(),
            };
            let rule = m.rule_id.as_deref().unwrap_or("-");
            if color {
                let (icon, sev) = if m.fatal || m.severity == 2 {
                    (icon.red().to_string(), sev.red().bold().to_string())
                } else {
                    (icon.yellow().to_string(), sev.yellow().bold().to_string())
                };
                lines.push(format!(
                    "{} {} {} ❲{}❳ — {}",
                    icon,
                    sev,
                    loc.bold(),
                    rule,
                    m.message
                ));
            } else {
                lines.push(format!("{} {} {} ❲{}❳ — {}", icon, sev, loc, rule, m.message));
            }
        }
    }
    let s = Summary::from_reports(reports);
    let summary = format!(
        "— Summary — errors={} warnings={} fatal={} fixed={} files={}",
        s.errors, s.warnings, s.fatal, s.fixed, s.files
    );
    if color {
        lines.push(summary.bold().to_string());
    } else {
        lines.push(summary);
    }
    lines
}

/// Compose report JSON object (pure) for testing/snapshot purposes.
pub fn compose_report_json(reports: &[FileReport], root: &Path) -> JsonVal {
    let items: Vec<_> = reports
        .iter()
        .map(|r| {
            json!({
                "file": rel_to(root, Path::new(&r.file_path)),
                "fixed": r.output.is_some(),
                "errorCount": r.error_count,
                "warningCount": r.warning_count,
                "messages": r.messages,
            })
        })
        .collect();
    json!({"results": items, "summary": Summary::from_reports(reports)})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    fn sample() -> Vec<FileReport> {
        vec![
            FileReport {
                file_path: "/p/src/a.js".into(),
                messages: vec![Message {
                    rule_id: Some("no-undef".into()),
                    severity: 2,
                    message: "'x' is not defined".into(),
                    line: Some(3),
                    column: Some(5),
                    fatal: false,
                }],
                error_count: 1,
                warning_count: 0,
                output: None,
            },
            FileReport {
                file_path: "/p/src/b.js".into(),
                messages: vec![Message {
                    severity: 2,
                    message: "Parsing error: Unexpected token".into(),
                    line: Some(1),
                    fatal: true,
                    ..Message::default()
                }],
                error_count: 1,
                warning_count: 0,
                output: Some("fixed".into()),
            },
        ]
    }

    #[test]
    fn test_render_human_lines() {
        let lines = render_human(&sample(), Path::new("/p"), false);
        assert_eq!(
            lines[0],
            "✖ ⟦error⟧ src/a.js:3:5 ❲no-undef❳ — 'x' is not defined"
        );
        assert_eq!(lines[1], "✏️  fixed: src/b.js");
        assert_eq!(
            lines[2],
            "✖ ⟦fatal⟧ src/b.js:1 ❲-❳ — Parsing error: Unexpected token"
        );
        assert_eq!(
            lines.last().unwrap(),
            "— Summary — errors=2 warnings=0 fatal=1 fixed=1 files=2"
        );
    }

    #[test]
    fn test_compose_report_json_shape() {
        let out = compose_report_json(&sample(), Path::new("/p"));
        assert_eq!(out["summary"]["errors"], 2);
        assert_eq!(out["summary"]["fixed"], 1);
        assert_eq!(out["results"][0]["file"], "src/a.js");
        assert_eq!(out["results"][1]["fixed"], true);
        assert_eq!(out["results"][1]["messages"][0]["fatal"], true);
        assert_eq!(out["results"][0]["messages"][0]["ruleId"], "no-undef");
    }

    #[test]
    fn test_status_plain_in_json_mode() {
        assert!(!use_colors("json"));
        assert_eq!(
            render_status(Status::BlockedErrors, use_colors("json")),
            Status::BlockedErrors.text()
        );
        assert!(render_status(Status::Starting, true).contains("starting server"));
        assert!(render_status(Status::Starting, true).contains('\u{1b}'));
    }

    #[test]
    fn test_status_text_names_reason() {
        assert!(Status::BlockedFatal.text().contains("fatal"));
        assert!(Status::BlockedErrors.text().contains("lint errors"));
        assert!(!Status::BlockedErrors.text().contains("fatal"));
    }
}
