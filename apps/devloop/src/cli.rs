//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "devloop",
    version,
    about = "Lint-gated dev server loop",
    long_about = "devloop — watch sources, lint with autofix on change, and keep a dev server running only while the code lints clean.\n\nConfiguration precedence: CLI > devloop.toml > package.json (nodemonConfig) > defaults.",
    after_help = "Examples:\n  devloop run\n  devloop run src/server.js -- --port 3000\n  devloop run --exec \"ts-node\" src/app.ts\n  LINT_ONLY=1 devloop run\n  devloop lint --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current devloop version."
    )]
    Version,
    /// Watch, lint and run the server
    #[command(
        about = "Watch, lint and run the server",
        long_about = "Run an initial lint pass, start the server when it is clean, then re-lint and restart on every change. Lint errors stop the server until they are fixed.",
        after_help = "Examples:\n  devloop run\n  devloop run src/index.js --lint-only"
    )]
    Run {
        #[arg(help = "Entry script (default: script in devloop.toml, else package.json main)")]
        script: Option<String>,
        #[arg(last = true, help = "Arguments passed to the entry script")]
        args: Vec<String>,
        #[arg(long, help = "Project root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Report output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Command used to run the script, e.g. \"ts-node\"")]
        exec: Option<String>,
        #[arg(long, help = "Lint command printing ESLint JSON; watch paths are appended")]
        lint_cmd: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Only lint; never start the server (also: LINT_ONLY=1)")]
        lint_only: bool,
    },
    /// Run a single lint pass
    #[command(
        about = "Run a single lint pass",
        long_about = "Lint the watch set once with fixes applied and print the report. Exits non-zero when errors remain.",
        after_help = "Examples:\n  devloop lint\n  devloop lint --output json"
    )]
    Lint {
        #[arg(long, help = "Project root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Report output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Lint command printing ESLint JSON; watch paths are appended")]
        lint_cmd: Option<String>,
    },
}
