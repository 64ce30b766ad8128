//! devloop CLI binary entry point.
//! Wires config, collaborators and the orchestrator together and maps
//! failures to exit codes (1 = problems/tool failure, 2 = configuration).

use anyhow::Context;
use clap::Parser;
use devloop::cli::{Cli, Commands};
use devloop::config::{self, Effective, Overrides};
use devloop::error::Error;
use devloop::lint::{CommandLinter, LintRunner};
use devloop::orchestrator::Orchestrator;
use devloop::signals;
use devloop::supervisor::{ChildLauncher, LaunchSpec, ProcessSupervisor};
use devloop::utils::{error_prefix, info_prefix, note_prefix};
use devloop::watcher::FileWatcher;
use std::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::Run {
            script,
            args,
            repo_root,
            output,
            exec,
            lint_cmd,
            lint_only,
        } => {
            let ov = Overrides {
                repo_root,
                script,
                script_args: args,
                exec,
                output,
                lint_cmd,
                lint_only: lint_only || config::lint_only_env(),
            };
            match run_loop(&ov) {
                Ok(()) => 0,
                Err(e) => fail(&e),
            }
        }
        Commands::Lint {
            repo_root,
            output,
            lint_cmd,
        } => {
            let ov = Overrides {
                repo_root,
                output,
                lint_cmd,
                ..Overrides::default()
            };
            match lint_once(&ov) {
                Ok(clean) => i32::from(!clean),
                Err(e) => fail(&e),
            }
        }
    };
    std::process::exit(code);
}

fn fail(err: &anyhow::Error) -> i32 {
    eprintln!("{} {:#}", error_prefix(), err);
    match err.downcast_ref::<Error>() {
        Some(Error::Config(_)) => 2,
        _ => 1,
    }
}

fn resolve(ov: &Overrides) -> anyhow::Result<Effective> {
    let eff = config::resolve_effective(ov)?;
    if eff.config_file.is_none() {
        eprintln!(
            "{} No devloop.toml found; using package.json and defaults.",
            note_prefix()
        );
    }
    Ok(eff)
}

fn run_loop(ov: &Overrides) -> anyhow::Result<()> {
    let eff = resolve(ov)?;
    let script = match (&eff.script, eff.lint_only) {
        (Some(s), _) => s.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err(Error::Config(
                "no entry script: pass SCRIPT, set `script` in devloop.toml or `main` in package.json"
                    .into(),
            )
            .into())
        }
    };
    if eff.lint_only {
        eprintln!(
            "{} Lint-only mode; the server will not be started.",
            info_prefix()
        );
    }

    let linter = CommandLinter::new(eff.lint_command.clone(), eff.repo_root.clone())?;
    let runner = LintRunner::new(linter, &eff.output, eff.repo_root.clone());
    let spec = LaunchSpec {
        script,
        args: eff.script_args.clone(),
        exec: eff.exec.clone(),
        inspect: eff.inspect,
        cwd: eff.repo_root.clone(),
        kill_timeout: eff.kill_timeout,
    };
    let supervisor = ProcessSupervisor::new(ChildLauncher, spec, eff.lint_only);

    let (tx, rx) = mpsc::channel();
    signals::forward_signals(tx.clone())?;
    let watcher = FileWatcher::spawn(&eff.repo_root, &eff.watch, &eff.ignore, tx)
        .context("starting file watcher")?;
    info!(
        root = %eff.repo_root.display(),
        paths = ?watcher.paths(),
        "devloop started"
    );

    let mut orchestrator = Orchestrator::new(runner, supervisor, eff.watch.clone());
    orchestrator.run(&rx)?;
    Ok(())
}

/// One lint pass; returns whether the code is free of errors.
fn lint_once(ov: &Overrides) -> anyhow::Result<bool> {
    let eff = resolve(ov)?;
    let linter = CommandLinter::new(eff.lint_command.clone(), eff.repo_root.clone())?;
    let mut runner = LintRunner::new(linter, &eff.output, eff.repo_root.clone());
    let outcome = runner.run(&eff.watch)?;
    Ok(outcome.is_clean())
}
