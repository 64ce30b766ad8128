//! Configuration discovery and effective settings resolution.
//!
//! devloop reads `devloop.toml|yaml|yml` from the project root (or closest
//! ancestor) and falls back to the `nodemonConfig` section and `main` entry of
//! `package.json`. The result is merged with CLI flags into an `Effective`
//! config that stays fixed for the lifetime of the process.
//! Defaults:
//! - `output`: `human`
//! - `lint.command`: `npx eslint --fix --cache --ignore-path .gitignore --format json`
//! - `inspect`: true
//! - `kill_timeout_ms`: 5000
//!
//! Overrides precedence: CLI > devloop config > package.json > defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names probed in order.
pub const CONFIG_FILES: [&str; 3] = ["devloop.toml", "devloop.yaml", "devloop.yml"];

/// Environment switch that disables server start/restart.
pub const LINT_ONLY_ENV: &str = "LINT_ONLY";

const DEFAULT_LINT_COMMAND: [&str; 8] = [
    "npx",
    "eslint",
    "--fix",
    "--cache",
    "--ignore-path",
    ".gitignore",
    "--format",
    "json",
];
const DEFAULT_KILL_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
/// A field that accepts either a single string or a list.
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Lint-related configuration section under `[lint]`.
pub struct LintCfg {
    /// Program followed by its arguments; watch paths are appended.
    pub command: Option<OneOrMany>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `devloop.toml|yaml`.
pub struct DevloopConfig {
    pub watch: Option<OneOrMany>,
    pub ignore: Option<OneOrMany>,
    pub script: Option<String>,
    pub exec: Option<String>,
    pub inspect: Option<bool>,
    pub output: Option<String>,
    pub kill_timeout_ms: Option<u64>,
    #[serde(default)]
    pub lint: Option<LintCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// The `nodemonConfig` section of `package.json`.
pub struct NodemonCfg {
    pub watch: Option<OneOrMany>,
    pub ignore: Option<OneOrMany>,
    pub exec: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
/// The subset of `package.json` devloop understands.
pub struct PackageJson {
    pub main: Option<String>,
    pub nodemon_config: Option<NodemonCfg>,
}

#[derive(Debug, Default, Clone)]
/// Values given on the command line; `None` defers to config files.
pub struct Overrides {
    pub repo_root: Option<String>,
    pub script: Option<String>,
    pub script_args: Vec<String>,
    pub exec: Option<String>,
    pub output: Option<String>,
    pub lint_cmd: Option<String>,
    pub lint_only: bool,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub watch: Vec<String>,
    pub ignore: Vec<String>,
    pub script: Option<String>,
    pub script_args: Vec<String>,
    pub exec: Option<String>,
    pub inspect: bool,
    pub output: String,
    pub lint_command: Vec<String>,
    pub lint_only: bool,
    pub kill_timeout: Duration,
    /// The devloop config file that was loaded, if any.
    pub config_file: Option<PathBuf>,
}

/// Walk upward from `start` to detect the project root.
///
/// Stops when a devloop config, a `package.json` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists())
            || cur.join("package.json").exists()
            || cur.join(".git").exists()
        {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// First devloop config file present in `root`, in `CONFIG_FILES` order.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.exists())
}

/// Load `DevloopConfig` from `devloop.toml` or `devloop.yaml|yml` if present.
///
/// A file that exists but does not parse is an error, not a silent default.
pub fn load_config(root: &Path) -> Result<Option<DevloopConfig>> {
    find_config(root).map(|p| parse_config(&p)).transpose()
}

fn parse_config(path: &Path) -> Result<DevloopConfig> {
    let s = fs::read_to_string(path)?;
    let is_toml = path.extension().is_some_and(|e| e == "toml");
    let parsed = if is_toml {
        toml::from_str(&s).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&s).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Load `package.json` from `root` if present.
pub fn load_package_json(root: &Path) -> Result<Option<PackageJson>> {
    let p = root.join("package.json");
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&p)?;
    let pkg: PackageJson = serde_json::from_str(&s)
        .map_err(|e| Error::Config(format!("{}: {}", p.display(), e)))?;
    Ok(Some(pkg))
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(ov: &Overrides) -> Result<Effective> {
    let start = PathBuf::from(ov.repo_root.as_deref().unwrap_or("."));
    let start = start.canonicalize().unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let config_file = find_config(&repo_root);
    let cfg = match &config_file {
        Some(p) => parse_config(p)?,
        None => DevloopConfig::default(),
    };
    let pkg = load_package_json(&repo_root)?.unwrap_or_default();
    let nodemon = pkg.nodemon_config.unwrap_or_default();

    let watch = cfg
        .watch
        .or(nodemon.watch)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();
    if watch.is_empty() {
        return Err(Error::Config(format!(
            "no watch paths configured in {} (set `watch` in devloop.toml or `nodemonConfig.watch` in package.json)",
            repo_root.display()
        )));
    }

    let ignore = cfg
        .ignore
        .or(nodemon.ignore)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();

    let script = ov.script.clone().or(cfg.script).or(pkg.main);
    let exec = ov.exec.clone().or(cfg.exec).or(nodemon.exec);

    let output = ov
        .output
        .clone()
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let lint_command = match ov.lint_cmd.as_deref() {
        Some(cmd) => shlex::split(cmd)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config(format!("invalid --lint-cmd: {}", cmd)))?,
        None => cfg
            .lint
            .and_then(|l| l.command)
            .map(OneOrMany::into_vec)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LINT_COMMAND.iter().map(|s| s.to_string()).collect()),
    };

    Ok(Effective {
        repo_root,
        watch,
        ignore,
        script,
        script_args: ov.script_args.clone(),
        exec,
        inspect: cfg.inspect.unwrap_or(true),
        output,
        lint_command,
        lint_only: ov.lint_only,
        kill_timeout: Duration::from_millis(
            cfg.kill_timeout_ms.unwrap_or(DEFAULT_KILL_TIMEOUT_MS),
        ),
        config_file,
    })
}

/// Interpret a boolean-ish environment value.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty()
        || v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off"))
}

/// Whether `LINT_ONLY` is set in the process environment.
pub fn lint_only_env() -> bool {
    std::env::var(LINT_ONLY_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn at(root: &Path) -> Overrides {
        Overrides {
            repo_root: root.to_str().map(str::to_string),
            ..Overrides::default()
        }
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("devloop.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
watch = ["src", "lib"]
ignore = "**/*.test.js"
script = "src/server.js"
exec = "node --enable-source-maps"
output = "json"
kill_timeout_ms = 250
[lint]
command = ["eslint", "--fix", "--format", "json"]
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(&at(root)).unwrap();
        assert_eq!(eff.watch, vec!["src", "lib"]);
        assert_eq!(eff.ignore, vec!["**/*.test.js"]);
        assert_eq!(eff.script.as_deref(), Some("src/server.js"));
        assert_eq!(eff.exec.as_deref(), Some("node --enable-source-maps"));
        assert_eq!(eff.output, "json");
        assert_eq!(eff.kill_timeout, Duration::from_millis(250));
        assert_eq!(eff.lint_command[0], "eslint");
        assert!(!eff.lint_only);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("devloop.yaml"),
            "watch:\n  - src\nscript: index.js\n",
        )
        .unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        assert_eq!(eff.watch, vec!["src"]);
        assert_eq!(eff.output, "human");
        assert!(eff.inspect);
        assert_eq!(eff.kill_timeout, Duration::from_millis(5000));
        assert_eq!(&eff.lint_command[..2], &["npx", "eslint"]);
        assert!(eff.lint_command.contains(&"--fix".to_string()));
        assert!(eff.config_file.unwrap().ends_with("devloop.yaml"));
    }

    #[test]
    fn test_inspect_defaults_on_and_can_be_disabled() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), r#"{"nodemonConfig": {"watch": "src"}}"#).unwrap();
        let eff = resolve_effective(&at(root)).unwrap();
        assert!(eff.inspect);
        assert!(eff.config_file.is_none());

        fs::write(root.join("devloop.toml"), "inspect = false
").unwrap();
        let eff = resolve_effective(&at(root)).unwrap();
        assert!(!eff.inspect);
        assert!(eff.config_file.unwrap().ends_with("devloop.toml"));
    }

    #[test]
    fn test_package_json_fallback() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("package.json"),
            r#"{
  "name": "api",
  "main": "src/index.js",
  "nodemonConfig": { "watch": ["src", "config"], "ignore": ["tmp/*"], "exec": "ts-node" }
}"#,
        )
        .unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        assert_eq!(eff.watch, vec!["src", "config"]);
        assert_eq!(eff.ignore, vec!["tmp/*"]);
        assert_eq!(eff.script.as_deref(), Some("src/index.js"));
        assert_eq!(eff.exec.as_deref(), Some("ts-node"));
    }

    #[test]
    fn test_precedence_cli_over_config_over_package() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("package.json"),
            r#"{"main": "pkg.js", "nodemonConfig": {"watch": "pkg-src", "exec": "node"}}"#,
        )
        .unwrap();
        fs::write(root.join("devloop.toml"), "script = \"cfg.js\"\n").unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        // watch falls through to package.json; script comes from devloop.toml
        assert_eq!(eff.watch, vec!["pkg-src"]);
        assert_eq!(eff.script.as_deref(), Some("cfg.js"));

        let mut ov = at(root);
        ov.script = Some("cli.js".into());
        ov.exec = Some("deno run".into());
        ov.lint_cmd = Some("biome lint --write".into());
        ov.lint_only = true;
        let eff = resolve_effective(&ov).unwrap();
        assert_eq!(eff.script.as_deref(), Some("cli.js"));
        assert_eq!(eff.exec.as_deref(), Some("deno run"));
        assert_eq!(eff.lint_command, vec!["biome", "lint", "--write"]);
        assert!(eff.lint_only);
    }

    #[test]
    fn test_missing_watch_is_config_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("devloop.toml"), "script = \"a.js\"\n").unwrap();
        let err = resolve_effective(&at(root)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("devloop.toml"), "watch = [\n").unwrap();
        assert!(matches!(load_config(root), Err(Error::Config(_))));
    }

    #[test]
    fn test_detect_repo_root_walks_up() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), "{}").unwrap();
        let nested = root.join("src/routes");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_is_truthy() {
        for v in ["1", "true", "yes", "anything"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", " ", "0", "false", "FALSE", "no", "off"] {
            assert!(!is_truthy(v), "{v:?}");
        }
    }
}
