//! File watching for the watch set.
//!
//! Wraps `notify` and forwards one `Event::Change` per relevant filesystem
//! event into the orchestrator's queue. Content modifications count, and so
//! do the create and rename-into-place events of editors that save atomically;
//! paths under `node_modules`, dot-prefixed components and user ignore
//! patterns never trigger a pass.

use crate::error::{Error, Result};
use crate::orchestrator::Event;
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

/// Whether a notify event replaced or changed file content.
pub fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
            | EventKind::Create(CreateKind::File | CreateKind::Any)
    )
}

/// Decides which changed paths are ignored.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: PathBuf,
    globs: GlobSet,
}

impl IgnoreFilter {
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::Config(format!("invalid ignore pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build ignore set: {}", e)))?;
        Ok(Self {
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            globs,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let hidden = rel.components().any(|c| match c {
            Component::Normal(s) => {
                let s = s.to_string_lossy();
                s == "node_modules" || s.starts_with('.')
            }
            _ => false,
        });
        hidden || self.globs.is_match(rel) || self.globs.is_match(path)
    }
}

/// Expand watch entries against `root`; entries with glob characters are
/// expanded, plain entries are kept when they exist.
pub fn resolve_watch_paths(root: &Path, entries: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in entries {
        let abs = root.join(entry);
        if entry.contains(['*', '?', '[']) {
            let pattern = abs.to_string_lossy().to_string();
            match glob::glob(&pattern) {
                Ok(paths) => out.extend(paths.flatten()),
                Err(e) => warn!("invalid watch pattern '{}': {}", entry, e),
            }
        } else if abs.exists() {
            out.push(abs);
        } else {
            warn!("watch path does not exist: {}", abs.display());
        }
    }
    out
}

/// Keeps the underlying watcher alive; dropping it stops notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    paths: Vec<PathBuf>,
}

impl FileWatcher {
    /// Start watching `entries` under `root`, sending changes into `tx`.
    pub fn spawn(
        root: &Path,
        entries: &[String],
        ignore: &[String],
        tx: Sender<Event>,
    ) -> Result<Self> {
        let filter = IgnoreFilter::new(root, ignore)?;
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !is_change(&event.kind) {
                        return;
                    }
                    if !event.paths.is_empty() && event.paths.iter().all(|p| filter.is_ignored(p))
                    {
                        return;
                    }
                    debug!(paths = ?event.paths, "change detected");
                    let _ = tx.send(Event::Change);
                }
                Err(e) => warn!("watch error: {}", e),
            })
            .map_err(|e| Error::Watch(format!("failed to create watcher: {}", e)))?;

        let paths = resolve_watch_paths(root, entries);
        if paths.is_empty() {
            return Err(Error::Watch(format!(
                "none of the watch paths exist: {}",
                entries.join(", ")
            )));
        }
        for p in &paths {
            watcher
                .watch(p, RecursiveMode::Recursive)
                .map_err(|e| Error::Watch(format!("failed to watch {}: {}", p.display(), e)))?;
        }
        debug!(?paths, "watching");
        Ok(Self {
            _watcher: watcher,
            paths,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind, RemoveKind};
    use std::fs;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_only_content_changes_count() {
        assert!(is_change(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
        assert!(!is_change(&EventKind::Access(AccessKind::Any)));
        assert!(!is_change(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn test_atomic_save_events_count() {
        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(is_change(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
        assert!(!is_change(&EventKind::Modify(ModifyKind::Name(RenameMode::From))));
        assert!(!is_change(&EventKind::Create(CreateKind::Folder)));
    }

    #[test]
    fn test_ignore_filter_defaults_and_patterns() {
        let root = Path::new("/work/app");
        let f = IgnoreFilter::new(root, &["**/*.test.js".into(), "tmp/**".into()]).unwrap();
        assert!(f.is_ignored(Path::new("/work/app/node_modules/x/index.js")));
        assert!(f.is_ignored(Path::new("/work/app/.eslintcache")));
        assert!(f.is_ignored(Path::new("/work/app/src/.hidden/a.js")));
        assert!(f.is_ignored(Path::new("/work/app/src/a.test.js")));
        assert!(f.is_ignored(Path::new("/work/app/tmp/out.js")));
        assert!(!f.is_ignored(Path::new("/work/app/src/a.js")));
    }

    #[test]
    fn test_invalid_ignore_pattern_is_config_error() {
        assert!(matches!(
            IgnoreFilter::new(Path::new("/"), &["a[".into()]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_resolve_watch_paths_expands_globs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("a.config.js"), "").unwrap();
        fs::write(root.join("b.config.js"), "").unwrap();
        let paths = resolve_watch_paths(
            root,
            &["src".into(), "*.config.js".into(), "missing".into()],
        );
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], root.join("src"));
    }

    #[test]
    fn test_spawn_requires_existing_path() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = mpsc::channel();
        let res = FileWatcher::spawn(dir.path(), &["nope".into()], &[], tx);
        assert!(matches!(res, Err(Error::Watch(_))));
    }

    #[test]
    fn test_write_emits_change() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/a.js"), "let a = 1;\n").unwrap();
        let (tx, rx) = mpsc::channel();
        let watcher = FileWatcher::spawn(&root, &["src".into()], &[], tx).unwrap();
        assert_eq!(watcher.paths().len(), 1);

        fs::write(root.join("src/a.js"), "let a = 2;\n").unwrap();
        let ev = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(ev, Event::Change);
    }

    #[test]
    fn test_rename_over_target_emits_change() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/a.js"), "let a = 1;\n").unwrap();
        let tmp = root.join("src/a.js.tmp~");
        fs::write(&tmp, "let a = 2;\n").unwrap();
        let (tx, rx) = mpsc::channel();
        let _watcher = FileWatcher::spawn(&root, &["src".into()], &[], tx).unwrap();
        while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}

        fs::rename(&tmp, root.join("src/a.js")).unwrap();
        let ev = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(ev, Event::Change);
    }
}
