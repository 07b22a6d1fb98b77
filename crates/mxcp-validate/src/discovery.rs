//! Document discovery for batch validation
//!
//! Walks a directory tree depth first with entries sorted by file name, so
//! the same tree always yields the same sequence. Symlinks are followed.
//! Virtual environments, VCS metadata and dbt project files are never MXCP
//! documents and are skipped.

use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ValidatorConfig;
use crate::document::is_document_file;
use crate::error::Result;

/// Directories never descended into
pub const SKIPPED_DIRECTORIES: &[&str] = &[".venv", "venv", ".git", "node_modules", "target"];

/// dbt configuration files that share the YAML extension
pub const DBT_FILES: &[&str] = &[
    "dbt_project.yml",
    "profiles.yml",
    "sample_profiles.yml",
    "packages.yml",
];

/// Why a file was left out of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Inside a skipped directory
    Directory(String),
    /// dbt project or model file
    Dbt,
    /// Matched a configured exclude pattern
    Excluded(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Directory(dir) => write!(f, "inside '{}'", dir),
            SkipReason::Dbt => f.write_str("dbt file"),
            SkipReason::Excluded(pattern) => write!(f, "matches exclude pattern '{}'", pattern),
        }
    }
}

/// Path-based skip rules
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    exclude: Vec<Regex>,
}

impl SkipRules {
    pub fn new(exclude: Vec<Regex>) -> Self {
        Self { exclude }
    }

    /// Rules with the config's exclude patterns
    pub fn from_config(config: &ValidatorConfig) -> Result<Self> {
        Ok(Self::new(config.exclude_patterns()?))
    }

    /// Check a path relative to the batch root
    pub fn should_skip(&self, relative: &Path) -> Option<SkipReason> {
        let components: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        let (file_name, dirs) = components.split_last()?;

        if let Some(dir) = dirs.iter().find(|d| SKIPPED_DIRECTORIES.contains(*d)) {
            return Some(SkipReason::Directory((*dir).to_string()));
        }

        if DBT_FILES.contains(file_name) {
            return Some(SkipReason::Dbt);
        }
        let in_dir = |name: &str| dirs.contains(&name);
        if matches!(*file_name, "sources.yml" | "schema.yml") && in_dir("models") {
            return Some(SkipReason::Dbt);
        }
        if *file_name == "schema.yml" && in_dir("seeds") {
            return Some(SkipReason::Dbt);
        }

        let normalized = components.join("/");
        self.exclude
            .iter()
            .find(|re| re.is_match(&normalized))
            .map(|re| SkipReason::Excluded(re.as_str().to_string()))
    }
}

/// A file found by [`Discovery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Document file to validate
    File {
        path: PathBuf,
        /// Path relative to the batch root
        relative: PathBuf,
    },
    /// Entry the walker could not read
    Unreadable { path: PathBuf, message: String },
}

/// Lazy iterator over candidate document files below a root
pub struct Discovery {
    root: PathBuf,
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>,
    rules: SkipRules,
}

impl Discovery {
    pub fn new(root: &Path, rules: SkipRules) -> Self {
        let entries = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_directory(entry));
        Self {
            root: root.to_path_buf(),
            entries: Box::new(entries),
            rules,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for Discovery {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            match self.entries.next()? {
                Ok(entry) => {
                    if !entry.file_type().is_file() || !is_document_file(entry.path()) {
                        continue;
                    }
                    let path = entry.into_path();
                    let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
                    if let Some(reason) = self.rules.should_skip(&relative) {
                        tracing::debug!(path = %relative.display(), %reason, "skipping file");
                        continue;
                    }
                    return Some(Candidate::File { path, relative });
                }
                Err(err) => {
                    let Some(path) = err.path().map(Path::to_path_buf) else {
                        tracing::warn!(error = %err, "failed to read directory entry");
                        continue;
                    };
                    // Only directories and document files are reported
                    let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                    if (!path.is_dir() && !is_document_file(&path))
                        || self.rules.should_skip(relative).is_some()
                    {
                        tracing::debug!(
                            path = %path.display(),
                            error = %err,
                            "skipping unreadable entry"
                        );
                        continue;
                    }
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to read directory entry"
                    );
                    return Some(Candidate::Unreadable {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

fn is_skipped_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "mxcp: 1\n").unwrap();
    }

    fn relatives(discovery: Discovery) -> Vec<String> {
        discovery
            .filter_map(|c| match c {
                Candidate::File { relative, .. } => {
                    Some(relative.to_string_lossy().replace('\\', "/"))
                }
                Candidate::Unreadable { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_skip_directories() {
        let rules = SkipRules::default();
        assert_eq!(
            rules.should_skip(Path::new(".venv/lib/x.yml")),
            Some(SkipReason::Directory(".venv".to_string()))
        );
        assert!(rules.should_skip(Path::new("a/venv/x.yml")).is_some());
        assert!(rules.should_skip(Path::new("tools/x.yml")).is_none());
    }

    #[test]
    fn test_skip_dbt_files() {
        let rules = SkipRules::default();
        assert_eq!(rules.should_skip(Path::new("dbt_project.yml")), Some(SkipReason::Dbt));
        assert_eq!(rules.should_skip(Path::new("x/profiles.yml")), Some(SkipReason::Dbt));
        assert_eq!(
            rules.should_skip(Path::new("models/staging/sources.yml")),
            Some(SkipReason::Dbt)
        );
        assert_eq!(rules.should_skip(Path::new("seeds/schema.yml")), Some(SkipReason::Dbt));
        assert!(rules.should_skip(Path::new("tools/schema.yml")).is_none());
        assert!(rules.should_skip(Path::new("seeds/sources.yml")).is_none());
    }

    #[test]
    fn test_skip_exclude_patterns() {
        let rules = SkipRules::new(vec![Regex::new(r"^drafts/").unwrap()]);
        assert_eq!(
            rules.should_skip(Path::new("drafts/tools/x.yml")),
            Some(SkipReason::Excluded("^drafts/".to_string()))
        );
        assert!(rules.should_skip(Path::new("tools/drafts.yml")).is_none());
    }

    #[test]
    fn test_discovery_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "tools/b.yml");
        touch(root, "tools/a.yaml");
        touch(root, "mxcp-site.yml");
        touch(root, "prompts/p.yml");
        touch(root, "python/helper.py");
        touch(root, ".venv/site/x.yml");
        touch(root, "dbt_project.yml");
        touch(root, "resources/r.json");

        let found = relatives(Discovery::new(root, SkipRules::default()));
        assert_eq!(
            found,
            vec![
                "mxcp-site.yml",
                "prompts/p.yml",
                "resources/r.json",
                "tools/a.yaml",
                "tools/b.yml",
            ]
        );
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let dir = TempDir::new().unwrap();
        for name in ["tools/z.yml", "tools/m.yml", "evals/e.yml", "a.yml"] {
            touch(dir.path(), name);
        }
        let first = relatives(Discovery::new(dir.path(), SkipRules::default()));
        let second = relatives(Discovery::new(dir.path(), SkipRules::default()));
        assert_eq!(first, second);
    }

    fn unreadable(discovery: Discovery) -> Vec<PathBuf> {
        discovery
            .filter_map(|c| match c {
                Candidate::Unreadable { path, .. } => Some(path),
                Candidate::File { .. } => None,
            })
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_discovery_follows_symlinks() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "shared/get_user.yml");
        std::fs::create_dir_all(root.join("tools")).unwrap();
        std::os::unix::fs::symlink(root.join("shared/get_user.yml"), root.join("tools/link.yml"))
            .unwrap();
        std::os::unix::fs::symlink(root.join("missing.txt"), root.join("tools/dangling.txt"))
            .unwrap();

        let found = relatives(Discovery::new(root, SkipRules::default()));
        assert_eq!(found, vec!["shared/get_user.yml", "tools/link.yml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_reported_and_walk_continues() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "prompts/p.yml");
        touch(root, "tools/a.yml");
        std::os::unix::fs::symlink(root, root.join("tools/loop")).unwrap();

        let candidates: Vec<Candidate> = Discovery::new(root, SkipRules::default()).collect();
        let files: Vec<&Path> = candidates
            .iter()
            .filter_map(|c| match c {
                Candidate::File { relative, .. } => Some(relative.as_path()),
                Candidate::Unreadable { .. } => None,
            })
            .collect();
        assert_eq!(files, vec![Path::new("prompts/p.yml"), Path::new("tools/a.yml")]);
        assert!(candidates.iter().any(|c| matches!(
            c,
            Candidate::Unreadable { path, .. } if path.ends_with("tools/loop")
        )));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_stop_walk() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "prompts/p.yml");
        touch(root, "tools/a.yml");
        touch(root, "resources/locked/r.yml");
        let locked = root.join("resources/locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still list the directory
        let enforced = std::fs::read_dir(&locked).is_err();

        let unreadable_paths = unreadable(Discovery::new(root, SkipRules::default()));
        let found = relatives(Discovery::new(root, SkipRules::default()));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&"prompts/p.yml".to_string()));
        assert!(found.contains(&"tools/a.yml".to_string()));
        if enforced {
            assert_eq!(unreadable_paths, vec![locked]);
        }
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::Dbt.to_string(), "dbt file");
        assert_eq!(
            SkipReason::Directory("venv".to_string()).to_string(),
            "inside 'venv'"
        );
    }
}
