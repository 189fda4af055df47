//! Source discovery: walk directory trees and collect Python source files
//! (`.py` and `.pyi`).
//!
//! The walker honours `.gitignore`/`.ignore`, skips hidden entries, and
//! prunes the directories in [`ALWAYS_EXCLUDE`] plus any name the caller
//! passes in `exclude`.  Pruning happens at the directory, so excluded
//! trees are never descended into.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

/// Virtual-environment, cache and build directories that never hold
/// project sources.
const ALWAYS_EXCLUDE: &[&str] = &[
    "venv",
    "env",
    ".venv",
    "virtualenv",
    "__pycache__",
    ".mypy_cache",
    ".ruff_cache",
    ".pytest_cache",
    "build",
    "dist",
    ".eggs",
    ".git",
    ".hg",
    "node_modules",
    ".tox",
    ".nox",
];

const SOURCE_EXTENSIONS: &[&str] = &["py", "pyi"];

pub fn is_python_source(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// All Python sources under `root`, sorted.  A component whose name equals
/// an entry of `exclude` removes that entry and everything below it.
pub fn discover_sources(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let exclude = exclude.to_vec();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !ALWAYS_EXCLUDE.contains(&name.as_ref()) && !exclude.iter().any(|ex| *ex == name)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_some_and(|t| t.is_file()) && is_python_source(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Expand command-line paths: files are taken as given, directories are
/// walked.
pub fn collect_inputs(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else {
            files.extend(discover_sources(path, exclude)?);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn discover(root: &Path, exclude: &[&str]) -> Vec<String> {
        let ex: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        discover_sources(root, &ex)
            .unwrap()
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_finds_sources_and_stubs_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.py"), "x = 1").unwrap();
        fs::write(dir.path().join("a.pyi"), "def f() -> int: ...").unwrap();
        fs::write(dir.path().join("notes.txt"), "not python").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.py"), "y = 2").unwrap();

        assert_eq!(discover(dir.path(), &[]), vec!["a.pyi", "b.py", "sub/c.py"]);
    }

    #[test]
    fn test_respects_gitignore() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        fs::create_dir(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("generated/out.py"), "import os").unwrap();
        fs::write(dir.path().join("main.py"), "x = 1").unwrap();

        assert_eq!(discover(dir.path(), &[]), vec!["main.py"]);
    }

    #[test]
    fn test_skips_hidden_and_environment_directories() {
        let dir = TempDir::new().unwrap();
        for sub in [".hidden", "venv/lib", "__pycache__", "node_modules/pkg"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("x.py"), "import os").unwrap();
        }
        fs::write(dir.path().join("app.py"), "x = 1").unwrap();

        assert_eq!(discover(dir.path(), &[]), vec!["app.py"]);
    }

    #[test]
    fn test_caller_exclude_prunes_whole_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tests/unit")).unwrap();
        fs::write(dir.path().join("tests/unit/test_foo.py"), "import os").unwrap();
        fs::create_dir(dir.path().join("testsuite")).unwrap();
        fs::write(dir.path().join("testsuite/run.py"), "x = 1").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1").unwrap();

        // Exact name match: `testsuite` is kept.
        assert_eq!(
            discover(dir.path(), &["tests"]),
            vec!["app.py", "testsuite/run.py"]
        );
    }

    #[test]
    fn test_collect_inputs_takes_files_as_given() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("script");
        fs::write(&script, "x = 1").unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/m.py"), "y = 2").unwrap();

        let inputs = collect_inputs(&[script.clone(), dir.path().join("pkg")], &[]).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0], script);
    }
}
