//! File driver: read and parse a set of files in parallel, collecting the
//! first syntax error of each.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::parser::{ParseOptions, parse_with_options};
use crate::types::Diagnostic;

/// Outcome of checking a batch of files.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub files_checked: usize,
    /// At most one per file, sorted by file then position.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse every file in `files`.  Any unreadable file aborts the whole
/// batch; syntax errors are collected.
pub fn check_files(files: &[PathBuf], options: &ParseOptions) -> Result<CheckReport> {
    let results: Vec<Option<Diagnostic>> = files
        .par_iter()
        .map(|path| check_file(path, options))
        .collect::<Result<_>>()?;

    let mut diagnostics: Vec<Diagnostic> = results.into_iter().flatten().collect();
    diagnostics.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.col.cmp(&b.col))
    });

    Ok(CheckReport {
        files_checked: files.len(),
        diagnostics,
    })
}

pub fn check_file(path: &Path, options: &ParseOptions) -> Result<Option<Diagnostic>> {
    let source = read_source(path)?;
    Ok(check_source(&source, &path.to_string_lossy(), options))
}

/// Parse `source`; `None` when it is syntactically valid.
pub fn check_source(source: &str, filename: &str, options: &ParseOptions) -> Option<Diagnostic> {
    parse_with_options(source, options)
        .err()
        .map(|e| Diagnostic::from_syntax_error(filename, &e))
}

/// The syntax tree of `path` as pretty-printed JSON.
pub fn render_tree(path: &Path, options: &ParseOptions) -> Result<std::result::Result<String, Diagnostic>> {
    let source = read_source(path)?;
    match parse_with_options(&source, options) {
        Ok(tree) => Ok(Ok(serde_json::to_string_pretty(&tree)?)),
        Err(e) => Ok(Err(Diagnostic::from_syntax_error(&path.to_string_lossy(), &e))),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
