use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;
use serde_json::json;

use pysyntax::check::{check_files, render_tree};
use pysyntax::discovery::collect_inputs;
use pysyntax::types::Diagnostic;
use pysyntax::{MixedIndentation, ParseOptions};

#[derive(Parser)]
#[command(
    name = "pysyntax",
    about = "Fast Python syntax checker",
    version,
    long_about = "pysyntax parses Python sources into a concrete syntax tree and reports \
                  the first syntax error in each file: inconsistent indentation, \
                  unterminated strings and brackets, bad escapes and unexpected tokens."
)]
struct Cli {
    /// Paths to check (files or directories).
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Column multiple a tab advances to when measuring indentation.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    tab_width: u16,

    /// Report an IndentationError for leading whitespace that mixes tabs and
    /// spaces.
    #[arg(long)]
    reject_mixed_indentation: bool,

    /// Skip directories or files with any of the given comma-separated names
    /// (e.g. --exclude tests,migrations).  Hidden and virtual-environment
    /// directories are always skipped.
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Emit results as JSON instead of the default text format.
    #[arg(long)]
    json: bool,

    /// Print the syntax tree of each file as JSON instead of checking.
    #[arg(long, conflicts_with = "json")]
    tree: bool,

    /// Exit with code 0 even when syntax errors are found.
    #[arg(long)]
    no_exit_code: bool,
}

fn main() {
    let cli = Cli::parse();

    let options = ParseOptions {
        tab_width: cli.tab_width as usize,
        mixed_indentation: if cli.reject_mixed_indentation {
            MixedIndentation::Reject
        } else {
            MixedIndentation::Allow
        },
    };
    let exclude: Vec<String> = cli.exclude.unwrap_or_default();

    // ── file discovery ────────────────────────────────────────────────────────
    let files = match collect_inputs(&cli.paths, &exclude) {
        Ok(files) => files,
        Err(e) => fail(e),
    };

    // ── tree dump ─────────────────────────────────────────────────────────────
    if cli.tree {
        let mut errors = 0usize;
        for path in &files {
            match render_tree(path, &options) {
                Ok(Ok(tree)) => println!("{tree}"),
                Ok(Err(d)) => {
                    eprintln!("{}: {d}", "error".red().bold());
                    errors += 1;
                }
                Err(e) => fail(e),
            }
        }
        if errors > 0 && !cli.no_exit_code {
            process::exit(1);
        }
        return;
    }

    // ── check ─────────────────────────────────────────────────────────────────
    let report = match check_files(&files, &options) {
        Ok(report) => report,
        Err(e) => fail(e),
    };
    let diagnostics = &report.diagnostics;

    // ── output ────────────────────────────────────────────────────────────────
    if cli.json {
        print_json(report.files_checked, diagnostics);
    } else {
        for d in diagnostics {
            println!("{d}");
        }
        let checked = report.files_checked;
        if diagnostics.is_empty() {
            println!("{}", format!("No syntax errors in {checked} file(s)").green());
        } else {
            let count = diagnostics.len();
            println!(
                "{}",
                format!("Found {count} syntax error(s) in {checked} file(s)")
                    .yellow()
                    .bold()
            );
        }
    }

    // ── exit code ─────────────────────────────────────────────────────────────
    if !cli.no_exit_code && !diagnostics.is_empty() {
        process::exit(1);
    }
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("{}: {e:#}", "error".red().bold());
    process::exit(2);
}

/// Emit valid, well-formatted JSON using serde_json.
fn print_json(files_checked: usize, diagnostics: &[Diagnostic]) {
    let items: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|d| {
            json!({
                "file":    d.file,
                "line":    d.line,
                "col":     d.col,
                "kind":    d.kind.to_string(),
                "message": d.message,
                "text":    d.offending_text,
            })
        })
        .collect();

    let output = json!({
        "diagnostics":   items,
        "count":         diagnostics.len(),
        "files_checked": files_checked,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).expect("serde_json::Value is always serialisable")
    );
}
