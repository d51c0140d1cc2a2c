//! Hygiene: source-level rules for the map engine, checked at test time.
//!
//! Each rule scans the non-test sources under `canvas/src/` for a pattern and
//! holds it to a budget. Budgets only go down.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

// Panics: a bad scene or a missed event must never take the page down.
const MAX_UNWRAP: usize = 0;
const MAX_EXPECT: usize = 0;
const MAX_PANIC: usize = 0;
const MAX_UNREACHABLE: usize = 0;
const MAX_TODO: usize = 0;
const MAX_UNIMPLEMENTED: usize = 0;

// Silent loss: errors are logged or returned, not dropped.
const MAX_SILENT_DISCARD: usize = 0;
const MAX_DOT_OK: usize = 0;
const MAX_ALLOW_DEAD_CODE: usize = 0;

// Output goes through `tracing`.
const MAX_PRINT: usize = 0;

// Time comes from the host; the engine never reads a clock.
const MAX_CLOCK_READS: usize = 0;

/// The only file allowed to touch browser APIs.
const BROWSER_GLUE: &str = "engine.rs";

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under `canvas/src/`, excluding `_test.rs` siblings.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        if path.extension().is_none_or(|e| e != "rs") {
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

/// Per-file line counts for lines containing any of `patterns`.
fn hits(files: &[SourceFile], patterns: &[&str]) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file
                .content
                .lines()
                .filter(|line| patterns.iter().any(|p| line.contains(p)))
                .count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

fn check(label: &str, patterns: &[&str], max: usize) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the canvas crate root");
    let found = hits(&files, patterns);
    let count: usize = found.iter().map(|(_, c)| c).sum();
    let listing = found
        .iter()
        .map(|(path, c)| format!("  {path}: {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(count <= max, "{label} budget exceeded: found {count}, max {max}.\n{listing}");
}

#[test]
fn unwrap_budget() {
    check(".unwrap()", &[".unwrap()"], MAX_UNWRAP);
}

#[test]
fn expect_budget() {
    check(".expect()", &[".expect("], MAX_EXPECT);
}

#[test]
fn panic_budget() {
    check("panic!()", &["panic!("], MAX_PANIC);
}

#[test]
fn unreachable_budget() {
    check("unreachable!()", &["unreachable!("], MAX_UNREACHABLE);
}

#[test]
fn todo_budget() {
    check("todo!()", &["todo!("], MAX_TODO);
}

#[test]
fn unimplemented_budget() {
    check("unimplemented!()", &["unimplemented!("], MAX_UNIMPLEMENTED);
}

#[test]
fn silent_discard_budget() {
    check("let _ =", &["let _ ="], MAX_SILENT_DISCARD);
}

#[test]
fn dot_ok_budget() {
    check(".ok()", &[".ok()"], MAX_DOT_OK);
}

#[test]
fn allow_dead_code_budget() {
    check("#[allow(dead_code)]", &["#[allow(dead_code)]"], MAX_ALLOW_DEAD_CODE);
}

#[test]
fn print_budget() {
    check("print", &["println!(", "eprintln!(", "dbg!("], MAX_PRINT);
}

#[test]
fn clock_read_budget() {
    check("clock read", &["Instant::now", "SystemTime::now"], MAX_CLOCK_READS);
}

#[test]
fn browser_apis_stay_in_the_engine_wrapper() {
    let offenders: Vec<String> = source_files()
        .into_iter()
        .filter(|f| !f.path.ends_with(BROWSER_GLUE))
        .filter(|f| ["web_sys", "js_sys", "wasm_bindgen"].iter().any(|p| f.content.contains(p)))
        .map(|f| f.path)
        .collect();
    assert!(offenders.is_empty(), "browser APIs outside {BROWSER_GLUE}: {offenders:?}");
}
