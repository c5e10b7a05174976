use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use warp_semantic_core::registration::{builtin_root_collections, ResourceGraph, ResourceScope, ROOT_SCOPE_ID};
use warp_semantic_core::template::attr_pattern::AttributePatternRegistry;

#[derive(Parser)]
#[command(name = "warp-test")]
#[command(about = "Golden-file test runner for the Warp compiler")]
struct Cli {
    /// Optional filter pattern (e.g., "link/containerless" or "repeat")
    filter: Option<String>,

    /// Update expected output files with actual results
    #[arg(long)]
    update: bool,

    /// Show detailed diff on failures
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug)]
enum TestKind {
    Plan { expected: PathBuf },
    Emit { expected: PathBuf },
    Diagnostics { expected: PathBuf },
    Wip,
}

#[derive(Debug)]
struct TestCase {
    name: String,
    source_path: PathBuf,
    kind: TestKind,
}

#[derive(Debug)]
enum TestResult {
    Passed,
    Failed { message: String, diff: Option<String> },
    Skipped { reason: String },
}

fn main() {
    let cli = Cli::parse();

    let tests_dir = find_tests_dir();
    if !tests_dir.exists() {
        eprintln!("{} test-data directory not found: {}", "error:".red().bold(), tests_dir.display());
        std::process::exit(1);
    }

    let test_cases = discover_tests(&tests_dir, cli.filter.as_deref());
    if test_cases.is_empty() {
        println!("{}", "No test cases found.".yellow());
        std::process::exit(0);
    }

    println!("{} {} test case(s)\n", "Running".green().bold(), test_cases.len());

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for test in &test_cases {
        let result = run_test(test, cli.update);

        match &result {
            TestResult::Passed => {
                println!("  {} {}", "PASS".green(), test.name);
                passed += 1;
            }
            TestResult::Failed { message, diff } => {
                println!("  {} {}", "FAIL".red(), test.name);
                println!("       {}", message);
                if cli.verbose {
                    if let Some(d) = diff {
                        println!("{}", d);
                    }
                }
                failed += 1;
            }
            TestResult::Skipped { reason } => {
                println!("  {} {} ({})", "SKIP".yellow(), test.name, reason);
                skipped += 1;
            }
        }
    }

    println!();
    println!("Results: {} passed, {} failed, {} skipped", passed.to_string().green(), failed.to_string().red(), skipped.to_string().yellow());

    if failed > 0 {
        std::process::exit(1);
    }
}

fn find_tests_dir() -> PathBuf {
    let candidates = [PathBuf::from("crates/test-harness/test-data"), PathBuf::from("test-data"), PathBuf::from("../test-data")];
    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }
    PathBuf::from("crates/test-harness/test-data")
}

/// A fixture is one `.html` template. Its sibling `.plan.json` (expected
/// plan, for templates that link and emit cleanly), `.emit.json` (expected
/// AOT instruction/expression contract, one level past the plan), or
/// `.diagnostics.txt` (expected diagnostic listing, for fixtures that
/// exercise a recoverable error) decides how it is checked; a fixture with
/// none of the three is WIP and only runs under `--update`.
fn discover_tests(tests_dir: &Path, filter: Option<&str>) -> Vec<TestCase> {
    let mut tests = Vec::new();

    for entry in WalkDir::new(tests_dir).into_iter().filter_map(|e| e.ok()).filter(|e| e.path().extension().map_or(false, |ext| ext == "html")) {
        let source_path = entry.path().to_path_buf();

        let name = source_path.strip_prefix(tests_dir).unwrap_or(&source_path).with_extension("").to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");

        if let Some(f) = filter {
            if !name.contains(f) {
                continue;
            }
        }

        let plan_path = with_suffix(&source_path, "plan.json");
        let emit_path = with_suffix(&source_path, "emit.json");
        let diag_path = with_suffix(&source_path, "diagnostics.txt");

        let kind = if plan_path.exists() {
            TestKind::Plan { expected: plan_path }
        } else if emit_path.exists() {
            TestKind::Emit { expected: emit_path }
        } else if diag_path.exists() {
            TestKind::Diagnostics { expected: diag_path }
        } else {
            TestKind::Wip
        };

        tests.push(TestCase { name, source_path, kind });
    }

    tests.sort_by(|a, b| a.name.cmp(&b.name));
    tests
}

fn with_suffix(html_path: &Path, suffix: &str) -> PathBuf {
    let mut name = html_path.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    html_path.with_file_name(name)
}

fn run_test(test: &TestCase, update: bool) -> TestResult {
    match &test.kind {
        TestKind::Wip => {
            if update {
                run_wip_test(test)
            } else {
                TestResult::Skipped { reason: "no expected output file".to_string() }
            }
        }
        TestKind::Plan { expected } => run_plan_test(test, expected, update),
        TestKind::Emit { expected } => run_emit_test(test, expected, update),
        TestKind::Diagnostics { expected } => run_diagnostics_test(test, expected, update),
    }
}

/// A compiled template, against the built-in root scope only: a fixture
/// exercising an unregistered custom element always sees the `E0601`
/// `unknown custom element` diagnostic rather than a resolved one.
fn root_only_graph() -> ResourceGraph {
    let mut scopes = std::collections::HashMap::new();
    scopes.insert(ROOT_SCOPE_ID.to_string(), ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: builtin_root_collections() });
    ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
}

fn compile_fixture(source: &str) -> warp_semantic_core::pipeline::CompiledTemplate {
    let registry = AttributePatternRegistry::new();
    let graph = root_only_graph();
    warp_semantic_core::pipeline::compile_template(source, ROOT_SCOPE_ID, &graph, &registry)
}

fn render_diagnostics(diagnostics: &warp_semantic_core::Diagnostics) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics.iter() {
        let code = diagnostic.code.as_deref().unwrap_or("-");
        out.push_str(&format!("{}[{}]: {}\n", diagnostic.severity.as_str(), code, diagnostic.message));
    }
    out
}

fn run_wip_test(test: &TestCase) -> TestResult {
    let source = match fs::read_to_string(&test.source_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read source: {e}"), diff: None },
    };

    let compiled = compile_fixture(&source);

    if compiled.diagnostics.has_errors() {
        let rendered = render_diagnostics(&compiled.diagnostics);
        let path = with_suffix(&test.source_path, "diagnostics.txt");
        if let Err(e) = fs::write(&path, &rendered) {
            return TestResult::Failed { message: format!("failed to write diagnostics file: {e}"), diff: None };
        }
    } else {
        let json = match serde_json::to_string_pretty(&compiled.plan) {
            Ok(j) => j,
            Err(e) => return TestResult::Failed { message: format!("failed to serialize plan: {e}"), diff: None },
        };
        let path = with_suffix(&test.source_path, "plan.json");
        if let Err(e) = fs::write(&path, &json) {
            return TestResult::Failed { message: format!("failed to write plan file: {e}"), diff: None };
        }
    }
    TestResult::Passed
}

fn run_plan_test(test: &TestCase, expected_path: &Path, update: bool) -> TestResult {
    let source = match fs::read_to_string(&test.source_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read source: {e}"), diff: None },
    };

    let compiled = compile_fixture(&source);
    if compiled.diagnostics.has_errors() {
        return TestResult::Failed {
            message: format!("expected a clean plan but compilation produced {} error(s)", compiled.diagnostics.error_count()),
            diff: Some(render_diagnostics(&compiled.diagnostics)),
        };
    }

    let actual_json = match serde_json::to_string_pretty(&compiled.plan) {
        Ok(j) => j,
        Err(e) => return TestResult::Failed { message: format!("failed to serialize plan: {e}"), diff: None },
    };

    if update {
        return match fs::write(expected_path, &actual_json) {
            Ok(()) => TestResult::Passed,
            Err(e) => TestResult::Failed { message: format!("failed to update expected file: {e}"), diff: None },
        };
    }

    let expected_json = match fs::read_to_string(expected_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read expected plan: {e}"), diff: None },
    };

    if normalize_json(&actual_json) == normalize_json(&expected_json) {
        TestResult::Passed
    } else {
        TestResult::Failed { message: "plan mismatch".to_string(), diff: Some(generate_diff(&expected_json, &actual_json)) }
    }
}

fn run_emit_test(test: &TestCase, expected_path: &Path, update: bool) -> TestResult {
    let source = match fs::read_to_string(&test.source_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read source: {e}"), diff: None },
    };

    let compiled = compile_fixture(&source);
    if compiled.diagnostics.has_errors() {
        return TestResult::Failed {
            message: format!("expected a clean emit but compilation produced {} error(s)", compiled.diagnostics.error_count()),
            diff: Some(render_diagnostics(&compiled.diagnostics)),
        };
    }

    let output = warp_aot_codegen::emit(&compiled.plan);
    let actual_json = match serde_json::to_string_pretty(&output) {
        Ok(j) => j,
        Err(e) => return TestResult::Failed { message: format!("failed to serialize emit output: {e}"), diff: None },
    };

    if update {
        return match fs::write(expected_path, &actual_json) {
            Ok(()) => TestResult::Passed,
            Err(e) => TestResult::Failed { message: format!("failed to update expected file: {e}"), diff: None },
        };
    }

    let expected_json = match fs::read_to_string(expected_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read expected emit output: {e}"), diff: None },
    };

    if normalize_json(&actual_json) == normalize_json(&expected_json) {
        TestResult::Passed
    } else {
        TestResult::Failed { message: "emit mismatch".to_string(), diff: Some(generate_diff(&expected_json, &actual_json)) }
    }
}

fn run_diagnostics_test(test: &TestCase, expected_path: &Path, update: bool) -> TestResult {
    let source = match fs::read_to_string(&test.source_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read source: {e}"), diff: None },
    };

    let compiled = compile_fixture(&source);
    let actual = render_diagnostics(&compiled.diagnostics);

    if update {
        return match fs::write(expected_path, &actual) {
            Ok(()) => TestResult::Passed,
            Err(e) => TestResult::Failed { message: format!("failed to update expected file: {e}"), diff: None },
        };
    }

    let expected = match fs::read_to_string(expected_path) {
        Ok(s) => s,
        Err(e) => return TestResult::Failed { message: format!("failed to read expected diagnostics: {e}"), diff: None },
    };

    if actual.trim() == expected.trim() {
        TestResult::Passed
    } else {
        TestResult::Failed { message: "diagnostics mismatch".to_string(), diff: Some(generate_diff(&expected, &actual)) }
    }
}

fn normalize_json(json: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(v) => serde_json::to_string(&v).unwrap_or_else(|_| json.to_string()),
        Err(_) => json.to_string(),
    }
}

fn generate_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut result = String::new();

    result.push_str("       --- expected\n");
    result.push_str("       +++ actual\n");

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        result.push_str(&format!("       {}{}", sign, change));
    }

    result
}
