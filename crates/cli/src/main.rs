// Command-line front end for the static analysis and AOT compilation core.
//
// Reads a project's pre-parsed facts off disk (one `*.facts.json` per source
// file, each the JSON form of `warp_semantic_core::facts::host_ast::HostFile`
// — this crate does not parse TS/JS itself, see `warp_semantic_core::pipeline`)
// plus its `.html` templates, and drives `discover_project_semantics`/
// `compile_template` over them.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use warp_semantic_core::eval::FailOnFiles;
use warp_semantic_core::exports::ModuleResolver;
use warp_semantic_core::facts::host_ast::HostFile;
use warp_semantic_core::pipeline::{self, DiscoverOptions, ResolutionResult};
use warp_semantic_core::registration;
use warp_semantic_core::snapshot::{SemanticSnapshot, SnapshotSymbol, SymbolOrigin};
use warp_semantic_core::source::NormalizedPath;
use warp_semantic_core::template::attr_pattern::AttributePatternRegistry;

#[derive(Parser)]
#[command(name = "warpc")]
#[command(about = "Static analysis and AOT compilation core", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run resource discovery over a project directory and print the
    /// resulting resource graph and diagnostics.
    Discover {
        /// Project root (searched recursively for `*.facts.json`)
        #[arg(value_name = "DIR")]
        project: PathBuf,

        /// Print the resource graph as JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Discover a project, then compile one template against its resource
    /// graph and print the resulting plan.
    Compile {
        /// Project root (searched recursively for `*.facts.json`)
        #[arg(value_name = "DIR")]
        project: PathBuf,

        /// Template file to compile
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Resource scope to compile against (defaults to the root scope)
        #[arg(long, default_value = "root")]
        scope: String,

        /// Print the emitted instruction/expression contract instead of the plan
        #[arg(long)]
        emit: bool,
    },

    /// Discover a project and fail with a nonzero exit code if any error
    /// diagnostics were produced.
    Check {
        /// Project root (searched recursively for `*.facts.json`)
        #[arg(value_name = "DIR")]
        project: PathBuf,
    },

    /// Discover a project and print its stable semantic snapshot.
    Snapshot {
        /// Project root (searched recursively for `*.facts.json`)
        #[arg(value_name = "DIR")]
        project: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { project, json } => discover(&project, json),
        Commands::Compile { project, template, scope, emit } => compile(&project, &template, &scope, emit),
        Commands::Check { project } => check(&project),
        Commands::Snapshot { project } => snapshot(&project),
        Commands::Version => {
            println!("warpc {}", env!("CARGO_PKG_VERSION"));
            println!("warp-semantic-core {}", warp_semantic_core::VERSION);
            Ok(())
        }
    }
}

/// Resolves relative specifiers (`./foo`, `../bar`) against the set of
/// `*.facts.json`-discovered project files, trying `.ts`/`.js`/`/index.ts`
/// the way a bundler resolver would. Bare specifiers (package imports) are
/// left unresolved — they are outside the project (spec §6.2 "the core does
/// not implement a general module resolver").
struct ProjectResolver {
    known: HashSet<NormalizedPath>,
}

impl ModuleResolver for ProjectResolver {
    fn resolve(&self, specifier: &str, from_file: &NormalizedPath) -> Option<NormalizedPath> {
        if !specifier.starts_with('.') {
            return None;
        }
        let base = parent_dir(from_file.as_str());
        let joined = format!("{base}/{specifier}");
        for candidate in [joined.clone(), format!("{joined}.ts"), format!("{joined}.js"), format!("{joined}/index.ts")] {
            let normalized = NormalizedPath::new(&candidate);
            if self.known.contains(&normalized) {
                return Some(normalized);
            }
        }
        None
    }
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => String::new(),
    }
}

fn to_disk_path(project: &Path, normalized: &NormalizedPath) -> PathBuf {
    project.join(normalized.as_str().trim_start_matches('/'))
}

/// Read every `*.facts.json` under `project` into a `HostFile` map.
fn load_sources(project: &Path) -> Result<HashMap<NormalizedPath, HostFile>> {
    let pattern = project.join("**/*.facts.json");
    let mut sources = HashMap::new();
    for entry in glob::glob(&pattern.to_string_lossy()).context("invalid project glob pattern")? {
        let path = entry.context("failed to read a directory entry while globbing")?;
        let text = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let file: HostFile = serde_json::from_str(&text).with_context(|| format!("failed to parse {} as host facts JSON", path.display()))?;
        sources.insert(file.path.clone(), file);
    }
    Ok(sources)
}

fn run_discovery(project: &Path) -> Result<ResolutionResult> {
    let sources = load_sources(project)?;
    let resolver = ProjectResolver { known: sources.keys().cloned().collect() };
    let sibling_html_exists = |path: &NormalizedPath| to_disk_path(project, &path.with_extension("html")).exists();
    let options = DiscoverOptions {
        resolver: &resolver,
        sibling_html_exists: &sibling_html_exists,
        fail_on_files: FailOnFiles::new(),
        root_builtins: registration::builtin_root_collections(),
    };
    Ok(pipeline::discover_project_semantics(&sources, options))
}

fn discover(project: &Path, json: bool) -> Result<()> {
    let result = run_discovery(project)?;

    if json {
        let scopes: HashMap<&str, usize> = result.resource_graph.scopes.iter().map(|(id, s)| (id.as_str(), s.collections.elements.len() + s.collections.attributes.len() + s.collections.controllers.len())).collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "resources": result.resources.len(),
            "orphans": result.resource_graph.orphans.len(),
            "scopes": scopes,
            "diagnostics": result.diagnostics.to_json(),
        }))?);
        return Ok(());
    }

    println!("resources discovered: {}", result.resources.len());
    println!("scopes: {}", result.resource_graph.scopes.len());
    if !result.resource_graph.orphans.is_empty() {
        println!("orphaned (never registered):");
        for (file, name) in &result.resource_graph.orphans {
            println!("  {name} in {file}");
        }
    }
    print_diagnostics(&result.diagnostics);
    Ok(())
}

fn compile(project: &Path, template: &Path, scope: &str, emit_output: bool) -> Result<()> {
    let result = run_discovery(project)?;
    let html = fs::read_to_string(template).with_context(|| format!("failed to read template {}", template.display()))?;
    let registry = AttributePatternRegistry::new();
    let compiled = pipeline::compile_template(&html, scope, &result.resource_graph, &registry);

    if emit_output {
        let output = warp_aot_codegen::emit(&compiled.plan);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&compiled.plan)?);
    }

    if !compiled.diagnostics.is_empty() {
        eprintln!("{}", compiled.diagnostics.format_terminal_colored(&html, &template.to_string_lossy()));
    }
    if compiled.diagnostics.has_errors() {
        anyhow::bail!("compilation produced {} error(s)", compiled.diagnostics.error_count());
    }
    Ok(())
}

fn check(project: &Path) -> Result<()> {
    let result = run_discovery(project)?;
    print_diagnostics(&result.diagnostics);
    if result.diagnostics.has_errors() {
        anyhow::bail!("{}", warp_semantic_core::diagnostic::format_summary(result.diagnostics.error_count(), result.diagnostics.warning_count()));
    }
    println!("✓ {} OK ({} resources)", project.display(), result.resources.len());
    Ok(())
}

fn snapshot(project: &Path) -> Result<()> {
    let result = run_discovery(project)?;

    let mut symbols = Vec::new();
    let mut scope_of = Vec::new();
    for (scope_id, scope) in &result.resource_graph.scopes {
        for bucket in [&scope.collections.elements, &scope.collections.attributes, &scope.collections.controllers, &scope.collections.value_converters, &scope.collections.binding_behaviors] {
            for def in bucket.values() {
                let symbol = SnapshotSymbol::from_resource(def, SymbolOrigin::Analysis);
                scope_of.push((symbol.id.clone(), scope_id.clone()));
                symbols.push(symbol);
            }
        }
    }
    let orphan_ids: Vec<String> = result
        .resource_graph
        .orphans
        .iter()
        .filter_map(|(file, name)| result.resources.get(&(file.clone(), name.clone())))
        .map(|def| SnapshotSymbol::from_resource(def, SymbolOrigin::Analysis).id)
        .collect();

    let doc = SemanticSnapshot::new(symbols, scope_of, orphan_ids);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn print_diagnostics(diagnostics: &warp_semantic_core::Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let code = diagnostic.code.as_deref().unwrap_or("-");
        println!("{}[{}]: {}", diagnostic.severity.as_str(), code, diagnostic.message);
    }
    print!("{}", warp_semantic_core::diagnostic::format_summary(diagnostics.error_count(), diagnostics.warning_count()));
}

