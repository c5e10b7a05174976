// Project state and cache types
//
// The server's `ProjectState` owns the incremental dependency graph (spec
// §4.8) at file granularity: every `*.facts.json`/`.html` file on disk gets a
// `NodeKey::File` node, and a single `NodeKey::Conclusion` node stands in for
// "the project's last full discovery" depending on every one of them. An
// edit pushes staleness with `mark_file_stale`; the next read pulls the
// conclusion node, re-running `discover_project_semantics` only if it is
// still marked stale, and only if the recomputed fingerprint actually
// differs does a result get treated as changed for anyone watching it.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::RwLock;

use crate::events::CompilationEvent;
use warp_semantic_core::eval::FailOnFiles;
use warp_semantic_core::exports::ModuleResolver;
use warp_semantic_core::facts::host_ast::HostFile;
use warp_semantic_core::incremental::{Graph, NodeKey};
use warp_semantic_core::pipeline::{self, DiscoverOptions, ResolutionResult};
use warp_semantic_core::registration;
use warp_semantic_core::source::NormalizedPath;
use warp_semantic_core::template::attr_pattern::AttributePatternRegistry;

/// Shared state wrapper for async access
pub type SharedState = Arc<RwLock<ProjectState>>;

const PROJECT_RESOURCE_KEY: &str = "project";
const PROJECT_FIELD_PATH: &str = "discovery";

/// Resolves relative specifiers (`./foo`, `../bar`) against the project's
/// known `*.facts.json`-discovered files, the way a bundler resolver would.
/// Bare specifiers are left unresolved: they name a package outside the
/// project (spec §6.2 "the core does not implement a general module
/// resolver").
pub struct ProjectResolver {
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

/// Translate a project-relative `NormalizedPath` to the file this host
/// actually reads/writes (the project root is the filesystem anchor a
/// `NormalizedPath` is otherwise agnostic to).
pub fn to_disk_path(root: &Path, normalized: &NormalizedPath) -> PathBuf {
    root.join(normalized.as_str().trim_start_matches('/'))
}

fn glob_entries(root: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let full = root.join(pattern);
    let entries = glob::glob(&full.to_string_lossy())?.filter_map(Result::ok).collect();
    Ok(entries)
}

/// Main project analysis state: discovered facts/templates, the incremental
/// graph tracking what's stale, and the last full discovery.
pub struct ProjectState {
    /// Project root directory
    pub root: PathBuf,
    /// `*.facts.json` sources, keyed by the normalized path embedded in each one
    pub sources: HashMap<NormalizedPath, HostFile>,
    /// Disk path each source was loaded from, for re-reads on notify
    pub facts_disk_paths: HashMap<NormalizedPath, PathBuf>,
    /// Template (`.html`) disk paths, keyed by normalized path
    pub templates: HashMap<NormalizedPath, PathBuf>,
    /// The incremental dependency graph (spec §4.8)
    pub graph: Graph,
    /// The last full discovery, if the project node has ever been pulled
    pub resolution: Option<ResolutionResult>,
    /// Attribute pattern registry templates are lowered against
    pub registry: AttributePatternRegistry,
    /// Bumped every time `ensure_resolution` actually recomputes
    pub generation: u64,
    /// Broadcast sender for `/events` subscribers
    pub events: broadcast::Sender<CompilationEvent>,
}

impl ProjectState {
    pub fn new(root: PathBuf) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            root,
            sources: HashMap::new(),
            facts_disk_paths: HashMap::new(),
            templates: HashMap::new(),
            graph: Graph::new(),
            resolution: None,
            registry: AttributePatternRegistry::new(),
            generation: 0,
            events,
        }
    }

    /// Broadcast an event to any connected `/events` subscribers; silently
    /// dropped if nobody is listening (`broadcast::Sender::send` errors only
    /// when there are zero receivers).
    pub fn emit(&self, event: CompilationEvent) {
        let _ = self.events.send(event);
    }

    fn project_node() -> NodeKey {
        NodeKey::Conclusion { resource_key: PROJECT_RESOURCE_KEY.to_string(), field_path: PROJECT_FIELD_PATH.to_string() }
    }

    /// Scan `root` for `*.facts.json` and `*.html` files, replacing the
    /// current source/template sets and wiring every file into the project
    /// node's dependencies, so any one of them changing invalidates the next
    /// `ensure_resolution` call.
    pub fn load_all(&mut self) -> anyhow::Result<()> {
        self.sources.clear();
        self.facts_disk_paths.clear();
        self.templates.clear();

        let project_key = Self::project_node();
        self.graph.ensure_node(&project_key);

        for disk_path in glob_entries(&self.root, "**/*.facts.json")? {
            let text = std::fs::read_to_string(&disk_path)?;
            let file: HostFile = serde_json::from_str(&text)?;
            let key = file.path.clone();
            let file_node = NodeKey::File(key.clone());
            self.graph.ensure_node(&file_node);
            let _ = self.graph.add_dependency(&project_key, &file_node);
            self.graph.mark_file_stale(&key);
            self.facts_disk_paths.insert(key.clone(), disk_path);
            self.sources.insert(key, file);
        }

        for disk_path in glob_entries(&self.root, "**/*.html")? {
            let relative = disk_path.strip_prefix(&self.root).unwrap_or(&disk_path);
            let key = NormalizedPath::new(format!("/{}", relative.to_string_lossy()));
            let file_node = NodeKey::File(key.clone());
            self.graph.ensure_node(&file_node);
            let _ = self.graph.add_dependency(&project_key, &file_node);
            self.graph.mark_file_stale(&key);
            self.templates.insert(key, disk_path);
        }

        Ok(())
    }

    /// Re-derive the project's resolution if (and only if) the project node
    /// is still stale, per spec §4.8's pull semantics.
    pub fn ensure_resolution(&mut self) -> &ResolutionResult {
        let project_key = Self::project_node();
        if self.graph.is_stale(&project_key) || self.resolution.is_none() {
            let resolver = ProjectResolver { known: self.sources.keys().cloned().collect() };
            let root = self.root.clone();
            let sources = &self.sources;
            let result = pipeline::discover_project_semantics(
                sources,
                DiscoverOptions {
                    resolver: &resolver,
                    sibling_html_exists: &|path| to_disk_path(&root, &path.with_extension("html")).exists(),
                    fail_on_files: FailOnFiles::new(),
                    root_builtins: registration::builtin_root_collections(),
                },
            );
            let fingerprint = fingerprint_resolution(&result);
            self.graph.pull(&project_key, || fingerprint);
            self.resolution = Some(result);
            self.generation += 1;
        }
        self.resolution.as_ref().expect("just computed above")
    }

    /// Re-read one file from disk after a host-reported edit, pushing
    /// staleness down from it (spec §4.8 "push"). Returns `true` if the path
    /// was a tracked file.
    pub fn notify_changed(&mut self, disk_path: &Path) -> anyhow::Result<bool> {
        let is_facts = disk_path.to_string_lossy().ends_with(".facts.json");
        if is_facts {
            let text = std::fs::read_to_string(disk_path)?;
            let file: HostFile = serde_json::from_str(&text)?;
            let key = file.path.clone();
            self.graph.ensure_node(&NodeKey::File(key.clone()));
            self.facts_disk_paths.insert(key.clone(), disk_path.to_path_buf());
            self.sources.insert(key.clone(), file);
            self.graph.mark_file_stale(&key);
            return Ok(true);
        }

        if disk_path.extension().map(|e| e == "html").unwrap_or(false) {
            let relative = disk_path.strip_prefix(&self.root).unwrap_or(disk_path);
            let key = NormalizedPath::new(format!("/{}", relative.to_string_lossy()));
            self.graph.ensure_node(&NodeKey::File(key.clone()));
            self.templates.insert(key.clone(), disk_path.to_path_buf());
            self.graph.mark_file_stale(&key);
            return Ok(true);
        }

        Ok(false)
    }

    /// Forget a deleted file (spec §4.8 `remove_file`).
    pub fn notify_removed(&mut self, disk_path: &Path) {
        if let Some(key) = self.facts_disk_paths.iter().find(|(_, p)| p.as_path() == disk_path).map(|(k, _)| k.clone()) {
            self.sources.remove(&key);
            self.facts_disk_paths.remove(&key);
            self.graph.remove_file(&key);
        }
        if let Some(key) = self.templates.iter().find(|(_, p)| p.as_path() == disk_path).map(|(k, _)| k.clone()) {
            self.templates.remove(&key);
            self.graph.remove_file(&key);
        }
    }

    pub fn error_count(&self) -> usize {
        self.resolution.as_ref().map(|r| r.diagnostics.error_count()).unwrap_or(0)
    }
}

/// A coarse content fingerprint for the project node's green token: every
/// converged resource's `(file, className)` key plus the orphan/diagnostic
/// counts. Sufficient to detect "nothing meaningful changed" without the
/// project node having to mirror the full field-by-field conclusion
/// granularity spec §4.8 describes for a single resource.
fn fingerprint_resolution(result: &ResolutionResult) -> Vec<u8> {
    let mut keys: Vec<String> = result.resources.keys().map(|(file, name)| format!("{file}#{name}")).collect();
    keys.sort();
    let mut bytes = keys.join("\n").into_bytes();
    bytes.extend_from_slice(format!("|orphans={}|diagnostics={}", result.resource_graph.orphans.len(), result.diagnostics.len()).as_bytes());
    bytes
}
