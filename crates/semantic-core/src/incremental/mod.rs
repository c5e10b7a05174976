// The incremental dependency graph (spec §4.8): a four-layer node graph —
// file, eval, observation, conclusion — so an edit only recomputes the
// nodes whose inputs actually changed, not everything downstream of the
// edited file.
//
// Grounded on `semantic::scope::ScopeGraph`'s own "4-layer scoping model:
// local -> parent -> imports -> module" (its own doc comment), generalized
// from a fixed lexical layering to this crate's four computation layers:
//
//   file        one per source file, pushed stale by the host on edit
//   eval        one partial-evaluation unit (spec §4.3) within a file
//   observation one recognizer/registration reading of a resource's field
//   conclusion  one converged definition or registration decision
//
// Edges run conclusion -> observation -> eval -> file, matching the
// pipeline's own data flow (convergence reads evidence, evidence reads
// evaluated values, evaluation reads file facts). `mark_file_stale`/
// `mark_config_stale` push staleness down that chain (spec "push"); `pull`
// re-derives a node on demand and only propagates staleness to its
// dependents if its own content actually changed (spec "value-sensitive
// cutoff" — a green token, not just a stale bit, decides whether a changed
// input was a changed *value*).

use crate::source::NormalizedPath;
use std::collections::{HashMap, HashSet};
use xxhash_rust::xxh3::xxh3_64;

/// The four node layers (spec §4.8). Carried on `Node` for diagnostics and
/// query filtering, not used to constrain which edges may exist — the graph
/// itself is layer-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLayer {
    File,
    Config,
    Eval,
    Observation,
    Conclusion,
}

/// A node's identity, formatted to the exact key strings the spec names so
/// a host can reconstruct a node id from a resource key and field path
/// without going through the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    File(NormalizedPath),
    Config(String),
    Eval { file: NormalizedPath, unit_key: String },
    Observation { resource_key: String, field_path: String, eval_node: String },
    Conclusion { resource_key: String, field_path: String },
}

impl NodeKey {
    pub fn layer(&self) -> NodeLayer {
        match self {
            NodeKey::File(_) => NodeLayer::File,
            NodeKey::Config(_) => NodeLayer::Config,
            NodeKey::Eval { .. } => NodeLayer::Eval,
            NodeKey::Observation { .. } => NodeLayer::Observation,
            NodeKey::Conclusion { .. } => NodeLayer::Conclusion,
        }
    }

    pub fn id(&self) -> String {
        match self {
            NodeKey::File(path) => format!("file:{path}"),
            NodeKey::Config(key) => format!("config:{key}"),
            NodeKey::Eval { file, unit_key } => format!("eval:{file}#{unit_key}"),
            NodeKey::Observation { resource_key, field_path, eval_node } => format!("observation:{resource_key}:{field_path}#{eval_node}"),
            NodeKey::Conclusion { resource_key, field_path } => format!("conclusion:{resource_key}:{field_path}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    layer: NodeLayer,
    /// The content hash from the last successful recompute; `None` before
    /// the node has ever been pulled.
    green: Option<u64>,
    stale: bool,
    dependencies: HashSet<String>,
    dependents: HashSet<String>,
}

impl Node {
    fn new(layer: NodeLayer) -> Self {
        Self { layer, green: None, stale: true, dependencies: HashSet::new(), dependents: HashSet::new() }
    }
}

/// Raised by `add_dependency` when the new edge would close a cycle; the
/// path is the dependency chain from `to` back to `from` that already
/// existed before the rejected edge.
#[derive(Debug, Clone)]
pub struct CycleDetected {
    pub path: Vec<String>,
}

/// The incremental graph. A single host (spec §5 "at most one writer")
/// owns one `Graph`, typically behind the same `RwLock` that guards the
/// rest of its project state.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<String, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_mut(&mut self, key: &NodeKey) -> &mut Node {
        self.nodes.entry(key.id()).or_insert_with(|| Node::new(key.layer()))
    }

    /// Ensure a node exists without marking it stale or touching its edges.
    pub fn ensure_node(&mut self, key: &NodeKey) {
        self.node_mut(key);
    }

    /// Record that `from` reads `to` (e.g. an observation node reads the
    /// eval node it was produced from). Rejects the edge if `to` already
    /// transitively depends on `from` — the "cycle detection sentinel"
    /// (spec §4.8 "the graph must reject an edge that would make a node its
    /// own ancestor").
    pub fn add_dependency(&mut self, from: &NodeKey, to: &NodeKey) -> Result<(), CycleDetected> {
        let from_id = from.id();
        let to_id = to.id();
        if from_id == to_id {
            return Err(CycleDetected { path: vec![from_id] });
        }
        if let Some(path) = self.reaches(&to_id, &from_id) {
            return Err(CycleDetected { path });
        }
        self.node_mut(from).dependencies.insert(to_id.clone());
        self.node_mut(to).dependents.insert(from_id);
        Ok(())
    }

    /// Depth-first search from `start` to `target` over existing
    /// dependency edges; returns the path if found.
    fn reaches(&self, start: &str, target: &str) -> Option<Vec<String>> {
        let mut stack = vec![vec![start.to_string()]];
        let mut visited = HashSet::new();
        while let Some(path) = stack.pop() {
            let current = path.last().unwrap().clone();
            if current == target {
                return Some(path);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                for dep in &node.dependencies {
                    let mut next = path.clone();
                    next.push(dep.clone());
                    stack.push(next);
                }
            }
        }
        None
    }

    /// Push staleness from an edited file down to every node that (directly
    /// or transitively) depends on it (spec §4.8 "push").
    pub fn mark_file_stale(&mut self, file: &NormalizedPath) {
        self.mark_stale_cascading(&NodeKey::File(file.clone()).id());
    }

    /// Push staleness from a changed configuration value (spec §3.8
    /// `convergence-config` node kind — evidence rank overrides, cache
    /// mode, schema version) down to its dependents.
    pub fn mark_config_stale(&mut self, key: &str) {
        self.mark_stale_cascading(&NodeKey::Config(key.to_string()).id());
    }

    fn mark_stale_cascading(&mut self, id: &str) {
        let mut queue = vec![id.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let dependents = match self.nodes.get_mut(&current) {
                Some(node) => {
                    node.stale = true;
                    node.dependents.iter().cloned().collect::<Vec<_>>()
                }
                None => continue,
            };
            queue.extend(dependents);
        }
    }

    pub fn is_stale(&self, key: &NodeKey) -> bool {
        self.nodes.get(&key.id()).map(|n| n.stale).unwrap_or(true)
    }

    /// Re-derive one node. `recompute` returns the node's new content,
    /// hashed with `xxh3` into its green token. Returns whether the node's
    /// dependents should themselves be considered stale:
    ///
    /// - the node was not stale: `false`, nothing to do.
    /// - the node was stale and its content changed (or this is its first
    ///   computation): recompute, store the new green token, clear the
    ///   node's own stale bit, mark its *direct* dependents stale, return
    ///   `true`.
    /// - the node was stale but its content is byte-identical to the
    ///   previous green token: clear the node's own stale bit, leave
    ///   dependents untouched, return `false` (spec §4.8 "value-sensitive
    ///   cutoff" — correction: downstream only stays stale if the upstream
    ///   conclusion's *value* changed, not merely because an ancestor was
    ///   re-evaluated).
    pub fn pull(&mut self, key: &NodeKey, recompute: impl FnOnce() -> Vec<u8>) -> bool {
        let id = key.id();
        let was_stale = self.nodes.get(&id).map(|n| n.stale).unwrap_or(true);
        if !was_stale {
            return false;
        }

        let bytes = recompute();
        let new_green = xxh3_64(&bytes);
        let node = self.node_mut(key);
        let changed = node.green != Some(new_green);
        node.green = Some(new_green);
        node.stale = false;

        if changed {
            let dependents: Vec<String> = node.dependents.iter().cloned().collect();
            for dep_id in dependents {
                if let Some(dep) = self.nodes.get_mut(&dep_id) {
                    dep.stale = true;
                }
            }
        }
        changed
    }

    /// Drop a file node and everything that depended on nothing but it,
    /// used when the host reports a file deletion. Dependents are marked
    /// stale (their next `pull` will discover the missing dependency)
    /// rather than removed, since an observation node may still be valid
    /// evidence from another file.
    pub fn remove_file(&mut self, file: &NormalizedPath) {
        let id = NodeKey::File(file.clone()).id();
        if let Some(node) = self.nodes.remove(&id) {
            for dep_id in node.dependents {
                if let Some(dep) = self.nodes.get_mut(&dep_id) {
                    dep.stale = true;
                    dep.dependencies.remove(&id);
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> NormalizedPath {
        NormalizedPath::new(format!("/p/{name}"))
    }

    #[test]
    fn fresh_node_is_stale_until_pulled() {
        let mut graph = Graph::new();
        let key = NodeKey::File(file("a.ts"));
        assert!(graph.is_stale(&key));
        let changed = graph.pull(&key, || b"v1".to_vec());
        assert!(changed, "first pull is always a change");
        assert!(!graph.is_stale(&key));
    }

    #[test]
    fn unchanged_recompute_does_not_propagate_staleness() {
        let mut graph = Graph::new();
        let file_key = NodeKey::File(file("a.ts"));
        let eval_key = NodeKey::Eval { file: file("a.ts"), unit_key: "class:Foo".to_string() };
        graph.add_dependency(&eval_key, &file_key).unwrap();

        graph.pull(&file_key, || b"v1".to_vec());
        graph.pull(&eval_key, || b"derived-v1".to_vec());
        assert!(!graph.is_stale(&eval_key));

        graph.mark_file_stale(&file("a.ts"));
        assert!(graph.is_stale(&eval_key), "pushing file staleness marks its dependent");

        // File content changed but hashes to the same bytes (e.g. a
        // formatting-only edit reverted) -> eval node must not be marked
        // stale again.
        let changed = graph.pull(&file_key, || b"v1".to_vec());
        assert!(!changed);

        let eval_changed = graph.pull(&eval_key, || b"derived-v1".to_vec());
        assert!(!eval_changed);
    }

    #[test]
    fn changed_value_propagates_staleness_to_dependents() {
        let mut graph = Graph::new();
        let file_key = NodeKey::File(file("a.ts"));
        let eval_key = NodeKey::Eval { file: file("a.ts"), unit_key: "class:Foo".to_string() };
        graph.add_dependency(&eval_key, &file_key).unwrap();

        graph.pull(&file_key, || b"v1".to_vec());
        graph.pull(&eval_key, || b"derived-v1".to_vec());

        graph.mark_file_stale(&file("a.ts"));
        graph.pull(&file_key, || b"v2".to_vec());
        assert!(graph.is_stale(&eval_key), "file content changed, dependent should be stale");
    }

    #[test]
    fn add_dependency_rejects_cycles() {
        let mut graph = Graph::new();
        let a = NodeKey::Conclusion { resource_key: "a".into(), field_path: "name".into() };
        let b = NodeKey::Observation { resource_key: "a".into(), field_path: "name".into(), eval_node: "e1".into() };
        graph.add_dependency(&a, &b).unwrap();
        let err = graph.add_dependency(&b, &a);
        assert!(err.is_err());
    }

    #[test]
    fn node_key_ids_match_spec_format() {
        let key = NodeKey::Observation { resource_key: "foo-bar".into(), field_path: "name".into(), eval_node: "eval:/p/a.ts#class:Foo".into() };
        assert_eq!(key.id(), "observation:foo-bar:name#eval:/p/a.ts#class:Foo");
    }

    #[test]
    fn remove_file_marks_dependents_stale_and_drops_edge() {
        let mut graph = Graph::new();
        let file_key = NodeKey::File(file("a.ts"));
        let eval_key = NodeKey::Eval { file: file("a.ts"), unit_key: "class:Foo".to_string() };
        graph.add_dependency(&eval_key, &file_key).unwrap();
        graph.pull(&file_key, || b"v1".to_vec());
        graph.pull(&eval_key, || b"derived".to_vec());

        graph.remove_file(&file("a.ts"));
        assert!(graph.is_stale(&eval_key));
    }
}
