// Export binding resolver (spec §4.2).
//
// Builds a mapping from (file, local name) -> (origin file, origin symbol),
// resolving named re-exports, aliased imports, and namespace passthroughs
// transitively, terminating on cycles. External packages (bare specifiers
// not resolved to a project file) are recorded as `external-package` gaps.
//
// Grounded on `semantic::signature::SignatureRegistry`/`ExportedDecl`
// cross-module resolution, generalized to transitive re-export/alias/
// namespace resolution with cycle termination.

use crate::facts::FileFacts;
use crate::gaps::{Gap, GapKind};
use crate::source::NormalizedPath;
use std::collections::HashMap;

/// Where a (file, name) binding ultimately originates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginKey {
    pub file: NormalizedPath,
    pub symbol: String,
}

/// A function resolving a module specifier to a project file path, mirroring
/// spec §6.2's `resolveModuleName(specifier, fromFile) -> path?`.
pub trait ModuleResolver {
    fn resolve(&self, specifier: &str, from_file: &NormalizedPath) -> Option<NormalizedPath>;
}

/// `(file, local name) -> (origin file, origin symbol)` plus the gaps hit
/// while building it.
#[derive(Debug, Default)]
pub struct ExportBindingMap {
    bindings: HashMap<(NormalizedPath, String), OriginKey>,
    pub gaps: Vec<Gap>,
}

impl ExportBindingMap {
    pub fn get(&self, file: &NormalizedPath, name: &str) -> Option<&OriginKey> {
        self.bindings.get(&(file.clone(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Build the export binding map over every file's facts. `files` indexes
/// `FileFacts` by normalized path so re-export chains can hop between files.
pub fn build(files: &HashMap<NormalizedPath, FileFacts>, resolver: &dyn ModuleResolver) -> ExportBindingMap {
    let mut map = ExportBindingMap::default();
    for facts in files.values() {
        for export in &facts.exports {
            let name = export.exported_name.clone();
            let mut visiting = Vec::new();
            match resolve_export(&facts.path, &name, export, files, resolver, &mut visiting) {
                Ok(origin) => {
                    map.bindings.insert((facts.path.clone(), name), origin);
                }
                Err(gap) => map.gaps.push(gap),
            }
        }
    }
    map
}

fn resolve_export(
    file: &NormalizedPath,
    name: &str,
    export: &crate::facts::host_ast::ExportDecl,
    files: &HashMap<NormalizedPath, FileFacts>,
    resolver: &dyn ModuleResolver,
    visiting: &mut Vec<(NormalizedPath, String)>,
) -> Result<OriginKey, Gap> {
    let key = (file.clone(), name.to_string());
    if visiting.contains(&key) {
        return Err(Gap::new(
            GapKind::CircularImport,
            format!("export `{name}` in {file}"),
            "a cycle was found while resolving re-exports; resolution stopped at the cycle",
        ));
    }
    visiting.push(key);

    let result = if let Some(specifier) = &export.re_export_from {
        match resolver.resolve(specifier, file) {
            Some(origin_file) => {
                let origin_facts = files.get(&origin_file);
                match origin_facts.and_then(|f| f.exports.iter().find(|e| e.exported_name == name || e.is_default)) {
                    Some(origin_export) => resolve_export(&origin_file, name, origin_export, files, resolver, visiting),
                    None => Ok(OriginKey { file: origin_file, symbol: name.to_string() }),
                }
            }
            None => Err(Gap::new(
                GapKind::ExternalPackage,
                format!("re-export `{name}` from `{specifier}`"),
                "the import specifier points outside the project and was not followed",
            )),
        }
    } else if let Some(local_name) = &export.local_name {
        // A local declaration re-exported under a possibly different
        // external name; check whether `local_name` is itself an imported
        // binding (aliased import passthrough) before concluding it's local.
        if let Some(import) = files.get(file).and_then(|f| f.imports.iter().find(|i| &i.local_name == local_name)) {
            match resolver.resolve(&import.specifier, file) {
                Some(origin_file) => {
                    let origin_name = import.export_name.clone().unwrap_or_else(|| local_name.clone());
                    let origin_facts = files.get(&origin_file);
                    match origin_facts.and_then(|f| f.exports.iter().find(|e| e.exported_name == origin_name)) {
                        Some(origin_export) => {
                            resolve_export(&origin_file, &origin_name, origin_export, files, resolver, visiting)
                        }
                        None => Ok(OriginKey { file: origin_file, symbol: origin_name }),
                    }
                }
                None => Err(Gap::new(
                    GapKind::ExternalPackage,
                    format!("import `{local_name}` from `{}`", import.specifier),
                    "the import specifier points outside the project and was not followed",
                )),
            }
        } else {
            Ok(OriginKey { file: file.clone(), symbol: local_name.clone() })
        }
    } else {
        Ok(OriginKey { file: file.clone(), symbol: name.to_string() })
    };

    visiting.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::host_ast::ExportDecl;

    struct FakeResolver(HashMap<(String, String), NormalizedPath>);

    impl ModuleResolver for FakeResolver {
        fn resolve(&self, specifier: &str, from_file: &NormalizedPath) -> Option<NormalizedPath> {
            self.0.get(&(from_file.as_str().to_string(), specifier.to_string())).cloned()
        }
    }

    fn facts(path: &str, exports: Vec<ExportDecl>) -> FileFacts {
        FileFacts {
            path: NormalizedPath::new(path),
            classes: vec![],
            define_calls: vec![],
            imports: vec![],
            exports,
            gaps: vec![],
        }
    }

    #[test]
    fn resolves_local_export_to_itself() {
        let mut files = HashMap::new();
        files.insert(
            NormalizedPath::new("/p/a.ts"),
            facts(
                "/p/a.ts",
                vec![ExportDecl { local_name: Some("Foo".into()), exported_name: "Foo".into(), is_default: false, re_export_from: None }],
            ),
        );
        let resolver = FakeResolver(HashMap::new());
        let map = build(&files, &resolver);
        let origin = map.get(&NormalizedPath::new("/p/a.ts"), "Foo").unwrap();
        assert_eq!(origin.file.as_str(), "/p/a.ts");
        assert_eq!(origin.symbol, "Foo");
    }

    #[test]
    fn follows_re_export_passthrough() {
        let mut files = HashMap::new();
        files.insert(
            NormalizedPath::new("/p/b.ts"),
            facts(
                "/p/b.ts",
                vec![ExportDecl { local_name: None, exported_name: "Foo".into(), is_default: false, re_export_from: Some("./a".into()) }],
            ),
        );
        files.insert(
            NormalizedPath::new("/p/a.ts"),
            facts(
                "/p/a.ts",
                vec![ExportDecl { local_name: Some("Foo".into()), exported_name: "Foo".into(), is_default: false, re_export_from: None }],
            ),
        );
        let mut resolver_map = HashMap::new();
        resolver_map.insert(("/p/b.ts".to_string(), "./a".to_string()), NormalizedPath::new("/p/a.ts"));
        let resolver = FakeResolver(resolver_map);
        let map = build(&files, &resolver);
        let origin = map.get(&NormalizedPath::new("/p/b.ts"), "Foo").unwrap();
        assert_eq!(origin.file.as_str(), "/p/a.ts");
    }

    #[test]
    fn external_package_is_a_gap_not_a_panic() {
        let mut files = HashMap::new();
        files.insert(
            NormalizedPath::new("/p/b.ts"),
            facts(
                "/p/b.ts",
                vec![ExportDecl { local_name: None, exported_name: "Foo".into(), is_default: false, re_export_from: Some("some-package".into()) }],
            ),
        );
        let resolver = FakeResolver(HashMap::new());
        let map = build(&files, &resolver);
        assert_eq!(map.gaps.len(), 1);
        assert_eq!(map.gaps[0].kind, GapKind::ExternalPackage);
    }

    #[test]
    fn circular_reexport_terminates() {
        let mut files = HashMap::new();
        files.insert(
            NormalizedPath::new("/p/a.ts"),
            facts(
                "/p/a.ts",
                vec![ExportDecl { local_name: None, exported_name: "Foo".into(), is_default: false, re_export_from: Some("./b".into()) }],
            ),
        );
        files.insert(
            NormalizedPath::new("/p/b.ts"),
            facts(
                "/p/b.ts",
                vec![ExportDecl { local_name: None, exported_name: "Foo".into(), is_default: false, re_export_from: Some("./a".into()) }],
            ),
        );
        let mut resolver_map = HashMap::new();
        resolver_map.insert(("/p/a.ts".to_string(), "./b".to_string()), NormalizedPath::new("/p/b.ts"));
        resolver_map.insert(("/p/b.ts".to_string(), "./a".to_string()), NormalizedPath::new("/p/a.ts"));
        let resolver = FakeResolver(resolver_map);
        let map = build(&files, &resolver);
        assert!(map.gaps.iter().any(|g| g.kind == GapKind::CircularImport));
    }
}
