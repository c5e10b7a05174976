// Definition convergence (spec §3.2, §4.4): multiple evidence records for
// the same class are collected into candidates ranked by
// `(sourceKind, evidenceRank)`; the merge step unions aliases, takes the
// highest-ranked class-name and name, keeps the richer bindable set, and
// emits one converged `ResourceDef`. Ties break by stable candidate id so
// the result is deterministic regardless of observation order (spec §8
// property 3).
//
// Grounded on `semantic::symbol::SymbolTable::define`'s "exactly one
// definition wins" arena-table pattern, generalized from reject-on-conflict
// to rank-and-merge.

use super::{Candidate, ElementLike, ResourceDef};
use crate::diagnostic::{codes, Diagnostic};
use crate::source::NormalizedPath;
use std::collections::HashMap;

/// Converge a flat list of candidates (gathered across every recognizer and
/// every file) into one `ResourceDef` per class. Candidates are grouped by
/// `(file, class_name)` since one class converges to exactly one resource.
pub fn converge(candidates: Vec<Candidate>) -> (HashMap<(NormalizedPath, String), ResourceDef>, Vec<Diagnostic>) {
    let mut groups: HashMap<(NormalizedPath, String), Vec<Candidate>> = HashMap::new();
    for candidate in candidates {
        let key = (candidate.def.file().clone(), candidate.def.class_name().to_string());
        groups.entry(key).or_default().push(candidate);
    }

    let mut out = HashMap::new();
    let mut diagnostics = Vec::new();
    for (key, mut group) in groups {
        group.sort_by(|a, b| a.rank().cmp(&b.rank()).then(a.id.cmp(&b.id)));
        let merged = merge_group(group, &mut diagnostics);
        out.insert(key, merged);
    }
    (out, diagnostics)
}

/// Merge one class's ranked candidates into a single `ResourceDef`. The
/// lowest-ranked `(sourceKind, evidenceRank)` tuple wins the base shape
/// (manifest beats explicit beats convention); later, lower-priority
/// candidates only contribute their aliases and bindables.
fn merge_group(group: Vec<Candidate>, diagnostics: &mut Vec<Diagnostic>) -> ResourceDef {
    let winner_kind_tag = kind_tag(&group[0].def);
    for candidate in &group[1..] {
        if kind_tag(&candidate.def) != winner_kind_tag {
            diagnostics.push(Diagnostic::from_code(
                &codes::E0303,
                crate::source::Span::default(),
                format!(
                    "class `{}` was recognized as both `{}` and `{}`; keeping the higher-ranked definition",
                    candidate.def.class_name(),
                    winner_kind_tag,
                    kind_tag(&candidate.def)
                ),
            ));
        }
    }

    let mut winner = group[0].def.clone();
    let mut all_aliases: Vec<String> = winner.aliases().to_vec();
    let mut richest_bindable_count = bindable_count(&winner);

    for candidate in &group[1..] {
        if kind_tag(&candidate.def) != winner_kind_tag {
            continue;
        }
        all_aliases.extend(candidate.def.aliases().iter().cloned());
        let candidate_bindable_count = bindable_count(&candidate.def);
        if candidate_bindable_count > richest_bindable_count {
            richest_bindable_count = candidate_bindable_count;
            winner = merge_richer_bindables(winner, &candidate.def);
        }
    }

    all_aliases.sort();
    all_aliases.dedup();
    set_aliases(&mut winner, all_aliases);
    winner
}

fn kind_tag(def: &ResourceDef) -> &'static str {
    match def {
        ResourceDef::CustomElement(_) => "custom-element",
        ResourceDef::CustomAttribute(_) => "custom-attribute",
        ResourceDef::TemplateController(_) => "template-controller",
        ResourceDef::ValueConverter(_) => "value-converter",
        ResourceDef::BindingBehavior(_) => "binding-behavior",
    }
}

fn bindable_count(def: &ResourceDef) -> usize {
    match def {
        ResourceDef::CustomElement(e) => e.bindables.len(),
        ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => a.bindables.len(),
        ResourceDef::ValueConverter(_) | ResourceDef::BindingBehavior(_) => 0,
    }
}

/// Keep the winner's name/class/file identity but swap in the richer
/// bindable set from a lower-ranked candidate that happened to observe more
/// of them (e.g. a static-shape fallback that lists bindables a decorator
/// left implicit).
fn merge_richer_bindables(winner: ResourceDef, richer: &ResourceDef) -> ResourceDef {
    match (winner, richer) {
        (ResourceDef::CustomElement(mut e), ResourceDef::CustomElement(richer_e)) => {
            e.bindables = richer_e.bindables.clone();
            ResourceDef::CustomElement(e)
        }
        (ResourceDef::CustomAttribute(mut a), ResourceDef::CustomAttribute(richer_a)) => {
            a.bindables = richer_a.bindables.clone();
            ResourceDef::CustomAttribute(a)
        }
        (ResourceDef::TemplateController(mut a), ResourceDef::TemplateController(richer_a)) => {
            a.bindables = richer_a.bindables.clone();
            ResourceDef::TemplateController(a)
        }
        (other, _) => other,
    }
}

fn set_aliases(def: &mut ResourceDef, aliases: Vec<String>) {
    match def {
        ResourceDef::CustomElement(e) => e.aliases = aliases,
        ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => a.aliases = aliases,
        ResourceDef::ValueConverter(n) | ResourceDef::BindingBehavior(n) => n.aliases = aliases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Bindable, EvidenceSourceKind};
    use crate::source::Sourced;
    use std::collections::HashMap as StdHashMap;

    fn element_candidate(id: u32, source_kind: EvidenceSourceKind, aliases: Vec<&str>, bindables: Vec<&str>) -> Candidate {
        let mut map: StdHashMap<String, Bindable> = StdHashMap::new();
        for b in bindables {
            map.insert(b.to_string(), Bindable { name: Sourced::synthetic(b.to_string()), attribute: None, mode: None, primary: false });
        }
        Candidate {
            id,
            def: ResourceDef::CustomElement(ElementLike {
                name: Sourced::synthetic("foo-bar".to_string()),
                class_name: "FooBar".to_string(),
                file: NormalizedPath::new("/p/foo-bar.ts"),
                aliases: aliases.into_iter().map(String::from).collect(),
                bindables: map,
                containerless: false,
                inline_template: None,
                dependencies: vec![],
            }),
            source_kind,
            evidence_rank: 0,
        }
    }

    #[test]
    fn convergence_is_order_independent() {
        let a = element_candidate(0, EvidenceSourceKind::AnalysisExplicitDecoratorOrDefine, vec!["legacy-foo"], vec!["value"]);
        let b = element_candidate(1, EvidenceSourceKind::AnalysisConvention, vec!["other-alias"], vec![]);

        let (forward, diags_fwd) = converge(vec![a.clone(), b.clone()]);
        let (backward, diags_back) = converge(vec![b, a]);

        assert!(diags_fwd.is_empty());
        assert!(diags_back.is_empty());
        let key = (NormalizedPath::new("/p/foo-bar.ts"), "FooBar".to_string());
        let fwd_def = forward.get(&key).unwrap();
        let back_def = backward.get(&key).unwrap();
        assert_eq!(fwd_def.aliases(), back_def.aliases());
        assert_eq!(fwd_def.aliases(), &["legacy-foo".to_string(), "other-alias".to_string()]);
    }

    #[test]
    fn manifest_evidence_outranks_convention() {
        let manifest = Candidate {
            id: 5,
            def: ResourceDef::CustomElement(ElementLike {
                name: Sourced::synthetic("foo-bar".to_string()),
                class_name: "FooBar".to_string(),
                file: NormalizedPath::new("/p/foo-bar.ts"),
                aliases: vec![],
                bindables: StdHashMap::new(),
                containerless: true,
                inline_template: None,
                dependencies: vec![],
            }),
            source_kind: EvidenceSourceKind::ManifestResource,
            evidence_rank: 0,
        };
        let convention = element_candidate(1, EvidenceSourceKind::AnalysisConvention, vec![], vec![]);
        let (merged, _) = converge(vec![convention, manifest]);
        let key = (NormalizedPath::new("/p/foo-bar.ts"), "FooBar".to_string());
        match merged.get(&key).unwrap() {
            ResourceDef::CustomElement(e) => assert!(e.containerless),
            other => panic!("unexpected {other:?}"),
        }
    }
}
