// Resource definitions, pattern recognizers, and definition convergence
// (spec §3.2, §4.4).
//
// Grounded on `semantic::symbol::SymbolTable`'s arena-table pattern
// (`SymbolTable::define` returning `None` on duplicate) for the "exactly
// one definition after convergence" invariant (spec §3.2).

pub mod canon;
pub mod convergence;
pub mod recognize;

use crate::source::{NormalizedPath, Sourced};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A bindable property exposed by an element-like resource (spec §3.2,
/// Glossary "Bindable").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bindable {
    pub name: Sourced<String>,
    pub attribute: Option<String>,
    pub mode: Option<BindingMode>,
    pub primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingMode {
    OneTime,
    ToView,
    FromView,
    TwoWay,
    Default,
}

/// A tagged union over the five resource kinds (spec §3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceDef {
    CustomElement(ElementLike),
    CustomAttribute(AttributeLike),
    TemplateController(AttributeLike),
    ValueConverter(NameOnly),
    BindingBehavior(NameOnly),
}

impl ResourceDef {
    pub fn name(&self) -> &str {
        match self {
            ResourceDef::CustomElement(e) => &e.name.value,
            ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => &a.name.value,
            ResourceDef::ValueConverter(n) | ResourceDef::BindingBehavior(n) => &n.name.value,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            ResourceDef::CustomElement(e) => &e.class_name,
            ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => &a.class_name,
            ResourceDef::ValueConverter(n) | ResourceDef::BindingBehavior(n) => &n.class_name,
        }
    }

    pub fn file(&self) -> &NormalizedPath {
        match self {
            ResourceDef::CustomElement(e) => &e.file,
            ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => &a.file,
            ResourceDef::ValueConverter(n) | ResourceDef::BindingBehavior(n) => &n.file,
        }
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            ResourceDef::CustomElement(e) => &e.aliases,
            ResourceDef::CustomAttribute(a) | ResourceDef::TemplateController(a) => &a.aliases,
            ResourceDef::ValueConverter(n) | ResourceDef::BindingBehavior(n) => &n.aliases,
        }
    }

    pub fn is_template_controller(&self) -> bool {
        matches!(self, ResourceDef::TemplateController(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameOnly {
    pub name: Sourced<String>,
    pub class_name: String,
    pub file: NormalizedPath,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementLike {
    pub name: Sourced<String>,
    pub class_name: String,
    pub file: NormalizedPath,
    pub aliases: Vec<String>,
    pub bindables: HashMap<String, Bindable>,
    pub containerless: bool,
    pub inline_template: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeLike {
    pub name: Sourced<String>,
    pub class_name: String,
    pub file: NormalizedPath,
    pub aliases: Vec<String>,
    pub bindables: HashMap<String, Bindable>,
    pub is_template_controller: bool,
    pub no_multi_bindings: bool,
    pub dependencies: Vec<String>,
}

/// Ranked evidence for one candidate resource, pre-convergence (spec §4.4).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: u32,
    pub def: ResourceDef,
    pub source_kind: EvidenceSourceKind,
    pub evidence_rank: u8,
}

/// `(sourceKind, evidenceRank)` ranking used by convergence (spec §3.2,
/// §4.4): manifest > explicit-declared (decorator/define) >
/// explicit-declared (static-shape) > convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceSourceKind {
    ManifestResource = 0,
    AnalysisExplicitDecoratorOrDefine = 1,
    AnalysisExplicitStaticShape = 2,
    AnalysisConvention = 4,
}

impl Candidate {
    pub fn rank(&self) -> (EvidenceSourceKind, u8) {
        (self.source_kind, self.evidence_rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_rank_orders_manifest_before_convention() {
        let manifest = Candidate {
            id: 0,
            def: ResourceDef::ValueConverter(NameOnly {
                name: Sourced::synthetic("x".into()),
                class_name: "X".into(),
                file: NormalizedPath::new("/p/a.ts"),
                aliases: vec![],
            }),
            source_kind: EvidenceSourceKind::ManifestResource,
            evidence_rank: 0,
        };
        let convention = Candidate {
            id: 1,
            def: manifest.def.clone(),
            source_kind: EvidenceSourceKind::AnalysisConvention,
            evidence_rank: 0,
        };
        assert!(manifest.rank() < convention.rank());
    }
}
